use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use crate::error::{CpaError, Result};
use crate::schema::types::MetadataDocument;

/// A directed graph of parent/child relations between tables.
/// Edges point from child table to parent table (child → parent).
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// Information about an edge (foreign key relationship).
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    /// Column in the child table holding the parent's key
    pub foreign_key: String,
    /// Referenced column in the parent table
    pub referenced_field: String,
}

impl DependencyGraph {
    /// Build and validate the dependency graph of a metadata document.
    ///
    /// Node indices follow document order, which is what keeps `roots()` and
    /// `children()` in declared order. The relation must be a forest: every
    /// table has at most one parent, reached through exactly one foreign key,
    /// and there are no cycles.
    pub fn from_document(doc: &MetadataDocument) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table in &doc.tables {
            if node_indices.contains_key(&table.name) {
                return Err(CpaError::InvalidMetadata {
                    message: format!("table '{}' is declared twice", table.name),
                });
            }
            let idx = graph.add_node(table.name.clone());
            node_indices.insert(table.name.clone(), idx);
        }

        for table in &doc.tables {
            let from_idx = node_indices[&table.name];
            let mut parent: Option<(&str, &str)> = None;

            for (field, reference) in table.foreign_keys() {
                let to_idx = *node_indices.get(&reference.table).ok_or_else(|| {
                    CpaError::UnknownTable {
                        table: reference.table.clone(),
                    }
                })?;

                match parent {
                    Some((existing, column)) if existing == reference.table => {
                        return Err(CpaError::AmbiguousForeignKey {
                            parent: reference.table.clone(),
                            child: table.name.clone(),
                            columns: format!("{}, {}", column, field.name),
                        });
                    }
                    Some((existing, _)) => {
                        return Err(CpaError::MultipleParents {
                            table: table.name.clone(),
                            parents: format!("{}, {}", existing, reference.table),
                        });
                    }
                    None => parent = Some((reference.table.as_str(), field.name.as_str())),
                }

                graph.add_edge(
                    from_idx,
                    to_idx,
                    EdgeInfo {
                        foreign_key: field.name.clone(),
                        referenced_field: reference.field.clone(),
                    },
                );
            }
        }

        let dependency_graph = Self {
            graph,
            node_indices,
        };
        // Self references count as cycles here.
        dependency_graph.modeling_order()?;
        Ok(dependency_graph)
    }

    /// Get the table name for a node index.
    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Get node index for a table name.
    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    fn require(&self, table_name: &str) -> Result<NodeIndex> {
        self.node_index(table_name)
            .ok_or_else(|| CpaError::UnknownTable {
                table: table_name.to_string(),
            })
    }

    /// Get all table names in declared order.
    pub fn table_names(&self) -> Vec<&str> {
        self.graph.node_weights().map(|s| s.as_str()).collect()
    }

    /// Get the number of tables.
    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of parent/child edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Parent tables of `table_name` (at most one).
    pub fn parents(&self, table_name: &str) -> Result<Vec<&str>> {
        let idx = self.require(table_name)?;
        Ok(self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| self.table_name(e.target()))
            .collect())
    }

    /// Child tables of `table_name`, in declared order.
    pub fn children(&self, table_name: &str) -> Result<Vec<&str>> {
        let idx = self.require(table_name)?;
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        children.sort();
        Ok(children.into_iter().map(|c| self.table_name(c)).collect())
    }

    /// Tables without a parent, in declared order.
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.table_name(idx))
            .collect()
    }

    /// The foreign key column of `child` that references `parent`.
    pub fn foreign_key(&self, parent: &str, child: &str) -> Result<&EdgeInfo> {
        let parent_idx = self.require(parent)?;
        let child_idx = self.require(child)?;
        self.graph
            .edges_connecting(child_idx, parent_idx)
            .next()
            .map(|e| e.weight())
            .ok_or_else(|| CpaError::MissingForeignKey {
                parent: parent.to_string(),
                child: child.to_string(),
            })
    }

    /// Tables ordered so that every child precedes its parent.
    pub fn modeling_order(&self) -> Result<Vec<String>> {
        // Edges go child → parent, so toposort already yields children first.
        match toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .map(|idx| self.table_name(idx).to_string())
                .collect()),
            Err(cycle) => Err(CpaError::CircularDependency {
                tables: self.table_name(cycle.node_id()).to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::*;

    fn shop_document() -> MetadataDocument {
        MetadataDocument {
            tables: vec![
                TableMeta::new("customers")
                    .with_primary_key("id")
                    .with_field("id", FieldType::id()),
                TableMeta::new("orders")
                    .with_primary_key("id")
                    .with_field("id", FieldType::id())
                    .with_field("customer_id", FieldType::foreign_key("customers", "id")),
                TableMeta::new("items")
                    .with_primary_key("id")
                    .with_field("id", FieldType::id())
                    .with_field("order_id", FieldType::foreign_key("orders", "id")),
                TableMeta::new("tickets")
                    .with_field("customer_id", FieldType::foreign_key("customers", "id")),
            ],
        }
    }

    #[test]
    fn test_build_graph() {
        let graph = DependencyGraph::from_document(&shop_document()).unwrap();
        assert_eq!(graph.table_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_roots_and_children_in_declared_order() {
        let graph = DependencyGraph::from_document(&shop_document()).unwrap();
        assert_eq!(graph.roots(), vec!["customers"]);
        assert_eq!(graph.children("customers").unwrap(), vec!["orders", "tickets"]);
        assert_eq!(graph.children("items").unwrap(), Vec::<&str>::new());
        assert_eq!(graph.parents("items").unwrap(), vec!["orders"]);
        assert!(graph.parents("customers").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_key_lookup() {
        let graph = DependencyGraph::from_document(&shop_document()).unwrap();
        let edge = graph.foreign_key("orders", "items").unwrap();
        assert_eq!(edge.foreign_key, "order_id");
        assert_eq!(edge.referenced_field, "id");

        let err = graph.foreign_key("items", "orders").unwrap_err();
        assert!(matches!(err, CpaError::MissingForeignKey { .. }));
    }

    #[test]
    fn test_modeling_order_children_first() {
        let graph = DependencyGraph::from_document(&shop_document()).unwrap();
        let order = graph.modeling_order().unwrap();
        let pos = |t: &str| order.iter().position(|o| o == t).unwrap();
        assert!(pos("items") < pos("orders"));
        assert!(pos("orders") < pos("customers"));
        assert!(pos("tickets") < pos("customers"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let doc = MetadataDocument {
            tables: vec![TableMeta::new("categories")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("parent_id", FieldType::foreign_key("categories", "id"))],
        };
        let err = DependencyGraph::from_document(&doc).unwrap_err();
        assert!(matches!(err, CpaError::CircularDependency { .. }));
    }

    #[test]
    fn test_mutual_cycle_rejected() {
        let doc = MetadataDocument {
            tables: vec![
                TableMeta::new("table_a")
                    .with_primary_key("id")
                    .with_field("id", FieldType::id())
                    .with_field("b_id", FieldType::foreign_key("table_b", "id")),
                TableMeta::new("table_b")
                    .with_primary_key("id")
                    .with_field("id", FieldType::id())
                    .with_field("a_id", FieldType::foreign_key("table_a", "id")),
            ],
        };
        let err = DependencyGraph::from_document(&doc).unwrap_err();
        assert!(matches!(err, CpaError::CircularDependency { .. }));
    }

    #[test]
    fn test_multiple_parents_rejected() {
        let mut doc = shop_document();
        doc.tables[2] = TableMeta::new("items")
            .with_field("order_id", FieldType::foreign_key("orders", "id"))
            .with_field("customer_id", FieldType::foreign_key("customers", "id"));
        let err = DependencyGraph::from_document(&doc).unwrap_err();
        assert!(matches!(err, CpaError::MultipleParents { .. }));
    }

    #[test]
    fn test_two_keys_to_same_parent_rejected() {
        let mut doc = shop_document();
        doc.tables[2] = TableMeta::new("items")
            .with_field("order_id", FieldType::foreign_key("orders", "id"))
            .with_field("return_order_id", FieldType::foreign_key("orders", "id"));
        let err = DependencyGraph::from_document(&doc).unwrap_err();
        assert!(matches!(err, CpaError::AmbiguousForeignKey { .. }));
    }

    #[test]
    fn test_unknown_referenced_table() {
        let doc = MetadataDocument {
            tables: vec![TableMeta::new("orders")
                .with_field("customer_id", FieldType::foreign_key("customers", "id"))],
        };
        let err = DependencyGraph::from_document(&doc).unwrap_err();
        assert!(matches!(err, CpaError::UnknownTable { .. }));
    }
}

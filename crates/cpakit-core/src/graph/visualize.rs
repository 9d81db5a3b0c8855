use crate::graph::dag::DependencyGraph;
use petgraph::visit::EdgeRef;

/// Output format for graph visualization.
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Generate a visualization of the table tree, parents above children.
pub fn visualize(graph: &DependencyGraph, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph),
        GraphFormat::Dot => generate_dot(graph),
    }
}

fn generate_mermaid(graph: &DependencyGraph) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!("    {}[{}]\n", name, name));
    }

    output.push('\n');

    // Stored edges run child → parent; draw them parent → child.
    for edge in graph.graph.edge_references() {
        let child = graph.table_name(edge.source());
        let parent = graph.table_name(edge.target());
        output.push_str(&format!(
            "    {} -->|{}| {}\n",
            parent,
            edge.weight().foreign_key,
            child
        ));
    }

    output
}

fn generate_dot(graph: &DependencyGraph) -> String {
    let mut output = String::from("digraph tables {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for node in graph.graph.node_indices() {
        output.push_str(&format!("    \"{}\";\n", graph.table_name(node)));
    }

    for edge in graph.graph.edge_references() {
        let child = graph.table_name(edge.source());
        let parent = graph.table_name(edge.target());
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
            parent,
            child,
            edge.weight().foreign_key
        ));
    }

    output.push_str("}\n");
    output
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level metadata document describing a relational dataset.
///
/// Table order is significant: it is the order in which roots are modeled
/// and children are visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub tables: Vec<TableMeta>,
}

impl MetadataDocument {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn field_count(&self) -> usize {
        self.tables.iter().map(|t| t.fields.len()).sum()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.tables.iter().map(|t| t.foreign_keys().count()).sum()
    }
}

impl Default for MetadataDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A single table declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    /// Data file relative to the metadata root. Defaults to `<name>.csv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            primary_key: None,
            fields: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            field_type,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// File name of the table's data, relative to the metadata root.
    pub fn data_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("{}.csv", self.name))
    }

    /// Fields that reference another table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Field, &FieldRef)> {
        self.fields.iter().filter_map(|f| match &f.field_type {
            FieldType::Id {
                reference: Some(r), ..
            } => Some((f, r)),
            _ => None,
        })
    }
}

/// A column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
}

/// Declared semantic type of a column; drives loading and transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Numerical {
        #[serde(default)]
        subtype: NumericSubtype,
    },
    Categorical,
    Boolean,
    Datetime {
        /// chrono format string; RFC 3339 / ISO dates are tried when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Id {
        #[serde(default)]
        subtype: IdSubtype,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<FieldRef>,
    },
}

impl FieldType {
    pub fn integer() -> Self {
        FieldType::Numerical {
            subtype: NumericSubtype::Integer,
        }
    }

    pub fn float() -> Self {
        FieldType::Numerical {
            subtype: NumericSubtype::Float,
        }
    }

    pub fn id() -> Self {
        FieldType::Id {
            subtype: IdSubtype::Integer,
            reference: None,
        }
    }

    pub fn foreign_key(table: impl Into<String>, field: impl Into<String>) -> Self {
        FieldType::Id {
            subtype: IdSubtype::Integer,
            reference: Some(FieldRef {
                table: table.into(),
                field: field.into(),
            }),
        }
    }

    /// Returns true for identifier columns, which are never modeled directly.
    pub fn is_id(&self) -> bool {
        matches!(self, FieldType::Id { .. })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Numerical { subtype } => write!(f, "numerical({})", subtype),
            FieldType::Categorical => write!(f, "categorical"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Datetime { .. } => write!(f, "datetime"),
            FieldType::Id {
                reference: Some(r), ..
            } => write!(f, "id -> {}.{}", r.table, r.field),
            FieldType::Id { .. } => write!(f, "id"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericSubtype {
    Integer,
    #[default]
    Float,
}

impl fmt::Display for NumericSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericSubtype::Integer => write!(f, "integer"),
            NumericSubtype::Float => write!(f, "float"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSubtype {
    #[default]
    Integer,
    String,
}

/// Target of a foreign key: `table.field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub table: String,
    pub field: String,
}

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::registry::Cardinality;

/// Columns of one joined attribute-table row
pub type AttributeRow = Map<String, Value>;

/// Eager-loaded sub-rows of one relation
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<AttributeRow>),
    /// Ordered by `delta`
    Many(Vec<AttributeRow>),
}

impl Related {
    /// Shape `rows` (already ordered by delta) to the relation's cardinality.
    /// A one-to-one relation keeps the first row.
    pub fn collect(cardinality: Cardinality, rows: Vec<AttributeRow>) -> Self {
        match cardinality {
            Cardinality::One => Related::One(rows.into_iter().next()),
            Cardinality::Many => Related::Many(rows),
        }
    }

    pub fn rows(&self) -> Vec<&AttributeRow> {
        match self {
            Related::One(row) => row.iter().collect(),
            Related::Many(rows) => rows.iter().collect(),
        }
    }

    /// Values of `column` across the sub-rows; absent columns read as null
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        self.rows()
            .into_iter()
            .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// One `node` row with its relations joined
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub id: i64,
    pub entity_type: String,
    pub title: Option<String>,
    relations: HashMap<String, Related>,
}

impl NodeRow {
    pub fn new(id: i64, entity_type: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            title,
            relations: HashMap::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>, related: Related) -> Self {
        self.insert_relation(name, related);
        self
    }

    pub fn insert_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    /// Sub-rows of an eager-loaded relation, `None` if it was not loaded
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }
}

/// Build an [`AttributeRow`] from `(column, value)` pairs
pub fn attribute_row<I, K>(columns: I) -> AttributeRow
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    columns.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

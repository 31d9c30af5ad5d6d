//! Per-call relation definitions.
//!
//! A [`RelationEntityDefinition`] is the plain description of one query:
//! the node discriminator, the attribute tables to join eagerly and, if
//! needed, the node ids to restrict to. Drivers consume it; nothing caches it.

use serde::Serialize;

use crate::error::{StatError, StatResult};
use crate::registry::{Cardinality, TableBinding, TypeRegistry};

pub const NODE_TABLE: &str = "node";
pub const NODE_ID_COLUMN: &str = "nid";
pub const NODE_TYPE_COLUMN: &str = "type";
pub const NODE_TITLE_COLUMN: &str = "title";
/// Foreign key of every attribute table, pointing at the owning node
pub const ENTITY_ID_COLUMN: &str = "entity_id";
pub const DELTA_COLUMN: &str = "delta";

/// Base filter on the `node` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscriminatorFilter {
    pub column: &'static str,
    pub value: String,
}

/// Named relation joined from an attribute table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationAccessor {
    pub name: String,
    pub table: String,
    /// Value column read from the joined rows
    pub column: String,
    pub join_column: &'static str,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEntityDefinition {
    pub entity_type: String,
    pub table: &'static str,
    pub id_column: &'static str,
    pub filter: DiscriminatorFilter,
    pub relations: Vec<RelationAccessor>,
    pub ids: Option<Vec<i64>>,
}

impl RelationEntityDefinition {
    /// Restrict the base query to the given node ids
    pub fn with_ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationAccessor> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Relation names to load eagerly
    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Build the query shape for `entity_type`: one accessor per Related and
/// ContainsRelated property, typed by the schema's cardinality.
pub fn build(registry: &TypeRegistry, entity_type: &str) -> StatResult<RelationEntityDefinition> {
    let schema = registry.schema_for(entity_type)?;

    let mut relations = Vec::new();
    for property in schema.joined() {
        let table = match registry.binding(property)? {
            TableBinding::Attribute { table, .. } => table.clone(),
            TableBinding::Node { .. } => {
                return Err(StatError::config(format!(
                    "property '{}' is bound to contained nodes and cannot be joined",
                    property
                )))
            }
        };
        let cardinality = registry.cardinality(entity_type, property)?;
        relations.push(RelationAccessor {
            name: property.clone(),
            table,
            column: registry.value_column(property)?,
            join_column: ENTITY_ID_COLUMN,
            cardinality,
        });
    }

    Ok(RelationEntityDefinition {
        entity_type: entity_type.to_string(),
        table: NODE_TABLE,
        id_column: NODE_ID_COLUMN,
        filter: DiscriminatorFilter {
            column: NODE_TYPE_COLUMN,
            value: entity_type.to_string(),
        },
        relations,
        ids: None,
    })
}

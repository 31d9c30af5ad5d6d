//! Declarative statistic type registry.
//!
//! Adding a new property:
//!   - register its kind and table binding with [`RegistryBuilder::property`]
//!   - describe how to fetch it in the [`FetchTable`](crate::dispatch::FetchTable)
//!
//! Adding a new statistic type:
//!   - optionally alias it from its interface label
//!   - describe its properties with a [`TypeSchema`]
//!
//! The registry is built once and shared read-only; nothing mutates it after
//! [`RegistryBuilder::build`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{StatError, StatResult};
use crate::naming;

/// How the node references the property inside its field table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Stored in `field_<name>_value`
    PlainValue,
    UserReference,
    EventReference,
    /// A node of another type owned by this one
    ContainedEntity,
}

/// Which of the three property lists of a schema a property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationGroup {
    /// Flat attribute kept in its own field table
    Related,
    /// Nested node, resolved through a `ContainsRelated` reference
    Contains,
    /// Field holding the node ids of a `Contains` property
    ContainsRelated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

/// Physical storage of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBinding {
    /// Per-attribute table joined on `entity_id`. `column` overrides the
    /// value column derived from the property name.
    Attribute {
        table: String,
        column: Option<String>,
    },
    /// Nodes of `entity_type` whose ids are stored in the owner's `reference`
    /// property
    Node {
        entity_type: String,
        reference: String,
    },
}

impl TableBinding {
    /// Attribute table following the naming convention
    pub fn attribute(property: &str) -> Self {
        Self::Attribute {
            table: naming::table_for(property),
            column: None,
        }
    }

    /// Attribute table with an explicit value column
    pub fn attribute_with_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Attribute {
            table: table.into(),
            column: Some(column.into()),
        }
    }

    pub fn node(entity_type: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::Node {
            entity_type: entity_type.into(),
            reference: reference.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub relation_group: RelationGroup,
    pub cardinality: Cardinality,
}

/// Properties of one statistic type, in declaration order
#[derive(Debug, Clone, Default)]
pub struct TypeSchema {
    pub related: Vec<String>,
    pub contains: Vec<String>,
    pub contains_related: Vec<String>,
    pub cardinality: HashMap<String, Cardinality>,
}

impl TypeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn related(mut self, property: &str, cardinality: Cardinality) -> Self {
        self.related.push(property.to_string());
        self.cardinality.insert(property.to_string(), cardinality);
        self
    }

    pub fn contains(mut self, property: &str, cardinality: Cardinality) -> Self {
        self.contains.push(property.to_string());
        self.cardinality.insert(property.to_string(), cardinality);
        self
    }

    pub fn contains_related(mut self, property: &str, cardinality: Cardinality) -> Self {
        self.contains_related.push(property.to_string());
        self.cardinality.insert(property.to_string(), cardinality);
        self
    }

    /// Related ∪ Contains: the fields of a materialized statistic
    pub fn materialized(&self) -> impl Iterator<Item = &String> {
        self.related.iter().chain(self.contains.iter())
    }

    /// Related ∪ ContainsRelated: the relations joined eagerly on fetch
    pub fn joined(&self) -> impl Iterator<Item = &String> {
        self.related.iter().chain(self.contains_related.iter())
    }

    /// Every property with the group it was declared in
    pub fn grouped(&self) -> impl Iterator<Item = (&String, RelationGroup)> {
        self.related
            .iter()
            .map(|p| (p, RelationGroup::Related))
            .chain(self.contains.iter().map(|p| (p, RelationGroup::Contains)))
            .chain(
                self.contains_related
                    .iter()
                    .map(|p| (p, RelationGroup::ContainsRelated)),
            )
    }
}

/// Immutable lookup tables describing every statistic type
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    aliases: HashMap<String, String>,
    schemas: HashMap<String, TypeSchema>,
    kinds: HashMap<String, PropertyKind>,
    bindings: HashMap<String, TableBinding>,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Statistic types of the Drupal site
    pub fn standard() -> Self {
        use Cardinality::{Many, One};
        use PropertyKind::*;

        Self::builder()
            .alias("Stats Achilles", "sports_statistic")
            .alias("Stats Cycling", "stats_cycling")
            .alias("Stats Bowling", "bowling_scores")
            .alias("Stats Health Check", "stats_health_check")
            .alias("Stats Goalball Tournament", "goalball_score_board")
            .alias("Stats Goalball", "stats_goalball")
            .entity_type(
                "goalball_score_board",
                TypeSchema::new()
                    .contains("goalballTeam", Many)
                    .contains_related("goalballTeamReference", Many),
            )
            .entity_type(
                "sports_statistic",
                TypeSchema::new()
                    .related("participant", One)
                    .related("event", One)
                    .related("minutes", One)
                    .related("hours", One)
                    .related("seconds", One)
                    .related("distanceInMiles", One),
            )
            .entity_type("bowling_scores", TypeSchema::new())
            .entity_type("stats_goalball", TypeSchema::new())
            .entity_type("stats_health_check", TypeSchema::new())
            .entity_type("stats_cycling", TypeSchema::new())
            .entity_type("goalball_team", TypeSchema::new())
            .property("participant", UserReference)
            .property("minutes", PlainValue)
            .property("hours", PlainValue)
            .property("seconds", PlainValue)
            .property("distanceInMiles", PlainValue)
            .property("event", EventReference)
            .bound_property(
                "goalballTeam",
                ContainedEntity,
                TableBinding::node("goalball_team", "goalballTeamReference"),
            )
            .bound_property(
                "goalballTeamReference",
                ContainedEntity,
                TableBinding::attribute_with_column(
                    "field_data_field_team_statistics",
                    "field_team_statistics_target_id",
                ),
            )
            .build()
    }

    /// Translate an interface label to its entity type. Names that are not
    /// aliases are taken to be entity types already.
    pub fn resolve_entity_type<'a>(&'a self, name_or_alias: &'a str) -> &'a str {
        self.aliases
            .get(name_or_alias)
            .map(String::as_str)
            .unwrap_or(name_or_alias)
    }

    pub fn schema_for(&self, entity_type: &str) -> StatResult<&TypeSchema> {
        self.schemas
            .get(entity_type)
            .ok_or_else(|| StatError::unknown_type(entity_type))
    }

    /// Kind of a property. Kinds are keyed by property name across all types.
    pub fn property_kind(&self, property: &str) -> StatResult<PropertyKind> {
        self.kinds
            .get(property)
            .copied()
            .ok_or_else(|| StatError::unknown_property(property))
    }

    pub fn cardinality(&self, entity_type: &str, property: &str) -> StatResult<Cardinality> {
        self.schema_for(entity_type)?
            .cardinality
            .get(property)
            .copied()
            .ok_or_else(|| StatError::unknown_property(property))
    }

    pub fn binding(&self, property: &str) -> StatResult<&TableBinding> {
        self.bindings
            .get(property)
            .ok_or_else(|| StatError::unknown_property(property))
    }

    /// Column holding the property's value in its attribute table
    pub fn value_column(&self, property: &str) -> StatResult<String> {
        match self.binding(property)? {
            TableBinding::Attribute {
                column: Some(column),
                ..
            } => Ok(column.clone()),
            _ => Ok(naming::column_for(property, self.property_kind(property)?)),
        }
    }

    /// Full descriptors of a type's properties in schema order
    pub fn descriptors(&self, entity_type: &str) -> StatResult<Vec<PropertyDescriptor>> {
        let schema = self.schema_for(entity_type)?;
        schema
            .grouped()
            .map(|(name, relation_group)| {
                Ok(PropertyDescriptor {
                    name: name.clone(),
                    kind: self.property_kind(name)?,
                    relation_group,
                    cardinality: self.cardinality(entity_type, name)?,
                })
            })
            .collect()
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// `(interface label, entity type)` pairs
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Declarative construction of a [`TypeRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    aliases: HashMap<String, String>,
    schemas: HashMap<String, TypeSchema>,
    kinds: HashMap<String, PropertyKind>,
    bindings: HashMap<String, TableBinding>,
}

impl RegistryBuilder {
    pub fn alias(mut self, interface_name: &str, entity_type: &str) -> Self {
        self.aliases
            .insert(interface_name.to_string(), entity_type.to_string());
        self
    }

    pub fn entity_type(mut self, entity_type: &str, schema: TypeSchema) -> Self {
        self.schemas.insert(entity_type.to_string(), schema);
        self
    }

    /// Register a property stored in its conventional attribute table
    pub fn property(self, name: &str, kind: PropertyKind) -> Self {
        let binding = TableBinding::attribute(name);
        self.bound_property(name, kind, binding)
    }

    pub fn bound_property(mut self, name: &str, kind: PropertyKind, binding: TableBinding) -> Self {
        self.kinds.insert(name.to_string(), kind);
        self.bindings.insert(name.to_string(), binding);
        self
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            aliases: self.aliases,
            schemas: self.schemas,
            kinds: self.kinds,
            bindings: self.bindings,
        }
    }
}

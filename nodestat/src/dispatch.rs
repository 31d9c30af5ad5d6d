//! Property fetch strategies.
//!
//! Every materialized property is resolved by the strategy registered under
//! its name. `Sync` strategies project a column out of an eager-loaded
//! relation; `Async` strategies run their own queries.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::trace;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::barrier::fan_in;
use crate::driver::StorageDriver;
use crate::error::{StatError, StatResult};
use crate::materializer::Materializer;
use crate::registry::{Cardinality, TableBinding, TypeRegistry};
use crate::relation;
use crate::row::{NodeRow, Related};

/// Projection of an already-joined relation
pub type SyncFetchFn = fn(&NodeRow, &str, &TypeRegistry) -> StatResult<Value>;

/// Strategy performing its own fetches
pub type AsyncFetchFn =
    fn(FetchContext, Arc<NodeRow>, String) -> BoxFuture<'static, StatResult<Value>>;

#[derive(Clone, Copy)]
pub enum FetchStrategy {
    Sync(SyncFetchFn),
    Async(AsyncFetchFn),
}

impl std::fmt::Debug for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStrategy::Sync(_) => f.write_str("FetchStrategy::Sync"),
            FetchStrategy::Async(_) => f.write_str("FetchStrategy::Async"),
        }
    }
}

/// Property name → strategy. The same name resolves the same way for every
/// type that declares it.
#[derive(Debug, Clone, Default)]
pub struct FetchTable {
    strategies: HashMap<String, FetchStrategy>,
}

static STANDARD_TABLE: Lazy<Arc<FetchTable>> = Lazy::new(|| {
    Arc::new(
        FetchTable::new()
            .with("participant", FetchStrategy::Sync(standard_fetch))
            .with("minutes", FetchStrategy::Sync(standard_fetch))
            .with("hours", FetchStrategy::Sync(standard_fetch))
            .with("seconds", FetchStrategy::Sync(standard_fetch))
            .with("distanceInMiles", FetchStrategy::Sync(standard_fetch))
            .with("event", FetchStrategy::Sync(standard_fetch))
            .with("goalballTeam", FetchStrategy::Async(contained_entity_fetch)),
    )
});

impl FetchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies for the properties of [`TypeRegistry::standard`]
    pub fn standard() -> Arc<FetchTable> {
        STANDARD_TABLE.clone()
    }

    pub fn with(mut self, property: &str, strategy: FetchStrategy) -> Self {
        self.strategies.insert(property.to_string(), strategy);
        self
    }

    pub fn strategy(&self, property: &str) -> StatResult<FetchStrategy> {
        self.strategies
            .get(property)
            .copied()
            .ok_or_else(|| StatError::unknown_property(property))
    }
}

/// Shared collaborators handed to asynchronous strategies
#[derive(Clone)]
pub struct FetchContext {
    pub registry: Arc<TypeRegistry>,
    pub fetch_table: Arc<FetchTable>,
    pub driver: Arc<dyn StorageDriver>,
}

impl FetchContext {
    pub fn new(
        registry: Arc<TypeRegistry>,
        fetch_table: Arc<FetchTable>,
        driver: Arc<dyn StorageDriver>,
    ) -> Self {
        Self {
            registry,
            fetch_table,
            driver,
        }
    }
}

/// Read the property's value column from its eager-loaded relation.
///
/// One-to-one relations yield the value (or null when the node has no row);
/// one-to-many relations yield an array in delta order.
pub fn standard_fetch(row: &NodeRow, property: &str, registry: &TypeRegistry) -> StatResult<Value> {
    let column = registry.value_column(property)?;
    let related = row
        .related(property)
        .ok_or_else(|| StatError::resolution(property, "relation was not eager-loaded"))?;
    let value = match related {
        Related::One(sub_row) => sub_row
            .as_ref()
            .and_then(|r| r.get(&column).cloned())
            .unwrap_or(Value::Null),
        Related::Many(_) => Value::Array(related.column_values(&column)),
    };
    trace!("node {} {} = {}", row.id, property, value);
    Ok(value)
}

/// Resolve a contained-entity property: load the nodes referenced by the
/// owner and materialize each of them.
///
/// Yields an array of `{ "id", "title", ...properties }` objects in reference
/// order, or a single object (or null) when the property's cardinality is one.
pub fn contained_entity_fetch(
    ctx: FetchContext,
    row: Arc<NodeRow>,
    property: String,
) -> BoxFuture<'static, StatResult<Value>> {
    async move {
        let registry = ctx.registry.clone();
        let (entity_type, reference) = match registry.binding(&property)? {
            TableBinding::Node {
                entity_type,
                reference,
            } => (entity_type.clone(), reference.clone()),
            TableBinding::Attribute { .. } => {
                return Err(StatError::config(format!(
                    "property '{}' is not bound to contained nodes",
                    property
                )))
            }
        };

        let column = registry.value_column(&reference)?;
        let related = row.related(&reference).ok_or_else(|| {
            StatError::resolution(
                property.as_str(),
                format!("reference relation '{}' was not eager-loaded", reference),
            )
        })?;
        let ids = related
            .column_values(&column)
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| {
                as_node_id(&v).ok_or_else(|| {
                    StatError::resolution(property.as_str(), format!("invalid node reference {}", v))
                })
            })
            .collect::<StatResult<Vec<i64>>>()?;

        let single = registry.cardinality(&row.entity_type, &property)? == Cardinality::One;
        if ids.is_empty() {
            return Ok(if single { Value::Null } else { Value::Array(Vec::new()) });
        }

        let definition = relation::build(&registry, &entity_type)?.with_ids(ids.clone());
        let nodes: HashMap<i64, NodeRow> = ctx
            .driver
            .fetch(&definition)
            .await?
            .into_iter()
            .map(|node| (node.id, node))
            .collect();

        let materializer = Materializer::new(ctx.clone());
        let mut tasks = Vec::with_capacity(ids.len());
        for id in &ids {
            let node = nodes.get(id).cloned().ok_or_else(|| {
                StatError::resolution(
                    property.as_str(),
                    format!("referenced {} node {} not found", entity_type, id),
                )
            })?;
            let materializer = materializer.clone();
            let entity_type = entity_type.clone();
            tasks.push(
                async move {
                    let node = Arc::new(node);
                    let statistic = materializer.materialize(&entity_type, node.clone()).await?;
                    let mut object = Map::new();
                    object.insert("id".to_string(), Value::from(node.id));
                    object.insert(
                        "title".to_string(),
                        node.title.clone().map(Value::from).unwrap_or(Value::Null),
                    );
                    for (name, value) in statistic.into_values() {
                        object.insert(name, value);
                    }
                    Ok::<_, StatError>(Value::Object(object))
                }
                .boxed(),
            );
        }

        let contained = fan_in(tasks).await?;
        if single {
            Ok(contained.into_iter().next().unwrap_or(Value::Null))
        } else {
            Ok(Value::Array(contained))
        }
    }
    .boxed()
}

fn as_node_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

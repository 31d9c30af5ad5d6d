use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use serde_json::Value;

use crate::barrier::fan_in;
use crate::dispatch::{FetchContext, FetchStrategy};
use crate::error::StatResult;
use crate::row::NodeRow;
use crate::statistic::Statistic;

/// Builds [`Statistic`]s from caller-supplied values or fetched rows
#[derive(Clone)]
pub struct Materializer {
    ctx: FetchContext,
}

impl Materializer {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    /// Build a statistic straight from `values`, without dispatching any
    /// strategy. Keys outside the type's properties are ignored; missing
    /// properties are null.
    pub fn from_values(
        &self,
        type_or_alias: &str,
        values: &HashMap<String, Value>,
    ) -> StatResult<Statistic> {
        let registry = &self.ctx.registry;
        let entity_type = registry.resolve_entity_type(type_or_alias);
        let schema = registry.schema_for(entity_type)?;
        let values = schema
            .materialized()
            .map(|property| {
                let value = values.get(property).cloned().unwrap_or(Value::Null);
                (property.clone(), value)
            })
            .collect();
        Ok(Statistic::new(entity_type, values))
    }

    /// Resolve every Related and Contains property of `row` and build the
    /// statistic.
    ///
    /// Synchronous strategies run inline. Asynchronous ones all run under one
    /// fan-in barrier; the first failure is returned and the other results
    /// are discarded.
    pub async fn materialize(&self, type_or_alias: &str, row: Arc<NodeRow>) -> StatResult<Statistic> {
        let registry = self.ctx.registry.clone();
        let entity_type = registry.resolve_entity_type(type_or_alias);
        let schema = registry.schema_for(entity_type)?;

        let properties: Vec<&String> = schema.materialized().collect();
        let mut values: Vec<Value> = vec![Value::Null; properties.len()];
        let mut pending_slots = Vec::new();
        let mut pending = Vec::new();

        for (slot, property) in properties.iter().enumerate() {
            match self.ctx.fetch_table.strategy(property)? {
                FetchStrategy::Sync(fetch) => {
                    values[slot] = fetch(&row, property, &registry)?;
                }
                FetchStrategy::Async(fetch) => {
                    trace!("node {} {} queued", row.id, property);
                    pending_slots.push(slot);
                    pending.push(fetch(self.ctx.clone(), row.clone(), property.to_string()));
                }
            }
        }

        if !pending.is_empty() {
            debug!(
                "node {} ({}): waiting on {} asynchronous propert(ies)",
                row.id,
                entity_type,
                pending.len()
            );
            let resolved = fan_in(pending).await?;
            for (slot, value) in pending_slots.into_iter().zip(resolved) {
                values[slot] = value;
            }
        }

        let values = properties
            .into_iter()
            .cloned()
            .zip(values)
            .collect();
        Ok(Statistic::new(entity_type, values))
    }
}

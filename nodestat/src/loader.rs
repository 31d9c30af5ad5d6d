use std::sync::Arc;

use futures::FutureExt;
use log::debug;

use crate::barrier::fan_in;
use crate::dispatch::FetchContext;
use crate::error::StatResult;
use crate::materializer::Materializer;
use crate::relation::{self, RelationEntityDefinition};
use crate::statistic::Statistic;

/// Loads every stored statistic of a type
#[derive(Clone)]
pub struct CollectionLoader {
    materializer: Materializer,
}

impl CollectionLoader {
    pub fn new(ctx: FetchContext) -> Self {
        Self {
            materializer: Materializer::new(ctx),
        }
    }

    /// Fetch all nodes of the type with their relations joined and
    /// materialize them concurrently. No particular order is promised.
    pub async fn load_all(&self, type_or_alias: &str) -> StatResult<Vec<Statistic>> {
        let definition = self.definition(type_or_alias)?;
        self.load(definition).await
    }

    /// Same as [`load_all`](Self::load_all), restricted to the given node ids
    pub async fn load_by_ids(&self, type_or_alias: &str, ids: &[i64]) -> StatResult<Vec<Statistic>> {
        let definition = self.definition(type_or_alias)?.with_ids(ids.to_vec());
        self.load(definition).await
    }

    fn definition(&self, type_or_alias: &str) -> StatResult<RelationEntityDefinition> {
        let registry = &self.materializer.context().registry;
        let entity_type = registry.resolve_entity_type(type_or_alias);
        relation::build(registry, entity_type)
    }

    async fn load(&self, definition: RelationEntityDefinition) -> StatResult<Vec<Statistic>> {
        let rows = self.materializer.context().driver.fetch(&definition).await?;
        debug!(
            "materializing {} {} statistic(s)",
            rows.len(),
            definition.entity_type
        );

        let tasks = rows
            .into_iter()
            .map(|row| {
                let materializer = self.materializer.clone();
                let entity_type = definition.entity_type.clone();
                async move { materializer.materialize(&entity_type, Arc::new(row)).await }.boxed()
            })
            .collect();
        fan_in(tasks).await
    }
}

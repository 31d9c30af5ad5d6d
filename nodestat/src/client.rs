use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::config::StatsConfig;
use crate::dispatch::{FetchContext, FetchTable};
use crate::driver::{SeaOrmDriver, StorageDriver};
use crate::error::StatResult;
use crate::loader::CollectionLoader;
use crate::materializer::Materializer;
use crate::registry::TypeRegistry;
use crate::row::NodeRow;
use crate::statistic::Statistic;

/// Entry point for routing and report code
#[derive(Clone)]
pub struct StatisticsClient {
    ctx: FetchContext,
}

impl StatisticsClient {
    /// Client over `db` with the standard registry and fetch table
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_parts(
            Arc::new(TypeRegistry::standard()),
            FetchTable::standard(),
            Arc::new(SeaOrmDriver::new(db)),
        )
    }

    pub fn with_parts(
        registry: Arc<TypeRegistry>,
        fetch_table: Arc<FetchTable>,
        driver: Arc<dyn StorageDriver>,
    ) -> Self {
        Self {
            ctx: FetchContext::new(registry, fetch_table, driver),
        }
    }

    /// Connect using `config` and build a standard client
    pub async fn connect(config: &StatsConfig, base_dir: &Path) -> StatResult<Self> {
        let db = config.connect(base_dir).await?;
        Ok(Self::new(db))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.ctx.registry
    }

    pub fn materializer(&self) -> Materializer {
        Materializer::new(self.ctx.clone())
    }

    pub fn loader(&self) -> CollectionLoader {
        CollectionLoader::new(self.ctx.clone())
    }

    pub async fn load_all(&self, type_or_alias: &str) -> StatResult<Vec<Statistic>> {
        self.loader().load_all(type_or_alias).await
    }

    pub async fn load_by_ids(&self, type_or_alias: &str, ids: &[i64]) -> StatResult<Vec<Statistic>> {
        self.loader().load_by_ids(type_or_alias, ids).await
    }

    pub async fn materialize(&self, type_or_alias: &str, row: NodeRow) -> StatResult<Statistic> {
        self.materializer()
            .materialize(type_or_alias, Arc::new(row))
            .await
    }

    pub fn from_values(
        &self,
        type_or_alias: &str,
        values: &HashMap<String, Value>,
    ) -> StatResult<Statistic> {
        self.materializer().from_values(type_or_alias, values)
    }
}

pub mod barrier;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod loader;
pub mod materializer;
pub mod naming;
pub mod registry;
pub mod relation;
pub mod row;
pub mod statistic;

pub use client::StatisticsClient;
pub use config::{DatabaseConfig, PoolConfig, StatsConfig};
pub use dispatch::{FetchContext, FetchStrategy, FetchTable};
pub use driver::{SeaOrmDriver, StorageDriver};
pub use error::{StatError, StatResult};
pub use loader::CollectionLoader;
pub use materializer::Materializer;
pub use registry::{
    Cardinality, PropertyDescriptor, PropertyKind, RelationGroup, TableBinding, TypeRegistry,
    TypeSchema,
};
pub use relation::RelationEntityDefinition;
pub use row::{AttributeRow, NodeRow, Related};
pub use statistic::Statistic;

/// Initialise `env_logger` from `RUST_LOG`, defaulting to `info`.
/// Calling it more than once is harmless.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

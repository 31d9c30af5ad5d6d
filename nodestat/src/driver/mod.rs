pub mod seaorm;

pub use seaorm::SeaOrmDriver;

use async_trait::async_trait;

use crate::error::StatResult;
use crate::relation::RelationEntityDefinition;
use crate::row::NodeRow;

/// Query interface the core needs from a persistence driver.
///
/// Implementations must tolerate concurrent outstanding calls.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Fetch every node matching the definition's discriminator (and id
    /// restriction, if any) with all of its relations eagerly joined.
    async fn fetch(&self, definition: &RelationEntityDefinition) -> StatResult<Vec<NodeRow>>;
}

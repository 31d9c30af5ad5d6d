//! Fan-out/fan-in over independent tasks.

use futures::future::BoxFuture;
use log::debug;
use tokio::task::JoinSet;

use crate::error::{StatError, StatResult};

/// Run every task concurrently and wait for all of them, short-circuiting on
/// the first error reported.
///
/// Tasks are spawned in list order and results are returned in that order,
/// whatever order they complete in. On the first error, or the first task to
/// panic, the barrier resolves immediately; tasks still running are detached
/// and left to finish on their own, and nothing reads what they produce.
/// Dropping the barrier before it resolves aborts its tasks. Requires a tokio
/// runtime.
pub async fn fan_in<T>(tasks: Vec<BoxFuture<'static, StatResult<T>>>) -> StatResult<Vec<T>>
where
    T: Send + 'static,
{
    let total = tasks.len();
    let mut set = JoinSet::new();
    for (slot, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (slot, task.await) });
    }

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let failure = match joined {
            Ok((slot, Ok(value))) => {
                slots[slot] = Some(value);
                continue;
            }
            Ok((slot, Err(err))) => {
                debug!("task {} of {} failed: {}", slot, total, err);
                err
            }
            Err(join_err) => StatError::resolution(
                "fan-in",
                format!("task ended without reporting: {}", join_err),
            ),
        };
        set.detach_all();
        return Err(failure);
    }

    Ok(slots.into_iter().flatten().collect())
}

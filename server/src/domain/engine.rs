//! Task engine handle
//!
//! Operations are spread over the sibling modules as `impl TaskEngine`
//! blocks. Each mutation runs in one transaction. Events and activity rows
//! go out only after commit.

use std::sync::Arc;

use sqlx::SqlitePool;

use super::activity::ActivityRecorder;
use super::events::{Broadcaster, EventPublisher};

#[derive(Clone)]
pub struct TaskEngine {
    pub(super) pool: SqlitePool,
    pub(super) broadcaster: Broadcaster,
    pub(super) activity: ActivityRecorder,
}

impl TaskEngine {
    pub fn new(pool: SqlitePool, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            activity: ActivityRecorder::new(pool.clone()),
            broadcaster: Broadcaster::new(publisher),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::domain::events::testing::RecordingPublisher;

    /// Engine over a fresh in-memory database with a recording publisher
    pub(crate) async fn engine() -> (TaskEngine, Arc<RecordingPublisher>) {
        let pool = memory_pool().await.unwrap();
        let recorder = Arc::new(RecordingPublisher::default());
        (TaskEngine::new(pool, recorder.clone()), recorder)
    }
}

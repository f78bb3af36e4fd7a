use tandem_engine::{EngineConfig, ReconciliationCoordinator};
use tandem_storage::{DbPool, SqliteStore};

pub type Engine = ReconciliationCoordinator<SqliteStore>;

pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    pub fn new(pool: DbPool, config: EngineConfig) -> Result<Self, tandem_core::ReconcileError> {
        let engine = ReconciliationCoordinator::new(SqliteStore::new(pool), config)?;
        Ok(Self { engine })
    }
}

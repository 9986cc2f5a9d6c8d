use crate::models::{CoreError, UserState};

pub type PersistenceResult<T> = Result<T, CoreError>;

pub trait MigrationStore: Send + Sync {
    fn current_version(&self) -> PersistenceResult<i64>;

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()>;
}

/// Latest-state-wins storage of per-user workflow state. Writers replace the
/// whole row; readers see whatever the most recent commit left.
pub trait UserStateStore: Send + Sync {
    fn upsert_user_state(&self, username: &str, state_json: &str) -> PersistenceResult<()>;

    fn user_state(&self, username: &str) -> PersistenceResult<Option<UserState>>;

    fn list_user_states(&self) -> PersistenceResult<Vec<UserState>>;
}

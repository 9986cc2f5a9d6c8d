pub mod error;
pub mod role;
pub mod user_state;

pub use error::{CoreError, CoreErrorKind};
pub use role::ProcessRole;
pub use user_state::UserState;

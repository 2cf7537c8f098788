mod coordinator;
mod errors;
mod types;

pub use coordinator::RefreshCoordinator;
pub use types::RefreshState;

pub(crate) use errors::RefreshError;
pub(crate) use types::RefreshOutcome;

mod errors;
mod main;
mod navigator;
mod types;

pub use errors::SessionError;
pub use main::{SessionController, SessionControllerBuilder};
pub use navigator::{Navigator, RecordingNavigator, TracingNavigator};
pub use types::{LogoutReason, RegisterData, Role, SessionEvent, SessionState, User};

mod errors;
mod main;
mod types;

pub use errors::SessionError;
pub use main::{SessionCoordinator, SessionHandle};
pub use types::{SessionSnapshot, SessionState, SessionStatus, is_session_valid};


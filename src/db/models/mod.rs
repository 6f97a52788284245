pub mod session;

pub use session::{success_rate, NewSessionRecord, SessionRecord, SessionStatus};

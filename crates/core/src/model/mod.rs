mod ids;
mod session;

pub use ids::{ParseIdError, SessionId};
pub use session::{NewSession, SessionError, StudySession};

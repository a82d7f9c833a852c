//! The conversation engine: sessions, slot-filling flows, the validation
//! gate, and the replies the client renders.

mod edit;
mod engine;
mod leave_flow;
mod queries;
pub mod replies;
pub mod session;
pub mod validation;
mod wfh_flow;

pub use edit::EditDetails;
pub use engine::{ChatEngine, Collaborators, ConfirmationAction, EngineSettings, MessagePayload};
pub use replies::ChatReply;
pub use session::{MokaSessionStore, SessionContext, SessionStore};

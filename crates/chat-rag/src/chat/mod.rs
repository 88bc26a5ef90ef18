//! Chat sessions: history, state machine, word streaming and the turn controller

mod controller;
mod history;
mod session;
mod stream;

pub use controller::{ChatController, TokenSink, TurnOutcome};
pub use history::{ChatTurnHistory, SessionHistory};
pub use session::{ChatSession, SessionState};
pub use stream::{StreamPresenter, WordStream};

//! Domain layer: stream kinds, chunk wire types and the session state machine.

pub mod session;
pub mod stream;

pub use session::{ChunkPlan, Session, SessionInfo, SessionState};
pub use stream::{ChunkRequest, ChunkResponse, SessionId, StreamItem, StreamKind};

//! Adapters: in-memory store, loopback transport and the event validator.

mod event_validator;
mod loopback;
mod memory_store;

pub use event_validator::EventChunkValidator;
pub use loopback::LoopbackTransport;
pub use memory_store::MemoryStreamStore;

//! Leecher and seeder services.

mod leecher;
mod seeder;

pub use leecher::{LeecherDeps, StreamLeecher, SyncReport};
pub use seeder::{ServedChunk, StreamSeeder};

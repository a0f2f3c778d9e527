//! ADAC node controller library - exposes modules for testing.

pub mod consensus;
pub mod context;
pub mod error;
pub mod job;
pub mod logging;
pub mod network;
pub mod routes;
pub mod server;
pub mod worker;

pub use context::NodeContext;
pub use job::{JobState, JobStateGuard, JobTicket};
pub use server::AppState;
pub use worker::{ConsensusWorker, JobOutcome};

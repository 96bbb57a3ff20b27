pub mod engine;
pub mod executor;
pub mod gate;
pub mod git_ops;
pub mod indexer;
pub mod pipeline;
pub mod planner;
pub mod runner;
pub mod testing;

pub use engine::{PlannedRepo, SyncEngine, SyncOptions};
pub use executor::Executor;
pub use indexer::Indexer;
pub use planner::plan;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};

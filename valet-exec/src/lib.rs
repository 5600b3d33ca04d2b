//! Bounded-parallel plan execution: a worker pool plus the driver that
//! feeds a `Plan`'s compile and link commands through it.

pub mod executor;
pub mod pool;

pub use executor::{default_renderer, execute, BuildStats, CommandRunner, ExecutionError, ExecutionResult, SystemCommandRunner};
pub use pool::WorkerPool;

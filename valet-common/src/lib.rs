//! Shared graph algorithms, platform facts, error taxonomy, environment
//! configuration, and small utilities used by every other crate in the
//! workspace.

pub mod config;
pub mod errors;
pub mod graph;
pub mod platform;
pub mod util;

pub use config::{ConfigError, EnvConfig};
pub use errors::{CodedError, ErrorCategory, ErrorCode};
pub use graph::{Graph, GraphError, GraphNode};
pub use platform::Platform;

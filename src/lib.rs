pub mod config;
pub mod error;
pub mod georect;
pub mod io;
pub mod pipeline;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod transform;
pub mod types;

pub use error::{FrameSyncError, Result};

//! hopshell-core: Chain-based remote execution
//!
//! Runs a command or an uploaded script on a target through its relay chain,
//! accumulates the outcome into an [`ExecutionRecord`] and persists it.

pub mod config;
pub mod error;
pub mod executor;
pub mod payload;
pub mod probe;
pub mod record;
pub mod recorder;
pub mod report;
pub mod state;

pub use config::{ExecutorConfig, Timeouts};
pub use error::CoreError;
pub use executor::{ChainExecutor, remote_script_path};
pub use payload::ExecutionPayload;
pub use probe::{ProbeStatus, RouteProber};
pub use record::{ExecutionRecord, ExecutionRecordBuilder, Operation, PayloadRecord};
pub use recorder::ExecutionRecorder;
pub use report::{NoopReporter, Reporter, RunEvent};
pub use state::RunPhase;

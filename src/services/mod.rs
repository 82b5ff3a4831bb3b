pub mod convergence_engine;
pub mod observers;
pub mod run_control;
pub mod run_controller;
pub mod sample_loader;

pub use convergence_engine::{ConvergenceEngine, EngineConfig, ResumePoint};
pub use observers::{RecordingObserver, TerminalEvent, TracingObserver};
pub use run_control::RunControl;
pub use run_controller::{classify_outcome, flatten_message, RunController, RunHandle, RUN_IN_PROGRESS};
pub use sample_loader::{LoadReport, SampleLoader};

//! Boolean operations for the plate editor
//!
//! Holds the boolean kernel abstraction, progress and cancellation plumbing,
//! a small task scheduler and the subtract operation with its rebuild
//! pipeline.

pub mod kernel;
pub mod progress;
pub mod subtract;
pub mod tasks;

pub use kernel::{
    BooleanError, BooleanKernel, BooleanResult, ManifoldKernel, NullKernel,
    default_kernel,
};
pub use progress::{CancelToken, ProgressSink, ProgressStatus};
pub use subtract::{RebuildError, RebuildOutcome, SubtractOperation};
pub use tasks::{ExecutionMode, Notice, TaskHandle, TaskScheduler, TaskState};

//! Boolean kernel abstraction
//!
//! The rebuild pipeline only needs mesh subtraction. Kernels implement
//! [`BooleanKernel`]; [`default_kernel`] picks the Manifold kernel.

mod manifold;

pub use manifold::ManifoldKernel;

use std::sync::Arc;

use glam::Mat4;
use pe_core::Mesh;
use thiserror::Error;

use crate::progress::{CancelToken, ProgressSink, ProgressStatus};

/// Error type for boolean operations
#[derive(Debug, Clone, Error)]
pub enum BooleanError {
    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for boolean operations
pub type BooleanResult<T> = Result<T, BooleanError>;

/// Where a single boolean operation sits inside a larger progress range.
///
/// The kernel reports its own completion `f` in `[0, 1]` as
/// `base + weight * f`.
#[derive(Clone, Copy)]
pub struct BooleanProgress<'a> {
    pub sink: Option<&'a dyn ProgressSink>,
    pub weight: f64,
    pub base: f64,
    pub status: &'a str,
}

impl<'a> BooleanProgress<'a> {
    /// Progress that goes nowhere
    pub fn none() -> Self {
        Self {
            sink: None,
            weight: 1.0,
            base: 0.0,
            status: "",
        }
    }

    pub fn new(sink: &'a dyn ProgressSink, base: f64, weight: f64, status: &'a str) -> Self {
        Self {
            sink: Some(sink),
            weight,
            base,
            status,
        }
    }

    /// Report the operation's own completion fraction
    pub fn report(&self, fraction: f64) {
        if let Some(sink) = self.sink {
            let progress = self.base + self.weight * fraction.clamp(0.0, 1.0);
            sink.report(&ProgressStatus::new(progress, self.status));
        }
    }
}

/// Mesh boolean backend.
///
/// Implementations must be deterministic: identical inputs give
/// bit-identical output. They should poll `cancel` and return
/// [`BooleanError::Cancelled`] once it is set.
pub trait BooleanKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool {
        true
    }

    /// Subtract `b` from `a`, each placed by its transform. The result is in
    /// the space both transforms map into.
    #[allow(clippy::too_many_arguments)]
    fn subtract(
        &self,
        a: &Mesh,
        a_transform: &Mat4,
        b: &Mesh,
        b_transform: &Mat4,
        priority: i32,
        progress: &BooleanProgress<'_>,
        cancel: &CancelToken,
    ) -> BooleanResult<Mesh>;
}

/// A kernel that rejects every operation
pub struct NullKernel;

impl BooleanKernel for NullKernel {
    fn name(&self) -> &str {
        "None"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn subtract(
        &self,
        _a: &Mesh,
        _a_transform: &Mat4,
        _b: &Mesh,
        _b_transform: &Mat4,
        _priority: i32,
        _progress: &BooleanProgress<'_>,
        _cancel: &CancelToken,
    ) -> BooleanResult<Mesh> {
        Err(BooleanError::KernelNotAvailable(
            "No boolean kernel configured".into(),
        ))
    }
}

/// Get the default kernel
pub fn default_kernel() -> Arc<dyn BooleanKernel> {
    Arc::new(ManifoldKernel::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressLog;
    use pe_core::primitive::generate_box_mesh;

    #[test]
    fn test_null_kernel() {
        let kernel = NullKernel;
        assert!(!kernel.is_available());
        let mesh = generate_box_mesh([1.0, 1.0, 1.0]);
        let result = kernel.subtract(
            &mesh,
            &Mat4::IDENTITY,
            &mesh,
            &Mat4::IDENTITY,
            1,
            &BooleanProgress::none(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(BooleanError::KernelNotAvailable(_))));
    }

    #[test]
    fn test_default_kernel_available() {
        assert!(default_kernel().is_available());
    }

    #[test]
    fn test_progress_range() {
        let log = ProgressLog::new();
        let progress = BooleanProgress::new(&log, 0.5, 0.25, "Do CSG");
        progress.report(0.0);
        progress.report(2.0);
        let values: Vec<f64> = log.entries().iter().map(|e| e.progress).collect();
        assert_eq!(values, vec![0.5, 0.75]);
    }
}

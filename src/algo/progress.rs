//! Progress reporting for randomization and relaxation.
//!
//! A [`Progress`] forwards `(current, total, message)` updates to a callback.
//! Phases that run inside a larger job report through [`Progress::within`],
//! which maps the phase onto one slot of its parent. A randomization run uses
//! one slot per pass and splits each pass into a spinning half and a relaxing
//! half, so the callback sees one steadily growing count for the whole run.
//!
//! # Example
//!
//! ```
//! use tessel::algo::Progress;
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let progress = Progress::new(move |current, total, _message| {
//!     sink.lock().unwrap().push((current, total));
//! });
//!
//! // Second of two passes, halfway through its relaxation.
//! progress.within(1, 2).within(1, 2).report(5, 10, "Relaxing");
//! assert_eq!(*seen.lock().unwrap(), vec![(875, 1000)]);
//! ```

use std::sync::Arc;

/// Total reported by a [`Progress`] created with [`Progress::within`].
pub const NESTED_STEPS: usize = 1000;

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current phase
///
/// Nested reporters always report out of [`NESTED_STEPS`].
#[derive(Clone)]
pub struct Progress {
    callback: Arc<dyn Fn(usize, usize, &str) + Send + Sync>,
    /// Start and width of this reporter as fractions of the whole job.
    span: Option<(f64, f64)>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            span: None,
        }
    }

    /// Report progress.
    ///
    /// Reports with `total == 0` are dropped by nested reporters.
    pub fn report(&self, current: usize, total: usize, message: &str) {
        match self.span {
            None => (self.callback)(current, total, message),
            Some((start, width)) => {
                if total == 0 {
                    return;
                }
                let done = current.min(total) as f64 / total as f64;
                let step = ((start + width * done) * NESTED_STEPS as f64).round() as usize;
                (self.callback)(step.min(NESTED_STEPS), NESTED_STEPS, message);
            }
        }
    }

    /// A reporter covering slot `index` of `count` equal slots of this one.
    ///
    /// Reporting `total` out of `total` on slot `i` lands where slot `i + 1`
    /// starts.
    pub fn within(&self, index: usize, count: usize) -> Progress {
        let (start, width) = self.span.unwrap_or((0.0, 1.0));
        let slot = width / count.max(1) as f64;
        Progress {
            callback: Arc::clone(&self.callback),
            span: Some((start + slot * index.min(count) as f64, slot)),
        }
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

//! Work-thread creation configuration
//!
//! Compile-time defaults with runtime environment overrides, applied in
//! builder style:
//!
//! ```ignore
//! use std::time::Duration;
//! use wthread::WthreadBuilder;
//!
//! let wt = WthreadBuilder::new("trim")
//!     .wait_time(Duration::from_secs(1))
//!     .stack_size(256 * 1024)
//!     .spawn(activity)?;
//! ```
//!
//! # Environment Variables
//!
//! - `WT_STACK_SIZE` - Default worker stack size in bytes (system default
//!   when unset)

use std::sync::Arc;
use std::time::Duration;

use wthread_core::error::{WtResult, WthreadError};

use crate::activity::Activity;
use crate::worker::Wthread;

/// Smallest stack the builder accepts; anything lower cannot hold the
/// worker loop plus a nontrivial callback frame.
const MIN_STACK_SIZE: usize = 16 * 1024;

/// Default worker stack from `WT_STACK_SIZE` (bytes); unset or
/// unparseable means the platform default.
fn stack_size_from_env() -> Option<usize> {
    std::env::var("WT_STACK_SIZE").ok().and_then(|v| v.parse().ok())
}

/// Builder for [`Wthread`] handles
#[derive(Debug, Clone)]
pub struct WthreadBuilder {
    pub(crate) name: String,
    pub(crate) wait_time: Duration,
    pub(crate) stack_size: Option<usize>,
}

impl WthreadBuilder {
    /// Start a builder for a worker with the given thread name
    ///
    /// The sleep interval defaults to zero (wait only on explicit
    /// wakeup); the stack size defaults to `WT_STACK_SIZE` or, when
    /// unset, the platform default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wait_time: Duration::ZERO,
            stack_size: stack_size_from_env(),
        }
    }

    /// Upper bound on one sleep between check invocations
    ///
    /// Zero means the worker sleeps until an explicit `wakeup`.
    pub fn wait_time(mut self, d: Duration) -> Self {
        self.wait_time = d;
        self
    }

    /// Stack size for the worker thread
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validate the configuration without spawning anything
    pub fn validate(&self) -> WtResult<()> {
        if self.name.is_empty() {
            return Err(WthreadError::InvalidConfig("name must not be empty"));
        }
        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(WthreadError::InvalidConfig("stack_size must be >= 16KB"));
            }
        }
        Ok(())
    }

    /// Validate, allocate the handle, and spawn the worker thread
    ///
    /// On error nothing is left behind: validation failures happen before
    /// any resource is acquired, and a failed thread spawn drops the
    /// partially-built handle.
    pub fn spawn(self, activity: impl Activity + 'static) -> WtResult<Arc<Wthread>> {
        self.validate()?;
        Wthread::spawn_new(self, Box::new(activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let b = WthreadBuilder::new("scrub");
        assert_eq!(b.name, "scrub");
        assert_eq!(b.wait_time, Duration::ZERO);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let b = WthreadBuilder::new("scrub")
            .wait_time(Duration::from_millis(250))
            .stack_size(128 * 1024);
        assert_eq!(b.wait_time, Duration::from_millis(250));
        assert_eq!(b.stack_size, Some(128 * 1024));
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_name() {
        let b = WthreadBuilder::new("");
        assert!(matches!(
            b.validate(),
            Err(WthreadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validation_rejects_tiny_stack() {
        let b = WthreadBuilder::new("scrub").stack_size(1024);
        assert!(matches!(
            b.validate(),
            Err(WthreadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_stack_size_env_parse() {
        std::env::remove_var("WT_STACK_SIZE");
        assert_eq!(stack_size_from_env(), None);

        std::env::set_var("WT_STACK_SIZE", "262144");
        assert_eq!(stack_size_from_env(), Some(262144));

        std::env::set_var("WT_STACK_SIZE", "lots");
        assert_eq!(stack_size_from_env(), None);
        std::env::remove_var("WT_STACK_SIZE");
    }
}

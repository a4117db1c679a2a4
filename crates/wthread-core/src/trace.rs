//! Lifecycle tracing for work threads
//!
//! Silent by default. Setting `WT_TRACE` turns on stderr reporting of
//! what each worker is doing, tagged with the worker's name:
//!
//! - `WT_TRACE=lifecycle` - creation, resume, cancel, and exit events
//! - `WT_TRACE=sleep` - lifecycle events plus every sleep transition
//!
//! ```text
//! wthread[reclaim]: worker running
//! wthread[reclaim]: sleeping until signaled
//! wthread[reclaim]: cancel requested
//! wthread[reclaim]: worker exited
//! ```

use std::io::Write;
use std::sync::OnceLock;

/// How much of a worker's life gets reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No output
    Off,
    /// Worker creation, resume, cancel, and exit
    Lifecycle,
    /// Lifecycle events plus each sleep entry
    Sleep,
}

static VERBOSITY: OnceLock<Verbosity> = OnceLock::new();

fn parse(val: Option<&str>) -> Verbosity {
    match val {
        Some("lifecycle") | Some("1") => Verbosity::Lifecycle,
        Some("sleep") | Some("2") => Verbosity::Sleep,
        _ => Verbosity::Off,
    }
}

/// Verbosity in effect, resolved from `WT_TRACE` on first use
pub fn verbosity() -> Verbosity {
    *VERBOSITY.get_or_init(|| parse(std::env::var("WT_TRACE").ok().as_deref()))
}

/// Write one report line for the named worker
///
/// Locked so a line from the worker and a line from a requester cannot
/// interleave. stderr is unbuffered; nothing further to flush.
#[doc(hidden)]
pub fn emit(level: Verbosity, name: &str, args: std::fmt::Arguments<'_>) {
    if verbosity() < level {
        return;
    }
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(out, "wthread[{}]: {}", name, args);
}

/// Report a lifecycle event (create/resume/cancel/exit) for a worker
#[macro_export]
macro_rules! wt_lifecycle {
    ($name:expr, $($arg:tt)*) => {{
        $crate::trace::emit(
            $crate::trace::Verbosity::Lifecycle,
            $name,
            format_args!($($arg)*),
        );
    }};
}

/// Report a sleep transition for a worker
#[macro_export]
macro_rules! wt_sleep {
    ($name:expr, $($arg:tt)*) => {{
        $crate::trace::emit(
            $crate::trace::Verbosity::Sleep,
            $name,
            format_args!($($arg)*),
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordered() {
        assert!(Verbosity::Off < Verbosity::Lifecycle);
        assert!(Verbosity::Lifecycle < Verbosity::Sleep);
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse(None), Verbosity::Off);
        assert_eq!(parse(Some("lifecycle")), Verbosity::Lifecycle);
        assert_eq!(parse(Some("1")), Verbosity::Lifecycle);
        assert_eq!(parse(Some("sleep")), Verbosity::Sleep);
        assert_eq!(parse(Some("2")), Verbosity::Sleep);
        assert_eq!(parse(Some("garbage")), Verbosity::Off);
    }

    #[test]
    fn test_macros_compile() {
        // Silent unless WT_TRACE is set in the test environment.
        wt_lifecycle!("w0", "created");
        wt_sleep!("w0", "sleeping up to {:?}", std::time::Duration::from_millis(10));
    }
}

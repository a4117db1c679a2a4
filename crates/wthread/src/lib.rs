//! # wthread - Managed Background Work Threads
//!
//! A work thread (WT) runs one isolated, long-lived activity on its own
//! OS thread: it wakes when there is work, sleeps when there is not, can
//! be cancelled safely even mid-work, resumed later, and finally
//! destroyed. It fits activities that span many internal epochs of the
//! host (background reclamation, scrubbing, trimming) and that have a
//! single authoritative work indicator owned by the host.
//!
//! ## The work indicator
//!
//! The primitive carries no queue. The host owns one logical "there is
//! work" bit, consulted by the check callback, under two rules:
//!
//! 1. Any thread except the worker may flip the indicator from stopped
//!    to running, never the opposite.
//! 2. Only the worker flips it from running back to stopped (when the
//!    work is done), never the opposite.
//!
//! A normal cycle: an external thread raises the indicator and calls
//! [`Wthread::wakeup`]; the worker wakes, sees the indicator through its
//! check callback, and works; when done it lowers the indicator and goes
//! back to sleep. A worker can also be created with
//! [`Wthread::create_timed`] to wake on its own at an interval.
//!
//! ## Why two callbacks
//!
//! The check callback runs with the handle's internal state lock held,
//! the work callback with no lock at all. Holding the lock across check
//! means the decision "is there work" cannot race with a cancel; keeping
//! the lock out of work means a long work item never blocks the request
//! surface. One combined callback could not have both properties.
//!
//! Check must therefore be prompt and must not reenter the handle; work
//! may run as long as it likes and may poll [`Wthread::is_cancelled`] so
//! a pending cancel is honored early.
//!
//! ## Worker life cycle
//!
//! ```text
//!         create / resume
//!               |
//!               v
//!      +--> cancelled? --yes--> clear identity, stop
//!      |        |
//!      |       no
//!      |        v
//!      |     check? --false--> sleep (until wakeup or
//!      |        |              interval), then loop
//!      |      true
//!      |        v
//!      +------ work
//! ```
//!
//! Cancelling keeps the handle's callbacks and locks intact so it can be
//! resumed later. Full teardown is a cancel followed by
//! [`Wthread::destroy`]:
//!
//! ```ignore
//! use wthread::{FnActivity, Wthread};
//!
//! let wt = Wthread::create("reclaim", activity)?;
//! // ... host runs; other threads call wt.wakeup() ...
//! wt.cancel();   // blocks until the worker has exited
//! wt.destroy();
//! ```
//!
//! Long work items that need to react to cancellation promptly:
//!
//! ```ignore
//! fn run(&self, wt: &Wthread) {
//!     while !self.work_done() && !wt.is_cancelled() {
//!         self.do_some_work();
//!     }
//! }
//! ```
//!
//! Work threads are not a replacement for plain threads; make sure the
//! single-indicator model fits before reaching for one.

pub mod activity;
pub mod builder;
pub mod worker;

pub use activity::{Activity, FnActivity};
pub use builder::WthreadBuilder;
pub use worker::Wthread;

// Re-export the support crate surface so hosts depend on one crate.
pub use wthread_core::error::{WtResult, WthreadError};

//! Check/work callback surface for work threads
//!
//! A work thread alternates between a *check* callback that decides whether
//! there is work pending and a *work* callback that performs it. Both are
//! supplied by the host as one [`Activity`] implementation; the
//! implementor's own fields play the role of the opaque host argument.

use crate::worker::Wthread;

/// Host-supplied callbacks driven by a work thread
///
/// # Contract
///
/// `check` is invoked with the handle's internal state lock held. It must
/// return promptly, must not call back into the handle, and must not take
/// any lock that a `wakeup`/`cancel`/`resume` caller could hold while
/// blocked on the handle. It may freely consult host state under host
/// locks that respect that rule.
///
/// `run` is invoked with no handle lock held and may take arbitrarily
/// long. Its only permitted reentry into the handle is
/// [`Wthread::is_cancelled`], which long-running implementations should
/// poll so that a pending `cancel` is honored without waiting for the
/// work item to finish on its own.
///
/// The handle guarantees `check` and `run` are never invoked concurrently
/// with each other.
pub trait Activity: Send + Sync {
    /// Report whether there is work pending
    ///
    /// Work threads can wake up spuriously, so this must tolerate being
    /// invoked when nothing has changed since the last call.
    fn check(&self, wt: &Wthread) -> bool;

    /// Perform the pending work
    fn run(&self, wt: &Wthread);
}

/// Closure-based [`Activity`] for hosts that do not want a named type
///
/// Shared state goes into the closures' captures:
///
/// ```ignore
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use wthread::{FnActivity, Wthread};
///
/// let pending = Arc::new(AtomicU64::new(0));
/// let (p1, p2) = (pending.clone(), pending.clone());
///
/// let wt = Wthread::create(
///     "reclaim",
///     FnActivity::new(
///         move |_| p1.load(Ordering::SeqCst) > 0,
///         move |_| { p2.fetch_sub(1, Ordering::SeqCst); },
///     ),
/// )?;
/// ```
pub struct FnActivity<C, W> {
    check: C,
    work: W,
}

impl<C, W> FnActivity<C, W>
where
    C: Fn(&Wthread) -> bool + Send + Sync,
    W: Fn(&Wthread) + Send + Sync,
{
    /// Wrap a check closure and a work closure
    pub fn new(check: C, work: W) -> Self {
        Self { check, work }
    }
}

impl<C, W> Activity for FnActivity<C, W>
where
    C: Fn(&Wthread) -> bool + Send + Sync,
    W: Fn(&Wthread) + Send + Sync,
{
    fn check(&self, wt: &Wthread) -> bool {
        (self.check)(wt)
    }

    fn run(&self, wt: &Wthread) {
        (self.work)(wt)
    }
}

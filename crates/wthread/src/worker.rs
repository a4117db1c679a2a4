//! Work-thread handle, worker loop, and request surface
//!
//! # Design
//!
//! A [`Wthread`] owns one dedicated worker thread (or none, when stopped).
//! The worker alternates between the host's check callback and work
//! callback, sleeping in between. External threads drive it through
//! `wakeup`, `cancel`, and `resume`.
//!
//! # Locking
//!
//! Two mutexes guard the handle:
//!
//! - the *request* lock serializes external requests, so each requester
//!   sees the handle in a settled state on entry;
//! - the *state* lock protects the mutable state (`thread`, `cancel`) and
//!   anchors the condvar used both for timed sleep and for the
//!   cancel/exit handoff.
//!
//! Requests take the request lock strictly before the state lock and
//! release in reverse order. The worker loop takes only the state lock.
//! That ordering is the single locking invariant; nothing else is allowed.
//!
//! The check callback runs with the state lock held, which freezes the
//! cancel/resume surface while the host decides whether there is work.
//! The work callback runs with no lock held and can therefore overlap a
//! `cancel` request, which it observes through [`Wthread::is_cancelled`].

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use wthread_core::error::WtResult;
use wthread_core::{wt_lifecycle, wt_sleep};

use crate::activity::Activity;
use crate::builder::WthreadBuilder;

/// Mutable worker state, guarded by the state lock
struct WtState {
    /// Identity of the running worker thread, `None` when stopped
    thread: Option<ThreadId>,

    /// True while a cancel request is pending. Set by `cancel`, cleared
    /// only by the worker, atomically with clearing `thread` on exit.
    cancel: bool,
}

/// Handle to a managed background work thread
///
/// Created by [`Wthread::create`], [`Wthread::create_timed`], or
/// [`WthreadBuilder::spawn`]; the worker thread holds its own reference,
/// so the handle's storage outlives the worker's exit path no matter when
/// the host drops its clones.
pub struct Wthread {
    /// Worker thread name, also used in log lines
    name: String,

    /// Maximum time spent in one sleep; zero means the worker does not
    /// wake up until it is signaled
    wait_time: Duration,

    /// Stack size handed to `thread::Builder`, if configured
    stack_size: Option<usize>,

    /// Host-provided check/work callbacks and their state
    activity: Box<dyn Activity>,

    /// Back-reference handed to each spawned worker so the worker owns a
    /// strong reference to its own handle
    weak_self: Weak<Wthread>,

    /// Serializes external requests
    request: Mutex<()>,

    /// Protects `WtState` and anchors `cv`
    state: Mutex<WtState>,

    /// Notification mechanism for requests and worker exit
    cv: Condvar,
}

impl Wthread {
    /// Create a work thread that sleeps until explicitly woken
    ///
    /// Equivalent to [`Wthread::create_timed`] with a zero interval. The
    /// worker is running when this returns; its first action is to invoke
    /// the check callback.
    pub fn create(
        name: impl Into<String>,
        activity: impl Activity + 'static,
    ) -> WtResult<Arc<Self>> {
        WthreadBuilder::new(name).spawn(activity)
    }

    /// Create a work thread that additionally wakes on its own every
    /// `wait_time`
    ///
    /// The interval is an upper bound between check invocations when no
    /// wakeup arrives; early wakeups are allowed and harmless.
    pub fn create_timed(
        name: impl Into<String>,
        activity: impl Activity + 'static,
        wait_time: Duration,
    ) -> WtResult<Arc<Self>> {
        WthreadBuilder::new(name).wait_time(wait_time).spawn(activity)
    }

    /// Allocate the handle and spawn the first worker (builder entry point)
    pub(crate) fn spawn_new(
        builder: WthreadBuilder,
        activity: Box<dyn Activity>,
    ) -> WtResult<Arc<Self>> {
        let wt = Arc::new_cyclic(|weak| Wthread {
            name: builder.name,
            wait_time: builder.wait_time,
            stack_size: builder.stack_size,
            activity,
            weak_self: weak.clone(),
            request: Mutex::new(()),
            state: Mutex::new(WtState {
                thread: None,
                cancel: false,
            }),
            cv: Condvar::new(),
        });

        // Hold the state lock across the spawn so the worker blocks on
        // loop entry until its identity is recorded. A spawn failure
        // drops the only reference and frees everything.
        let mut state = wt.lock_state();
        state.thread = Some(wt.spawn_worker()?);
        drop(state);

        wt_lifecycle!(&wt.name, "created");
        Ok(wt)
    }

    /// Wake the worker if it is sleeping
    ///
    /// This is a hint, not a guarantee. The broadcast can land on the
    /// worker in four states:
    ///
    /// 1. asleep - the common case; the worker wakes and re-runs check;
    /// 2. cancelled - a no-op; leftover work is picked up after a resume;
    /// 3. mid-work - a no-op, the worker is already up;
    /// 4. freshly created/resumed - same as 3.
    pub fn wakeup(&self) {
        let _req = self.lock_request();
        let _state = self.lock_state();
        self.cv.notify_all();
    }

    /// Request cancellation and block until the worker has exited
    ///
    /// If the worker is already stopped this is a no-op. Otherwise the
    /// cancel flag is raised, the condvar is broadcast in case the worker
    /// is sleeping, and the caller waits for the worker to clear its
    /// thread identity on the way out. Because requests are serialized,
    /// the worker is stopped by the time control returns.
    ///
    /// The handle stays fully intact and can be restarted with
    /// [`Wthread::resume`].
    pub fn cancel(&self) {
        let _req = self.lock_request();
        let mut state = self.lock_state();

        if state.thread.is_none() {
            return;
        }

        wt_lifecycle!(&self.name, "cancel requested");
        state.cancel = true;

        // Broadcast in case the worker is sleeping.
        self.cv.notify_all();

        while state.thread.is_some() {
            state = self.wait(state);
        }
        debug_assert!(!state.cancel);

        wt_lifecycle!(&self.name, "cancel complete");
    }

    /// Restart a cancelled work thread
    ///
    /// If a worker already exists this is a no-op: the handle may be live
    /// because it was never cancelled, or because a previous resume beat
    /// this one to it. A pending cancel cannot be observed here since a
    /// cancel holds the request lock until its worker has exited.
    pub fn resume(&self) -> WtResult<()> {
        let _req = self.lock_request();
        let mut state = self.lock_state();

        debug_assert!(!state.cancel);

        if state.thread.is_none() {
            state.thread = Some(self.spawn_worker()?);
            wt_lifecycle!(&self.name, "resumed");
        }
        Ok(())
    }

    /// Poll for a pending cancel from inside the work callback
    ///
    /// Meant to be called by the worker thread itself during a long work
    /// item so that a `cancel` does not have to wait for the item to run
    /// to completion.
    ///
    /// Deliberately takes only the state lock. A concurrent `cancel`
    /// holds the request lock while it waits for the worker to finish;
    /// taking the request lock here would make the worker block on the
    /// very caller that is blocked on the worker. Reading under the state
    /// lock alone is sound because the request surface is the only other
    /// writer of the flag and it writes under that same lock.
    pub fn is_cancelled(&self) -> bool {
        let state = self.lock_state();
        debug_assert_eq!(
            state.thread,
            Some(thread::current().id()),
            "is_cancelled() called from outside the worker thread"
        );
        state.cancel
    }

    /// Worker thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the handle
    ///
    /// The worker must already be stopped; cancel first. The canonical
    /// teardown is `wt.cancel(); wt.destroy();`. The backing storage is
    /// freed once the worker's own reference is gone, which is no later
    /// than its thread termination.
    pub fn destroy(self: Arc<Self>) {
        let state = self.lock_state();
        assert!(
            state.thread.is_none(),
            "destroy() on work thread '{}' that is still running",
            self.name
        );
        debug_assert!(!state.cancel);
        drop(state);
        wt_lifecycle!(&self.name, "destroyed");
    }

    // ========================================================================
    // Worker loop
    // ========================================================================

    /// Spawn a worker bound to this handle and return its identity
    ///
    /// Callers hold the state lock, so the new worker parks on loop entry
    /// until the returned identity has been recorded.
    fn spawn_worker(&self) -> std::io::Result<ThreadId> {
        // Every caller reaches this method through a live Arc, so the
        // upgrade cannot fail.
        let wt = self.weak_self.upgrade().expect("work-thread handle gone");
        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        let handle = builder.spawn(move || wt.worker_loop())?;
        Ok(handle.thread().id())
    }

    /// Procedure run on the dedicated worker thread
    ///
    /// Holds the state lock continuously except while executing the work
    /// callback.
    fn worker_loop(&self) {
        let mut state = self.lock_state();
        debug_assert_eq!(state.thread, Some(thread::current().id()));

        wt_lifecycle!(&self.name, "worker running");

        while !state.cancel {
            if self.activity.check(self) {
                drop(state);
                self.activity.run(self);
                state = self.lock_state();
            } else if self.wait_time.is_zero() {
                wt_sleep!(&self.name, "sleeping until signaled");
                state = self.wait(state);
            } else {
                wt_sleep!(&self.name, "sleeping up to {:?}", self.wait_time);
                state = self
                    .cv
                    .wait_timeout(state, self.wait_time)
                    .expect("work-thread state lock poisoned")
                    .0;
            }
        }

        // Clear out the thread metadata and notify the cancel() caller
        // that we have stopped running. Both fields change in the same
        // critical section; no lock release separates them.
        state.thread = None;
        state.cancel = false;
        self.cv.notify_all();
        drop(state);

        wt_lifecycle!(&self.name, "worker exited");
    }

    // ========================================================================
    // Lock plumbing
    // ========================================================================

    fn lock_request(&self) -> MutexGuard<'_, ()> {
        self.request
            .lock()
            .expect("work-thread request lock poisoned")
    }

    fn lock_state(&self) -> MutexGuard<'_, WtState> {
        self.state.lock().expect("work-thread state lock poisoned")
    }

    fn wait<'a>(&self, state: MutexGuard<'a, WtState>) -> MutexGuard<'a, WtState> {
        self.cv
            .wait(state)
            .expect("work-thread state lock poisoned")
    }

    /// Observe (running, cancel-pending) under the state lock
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> (bool, bool) {
        let state = self.lock_state();
        (state.thread.is_some(), state.cancel)
    }
}

impl fmt::Debug for Wthread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock() {
            Ok(state) => f
                .debug_struct("Wthread")
                .field("name", &self.name)
                .field("running", &state.thread.is_some())
                .field("cancel", &state.cancel)
                .finish(),
            Err(_) => f
                .debug_struct("Wthread")
                .field("name", &self.name)
                .field("state", &"<locked>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::FnActivity;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::time::Instant;

    /// Poll `f` every few milliseconds until it holds or `limit` expires
    fn wait_until(limit: Duration, f: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        f()
    }

    /// Small deterministic PRNG for the stress test
    fn xorshift(state: &mut u64) -> u64 {
        let mut x = *state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        *state = x;
        x
    }

    #[test]
    fn test_basic_wake_drains_counter() {
        let counter = Arc::new(AtomicI64::new(3));
        let (c1, c2) = (counter.clone(), counter.clone());

        let wt = Wthread::create(
            "test-drain",
            FnActivity::new(
                move |_| c1.load(Ordering::SeqCst) > 0,
                move |_| {
                    c2.fetch_sub(1, Ordering::SeqCst);
                },
            ),
        )
        .unwrap();

        wt.wakeup();

        assert!(wait_until(Duration::from_secs(5), || counter
            .load(Ordering::SeqCst)
            == 0));
        assert_eq!(wt.snapshot(), (true, false));

        wt.cancel();
        assert_eq!(wt.snapshot(), (false, false));
        wt.destroy();
    }

    #[test]
    fn test_timed_self_wake() {
        let checks = Arc::new(AtomicUsize::new(0));
        let c = checks.clone();

        let wt = Wthread::create_timed(
            "test-timer",
            FnActivity::new(
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                    false
                },
                |_| {},
            ),
            Duration::from_millis(10),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(200));

        // ~20 expected at a 10ms interval; allow scheduler slack on both
        // sides plus spurious early wakeups on the high side.
        let n = checks.load(Ordering::SeqCst);
        assert!(n >= 8, "only {} checks in 200ms", n);
        assert!(n <= 80, "{} checks in 200ms", n);

        let start = Instant::now();
        wt.cancel();
        assert!(start.elapsed() < Duration::from_millis(500));

        assert_eq!(wt.snapshot(), (false, false));
        wt.destroy();
    }

    #[test]
    fn test_cancel_during_long_work() {
        let has_work = Arc::new(AtomicBool::new(true));
        let in_work = Arc::new(AtomicBool::new(false));
        let (hw, iw) = (has_work.clone(), in_work.clone());

        let wt = Wthread::create(
            "test-longwork",
            FnActivity::new(
                move |_| hw.swap(false, Ordering::SeqCst),
                move |wt| {
                    iw.store(true, Ordering::SeqCst);
                    while !wt.is_cancelled() {
                        thread::yield_now();
                    }
                },
            ),
        )
        .unwrap();

        // Let the worker get into the busy work item first.
        assert!(wait_until(Duration::from_secs(5), || in_work
            .load(Ordering::SeqCst)));

        wt.cancel();
        assert_eq!(wt.snapshot(), (false, false));
        wt.destroy();
    }

    #[test]
    fn test_resume_after_cancel() {
        let has_work = Arc::new(AtomicBool::new(false));
        let work_runs = Arc::new(AtomicUsize::new(0));
        let (hw, wr) = (has_work.clone(), work_runs.clone());

        let wt = Wthread::create(
            "test-resume",
            FnActivity::new(
                move |_| hw.swap(false, Ordering::SeqCst),
                move |_| {
                    wr.fetch_add(1, Ordering::SeqCst);
                },
            ),
        )
        .unwrap();

        wt.cancel();
        assert_eq!(wt.snapshot(), (false, false));

        wt.resume().unwrap();
        assert_eq!(wt.snapshot(), (true, false));

        // A resumed worker picks up the check/work cycle again.
        has_work.store(true, Ordering::SeqCst);
        wt.wakeup();
        assert!(wait_until(Duration::from_secs(5), || work_runs
            .load(Ordering::SeqCst)
            >= 1));

        wt.cancel();
        wt.destroy();
    }

    #[test]
    fn test_cancel_idempotent() {
        let wt = Wthread::create("test-idem", FnActivity::new(|_| false, |_| {})).unwrap();

        wt.cancel();
        wt.cancel();
        assert_eq!(wt.snapshot(), (false, false));

        // A wakeup on a stopped handle is a defined no-op.
        wt.wakeup();
        assert_eq!(wt.snapshot(), (false, false));
        wt.destroy();
    }

    #[test]
    fn test_resume_running_is_noop() {
        let wt = Wthread::create("test-noop", FnActivity::new(|_| false, |_| {})).unwrap();

        wt.resume().unwrap();
        wt.resume().unwrap();
        assert_eq!(wt.snapshot(), (true, false));

        wt.cancel();
        wt.destroy();
    }

    #[test]
    fn test_wakeup_triggers_check() {
        let checks = Arc::new(AtomicUsize::new(0));
        let c = checks.clone();

        let wt = Wthread::create(
            "test-wake",
            FnActivity::new(
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                    false
                },
                |_| {},
            ),
        )
        .unwrap();

        // The worker checks once on startup, then parks (zero interval).
        assert!(wait_until(Duration::from_secs(5), || checks
            .load(Ordering::SeqCst)
            >= 1));
        let before = checks.load(Ordering::SeqCst);

        wt.wakeup();
        assert!(wait_until(Duration::from_secs(5), || checks
            .load(Ordering::SeqCst)
            > before));

        wt.cancel();
        wt.destroy();
    }

    #[test]
    fn test_concurrent_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let (ca, li) = (calls.clone(), live.clone());

        let wt = Wthread::create(
            "test-stress",
            FnActivity::new(
                move |_| ca.fetch_add(1, Ordering::SeqCst) % 7 == 0,
                move |_| {
                    // Never more than one worker may be in the work
                    // callback for a single handle.
                    let entrants = li.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(entrants, 0);
                    thread::sleep(Duration::from_micros(100));
                    li.fetch_sub(1, Ordering::SeqCst);
                },
            ),
        )
        .unwrap();

        let mut requesters = Vec::new();
        for i in 0..10u64 {
            let wt = Arc::clone(&wt);
            requesters.push(thread::spawn(move || {
                let mut rng = i.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
                for _ in 0..100 {
                    match xorshift(&mut rng) % 3 {
                        0 => wt.wakeup(),
                        1 => wt.cancel(),
                        _ => wt.resume().unwrap(),
                    }
                }
            }));
        }
        for r in requesters {
            r.join().unwrap();
        }

        wt.cancel();
        assert_eq!(wt.snapshot(), (false, false));
        wt.destroy();
    }

    #[test]
    fn test_destroy_after_cancel() {
        let wt = Wthread::create("test-destroy", FnActivity::new(|_| false, |_| {})).unwrap();
        wt.cancel();
        wt.destroy();
    }

    #[test]
    #[should_panic(expected = "still running")]
    fn test_destroy_running_panics() {
        let wt = Wthread::create("test-destroy-live", FnActivity::new(|_| false, |_| {})).unwrap();
        wt.destroy();
    }

    #[test]
    fn test_debug_format() {
        let wt = Wthread::create("test-debug", FnActivity::new(|_| false, |_| {})).unwrap();
        let s = format!("{:?}", wt);
        assert!(s.contains("test-debug"));
        wt.cancel();
        wt.destroy();
    }
}

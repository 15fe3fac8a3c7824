//! Transition scheduler
//!
//! Tick-driven timer service for phase completions. Machines register
//! one-shot timers when a phase begins; the host pumps `tick(dt_ms)` from its
//! update cycle, and due callbacks fire after the internal lock is released
//! so they may re-enter the scheduler (e.g. to start the opposite phase).
//!
//! A delay of zero fires on the *next* tick, never inline at schedule time.
//! This preserves the guarantee that phase-start callbacks always precede
//! phase-end callbacks even for instantaneous transitions.

use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex, Weak};

new_key_type! {
    /// Handle to a scheduled one-shot timer
    pub struct TimerId;
}

/// Callback invoked when a timer becomes due.
type TimerCallback = Box<dyn FnOnce() + Send>;

/// Callback for waking up the host when a timer is scheduled on an idle queue.
///
/// Use this to request another update cycle from an event loop that only
/// ticks while work is pending.
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

struct Timer {
    remaining_ms: f32,
    callback: Option<TimerCallback>,
}

struct SchedulerInner {
    timers: SlotMap<TimerId, Timer>,
    wake_callback: Option<WakeCallback>,
}

/// The scheduler that advances all pending phase timers.
///
/// Typically owned by the host application; machines hold a [`SchedulerHandle`]
/// and register timers implicitly when a phase begins.
pub struct TransitionScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                timers: SlotMap::with_key(),
                wake_callback: None,
            })),
        }
    }

    /// Set a wake callback invoked when a timer is scheduled while the queue
    /// was empty.
    pub fn set_wake_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.lock().unwrap().wake_callback = Some(Arc::new(callback));
    }

    /// Advance logical time and fire due timers.
    ///
    /// Returns true if timers remain pending (the host should keep ticking).
    pub fn tick(&self, dt_ms: f32) -> bool {
        let due: Vec<TimerCallback> = {
            let mut inner = self.inner.lock().unwrap();

            let mut due_ids = Vec::new();
            for (id, timer) in inner.timers.iter_mut() {
                timer.remaining_ms -= dt_ms;
                if timer.remaining_ms <= 0.0 {
                    due_ids.push(id);
                }
            }

            due_ids
                .into_iter()
                .filter_map(|id| inner.timers.remove(id).and_then(|t| t.callback))
                .collect()
        };

        // Fire outside the lock: completions may schedule or cancel timers.
        for callback in due {
            callback();
        }

        !self.inner.lock().unwrap().timers.is_empty()
    }

    /// Check if any timers are pending.
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().unwrap().timers.is_empty()
    }

    /// Get the number of pending timers.
    pub fn timer_count(&self) -> usize {
        self.inner.lock().unwrap().timers.len()
    }

    /// Get a handle to this scheduler for passing to machines.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for TransitionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to the transition scheduler.
///
/// Passed to machines so they can register phase timers. It won't prevent the
/// scheduler from being dropped; operations on a dead scheduler are safe
/// no-ops.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Register a one-shot timer and return its ID.
    ///
    /// Returns None if the scheduler has been dropped.
    pub fn schedule<F>(&self, delay_ms: u32, callback: F) -> Option<TimerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let inner = self.inner.upgrade()?;
        let (id, wake) = {
            let mut inner = inner.lock().unwrap();
            let was_idle = inner.timers.is_empty();
            let id = inner.timers.insert(Timer {
                remaining_ms: delay_ms as f32,
                callback: Some(Box::new(callback)),
            });
            let wake = if was_idle {
                inner.wake_callback.clone()
            } else {
                None
            };
            (id, wake)
        };

        // Fire outside the lock: the wake may re-enter the scheduler.
        if let Some(wake) = wake {
            wake();
        }
        Some(id)
    }

    /// Cancel a pending timer. No-op if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().unwrap().timers.remove(id);
        }
    }

    /// Check if the scheduler is still alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

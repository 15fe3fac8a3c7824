//! Per-child transition state machine
//!
//! A `TransitionMachine` owns one child's lifecycle state and drives its
//! observer through the phase callbacks:
//!
//! ```text
//! request_enter:  on_enter → Entering → on_entering → ... → Entered → on_entered
//! request_exit:   on_exit  → Exiting  → on_exiting  → ... → Exited  → on_exited
//! ```
//!
//! Phase completion comes from a scheduler timer (when a timeout is
//! configured) or from an external [`CompletionToken`] (when the host knows
//! when its animation is done). Reversing direction mid-phase cancels the
//! abandoned phase's completion: every direction change bumps a generation
//! counter, and a completion carrying a stale generation is a silent no-op.
//! This is the guard against the race where a callback captured for one
//! direction fires after the opposite direction has already started.

use crate::scheduler::{SchedulerHandle, TimerId};
use crate::state::{Direction, TransitionState};
use std::sync::{Arc, Mutex, Weak};

/// Lifecycle observer for one child.
///
/// Implementations close over whatever rendered node they control; the
/// machine only reports *when* each phase boundary is crossed. `appearing` is
/// true only for the first enter of a child that was already present when
/// tracking began with appear behavior enabled.
///
/// Observers are invoked synchronously from machine operations and scheduler
/// ticks and must not call back into the machine.
pub trait TransitionObserver: Send {
    fn on_enter(&mut self, appearing: bool) {
        let _ = appearing;
    }
    fn on_entering(&mut self, appearing: bool) {
        let _ = appearing;
    }
    fn on_entered(&mut self, appearing: bool) {
        let _ = appearing;
    }
    fn on_exit(&mut self) {}
    fn on_exiting(&mut self) {}
    fn on_exited(&mut self) {}
}

/// No-op observer for machines whose state is only polled.
impl TransitionObserver for () {}

/// Phase durations in milliseconds.
///
/// `None` means the phase has no timer and waits for an external completion
/// token. If neither a timeout nor a token completion arrives, the machine
/// stays mid-phase indefinitely; that is a caller configuration error and is
/// not recovered internally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub enter: Option<u32>,
    pub exit: Option<u32>,
}

impl Timeouts {
    pub fn new(enter: Option<u32>, exit: Option<u32>) -> Self {
        Self { enter, exit }
    }

    /// Same duration for both phases.
    pub fn uniform(ms: u32) -> Self {
        Self {
            enter: Some(ms),
            exit: Some(ms),
        }
    }

    /// No timers; both phases await external completion.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Per-child transition configuration.
///
/// `enter: false` / `exit: false` skip the corresponding phase's wait and
/// callbacks entirely, jumping straight to the terminal state.
#[derive(Clone, Debug)]
pub struct TransitionConfig {
    /// Run the enter transition for a child already present when tracking begins
    pub appear: bool,
    /// Run the enter phase (false jumps directly to Entered)
    pub enter: bool,
    /// Run the exit phase (false jumps directly to Exited)
    pub exit: bool,
    /// Phase durations; None awaits an external completion token
    pub timeouts: Timeouts,
    /// Stay Unmounted until the first enter request
    pub mount_on_enter: bool,
    /// Fall through to Unmounted after the exit completes
    pub unmount_on_exit: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            appear: false,
            enter: true,
            exit: true,
            timeouts: Timeouts::none(),
            mount_on_enter: false,
            unmount_on_exit: false,
        }
    }
}

impl TransitionConfig {
    pub fn appear(mut self, appear: bool) -> Self {
        self.appear = appear;
        self
    }

    pub fn enter(mut self, enter: bool) -> Self {
        self.enter = enter;
        self
    }

    pub fn exit(mut self, exit: bool) -> Self {
        self.exit = exit;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn mount_on_enter(mut self, mount_on_enter: bool) -> Self {
        self.mount_on_enter = mount_on_enter;
        self
    }

    pub fn unmount_on_exit(mut self, unmount_on_exit: bool) -> Self {
        self.unmount_on_exit = unmount_on_exit;
        self
    }
}

/// Single-shot completion token for externally signalled phase ends.
///
/// Obtained via [`TransitionMachine::completion_token`] while a phase is in
/// progress and redeemed with [`TransitionMachine::complete`]. A token minted
/// before a direction reversal (or already redeemed) is a safe no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionToken {
    generation: u64,
}

struct MachineInner {
    state: TransitionState,
    direction: Option<Direction>,
    generation: u64,
    appearing: bool,
    config: TransitionConfig,
    observer: Box<dyn TransitionObserver>,
    scheduler: SchedulerHandle,
    pending_timer: Option<TimerId>,
    exited_callback: Option<Box<dyn FnMut() + Send>>,
    self_weak: Weak<Mutex<MachineInner>>,
}

impl MachineInner {
    fn request_enter(&mut self, appearing: bool) {
        if matches!(
            self.state,
            TransitionState::Entered | TransitionState::Entering
        ) {
            return;
        }

        self.generation += 1;
        self.cancel_pending_timer();
        self.direction = Some(Direction::Enter);

        // Mount first if the child has never been rendered
        if self.state == TransitionState::Unmounted {
            self.state = TransitionState::Exited;
        }

        if !self.config.enter {
            self.state = TransitionState::Entered;
            self.appearing = false;
            self.direction = None;
            return;
        }

        self.appearing = appearing;
        self.observer.on_enter(appearing);
        self.state = TransitionState::Entering;
        self.observer.on_entering(appearing);
        tracing::debug!(appearing, "transition: entering");
        self.schedule_completion(self.config.timeouts.enter);
    }

    fn request_exit(&mut self) {
        if matches!(
            self.state,
            TransitionState::Exited | TransitionState::Exiting | TransitionState::Unmounted
        ) {
            return;
        }

        self.generation += 1;
        self.cancel_pending_timer();
        self.direction = Some(Direction::Exit);

        if !self.config.exit {
            self.finish_exit_silently();
            return;
        }

        self.observer.on_exit();
        self.state = TransitionState::Exiting;
        self.observer.on_exiting();
        tracing::debug!("transition: exiting");
        self.schedule_completion(self.config.timeouts.exit);
    }

    fn cancel(&mut self) {
        self.generation += 1;
        self.cancel_pending_timer();
        self.direction = None;
    }

    /// Exit-phase skip: terminal state without phase callbacks, but the
    /// registry notification still runs so removal can proceed.
    fn finish_exit_silently(&mut self) {
        self.state = if self.config.unmount_on_exit {
            TransitionState::Unmounted
        } else {
            TransitionState::Exited
        };
        self.direction = None;
        if let Some(callback) = self.exited_callback.as_mut() {
            callback();
        }
    }

    fn schedule_completion(&mut self, timeout_ms: Option<u32>) {
        // No timeout: the phase awaits an external completion token.
        let Some(ms) = timeout_ms else {
            return;
        };

        let generation = self.generation;
        let weak = self.self_weak.clone();
        self.pending_timer = self.scheduler.schedule(ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().unwrap().complete_phase(generation);
            }
        });
    }

    fn complete_phase(&mut self, generation: u64) {
        if generation != self.generation {
            tracing::debug!("transition: stale completion discarded");
            return;
        }
        self.cancel_pending_timer();

        match self.state {
            TransitionState::Entering => {
                self.state = TransitionState::Entered;
                self.direction = None;
                let appearing = self.appearing;
                self.appearing = false;
                self.observer.on_entered(appearing);
            }
            TransitionState::Exiting => {
                self.state = TransitionState::Exited;
                self.direction = None;
                self.observer.on_exited();
                if self.config.unmount_on_exit {
                    self.state = TransitionState::Unmounted;
                }
                if let Some(callback) = self.exited_callback.as_mut() {
                    callback();
                }
            }
            // Duplicate completion for an already-finished phase
            _ => {}
        }
    }

    fn cancel_pending_timer(&mut self) {
        if let Some(id) = self.pending_timer.take() {
            self.scheduler.cancel(id);
        }
    }
}

/// State machine for one logical child instance.
///
/// Exclusively owned by its registry entry (or by the host for standalone
/// use); never shared across keys. The interior is shared only with the
/// scheduler's pending completions, via a weak reference.
pub struct TransitionMachine {
    inner: Arc<Mutex<MachineInner>>,
}

impl TransitionMachine {
    /// Create a machine for a child whose desired presence is `in_initially`.
    ///
    /// A child present at creation starts `Entered` (no callbacks) unless
    /// `config.appear` is set, in which case it starts `Exited` and the owner
    /// should immediately call `request_enter(true)` so appear callbacks
    /// fire. A child not present starts `Exited`, or `Unmounted` when
    /// `mount_on_enter`/`unmount_on_exit` is configured.
    pub fn new(
        scheduler: SchedulerHandle,
        config: TransitionConfig,
        observer: Box<dyn TransitionObserver>,
        in_initially: bool,
    ) -> Self {
        let state = if in_initially {
            if config.appear {
                TransitionState::Exited
            } else {
                TransitionState::Entered
            }
        } else if config.mount_on_enter || config.unmount_on_exit {
            TransitionState::Unmounted
        } else {
            TransitionState::Exited
        };

        let inner = Arc::new(Mutex::new(MachineInner {
            state,
            direction: None,
            generation: 0,
            appearing: false,
            config,
            observer,
            scheduler,
            pending_timer: None,
            exited_callback: None,
            self_weak: Weak::new(),
        }));
        inner.lock().unwrap().self_weak = Arc::downgrade(&inner);

        Self { inner }
    }

    /// Request the enter direction. No-op when already entered or entering.
    ///
    /// Reverses an in-flight exit: the pending exit completion is invalidated
    /// and the enter sequence begins from the current visual phase.
    pub fn request_enter(&self, appearing: bool) {
        self.inner.lock().unwrap().request_enter(appearing);
    }

    /// Request the exit direction. No-op when already exited or exiting.
    pub fn request_exit(&self) {
        self.inner.lock().unwrap().request_exit();
    }

    /// Dispatch to enter or exit based on desired presence.
    pub fn set_in(&self, present: bool) {
        if present {
            self.request_enter(false);
        } else {
            self.request_exit();
        }
    }

    /// Invalidate the current generation without firing terminal callbacks.
    ///
    /// Pending timers and outstanding completion tokens become no-ops; the
    /// state is left wherever it was.
    pub fn cancel(&self) {
        self.inner.lock().unwrap().cancel();
    }

    /// Get a completion token for the phase currently in progress.
    ///
    /// Returns None when no phase is in progress.
    pub fn completion_token(&self) -> Option<CompletionToken> {
        let inner = self.inner.lock().unwrap();
        inner.state.is_transitioning().then_some(CompletionToken {
            generation: inner.generation,
        })
    }

    /// Complete the current phase via an external signal.
    ///
    /// A token from a cancelled or already-completed phase is discarded
    /// silently; redeeming twice is a no-op the second time.
    pub fn complete(&self, token: CompletionToken) {
        self.inner.lock().unwrap().complete_phase(token.generation);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransitionState {
        self.inner.lock().unwrap().state
    }

    /// Most recently requested direction, if a phase is pending.
    pub fn direction(&self) -> Option<Direction> {
        self.inner.lock().unwrap().direction
    }

    /// Whether a phase is currently in progress.
    pub fn is_transitioning(&self) -> bool {
        self.state().is_transitioning()
    }

    /// Install a callback that runs whenever the machine reaches `Exited`.
    ///
    /// Used by the group registry to learn that removal may proceed.
    pub fn set_exited_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().unwrap().exited_callback = Some(Box::new(callback));
    }
}

impl Drop for TransitionMachine {
    fn drop(&mut self) {
        // Clean up the pending timer when the machine goes away
        self.inner.lock().unwrap().cancel_pending_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TransitionScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records callback names in the order observed, appear-aware like the
    /// group scenarios need.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Recorder {
        fn log(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    impl TransitionObserver for Recorder {
        fn on_enter(&mut self, appearing: bool) {
            self.0
                .lock()
                .unwrap()
                .push(if appearing { "appear" } else { "enter" });
        }
        fn on_entering(&mut self, appearing: bool) {
            self.0
                .lock()
                .unwrap()
                .push(if appearing { "appearing" } else { "entering" });
        }
        fn on_entered(&mut self, appearing: bool) {
            self.0
                .lock()
                .unwrap()
                .push(if appearing { "appeared" } else { "entered" });
        }
        fn on_exit(&mut self) {
            self.0.lock().unwrap().push("exit");
        }
        fn on_exiting(&mut self) {
            self.0.lock().unwrap().push("exiting");
        }
        fn on_exited(&mut self) {
            self.0.lock().unwrap().push("exited");
        }
    }

    fn machine_with(
        config: TransitionConfig,
        in_initially: bool,
    ) -> (TransitionScheduler, TransitionMachine, Recorder) {
        let scheduler = TransitionScheduler::new();
        let recorder = Recorder::default();
        let machine = TransitionMachine::new(
            scheduler.handle(),
            config,
            Box::new(recorder.clone()),
            in_initially,
        );
        (scheduler, machine, recorder)
    }

    #[test]
    fn test_enter_sequence_with_timeout() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(100));
        let (scheduler, machine, recorder) = machine_with(config, false);

        assert_eq!(machine.state(), TransitionState::Exited);
        machine.request_enter(false);
        assert_eq!(machine.state(), TransitionState::Entering);
        assert_eq!(recorder.log(), vec!["enter", "entering"]);

        scheduler.tick(50.0);
        assert_eq!(machine.state(), TransitionState::Entering);

        scheduler.tick(60.0);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);
    }

    #[test]
    fn test_zero_timeout_defers_completion() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        // Never completed synchronously inside the request
        assert_eq!(recorder.log(), vec!["enter", "entering"]);
        assert_eq!(machine.state(), TransitionState::Entering);

        scheduler.tick(0.0);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);
    }

    #[test]
    fn test_exit_during_entering_never_fires_entered() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(100));
        let (scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        scheduler.tick(10.0);
        machine.request_exit();
        assert_eq!(machine.state(), TransitionState::Exiting);

        scheduler.tick(200.0);
        assert_eq!(machine.state(), TransitionState::Exited);
        assert_eq!(
            recorder.log(),
            vec!["enter", "entering", "exit", "exiting", "exited"]
        );
    }

    #[test]
    fn test_enter_during_exiting_never_fires_exited() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(100));
        let (scheduler, machine, recorder) = machine_with(config, true);

        assert_eq!(machine.state(), TransitionState::Entered);
        machine.request_exit();
        scheduler.tick(10.0);
        machine.request_enter(false);

        scheduler.tick(200.0);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert_eq!(
            recorder.log(),
            vec!["exit", "exiting", "enter", "entering", "entered"]
        );
    }

    #[test]
    fn test_requests_are_idempotent() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        machine.request_enter(false); // mid-Entering re-issue
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Entered);
        machine.request_enter(false); // already Entered
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);

        machine.request_exit();
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Exited);
        machine.request_exit(); // already Exited
        assert_eq!(
            recorder.log(),
            vec!["enter", "entering", "entered", "exit", "exiting", "exited"]
        );
    }

    #[test]
    fn test_external_completion_token() {
        let config = TransitionConfig::default(); // no timeouts
        let (_scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        let token = machine.completion_token().expect("mid-phase token");

        machine.complete(token);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);

        // Second redemption of the same token is a no-op
        machine.complete(token);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);
    }

    #[test]
    fn test_stale_token_after_cancel_is_discarded() {
        let config = TransitionConfig::default();
        let (_scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        let token = machine.completion_token().unwrap();
        machine.cancel();

        machine.complete(token);
        assert_eq!(machine.state(), TransitionState::Entering);
        assert_eq!(recorder.log(), vec!["enter", "entering"]);
    }

    #[test]
    fn test_token_does_not_race_pending_timer() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(100));
        let (scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        let token = machine.completion_token().unwrap();
        machine.complete(token);
        assert_eq!(machine.state(), TransitionState::Entered);

        // The timer was cancelled by the completion; no duplicate terminal callback
        scheduler.tick(200.0);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);
    }

    #[test]
    fn test_enter_disabled_jumps_to_entered() {
        let config = TransitionConfig::default().enter(false);
        let (_scheduler, machine, recorder) = machine_with(config, false);

        machine.request_enter(false);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert!(recorder.log().is_empty());
    }

    #[test]
    fn test_exit_disabled_jumps_to_exited_and_notifies() {
        let config = TransitionConfig::default().exit(false);
        let (_scheduler, machine, recorder) = machine_with(config, true);

        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        machine.set_exited_callback(move || {
            n.fetch_add(1, Ordering::SeqCst);
        });

        machine.request_exit();
        assert_eq!(machine.state(), TransitionState::Exited);
        assert!(recorder.log().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_present_without_appear_starts_entered_silently() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, true);

        assert_eq!(machine.state(), TransitionState::Entered);
        scheduler.tick(100.0);
        assert!(recorder.log().is_empty());
    }

    #[test]
    fn test_appear_runs_flagged_enter_sequence() {
        let config = TransitionConfig::default()
            .appear(true)
            .timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, true);

        assert_eq!(machine.state(), TransitionState::Exited);
        machine.request_enter(true);
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert_eq!(recorder.log(), vec!["appear", "appearing", "appeared"]);
    }

    #[test]
    fn test_mount_on_enter() {
        let config = TransitionConfig::default()
            .mount_on_enter(true)
            .timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, false);

        assert_eq!(machine.state(), TransitionState::Unmounted);
        machine.request_enter(false);
        assert_eq!(machine.state(), TransitionState::Entering);

        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Entered);
        assert_eq!(recorder.log(), vec!["enter", "entering", "entered"]);
    }

    #[test]
    fn test_unmount_on_exit() {
        let config = TransitionConfig::default()
            .unmount_on_exit(true)
            .timeouts(Timeouts::uniform(0));
        let (scheduler, machine, recorder) = machine_with(config, true);

        machine.request_exit();
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Unmounted);
        assert_eq!(recorder.log(), vec!["exit", "exiting", "exited"]);
    }

    #[test]
    fn test_set_in_round_trip() {
        let config = TransitionConfig::default().timeouts(Timeouts::uniform(0));
        let (scheduler, machine, _recorder) = machine_with(config, false);

        machine.set_in(true);
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Entered);

        machine.set_in(false);
        scheduler.tick(1.0);
        assert_eq!(machine.state(), TransitionState::Exited);
    }
}

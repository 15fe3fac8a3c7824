//! Presence Core
//!
//! Per-child enter/exit transition coordination:
//!
//! - **TransitionState**: the lifecycle vocabulary (unmounted → entering →
//!   entered → exiting → exited)
//! - **TransitionMachine**: one child's state machine, driving lifecycle
//!   observers at phase boundaries and completing via scheduler timers or
//!   external completion tokens
//! - **TransitionScheduler**: tick-driven logical-time timer service shared
//!   by all machines (injected dependency, not a singleton)
//!
//! This crate only sequences *when* visual phases occur. What a phase looks
//! like (opacity, class names, transforms) is the host's business: it reads
//! the current [`TransitionState`] and reacts through its observer.
//!
//! # Example
//!
//! ```rust
//! use presence_core::{
//!     Timeouts, TransitionConfig, TransitionMachine, TransitionScheduler, TransitionState,
//! };
//!
//! let scheduler = TransitionScheduler::new();
//! let config = TransitionConfig::default().timeouts(Timeouts::uniform(300));
//! let machine = TransitionMachine::new(scheduler.handle(), config, Box::new(()), false);
//!
//! machine.request_enter(false);
//! assert_eq!(machine.state(), TransitionState::Entering);
//!
//! // The host pumps the scheduler; 300ms of logical time completes the phase.
//! scheduler.tick(300.0);
//! assert_eq!(machine.state(), TransitionState::Entered);
//! ```

pub mod machine;
pub mod scheduler;
pub mod state;

pub use machine::{
    CompletionToken, Timeouts, TransitionConfig, TransitionMachine, TransitionObserver,
};
pub use scheduler::{SchedulerHandle, TimerId, TransitionScheduler, WakeCallback};
pub use state::{Direction, TransitionState};

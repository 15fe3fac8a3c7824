//! Presence Group
//!
//! Keyed-child reconciliation on top of [`presence_core`]: diff successive
//! child lists, run enter transitions for arrivals, and keep departures
//! rendered until their exit transition completes.
//!
//! - **KeyedChild / ChildKey**: how children identify themselves across
//!   renders
//! - **ChildRegistry**: ordered key → (descriptor, machine, pending-removal)
//!   tracking, mutated only by the reconciler
//! - **TransitionGroup**: the reconciler itself, producing a flat ordered
//!   render list each cycle
//!
//! # Example
//!
//! ```rust
//! use presence_core::{Timeouts, TransitionConfig, TransitionScheduler};
//! use presence_group::{ChildKey, GroupConfig, KeyedChild, TransitionGroup};
//!
//! #[derive(Clone)]
//! struct Card(&'static str);
//!
//! impl KeyedChild for Card {
//!     fn key(&self) -> Option<ChildKey> {
//!         Some(ChildKey::new(self.0))
//!     }
//! }
//!
//! let scheduler = TransitionScheduler::new();
//! let config = GroupConfig::default()
//!     .child_config(TransitionConfig::default().timeouts(Timeouts::uniform(200)));
//! let mut group = TransitionGroup::new(scheduler.handle(), config);
//!
//! group.reconcile(vec![Card("a"), Card("b")]).unwrap();
//! // "b" leaves the logical list but stays rendered while it exits:
//! let list = group.reconcile(vec![Card("a")]).unwrap();
//! assert_eq!(list.len(), 2);
//! assert!(list[1].exiting);
//!
//! scheduler.tick(200.0);
//! group.sweep();
//! assert_eq!(group.render_list().len(), 1);
//! ```

pub mod error;
pub mod group;
pub mod key;
pub mod registry;

pub use error::{GroupError, Result};
pub use group::{GroupConfig, ObserverFactory, RenderChild, TransitionGroup};
pub use key::{ChildKey, KeyedChild};
pub use registry::{ChildRegistry, RegistryEntry};

//! Group reconciler
//!
//! `TransitionGroup` diffs consecutive keyed child lists and drives one
//! `TransitionMachine` per key:
//!
//! - keys that appear start an enter transition
//! - keys that disappear are kept rendered, flagged `pending_removal`, and
//!   start an exit transition; the entry is deleted only once the exit
//!   completes
//! - a key that reappears before its exit completes has the removal flag
//!   cleared and reverses back into an enter
//!
//! The output of each reconcile is a flat ordered render list. Exiting
//! children keep their place: each one is inserted immediately before the
//! surviving child that followed it in the previous render order, or
//! appended when no successor survives.

use crate::error::{GroupError, Result};
use crate::key::{ChildKey, KeyedChild};
use crate::registry::{ChildRegistry, RegistryEntry};
use presence_core::{
    SchedulerHandle, TransitionConfig, TransitionMachine, TransitionObserver, TransitionState,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Group-level transition defaults.
#[derive(Clone, Debug)]
pub struct GroupConfig {
    /// Run enter transitions for children present at the first reconcile
    pub appear: bool,
    /// Transition config inherited by children that don't carry an override
    pub child_config: TransitionConfig,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            appear: false,
            child_config: TransitionConfig::default(),
        }
    }
}

impl GroupConfig {
    pub fn appear(mut self, appear: bool) -> Self {
        self.appear = appear;
        self
    }

    pub fn child_config(mut self, config: TransitionConfig) -> Self {
        self.child_config = config;
        self
    }
}

/// One slot in the rendered output.
#[derive(Clone, Debug)]
pub struct RenderChild<C> {
    pub key: ChildKey,
    pub child: C,
    pub state: TransitionState,
    /// True while the child is only rendered to finish its exit
    pub exiting: bool,
}

/// Factory producing the lifecycle observer for a newly tracked child.
pub type ObserverFactory<C> =
    Box<dyn FnMut(&ChildKey, &C) -> Box<dyn TransitionObserver> + Send>;

type RenderCallback = Arc<dyn Fn() + Send + Sync>;

/// Keyed-child transition reconciler.
///
/// Synchronous and single-owner: the host calls [`reconcile`] with each new
/// logical child list, pumps the shared scheduler, and calls [`sweep`] (or
/// just reconciles again) to drop children whose exit has completed.
///
/// [`reconcile`]: TransitionGroup::reconcile
/// [`sweep`]: TransitionGroup::sweep
pub struct TransitionGroup<C> {
    scheduler: SchedulerHandle,
    config: GroupConfig,
    registry: ChildRegistry<C>,
    render_order: Vec<ChildKey>,
    observer_factory: ObserverFactory<C>,
    // Keys whose exit completed while pending removal; drained by sweep().
    // Shared with the exited callbacks installed on each machine.
    removal_queue: Arc<Mutex<Vec<ChildKey>>>,
    render_callback: Arc<Mutex<Option<RenderCallback>>>,
    first_reconcile_done: bool,
}

impl<C: KeyedChild + Clone> TransitionGroup<C> {
    pub fn new(scheduler: SchedulerHandle, config: GroupConfig) -> Self {
        Self {
            scheduler,
            config,
            registry: ChildRegistry::new(),
            render_order: Vec::new(),
            observer_factory: Box::new(|_, _| Box::new(())),
            removal_queue: Arc::new(Mutex::new(Vec::new())),
            render_callback: Arc::new(Mutex::new(None)),
            first_reconcile_done: false,
        }
    }

    /// Supply per-child lifecycle observers. Applies to children tracked
    /// after this call.
    pub fn set_observer_factory<F>(&mut self, factory: F)
    where
        F: FnMut(&ChildKey, &C) -> Box<dyn TransitionObserver> + Send + 'static,
    {
        self.observer_factory = Box::new(factory);
    }

    /// Install a callback invoked when an exiting child finishes and the
    /// host should re-render.
    ///
    /// Runs from inside machine completions; it should only flag or wake,
    /// never reconcile reentrantly.
    pub fn set_render_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.render_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    /// Diff `next_children` against the tracked set and return the new
    /// render list.
    pub fn reconcile(&mut self, next_children: Vec<C>) -> Result<Vec<RenderChild<C>>> {
        self.sweep();

        // Resolve and validate keys before touching any state.
        let next_keys = self.resolve_keys(&next_children)?;
        let next_set: HashSet<ChildKey> = next_keys.iter().cloned().collect();
        let initial = !self.first_reconcile_done;
        let prev_order = self.render_order.clone();

        // Departures: flag and begin the exit, keep the entry.
        let departing: Vec<ChildKey> = self
            .registry
            .keys()
            .filter(|key| !next_set.contains(*key))
            .cloned()
            .collect();
        for key in &departing {
            let entry = self.registry.get_mut(key).expect("departing key tracked");
            if !entry.pending_removal {
                entry.pending_removal = true;
                tracing::debug!(key = %key, "group: child departed, exiting");
                entry.machine.request_exit();
            }
        }

        // Arrivals and survivors, in next order.
        for (key, child) in next_keys.iter().zip(next_children.into_iter()) {
            if self.registry.contains(key) {
                let entry = self.registry.get_mut(key).expect("key tracked");
                entry.child = child;
                if entry.pending_removal {
                    // Reappeared mid-exit: reverse back in.
                    entry.pending_removal = false;
                    tracing::debug!(key = %key, "group: child reappeared, reversing exit");
                    entry.machine.request_enter(false);
                }
            } else {
                // A child override replaces the whole config; the group's
                // appear default only reaches children that inherit.
                let config = child.transition_config().unwrap_or_else(|| {
                    let mut config = self.config.child_config.clone();
                    if initial {
                        config.appear = config.appear || self.config.appear;
                    }
                    config
                });
                let machine = self.create_machine(key, &child, config.clone(), initial);
                if initial {
                    if config.appear {
                        machine.request_enter(true);
                    }
                } else {
                    machine.request_enter(false);
                }
                self.registry.insert(
                    key.clone(),
                    RegistryEntry {
                        child,
                        machine,
                        pending_removal: false,
                    },
                );
            }
        }

        // A departure with exit disabled completes inside request_exit;
        // drop it before it ever reaches a render list.
        self.sweep();

        // Next order, with still-exiting children spliced back in before
        // their surviving successor from the previous order.
        let mut order = next_keys;
        let exiting: Vec<ChildKey> = prev_order
            .iter()
            .filter(|key| {
                self.registry
                    .get(key)
                    .is_some_and(|entry| entry.pending_removal)
            })
            .cloned()
            .collect();
        for key in exiting {
            let pos = prev_order
                .iter()
                .position(|k| *k == key)
                .expect("exiting key came from prev_order");
            let successor = prev_order[pos + 1..]
                .iter()
                .find(|k| next_set.contains(*k));
            match successor.and_then(|s| order.iter().position(|k| k == s)) {
                Some(index) => order.insert(index, key),
                None => order.push(key),
            }
        }

        self.render_order = order;
        self.first_reconcile_done = true;
        Ok(self.render_list())
    }

    /// Drop children whose exit completed while flagged for removal.
    ///
    /// Returns the removed keys. Also runs at the top of every reconcile;
    /// call it directly after ticking the scheduler to get removals
    /// reflected without a full reconcile.
    pub fn sweep(&mut self) -> Vec<ChildKey> {
        let drained: Vec<ChildKey> = std::mem::take(&mut *self.removal_queue.lock().unwrap());
        let mut removed = Vec::new();
        for key in drained {
            // Skip keys that reversed back in after the exit was queued
            let done = self
                .registry
                .get(&key)
                .is_some_and(|entry| entry.pending_removal && entry.machine.state().is_exited());
            if done {
                self.registry.remove(&key);
                self.render_order.retain(|k| *k != key);
                tracing::debug!(key = %key, "group: removal complete");
                removed.push(key);
            }
        }
        removed
    }

    /// Snapshot the current render list without reconciling.
    pub fn render_list(&self) -> Vec<RenderChild<C>> {
        self.render_order
            .iter()
            .filter_map(|key| {
                self.registry.get(key).map(|entry| RenderChild {
                    key: key.clone(),
                    child: entry.child.clone(),
                    state: entry.machine.state(),
                    exiting: entry.pending_removal,
                })
            })
            .collect()
    }

    /// Machine for a tracked key, if any.
    pub fn machine(&self, key: &ChildKey) -> Option<&TransitionMachine> {
        self.registry.get(key).map(|entry| &entry.machine)
    }

    pub fn contains(&self, key: &ChildKey) -> bool {
        self.registry.contains(key)
    }

    /// Number of tracked children, exiting ones included.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Whether any tracked machine is mid-phase.
    pub fn has_active_transitions(&self) -> bool {
        self.registry
            .iter()
            .any(|(_, entry)| entry.machine.is_transitioning())
    }

    fn resolve_keys(&self, children: &[C]) -> Result<Vec<ChildKey>> {
        let mut keys = Vec::with_capacity(children.len());
        let mut seen = HashSet::new();
        for (index, child) in children.iter().enumerate() {
            let key = match child.key() {
                Some(key) => key,
                None => {
                    tracing::warn!(index, "group: child has no key, tracking positionally");
                    ChildKey::positional(index)
                }
            };
            if !seen.insert(key.clone()) {
                return Err(GroupError::DuplicateKey(key));
            }
            keys.push(key);
        }
        Ok(keys)
    }

    fn create_machine(
        &mut self,
        key: &ChildKey,
        child: &C,
        config: TransitionConfig,
        in_initially: bool,
    ) -> TransitionMachine {
        let observer = (self.observer_factory)(key, child);
        let machine =
            TransitionMachine::new(self.scheduler.clone(), config, observer, in_initially);

        let queue = Arc::clone(&self.removal_queue);
        let render_callback = Arc::clone(&self.render_callback);
        let queued_key = key.clone();
        machine.set_exited_callback(move || {
            queue.lock().unwrap().push(queued_key.clone());
            if let Some(callback) = render_callback.lock().unwrap().as_ref() {
                callback();
            }
        });
        machine
    }
}

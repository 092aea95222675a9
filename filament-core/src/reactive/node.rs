//! Signal node internals.
//!
//! A `SignalNode` is one vertex of the dataflow graph. It owns the compute
//! function, the declared dependency specs and the lexical scope they are
//! resolved against, and — behind a single lock — the resolved upstream
//! set, the subscriber sets, the value slot and the readiness status.
//!
//! # Edges
//!
//! Upstream references are strong (a node keeps its dependencies alive);
//! downstream references are weak, so a dropped subscriber simply
//! disappears from fan-out. Subscriber lists are deduplicated by node id
//! and always snapshotted before iteration, because a recompute triggered
//! mid-pass may subscribe or unsubscribe nodes.
//!
//! # Locking
//!
//! The state lock is never held across a call into another node, a compute
//! function, or a change callback. Every operation reads or writes in a
//! short scope, drops the guard, then calls out. That discipline is what
//! makes the graph safe for reentrant use (a compute reading and writing
//! other signals while a propagation pass is running).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::error::{ResolveError, SignalError};
use crate::resolve::{resolve_spec, DepSpec, LexicalScope, ResolvedDeps};
use crate::value::{ComputeFn, ComputeResult, Value};

use super::kinds::SignalKind;
use super::propagate::{propagate, run_reconnects};
use super::signal::Signal;
use super::slot::ValueSlot;
use super::status::Status;

/// Counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Callback invoked after every genuine value update (the owner hook).
pub(crate) type OnChange = Arc<dyn Fn(&Signal) + Send + Sync>;

/// A weak subscriber edge, keyed by node id so dedupe and removal do not
/// need to upgrade.
pub(crate) struct WeakSignal {
    pub(crate) id: u64,
    pub(crate) node: Weak<SignalNode>,
}

impl WeakSignal {
    fn upgrade(&self) -> Option<Signal> {
        self.node.upgrade().map(Signal::from_node)
    }
}

/// Immutable identity and behavior of a node; mutable state lives in
/// `NodeState` behind the lock.
pub(crate) struct SignalNode {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) kind: SignalKind,
    pub(crate) compute: ComputeFn,
    pub(crate) specs: Vec<DepSpec>,
    pub(crate) scope: LexicalScope,
    pub(crate) state: RwLock<NodeState>,
}

pub(crate) struct NodeState {
    /// Resolved dependencies, in declaration order.
    pub(crate) upstream: SmallVec<[Signal; 4]>,
    /// Signals crossed mid-path during resolution; subscribed to for
    /// re-resolution, not for value propagation.
    pub(crate) upstream_reconnect: SmallVec<[Signal; 4]>,
    /// Subscribers notified on value/status change.
    pub(crate) downstream: Vec<WeakSignal>,
    /// Subscribers that must re-resolve when our value changes.
    pub(crate) downstream_reconnect: Vec<WeakSignal>,
    pub(crate) slot: ValueSlot,
    pub(crate) status: Status,
    /// Why the node is not connected; `None` means connected.
    pub(crate) not_connected: Option<String>,
    /// Set by `disconnect()`; blocks the silent auto-reconnect on read.
    pub(crate) explicitly_disconnected: bool,
    /// Source kinds attempt a zero-argument self-initialization exactly
    /// once; a successful `set` before the first update also counts.
    pub(crate) self_init_done: bool,
    /// Re-entrancy guard: set while this node's own recompute is running,
    /// so a dependency cycle reads the cached value instead of recursing.
    pub(crate) updating: bool,
    pub(crate) on_change: Option<OnChange>,
}

impl NodeState {
    pub(crate) fn new() -> Self {
        Self {
            upstream: SmallVec::new(),
            upstream_reconnect: SmallVec::new(),
            downstream: Vec::new(),
            downstream_reconnect: Vec::new(),
            slot: ValueSlot::new(),
            status: Status::Unconnected,
            not_connected: Some("no connection attempt yet".to_string()),
            explicitly_disconnected: false,
            self_init_done: false,
            updating: false,
            on_change: None,
        }
    }
}

impl Signal {
    // ------------------------------------------------------------------
    // Snapshots (short read lock, clone out, release)
    // ------------------------------------------------------------------

    pub(crate) fn upstream_snapshot(&self) -> SmallVec<[Signal; 4]> {
        self.node.state.read().upstream.clone()
    }

    pub(crate) fn downstream_snapshot(&self) -> Vec<Signal> {
        self.node
            .state
            .read()
            .downstream
            .iter()
            .filter_map(WeakSignal::upgrade)
            .collect()
    }

    pub(crate) fn reconnect_snapshot(&self) -> Vec<Signal> {
        self.node
            .state
            .read()
            .downstream_reconnect
            .iter()
            .filter_map(WeakSignal::upgrade)
            .collect()
    }

    pub(crate) fn set_status_raw(&self, status: Status) {
        self.node.state.write().status = status;
    }

    pub(crate) fn set_on_change(&self, hook: OnChange) {
        self.node.state.write().on_change = Some(hook);
    }

    // ------------------------------------------------------------------
    // Subscription bookkeeping
    // ------------------------------------------------------------------

    /// Add `sub` to our subscriber set; idempotent. `reconnect` selects
    /// the re-resolution set instead of the value-propagation set.
    pub(crate) fn subscribe(&self, sub: &Signal, reconnect: bool) {
        let mut state = self.node.state.write();
        let list = if reconnect {
            &mut state.downstream_reconnect
        } else {
            &mut state.downstream
        };
        if !list.iter().any(|w| w.id == sub.id()) {
            list.push(WeakSignal {
                id: sub.id(),
                node: Arc::downgrade(&sub.node),
            });
        }
    }

    /// Remove a subscriber from both sets, pruning dead entries as we go.
    pub(crate) fn unsubscribe(&self, sub_id: u64) {
        let mut state = self.node.state.write();
        state
            .downstream
            .retain(|w| w.id != sub_id && w.node.strong_count() > 0);
        state
            .downstream_reconnect
            .retain(|w| w.id != sub_id && w.node.strong_count() > 0);
    }

    // ------------------------------------------------------------------
    // Connect / disconnect
    // ------------------------------------------------------------------

    /// Re-resolve every dependency spec and rebuild subscriptions.
    ///
    /// On success the node becomes stale (eager kinds refresh immediately
    /// inside the propagation pass). On failure `upstream` is rolled back
    /// to empty, the failure reason is stored, and the node — plus its
    /// transitive subscribers — becomes unconnected; the error is returned
    /// only when `raise_on_fail` is set, otherwise `Ok(false)`.
    pub(crate) fn connect_with(&self, raise_on_fail: bool) -> Result<bool, SignalError> {
        // Drop all existing subscriptions first.
        let old: Vec<Signal> = {
            let mut state = self.node.state.write();
            let mut old: Vec<Signal> = state.upstream.drain(..).collect();
            old.extend(state.upstream_reconnect.drain(..));
            old
        };
        for signal in &old {
            signal.unsubscribe(self.id());
        }

        // Resolve every spec; first failure wins and rolls the resolved
        // set back to empty. Intermediates collected so far are kept: they
        // are the signals whose future changes might make this succeed.
        let mut deps = ResolvedDeps::default();
        let mut failure: Option<ResolveError> = None;
        for spec in &self.node.specs {
            if let Err(err) = resolve_spec(spec, &self.node.scope, &mut deps) {
                deps.signals.clear();
                failure = Some(err);
                break;
            }
        }

        {
            let mut state = self.node.state.write();
            state.upstream = deps.signals.clone();
            state.upstream_reconnect = deps.intermediates.clone();
        }
        for signal in &deps.signals {
            signal.subscribe(self, false);
        }
        for signal in &deps.intermediates {
            signal.subscribe(self, true);
        }

        if let Some(err) = failure {
            self.node.state.write().not_connected = Some(err.message.clone());
            tracing::debug!(signal = %self.node.name, reason = %err.message, "connect failed");
            propagate(self, Status::Unconnected, true);
            if raise_on_fail {
                return Err(SignalError::NotConnected {
                    name: self.node.name.clone(),
                    reason: err.message,
                });
            }
            return Ok(false);
        }

        {
            let mut state = self.node.state.write();
            state.not_connected = None;
            state.explicitly_disconnected = false;
        }
        tracing::debug!(signal = %self.node.name, upstream = deps.signals.len(), "connected");
        propagate(self, Status::Stale, true);
        Ok(true)
    }

    /// Tear down upstream subscriptions and mark this node — and its
    /// transitive subscribers — unconnected. Sticky: only an explicit
    /// `connect()` revives the node; reads will not silently repair it.
    pub(crate) fn disconnect_inner(&self) {
        let old: Vec<Signal> = {
            let mut state = self.node.state.write();
            let mut old: Vec<Signal> = state.upstream.drain(..).collect();
            old.extend(state.upstream_reconnect.drain(..));
            state.not_connected = Some("explicitly disconnected".to_string());
            state.explicitly_disconnected = true;
            old
        };
        for signal in &old {
            signal.unsubscribe(self.id());
        }
        tracing::debug!(signal = %self.node.name, "disconnected");
        propagate(self, Status::Unconnected, true);
    }

    // ------------------------------------------------------------------
    // Reading and updating
    // ------------------------------------------------------------------

    /// Get the current value, recomputing if stale.
    ///
    /// A passively unconnected node (failed resolution) gets one silent
    /// reconnect attempt first; an explicitly disconnected one does not.
    pub(crate) fn get_value(&self) -> Result<Value, SignalError> {
        let try_reconnect = {
            let state = self.node.state.read();
            state.not_connected.is_some() && !state.explicitly_disconnected
        };
        if try_reconnect {
            let _ = self.connect_with(false);
        }

        if self.status() == Status::Stale {
            self.update_value()?;
        }

        let state = self.node.state.read();
        match state.status {
            Status::Uninitialized => Err(SignalError::NotInitialized {
                name: self.node.name.clone(),
            }),
            Status::Unconnected => Err(SignalError::NotConnected {
                name: self.node.name.clone(),
                reason: state
                    .not_connected
                    .clone()
                    .unwrap_or_else(|| "not connected".to_string()),
            }),
            _ => match state.slot.current() {
                Some(value) => Ok(value.clone()),
                None => Err(SignalError::NotInitialized {
                    name: self.node.name.clone(),
                }),
            },
        }
    }

    /// Recompute from the current upstream values.
    ///
    /// Re-entrant calls (a dependency cycle reaching back here while the
    /// compute runs) are no-ops; the caller then sees the cached value and
    /// status as they stand.
    pub(crate) fn update_value(&self) -> Result<(), SignalError> {
        {
            let mut state = self.node.state.write();
            if state.updating {
                return Ok(());
            }
            state.updating = true;
        }
        let result = match self.node.kind {
            SignalKind::Source | SignalKind::Input => self.update_source(),
            SignalKind::Watch | SignalKind::Act => self.update_plain(),
        };
        self.node.state.write().updating = false;
        result
    }

    /// Plain update: one positional value per upstream, in order.
    fn update_plain(&self) -> Result<(), SignalError> {
        let upstream = self.upstream_snapshot();
        let mut args = Vec::with_capacity(upstream.len());
        for signal in &upstream {
            args.push(signal.get_value()?);
        }
        let result = (self.node.compute)(&args);
        self.store_result(result);
        Ok(())
    }

    /// Source update: try a zero-argument self-initialization exactly
    /// once; afterwards (or on failure) hybrid sources recompute from
    /// `(previous value, upstream values...)`.
    fn update_source(&self) -> Result<(), SignalError> {
        let first_attempt = {
            let mut state = self.node.state.write();
            let first = !state.self_init_done && !state.slot.has_value();
            state.self_init_done = true;
            first
        };

        if first_attempt {
            match (self.node.compute)(&[]) {
                ComputeResult::Value(value) => {
                    // Defaults seed the slot without counting as an update.
                    let mut state = self.node.state.write();
                    state.slot.seed(value);
                    state.status = Status::Ok;
                    return Ok(());
                }
                ComputeResult::NoUpdate => {
                    // No default; stay uninitialized unless upstream can
                    // supply a value below.
                    self.node.state.write().status = Status::Uninitialized;
                }
            }
        }

        let upstream = self.upstream_snapshot();
        if upstream.is_empty() {
            // Nothing to react to; settle the status from the slot (a
            // reconnect may have marked us stale).
            let mut state = self.node.state.write();
            state.status = if state.slot.has_value() {
                Status::Ok
            } else {
                Status::Uninitialized
            };
            return Ok(());
        }

        let previous = {
            let state = self.node.state.read();
            state.slot.current().cloned().unwrap_or(Value::Null)
        };
        let mut args = Vec::with_capacity(upstream.len() + 1);
        args.push(previous);
        for signal in &upstream {
            args.push(signal.get_value()?);
        }
        let result = (self.node.compute)(&args);
        self.store_result(result);
        Ok(())
    }

    /// Privileged write for source kinds: coerce through the compute
    /// function, store, and push staleness downstream without re-deriving
    /// our own status (we already know our value).
    pub(crate) fn set_inner(&self, value: Value) -> Result<(), SignalError> {
        if !self.node.kind.is_settable() {
            return Err(SignalError::InvalidUsage(format!(
                "cannot set signal '{}': only source and input signals are settable",
                self.node.name
            )));
        }
        let result = (self.node.compute)(std::slice::from_ref(&value));
        {
            // A set counts as initialization even when the coercion
            // declined to produce a value.
            self.node.state.write().self_init_done = true;
        }
        let advanced = self.store_result(result);
        if !advanced {
            return Ok(());
        }
        run_reconnects(self);
        propagate(self, Status::Stale, false);
        Ok(())
    }

    /// Apply a compute result to the value slot, resolve the status, and
    /// fire the change hook on a genuine update. Returns whether the
    /// update counter advanced.
    pub(crate) fn store_result(&self, result: ComputeResult) -> bool {
        let (advanced, hook) = {
            let mut state = self.node.state.write();
            match result {
                ComputeResult::NoUpdate => {
                    state.status = if state.slot.has_value() {
                        Status::Ok
                    } else {
                        Status::Uninitialized
                    };
                    (false, None)
                }
                ComputeResult::Value(value) => {
                    if state.slot.is_current(&value) {
                        // Not a genuine replacement; the counter stands.
                        state.status = Status::Ok;
                        (false, None)
                    } else {
                        state.slot.record(value);
                        state.status = Status::Ok;
                        (true, state.on_change.clone())
                    }
                }
            }
        };
        if advanced {
            if let Some(hook) = hook {
                hook(self);
            }
        }
        advanced
    }
}

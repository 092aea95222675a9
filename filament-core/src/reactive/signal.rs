//! The public signal handle.
//!
//! A `Signal` is a cheap clonable handle to a node in the dataflow graph.
//! Handles compare and hash by node identity, so they can be stored in
//! `Value::Signal`, put in scopes, and used as dependency specs directly.
//!
//! # Kinds and compute arities
//!
//! The four constructors differ in when the compute function runs and with
//! what arguments:
//!
//! - [`Signal::source`] / [`Signal::input`]: called with `[]` once for
//!   self-initialization (return the default, or `NoUpdate` for none), with
//!   `[raw]` on every `set` (coerce or validate the incoming value), and —
//!   for hybrid sources that declared upstream dependencies — with
//!   `[previous, upstream...]` when upstream changes propagate in.
//! - [`Signal::watch`]: called with one value per upstream dependency, only
//!   when the signal is read while stale.
//! - [`Signal::act`]: same arguments as `watch`, but called eagerly during
//!   the propagation pass.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::SignalError;
use crate::resolve::{DepSpec, LexicalScope};
use crate::value::{ComputeResult, Value};

use super::kinds::SignalKind;
use super::node::{next_node_id, NodeState, SignalNode};
use super::status::Status;

/// A handle to one node of the dataflow graph.
#[derive(Clone)]
pub struct Signal {
    pub(crate) node: Arc<SignalNode>,
}

impl Signal {
    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// A settable producer with an optional default and optional upstream
    /// dependencies (a "hybrid" source reacts to upstream too).
    pub fn source<F>(
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::construct(SignalKind::Source, name, compute, deps, scope)
    }

    /// A source whose write operation is part of its call surface; see
    /// [`Signal::invoke`].
    pub fn input<F>(
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::construct(SignalKind::Input, name, compute, deps, scope)
    }

    /// A lazy derived signal; recomputes on read. Requires at least one
    /// dependency.
    pub fn watch<F>(
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::construct(SignalKind::Watch, name, compute, deps, scope)
    }

    /// An eager reaction; recomputes whenever upstream changes. Requires
    /// at least one dependency.
    pub fn act<F>(
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::construct(SignalKind::Act, name, compute, deps, scope)
    }

    /// Kind-generic constructor; the four named constructors delegate here.
    pub fn new<F>(
        kind: SignalKind,
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::construct(kind, name, compute, deps, scope)
    }

    fn construct<F>(
        kind: SignalKind,
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
        scope: &LexicalScope,
    ) -> Result<Signal, SignalError>
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        let name = name.into();
        if kind.requires_upstream() && deps.is_empty() {
            return Err(SignalError::InvalidUsage(format!(
                "{} signal '{name}' must declare at least one dependency",
                kind.label()
            )));
        }

        let signal = Signal {
            node: Arc::new(SignalNode {
                id: next_node_id(),
                name,
                kind,
                compute: Arc::new(compute),
                specs: deps,
                scope: scope.clone(),
                state: RwLock::new(NodeState::new()),
            }),
        };

        // Best-effort initial connect. Failure is not fatal here: the
        // dependency may simply not be declared yet, and a later connect
        // (explicit, or retriggered through the scope) will repair it.
        let _ = signal.connect_with(false);
        Ok(signal)
    }

    pub(crate) fn from_node(node: Arc<SignalNode>) -> Signal {
        Signal { node }
    }

    // ------------------------------------------------------------------
    // Identity and introspection
    // ------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn kind(&self) -> SignalKind {
        self.node.kind
    }

    pub fn status(&self) -> Status {
        self.node.state.read().status
    }

    pub(crate) fn is_active(&self) -> bool {
        self.node.kind.is_active()
    }

    pub fn is_connected(&self) -> bool {
        self.node.state.read().not_connected.is_none()
    }

    /// Why the signal is not connected, if it is not.
    pub fn not_connected_reason(&self) -> Option<String> {
        self.node.state.read().not_connected.clone()
    }

    /// Number of genuine value updates so far.
    pub fn update_count(&self) -> u64 {
        self.node.state.read().slot.update_count()
    }

    /// Unix time (seconds) of the last genuine update; `0.0` before any.
    pub fn timestamp(&self) -> f64 {
        self.node.state.read().slot.timestamp()
    }

    /// Unix time of the update before last; `0.0` before two updates.
    pub fn previous_timestamp(&self) -> f64 {
        self.node.state.read().slot.previous_timestamp()
    }

    // ------------------------------------------------------------------
    // Reading and writing
    // ------------------------------------------------------------------

    /// Current value, recomputing first if stale.
    pub fn value(&self) -> Result<Value, SignalError> {
        self.get_value()
    }

    /// Value before the last update, if there have been at least two.
    pub fn previous(&self) -> Option<Value> {
        self.node.state.read().slot.previous().cloned()
    }

    /// Set a source or input signal. The raw value is passed through the
    /// compute function for coercion before it is stored; equal results
    /// are absorbed without notifying anyone.
    pub fn set(&self, value: impl Into<Value>) -> Result<(), SignalError> {
        self.set_inner(value.into())
    }

    /// The call surface of a signal: no arguments reads; on an input, one
    /// argument writes. An argument on any other kind is a usage error —
    /// sources are written through [`Signal::set`] by owning code, not
    /// through their call surface.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, SignalError> {
        match args {
            [] => self.value(),
            [value] => {
                if self.node.kind != SignalKind::Input {
                    return Err(SignalError::InvalidUsage(format!(
                        "signal '{}' is a {}; only input signals accept a call argument",
                        self.node.name,
                        self.node.kind.label()
                    )));
                }
                self.set(value.clone())?;
                Ok(Value::Null)
            }
            _ => Err(SignalError::InvalidUsage(format!(
                "signal '{}' takes zero arguments (get) or one (set), got {}",
                self.node.name,
                args.len()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------

    /// Re-resolve dependencies, erroring on failure.
    pub fn connect(&self) -> Result<(), SignalError> {
        self.connect_with(true).map(|_| ())
    }

    /// Re-resolve dependencies; returns whether resolution succeeded and
    /// stores the failure reason on the node instead of erroring.
    pub fn try_connect(&self) -> bool {
        self.connect_with(false).unwrap_or(false)
    }

    /// Drop upstream subscriptions and mark this node and its transitive
    /// subscribers unconnected. Sticky until an explicit reconnect.
    pub fn disconnect(&self) {
        self.disconnect_inner();
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.node.id == other.node.id
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id.hash(state);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.node.state.read();
        f.debug_struct("Signal")
            .field("name", &self.node.name)
            .field("kind", &self.node.kind.label())
            .field("status", &state.status.label())
            .field("updates", &state.slot.update_count())
            .finish()
    }
}

//! Owner binding: grouping signals on a host object.
//!
//! An embedding application usually declares signals in clusters — a widget
//! with a `title`, a `flex`, and a reaction that redraws — and the signals
//! of one cluster refer to each other and to the owner's plain attributes
//! by name. `SignalOwner` materializes such a cluster from declarative
//! [`SignalTemplate`]s:
//!
//! - every signal is constructed with the owner's frame overlaid in front
//!   of the surrounding scope, so sibling signals and owner attributes
//!   shadow outer names;
//! - siblings may reference each other in either declaration order; after
//!   a batch of templates is materialized the owner runs a non-raising
//!   connect pass to resolve forward references;
//! - a change hook installed on the owner fires for every genuine value
//!   update of any of its signals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::SignalError;
use crate::resolve::{DepSpec, LexicalScope, ScopeFrame};
use crate::value::{ComputeFn, ComputeResult, Value};

use super::kinds::SignalKind;
use super::node::OnChange;
use super::signal::Signal;

static OWNER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Declarative description of one signal on an owner.
///
/// A template is inert: it never connects or computes by itself, it only
/// tells the owner what to materialize.
pub struct SignalTemplate {
    name: String,
    kind: SignalKind,
    compute: ComputeFn,
    deps: Vec<DepSpec>,
}

impl SignalTemplate {
    pub fn new<F>(
        kind: SignalKind,
        name: impl Into<String>,
        compute: F,
        deps: Vec<DepSpec>,
    ) -> Self
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            compute: Arc::new(compute),
            deps,
        }
    }

    pub fn source<F>(name: impl Into<String>, compute: F, deps: Vec<DepSpec>) -> Self
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::new(SignalKind::Source, name, compute, deps)
    }

    pub fn input<F>(name: impl Into<String>, compute: F, deps: Vec<DepSpec>) -> Self
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::new(SignalKind::Input, name, compute, deps)
    }

    pub fn watch<F>(name: impl Into<String>, compute: F, deps: Vec<DepSpec>) -> Self
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::new(SignalKind::Watch, name, compute, deps)
    }

    pub fn act<F>(name: impl Into<String>, compute: F, deps: Vec<DepSpec>) -> Self
    where
        F: Fn(&[Value]) -> ComputeResult + Send + Sync + 'static,
    {
        Self::new(SignalKind::Act, name, compute, deps)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }
}

/// A materialized cluster of signals sharing one scope frame.
pub struct SignalOwner {
    id: u64,
    frame: ScopeFrame,
    scope: LexicalScope,
    signals: RwLock<IndexMap<String, Signal>>,
    on_change: RwLock<Option<OnChange>>,
}

impl SignalOwner {
    /// An owner with no signals yet, bound inside `scope`; materialize
    /// with [`get_or_create`](Self::get_or_create).
    pub fn new(scope: &LexicalScope) -> Self {
        let frame = ScopeFrame::new();
        Self {
            id: OWNER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            scope: scope.overlaid(frame.clone()),
            frame,
            signals: RwLock::new(IndexMap::new()),
            on_change: RwLock::new(None),
        }
    }

    /// Materialize a whole cluster at once.
    ///
    /// Signals are constructed in declaration order, each one registered in
    /// the owner's frame as soon as it exists. Resolution failures during
    /// construction are not errors — a sibling declared later simply is not
    /// there yet — and a connect pass at the end picks those up. Only
    /// genuine usage errors (an `act` with no dependencies, a duplicate
    /// name) fail the build.
    pub fn build(
        templates: Vec<SignalTemplate>,
        scope: &LexicalScope,
    ) -> Result<SignalOwner, SignalError> {
        let owner = SignalOwner::new(scope);
        for template in templates {
            if owner.signals.read().contains_key(template.name()) {
                return Err(SignalError::InvalidUsage(format!(
                    "duplicate signal name '{}' on owner",
                    template.name
                )));
            }
            owner.get_or_create(template)?;
        }
        // Forward references resolve now that every sibling exists.
        owner.connect_all();
        Ok(owner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The node for `template`'s name, materializing it on first use.
    pub fn get_or_create(&self, template: SignalTemplate) -> Result<Signal, SignalError> {
        if let Some(existing) = self.signals.read().get(template.name()) {
            return Ok(existing.clone());
        }

        let compute = template.compute.clone();
        let signal = Signal::new(
            template.kind,
            &template.name,
            move |args: &[Value]| compute(args),
            template.deps,
            &self.scope,
        )?;
        if let Some(hook) = self.on_change.read().clone() {
            signal.set_on_change(hook);
        }
        self.frame.insert(&template.name, Value::Signal(signal.clone()));
        self.signals
            .write()
            .insert(template.name, signal.clone());
        Ok(signal)
    }

    /// Bind a plain attribute in the owner's frame. Existing signals do
    /// not re-resolve automatically; call [`connect_all`](Self::connect_all)
    /// when the newly bound name should take effect.
    pub fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.frame.insert(name, value);
    }

    /// Read back an attribute (or materialized signal) from the frame.
    pub fn attr(&self, name: &str) -> Option<Value> {
        self.frame.get(name)
    }

    /// The scope the owner's signals resolve against (owner frame first).
    pub fn scope(&self) -> &LexicalScope {
        &self.scope
    }

    pub fn signal(&self, name: &str) -> Option<Signal> {
        self.signals.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.signals.read().keys().cloned().collect()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.read().values().cloned().collect()
    }

    /// Write a settable signal by name. Derived signals refuse with a
    /// "cannot overwrite" error; unknown names are a usage error too.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), SignalError> {
        let Some(signal) = self.signal(name) else {
            return Err(SignalError::InvalidUsage(format!(
                "owner has no signal '{name}'"
            )));
        };
        if !signal.kind().is_settable() {
            return Err(SignalError::InvalidUsage(format!(
                "cannot overwrite signal '{name}'"
            )));
        }
        signal.set(value)
    }

    /// Non-raising reconnect of every signal, in declaration order.
    /// Returns whether all of them connected.
    pub fn connect_all(&self) -> bool {
        let mut all = true;
        for signal in self.signals() {
            all &= signal.try_connect();
        }
        all
    }

    /// Reconnect every signal, erroring on the first failure.
    pub fn connect_all_or_err(&self) -> Result<(), SignalError> {
        for signal in self.signals() {
            signal.connect()?;
        }
        Ok(())
    }

    /// Disconnect every signal (sticky, as with [`Signal::disconnect`]).
    pub fn disconnect_all(&self) {
        for signal in self.signals() {
            signal.disconnect();
        }
    }

    /// Install a hook that fires after every genuine value update of any
    /// signal on this owner, present or future.
    pub fn on_change<F>(&self, hook: F)
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let hook: OnChange = Arc::new(hook);
        *self.on_change.write() = Some(hook.clone());
        for signal in self.signals() {
            signal.set_on_change(hook.clone());
        }
    }
}

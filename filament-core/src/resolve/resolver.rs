//! Dependency resolution.
//!
//! A dependency is declared either as a live node reference or as a dotted
//! path string evaluated against a lexical scope. Resolution walks the path
//! one segment at a time:
//!
//! - the first segment is looked up in the scope (locals before globals);
//! - a signal encountered mid-path is recorded as an *intermediate* (its
//!   value may change later, which must retrigger resolution) and replaced
//!   by its current value;
//! - a `*` segment fans out over every element of a list, contributing one
//!   resolved dependency per element;
//! - any other segment is an attribute access on an object value.
//!
//! The walk must end on a signal. Failures are returned as data (a
//! `ResolveError` with a human-readable message naming the path and, where
//! it adds information, the exact element the walk died at); the caller
//! decides whether that is fatal.

use smallvec::SmallVec;

use crate::error::ResolveError;
use crate::reactive::Signal;
use crate::value::Value;

use super::scope::LexicalScope;

/// A dependency as given at declaration time.
#[derive(Clone)]
pub enum DepSpec {
    /// A live node reference; resolves to itself.
    Node(Signal),
    /// A dotted path evaluated against the node's lexical scope.
    Path(String),
}

impl std::fmt::Debug for DepSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepSpec::Node(s) => write!(f, "DepSpec::Node({})", s.name()),
            DepSpec::Path(p) => write!(f, "DepSpec::Path({p:?})"),
        }
    }
}

impl From<&str> for DepSpec {
    fn from(path: &str) -> Self {
        DepSpec::Path(path.to_string())
    }
}

impl From<String> for DepSpec {
    fn from(path: String) -> Self {
        DepSpec::Path(path)
    }
}

impl From<Signal> for DepSpec {
    fn from(signal: Signal) -> Self {
        DepSpec::Node(signal)
    }
}

impl From<&Signal> for DepSpec {
    fn from(signal: &Signal) -> Self {
        DepSpec::Node(signal.clone())
    }
}

/// Collector for the outcome of resolving one or more specs.
///
/// `signals` are the resolved upstream dependencies, in declaration order
/// (a wildcard contributes one entry per element). `intermediates` are the
/// signals crossed mid-path; the node subscribes to them for re-resolution
/// rather than for value propagation. On failure `signals` is rolled back
/// by the caller, but `intermediates` collected so far are kept — they are
/// exactly the signals whose future changes might make resolution succeed.
#[derive(Default)]
pub(crate) struct ResolvedDeps {
    pub signals: SmallVec<[Signal; 4]>,
    pub intermediates: SmallVec<[Signal; 4]>,
}

/// Resolve a single spec against a scope, appending into `out`.
pub(crate) fn resolve_spec(
    spec: &DepSpec,
    scope: &LexicalScope,
    out: &mut ResolvedDeps,
) -> Result<(), ResolveError> {
    match spec {
        DepSpec::Node(signal) => {
            out.signals.push(signal.clone());
            Ok(())
        }
        DepSpec::Path(path) => {
            let parts: Vec<&str> = path.split('.').collect();
            let root = scope.lookup(parts[0]);
            seek(path, &parts[1..], "", root, out)
        }
    }
}

/// Walk the remaining path segments from `current`.
///
/// `trail` is the already-walked portion after the scope root, with
/// wildcard segments replaced by concrete indices; it is used to point
/// failure messages at the exact element that broke the walk.
fn seek(
    path: &str,
    parts: &[&str],
    trail: &str,
    current: Option<Value>,
    out: &mut ResolvedDeps,
) -> Result<(), ResolveError> {
    let Some(mut value) = current else {
        return Err(fail(path, trail, "does not exist"));
    };

    // End of the path: must have landed on a signal.
    if parts.is_empty() {
        return match value {
            Value::Signal(signal) => {
                out.signals.push(signal);
                Ok(())
            }
            _ => Err(ResolveError::new(format!(
                "object '{path}' is not a signal"
            ))),
        };
    }

    // Crossing a signal mid-path: remember it for re-resolution and keep
    // walking through its current value.
    if let Value::Signal(signal) = value {
        out.intermediates.push(signal.clone());
        value = match signal.value() {
            Ok(v) => v,
            Err(_) => {
                return Err(ResolveError::new(format!(
                    "signal '{path}' does not have all parts ready"
                )));
            }
        };
    }

    let (head, rest) = (parts[0], &parts[1..]);

    // Wildcard fan-out over a sequence; first failure wins.
    if head == "*" {
        if let Value::List(items) = value {
            for (index, item) in items.iter().enumerate() {
                let step = extend(trail, &index.to_string());
                seek(path, rest, &step, Some(item.clone()), out)?;
            }
            return Ok(());
        }
        return Err(fail(path, &extend(trail, head), "does not exist"));
    }

    // Plain attribute access.
    let next = match &value {
        Value::Object(map) => map.get(head).cloned(),
        _ => None,
    };
    seek(path, rest, &extend(trail, head), next, out)
}

fn extend(trail: &str, segment: &str) -> String {
    if trail.is_empty() {
        segment.to_string()
    } else {
        format!("{trail}.{segment}")
    }
}

fn fail(path: &str, trail: &str, what: &str) -> ResolveError {
    if trail.is_empty() {
        ResolveError::new(format!("signal '{path}' {what}"))
    } else {
        ResolveError::new(format!("signal '{path}' {what} (failed at '{trail}')"))
    }
}

//! Behavioral variants of a signal node.
//!
//! All four kinds share the same node machinery; the kind decides three
//! things: whether the node recomputes eagerly during a propagation pass
//! (`is_active`), whether it accepts writes (`is_settable`), and whether it
//! is required to declare upstream dependencies at all.

/// The behavioral variant of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Self-contained producer, settable by owning code. May optionally
    /// have upstream dependencies ("hybrid" sources that also react).
    Source,

    /// A source whose write operation is part of its public call surface:
    /// invoking it with one argument sets, with none gets.
    Input,

    /// Lazy: upstream changes only mark it stale; it recomputes on read.
    Watch,

    /// Eager: recomputes the moment any upstream changes. Must declare at
    /// least one upstream dependency.
    Act,
}

impl SignalKind {
    /// Eager kinds recompute during a propagation pass; lazy ones wait to
    /// be read.
    pub fn is_active(self) -> bool {
        !matches!(self, SignalKind::Watch)
    }

    /// Whether `set` is a legal operation on this kind.
    pub fn is_settable(self) -> bool {
        matches!(self, SignalKind::Source | SignalKind::Input)
    }

    /// Whether construction requires a non-empty upstream list.
    pub fn requires_upstream(self) -> bool {
        matches!(self, SignalKind::Watch | SignalKind::Act)
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Source => "source",
            SignalKind::Input => "input",
            SignalKind::Watch => "watch",
            SignalKind::Act => "act",
        }
    }
}

//! Signal readiness states.
//!
//! The four states form a severity order: `Ok < Stale < Uninitialized <
//! Unconnected`. Combining several influences on a node (an incoming
//! notification plus the states of all its dependencies) is a single
//! max-fold — the worst state wins, no branching logic required.

/// Readiness state of a signal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// The cached value is current.
    Ok = 0,

    /// An upstream value changed; the cached value is out of date.
    Stale = 1,

    /// Connected, but no usable value has ever been produced.
    Uninitialized = 2,

    /// Upstream resolution failed or the node was disconnected.
    Unconnected = 3,
}

impl Status {
    /// Worst-wins combination.
    pub fn combine(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Stale => "stale",
            Status::Uninitialized => "uninitialized",
            Status::Unconnected => "unconnected",
        }
    }
}

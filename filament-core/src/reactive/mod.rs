//! The reactive core: signal nodes, status propagation, owner binding.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a named node holding a value, a status, and a compute
//! function. Dependencies are declared, not auto-tracked: each node names
//! its upstream signals (directly or as dotted paths resolved against a
//! lexical scope), and the graph is rebuilt by explicit `connect` calls.
//!
//! ## Kinds
//!
//! Sources and inputs produce values and accept writes; watches derive
//! values lazily; acts react eagerly. See [`SignalKind`].
//!
//! ## Propagation
//!
//! A change runs one pass over the transitive subscribers: statuses are
//! folded worst-wins, eager nodes recompute in dependency order, and
//! unchanged results stop the wave. Cycles are permitted and settle within
//! the pass. See the `propagate` module docs for the full walkthrough.

mod kinds;
mod node;
mod owner;
mod propagate;
mod signal;
mod slot;
mod status;

pub use kinds::SignalKind;
pub use owner::{SignalOwner, SignalTemplate};
pub use signal::Signal;
pub use status::Status;

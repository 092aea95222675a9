//! Filament Core
//!
//! This crate implements a reactive signal graph with explicit, named
//! dependencies:
//!
//! - Signal nodes with value caching, status tracking, and four behavioral
//!   kinds (source, input, watch, act)
//! - Dependency resolution from dotted path strings (with `*` wildcards)
//!   against lexical scopes
//! - Status propagation that handles diamonds and cycles in a single pass
//! - Owner binding for declaring clusters of mutually referencing signals
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `reactive`: signal nodes, kinds, statuses, and the propagation pass
//! - `resolve`: lexical scopes and dotted-path dependency resolution
//! - `value`: the dynamic value model carried through the graph
//! - `error`: the error taxonomy of the public operations
//!
//! # Example
//!
//! ```rust
//! use filament_core::{ComputeResult, LexicalScope, Signal, Value};
//!
//! let scope = LexicalScope::new();
//!
//! // A settable input with a default.
//! let celsius = Signal::input(
//!     "celsius",
//!     |args: &[Value]| match args {
//!         [] => ComputeResult::Value(Value::Float(0.0)),
//!         [v] => ComputeResult::Value(v.clone()),
//!         _ => ComputeResult::NoUpdate,
//!     },
//!     vec![],
//!     &scope,
//! )
//! .unwrap();
//! scope.define("celsius", Value::Signal(celsius.clone()));
//!
//! // A lazy derived value, declared by name.
//! let fahrenheit = Signal::watch(
//!     "fahrenheit",
//!     |args: &[Value]| {
//!         let c = args[0].as_f64().unwrap_or(0.0);
//!         ComputeResult::Value(Value::Float(c * 9.0 / 5.0 + 32.0))
//!     },
//!     vec!["celsius".into()],
//!     &scope,
//! )
//! .unwrap();
//!
//! celsius.set(100.0).unwrap();
//! assert_eq!(fahrenheit.value().unwrap(), Value::Float(212.0));
//! ```

pub mod error;
pub mod reactive;
pub mod resolve;
pub mod value;

pub use error::SignalError;
pub use reactive::{Signal, SignalKind, SignalOwner, SignalTemplate, Status};
pub use resolve::{DepSpec, LexicalScope, ScopeFrame};
pub use value::{ComputeFn, ComputeResult, Value};

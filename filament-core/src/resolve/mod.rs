//! Dependency resolution: lexical scopes and path walking.
//!
//! This module turns declared dependency specifications (direct node
//! references or dotted-path strings such as `ui.children.*.flex`) into
//! live signal references. Resolution is a pure function of a spec and a
//! `LexicalScope`; there is no call-stack inspection and no hidden state,
//! which keeps it unit-testable on its own.

mod resolver;
mod scope;

pub use resolver::DepSpec;
pub use scope::{LexicalScope, ScopeFrame};

pub(crate) use resolver::{resolve_spec, ResolvedDeps};

//! Lexical scopes for dependency resolution.
//!
//! A dotted dependency path like `ui.children.*.flex` starts from a plain
//! name, and that name has to mean something. A `LexicalScope` is an
//! ordered overlay of name->value frames, searched front to back — the
//! front frame plays the role of "locals", later frames of "globals". Owner
//! bound signals get an extra frame of the owner's attributes and sibling
//! signals pushed in front of the declaration scope.
//!
//! Frames are shared by reference: a name inserted into a frame after a
//! node was constructed is visible to that node's next `connect()`. This is
//! what lets mutually-referencing signals be declared in either order and
//! connected once both exist.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::value::Value;

/// A single shared name->value mapping.
#[derive(Clone, Default)]
pub struct ScopeFrame {
    entries: Arc<RwLock<IndexMap<String, Value>>>,
}

impl ScopeFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, value: Value) {
        self.entries.write().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.entries.write().shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for ScopeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("ScopeFrame")
            .field("names", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ordered overlay of frames; lookup walks front to back.
#[derive(Clone, Debug)]
pub struct LexicalScope {
    frames: Vec<ScopeFrame>,
}

impl LexicalScope {
    /// A scope with a single empty frame, ready for `define`.
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame::new()],
        }
    }

    /// A scope made of the given frames, front first.
    pub fn from_frames(frames: Vec<ScopeFrame>) -> Self {
        Self { frames }
    }

    /// A new scope with `frame` overlaid in front of this one's frames.
    pub fn overlaid(&self, frame: ScopeFrame) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.push(frame);
        frames.extend(self.frames.iter().cloned());
        Self { frames }
    }

    /// Bind a name in the frontmost frame.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        if let Some(front) = self.frames.first() {
            front.insert(name, value);
        }
    }

    /// Look a name up, front frame first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames.iter().find_map(|frame| frame.get(name))
    }
}

impl Default for LexicalScope {
    fn default() -> Self {
        Self::new()
    }
}

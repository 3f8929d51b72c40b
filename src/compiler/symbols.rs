//! Scoped Symbol Registry
//!
//! A stack of lexical scope frames mapping identifiers to declaration
//! metadata. Frame 0 is the permanent global frame and is never popped;
//! lookup resolves innermost-first, so shadowing across frames is permitted
//! while redeclaration within one frame is the caller's responsibility to
//! reject (via [`ScopeRegistry::is_declared_in_current_scope`]).

use std::collections::HashMap;
use std::fmt;

use crate::compiler::ir::{DeclType, Operand};

/// Declaration metadata for one identifier, owned by its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEntry {
    /// Declared identifier.
    pub name: String,
    /// Declared type.
    pub ty: DeclType,
    /// Last-known value, when one has been observed.
    pub value: Option<Operand>,
    /// Declaration context tag (e.g., `"declaration"`).
    pub context: String,
    /// Name of the owning frame.
    pub scope_name: String,
    /// Depth of the owning frame (global frame is 0).
    pub depth: usize,
}

/// Stack of lexical scope frames.
#[derive(Debug, Clone)]
pub struct ScopeRegistry {
    frames: Vec<HashMap<String, ScopeEntry>>,
    names: Vec<String>,
    // Monotonic counter for auto-named frames.
    scope_counter: usize,
}

impl ScopeRegistry {
    /// Returns a registry holding a single empty global frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
            names: vec!["global".into()],
            scope_counter: 0,
        }
    }

    /// Inserts `name` into the innermost frame unconditionally; callers
    /// pre-check redeclaration with
    /// [`is_declared_in_current_scope`](Self::is_declared_in_current_scope).
    pub fn add(&mut self, name: &str, ty: DeclType, value: Option<Operand>, context: &str) {
        let depth = self.depth();
        let scope_name = self
            .names
            .last()
            .cloned()
            .unwrap_or_else(|| "global".into());

        let entry = ScopeEntry {
            name: name.to_string(),
            ty,
            value,
            context: context.to_string(),
            scope_name,
            depth,
        };

        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), entry);
        }
    }

    /// Resolves `name` innermost-to-outermost.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ScopeEntry> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Returns `true` if `name` is declared in the innermost frame only.
    /// This enforces same-block-no-redeclaration while still permitting
    /// shadowing across nested blocks.
    #[must_use]
    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    /// Refreshes the last-known value of the innermost entry for `name`,
    /// returning `false` if no frame declares it.
    pub fn update(&mut self, name: &str, value: Operand) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Some(entry) = frame.get_mut(name) {
                entry.value = Some(value);
                return true;
            }
        }

        false
    }

    /// Pushes an empty frame, auto-naming it `scope_{n}` when `name` is
    /// `None`.
    pub fn push_scope(&mut self, name: Option<&str>) {
        let name = name.map_or_else(
            || {
                self.scope_counter += 1;
                format!("scope_{}", self.scope_counter)
            },
            String::from,
        );

        self.frames.push(HashMap::new());
        self.names.push(name);
    }

    /// Pops the innermost frame; a no-op when only the global frame
    /// remains.
    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
            self.names.pop();
        }
    }

    /// Resets to a single empty global frame. Required between independent
    /// compilations sharing one instance, since global declarations
    /// persist after a run.
    pub fn clear(&mut self) {
        self.frames = vec![HashMap::new()];
        self.names = vec!["global".into()];
        self.scope_counter = 0;
    }

    /// Returns the depth of the innermost frame (global frame is 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Returns the name of the innermost frame.
    #[must_use]
    pub fn current_scope_name(&self) -> &str {
        self.names.last().map_or("global", String::as_str)
    }

    /// Returns every entry across all frames, name-sorted. Introspection
    /// view for external collaborators.
    #[must_use]
    pub fn all_entries(&self) -> Vec<&ScopeEntry> {
        let mut entries: Vec<&ScopeEntry> = self
            .frames
            .iter()
            .flat_map(HashMap::values)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Returns the innermost frame's entries, name-sorted.
    #[must_use]
    pub fn current_scope_entries(&self) -> Vec<&ScopeEntry> {
        let mut entries: Vec<&ScopeEntry> = self
            .frames
            .last()
            .map(HashMap::values)
            .into_iter()
            .flatten()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, (frame, name)) in self.frames.iter().zip(&self.names).enumerate() {
            writeln!(f, "Scope level {level} ({name}):")?;

            if frame.is_empty() {
                writeln!(f, "  <empty>")?;
                continue;
            }

            let mut idents: Vec<&String> = frame.keys().collect();
            idents.sort();

            for ident in idents {
                let entry = &frame[ident];
                match &entry.value {
                    Some(value) => writeln!(
                        f,
                        "  {ident}: type={}, val={value}, ctx={}",
                        entry.ty, entry.context
                    )?,
                    None => writeln!(
                        f,
                        "  {ident}: type={}, val=<unset>, ctx={}",
                        entry.ty, entry.context
                    )?,
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_resolves_innermost_first() {
        let mut registry = ScopeRegistry::new();
        registry.add("x", DeclType::Int, Some(Operand::Int(1)), "declaration");

        registry.push_scope(None);
        registry.add("x", DeclType::Float, None, "declaration");

        let entry = registry.find("x").expect("x should be declared");
        assert_eq!(entry.ty, DeclType::Float);
        assert_eq!(entry.depth, 1);
    }

    #[test]
    fn entry_unreachable_after_frame_popped() {
        let mut registry = ScopeRegistry::new();

        registry.push_scope(None);
        registry.add("local", DeclType::Int, None, "declaration");
        assert!(registry.find("local").is_some());

        registry.pop_scope();
        assert!(registry.find("local").is_none());
    }

    #[test]
    fn sibling_frames_may_reuse_names() {
        let mut registry = ScopeRegistry::new();

        registry.push_scope(None);
        registry.add("x", DeclType::Int, None, "declaration");
        registry.pop_scope();

        registry.push_scope(None);
        assert!(!registry.is_declared_in_current_scope("x"));
    }

    #[test]
    fn redeclaration_visible_in_current_frame_only() {
        let mut registry = ScopeRegistry::new();
        registry.add("x", DeclType::Int, None, "declaration");

        assert!(registry.is_declared_in_current_scope("x"));

        registry.push_scope(None);
        // Shadowing is a redeclaration only within the same frame.
        assert!(!registry.is_declared_in_current_scope("x"));
        assert!(registry.find("x").is_some());
    }

    #[test]
    fn pop_scope_at_global_frame_is_noop() {
        let mut registry = ScopeRegistry::new();
        registry.add("x", DeclType::Int, None, "declaration");

        registry.pop_scope();
        registry.pop_scope();

        assert_eq!(registry.depth(), 0);
        assert!(registry.find("x").is_some());
    }

    #[test]
    fn update_refreshes_innermost_binding() {
        let mut registry = ScopeRegistry::new();
        registry.add("x", DeclType::Int, None, "declaration");

        assert!(registry.update("x", Operand::Int(7)));
        assert!(!registry.update("y", Operand::Int(0)));

        let entry = registry.find("x").expect("x should be declared");
        assert_eq!(entry.value, Some(Operand::Int(7)));
    }

    #[test]
    fn all_entries_flattened_and_name_sorted() {
        let mut registry = ScopeRegistry::new();
        registry.add("b", DeclType::Int, None, "declaration");
        registry.push_scope(Some("inner"));
        registry.add("a", DeclType::Int, None, "declaration");

        let names: Vec<&str> = registry
            .all_entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn clear_resets_to_single_global_frame() {
        let mut registry = ScopeRegistry::new();
        registry.push_scope(None);
        registry.add("x", DeclType::Int, None, "declaration");

        registry.clear();

        assert_eq!(registry.depth(), 0);
        assert_eq!(registry.current_scope_name(), "global");
        assert!(registry.all_entries().is_empty());
    }
}

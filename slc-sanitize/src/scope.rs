//! Lexical scope stack: a vector of maps pushed on scope entry and popped
//! on exit, never leaking across function boundaries. Scope resolution
//! owns the only mutable handle to it.
use fnv::FnvHashMap;
use slc_ast::{AliasIndex, FunctionIndex, IntrinsicId, StructIndex, VarIndex};

/// What an identifier bound in scope refers to. Functions, structs,
/// variables and aliases share one namespace, disambiguated by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Variable(VarIndex),
    Function(FunctionIndex),
    Struct(StructIndex),
    Alias(AliasIndex),
    Intrinsic(IntrinsicId),
}

#[derive(Default)]
pub struct ScopeStack {
    frames: Vec<FnvHashMap<String, Symbol>>,
}
impl ScopeStack {
    pub fn new() -> Self {
        let mut stack = ScopeStack { frames: Vec::new() };
        stack.push(); // module-level scope
        stack
    }

    pub fn push(&mut self) {
        self.frames.push(FnvHashMap::default());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped the module-level scope");
    }

    /// Declares `name` in the innermost scope. Returns `false` (and leaves
    /// the existing binding in place) if `name` already exists in that same
    /// frame — the caller turns that into `DuplicateDeclaration`.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> bool {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_owned(), symbol);
        true
    }

    /// Looks up `name`, innermost scope first.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_shadows_outer() {
        let mut scope = ScopeStack::new();
        scope.declare("x", Symbol::Variable(0));
        scope.push();
        scope.declare("x", Symbol::Variable(1));
        assert_eq!(scope.resolve("x"), Some(Symbol::Variable(1)));
        scope.pop();
        assert_eq!(scope.resolve("x"), Some(Symbol::Variable(0)));
    }

    #[test]
    fn redeclaration_in_same_frame_is_rejected() {
        let mut scope = ScopeStack::new();
        assert!(scope.declare("x", Symbol::Variable(0)));
        assert!(!scope.declare("x", Symbol::Variable(1)));
    }
}

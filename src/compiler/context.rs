use std::collections::HashMap;

use crate::types::{Type, TypeHandle, TypeRegistry};

/// The storage class an identifier resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierScope {
    /// A global variable, indexed into the globals table.
    Global,
    /// A local variable or parameter, indexed into the current call frame.
    Local,
    /// A function, indexed into the function table.
    Function,
}

/// What the compiler knows about a declared identifier.
///
/// Local variables use positive indices starting at `1`; parameters use
/// negative indices counting down from `-1`, so a call frame is laid out as
/// `[params…][retval][locals…]`. Globals and functions use their table
/// position.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierInfo {
    /// The declared type.
    pub type_id: TypeHandle,
    /// The slot the identifier occupies within its storage class.
    pub index:   isize,
    /// The storage class.
    pub scope:   IdentifierScope,
}

/// One lexical frame of local declarations.
///
/// A child frame starts counting local slots where its parent stopped, so
/// sibling scopes reuse the same stack slots once the runtime truncates the
/// stack on scope exit.
struct LocalFrame {
    identifiers:      HashMap<String, IdentifierInfo>,
    next_index:       isize,
    next_param_index: isize,
}

/// The compile-time symbol state: the type registry, one global table, one
/// function table, and a stack of local frames.
///
/// Entering a function installs a parameter frame; entering a nested block
/// pushes a child frame. Same-frame redeclaration is rejected while inner
/// frames may shadow outer ones.
pub struct CompilerContext {
    types:     TypeRegistry,
    globals:   HashMap<String, IdentifierInfo>,
    functions: HashMap<String, IdentifierInfo>,
    locals:    Vec<LocalFrame>,
}

#[allow(clippy::new_without_default)]
impl CompilerContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self { types:     TypeRegistry::new(),
               globals:   HashMap::new(),
               functions: HashMap::new(),
               locals:    Vec::new(), }
    }

    /// Returns the type registry for lookups and rendering.
    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns the canonical handle for `t`.
    pub fn get_handle(&mut self, t: Type) -> TypeHandle {
        self.types.get_handle(t)
    }

    /// Resolves a name against the innermost local frame outward, then the
    /// function table, then the globals.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&IdentifierInfo> {
        self.locals
            .iter()
            .rev()
            .find_map(|frame| frame.identifiers.get(name))
            .or_else(|| self.functions.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Returns `true` when `name` can be declared at the current position.
    ///
    /// Inside a function only the innermost frame is consulted, so inner
    /// scopes may shadow outer declarations; at the top level the name must
    /// be free in both the global and the function table.
    #[must_use]
    pub fn can_declare(&self, name: &str) -> bool {
        self.locals.last().map_or_else(|| {
                                           !self.globals.contains_key(name)
                                           && !self.functions.contains_key(name)
                                       },
                                       |frame| !frame.identifiers.contains_key(name))
    }

    /// Declares a variable in the innermost frame, or as a global when no
    /// local frame is active. Returns the assigned slot.
    pub fn create_identifier(&mut self, name: String, type_id: TypeHandle) -> IdentifierInfo {
        if let Some(frame) = self.locals.last_mut() {
            let info = IdentifierInfo { type_id,
                                        index: frame.next_index,
                                        scope: IdentifierScope::Local };
            frame.next_index += 1;
            frame.identifiers.insert(name, info);
            info
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let info = IdentifierInfo { type_id,
                                        index: self.globals.len() as isize,
                                        scope: IdentifierScope::Global };
            self.globals.insert(name, info);
            info
        }
    }

    /// Declares a parameter in the innermost frame, counting down from `-1`.
    pub fn create_param(&mut self, name: String, type_id: TypeHandle) {
        if let Some(frame) = self.locals.last_mut() {
            let info = IdentifierInfo { type_id,
                                        index: frame.next_param_index,
                                        scope: IdentifierScope::Local };
            frame.next_param_index -= 1;
            frame.identifiers.insert(name, info);
        }
    }

    /// Declares a function in the function table. Functions are indexed in
    /// registration order, externals first.
    pub fn create_function(&mut self, name: String, type_id: TypeHandle) {
        #[allow(clippy::cast_possible_wrap)]
        let info = IdentifierInfo { type_id,
                                    index: self.functions.len() as isize,
                                    scope: IdentifierScope::Function };
        self.functions.insert(name, info);
    }

    /// Pushes a nested local frame inheriting the parent's slot counter.
    pub fn enter_scope(&mut self) {
        let next_index = self.locals.last().map_or(1, |frame| frame.next_index);
        self.locals.push(LocalFrame { identifiers: HashMap::new(),
                                      next_index,
                                      next_param_index: -1 });
    }

    /// Pushes a parameter frame: the base frame of a function body, with
    /// locals starting at slot `1` and parameters counting down from `-1`.
    pub fn enter_function(&mut self) {
        self.locals.push(LocalFrame { identifiers:      HashMap::new(),
                                      next_index:       1,
                                      next_param_index: -1, });
    }

    /// Pops the innermost frame, restoring the parent's slot counter.
    pub fn leave_scope(&mut self) {
        self.locals.pop();
    }
}

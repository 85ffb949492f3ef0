use std::collections::HashMap;

/// A stable identity for a structural type.
///
/// Handles are produced by [`TypeRegistry::get_handle`]; two handles compare
/// equal if and only if the types they denote are structurally equal. The
/// three simple types have fixed, reserved handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

impl TypeHandle {
    /// The reserved handle of the `void` type.
    pub const VOID: Self = Self(0);
    /// The reserved handle of the `number` type.
    pub const NUMBER: Self = Self(1);
    /// The reserved handle of the `string` type.
    pub const STRING: Self = Self(2);
}

/// One parameter of a function type: the parameter's type and whether the
/// argument is passed by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Param {
    /// The declared type of the parameter.
    pub type_id: TypeHandle,
    /// `true` when the parameter aliases the caller's variable.
    pub by_ref:  bool,
}

/// The shape of a function: its return type and parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// The declared return type.
    pub return_type: TypeHandle,
    /// The declared parameters, in order.
    pub params:      Vec<Param>,
}

/// A structural type of the language.
///
/// Composite types refer to their component types through handles, so a
/// `Type` value is only meaningful together with the registry that produced
/// those handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The type of statements and discarded results.
    Void,
    /// IEEE-754 double precision numbers.
    Number,
    /// Immutable shared strings.
    String,
    /// A homogeneous growable array with the given element type.
    Array(TypeHandle),
    /// A first-class function value.
    Function(FunctionType),
    /// A fixed-shape tuple with the given element types.
    Tuple(Vec<TypeHandle>),
    /// The transient type of a brace-enclosed initializer list.
    InitList(Vec<TypeHandle>),
}

/// Deduplicates structural types and hands out stable identities for them.
///
/// The registry owns every `Type` ever requested; a type is stored once and
/// all structurally equal requests return the same handle. `void`, `number`,
/// and `string` are seeded at construction so their handles are fixed for
/// the registry's lifetime.
pub struct TypeRegistry {
    types:   Vec<Type>,
    handles: HashMap<Type, TypeHandle>,
}

#[allow(clippy::new_without_default)]
impl TypeRegistry {
    /// Creates a registry seeded with the three simple types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self { types:   Vec::new(),
                                  handles: HashMap::new(), };
        registry.get_handle(Type::Void);
        registry.get_handle(Type::Number);
        registry.get_handle(Type::String);
        registry
    }

    /// Returns the canonical handle for `t`, registering it if this is the
    /// first time the type is seen.
    pub fn get_handle(&mut self, t: Type) -> TypeHandle {
        if let Some(handle) = self.handles.get(&t) {
            return *handle;
        }

        let handle = TypeHandle(self.types.len());
        self.types.push(t.clone());
        self.handles.insert(t, handle);
        handle
    }

    /// Looks up the type a handle refers to.
    ///
    /// # Panics
    /// Panics if the handle was produced by a different registry.
    #[must_use]
    pub fn get(&self, handle: TypeHandle) -> &Type {
        &self.types[handle.0]
    }

    /// Renders the human-readable form of a type, as used in error messages.
    ///
    /// Simple types print as their keyword, arrays as `T[]`, functions as
    /// `R(P&,Q)`, tuples as `[A,B]`, and initializer lists as `{A,B}`.
    ///
    /// # Example
    /// ```
    /// use tessera::types::{Type, TypeHandle, TypeRegistry};
    ///
    /// let mut registry = TypeRegistry::new();
    /// let numbers = registry.get_handle(Type::Array(TypeHandle::NUMBER));
    ///
    /// assert_eq!(registry.display(numbers), "number[]");
    /// ```
    #[must_use]
    pub fn display(&self, handle: TypeHandle) -> String {
        match self.get(handle) {
            Type::Void => "void".to_string(),
            Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::Array(inner) => format!("{}[]", self.display(*inner)),
            Type::Function(ft) => {
                let mut ret = self.display(ft.return_type);
                ret.push('(');
                for (i, param) in ft.params.iter().enumerate() {
                    if i > 0 {
                        ret.push(',');
                    }
                    ret += &self.display(param.type_id);
                    if param.by_ref {
                        ret.push('&');
                    }
                }
                ret.push(')');
                ret
            },
            Type::Tuple(inner) => self.display_list(inner, '[', ']'),
            Type::InitList(inner) => self.display_list(inner, '{', '}'),
        }
    }

    fn display_list(&self, inner: &[TypeHandle], open: char, close: char) -> String {
        let mut ret = String::new();
        ret.push(open);
        for (i, handle) in inner.iter().enumerate() {
            if i > 0 {
                ret.push(',');
            }
            ret += &self.display(*handle);
        }
        ret.push(close);
        ret
    }
}

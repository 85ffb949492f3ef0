use crate::{
    compiler::context::{CompilerContext, IdentifierScope},
    error::CompileError,
    types::{Type, TypeHandle},
};

/// Represents an operation carried by an inner node of the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOperation {
    /// Wraps an argument that is passed by value, cloning it into a fresh
    /// box at evaluation time.
    Param,
    /// Prefix `++`
    Preinc,
    /// Prefix `--`
    Predec,
    /// Postfix `++`
    Postinc,
    /// Postfix `--`
    Postdec,
    /// Unary `+`
    Positive,
    /// Unary `-`
    Negative,
    /// `~`
    BitwiseNot,
    /// `!`
    LogicalNot,
    /// `sizeof`
    Size,
    /// `tostring`
    ToString,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `\` (integer division)
    Idiv,
    /// `%`
    Mod,
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `<<`
    Shiftl,
    /// `>>`
    Shiftr,
    /// `..`
    Concat,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `\=`
    IdivAssign,
    /// `%=`
    ModAssign,
    /// `&=`
    AndAssign,
    /// `|=`
    OrAssign,
    /// `^=`
    XorAssign,
    /// `<<=`
    ShiftlAssign,
    /// `>>=`
    ShiftrAssign,
    /// `..=`
    ConcatAssign,
    /// `,`
    Comma,
    /// `[]`
    Index,
    /// `?:`
    Ternary,
    /// A function call; the first child is the callee.
    Call,
    /// A brace-enclosed initializer list.
    Init,
}

/// The payload of an expression-tree node: an operation or a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// An inner node applying an operation to its children.
    Operation(NodeOperation),
    /// A numeric literal.
    Number(f64),
    /// A string literal.
    Str(String),
    /// A reference to a declared identifier.
    Identifier(String),
}

/// A typed node of the expression tree.
///
/// Nodes are typed at construction: [`Node::new`] resolves identifiers
/// against the compile-time context, assigns the result type and lvalue
/// flag dictated by the operation, and verifies that every child converts
/// to what the operation demands. A fully built tree is therefore known to
/// be well-typed before any lowering happens.
#[derive(Debug)]
pub struct Node {
    /// The payload of the node.
    pub value:    NodeValue,
    /// The operands, in source order.
    pub children: Vec<Node>,
    /// The resolved type of the node's result.
    pub type_id:  TypeHandle,
    /// `true` when the result refers to a storage cell.
    pub lvalue:   bool,
    /// The source line of the node.
    pub line:     usize,
    /// The source column of the node.
    pub col:      usize,
}

/// Decides whether a value of type `from` converts implicitly to `to`.
///
/// The rules, in order: everything converts to `void`; an lvalue
/// destination requires an lvalue source of the same type; equal types
/// convert; an initializer list converts to an array when every element has
/// the element type, and to a tuple of the same shape; `number` converts to
/// `string`.
#[must_use]
pub fn is_convertible(context: &CompilerContext,
                      from: TypeHandle,
                      from_lvalue: bool,
                      to: TypeHandle,
                      to_lvalue: bool)
                      -> bool {
    if to == TypeHandle::VOID {
        return true;
    }
    if to_lvalue {
        return from_lvalue && from == to;
    }
    if from == to {
        return true;
    }
    if let Type::InitList(inner) = context.registry().get(from) {
        return match context.registry().get(to) {
            Type::Array(element) => inner.iter().all(|t| t == element),
            Type::Tuple(elements) => inner == elements,
            _ => false,
        };
    }
    from == TypeHandle::NUMBER && to == TypeHandle::STRING
}

impl Node {
    /// Builds a node, resolving its type and checking its children.
    ///
    /// # Errors
    /// Returns a [`CompileError`] when an identifier is undeclared, a child
    /// does not convert to the type the operation requires, an index is
    /// applied to something that is not an array or tuple, a tuple index is
    /// not an in-range integer literal, or a call has the wrong shape.
    pub fn new(context: &mut CompilerContext,
               value: NodeValue,
               children: Vec<Node>,
               line: usize,
               col: usize)
               -> Result<Self, CompileError> {
        let mut node = Self { value,
                              children,
                              type_id: TypeHandle::VOID,
                              lvalue: false,
                              line,
                              col };

        match &node.value {
            NodeValue::Number(_) => {
                node.type_id = TypeHandle::NUMBER;
            },
            NodeValue::Str(_) => {
                node.type_id = TypeHandle::STRING;
            },
            NodeValue::Identifier(name) => match context.find(name) {
                Some(info) => {
                    node.type_id = info.type_id;
                    node.lvalue = info.scope != IdentifierScope::Function;
                },
                None => {
                    return Err(CompileError::UndeclaredIdentifier { name: name.clone(),
                                                                    line,
                                                                    col });
                },
            },
            NodeValue::Operation(op) => {
                let op = *op;
                node.resolve_operation(context, op)?;
            },
        }

        Ok(node)
    }

    fn resolve_operation(&mut self,
                         context: &mut CompilerContext,
                         op: NodeOperation)
                         -> Result<(), CompileError> {
        use NodeOperation::{
            Add, AddAssign, AndAssign, Assign, BitwiseAnd, BitwiseNot, BitwiseOr, BitwiseXor,
            Call, Comma, Concat, ConcatAssign, Div, DivAssign, Eq, Ge, Gt, Idiv, IdivAssign,
            Index, Init, Le, LogicalAnd, LogicalNot, LogicalOr, Lt, Mod, ModAssign, Mul,
            MulAssign, Ne, Negative, OrAssign, Param, Positive, Postdec, Postinc, Predec, Preinc,
            Shiftl, ShiftlAssign, Shiftr, ShiftrAssign, Size, Sub, SubAssign, Ternary, ToString,
            XorAssign,
        };

        match op {
            Param => {
                self.type_id = self.children[0].type_id;
            },
            Preinc | Predec => {
                self.type_id = TypeHandle::NUMBER;
                self.lvalue = true;
                self.children[0].check_conversion(context, TypeHandle::NUMBER, true)?;
            },
            Postinc | Postdec => {
                self.type_id = TypeHandle::NUMBER;
                self.children[0].check_conversion(context, TypeHandle::NUMBER, true)?;
            },
            Positive | Negative | BitwiseNot | LogicalNot => {
                self.type_id = TypeHandle::NUMBER;
                self.children[0].check_conversion(context, TypeHandle::NUMBER, false)?;
            },
            Size => {
                self.type_id = TypeHandle::NUMBER;
            },
            ToString => {
                self.type_id = TypeHandle::STRING;
            },
            Add | Sub | Mul | Div | Idiv | Mod | BitwiseAnd | BitwiseOr | BitwiseXor | Shiftl
            | Shiftr | LogicalAnd | LogicalOr => {
                self.type_id = TypeHandle::NUMBER;
                self.children[0].check_conversion(context, TypeHandle::NUMBER, false)?;
                self.children[1].check_conversion(context, TypeHandle::NUMBER, false)?;
            },
            Eq | Ne | Lt | Gt | Le | Ge => {
                self.type_id = TypeHandle::NUMBER;
                if self.children[0].type_id == TypeHandle::NUMBER
                   && self.children[1].type_id == TypeHandle::NUMBER
                {
                    self.children[0].check_conversion(context, TypeHandle::NUMBER, false)?;
                    self.children[1].check_conversion(context, TypeHandle::NUMBER, false)?;
                } else {
                    self.children[0].check_conversion(context, TypeHandle::STRING, false)?;
                    self.children[1].check_conversion(context, TypeHandle::STRING, false)?;
                }
            },
            Concat => {
                self.type_id = TypeHandle::STRING;
                self.children[0].check_conversion(context, TypeHandle::STRING, false)?;
                self.children[1].check_conversion(context, TypeHandle::STRING, false)?;
            },
            Assign => {
                self.type_id = self.children[0].type_id;
                self.lvalue = true;
                self.children[0].check_conversion(context, self.type_id, true)?;
                self.children[1].check_conversion(context, self.type_id, false)?;
            },
            AddAssign | SubAssign | MulAssign | DivAssign | IdivAssign | ModAssign | AndAssign
            | OrAssign | XorAssign | ShiftlAssign | ShiftrAssign => {
                self.type_id = TypeHandle::NUMBER;
                self.lvalue = true;
                self.children[0].check_conversion(context, TypeHandle::NUMBER, true)?;
                self.children[1].check_conversion(context, TypeHandle::NUMBER, false)?;
            },
            ConcatAssign => {
                self.type_id = TypeHandle::STRING;
                self.lvalue = true;
                self.children[0].check_conversion(context, TypeHandle::STRING, true)?;
                self.children[1].check_conversion(context, TypeHandle::STRING, false)?;
            },
            Comma => {
                for child in &self.children[..self.children.len() - 1] {
                    child.check_conversion(context, TypeHandle::VOID, false)?;
                }
                let last = &self.children[self.children.len() - 1];
                self.type_id = last.type_id;
                self.lvalue = last.lvalue;
            },
            Index => self.resolve_index(context)?,
            Ternary => {
                self.children[0].check_conversion(context, TypeHandle::NUMBER, false)?;

                let (then, other) = (&self.children[1], &self.children[2]);
                if is_convertible(context, other.type_id, other.lvalue, then.type_id, then.lvalue)
                {
                    self.type_id = then.type_id;
                    self.lvalue = then.lvalue;
                } else {
                    self.children[1].check_conversion(context,
                                                      self.children[2].type_id,
                                                      self.children[2].lvalue)?;
                    self.type_id = self.children[2].type_id;
                    self.lvalue = self.children[2].lvalue;
                }
            },
            Call => self.resolve_call(context)?,
            Init => {
                let inner = self.children.iter().map(|c| c.type_id).collect();
                self.type_id = context.get_handle(Type::InitList(inner));
            },
        }

        Ok(())
    }

    fn resolve_index(&mut self, context: &mut CompilerContext) -> Result<(), CompileError> {
        self.lvalue = self.children[0].lvalue;

        match context.registry().get(self.children[0].type_id) {
            Type::Array(inner) => {
                self.type_id = *inner;
                self.children[1].check_conversion(context, TypeHandle::NUMBER, false)?;
            },
            Type::Tuple(inner) => {
                let inner = inner.clone();
                let NodeValue::Number(idx) = self.children[1].value else {
                    return Err(CompileError::InvalidTupleIndex { index: None,
                                                                 line:  self.line,
                                                                 col:   self.col, });
                };

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                if idx >= 0.0 && idx.fract() == 0.0 && (idx as usize) < inner.len() {
                    self.type_id = inner[idx as usize];
                } else {
                    return Err(CompileError::InvalidTupleIndex { index: Some(idx),
                                                                 line:  self.line,
                                                                 col:   self.col, });
                }
            },
            _ => {
                return Err(CompileError::NotIndexable { type_name:
                                                            context.registry()
                                                                   .display(self.children[0]
                                                                                .type_id),
                                                        line: self.line,
                                                        col: self.col, });
            },
        }

        Ok(())
    }

    fn resolve_call(&mut self, context: &mut CompilerContext) -> Result<(), CompileError> {
        let Type::Function(ft) = context.registry().get(self.children[0].type_id) else {
            return Err(CompileError::NotCallable { type_name:
                                                       context.registry()
                                                              .display(self.children[0].type_id),
                                                   line: self.line,
                                                   col: self.col, });
        };
        let ft = ft.clone();

        self.type_id = ft.return_type;

        if ft.params.len() + 1 != self.children.len() {
            return Err(CompileError::WrongArgumentCount { expected: ft.params.len(),
                                                          given:    self.children.len() - 1,
                                                          line:     self.line,
                                                          col:      self.col, });
        }

        for (param, argument) in ft.params.iter().zip(&self.children[1..]) {
            if argument.lvalue && !param.by_ref {
                return Err(CompileError::ByValueParameter { line: argument.line,
                                                            col:  argument.col, });
            }
            argument.check_conversion(context, param.type_id, param.by_ref)?;
        }

        Ok(())
    }

    /// Verifies that this node's result converts to `(type_id, lvalue)`.
    ///
    /// # Errors
    /// Returns [`CompileError::NotLvalue`] when an lvalue was demanded and
    /// the conversion failed, and [`CompileError::CannotConvert`] otherwise.
    pub fn check_conversion(&self,
                            context: &CompilerContext,
                            type_id: TypeHandle,
                            lvalue: bool)
                            -> Result<(), CompileError> {
        if is_convertible(context, self.type_id, self.lvalue, type_id, lvalue) {
            return Ok(());
        }

        if lvalue {
            Err(CompileError::NotLvalue { type_name: context.registry().display(self.type_id),
                                          line:      self.line,
                                          col:       self.col, })
        } else {
            Err(CompileError::CannotConvert { from: context.registry().display(self.type_id),
                                              to:   context.registry().display(type_id),
                                              line: self.line,
                                              col:  self.col, })
        }
    }

    /// Returns `true` when the node is a numeric literal.
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self.value, NodeValue::Number(_))
    }

    /// Returns the numeric literal carried by the node, if any.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match self.value {
            NodeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Returns `true` when the node applies `operation`.
    #[must_use]
    pub fn is_operation(&self, operation: NodeOperation) -> bool {
        self.value == NodeValue::Operation(operation)
    }
}

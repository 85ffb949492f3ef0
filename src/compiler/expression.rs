use std::rc::Rc;

use crate::{
    ast::{Node, NodeOperation, NodeValue},
    compiler::{
        context::{CompilerContext, IdentifierScope},
        expression_parser::parse_expression_tree,
        lexer::TokenStream,
    },
    error::CompileError,
    runtime::expression::{ArithOp, CompareOp, Expr},
    types::{Type, TypeHandle},
};

/// The value shape an expression produces or a consumer demands: a type
/// handle plus whether the result is a box or a plain value.
type Shape = (TypeHandle, bool);

fn internal(message: &str, line: usize, col: usize) -> CompileError {
    CompileError::Internal { message: message.to_string(),
                             line,
                             col }
}

/// Bridges the shape an evaluator naturally produces to the shape its
/// consumer demands.
///
/// This is the single conversion helper the whole lowering goes through:
/// everything converts to `void` by discarding, a box unboxes to a value of
/// the same type (deep-cloning arrays), and numbers stringify. Any other
/// request means the typed tree and the builder disagree, which is an
/// internal compiler error rather than a user-facing one.
fn convert(context: &CompilerContext,
           expr: Expr,
           from: Shape,
           to: Shape,
           line: usize,
           col: usize)
           -> Result<Expr, CompileError> {
    let (from_type, from_lvalue) = from;
    let (to_type, to_lvalue) = to;

    if to_type == TypeHandle::VOID && !to_lvalue {
        if from_type == TypeHandle::VOID {
            return Ok(expr);
        }
        return Ok(Expr::ToVoid(Box::new(expr)));
    }

    if to_lvalue {
        if from_lvalue && from_type == to_type {
            return Ok(expr);
        }
        return Err(internal("expression does not produce the expected box", line, col));
    }

    if from_lvalue {
        if from_type == to_type {
            return Ok(Expr::Unbox(Box::new(expr)));
        }
        if from_type == TypeHandle::NUMBER && to_type == TypeHandle::STRING {
            return Ok(Expr::Stringify(Box::new(Expr::Unbox(Box::new(expr)))));
        }
        return Err(internal("no conversion for a checked expression", line, col));
    }

    if from_type == to_type {
        return Ok(expr);
    }
    if from_type == TypeHandle::NUMBER && to_type == TypeHandle::STRING {
        return Ok(Expr::Stringify(Box::new(expr)));
    }
    if matches!(context.registry().get(from_type), Type::InitList(_))
       && matches!(context.registry().get(to_type), Type::Array(_) | Type::Tuple(_))
    {
        // Initializer lists, arrays, and tuples share one representation.
        return Ok(expr);
    }

    Err(internal("no conversion for a checked expression", line, col))
}

const fn arith_op(operation: NodeOperation) -> Option<ArithOp> {
    match operation {
        NodeOperation::Add | NodeOperation::AddAssign => Some(ArithOp::Add),
        NodeOperation::Sub | NodeOperation::SubAssign => Some(ArithOp::Sub),
        NodeOperation::Mul | NodeOperation::MulAssign => Some(ArithOp::Mul),
        NodeOperation::Div | NodeOperation::DivAssign => Some(ArithOp::Div),
        NodeOperation::Idiv | NodeOperation::IdivAssign => Some(ArithOp::Idiv),
        NodeOperation::Mod | NodeOperation::ModAssign => Some(ArithOp::Mod),
        NodeOperation::BitwiseAnd | NodeOperation::AndAssign => Some(ArithOp::And),
        NodeOperation::BitwiseOr | NodeOperation::OrAssign => Some(ArithOp::Or),
        NodeOperation::BitwiseXor | NodeOperation::XorAssign => Some(ArithOp::Xor),
        NodeOperation::Shiftl | NodeOperation::ShiftlAssign => Some(ArithOp::Shl),
        NodeOperation::Shiftr | NodeOperation::ShiftrAssign => Some(ArithOp::Shr),
        _ => None,
    }
}

const fn compare_op(operation: NodeOperation) -> Option<CompareOp> {
    match operation {
        NodeOperation::Eq => Some(CompareOp::Eq),
        NodeOperation::Ne => Some(CompareOp::Ne),
        NodeOperation::Lt => Some(CompareOp::Lt),
        NodeOperation::Gt => Some(CompareOp::Gt),
        NodeOperation::Le => Some(CompareOp::Le),
        NodeOperation::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

/// Lowers a typed tree node into an evaluator producing shape
/// `(to, to_lvalue)`.
///
/// The node's typing already proved every conversion this asks for, so a
/// failure here is an internal invariant violation, never a user error.
#[allow(clippy::too_many_lines)]
fn build_node(context: &CompilerContext,
              node: &Node,
              to: TypeHandle,
              to_lvalue: bool)
              -> Result<Expr, CompileError> {
    use NodeOperation as Op;

    let target = (to, to_lvalue);
    let (line, col) = (node.line, node.col);

    match &node.value {
        NodeValue::Number(n) => {
            convert(context, Expr::ConstNumber(*n), (TypeHandle::NUMBER, false), target, line, col)
        },
        NodeValue::Str(s) => convert(context,
                                     Expr::ConstString(Rc::new(s.clone())),
                                     (TypeHandle::STRING, false),
                                     target,
                                     line,
                                     col),
        NodeValue::Identifier(name) => {
            let info = context.find(name)
                              .ok_or_else(|| internal("identifier lost after typing", line, col))?;

            #[allow(clippy::cast_sign_loss)]
            let expr = match info.scope {
                IdentifierScope::Global => Expr::Global(info.index as usize),
                IdentifierScope::Local => Expr::Local(info.index),
                IdentifierScope::Function => Expr::FunctionRef(info.index as usize),
            };
            convert(context, expr, (node.type_id, node.lvalue), target, line, col)
        },
        NodeValue::Operation(operation) => {
            let operation = *operation;
            let children = &node.children;

            match operation {
                Op::Param => Err(internal("stray by-value argument wrapper", line, col)),

                Op::Preinc | Op::Predec => {
                    let inner = Box::new(build_node(context,
                                                    &children[0],
                                                    TypeHandle::NUMBER,
                                                    true)?);
                    let expr = if operation == Op::Preinc {
                        Expr::Preinc(inner)
                    } else {
                        Expr::Predec(inner)
                    };
                    convert(context, expr, (TypeHandle::NUMBER, true), target, line, col)
                },
                Op::Postinc | Op::Postdec => {
                    let inner = Box::new(build_node(context,
                                                    &children[0],
                                                    TypeHandle::NUMBER,
                                                    true)?);
                    let expr = if operation == Op::Postinc {
                        Expr::Postinc(inner)
                    } else {
                        Expr::Postdec(inner)
                    };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },
                Op::Positive | Op::Negative | Op::BitwiseNot | Op::LogicalNot => {
                    let inner = Box::new(build_node(context,
                                                    &children[0],
                                                    TypeHandle::NUMBER,
                                                    false)?);
                    let expr = match operation {
                        Op::Positive => Expr::Positive(inner),
                        Op::Negative => Expr::Negative(inner),
                        Op::BitwiseNot => Expr::BitwiseNot(inner),
                        _ => Expr::LogicalNot(inner),
                    };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },

                Op::Size => {
                    let operand = &children[0];
                    let expr = if matches!(context.registry().get(operand.type_id), Type::Array(_))
                    {
                        Expr::Size(Box::new(build_node(context,
                                                       operand,
                                                       operand.type_id,
                                                       operand.lvalue)?))
                    } else {
                        // Everything that is not an array has size 1.
                        Expr::ConstNumber(1.0)
                    };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },
                Op::ToString => {
                    let operand = &children[0];
                    if matches!(context.registry().get(operand.type_id), Type::InitList(_)) {
                        return Err(internal("tostring applied to an initializer list", line, col));
                    }
                    let expr = Expr::ToString(Box::new(build_node(context,
                                                                  operand,
                                                                  operand.type_id,
                                                                  operand.lvalue)?));
                    convert(context, expr, (TypeHandle::STRING, false), target, line, col)
                },

                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Idiv | Op::Mod | Op::BitwiseAnd
                | Op::BitwiseOr | Op::BitwiseXor | Op::Shiftl | Op::Shiftr => {
                    let op = arith_op(operation)
                        .ok_or_else(|| internal("unmapped arithmetic operator", line, col))?;
                    let expr = Expr::Arith { op,
                                             left: Box::new(build_node(context,
                                                                       &children[0],
                                                                       TypeHandle::NUMBER,
                                                                       false)?),
                                             right: Box::new(build_node(context,
                                                                        &children[1],
                                                                        TypeHandle::NUMBER,
                                                                        false)?) };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },
                Op::AddAssign | Op::SubAssign | Op::MulAssign | Op::DivAssign | Op::IdivAssign
                | Op::ModAssign | Op::AndAssign | Op::OrAssign | Op::XorAssign
                | Op::ShiftlAssign | Op::ShiftrAssign => {
                    let op = arith_op(operation)
                        .ok_or_else(|| internal("unmapped arithmetic operator", line, col))?;
                    let expr = Expr::ArithAssign { op,
                                                   target: Box::new(build_node(context,
                                                                               &children[0],
                                                                               TypeHandle::NUMBER,
                                                                               true)?),
                                                   value: Box::new(build_node(context,
                                                                              &children[1],
                                                                              TypeHandle::NUMBER,
                                                                              false)?) };
                    convert(context, expr, (TypeHandle::NUMBER, true), target, line, col)
                },

                Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                    let op = compare_op(operation)
                        .ok_or_else(|| internal("unmapped comparison operator", line, col))?;
                    let strings = children[0].type_id != TypeHandle::NUMBER
                                  || children[1].type_id != TypeHandle::NUMBER;
                    let operand_type = if strings {
                        TypeHandle::STRING
                    } else {
                        TypeHandle::NUMBER
                    };
                    let expr = Expr::Compare { op,
                                               strings,
                                               left: Box::new(build_node(context,
                                                                         &children[0],
                                                                         operand_type,
                                                                         false)?),
                                               right: Box::new(build_node(context,
                                                                          &children[1],
                                                                          operand_type,
                                                                          false)?) };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },

                Op::LogicalAnd | Op::LogicalOr => {
                    let left = Box::new(build_node(context,
                                                   &children[0],
                                                   TypeHandle::NUMBER,
                                                   false)?);
                    let right = Box::new(build_node(context,
                                                    &children[1],
                                                    TypeHandle::NUMBER,
                                                    false)?);
                    let expr = if operation == Op::LogicalAnd {
                        Expr::LogicalAnd { left, right }
                    } else {
                        Expr::LogicalOr { left, right }
                    };
                    convert(context, expr, (TypeHandle::NUMBER, false), target, line, col)
                },

                Op::Concat => {
                    let expr = Expr::Concat { left: Box::new(build_node(context,
                                                                        &children[0],
                                                                        TypeHandle::STRING,
                                                                        false)?),
                                              right: Box::new(build_node(context,
                                                                         &children[1],
                                                                         TypeHandle::STRING,
                                                                         false)?) };
                    convert(context, expr, (TypeHandle::STRING, false), target, line, col)
                },
                Op::ConcatAssign => {
                    let expr = Expr::ConcatAssign { target: Box::new(build_node(context,
                                                                               &children[0],
                                                                               TypeHandle::STRING,
                                                                               true)?),
                                                    value: Box::new(build_node(context,
                                                                               &children[1],
                                                                               TypeHandle::STRING,
                                                                               false)?) };
                    convert(context, expr, (TypeHandle::STRING, true), target, line, col)
                },

                Op::Assign => {
                    let expr = Expr::Assign { target: Box::new(build_node(context,
                                                                          &children[0],
                                                                          node.type_id,
                                                                          true)?),
                                              value: Box::new(build_node(context,
                                                                         &children[1],
                                                                         node.type_id,
                                                                         false)?) };
                    convert(context, expr, (node.type_id, true), target, line, col)
                },

                // The comma and ternary results are produced directly in the
                // demanded shape; no conversion edge is needed on the node
                // itself.
                Op::Comma => Ok(Expr::Comma { left: Box::new(build_node(context,
                                                                        &children[0],
                                                                        TypeHandle::VOID,
                                                                        false)?),
                                              right: Box::new(build_node(context,
                                                                         &children[1],
                                                                         to,
                                                                         to_lvalue)?), }),
                Op::Ternary => Ok(Expr::Ternary { condition:
                                                      Box::new(build_node(context,
                                                                          &children[0],
                                                                          TypeHandle::NUMBER,
                                                                          false)?),
                                                  then: Box::new(build_node(context,
                                                                            &children[1],
                                                                            to,
                                                                            to_lvalue)?),
                                                  otherwise: Box::new(build_node(context,
                                                                                 &children[2],
                                                                                 to,
                                                                                 to_lvalue)?), }),

                Op::Index => {
                    let aggregate = &children[0];
                    let expr = match context.registry().get(aggregate.type_id) {
                        Type::Tuple(_) => {
                            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                            let index = children[1]
                                .number()
                                .ok_or_else(|| internal("tuple index lost after typing",
                                                        line,
                                                        col))? as usize;
                            Expr::Member { tuple: Box::new(build_node(context,
                                                                      aggregate,
                                                                      aggregate.type_id,
                                                                      aggregate.lvalue)?),
                                           index }
                        },
                        Type::Array(element) => {
                            let element = *element;
                            Expr::Index { array: Box::new(build_node(context,
                                                                     aggregate,
                                                                     aggregate.type_id,
                                                                     aggregate.lvalue)?),
                                          index: Box::new(build_node(context,
                                                                     &children[1],
                                                                     TypeHandle::NUMBER,
                                                                     false)?),
                                          default:
                                              Box::new(build_default_initialization(context,
                                                                                    element,
                                                                                    line,
                                                                                    col)?), }
                        },
                        _ => return Err(internal("index into a non-indexable type", line, col)),
                    };
                    convert(context, expr, (node.type_id, true), target, line, col)
                },

                Op::Call => {
                    let Type::Function(ft) = context.registry().get(children[0].type_id) else {
                        return Err(internal("call of a non-function type", line, col));
                    };
                    let ft = ft.clone();

                    let callee = Box::new(build_node(context,
                                                     &children[0],
                                                     children[0].type_id,
                                                     false)?);

                    let mut arguments = Vec::with_capacity(ft.params.len());
                    for (param, argument) in ft.params.iter().zip(&children[1..]) {
                        if argument.is_operation(Op::Param) {
                            let inner =
                                build_node(context, &argument.children[0], param.type_id, false)?;
                            arguments.push(Expr::Param(Box::new(inner)));
                        } else {
                            arguments.push(build_node(context, argument, param.type_id, true)?);
                        }
                    }

                    let expr = Expr::Call { callee, arguments };
                    let from = if ft.return_type == TypeHandle::VOID {
                        (TypeHandle::VOID, false)
                    } else {
                        (ft.return_type, true)
                    };
                    convert(context, expr, from, target, line, col)
                },

                Op::Init => {
                    let mut elements = Vec::with_capacity(children.len());
                    for child in children {
                        if matches!(context.registry().get(child.type_id), Type::InitList(_)) {
                            return Err(internal("nested initializer list has no storage",
                                                child.line,
                                                child.col));
                        }
                        let inner = build_node(context, child, child.type_id, false)?;
                        elements.push(Expr::Param(Box::new(inner)));
                    }
                    convert(context,
                            Expr::InitList(elements),
                            (node.type_id, false),
                            target,
                            line,
                            col)
                },
            }
        },
    }
}

/// Builds the evaluator of a default-initialized value of `type_id`: `0`,
/// the empty string, an uninitialized function, an empty array, or a tuple
/// of default-initialized elements, each in a fresh box.
///
/// # Errors
/// Returns an internal [`CompileError`] for `void` and initializer-list
/// types, which have no values.
pub fn build_default_initialization(context: &CompilerContext,
                                    type_id: TypeHandle,
                                    line: usize,
                                    col: usize)
                                    -> Result<Expr, CompileError> {
    match context.registry().get(type_id) {
        Type::Number => Ok(Expr::DefaultNumber),
        Type::String => Ok(Expr::DefaultString),
        Type::Function(_) => Ok(Expr::DefaultFunction),
        Type::Array(_) => Ok(Expr::DefaultArray),
        Type::Tuple(inner) => {
            let inner = inner.clone();
            let mut elements = Vec::with_capacity(inner.len());
            for element in inner {
                elements.push(build_default_initialization(context, element, line, col)?);
            }
            Ok(Expr::DefaultTuple(elements))
        },
        Type::Void | Type::InitList(_) => {
            Err(internal("type has no default value", line, col))
        },
    }
}

/// Parses and lowers an expression evaluated purely for its effects, such
/// as an expression statement or a `for` step. The empty expression is
/// allowed and lowers to a no-op.
///
/// # Errors
/// Returns any [`CompileError`] raised while parsing, typing, or lowering.
pub fn build_void_expression(context: &mut CompilerContext,
                             tokens: &mut TokenStream)
                             -> Result<Expr, CompileError> {
    match parse_expression_tree(context, tokens, TypeHandle::VOID, true)? {
        Some(node) => build_node(context, &node, TypeHandle::VOID, false),
        None => Ok(Expr::Nop),
    }
}

/// Parses and lowers a condition: an expression convertible to `number`.
///
/// # Errors
/// Returns any [`CompileError`] raised while parsing, typing, or lowering.
pub fn build_number_expression(context: &mut CompilerContext,
                               tokens: &mut TokenStream)
                               -> Result<Expr, CompileError> {
    let (line, col) = tokens.location();
    let node = parse_expression_tree(context, tokens, TypeHandle::NUMBER, true)?
        .ok_or_else(|| internal("condition parsed to nothing", line, col))?;
    build_node(context, &node, TypeHandle::NUMBER, false)
}

/// Parses and lowers an initializer for a variable of `type_id`, producing
/// an evaluator that yields a fresh box holding the converted value.
///
/// # Errors
/// Returns any [`CompileError`] raised while parsing, typing, or lowering.
pub fn build_initialization_expression(context: &mut CompilerContext,
                                       tokens: &mut TokenStream,
                                       type_id: TypeHandle,
                                       allow_comma: bool)
                                       -> Result<Expr, CompileError> {
    let (line, col) = tokens.location();
    let node = parse_expression_tree(context, tokens, type_id, allow_comma)?
        .ok_or_else(|| internal("initializer parsed to nothing", line, col))?;
    let inner = build_node(context, &node, type_id, false)?;
    Ok(Expr::Param(Box::new(inner)))
}

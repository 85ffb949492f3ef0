use std::rc::Rc;

use crate::{
    error::RuntimeError,
    runtime::{
        context::RuntimeContext,
        value::{
            Value, Variable, VariableValue, new_variable, number_to_string, unbox,
            value_to_string,
        },
    },
};

/// Result type used by expression and statement evaluation.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// An arithmetic, bitwise, or shift operator shared between the binary and
/// the compound-assignment evaluators.
#[derive(Debug, Clone, Copy)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `\` — division truncated toward zero
    Idiv,
    /// `%` — `a - b * int(a / b)`
    Mod,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// A comparison operator. All six are derived from a single `lt` primitive,
/// on numbers or on the underlying bytes of strings.
#[derive(Debug, Clone, Copy)]
pub enum CompareOp {
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
}

/// An executable expression, lowered from a typed tree node.
///
/// Each variant evaluates its children left to right, applies its operation,
/// and produces exactly the value shape its constructor promised: the
/// builder has already inserted [`Expr::Unbox`], [`Expr::Stringify`], and
/// [`Expr::ToVoid`] edges wherever the consumer expects a different shape,
/// so evaluation never needs to guess.
#[derive(Debug)]
pub enum Expr {
    /// The empty expression; evaluates to nothing.
    Nop,
    /// A numeric literal.
    ConstNumber(f64),
    /// A string literal.
    ConstString(Rc<String>),
    /// The box of a global variable.
    Global(usize),
    /// The box of a local variable or parameter.
    Local(isize),
    /// A function table entry.
    FunctionRef(usize),
    /// A fresh box holding `0`.
    DefaultNumber,
    /// A fresh box holding the empty string.
    DefaultString,
    /// A fresh box holding an uninitialized function.
    DefaultFunction,
    /// A fresh box holding an empty array.
    DefaultArray,
    /// A fresh box holding a tuple of default-initialized elements.
    DefaultTuple(Vec<Expr>),
    /// Reads the value out of a box, deep-cloning arrays.
    Unbox(Box<Expr>),
    /// Formats a number value as a string.
    Stringify(Box<Expr>),
    /// Evaluates for effect and discards the result.
    ToVoid(Box<Expr>),
    /// Clones a value into a fresh box; the by-value argument wrapper.
    Param(Box<Expr>),
    /// Prefix `++` on a number box.
    Preinc(Box<Expr>),
    /// Prefix `--` on a number box.
    Predec(Box<Expr>),
    /// Postfix `++` on a number box.
    Postinc(Box<Expr>),
    /// Postfix `--` on a number box.
    Postdec(Box<Expr>),
    /// Unary `+`.
    Positive(Box<Expr>),
    /// Unary `-`.
    Negative(Box<Expr>),
    /// `~`, on the operand cast to an integer.
    BitwiseNot(Box<Expr>),
    /// `!`.
    LogicalNot(Box<Expr>),
    /// `sizeof` of an array; the compiler folds every other operand to `1`.
    Size(Box<Expr>),
    /// `tostring` of any value.
    ToString(Box<Expr>),
    /// A numeric binary operator.
    Arith {
        /// The operator.
        op:    ArithOp,
        /// Left operand, a number value.
        left:  Box<Expr>,
        /// Right operand, a number value.
        right: Box<Expr>,
    },
    /// A compound assignment such as `+=`; the target stays a box.
    ArithAssign {
        /// The operator.
        op:     ArithOp,
        /// The assigned box.
        target: Box<Expr>,
        /// The right-hand number value.
        value:  Box<Expr>,
    },
    /// `..` — string concatenation into a fresh shared string.
    Concat {
        /// Left operand, a string value.
        left:  Box<Expr>,
        /// Right operand, a string value.
        right: Box<Expr>,
    },
    /// `..=` — concatenation onto a string box.
    ConcatAssign {
        /// The assigned box.
        target: Box<Expr>,
        /// The appended string value.
        value:  Box<Expr>,
    },
    /// A comparison, numeric or lexicographic.
    Compare {
        /// The operator.
        op:      CompareOp,
        /// `true` when both operands are compared as strings.
        strings: bool,
        /// Left operand.
        left:    Box<Expr>,
        /// Right operand.
        right:   Box<Expr>,
    },
    /// `&&` with short-circuit evaluation.
    LogicalAnd {
        /// Left operand.
        left:  Box<Expr>,
        /// Right operand; only evaluated when the left one is non-zero.
        right: Box<Expr>,
    },
    /// `||` with short-circuit evaluation.
    LogicalOr {
        /// Left operand.
        left:  Box<Expr>,
        /// Right operand; only evaluated when the left one is zero.
        right: Box<Expr>,
    },
    /// `=` — replaces the content of the target box.
    Assign {
        /// The assigned box.
        target: Box<Expr>,
        /// The stored value, already converted to the target's type.
        value:  Box<Expr>,
    },
    /// `,` — evaluates the left operand for effect, yields the right one.
    Comma {
        /// Discarded operand.
        left:  Box<Expr>,
        /// Result operand.
        right: Box<Expr>,
    },
    /// `?:` — evaluates exactly one branch.
    Ternary {
        /// The condition, a number value.
        condition: Box<Expr>,
        /// The branch taken on non-zero.
        then:      Box<Expr>,
        /// The branch taken on zero.
        otherwise: Box<Expr>,
    },
    /// Array indexing, growing the array with default elements on
    /// out-of-range writes.
    Index {
        /// The indexed array, as a box or a value.
        array:   Box<Expr>,
        /// The index, a number value truncated to an integer.
        index:   Box<Expr>,
        /// Produces one default-initialized element when the array grows.
        default: Box<Expr>,
    },
    /// Tuple member access through a compile-time slot.
    Member {
        /// The accessed tuple, as a box or a value.
        tuple: Box<Expr>,
        /// The element slot.
        index: usize,
    },
    /// A function call.
    Call {
        /// The callee, a function value.
        callee:    Box<Expr>,
        /// The argument boxes, evaluated left to right.
        arguments: Vec<Expr>,
    },
    /// A brace initializer; evaluates each element into a fresh box.
    InitList(Vec<Expr>),
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(n: f64) -> i64 {
    n as i64
}

#[allow(clippy::cast_precision_loss)]
fn arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Idiv => (a / b).trunc(),
        ArithOp::Mod => a - b * (a / b).trunc(),
        ArithOp::And => (to_int(a) & to_int(b)) as f64,
        ArithOp::Or => (to_int(a) | to_int(b)) as f64,
        ArithOp::Xor => (to_int(a) ^ to_int(b)) as f64,
        ArithOp::Shl => to_int(a).wrapping_shl(to_int(b) as u32) as f64,
        ArithOp::Shr => to_int(a).wrapping_shr(to_int(b) as u32) as f64,
    }
}

fn compare<T: PartialOrd>(op: CompareOp, a: &T, b: &T) -> f64 {
    let result = match op {
        CompareOp::Eq => !(a < b) && !(b < a),
        CompareOp::Ne => a < b || b < a,
        CompareOp::Lt => a < b,
        CompareOp::Gt => b < a,
        CompareOp::Le => !(b < a),
        CompareOp::Ge => !(a < b),
    };
    f64::from(result)
}

/// Mutates the number inside a box and returns the chosen snapshot.
fn update_number(variable: &Variable, update: impl FnOnce(&mut f64) -> f64) -> f64 {
    match &mut *variable.borrow_mut() {
        VariableValue::Number(n) => update(n),
        _ => unreachable!("box typed as number"),
    }
}

fn array_len(array: &Variable) -> usize {
    match &*array.borrow() {
        VariableValue::Array(elements) => elements.len(),
        _ => unreachable!("box typed as array"),
    }
}

fn array_element(array: &Variable, index: usize) -> Variable {
    match &*array.borrow() {
        VariableValue::Array(elements) => elements[index].clone(),
        _ => unreachable!("box typed as array"),
    }
}

fn array_push(array: &Variable, element: Variable) {
    match &mut *array.borrow_mut() {
        VariableValue::Array(elements) => elements.push(element),
        _ => unreachable!("box typed as array"),
    }
}

impl Expr {
    /// Evaluates the expression against the runtime context.
    ///
    /// # Errors
    /// Returns a [`RuntimeError`] on negative array indices, reads of
    /// not-yet-initialized globals, calls through unassigned function
    /// variables, and failures reported by native functions.
    #[allow(clippy::too_many_lines)]
    pub fn eval(&self, context: &mut RuntimeContext) -> EvalResult<Value> {
        match self {
            Self::Nop => Ok(Value::Void),
            Self::ConstNumber(n) => Ok(Value::Number(*n)),
            Self::ConstString(s) => Ok(Value::String(s.clone())),
            Self::Global(index) => Ok(Value::Lvalue(context.global(*index)?)),
            Self::Local(index) => Ok(Value::Lvalue(context.local(*index))),
            Self::FunctionRef(index) => Ok(Value::Function(Some(context.function(*index)))),

            Self::DefaultNumber => Ok(Value::Lvalue(new_variable(VariableValue::Number(0.0)))),
            Self::DefaultString => {
                Ok(Value::Lvalue(new_variable(VariableValue::Str(Rc::new(String::new())))))
            },
            Self::DefaultFunction => {
                Ok(Value::Lvalue(new_variable(VariableValue::Function(None))))
            },
            Self::DefaultArray => Ok(Value::Lvalue(new_variable(VariableValue::Array(Vec::new())))),
            Self::DefaultTuple(elements) => {
                let mut tuple = Vec::with_capacity(elements.len());
                for element in elements {
                    tuple.push(element.eval(context)?.into_box());
                }
                Ok(Value::Lvalue(new_variable(VariableValue::Array(tuple))))
            },

            Self::Unbox(expr) => Ok(unbox(expr.eval(context)?.into_box())),
            Self::Stringify(expr) => {
                let n = expr.eval(context)?.as_number();
                Ok(Value::String(Rc::new(number_to_string(n))))
            },
            Self::ToVoid(expr) => {
                expr.eval(context)?;
                Ok(Value::Void)
            },
            Self::Param(expr) => {
                let value = expr.eval(context)?;
                Ok(Value::Lvalue(new_variable(value.into_variable_value())))
            },

            Self::Preinc(expr) => {
                let variable = expr.eval(context)?.into_box();
                update_number(&variable, |n| {
                    *n += 1.0;
                    *n
                });
                Ok(Value::Lvalue(variable))
            },
            Self::Predec(expr) => {
                let variable = expr.eval(context)?.into_box();
                update_number(&variable, |n| {
                    *n -= 1.0;
                    *n
                });
                Ok(Value::Lvalue(variable))
            },
            Self::Postinc(expr) => {
                let variable = expr.eval(context)?.into_box();
                let old = update_number(&variable, |n| {
                    let old = *n;
                    *n += 1.0;
                    old
                });
                Ok(Value::Number(old))
            },
            Self::Postdec(expr) => {
                let variable = expr.eval(context)?.into_box();
                let old = update_number(&variable, |n| {
                    let old = *n;
                    *n -= 1.0;
                    old
                });
                Ok(Value::Number(old))
            },

            Self::Positive(expr) => Ok(Value::Number(expr.eval(context)?.as_number())),
            Self::Negative(expr) => Ok(Value::Number(-expr.eval(context)?.as_number())),
            #[allow(clippy::cast_precision_loss)]
            Self::BitwiseNot(expr) => {
                Ok(Value::Number(!to_int(expr.eval(context)?.as_number()) as f64))
            },
            Self::LogicalNot(expr) => {
                Ok(Value::Number(f64::from(expr.eval(context)?.as_number() == 0.0)))
            },

            #[allow(clippy::cast_precision_loss)]
            Self::Size(expr) => {
                let len = match expr.eval(context)? {
                    Value::Lvalue(v) => array_len(&v),
                    Value::Array(elements) => elements.len(),
                    _ => unreachable!("sizeof operand typed as array"),
                };
                Ok(Value::Number(len as f64))
            },
            Self::ToString(expr) => {
                let value = expr.eval(context)?;
                Ok(Value::String(Rc::new(value_to_string(&value))))
            },

            Self::Arith { op, left, right } => {
                let a = left.eval(context)?.as_number();
                let b = right.eval(context)?.as_number();
                Ok(Value::Number(arith(*op, a, b)))
            },
            Self::ArithAssign { op, target, value } => {
                let variable = target.eval(context)?.into_box();
                let b = value.eval(context)?.as_number();
                update_number(&variable, |n| {
                    *n = arith(*op, *n, b);
                    *n
                });
                Ok(Value::Lvalue(variable))
            },

            Self::Concat { left, right } => {
                let a = left.eval(context)?.into_string();
                let b = right.eval(context)?.into_string();
                Ok(Value::String(Rc::new(format!("{a}{b}"))))
            },
            Self::ConcatAssign { target, value } => {
                let variable = target.eval(context)?.into_box();
                let b = value.eval(context)?.into_string();
                {
                    let mut content = variable.borrow_mut();
                    match &mut *content {
                        VariableValue::Str(s) => *s = Rc::new(format!("{s}{b}")),
                        _ => unreachable!("box typed as string"),
                    }
                }
                Ok(Value::Lvalue(variable))
            },

            Self::Compare { op,
                            strings,
                            left,
                            right, } => {
                if *strings {
                    let a = left.eval(context)?.into_string();
                    let b = right.eval(context)?.into_string();
                    Ok(Value::Number(compare(*op, a.as_ref(), b.as_ref())))
                } else {
                    let a = left.eval(context)?.as_number();
                    let b = right.eval(context)?.as_number();
                    Ok(Value::Number(compare(*op, &a, &b)))
                }
            },

            Self::LogicalAnd { left, right } => {
                let a = left.eval(context)?.as_number();
                if a == 0.0 {
                    return Ok(Value::Number(0.0));
                }
                let b = right.eval(context)?.as_number();
                Ok(Value::Number(f64::from(b != 0.0)))
            },
            Self::LogicalOr { left, right } => {
                let a = left.eval(context)?.as_number();
                if a != 0.0 {
                    return Ok(Value::Number(1.0));
                }
                let b = right.eval(context)?.as_number();
                Ok(Value::Number(f64::from(b != 0.0)))
            },

            Self::Assign { target, value } => {
                let variable = target.eval(context)?.into_box();
                let value = value.eval(context)?;
                *variable.borrow_mut() = value.into_variable_value();
                Ok(Value::Lvalue(variable))
            },

            Self::Comma { left, right } => {
                left.eval(context)?;
                right.eval(context)
            },

            Self::Ternary { condition,
                            then,
                            otherwise, } => {
                if condition.eval(context)?.as_number() != 0.0 {
                    then.eval(context)
                } else {
                    otherwise.eval(context)
                }
            },

            Self::Index { array,
                          index,
                          default, } => {
                let array = array.eval(context)?;
                let index = index.eval(context)?.as_number();

                if index < 0.0 {
                    return Err(RuntimeError::NegativeIndex { index });
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let index = index as usize;

                match array {
                    Value::Lvalue(v) => {
                        while array_len(&v) <= index {
                            array_push(&v, default.eval(context)?.into_box());
                        }
                        Ok(Value::Lvalue(array_element(&v, index)))
                    },
                    Value::Array(mut elements) => {
                        while elements.len() <= index {
                            elements.push(default.eval(context)?.into_box());
                        }
                        Ok(Value::Lvalue(elements[index].clone()))
                    },
                    _ => unreachable!("indexed value typed as array"),
                }
            },

            Self::Member { tuple, index } => {
                let element = match tuple.eval(context)? {
                    Value::Lvalue(v) => array_element(&v, *index),
                    Value::Array(elements) => elements[*index].clone(),
                    _ => unreachable!("member access on value typed as tuple"),
                };
                Ok(Value::Lvalue(element))
            },

            Self::Call { callee, arguments } => {
                let mut argument_boxes = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_boxes.push(argument.eval(context)?.into_box());
                }

                let function = callee.eval(context)?
                                     .into_function()
                                     .ok_or(RuntimeError::UninitializedFunction)?;

                let ret = context.call(&function, argument_boxes)?;
                Ok(Value::Lvalue(ret))
            },

            Self::InitList(elements) => {
                let mut list = Vec::with_capacity(elements.len());
                for element in elements {
                    list.push(element.eval(context)?.into_box());
                }
                Ok(Value::Array(list))
            },
        }
    }
}

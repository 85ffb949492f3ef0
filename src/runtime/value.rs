use std::{cell::RefCell, rc::Rc};

use crate::{error::RuntimeError, runtime::context::RuntimeContext};

/// A box holding the current value of a script variable.
///
/// Every slot the runtime manipulates is such a box. Assignment replaces the
/// box's content in place, so every alias of the box observes the write;
/// by-ref parameters are simply clones of the caller's `Rc`. Scripts cannot
/// form reference cycles, so plain reference counting reclaims everything.
pub type Variable = Rc<RefCell<VariableValue>>;

/// Allocates a fresh box holding `value`.
#[must_use]
pub fn new_variable(value: VariableValue) -> Variable {
    Rc::new(RefCell::new(value))
}

/// A callable of the runtime: either a host-registered native or a compiled
/// script function. Both read their arguments from the frame at negative
/// offsets and leave their result in the return slot.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&mut RuntimeContext) -> Result<(), RuntimeError>>);

impl Function {
    /// Wraps a callable.
    pub fn new(f: impl Fn(&mut RuntimeContext) -> Result<(), RuntimeError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callable against an already prepared call frame.
    ///
    /// # Errors
    /// Propagates whatever runtime error the callable raises.
    pub fn invoke(&self, context: &mut RuntimeContext) -> Result<(), RuntimeError> {
        (self.0)(context)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Function")
    }
}

/// The content of a variable box.
///
/// Tuples share the array representation; a tuple is simply an array whose
/// shape the compiler already verified, so the runtime never needs to tell
/// them apart.
#[derive(Debug, Clone)]
pub enum VariableValue {
    /// A number.
    Number(f64),
    /// An immutable shared string.
    Str(Rc<String>),
    /// An ordered sequence of boxes.
    Array(Vec<Variable>),
    /// A function value; `None` until a function is first assigned.
    Function(Option<Function>),
}

/// A computed value flowing through expression evaluation.
///
/// `Lvalue` carries a variable box and is what identifier, index, and
/// assignment evaluators produce; every other variant is a plain rvalue.
/// The expression builder inserts explicit conversions wherever an rvalue
/// is needed from a box or a string from a number.
#[derive(Debug, Clone)]
pub enum Value {
    /// No value; the result of `void` expressions.
    Void,
    /// A number rvalue.
    Number(f64),
    /// A string rvalue.
    String(Rc<String>),
    /// An array, tuple, or initializer-list rvalue.
    Array(Vec<Variable>),
    /// A function rvalue; `None` for an unassigned function variable.
    Function(Option<Function>),
    /// A reference to a variable box.
    Lvalue(Variable),
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::new(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::new(s))
    }
}

impl Value {
    /// Extracts the number this value must hold.
    ///
    /// The expression builder only requests this on values it typed as
    /// numbers, so any other variant is an internal invariant violation.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            _ => unreachable!("value typed as number"),
        }
    }

    /// Extracts the string this value must hold.
    #[must_use]
    pub fn into_string(self) -> Rc<String> {
        match self {
            Self::String(s) => s,
            _ => unreachable!("value typed as string"),
        }
    }

    /// Extracts the variable box this value must refer to.
    #[must_use]
    pub fn into_box(self) -> Variable {
        match self {
            Self::Lvalue(v) => v,
            _ => unreachable!("value typed as lvalue"),
        }
    }

    /// Extracts the function this value must hold.
    #[must_use]
    pub fn into_function(self) -> Option<Function> {
        match self {
            Self::Function(f) => f,
            _ => unreachable!("value typed as function"),
        }
    }

    /// Moves this rvalue into the representation stored inside a box.
    #[must_use]
    pub fn into_variable_value(self) -> VariableValue {
        match self {
            Self::Number(n) => VariableValue::Number(n),
            Self::String(s) => VariableValue::Str(s),
            Self::Array(a) => VariableValue::Array(a),
            Self::Function(f) => VariableValue::Function(f),
            Self::Void | Self::Lvalue(_) => unreachable!("value has no storage representation"),
        }
    }

    /// Moves this rvalue into a fresh box.
    #[must_use]
    pub fn into_variable(self) -> Variable {
        match self {
            Self::Lvalue(v) => v,
            other => new_variable(other.into_variable_value()),
        }
    }
}

/// Deep-clones a box, so that scripts observe by-value array semantics: the
/// clone shares nothing mutable with the original.
#[must_use]
pub fn clone_variable(variable: &Variable) -> Variable {
    new_variable(clone_variable_value(&variable.borrow()))
}

/// Deep-clones a box's content. Numbers, strings, and functions are flat;
/// arrays clone every element box recursively.
#[must_use]
pub fn clone_variable_value(value: &VariableValue) -> VariableValue {
    match value {
        VariableValue::Number(n) => VariableValue::Number(*n),
        VariableValue::Str(s) => VariableValue::Str(s.clone()),
        VariableValue::Array(elements) => {
            VariableValue::Array(elements.iter().map(clone_variable).collect())
        },
        VariableValue::Function(f) => VariableValue::Function(f.clone()),
    }
}

/// Reads the value out of a box.
///
/// Arrays are deep-cloned so the produced rvalue is independent of the box,
/// unless this reference was the box's last one, in which case the content
/// is simply moved out.
#[must_use]
pub fn unbox(variable: Variable) -> Value {
    let value = match Rc::try_unwrap(variable) {
        Ok(cell) => cell.into_inner(),
        Err(shared) => clone_variable_value(&shared.borrow()),
    };

    match value {
        VariableValue::Number(n) => Value::Number(n),
        VariableValue::Str(s) => Value::String(s),
        VariableValue::Array(elements) => Value::Array(elements),
        VariableValue::Function(f) => Value::Function(f),
    }
}

/// Renders a number the way the language prints it: integral values print
/// without a fractional part, everything else uses the default formatting.
///
/// # Example
/// ```
/// use tessera::runtime::value::number_to_string;
///
/// assert_eq!(number_to_string(4.0), "4");
/// assert_eq!(number_to_string(2.5), "2.5");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn number_to_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Renders a box's content for `tostring` and `trace`.
#[must_use]
pub fn variable_to_string(variable: &Variable) -> String {
    variable_value_to_string(&variable.borrow())
}

fn variable_value_to_string(value: &VariableValue) -> String {
    match value {
        VariableValue::Number(n) => number_to_string(*n),
        VariableValue::Str(s) => s.as_ref().clone(),
        VariableValue::Array(elements) => array_to_string(elements),
        VariableValue::Function(_) => "FUNCTION".to_string(),
    }
}

fn array_to_string(elements: &[Variable]) -> String {
    let mut ret = String::from("[");
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            ret += ", ";
        }
        ret += &variable_to_string(element);
    }
    ret += "]";
    ret
}

/// Renders a computed value for `tostring` and `trace`.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Void => String::new(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.as_ref().clone(),
        Value::Array(elements) => array_to_string(elements),
        Value::Function(_) => "FUNCTION".to_string(),
        Value::Lvalue(v) => variable_to_string(v),
    }
}

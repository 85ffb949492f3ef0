use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::runtime::{
    context::RuntimeContext,
    expression::{EvalResult, Expr},
};

/// The way control leaves a statement.
///
/// Every executor returns one of these; the enclosing construct inspects
/// and translates it. A loop consumes one level of `Break`, a `switch`
/// consumes its own level, and the function executor turns `Return` into a
/// normal exit once the return slot is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Execution ran off the end of the statement.
    Normal,
    /// `break N` still has this many levels left to exit.
    Break(usize),
    /// `continue` looking for the innermost loop.
    Continue,
    /// `return` unwinding to the function boundary.
    Return,
}

/// How a `for` statement initializes its header scope.
#[derive(Debug)]
pub enum ForInit {
    /// Header declarations; each expression produces one local's box.
    Declarations(Vec<Expr>),
    /// A plain expression evaluated for effect.
    Expression(Expr),
}

/// An executable statement tree.
///
/// Statements borrow the shared runtime context while executing; blocks
/// snapshot the stack depth on entry and truncate on exit, which pairs
/// lexical scope with stack lifetime no matter how the block is left.
#[derive(Debug)]
pub enum Statement {
    /// An expression evaluated for its effects.
    Simple(Expr),
    /// Local declarations; each expression produces one box to push.
    Declarations(Vec<Expr>),
    /// `{ … }` with its own scope.
    Block(Vec<Statement>),
    /// `break N`.
    Break(usize),
    /// `continue`.
    Continue,
    /// `return;` from a void function.
    ReturnVoid,
    /// `return expr;` — fills the return slot before unwinding.
    Return(Expr),
    /// An `if`/`elif`/`else` chain.
    If {
        /// Header declarations scoped to the whole chain.
        declarations: Vec<Expr>,
        /// One condition per `if`/`elif` branch.
        conditions:   Vec<Expr>,
        /// One statement per condition, plus the trailing `else` branch.
        branches:     Vec<Statement>,
    },
    /// A `switch` with fall-through cases.
    Switch {
        /// Header declarations scoped to the switch.
        declarations: Vec<Expr>,
        /// The discriminating expression.
        expression:   Expr,
        /// The flat statement list of the body.
        body:         Vec<Statement>,
        /// Case label → first statement to execute.
        cases:        HashMap<OrderedFloat<f64>, usize>,
        /// Jump target when no label matches; the body length when the
        /// switch has no `default`.
        default:      usize,
    },
    /// `while (cond) body`.
    While {
        /// The loop condition.
        condition: Expr,
        /// The loop body.
        body:      Box<Statement>,
    },
    /// `do body while (cond)`.
    DoWhile {
        /// The loop condition, tested after the body.
        condition: Expr,
        /// The loop body.
        body:      Box<Statement>,
    },
    /// `for (init; cond; step) body`.
    For {
        /// The header initialization, scoped to the loop.
        initialization: ForInit,
        /// The loop condition.
        condition:      Expr,
        /// The step expression, also run after `continue`.
        step:           Expr,
        /// The loop body.
        body:           Box<Statement>,
    },
}

/// Translates the flow a loop body produced into the flow the loop yields,
/// or `None` when the loop just keeps going.
const fn loop_flow(flow: Flow) -> Option<Flow> {
    match flow {
        Flow::Normal | Flow::Continue => None,
        Flow::Break(1) => Some(Flow::Normal),
        Flow::Break(n) => Some(Flow::Break(n - 1)),
        Flow::Return => Some(Flow::Return),
    }
}

impl Statement {
    /// Executes the statement, producing the flow that leaves it.
    ///
    /// # Errors
    /// Propagates any runtime error raised by the expressions involved; the
    /// scope guards still truncate the stack on the way out.
    pub fn execute(&self, context: &mut RuntimeContext) -> EvalResult<Flow> {
        match self {
            Self::Simple(expr) => {
                expr.eval(context)?;
                Ok(Flow::Normal)
            },
            Self::Declarations(declarations) => {
                for declaration in declarations {
                    let variable = declaration.eval(context)?.into_box();
                    context.push(variable);
                }
                Ok(Flow::Normal)
            },
            Self::Block(statements) => {
                let depth = context.stack_depth();
                let result = Self::execute_sequence(statements, context);
                context.truncate_stack(depth);
                result
            },
            Self::Break(level) => Ok(Flow::Break(*level)),
            Self::Continue => Ok(Flow::Continue),
            Self::ReturnVoid => Ok(Flow::Return),
            Self::Return(expr) => {
                let variable = expr.eval(context)?.into_box();
                context.set_retval(variable);
                Ok(Flow::Return)
            },
            Self::If { declarations,
                       conditions,
                       branches, } => {
                let depth = context.stack_depth();
                let result = Self::execute_if(declarations, conditions, branches, context);
                context.truncate_stack(depth);
                result
            },
            Self::Switch { declarations,
                           expression,
                           body,
                           cases,
                           default, } => {
                let depth = context.stack_depth();
                let result =
                    Self::execute_switch(declarations, expression, body, cases, *default, context);
                context.truncate_stack(depth);
                result
            },
            Self::While { condition, body } => {
                loop {
                    if condition.eval(context)?.as_number() == 0.0 {
                        return Ok(Flow::Normal);
                    }
                    if let Some(flow) = loop_flow(body.execute(context)?) {
                        return Ok(flow);
                    }
                }
            },
            Self::DoWhile { condition, body } => {
                loop {
                    if let Some(flow) = loop_flow(body.execute(context)?) {
                        return Ok(flow);
                    }
                    if condition.eval(context)?.as_number() == 0.0 {
                        return Ok(Flow::Normal);
                    }
                }
            },
            Self::For { initialization,
                        condition,
                        step,
                        body, } => {
                let depth = context.stack_depth();
                let result = Self::execute_for(initialization, condition, step, body, context);
                context.truncate_stack(depth);
                result
            },
        }
    }

    fn execute_sequence(statements: &[Self], context: &mut RuntimeContext) -> EvalResult<Flow> {
        for statement in statements {
            let flow = statement.execute(context)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_if(declarations: &[Expr],
                  conditions: &[Expr],
                  branches: &[Self],
                  context: &mut RuntimeContext)
                  -> EvalResult<Flow> {
        for declaration in declarations {
            let variable = declaration.eval(context)?.into_box();
            context.push(variable);
        }

        for (condition, branch) in conditions.iter().zip(branches) {
            if condition.eval(context)?.as_number() != 0.0 {
                return branch.execute(context);
            }
        }

        branches[conditions.len()].execute(context)
    }

    fn execute_switch(declarations: &[Expr],
                      expression: &Expr,
                      body: &[Self],
                      cases: &HashMap<OrderedFloat<f64>, usize>,
                      default: usize,
                      context: &mut RuntimeContext)
                      -> EvalResult<Flow> {
        for declaration in declarations {
            let variable = declaration.eval(context)?.into_box();
            context.push(variable);
        }

        let selector = expression.eval(context)?.as_number();
        let start = cases.get(&OrderedFloat(selector)).copied().unwrap_or(default);

        for statement in &body[start.min(body.len())..] {
            match statement.execute(context)? {
                Flow::Normal => {},
                Flow::Break(1) => return Ok(Flow::Normal),
                Flow::Break(n) => return Ok(Flow::Break(n - 1)),
                other => return Ok(other),
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_for(initialization: &ForInit,
                   condition: &Expr,
                   step: &Expr,
                   body: &Self,
                   context: &mut RuntimeContext)
                   -> EvalResult<Flow> {
        match initialization {
            ForInit::Declarations(declarations) => {
                for declaration in declarations {
                    let variable = declaration.eval(context)?.into_box();
                    context.push(variable);
                }
            },
            ForInit::Expression(expr) => {
                expr.eval(context)?;
            },
        }

        loop {
            if condition.eval(context)?.as_number() == 0.0 {
                return Ok(Flow::Normal);
            }
            if let Some(flow) = loop_flow(body.execute(context)?) {
                return Ok(flow);
            }
            step.eval(context)?;
        }
    }
}

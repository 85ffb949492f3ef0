use crate::{
    ast::{Node, NodeOperation, NodeValue},
    compiler::{
        context::CompilerContext,
        lexer::{Token, TokenStream},
        parse_token_value,
    },
    error::CompileError,
    types::TypeHandle,
};

/// Precedence levels, highest first. The discriminant order is what the
/// comparisons below rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Brackets,
    Postfix,
    Prefix,
    Multiplication,
    Addition,
    Shift,
    Comparison,
    Equality,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    Assignment,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Associativity {
    LeftToRight,
    RightToLeft,
}

/// An operator pushed on the operator stack, together with everything the
/// popper needs to build its node.
struct OperatorInfo {
    operation:     NodeOperation,
    precedence:    Precedence,
    associativity: Associativity,
    operands:      usize,
    line:          usize,
    col:           usize,
}

impl OperatorInfo {
    fn new(operation: NodeOperation, line: usize, col: usize) -> Self {
        use NodeOperation::{
            Add, BitwiseAnd, BitwiseNot, BitwiseOr, BitwiseXor, Call, Comma, Concat, Div, Eq, Ge,
            Gt, Idiv, Index, Init, Le, LogicalAnd, LogicalNot, LogicalOr, Lt, Mod, Mul, Ne,
            Negative, Positive, Postdec, Postinc, Predec, Preinc, Shiftl, Shiftr, Size, Sub,
            Ternary, ToString,
        };

        let precedence = match operation {
            Init => Precedence::Brackets,
            Postinc | Postdec | Index | Call => Precedence::Postfix,
            Preinc | Predec | Positive | Negative | BitwiseNot | LogicalNot | Size | ToString => {
                Precedence::Prefix
            },
            Mul | Div | Idiv | Mod => Precedence::Multiplication,
            Add | Sub | Concat => Precedence::Addition,
            Shiftl | Shiftr => Precedence::Shift,
            Lt | Gt | Le | Ge => Precedence::Comparison,
            Eq | Ne => Precedence::Equality,
            BitwiseAnd => Precedence::BitwiseAnd,
            BitwiseXor => Precedence::BitwiseXor,
            BitwiseOr => Precedence::BitwiseOr,
            LogicalAnd => Precedence::LogicalAnd,
            LogicalOr => Precedence::LogicalOr,
            Comma => Precedence::Comma,
            _ => Precedence::Assignment,
        };

        let associativity = match precedence {
            Precedence::Prefix | Precedence::Assignment => Associativity::RightToLeft,
            _ => Associativity::LeftToRight,
        };

        let operands = match operation {
            Init => 0,
            Postinc | Postdec | Preinc | Predec | Positive | Negative | BitwiseNot
            | LogicalNot | Size | ToString | Call => 1,
            Ternary => 3,
            _ => 2,
        };

        Self { operation,
               precedence,
               associativity,
               operands,
               line,
               col }
    }
}

/// Maps a token to the operation it performs at the current position.
/// `prefix` tells ambiguous tokens (`++`, `+`, `-`) apart.
fn operator_info(token: &Token,
                 prefix: bool,
                 line: usize,
                 col: usize)
                 -> Result<OperatorInfo, CompileError> {
    let operation = match token {
        Token::Inc => {
            if prefix {
                NodeOperation::Preinc
            } else {
                NodeOperation::Postinc
            }
        },
        Token::Dec => {
            if prefix {
                NodeOperation::Predec
            } else {
                NodeOperation::Postdec
            }
        },
        Token::Add => {
            if prefix {
                NodeOperation::Positive
            } else {
                NodeOperation::Add
            }
        },
        Token::Sub => {
            if prefix {
                NodeOperation::Negative
            } else {
                NodeOperation::Sub
            }
        },
        Token::Concat => NodeOperation::Concat,
        Token::Mul => NodeOperation::Mul,
        Token::Div => NodeOperation::Div,
        Token::Idiv => NodeOperation::Idiv,
        Token::Mod => NodeOperation::Mod,
        Token::BitwiseNot => NodeOperation::BitwiseNot,
        Token::BitwiseAnd => NodeOperation::BitwiseAnd,
        Token::BitwiseOr => NodeOperation::BitwiseOr,
        Token::BitwiseXor => NodeOperation::BitwiseXor,
        Token::Shiftl => NodeOperation::Shiftl,
        Token::Shiftr => NodeOperation::Shiftr,
        Token::Assign => NodeOperation::Assign,
        Token::AddAssign => NodeOperation::AddAssign,
        Token::SubAssign => NodeOperation::SubAssign,
        Token::ConcatAssign => NodeOperation::ConcatAssign,
        Token::MulAssign => NodeOperation::MulAssign,
        Token::DivAssign => NodeOperation::DivAssign,
        Token::IdivAssign => NodeOperation::IdivAssign,
        Token::ModAssign => NodeOperation::ModAssign,
        Token::AndAssign => NodeOperation::AndAssign,
        Token::OrAssign => NodeOperation::OrAssign,
        Token::XorAssign => NodeOperation::XorAssign,
        Token::ShiftlAssign => NodeOperation::ShiftlAssign,
        Token::ShiftrAssign => NodeOperation::ShiftrAssign,
        Token::LogicalNot => NodeOperation::LogicalNot,
        Token::LogicalAnd => NodeOperation::LogicalAnd,
        Token::LogicalOr => NodeOperation::LogicalOr,
        Token::Eq => NodeOperation::Eq,
        Token::Ne => NodeOperation::Ne,
        Token::Lt => NodeOperation::Lt,
        Token::Gt => NodeOperation::Gt,
        Token::Le => NodeOperation::Le,
        Token::Ge => NodeOperation::Ge,
        Token::Question => NodeOperation::Ternary,
        Token::Comma => NodeOperation::Comma,
        Token::OpenRound => NodeOperation::Call,
        Token::OpenSquare => NodeOperation::Index,
        Token::OpenCurly => NodeOperation::Init,
        Token::KwSizeof => NodeOperation::Size,
        Token::KwTostring => NodeOperation::ToString,
        other => {
            return Err(CompileError::UnexpectedToken { token: other.to_string(),
                                                       line,
                                                       col });
        },
    };

    Ok(OperatorInfo::new(operation, line, col))
}

fn is_end_of_expression(tokens: &TokenStream, allow_comma: bool) -> bool {
    tokens.peek().is_none_or(|info| match info.token {
        Token::Semicolon
        | Token::CloseRound
        | Token::CloseSquare
        | Token::CloseCurly
        | Token::Colon => true,
        Token::Comma => !allow_comma,
        _ => false,
    })
}

const fn is_evaluated_before(l: &OperatorInfo, r: &OperatorInfo) -> bool {
    match l.associativity {
        Associativity::LeftToRight => l.precedence as usize <= r.precedence as usize,
        Associativity::RightToLeft => (l.precedence as usize) < r.precedence as usize,
    }
}

/// Pops the operator on top of the stack and replaces its operands on the
/// operand stack with the node it builds.
fn pop_one_operator(operator_stack: &mut Vec<OperatorInfo>,
                    operand_stack: &mut Vec<Node>,
                    context: &mut CompilerContext,
                    line: usize,
                    col: usize)
                    -> Result<(), CompileError> {
    let Some(mut top) = operator_stack.pop() else {
        return Err(CompileError::Internal { message: "failed to parse an expression".to_string(),
                                            line,
                                            col });
    };

    if operand_stack.len() < top.operands {
        return Err(CompileError::Internal { message: "failed to parse an expression".to_string(),
                                            line,
                                            col });
    }

    if top.precedence != Precedence::Prefix
        && let Some(last) = operand_stack.last()
    {
        top.line = last.line;
        top.col = last.col;
    }

    let operands = operand_stack.split_off(operand_stack.len() - top.operands);
    let node = Node::new(context,
                         NodeValue::Operation(top.operation),
                         operands,
                         top.line,
                         top.col)?;
    operand_stack.push(node);

    Ok(())
}

#[allow(clippy::too_many_lines)]
fn parse_impl(context: &mut CompilerContext,
              tokens: &mut TokenStream,
              allow_comma: bool,
              allow_empty: bool)
              -> Result<Option<Node>, CompileError> {
    let mut operand_stack: Vec<Node> = Vec::new();
    let mut operator_stack: Vec<OperatorInfo> = Vec::new();

    let mut expected_operand = true;

    while !is_end_of_expression(tokens, allow_comma) {
        let Some(info) = tokens.peek() else {
            break;
        };
        let (token, line, col) = (info.token.clone(), info.line, info.col);

        match token {
            Token::Number(n) => {
                if !expected_operand {
                    return Err(CompileError::UnexpectedToken { token: token.to_string(),
                                                               line,
                                                               col });
                }
                operand_stack.push(Node::new(context, NodeValue::Number(n), Vec::new(), line,
                                             col)?);
                expected_operand = false;
                tokens.advance();
            },
            Token::Str(s) => {
                if !expected_operand {
                    return Err(CompileError::UnexpectedToken { token: s,
                                                               line,
                                                               col });
                }
                operand_stack.push(Node::new(context, NodeValue::Str(s), Vec::new(), line, col)?);
                expected_operand = false;
                tokens.advance();
            },
            Token::Identifier(name) => {
                if !expected_operand {
                    return Err(CompileError::UnexpectedToken { token: name,
                                                               line,
                                                               col });
                }
                operand_stack.push(Node::new(context,
                                             NodeValue::Identifier(name),
                                             Vec::new(),
                                             line,
                                             col)?);
                expected_operand = false;
                tokens.advance();
            },
            _ => {
                let mut oi = operator_info(&token, expected_operand, line, col)?;

                // An opening round bracket where an operand belongs is a
                // parenthesized sub-expression, not a call.
                if oi.operation == NodeOperation::Call && expected_operand {
                    tokens.advance();
                    if let Some(node) = parse_impl(context, tokens, true, false)? {
                        operand_stack.push(node);
                    }
                    parse_token_value(tokens, &Token::CloseRound)?;
                    expected_operand = false;
                    continue;
                }

                if oi.operation == NodeOperation::Init {
                    if !expected_operand {
                        return Err(CompileError::UnexpectedToken { token: token.to_string(),
                                                                   line,
                                                                   col });
                    }
                    tokens.advance();
                    let mut children = Vec::new();
                    if !tokens.matches(&Token::CloseCurly) {
                        loop {
                            if let Some(child) = parse_impl(context, tokens, false, false)? {
                                children.push(child);
                            }
                            if tokens.matches(&Token::CloseCurly) {
                                break;
                            }
                            parse_token_value(tokens, &Token::Comma)?;
                        }
                    }
                    tokens.advance();
                    operand_stack.push(Node::new(context,
                                                 NodeValue::Operation(NodeOperation::Init),
                                                 children,
                                                 line,
                                                 col)?);
                    expected_operand = false;
                    continue;
                }

                if (oi.precedence == Precedence::Prefix) != expected_operand {
                    return Err(CompileError::UnexpectedToken { token: token.to_string(),
                                                               line,
                                                               col });
                }

                while let Some(top) = operator_stack.last() {
                    if !is_evaluated_before(top, &oi) {
                        break;
                    }
                    pop_one_operator(&mut operator_stack, &mut operand_stack, context, line, col)?;
                }

                tokens.advance();

                match oi.operation {
                    NodeOperation::Call => {
                        parse_arguments(context, tokens, &mut operand_stack, &mut oi)?;
                        parse_token_value(tokens, &Token::CloseRound)?;
                    },
                    NodeOperation::Index => {
                        if let Some(node) = parse_impl(context, tokens, true, false)? {
                            operand_stack.push(node);
                        }
                        parse_token_value(tokens, &Token::CloseSquare)?;
                    },
                    NodeOperation::Ternary => {
                        if let Some(node) = parse_impl(context, tokens, true, false)? {
                            operand_stack.push(node);
                        }
                        parse_token_value(tokens, &Token::Colon)?;
                    },
                    _ => {},
                }

                expected_operand = oi.precedence != Precedence::Postfix;
                operator_stack.push(oi);
            },
        }
    }

    if expected_operand {
        if allow_empty && operand_stack.is_empty() && operator_stack.is_empty() {
            return Ok(None);
        }
        let (line, col) = tokens.location();
        return Err(CompileError::OperandExpected { line, col });
    }

    let (line, col) = tokens.location();
    while !operator_stack.is_empty() {
        pop_one_operator(&mut operator_stack, &mut operand_stack, context, line, col)?;
    }

    if operand_stack.len() == 1 {
        Ok(operand_stack.pop())
    } else {
        Err(CompileError::Internal { message: "failed to parse an expression".to_string(),
                                     line,
                                     col })
    }
}

/// Parses a call argument list, pushing one operand per argument and
/// growing the call's operand count.
///
/// An argument prefixed by `&` stays an lvalue so the callee can alias the
/// caller's box; any other argument is wrapped in a by-value node that
/// clones it into a fresh box at evaluation time.
fn parse_arguments(context: &mut CompilerContext,
                   tokens: &mut TokenStream,
                   operand_stack: &mut Vec<Node>,
                   oi: &mut OperatorInfo)
                   -> Result<(), CompileError> {
    if tokens.matches(&Token::CloseRound) {
        return Ok(());
    }

    loop {
        let by_ref = tokens.matches(&Token::BitwiseAnd);
        if by_ref {
            tokens.advance();
        }

        let Some(argument) = parse_impl(context, tokens, false, false)? else {
            let (line, col) = tokens.location();
            return Err(CompileError::OperandExpected { line, col });
        };

        let argument = if by_ref {
            if !argument.lvalue {
                return Err(CompileError::NotLvalue { type_name:
                                                         context.registry()
                                                                .display(argument.type_id),
                                                     line: argument.line,
                                                     col: argument.col, });
            }
            argument
        } else {
            let (line, col) = (argument.line, argument.col);
            Node::new(context,
                      NodeValue::Operation(NodeOperation::Param),
                      vec![argument],
                      line,
                      col)?
        };

        operand_stack.push(argument);
        oi.operands += 1;

        if tokens.matches(&Token::CloseRound) {
            return Ok(());
        }
        parse_token_value(tokens, &Token::Comma)?;
    }
}

/// Parses one expression into a typed tree and checks that its result
/// converts to `type_id`.
///
/// Commas terminate the expression unless `allow_comma` is set. A `void`
/// target permits the empty expression, reported as `None`.
///
/// # Errors
/// Returns a [`CompileError`] for malformed expression syntax, and for any
/// typing violation detected while the tree is built.
pub fn parse_expression_tree(context: &mut CompilerContext,
                             tokens: &mut TokenStream,
                             type_id: TypeHandle,
                             allow_comma: bool)
                             -> Result<Option<Node>, CompileError> {
    let allow_empty = type_id == TypeHandle::VOID;
    let node = parse_impl(context, tokens, allow_comma, allow_empty)?;

    if let Some(node) = &node {
        node.check_conversion(context, type_id, false)?;
    }

    Ok(node)
}

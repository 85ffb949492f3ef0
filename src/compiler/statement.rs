use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::{
    compiler::{
        context::CompilerContext,
        expression::{
            build_default_initialization, build_initialization_expression,
            build_number_expression, build_void_expression,
        },
        is_typename, parse_declaration_name, parse_token_value, parse_type,
        lexer::{Token, TokenStream},
    },
    error::CompileError,
    runtime::{
        expression::Expr,
        statement::{ForInit, Statement},
    },
    types::TypeHandle,
};

/// Which non-local control transfers are legal at the current program
/// point.
///
/// Loops raise the break level and permit `continue`; a `switch` raises the
/// break level only. Entering a function resets both and records the return
/// type every `return` must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct PossibleFlow {
    /// How many enclosing breakable constructs surround this point.
    pub break_level:  usize,
    /// Whether `continue` has a loop to target.
    pub can_continue: bool,
    /// The return type of the enclosing function.
    pub return_type:  TypeHandle,
}

impl PossibleFlow {
    /// The flow state at the top of a function body.
    #[must_use]
    pub const fn in_function(return_type: TypeHandle) -> Self {
        Self { break_level: 0,
               can_continue: false,
               return_type }
    }

    /// The flow state inside a loop body.
    #[must_use]
    pub const fn add_loop(self) -> Self {
        Self { break_level:  self.break_level + 1,
               can_continue: true,
               return_type:  self.return_type, }
    }

    /// The flow state inside a `switch` body.
    #[must_use]
    pub const fn add_switch(self) -> Self {
        Self { break_level:  self.break_level + 1,
               can_continue: self.can_continue,
               return_type:  self.return_type, }
    }
}

/// Compiles a run of variable declarators after a type name:
/// `name`, `name = expr`, or `name(expr)`, separated by commas. Returns one
/// box-producing initializer per declarator and records each name in the
/// current scope.
///
/// # Errors
/// Rejects `void` variables, redeclarations, and malformed initializers.
pub fn compile_variable_declaration(context: &mut CompilerContext,
                                    tokens: &mut TokenStream)
                                    -> Result<Vec<Expr>, CompileError> {
    let (line, col) = tokens.location();
    let type_id = parse_type(context, tokens)?;

    if type_id == TypeHandle::VOID {
        return Err(CompileError::VoidVariable { line, col });
    }

    let mut ret = Vec::new();

    loop {
        if !ret.is_empty() {
            tokens.advance();
        }

        let name = parse_declaration_name(context, tokens)?;

        if tokens.matches(&Token::OpenRound) {
            tokens.advance();
            ret.push(build_initialization_expression(context, tokens, type_id, false)?);
            parse_token_value(tokens, &Token::CloseRound)?;
        } else if tokens.matches(&Token::Assign) {
            tokens.advance();
            ret.push(build_initialization_expression(context, tokens, type_id, false)?);
        } else {
            let (line, col) = tokens.location();
            ret.push(build_default_initialization(context, type_id, line, col)?);
        }

        context.create_identifier(name, type_id);

        if !tokens.matches(&Token::Comma) {
            break;
        }
    }

    Ok(ret)
}

/// Compiles one statement. `in_switch` is set for statements directly in a
/// `switch` body, where declarations are rejected.
///
/// # Errors
/// Returns the first [`CompileError`] found in the statement.
pub fn compile_statement(context: &mut CompilerContext,
                         tokens: &mut TokenStream,
                         pf: PossibleFlow,
                         in_switch: bool)
                         -> Result<Statement, CompileError> {
    if let Some(info) = tokens.peek().cloned() {
        match info.token {
            Token::KwFor => return compile_for_statement(context, tokens, pf.add_loop()),
            Token::KwWhile => return compile_while_statement(context, tokens, pf.add_loop()),
            Token::KwDo => return compile_do_statement(context, tokens, pf.add_loop()),
            Token::KwIf => return compile_if_statement(context, tokens, pf),
            Token::KwSwitch => return compile_switch_statement(context, tokens, pf.add_switch()),
            Token::KwBreak => return compile_break_statement(tokens, pf),
            Token::KwContinue => return compile_continue_statement(tokens, pf),
            Token::KwReturn => return compile_return_statement(context, tokens, pf),
            _ => {},
        }

        if is_typename(&info.token) {
            if in_switch {
                return Err(CompileError::DeclarationInSwitch { line: info.line,
                                                               col:  info.col, });
            }
            return compile_var_statement(context, tokens);
        }

        if info.token == Token::OpenCurly {
            return compile_block_statement(context, tokens, pf);
        }
    }

    compile_simple_statement(context, tokens)
}

fn compile_simple_statement(context: &mut CompilerContext,
                            tokens: &mut TokenStream)
                            -> Result<Statement, CompileError> {
    let expr = build_void_expression(context, tokens)?;
    parse_token_value(tokens, &Token::Semicolon)?;
    Ok(Statement::Simple(expr))
}

fn compile_var_statement(context: &mut CompilerContext,
                         tokens: &mut TokenStream)
                         -> Result<Statement, CompileError> {
    let declarations = compile_variable_declaration(context, tokens)?;
    parse_token_value(tokens, &Token::Semicolon)?;
    Ok(Statement::Declarations(declarations))
}

fn compile_for_statement(context: &mut CompilerContext,
                         tokens: &mut TokenStream,
                         pf: PossibleFlow)
                         -> Result<Statement, CompileError> {
    context.enter_scope();

    parse_token_value(tokens, &Token::KwFor)?;
    parse_token_value(tokens, &Token::OpenRound)?;

    let initialization = if tokens.peek().is_some_and(|info| is_typename(&info.token)) {
        ForInit::Declarations(compile_variable_declaration(context, tokens)?)
    } else {
        ForInit::Expression(build_void_expression(context, tokens)?)
    };
    parse_token_value(tokens, &Token::Semicolon)?;

    let condition = build_number_expression(context, tokens)?;
    parse_token_value(tokens, &Token::Semicolon)?;

    let step = build_void_expression(context, tokens)?;
    parse_token_value(tokens, &Token::CloseRound)?;

    let body = compile_block_statement(context, tokens, pf)?;

    context.leave_scope();

    Ok(Statement::For { initialization,
                        condition,
                        step,
                        body: Box::new(body) })
}

fn compile_while_statement(context: &mut CompilerContext,
                           tokens: &mut TokenStream,
                           pf: PossibleFlow)
                           -> Result<Statement, CompileError> {
    parse_token_value(tokens, &Token::KwWhile)?;

    parse_token_value(tokens, &Token::OpenRound)?;
    let condition = build_number_expression(context, tokens)?;
    parse_token_value(tokens, &Token::CloseRound)?;

    let body = compile_block_statement(context, tokens, pf)?;

    Ok(Statement::While { condition,
                          body: Box::new(body) })
}

fn compile_do_statement(context: &mut CompilerContext,
                        tokens: &mut TokenStream,
                        pf: PossibleFlow)
                        -> Result<Statement, CompileError> {
    parse_token_value(tokens, &Token::KwDo)?;

    let body = compile_block_statement(context, tokens, pf)?;

    parse_token_value(tokens, &Token::KwWhile)?;
    parse_token_value(tokens, &Token::OpenRound)?;
    let condition = build_number_expression(context, tokens)?;
    parse_token_value(tokens, &Token::CloseRound)?;

    Ok(Statement::DoWhile { condition,
                            body: Box::new(body) })
}

fn compile_if_statement(context: &mut CompilerContext,
                        tokens: &mut TokenStream,
                        pf: PossibleFlow)
                        -> Result<Statement, CompileError> {
    context.enter_scope();

    parse_token_value(tokens, &Token::KwIf)?;
    parse_token_value(tokens, &Token::OpenRound)?;

    let mut declarations = Vec::new();
    if tokens.peek().is_some_and(|info| is_typename(&info.token)) {
        declarations = compile_variable_declaration(context, tokens)?;
        parse_token_value(tokens, &Token::Semicolon)?;
    }

    let mut conditions = Vec::new();
    let mut branches = Vec::new();

    conditions.push(build_number_expression(context, tokens)?);
    parse_token_value(tokens, &Token::CloseRound)?;
    branches.push(compile_block_statement(context, tokens, pf)?);

    while tokens.matches(&Token::KwElif) {
        tokens.advance();
        parse_token_value(tokens, &Token::OpenRound)?;
        conditions.push(build_number_expression(context, tokens)?);
        parse_token_value(tokens, &Token::CloseRound)?;
        branches.push(compile_block_statement(context, tokens, pf)?);
    }

    if tokens.matches(&Token::KwElse) {
        tokens.advance();
        branches.push(compile_block_statement(context, tokens, pf)?);
    } else {
        branches.push(Statement::Block(Vec::new()));
    }

    context.leave_scope();

    Ok(Statement::If { declarations,
                       conditions,
                       branches })
}

fn compile_switch_statement(context: &mut CompilerContext,
                            tokens: &mut TokenStream,
                            pf: PossibleFlow)
                            -> Result<Statement, CompileError> {
    context.enter_scope();

    parse_token_value(tokens, &Token::KwSwitch)?;
    parse_token_value(tokens, &Token::OpenRound)?;

    let mut declarations = Vec::new();
    if tokens.peek().is_some_and(|info| is_typename(&info.token)) {
        declarations = compile_variable_declaration(context, tokens)?;
        parse_token_value(tokens, &Token::Semicolon)?;
    }

    let expression = build_number_expression(context, tokens)?;
    parse_token_value(tokens, &Token::CloseRound)?;

    let mut body = Vec::new();
    let mut cases = HashMap::new();
    let mut default = None;

    parse_token_value(tokens, &Token::OpenCurly)?;

    while !tokens.matches(&Token::CloseCurly) {
        if tokens.matches(&Token::KwCase) {
            tokens.advance();

            let (line, col) = tokens.location();
            let Some(Token::Number(label)) = tokens.peek().map(|info| info.token.clone()) else {
                let token = tokens.peek().map_or_else(String::new, |info| info.token.to_string());
                return Err(CompileError::UnexpectedToken { token, line, col });
            };
            if cases.insert(OrderedFloat(label), body.len()).is_some() {
                return Err(CompileError::DuplicateCase { label, line, col });
            }
            tokens.advance();

            parse_token_value(tokens, &Token::Colon)?;
        } else if tokens.matches(&Token::KwDefault) {
            tokens.advance();
            default = Some(body.len());
            parse_token_value(tokens, &Token::Colon)?;
        } else {
            body.push(compile_statement(context, tokens, pf, true)?);
        }

        if tokens.is_eof() {
            let (line, col) = tokens.location();
            return Err(CompileError::ExpectedToken { expected: "}".to_string(),
                                                     line,
                                                     col });
        }
    }

    tokens.advance();

    context.leave_scope();

    let default = default.unwrap_or(body.len());

    Ok(Statement::Switch { declarations,
                           expression,
                           body,
                           cases,
                           default })
}

fn compile_break_statement(tokens: &mut TokenStream,
                           pf: PossibleFlow)
                           -> Result<Statement, CompileError> {
    let (line, col) = tokens.location();
    if pf.break_level == 0 {
        return Err(CompileError::UnexpectedToken { token: "break".to_string(),
                                                   line,
                                                   col });
    }

    parse_token_value(tokens, &Token::KwBreak)?;

    let mut break_level = 1.0;

    if let Some(Token::Number(n)) = tokens.peek().map(|info| &info.token) {
        break_level = *n;
        let (line, col) = tokens.location();

        #[allow(clippy::cast_precision_loss)]
        if break_level < 1.0
           || break_level.fract() != 0.0
           || break_level > pf.break_level as f64
        {
            return Err(CompileError::InvalidBreakLevel { line, col });
        }

        tokens.advance();
    }

    parse_token_value(tokens, &Token::Semicolon)?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let break_level = break_level as usize;
    Ok(Statement::Break(break_level))
}

fn compile_continue_statement(tokens: &mut TokenStream,
                              pf: PossibleFlow)
                              -> Result<Statement, CompileError> {
    if !pf.can_continue {
        let (line, col) = tokens.location();
        return Err(CompileError::UnexpectedToken { token: "continue".to_string(),
                                                   line,
                                                   col });
    }
    parse_token_value(tokens, &Token::KwContinue)?;
    parse_token_value(tokens, &Token::Semicolon)?;
    Ok(Statement::Continue)
}

fn compile_return_statement(context: &mut CompilerContext,
                            tokens: &mut TokenStream,
                            pf: PossibleFlow)
                            -> Result<Statement, CompileError> {
    parse_token_value(tokens, &Token::KwReturn)?;

    if pf.return_type == TypeHandle::VOID {
        parse_token_value(tokens, &Token::Semicolon)?;
        return Ok(Statement::ReturnVoid);
    }

    let expr = build_initialization_expression(context, tokens, pf.return_type, true)?;
    parse_token_value(tokens, &Token::Semicolon)?;
    Ok(Statement::Return(expr))
}

fn compile_block_contents(context: &mut CompilerContext,
                          tokens: &mut TokenStream,
                          pf: PossibleFlow)
                          -> Result<Vec<Statement>, CompileError> {
    let mut ret = Vec::new();

    if tokens.matches(&Token::OpenCurly) {
        tokens.advance();

        while !tokens.matches(&Token::CloseCurly) {
            if tokens.is_eof() {
                let (line, col) = tokens.location();
                return Err(CompileError::ExpectedToken { expected: "}".to_string(),
                                                         line,
                                                         col });
            }
            ret.push(compile_statement(context, tokens, pf, false)?);
        }

        tokens.advance();
    } else {
        ret.push(compile_statement(context, tokens, pf, false)?);
    }

    Ok(ret)
}

/// Compiles a statement or brace-enclosed statement list in a fresh scope.
///
/// # Errors
/// Returns the first [`CompileError`] found in the block.
pub fn compile_block_statement(context: &mut CompilerContext,
                               tokens: &mut TokenStream,
                               pf: PossibleFlow)
                               -> Result<Statement, CompileError> {
    context.enter_scope();
    let block = compile_block_contents(context, tokens, pf);
    context.leave_scope();
    Ok(Statement::Block(block?))
}

/// Compiles a function body against its parameter scope.
///
/// A non-void function gets an implicit default-initialized `return`
/// appended, so every path leaves a value in the return slot.
///
/// # Errors
/// Returns the first [`CompileError`] found in the body.
pub fn compile_function_block(context: &mut CompilerContext,
                              tokens: &mut TokenStream,
                              return_type: TypeHandle)
                              -> Result<Statement, CompileError> {
    let mut block =
        compile_block_contents(context, tokens, PossibleFlow::in_function(return_type))?;

    if return_type != TypeHandle::VOID {
        let (line, col) = tokens.location();
        block.push(Statement::Return(build_default_initialization(context, return_type, line,
                                                                  col)?));
    }

    Ok(Statement::Block(block))
}

//! The compilation pipeline: tokens in, a runnable image out.

use std::collections::HashMap;

/// The compile-time symbol state.
///
/// The type registry, the global and function tables, and the stack of
/// local frames that gives parameters negative slots and locals positive
/// ones.
pub mod context;
/// The expression evaluator builder.
///
/// Lowers typed tree nodes into executable expressions, inserting the
/// unbox, stringify, and discard conversions the static types imply.
pub mod expression;
/// The expression-tree parser.
///
/// Shunting-yard over the token stream, producing typed nodes with
/// operator precedence and associativity resolved.
pub mod expression_parser;
/// Function declarations and the second compilation pass.
///
/// Parses headers, captures brace-balanced bodies as raw tokens, and
/// compiles each body once every signature is known.
pub mod function;
/// The lexer.
///
/// A `logos`-driven tokenizer with line and column tracking, maximal-munch
/// operators, and the language's literal and comment forms.
pub mod lexer;
/// The statement compiler.
///
/// Recursive descent over statements, threading the flow-control
/// permissions and building the executable statement tree.
pub mod statement;

use crate::{
    compiler::{
        context::CompilerContext,
        function::{PendingFunction, parse_function_declaration},
        lexer::{Token, TokenStream, tokenize},
        statement::compile_variable_declaration,
    },
    error::CompileError,
    runtime::{context::RuntimeContext, value::Function},
    types::{FunctionType, Param, Type, TypeHandle},
};

/// Consumes one expected token or fails.
///
/// # Errors
/// Returns [`CompileError::ExpectedToken`] naming `expected` when the
/// cursor holds anything else.
pub fn parse_token_value(tokens: &mut TokenStream,
                         expected: &Token)
                         -> Result<(), CompileError> {
    if tokens.matches(expected) {
        tokens.advance();
        return Ok(());
    }

    let (line, col) = tokens.location();
    Err(CompileError::ExpectedToken { expected: expected.to_string(),
                                      line,
                                      col })
}

/// Consumes an identifier that can still be declared at the current scope.
///
/// # Errors
/// Returns [`CompileError::UnexpectedToken`] when the cursor does not hold
/// an identifier, and [`CompileError::AlreadyDeclared`] when the name is
/// taken in the current scope.
pub fn parse_declaration_name(context: &CompilerContext,
                              tokens: &mut TokenStream)
                              -> Result<String, CompileError> {
    let (line, col) = tokens.location();

    let Some(Token::Identifier(name)) = tokens.peek().map(|info| info.token.clone()) else {
        let token = tokens.peek().map_or_else(String::new, |info| info.token.to_string());
        return Err(CompileError::UnexpectedToken { token, line, col });
    };

    if !context.can_declare(&name) {
        return Err(CompileError::AlreadyDeclared { name, line, col });
    }

    tokens.advance();

    Ok(name)
}

/// Returns `true` when `token` can start a type: a simple type keyword or
/// the `[` of a tuple type.
#[must_use]
pub const fn is_typename(token: &Token) -> bool {
    matches!(token,
             Token::KwNumber | Token::KwString | Token::KwVoid | Token::OpenSquare)
}

/// Parses a type: `void`, `number`, `string`, a `[T,U]` tuple, and any
/// run of `[]` array and `(P&,Q)` function suffixes.
///
/// # Errors
/// Returns [`CompileError::UnexpectedToken`] when no type starts at the
/// cursor.
pub fn parse_type(context: &mut CompilerContext,
                  tokens: &mut TokenStream)
                  -> Result<TypeHandle, CompileError> {
    let (line, col) = tokens.location();

    let mut t = match tokens.peek().map(|info| info.token.clone()) {
        Some(Token::KwVoid) => {
            tokens.advance();
            TypeHandle::VOID
        },
        Some(Token::KwNumber) => {
            tokens.advance();
            TypeHandle::NUMBER
        },
        Some(Token::KwString) => {
            tokens.advance();
            TypeHandle::STRING
        },
        Some(Token::OpenSquare) => {
            tokens.advance();
            let mut inner = Vec::new();
            while !tokens.matches(&Token::CloseSquare) {
                if !inner.is_empty() {
                    parse_token_value(tokens, &Token::Comma)?;
                }
                inner.push(parse_type(context, tokens)?);
            }
            tokens.advance();
            context.get_handle(Type::Tuple(inner))
        },
        other => {
            let token = other.map_or_else(String::new, |t| t.to_string());
            return Err(CompileError::UnexpectedToken { token, line, col });
        },
    };

    loop {
        if tokens.matches(&Token::OpenSquare) {
            tokens.advance();
            parse_token_value(tokens, &Token::CloseSquare)?;
            t = context.get_handle(Type::Array(t));
        } else if tokens.matches(&Token::OpenRound) {
            tokens.advance();
            let mut params = Vec::new();
            while !tokens.matches(&Token::CloseRound) {
                if !params.is_empty() {
                    parse_token_value(tokens, &Token::Comma)?;
                }
                let type_id = parse_type(context, tokens)?;
                let by_ref = tokens.matches(&Token::BitwiseAnd);
                if by_ref {
                    tokens.advance();
                }
                params.push(Param { type_id, by_ref });
            }
            tokens.advance();
            t = context.get_handle(Type::Function(FunctionType { return_type: t,
                                                                 params }));
        } else {
            return Ok(t);
        }
    }
}

/// Compiles a source text into a runnable image.
///
/// The native functions the host registered are installed first, so their
/// table slots precede every script function. The host's public-function
/// declarations are parsed next; each `public` script function must match
/// the declared signature, and every declared name must be defined by the
/// time the source ends.
///
/// The source itself is scanned in two passes: the first collects global
/// declarations and function headers while capturing every body as raw
/// tokens, the second compiles the bodies against the complete symbol
/// table.
///
/// # Errors
/// Returns the first [`CompileError`] detected; no partial image is
/// produced.
pub fn compile(source: &str,
               external_functions: &[(String, Function)],
               public_declarations: &[String])
               -> Result<RuntimeContext, CompileError> {
    let mut context = CompilerContext::new();

    for (declaration, _) in external_functions {
        let mut tokens = tokenize(declaration)?;
        let decl = parse_function_declaration(&mut context, &mut tokens)?;
        context.create_function(decl.name, decl.type_id);
    }

    let mut public_types: HashMap<String, TypeHandle> = HashMap::new();
    for declaration in public_declarations {
        let mut tokens = tokenize(declaration)?;
        let decl = parse_function_declaration(&mut context, &mut tokens)?;
        public_types.insert(decl.name, decl.type_id);
    }

    let mut tokens = tokenize(source)?;

    let mut initializers = Vec::new();
    let mut pending_functions = Vec::new();
    let mut public_functions = HashMap::new();

    while let Some(info) = tokens.peek().cloned() {
        let (line, col) = (info.line, info.col);

        match info.token {
            Token::KwPublic => {
                tokens.advance();
                if !tokens.matches(&Token::KwFunction) {
                    let (line, col) = tokens.location();
                    return Err(CompileError::ExpectedToken { expected: "function".to_string(),
                                                             line,
                                                             col });
                }

                let function = PendingFunction::parse(&mut context, &mut tokens)?;
                let name = function.declaration().name.clone();

                if let Some(declared) = public_types.remove(&name)
                   && declared != function.declaration().type_id
                {
                    return Err(CompileError::PublicFunctionMismatch {
                        name,
                        expected: context.registry().display(declared),
                        line,
                        col,
                    });
                }

                public_functions.insert(name,
                                        external_functions.len() + pending_functions.len());
                pending_functions.push(function);
            },
            Token::KwFunction => {
                pending_functions.push(PendingFunction::parse(&mut context, &mut tokens)?);
            },
            _ => {
                initializers.extend(compile_variable_declaration(&mut context, &mut tokens)?);
                parse_token_value(&mut tokens, &Token::Semicolon)?;
            },
        }
    }

    if let Some(name) = public_types.into_keys().next() {
        let (line, col) = tokens.location();
        return Err(CompileError::UndefinedPublicFunction { name, line, col });
    }

    let mut functions: Vec<Function> =
        external_functions.iter().map(|(_, f)| f.clone()).collect();
    for function in pending_functions {
        functions.push(function.compile(&mut context)?);
    }

    Ok(RuntimeContext::new(initializers, functions, public_functions))
}

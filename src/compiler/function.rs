use std::rc::Rc;

use crate::{
    compiler::{
        context::CompilerContext,
        lexer::{Token, TokenInfo, TokenStream},
        parse_declaration_name, parse_token_value, parse_type,
        statement::compile_function_block,
    },
    error::CompileError,
    runtime::{
        statement::{Flow, Statement},
        value::Function,
    },
    types::{FunctionType, Param, Type, TypeHandle},
};

/// A parsed function header: its name, its registered function type, and
/// the parameter names in declaration order.
///
/// Headers are parsed both from script source and from the declaration
/// strings the host supplies for natives and public functions; a host
/// declaration may omit parameter names, which get positional placeholders
/// no script identifier can collide with.
#[derive(Debug)]
pub struct FunctionDeclaration {
    /// The function's name.
    pub name:    String,
    /// The handle of the function's type.
    pub type_id: TypeHandle,
    /// One name per parameter.
    pub params:  Vec<String>,
}

/// Parses `function <ret> <name> ( (type ('&')? name?)* )`.
///
/// # Errors
/// Returns a [`CompileError`] on malformed headers, names that cannot be
/// declared, and duplicate parameter names.
pub fn parse_function_declaration(context: &mut CompilerContext,
                                  tokens: &mut TokenStream)
                                  -> Result<FunctionDeclaration, CompileError> {
    parse_token_value(tokens, &Token::KwFunction)?;

    let return_type = parse_type(context, tokens)?;
    let name = parse_declaration_name(context, tokens)?;

    let mut params = Vec::new();
    let mut param_types = Vec::new();

    context.enter_function();
    let result: Result<(), CompileError> = (|| {
        parse_token_value(tokens, &Token::OpenRound)?;

        while !tokens.matches(&Token::CloseRound) {
            if !params.is_empty() {
                parse_token_value(tokens, &Token::Comma)?;
            }

            let type_id = parse_type(context, tokens)?;
            let by_ref = tokens.matches(&Token::BitwiseAnd);
            if by_ref {
                tokens.advance();
            }
            param_types.push(Param { type_id, by_ref });

            let param_name = if tokens.matches(&Token::CloseRound)
                                || tokens.matches(&Token::Comma)
            {
                format!("@{}", params.len())
            } else {
                parse_declaration_name(context, tokens)?
            };
            context.create_param(param_name.clone(), type_id);
            params.push(param_name);
        }
        tokens.advance();

        Ok(())
    })();
    context.leave_scope();
    result?;

    let type_id = context.get_handle(Type::Function(FunctionType { return_type,
                                                                   params: param_types }));

    Ok(FunctionDeclaration { name,
                             type_id,
                             params })
}

/// A function whose header is registered but whose body still waits for
/// the second compilation pass.
///
/// The body is captured as its raw token sequence, braces included, so
/// that every signature is known before any body is checked and mutually
/// recursive functions resolve.
pub struct PendingFunction {
    declaration: FunctionDeclaration,
    body:        Vec<TokenInfo>,
}

impl PendingFunction {
    /// Parses a function header, captures its brace-balanced body, and
    /// registers the function in the symbol table.
    ///
    /// # Errors
    /// Returns a [`CompileError`] on a malformed header or an unbalanced
    /// body.
    pub fn parse(context: &mut CompilerContext,
                 tokens: &mut TokenStream)
                 -> Result<Self, CompileError> {
        let declaration = parse_function_declaration(context, tokens)?;

        if !tokens.matches(&Token::OpenCurly) {
            let (line, col) = tokens.location();
            return Err(CompileError::ExpectedToken { expected: "{".to_string(),
                                                     line,
                                                     col });
        }

        let mut body = Vec::new();
        let mut nesting = 0usize;

        loop {
            let Some(info) = tokens.next() else {
                let (line, col) = tokens.location();
                return Err(CompileError::ExpectedToken { expected: "}".to_string(),
                                                         line,
                                                         col });
            };

            match info.token {
                Token::OpenCurly => nesting += 1,
                Token::CloseCurly => nesting -= 1,
                _ => {},
            }
            body.push(info);

            if nesting == 0 {
                break;
            }
        }

        context.create_function(declaration.name.clone(), declaration.type_id);

        Ok(Self { declaration, body })
    }

    /// Returns the parsed header.
    #[must_use]
    pub const fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    /// Compiles the captured body against a fresh parameter scope and
    /// wraps it as a runtime callable.
    ///
    /// # Errors
    /// Returns the first [`CompileError`] found in the body.
    pub fn compile(self, context: &mut CompilerContext) -> Result<Function, CompileError> {
        let Type::Function(ft) = context.registry().get(self.declaration.type_id).clone() else {
            let (line, col) = self.body.first().map_or((0, 0), |info| (info.line, info.col));
            return Err(CompileError::Internal { message:
                                                    "function compiled without a function type"
                                                        .to_string(),
                                                line,
                                                col });
        };

        context.enter_function();
        let result: Result<Statement, CompileError> = (|| {
            for (name, param) in self.declaration.params.iter().zip(&ft.params) {
                context.create_param(name.clone(), param.type_id);
            }

            let mut tokens = TokenStream::from_tokens(self.body);
            compile_function_block(context, &mut tokens, ft.return_type)
        })();
        context.leave_scope();

        let statement = Rc::new(result?);

        Ok(Function::new(move |runtime| {
               // A Return flow has already filled the return slot; reaching
               // the end of the body is a normal exit as well.
               statement.execute(runtime).map(|_: Flow| ())
           }))
    }
}

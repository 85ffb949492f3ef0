#[derive(Debug)]
/// Represents all errors that can be detected while compiling a script.
///
/// Every variant carries the 0-based source line and column of the first
/// offending character. Compilation stops at the first error; no recovery is
/// attempted.
pub enum CompileError {
    /// Found a character that cannot start any token.
    UnexpectedCharacter {
        /// The offending text.
        text: String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// A numeric literal could not be parsed as an integer or as a double.
    MalformedNumber {
        /// The literal as written.
        text: String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// A string literal was still open when the input ended.
    UnterminatedString {
        /// The source line where the input ended.
        line: usize,
        /// The source column where the input ended.
        col:  usize,
    },
    /// A block comment was still open when the input ended.
    UnterminatedComment {
        /// The source line where the input ended.
        line: usize,
        /// The source column where the input ended.
        col:  usize,
    },
    /// Found a token that is not valid at the current position.
    UnexpectedToken {
        /// The token as written.
        token: String,
        /// The source line where the error occurred.
        line:  usize,
        /// The source column where the error occurred.
        col:   usize,
    },
    /// A specific token was required but something else was found.
    ExpectedToken {
        /// The expected token text.
        expected: String,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        col:      usize,
    },
    /// An expression ended where an operand was still required.
    OperandExpected {
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// The integer after `break` is zero, fractional, or exceeds the number
    /// of enclosing breakable constructs.
    InvalidBreakLevel {
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// Tried to declare a variable of type `void`.
    VoidVariable {
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// A declaration appeared directly inside a `switch` body.
    DeclarationInSwitch {
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// An identifier was used before being declared.
    UndeclaredIdentifier {
        /// The name of the identifier.
        name: String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// An identifier was declared twice in the same scope.
    AlreadyDeclared {
        /// The name of the identifier.
        name: String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// A value without storage was used where an assignable location is
    /// required.
    NotLvalue {
        /// The rendered type of the value.
        type_name: String,
        /// The source line where the error occurred.
        line:      usize,
        /// The source column where the error occurred.
        col:       usize,
    },
    /// No implicit conversion exists between the two types.
    CannotConvert {
        /// The rendered source type.
        from: String,
        /// The rendered destination type.
        to:   String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// Indexing was applied to a type that is neither an array nor a tuple.
    NotIndexable {
        /// The rendered type of the indexed value.
        type_name: String,
        /// The source line where the error occurred.
        line:      usize,
        /// The source column where the error occurred.
        col:       usize,
    },
    /// A call was applied to a non-function value.
    NotCallable {
        /// The rendered type of the called value.
        type_name: String,
        /// The source line where the error occurred.
        line:      usize,
        /// The source column where the error occurred.
        col:       usize,
    },
    /// A tuple was indexed with something other than an in-range integer
    /// literal.
    InvalidTupleIndex {
        /// The index as written, if it was numeric at all.
        index: Option<f64>,
        /// The source line where the error occurred.
        line:  usize,
        /// The source column where the error occurred.
        col:   usize,
    },
    /// A function was called with the wrong number of arguments.
    WrongArgumentCount {
        /// The number of declared parameters.
        expected: usize,
        /// The number of arguments given.
        given:    usize,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        col:      usize,
    },
    /// An argument was passed with `&` to a parameter that is not declared
    /// by reference.
    ByValueParameter {
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// Two `case` labels of the same `switch` have the same value.
    DuplicateCase {
        /// The repeated label value.
        label: f64,
        /// The source line where the error occurred.
        line:  usize,
        /// The source column where the error occurred.
        col:   usize,
    },
    /// A `public` function's signature differs from the declaration the host
    /// supplied for it.
    PublicFunctionMismatch {
        /// The name of the function.
        name:     String,
        /// The rendered type the host declared.
        expected: String,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        col:      usize,
    },
    /// The host declared a public function that the script never defines.
    UndefinedPublicFunction {
        /// The name of the function.
        name: String,
        /// The source line where the error occurred.
        line: usize,
        /// The source column where the error occurred.
        col:  usize,
    },
    /// An internal invariant of the compiler was violated.
    Internal {
        /// Details about the failure.
        message: String,
        /// The source line where the error occurred.
        line:    usize,
        /// The source column where the error occurred.
        col:     usize,
    },
}

impl CompileError {
    /// Returns the 0-based source line the error points at.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { line, .. }
            | Self::MalformedNumber { line, .. }
            | Self::UnterminatedString { line, .. }
            | Self::UnterminatedComment { line, .. }
            | Self::UnexpectedToken { line, .. }
            | Self::ExpectedToken { line, .. }
            | Self::OperandExpected { line, .. }
            | Self::InvalidBreakLevel { line, .. }
            | Self::VoidVariable { line, .. }
            | Self::DeclarationInSwitch { line, .. }
            | Self::UndeclaredIdentifier { line, .. }
            | Self::AlreadyDeclared { line, .. }
            | Self::NotLvalue { line, .. }
            | Self::CannotConvert { line, .. }
            | Self::NotIndexable { line, .. }
            | Self::NotCallable { line, .. }
            | Self::InvalidTupleIndex { line, .. }
            | Self::WrongArgumentCount { line, .. }
            | Self::ByValueParameter { line, .. }
            | Self::DuplicateCase { line, .. }
            | Self::PublicFunctionMismatch { line, .. }
            | Self::UndefinedPublicFunction { line, .. }
            | Self::Internal { line, .. } => *line,
        }
    }

    /// Returns the 0-based source column the error points at.
    #[must_use]
    pub const fn col(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { col, .. }
            | Self::MalformedNumber { col, .. }
            | Self::UnterminatedString { col, .. }
            | Self::UnterminatedComment { col, .. }
            | Self::UnexpectedToken { col, .. }
            | Self::ExpectedToken { col, .. }
            | Self::OperandExpected { col, .. }
            | Self::InvalidBreakLevel { col, .. }
            | Self::VoidVariable { col, .. }
            | Self::DeclarationInSwitch { col, .. }
            | Self::UndeclaredIdentifier { col, .. }
            | Self::AlreadyDeclared { col, .. }
            | Self::NotLvalue { col, .. }
            | Self::CannotConvert { col, .. }
            | Self::NotIndexable { col, .. }
            | Self::NotCallable { col, .. }
            | Self::InvalidTupleIndex { col, .. }
            | Self::WrongArgumentCount { col, .. }
            | Self::ByValueParameter { col, .. }
            | Self::DuplicateCase { col, .. }
            | Self::PublicFunctionMismatch { col, .. }
            | Self::UndefinedPublicFunction { col, .. }
            | Self::Internal { col, .. } => *col,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedCharacter { text, .. } => {
                write!(f, "Parsing error: Unexpected '{text}'.")
            },
            Self::MalformedNumber { text, .. } => {
                write!(f, "Parsing error: Malformed number '{text}'.")
            },
            Self::UnterminatedString { .. } => {
                write!(f, "Parsing error: Expected closing '\"'.")
            },
            Self::UnterminatedComment { .. } => {
                write!(f, "Parsing error: Expected closing '*/'.")
            },

            Self::UnexpectedToken { token, .. } => {
                write!(f, "Syntax error: Unexpected '{token}'.")
            },
            Self::ExpectedToken { expected, .. } => {
                write!(f, "Syntax error: Expected '{expected}'.")
            },
            Self::OperandExpected { .. } => write!(f, "Syntax error: Operand expected."),
            Self::InvalidBreakLevel { .. } => write!(f, "Syntax error: Invalid break level."),
            Self::VoidVariable { .. } => {
                write!(f, "Syntax error: Cannot declare a void variable.")
            },
            Self::DeclarationInSwitch { .. } => write!(f,
                                                       "Syntax error: Declarations are not \
                                                        allowed directly in a switch body."),

            Self::UndeclaredIdentifier { name, .. } => {
                write!(f, "Semantic error: Undeclared identifier '{name}'.")
            },
            Self::AlreadyDeclared { name, .. } => {
                write!(f, "Semantic error: '{name}' is already declared.")
            },
            Self::NotLvalue { type_name, .. } => {
                write!(f, "Semantic error: '{type_name}' is not an lvalue.")
            },
            Self::CannotConvert { from, to, .. } => {
                write!(f, "Semantic error: Cannot convert '{from}' to '{to}'.")
            },
            Self::NotIndexable { type_name, .. } => {
                write!(f, "Semantic error: '{type_name}' is not indexable.")
            },
            Self::NotCallable { type_name, .. } => {
                write!(f, "Semantic error: '{type_name}' is not callable.")
            },
            Self::InvalidTupleIndex { index, .. } => match index {
                Some(idx) => write!(f, "Semantic error: Invalid tuple index {idx}."),
                None => write!(f, "Semantic error: Tuple index must be an integer literal."),
            },
            Self::WrongArgumentCount { expected, given, .. } => write!(f,
                                                                      "Semantic error: Wrong \
                                                                       number of arguments. \
                                                                       Expected {expected}, \
                                                                       given {given}."),
            Self::ByValueParameter { .. } => write!(f,
                                                    "Semantic error: The function does not \
                                                     receive this argument by reference."),
            Self::DuplicateCase { label, .. } => {
                write!(f, "Semantic error: Duplicate case label {label}.")
            },
            Self::PublicFunctionMismatch { name, expected, .. } => {
                write!(f,
                       "Semantic error: Public function '{name}' does not match its declaration \
                        '{expected}'.")
            },
            Self::UndefinedPublicFunction { name, .. } => {
                write!(f, "Semantic error: Public function '{name}' is not defined.")
            },

            Self::Internal { message, .. } => write!(f, "Compiler error: {message}."),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile-time errors.
///
/// Defines all error types that can occur while lexing, parsing, and
/// type-checking a script. Every compile error carries the line and column
/// of the first offending character; the first error aborts compilation.
pub mod compile_error;
/// Error reporting.
///
/// Renders a compile error together with the source line it points at and a
/// caret marker under the offending column.
pub mod report;
/// Runtime errors.
///
/// Contains all error types that can be raised while a compiled script is
/// executing, such as negative array indices or calls through uninitialized
/// function variables.
pub mod runtime_error;

pub use compile_error::CompileError;
pub use runtime_error::RuntimeError;

#[derive(Debug)]
/// The error type returned by the host-facing entry points.
pub enum Error {
    /// The script file could not be read.
    FileNotFound {
        /// The path that was tried.
        path: String,
    },
    /// The script failed to compile.
    Compile(CompileError),
    /// The script failed while running.
    Runtime(RuntimeError),
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound { path } => write!(f, "'{path}' not found."),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileNotFound { .. } => None,
            Self::Compile(e) => Some(e),
            Self::Runtime(e) => Some(e),
        }
    }
}

#[derive(Debug)]
/// Represents all errors that can abort a running script.
///
/// A runtime error propagates out of the engine to the host; the value stack
/// is unwound to its pre-call depth, and globals keep whatever the script
/// last wrote into them.
pub enum RuntimeError {
    /// An array was indexed with a negative value.
    NegativeIndex {
        /// The index that was actually requested.
        index: f64,
    },
    /// A global variable was read before its initializer ran.
    UninitializedGlobal {
        /// The slot of the global.
        index: usize,
    },
    /// A function-typed variable was called before being assigned.
    UninitializedFunction,
    /// A host-registered native function reported a failure.
    Native {
        /// Details supplied by the native function.
        message: String,
    },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeIndex { index } => {
                write!(f, "Runtime error: Negative index {index} is invalid.")
            },
            Self::UninitializedGlobal { index } => {
                write!(f, "Runtime error: Uninitialized access to global variable {index}.")
            },
            Self::UninitializedFunction => {
                write!(f, "Runtime error: Uninitialized function call.")
            },
            Self::Native { message } => write!(f, "Runtime error: {message}."),
        }
    }
}

impl std::error::Error for RuntimeError {}

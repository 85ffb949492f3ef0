use std::{fs, io::Write};

use crate::{
    compiler::compile,
    error::{Error, RuntimeError, report::write_report},
    runtime::{
        context::RuntimeContext,
        value::{Function, Value, unbox},
    },
};

/// The host's handle to one script.
///
/// A module accumulates native-function registrations and public-function
/// declarations, compiles a source file into a runnable image, and then
/// lets the host call the script's `public` functions as if they were
/// native. Loading again replaces the previous image.
///
/// # Example
/// ```
/// use tessera::{Module, Value};
///
/// let mut module = Module::new();
/// module.declare_public_function("function number twice(number)");
/// module.load_source("public function number twice(number x) { return 2 * x; }")
///       .unwrap();
///
/// let ret = module.call_public("twice", vec![Value::from(21.0)]).unwrap();
/// assert!(matches!(ret, Value::Number(n) if n == 42.0));
/// ```
pub struct Module {
    external_functions:  Vec<(String, Function)>,
    public_declarations: Vec<String>,
    context:             Option<RuntimeContext>,
}

#[allow(clippy::new_without_default)]
impl Module {
    /// Creates a module with no natives, no declarations, and no image.
    #[must_use]
    pub const fn new() -> Self {
        Self { external_functions:  Vec::new(),
               public_declarations: Vec::new(),
               context:             None, }
    }

    /// Registers a native function under `declaration`, which has the form
    /// `function <ret> <name>(<t1>[, <t2>…])`.
    ///
    /// The callable reads its arguments from the frame — argument `i` is
    /// `context.local(-1 - i)` — and delivers its result through
    /// `context.set_retval`. The declaration is compiled together with
    /// every script this module loads, so scripts see the native under its
    /// declared name and signature.
    pub fn add_external_function(&mut self,
                                 declaration: &str,
                                 f: impl Fn(&mut RuntimeContext) -> Result<(), RuntimeError>
                                     + 'static) {
        self.external_functions.push((declaration.to_string(), Function::new(f)));
    }

    /// Declares a public function the host intends to call. The script
    /// must define a matching `public function`, or loading fails.
    pub fn declare_public_function(&mut self, declaration: &str) {
        self.public_declarations.push(declaration.to_string());
    }

    /// Compiles `source` and initializes its globals, replacing any
    /// previously loaded image.
    ///
    /// # Errors
    /// Returns a compile error (no image is kept on failure) or a runtime
    /// error raised by a global initializer.
    pub fn load_source(&mut self, source: &str) -> Result<(), Error> {
        let mut context =
            compile(source, &self.external_functions, &self.public_declarations)?;
        context.initialize()?;
        self.context = Some(context);
        Ok(())
    }

    /// Reads and loads the script at `path`.
    ///
    /// # Errors
    /// Returns [`Error::FileNotFound`] when the file cannot be read, and
    /// any error of [`Module::load_source`] otherwise.
    pub fn load(&mut self, path: &str) -> Result<(), Error> {
        let source =
            fs::read_to_string(path).map_err(|_| Error::FileNotFound { path:
                                                                           path.to_string(), })?;
        self.load_source(&source)
    }

    /// Loads the script at `path`, writing a formatted report of any
    /// failure to `err`. Compile errors are rendered with the offending
    /// source line and a caret marker.
    ///
    /// Returns `true` when the script is loaded and ready to call.
    pub fn try_load(&mut self, path: &str, err: &mut impl Write) -> bool {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(_) => {
                let _ = writeln!(err, "'{path}' not found.");
                return false;
            },
        };

        match self.load_source(&source) {
            Ok(()) => true,
            Err(Error::Compile(e)) => {
                let _ = write_report(&e, &source, err);
                false
            },
            Err(e) => {
                let _ = writeln!(err, "{e}");
                false
            },
        }
    }

    /// Calls the public function `name` with `args` and returns its
    /// unboxed result.
    ///
    /// The arguments must match the function's declared parameters in
    /// count and type; the values are boxed onto the stack exactly as a
    /// script-level call would box them. Passing a [`Value::Lvalue`]
    /// hands the callee the host's own box, which is how a host observes
    /// writes through a by-ref parameter.
    ///
    /// # Errors
    /// Returns a runtime error when no script is loaded, when `name` is
    /// not a public function, or when the call itself fails.
    pub fn call_public(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let Some(context) = self.context.as_mut() else {
            return Err(Error::Runtime(RuntimeError::Native { message:
                                                                 "no script is loaded"
                                                                     .to_string(), }));
        };

        let Some(index) = context.public_function(name) else {
            return Err(Error::Runtime(RuntimeError::Native { message:
                                                                 format!("'{name}' is not a \
                                                                          public function"), }));
        };

        let function = context.function(index);
        let arguments = args.into_iter().map(Value::into_variable).collect();

        let ret = context.call(&function, arguments)?;
        Ok(unbox(ret))
    }

    /// Re-runs the global initializers, restoring every global to its
    /// declared initial value.
    ///
    /// # Errors
    /// Propagates a runtime error raised by an initializer.
    pub fn reset_globals(&mut self) -> Result<(), Error> {
        if let Some(context) = self.context.as_mut() {
            context.initialize()?;
        }
        Ok(())
    }
}


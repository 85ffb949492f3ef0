use rand::Rng;

use crate::{error::RuntimeError, module::Module};

/// Registers the mathematical natives: `sin`, `cos`, `tan`, `log`, `exp`,
/// `pow`, and `rnd`.
pub fn add_math_functions(module: &mut Module) {
    module.add_external_function("function number sin(number)", |ctx| {
              let x = ctx.number_argument(0);
              ctx.return_number(x.sin());
              Ok(())
          });

    module.add_external_function("function number cos(number)", |ctx| {
              let x = ctx.number_argument(0);
              ctx.return_number(x.cos());
              Ok(())
          });

    module.add_external_function("function number tan(number)", |ctx| {
              let x = ctx.number_argument(0);
              ctx.return_number(x.tan());
              Ok(())
          });

    module.add_external_function("function number log(number)", |ctx| {
              let x = ctx.number_argument(0);
              ctx.return_number(x.ln());
              Ok(())
          });

    module.add_external_function("function number exp(number)", |ctx| {
              let x = ctx.number_argument(0);
              ctx.return_number(x.exp());
              Ok(())
          });

    module.add_external_function("function number pow(number, number)", |ctx| {
              let x = ctx.number_argument(0);
              let y = ctx.number_argument(1);
              ctx.return_number(x.powf(y));
              Ok(())
          });

    module.add_external_function("function number rnd(number)", |ctx| {
              #[allow(clippy::cast_possible_truncation)]
              let bound = ctx.number_argument(0) as i64;
              if bound <= 0 {
                  return Err(RuntimeError::Native { message:
                                                        format!("rnd needs a positive bound, \
                                                                 got {bound}"), });
              }

              #[allow(clippy::cast_precision_loss)]
              ctx.return_number(rand::thread_rng().gen_range(0..bound) as f64);
              Ok(())
          });
}

/// Registers the string natives: `strlen` and `substr`.
pub fn add_string_functions(module: &mut Module) {
    module.add_external_function("function number strlen(string)", |ctx| {
              let s = ctx.string_argument(0);
              #[allow(clippy::cast_precision_loss)]
              ctx.return_number(s.len() as f64);
              Ok(())
          });

    module.add_external_function("function string substr(string, number, number)", |ctx| {
              let s = ctx.string_argument(0);
              #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
              let from = ctx.number_argument(1).max(0.0) as usize;
              #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
              let count = ctx.number_argument(2).max(0.0) as usize;

              let ret: String = s.chars().skip(from).take(count).collect();
              ctx.return_string(ret);
              Ok(())
          });
}

/// Registers the tracing natives: `trace`, which prints a line, and
/// `assert`, which fails the running call when its argument is zero.
pub fn add_trace_functions(module: &mut Module) {
    module.add_external_function("function void trace(string)", |ctx| {
              let s = ctx.string_argument(0);
              println!("{s}");
              Ok(())
          });

    module.add_external_function("function void assert(number)", |ctx| {
              if ctx.number_argument(0) == 0.0 {
                  return Err(RuntimeError::Native { message: "assertion failed".to_string() });
              }
              Ok(())
          });
}

/// Registers the whole standard function set.
///
/// # Example
/// ```
/// use tessera::{Module, add_standard_functions};
///
/// let mut module = Module::new();
/// add_standard_functions(&mut module);
/// module.load_source("number x = pow(2, 10);").unwrap();
/// ```
pub fn add_standard_functions(module: &mut Module) {
    add_math_functions(module);
    add_string_functions(module);
    add_trace_functions(module);
}

use clap::Parser;
use tessera::{Module, add_standard_functions};

/// tessera runs a script file: the standard functions are registered, the
/// file is compiled, and its `public function void main()` is called.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the script file to run.
    script: String,
}

fn main() {
    let args = Args::parse();

    let mut module = Module::new();
    add_standard_functions(&mut module);
    module.declare_public_function("function void main()");

    let mut err = std::io::stderr();
    if !module.try_load(&args.script, &mut err) {
        std::process::exit(1);
    }

    if let Err(e) = module.call_public("main", Vec::new()) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

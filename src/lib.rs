//! # tessera
//!
//! tessera is a small statically-typed scripting language meant to be
//! embedded in a Rust host. The host registers native functions, declares
//! which script functions it will call, loads a source file, and then
//! invokes those functions as if they were native. Scripts get numbers,
//! immutable shared strings, fixed-shape tuples, growable arrays,
//! first-class function values, and by-reference parameters.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
    //missing_docs,
)]
#![allow(clippy::missing_errors_doc)]

/// The typed expression tree.
///
/// Declares the node type the expression parser builds and the typing and
/// conversion rules applied while each node is constructed. A finished
/// tree is well-typed by construction.
///
/// # Responsibilities
/// - Defines the operations and leaf values expression nodes carry.
/// - Resolves identifiers and assigns every node its type and lvalue flag.
/// - Enforces the implicit-conversion rules at the point of first error.
pub mod ast;
/// The compilation pipeline.
///
/// Everything between source text and a runnable image: the lexer, the
/// expression and statement parsers, the symbol tables, and the evaluator
/// builder that lowers typed trees into executable form.
///
/// # Responsibilities
/// - Tokenizes source with line and column tracking.
/// - Parses declarations, statements, and expressions with full typing.
/// - Compiles function bodies in a second pass so signatures resolve.
pub mod compiler;
/// Unified error types for compilation and execution.
///
/// Defines the compile-time and runtime error enums, the top-level error
/// the host-facing entry points return, and the caret-marked source
/// report.
///
/// # Responsibilities
/// - Carries the line and column of every compile-time failure.
/// - Separates parsing, syntax, semantic, and internal compiler errors.
/// - Renders errors against the offending source line.
pub mod error;
/// The host-facing module API.
///
/// The [`Module`] type through which a host registers natives, declares
/// public functions, loads scripts, and calls into them.
pub mod module;
/// The execution engine.
///
/// The runtime value representation, the value stack and call protocol,
/// and the tree-walking executors for expressions and statements.
///
/// # Responsibilities
/// - Models script variables as shared mutable boxes.
/// - Runs the statement tree, propagating flow control as values.
/// - Keeps stack lifetime tied to lexical scope via scope guards.
pub mod runtime;
/// The standard function set.
///
/// Math, string, and tracing natives a host can register wholesale, plus
/// `assert` for script self-checks.
pub mod stdlib;
/// Structural types and their registry.
///
/// Hash-consed type identities: two type handles compare equal exactly
/// when the types are structurally equal.
pub mod types;

pub use error::Error;
pub use module::Module;
pub use runtime::value::Value;
pub use stdlib::add_standard_functions;

/// The execution engine state.
///
/// Holds the compiled image (global initializers, function table, public
/// name map) together with the globals vector, the value stack, and the
/// call protocol that lays frames out as `[params…][retval][locals…]`.
pub mod context;
/// Executable expressions.
///
/// The lowered form of the typed expression tree: a tagged sum with one
/// variant per semantic operator plus explicit conversion edges, evaluated
/// by exhaustive match.
pub mod expression;
/// Executable statements.
///
/// The statement tree and its executors, which propagate flow control
/// (`normal`, `break N`, `continue`, `return`) as ordinary return values
/// and pair lexical scopes with stack truncation.
pub mod statement;
/// Runtime values.
///
/// The reference-counted variable boxes that give scripts their reference
/// semantics, the computed-value type flowing through evaluation, and the
/// string rendering used by `tostring` and `trace`.
pub mod value;

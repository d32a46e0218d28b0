//! Semantic analysis and IR generation for the Crust C99 front-end.
//!
//! This crate turns a parsed translation unit (`crust_ast`) into a typed
//! linear IR module (`crust_ir`) plus an ordered diagnostics list. It
//! owns the intellectually heavy middle of the compiler:
//!
//! - scoped name binding with separately-namespaced tags, typedef-free
//!   by contract with the parser, forward declarations included
//! - C's conversion rules: integer promotions, usual arithmetic
//!   conversions, array/function decay, `_Bool` zero/nonzero semantics
//! - expression lowering with precise l-value/r-value and indirection
//!   handling
//! - structured and designated initializers, inferred array lengths, and
//!   constant-aggregate synthesis
//! - statement lowering with `goto` forward references and in-place
//!   `switch` case tables
//! - CFG finalization: block partitioning, unreachable-block pruning,
//!   implicit returns, re-linearization, global toposort
//! - a structural IR validator used as a self-check
//!
//! # Pipeline Position
//!
//! ```text
//! Source → Lex/Preprocess → Parse → **crust_sema** → back-end
//! ```
//!
//! User-level problems become diagnostics and never abort the walk;
//! violated compiler invariants (malformed ASTs, validator failures)
//! panic.

mod cfg;
mod context;
mod lower;
mod scope;
mod types;
mod validate;

pub use context::Sema;
pub use lower::{lower, LowerResult};
pub use scope::{Symbol, SymbolKind};
pub use types::types_equal;
pub use validate::{validate_function, ValidateError};

#[cfg(test)]
mod tests;

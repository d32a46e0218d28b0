//! Input data model for the Crust C99 front-end.
//!
//! This crate defines everything the semantic core consumes from its
//! upstream collaborators:
//!
//! - Interned [`Name`]s and the [`StringInterner`]
//! - Source [`Pos`]itions and [`Token`]s (the parser keeps lexemes and
//!   positions on every identifier and literal)
//! - The C type tree ([`CType`], [`TypeKind`]) as produced by the parser,
//!   with typedefs already resolved
//! - The expression arena ([`ExprArena`], [`ExprId`]) — expression nodes
//!   are index handles, never boxed
//! - Owned statement and declaration trees ([`Stmt`], [`Declaration`],
//!   [`TranslationUnit`]) referencing arena expressions
//!
//! # Pipeline Position
//!
//! ```text
//! Source → Lex/Preprocess → Parse → **crust_ast** → crust_sema → back-end
//! ```

mod arena;
mod decl;
mod expr;
mod interner;
mod name;
mod pos;
mod stmt;
mod token;
pub mod types;

pub use arena::{ExprArena, ExprId, ExprRange};
pub use decl::{
    Declaration, Designator, ExternalDecl, FunctionDef, InitItem, Initializer, TranslationUnit,
};
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use interner::StringInterner;
pub use name::Name;
pub use pos::Pos;
pub use stmt::{BlockItem, Stmt, StmtKind};
pub use token::Token;
pub use types::{CType, TypeKind};

//! Declarations, initializers, and the translation unit.
//!
//! The parser splits multi-declarator declarations, so a [`Declaration`]
//! carries exactly one declarator (or none, for bare tag declarations
//! like `struct S { int x; };`).

use crate::types::CType;
use crate::{ExprId, Pos, Stmt, Token};

/// One step of a designation: `[index]` or `.field`.
#[derive(Clone, PartialEq, Debug)]
pub enum Designator {
    Index(ExprId),
    Field(Token),
}

/// One element of a braced initializer list, with optional designation.
#[derive(Clone, PartialEq, Debug)]
pub struct InitItem {
    pub designators: Vec<Designator>,
    pub init: Initializer,
}

/// An initializer: a single expression or a braced list.
#[derive(Clone, PartialEq, Debug)]
pub enum Initializer {
    Expr(ExprId),
    List(Vec<InitItem>),
}

/// A declaration with at most one declarator.
///
/// `name: None` declares only the type's tag (`struct S { ... };`).
#[derive(Clone, PartialEq, Debug)]
pub struct Declaration {
    pub ty: CType,
    pub name: Option<Token>,
    pub init: Option<Initializer>,
    pub pos: Pos,
}

/// A function definition: function-typed declarator plus a compound body.
///
/// Parameter names live in the function type's parameter list.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDef {
    pub ty: CType,
    pub name: Token,
    pub body: Stmt,
    pub pos: Pos,
}

/// One external declaration of a translation unit.
#[derive(Clone, PartialEq, Debug)]
pub enum ExternalDecl {
    Function(FunctionDef),
    Decl(Declaration),
}

/// A parsed translation unit: external declarations in source order plus
/// the expression arena they reference.
#[derive(Default, Debug)]
pub struct TranslationUnit {
    pub exprs: crate::ExprArena,
    pub decls: Vec<ExternalDecl>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }
}

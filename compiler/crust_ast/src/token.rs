//! Tokens as the core sees them: interned lexeme plus source position.

use std::fmt;

use crate::{Name, Pos};

/// A token surviving from the lexical front-end.
///
/// Identifiers, field names, labels, and literal lexemes all arrive as
/// tokens; the semantic core decodes literal lexemes itself.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    pub text: Name,
    pub pos: Pos,
}

impl Token {
    pub const fn new(text: Name, pos: Pos) -> Self {
        Token { text, pos }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?} @ {:?})", self.text, self.pos)
    }
}

//! Error codes for all core diagnostics.
//!
//! Each code is a unique identifier (e.g. `E3001`) with the first digit
//! indicating the phase. The semantic core only emits `E3xxx`; the lower
//! bands are reserved for the lexical and syntactic front-ends.

use std::fmt;

/// Error codes for all core diagnostics.
///
/// Format: E#### where the first digit indicates phase:
/// - E0xxx: lexer/preprocessor (reserved, emitted upstream)
/// - E1xxx: parser (reserved, emitted upstream)
/// - E3xxx: semantic analysis / IR generation
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Name resolution (E30xx)
    /// Use of undeclared identifier
    E3001,
    /// Use of undeclared label
    E3002,
    /// Redefinition of symbol
    E3003,
    /// Redefinition of tag
    E3004,
    /// Redefinition of label
    E3005,

    // Types and expressions (E31xx)
    /// Invalid binary-expression operands
    E3101,
    /// Invalid assignment target
    E3102,
    /// Invalid initializer type
    E3103,
    /// Global initializer is not constant
    E3104,
    /// Invalid if/loop/ternary/switch condition type
    E3105,
    /// Invalid ternary expression operands
    E3106,
    /// Call target is not a function
    E3107,
    /// Call argument count mismatch
    E3108,
    /// Invalid unary operand type
    E3109,
    /// Invalid conversion to boolean
    E3110,
    /// Enumeration constant must have integer type
    E3111,
    /// Invalid case expression
    E3112,
    /// Duplicate switch case
    E3113,
    /// Case/break/continue outside enclosing construct
    E3114,
    /// Invalid struct field reference
    E3115,
    /// Mismatched return (void/non-void)
    E3116,

    // Supplemental (E32xx)
    /// Division or remainder by a constant zero
    E3201,
    /// Excess elements in initializer
    E3202,
    /// Expression is not an integer constant
    E3203,
}

impl ErrorCode {
    /// The code as it appears in output, e.g. `"E3001"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3101 => "E3101",
            ErrorCode::E3102 => "E3102",
            ErrorCode::E3103 => "E3103",
            ErrorCode::E3104 => "E3104",
            ErrorCode::E3105 => "E3105",
            ErrorCode::E3106 => "E3106",
            ErrorCode::E3107 => "E3107",
            ErrorCode::E3108 => "E3108",
            ErrorCode::E3109 => "E3109",
            ErrorCode::E3110 => "E3110",
            ErrorCode::E3111 => "E3111",
            ErrorCode::E3112 => "E3112",
            ErrorCode::E3113 => "E3113",
            ErrorCode::E3114 => "E3114",
            ErrorCode::E3115 => "E3115",
            ErrorCode::E3116 => "E3116",
            ErrorCode::E3201 => "E3201",
            ErrorCode::E3202 => "E3202",
            ErrorCode::E3203 => "E3203",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_variant() {
        assert_eq!(ErrorCode::E3001.to_string(), "E3001");
        assert_eq!(ErrorCode::E3203.to_string(), "E3203");
    }
}

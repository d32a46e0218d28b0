//! Diagnostic construction.
//!
//! A [`Diagnostic`] is built with chained `with_*` methods; the free
//! functions below are the canonical constructors, one per error kind,
//! each taking exactly the payload that kind carries.

use std::fmt;

use crust_ast::types::CType;
use crust_ast::Pos;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic with the context needed for a useful report.
#[derive(Clone, Eq, PartialEq, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    /// Severity level.
    pub severity: Severity,
    /// Main message.
    pub message: String,
    /// Where the problem is.
    pub pos: Pos,
    /// For redefinitions: where the previous occurrence is.
    pub previous: Option<Pos>,
    /// Additional notes providing context.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic at a position.
    pub fn error(code: ErrorCode, pos: Pos) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: String::new(),
            pos,
            previous: None,
            notes: Vec::new(),
        }
    }

    /// Create a new warning diagnostic at a position.
    pub fn warning(code: ErrorCode, pos: Pos) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Self::error(code, pos)
        }
    }

    /// Set the main message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Record the position of a previous conflicting occurrence.
    pub fn with_previous(mut self, previous: Pos) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Add a note providing additional context.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Check if this is an error (vs warning).
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at {:?}: {}",
            self.severity, self.code, self.pos, self.message
        )?;
        if let Some(prev) = self.previous {
            write!(f, "\n  --> previously at {prev:?}")?;
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        Ok(())
    }
}

// Canonical constructors, one per error kind.

/// `use of undeclared identifier`
pub fn undeclared_identifier(pos: Pos, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3001, pos)
        .with_message(format!("use of undeclared identifier `{name}`"))
}

/// `use of undeclared label`
pub fn undeclared_label(pos: Pos, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3002, pos)
        .with_message(format!("use of undeclared label `{name}`"))
}

/// `redefinition of symbol`
pub fn redefinition(pos: Pos, name: &str, previous: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3003, pos)
        .with_message(format!("redefinition of `{name}`"))
        .with_previous(previous)
}

/// `redefinition of tag`
pub fn tag_redefinition(pos: Pos, name: &str, previous: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3004, pos)
        .with_message(format!("redefinition of tag `{name}`"))
        .with_previous(previous)
}

/// `redefinition of label`
pub fn label_redefinition(pos: Pos, name: &str, previous: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3005, pos)
        .with_message(format!("redefinition of label `{name}`"))
        .with_previous(previous)
}

/// `invalid binary-expression operands`
pub fn invalid_binary_operands(pos: Pos, op: &str, lhs: &CType, rhs: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3101, pos).with_message(format!(
        "invalid operands to binary `{op}` (`{lhs}` and `{rhs}`)"
    ))
}

/// `invalid assignment target`
pub fn invalid_assignment_target(pos: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3102, pos)
        .with_message("expression is not assignable")
}

/// `invalid initializer type`
pub fn invalid_initializer(pos: Pos, name: &str, expected: &CType, found: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3103, pos).with_message(format!(
        "invalid initializer for `{name}`: expected `{expected}`, found `{found}`"
    ))
}

/// `global initializer not constant`
pub fn global_initializer_not_constant(pos: Pos, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3104, pos)
        .with_message(format!("initializer of `{name}` is not a compile-time constant"))
}

/// `invalid if/loop/ternary/switch condition type`
pub fn invalid_condition(pos: Pos, context: &str, ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3105, pos)
        .with_message(format!("invalid `{context}` condition of type `{ty}`"))
}

/// `invalid ternary expression operands`
pub fn invalid_ternary_operands(pos: Pos, true_ty: &CType, false_ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3106, pos).with_message(format!(
        "incompatible ternary operand types `{true_ty}` and `{false_ty}`"
    ))
}

/// `call target not function`
pub fn call_target_not_function(pos: Pos, ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3107, pos)
        .with_message(format!("called object of type `{ty}` is not a function"))
}

/// `call argument count mismatch`
pub fn call_argument_count(pos: Pos, expected: usize, actual: usize) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3108, pos).with_message(format!(
        "call expects {expected} argument(s), found {actual}"
    ))
}

/// `invalid unary operand type`
pub fn invalid_unary_operand(pos: Pos, op: &str, ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3109, pos)
        .with_message(format!("invalid operand to unary `{op}` (`{ty}`)"))
}

/// `invalid conversion to boolean`
pub fn invalid_bool_conversion(pos: Pos, ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3110, pos)
        .with_message(format!("cannot convert `{ty}` to a boolean"))
}

/// `enumeration constant must have integer type`
pub fn enum_constant_not_integer(pos: Pos, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3111, pos).with_message(format!(
        "enumerator `{name}` must have an integer constant value"
    ))
}

/// `invalid case expression`
pub fn invalid_case(pos: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3112, pos)
        .with_message("case expression is not an integer constant")
}

/// `duplicate switch case`
pub fn duplicate_case(pos: Pos, value: i64) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3113, pos)
        .with_message(format!("duplicate case value `{value}`"))
}

/// `case/break/continue outside enclosing construct`
pub fn outside_construct(pos: Pos, keyword: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3114, pos)
        .with_message(format!("`{keyword}` outside of an enclosing construct"))
}

/// `invalid struct field reference`
pub fn invalid_field_reference(pos: Pos, field: &str, ty: &CType) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3115, pos)
        .with_message(format!("no field `{field}` in `{ty}`"))
}

/// `non-void function returns void / void function returns value`
pub fn return_mismatch(pos: Pos, returns_void: bool) -> Diagnostic {
    let message = if returns_void {
        "void function returns a value"
    } else {
        "non-void function returns no value"
    };
    Diagnostic::error(ErrorCode::E3116, pos).with_message(message)
}

/// `division by a constant zero`
pub fn division_by_zero(pos: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3201, pos).with_message("division by zero")
}

/// `excess elements in initializer`
pub fn excess_initializer(pos: Pos) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3202, pos).with_message("excess elements in initializer")
}

/// `expression is not an integer constant`
pub fn not_constant(pos: Pos, what: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3203, pos)
        .with_message(format!("{what} is not an integer constant expression"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_chain() {
        let diag = Diagnostic::error(ErrorCode::E3003, Pos::UNKNOWN)
            .with_message("redefinition of `x`")
            .with_previous(Pos::UNKNOWN)
            .with_note("previous definition is here");

        assert_eq!(diag.code, ErrorCode::E3003);
        assert!(diag.is_error());
        assert!(diag.previous.is_some());
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn helper_payloads() {
        let diag = undeclared_identifier(Pos::UNKNOWN, "foo");
        assert_eq!(diag.code, ErrorCode::E3001);
        assert!(diag.message.contains("foo"));

        let diag = invalid_binary_operands(Pos::UNKNOWN, "+", &CType::int(), &CType::void());
        assert_eq!(diag.code, ErrorCode::E3101);
        assert!(diag.message.contains("int"));
        assert!(diag.message.contains("void"));

        let diag = call_argument_count(Pos::UNKNOWN, 2, 3);
        assert!(diag.message.contains('2'));
        assert!(diag.message.contains('3'));
    }

    #[test]
    fn display_format() {
        let diag = duplicate_case(Pos::UNKNOWN, 4).with_note("first seen above");
        let output = diag.to_string();
        assert!(output.contains("error [E3113]"));
        assert!(output.contains("duplicate case value `4`"));
        assert!(output.contains("= note: first seen above"));
    }
}

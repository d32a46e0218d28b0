//! Diagnostic and error reporting for the Crust C99 front-end.
//!
//! The semantic core never aborts on a user error: it builds a
//! [`Diagnostic`] (one constructor helper per error kind, each carrying the
//! payload that kind needs), pushes it into the [`DiagnosticSink`], and
//! keeps lowering for maximum error-reporting coverage. Later stages check
//! the sink before validating or finalizing IR.

mod diagnostic;
mod error_code;
mod sink;

pub use diagnostic::{Diagnostic, Severity};
pub use diagnostic::{
    call_argument_count, call_target_not_function, division_by_zero, duplicate_case,
    enum_constant_not_integer, excess_initializer, invalid_assignment_target,
    invalid_binary_operands, invalid_bool_conversion, invalid_case, invalid_condition,
    invalid_field_reference, invalid_initializer, invalid_ternary_operands,
    invalid_unary_operand, global_initializer_not_constant, label_redefinition, not_constant,
    outside_construct, redefinition, return_mismatch, tag_redefinition, undeclared_identifier,
    undeclared_label,
};
pub use error_code::ErrorCode;
pub use sink::DiagnosticSink;

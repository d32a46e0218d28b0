//! Structural validation of emitted IR.
//!
//! Walks a finalized function and checks the invariants every backend
//! relies on:
//!
//! - every variable use has a prior definition (parameters, globals, and
//!   functions pre-seed the set)
//! - every branch and switch target names an existing label
//! - operand and result types match each opcode's signature
//! - every basic block ends in exactly one terminator
//!
//! A failure here is a compiler bug, not a user diagnostic: the driver
//! aborts on it. Functions that produced user diagnostics are never
//! validated.

use crust_ast::Name;
use crust_ir::{BinOp, CastOp, Inst, IrFunction, IrType, IrValue, Module};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// A violated IR invariant.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("instruction {index}: use of undefined value {name:?}")]
    UseBeforeDef { index: usize, name: Name },
    #[error("instruction {index}: branch to unknown label {label:?}")]
    UnknownLabel { index: usize, label: Name },
    #[error("instruction {index}: {detail}")]
    TypeMismatch { index: usize, detail: String },
    #[error("instruction {index}: block does not end in a terminator")]
    MissingTerminator { index: usize },
    #[error("instruction {index}: unreachable instruction after a terminator")]
    StrayInstruction { index: usize },
}

/// Validate one finalized function against the module it lives in.
pub fn validate_function(func: &IrFunction, module: &Module) -> Result<(), ValidateError> {
    let checker = Checker::new(func, module);
    checker.run()
}

struct Checker<'a> {
    func: &'a IrFunction,
    module: &'a Module,
    labels: FxHashSet<Name>,
    defined: FxHashSet<Name>,
}

impl<'a> Checker<'a> {
    fn new(func: &'a IrFunction, module: &'a Module) -> Self {
        let labels = func
            .body
            .iter()
            .filter_map(|inst| match inst {
                Inst::Label { name } => Some(*name),
                _ => None,
            })
            .collect();

        let mut defined: FxHashSet<Name> = FxHashSet::default();
        for param in &func.params {
            defined.insert(param.name);
        }
        for global in &module.globals {
            defined.insert(global.name);
        }
        for f in &module.functions {
            defined.insert(f.name);
        }
        defined.insert(func.name);

        Checker { func, module, labels, defined }
    }

    fn run(mut self) -> Result<(), ValidateError> {
        let mut after_terminator = false;
        let mut block_open = false;

        for (index, inst) in self.func.body.iter().enumerate() {
            match inst {
                Inst::Label { .. } => {
                    if block_open && !after_terminator {
                        return Err(ValidateError::MissingTerminator { index });
                    }
                    after_terminator = false;
                    block_open = true;
                }
                _ if after_terminator => {
                    return Err(ValidateError::StrayInstruction { index });
                }
                _ => {
                    block_open = true;
                    if inst.is_terminator() {
                        after_terminator = true;
                    }
                }
            }

            self.check_inst(index, inst)?;
            if let Some(dest) = inst.dest() {
                self.defined.insert(dest.name);
            }
        }

        if block_open && !after_terminator {
            return Err(ValidateError::MissingTerminator {
                index: self.func.body.len().saturating_sub(1),
            });
        }
        Ok(())
    }

    fn use_value(&self, index: usize, value: &IrValue) -> Result<(), ValidateError> {
        if let IrValue::Var(var) = value {
            if !self.defined.contains(&var.name) {
                return Err(ValidateError::UseBeforeDef { index, name: var.name });
            }
        }
        Ok(())
    }

    fn label(&self, index: usize, label: Name) -> Result<(), ValidateError> {
        if self.labels.contains(&label) {
            Ok(())
        } else {
            Err(ValidateError::UnknownLabel { index, label })
        }
    }

    fn mismatch(index: usize, detail: impl Into<String>) -> ValidateError {
        ValidateError::TypeMismatch { index, detail: detail.into() }
    }

    fn expect_eq(index: usize, what: &str, found: &IrType, expected: &IrType) -> Result<(), ValidateError> {
        if found == expected {
            Ok(())
        } else {
            Err(Self::mismatch(
                index,
                format!("{what}: expected `{expected}`, found `{found}`"),
            ))
        }
    }

    #[expect(clippy::too_many_lines, reason = "one arm per opcode signature")]
    fn check_inst(&self, index: usize, inst: &Inst) -> Result<(), ValidateError> {
        match inst {
            Inst::Label { .. } => Ok(()),

            Inst::Alloca { dest } => {
                if dest.ty.is_pointer() {
                    Ok(())
                } else {
                    Err(Self::mismatch(index, "alloca destination is not a pointer"))
                }
            }

            Inst::Load { dest, addr } => {
                self.use_value(index, addr)?;
                let Some(pointee) = addr.ty().pointee() else {
                    return Err(Self::mismatch(index, "load through a non-pointer"));
                };
                Self::expect_eq(index, "load result", &dest.ty, pointee)
            }

            Inst::Store { addr, value } => {
                self.use_value(index, addr)?;
                self.use_value(index, value)?;
                let Some(pointee) = addr.ty().pointee() else {
                    return Err(Self::mismatch(index, "store through a non-pointer"));
                };
                Self::expect_eq(index, "stored value", value.ty(), pointee)
            }

            Inst::Assign { dest, value } => {
                self.use_value(index, value)?;
                Self::expect_eq(index, "assign", value.ty(), &dest.ty)
            }

            Inst::Binary { op, dest, lhs, rhs } => {
                self.use_value(index, lhs)?;
                self.use_value(index, rhs)?;
                Self::expect_eq(index, "binary operands", rhs.ty(), lhs.ty())?;
                if op.is_comparison() {
                    Self::expect_eq(index, "comparison result", &dest.ty, &IrType::I1)
                } else {
                    let integer_only = matches!(
                        op,
                        BinOp::Mod | BinOp::And | BinOp::Or | BinOp::Xor | BinOp::Shl | BinOp::Shr
                    );
                    let lt = lhs.ty();
                    let ok = if integer_only {
                        lt.is_integer()
                    } else {
                        lt.is_integer() || lt.is_float()
                    };
                    if !ok {
                        return Err(Self::mismatch(
                            index,
                            format!("operator {op:?} on non-numeric `{lt}`"),
                        ));
                    }
                    Self::expect_eq(index, "binary result", &dest.ty, lt)
                }
            }

            Inst::Not { dest, operand } => {
                self.use_value(index, operand)?;
                if !operand.ty().is_integer() {
                    return Err(Self::mismatch(index, "bitwise not on a non-integer"));
                }
                Self::expect_eq(index, "not result", &dest.ty, operand.ty())
            }

            Inst::Neg { dest, operand } => {
                self.use_value(index, operand)?;
                let ty = operand.ty();
                if !ty.is_integer() && !ty.is_float() {
                    return Err(Self::mismatch(index, "negation of a non-numeric value"));
                }
                Self::expect_eq(index, "neg result", &dest.ty, ty)
            }

            Inst::Cast { op, dest, operand } => {
                self.use_value(index, operand)?;
                Self::check_cast(index, *op, &dest.ty, operand.ty())
            }

            Inst::Call { dest, func, args } => {
                self.use_value(index, func)?;
                for arg in args {
                    self.use_value(index, arg)?;
                }
                let fn_ty = match func.ty() {
                    IrType::Function { .. } => func.ty().clone(),
                    IrType::Ptr(inner) if inner.is_function() => (**inner).clone(),
                    other => {
                        return Err(Self::mismatch(
                            index,
                            format!("call through non-function `{other}`"),
                        ));
                    }
                };
                let IrType::Function { ret, params, variadic } = &fn_ty else {
                    unreachable!();
                };
                let count_ok = if *variadic {
                    args.len() >= params.len()
                } else {
                    args.len() == params.len()
                };
                if !count_ok {
                    return Err(Self::mismatch(
                        index,
                        format!("call passes {} arguments, signature has {}", args.len(), params.len()),
                    ));
                }
                for (arg, pty) in args.iter().zip(params) {
                    Self::expect_eq(index, "call argument", arg.ty(), pty)?;
                }
                match (dest, ret.is_void()) {
                    (None, true) => Ok(()),
                    (Some(d), false) => Self::expect_eq(index, "call result", &d.ty, ret),
                    (None, false) => Ok(()), // discarded result is fine
                    (Some(_), true) => {
                        Err(Self::mismatch(index, "void call with a result variable"))
                    }
                }
            }

            Inst::Ret { value } => {
                let ret_ty = self.func.return_type();
                match (value, ret_ty.is_void()) {
                    (None, true) => Ok(()),
                    (Some(v), false) => {
                        self.use_value(index, v)?;
                        Self::expect_eq(index, "return value", v.ty(), ret_ty)
                    }
                    (None, false) => Err(Self::mismatch(index, "missing return value")),
                    (Some(_), true) => Err(Self::mismatch(index, "void function returns a value")),
                }
            }

            Inst::Br { target } => self.label(index, *target),

            Inst::BrCond { cond, then_label, else_label } => {
                self.use_value(index, cond)?;
                Self::expect_eq(index, "branch condition", cond.ty(), &IrType::I1)?;
                self.label(index, *then_label)?;
                self.label(index, *else_label)
            }

            Inst::Switch { value, cases, default } => {
                self.use_value(index, value)?;
                if !value.ty().is_integer() {
                    return Err(Self::mismatch(index, "switch on a non-integer"));
                }
                for (_, label) in cases {
                    self.label(index, *label)?;
                }
                self.label(index, *default)
            }

            Inst::GetElemPtr { dest, base, index: idx } => {
                self.use_value(index, base)?;
                self.use_value(index, idx)?;
                if !idx.ty().is_integer() {
                    return Err(Self::mismatch(index, "element index is not an integer"));
                }
                let expected = match base.ty() {
                    IrType::Ptr(inner) => match &**inner {
                        IrType::Array { elem, .. } => IrType::Ptr(elem.clone()),
                        _ => base.ty().clone(),
                    },
                    other => {
                        return Err(Self::mismatch(
                            index,
                            format!("element pointer through non-pointer `{other}`"),
                        ));
                    }
                };
                Self::expect_eq(index, "element pointer", &dest.ty, &expected)
            }

            Inst::GetMemberPtr { dest, base, field } => {
                self.use_value(index, base)?;
                let IrType::Ptr(inner) = base.ty() else {
                    return Err(Self::mismatch(index, "member pointer through non-pointer"));
                };
                let IrType::Record(rid) = &**inner else {
                    return Err(Self::mismatch(index, "member pointer into a non-record"));
                };
                let layout = self.module.types.get(*rid);
                let Some(field_ty) = layout.fields.get(*field as usize).map(|f| &f.ty) else {
                    return Err(Self::mismatch(
                        index,
                        format!("field {field} out of bounds for record with {} fields", layout.fields.len()),
                    ));
                };
                Self::expect_eq(index, "member pointer", &dest.ty, &field_ty.clone().ptr_to())
            }
        }
    }

    fn check_cast(
        index: usize,
        op: CastOp,
        dest: &IrType,
        src: &IrType,
    ) -> Result<(), ValidateError> {
        let float_width = |ty: &IrType| match ty {
            IrType::F32 => 32u32,
            IrType::F64 => 64,
            IrType::F80 => 80,
            _ => 0,
        };
        let ok = match op {
            CastOp::Trunc => {
                (src.is_integer() && dest.is_integer() && src.int_bits() > dest.int_bits())
                    || (src.is_float() && dest.is_float() && float_width(src) > float_width(dest))
            }
            CastOp::Ext => {
                (src.is_integer() && dest.is_integer() && src.int_bits() < dest.int_bits())
                    || (src.is_float() && dest.is_float() && float_width(src) < float_width(dest))
            }
            CastOp::Bitcast => {
                (src.is_integer() && dest.is_integer() && src.int_bits() == dest.int_bits())
                    || (src.is_pointer() && dest.is_pointer())
            }
            CastOp::Itof => src.is_integer() && dest.is_float(),
            CastOp::Ftoi => src.is_float() && dest.is_integer(),
            CastOp::Ptoi => src.is_pointer() && dest.is_integer(),
            CastOp::Itop => src.is_integer() && dest.is_pointer(),
        };
        if ok {
            Ok(())
        } else {
            Err(Self::mismatch(
                index,
                format!("{op:?} from `{src}` to `{dest}`"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crust_ast::StringInterner;
    use crust_ir::{IrConst, IrVar};

    fn test_fn(interner: &StringInterner, body: Vec<Inst>) -> IrFunction {
        IrFunction {
            name: interner.intern("f"),
            ty: IrType::Function {
                ret: Box::new(IrType::I32),
                params: Vec::new(),
                variadic: false,
            },
            params: Vec::new(),
            is_variadic: false,
            body,
        }
    }

    fn module() -> Module {
        Module::new("test", "x86_64")
    }

    #[test]
    fn minimal_function_validates() {
        let interner = StringInterner::new();
        let func = test_fn(
            &interner,
            vec![Inst::Ret { value: Some(IrConst::int(0, IrType::I32).into()) }],
        );
        assert!(validate_function(&func, &module()).is_ok());
    }

    #[test]
    fn use_before_def_rejected() {
        let interner = StringInterner::new();
        let ghost = IrVar::new(interner.intern("ghost"), IrType::I32);
        let func = test_fn(&interner, vec![Inst::Ret { value: Some(ghost.into()) }]);
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::UseBeforeDef { .. })
        ));
    }

    #[test]
    fn unknown_branch_target_rejected() {
        let interner = StringInterner::new();
        let func = test_fn(
            &interner,
            vec![Inst::Br { target: interner.intern("nowhere") }],
        );
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn return_type_mismatch_rejected() {
        let interner = StringInterner::new();
        let func = test_fn(
            &interner,
            vec![Inst::Ret { value: Some(IrConst::int(0, IrType::I64).into()) }],
        );
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn missing_terminator_rejected() {
        let interner = StringInterner::new();
        let x = IrVar::new(interner.intern("x"), IrType::I32);
        let func = test_fn(
            &interner,
            vec![Inst::Assign { dest: x, value: IrConst::int(1, IrType::I32).into() }],
        );
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::MissingTerminator { .. })
        ));
    }

    #[test]
    fn stray_instruction_after_terminator_rejected() {
        let interner = StringInterner::new();
        let func = test_fn(
            &interner,
            vec![
                Inst::Ret { value: Some(IrConst::int(0, IrType::I32).into()) },
                Inst::Ret { value: Some(IrConst::int(1, IrType::I32).into()) },
            ],
        );
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::StrayInstruction { .. })
        ));
    }

    #[test]
    fn bad_cast_shape_rejected() {
        let interner = StringInterner::new();
        let dest = IrVar::new(interner.intern("t0"), IrType::I64);
        let func = test_fn(
            &interner,
            vec![
                Inst::Cast {
                    op: CastOp::Trunc,
                    dest,
                    operand: IrConst::int(0, IrType::I32).into(),
                },
                Inst::Ret { value: Some(IrConst::int(0, IrType::I32).into()) },
            ],
        );
        // Trunc must narrow; i32 → i64 is an extension.
        assert!(matches!(
            validate_function(&func, &module()),
            Err(ValidateError::TypeMismatch { .. })
        ));
    }
}

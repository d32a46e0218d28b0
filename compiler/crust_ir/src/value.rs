//! IR values: constants and typed variables.

use crust_ast::Name;

use crate::{IrType, TypeMap};

/// A named IR variable with its type.
#[derive(Clone, PartialEq, Debug)]
pub struct IrVar {
    pub name: Name,
    pub ty: IrType,
}

impl IrVar {
    pub fn new(name: Name, ty: IrType) -> Self {
        IrVar { name, ty }
    }
}

/// A compile-time constant.
///
/// Floats carry their bit pattern so constants stay `Eq`-comparable.
/// `GlobalAddr` is how a constant references another global (or an
/// anonymous string-literal global) by name; the module's globals are
/// topologically sorted over these references.
#[derive(Clone, PartialEq, Debug)]
pub enum IrConst {
    Int { value: i64, ty: IrType },
    Float { bits: u64, ty: IrType },
    /// An integer literal used at pointer type.
    PtrInt { value: u64, ty: IrType },
    Array { elems: Vec<IrConst>, ty: IrType },
    Record { fields: Vec<IrConst>, ty: IrType },
    Str { data: Vec<u8>, ty: IrType },
    GlobalAddr { name: Name, ty: IrType },
}

impl IrConst {
    pub fn int(value: i64, ty: IrType) -> Self {
        IrConst::Int { value, ty }
    }

    pub fn float(value: f64, ty: IrType) -> Self {
        IrConst::Float { bits: value.to_bits(), ty }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self {
            IrConst::Float { bits, .. } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match self {
            IrConst::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn ty(&self) -> &IrType {
        match self {
            IrConst::Int { ty, .. }
            | IrConst::Float { ty, .. }
            | IrConst::PtrInt { ty, .. }
            | IrConst::Array { ty, .. }
            | IrConst::Record { ty, .. }
            | IrConst::Str { ty, .. }
            | IrConst::GlobalAddr { ty, .. } => ty,
        }
    }

    /// The zero value of a type, recursing into aggregates.
    pub fn zero(ty: &IrType, types: &TypeMap) -> IrConst {
        match ty {
            IrType::F32 | IrType::F64 | IrType::F80 => IrConst::Float { bits: 0, ty: ty.clone() },
            IrType::Ptr(_) => IrConst::PtrInt { value: 0, ty: ty.clone() },
            IrType::Array { elem, len } => {
                let elems = (0..*len).map(|_| IrConst::zero(elem, types)).collect();
                IrConst::Array { elems, ty: ty.clone() }
            }
            IrType::Record(id) => {
                let layout = types.get(*id);
                let fields = layout
                    .fields
                    .iter()
                    .map(|f| IrConst::zero(&f.ty, types))
                    .collect();
                IrConst::Record { fields, ty: ty.clone() }
            }
            _ => IrConst::Int { value: 0, ty: ty.clone() },
        }
    }

    pub fn is_zero_int(&self) -> bool {
        matches!(self, IrConst::Int { value: 0, .. })
    }
}

/// An IR operand: constant or variable.
#[derive(Clone, PartialEq, Debug)]
pub enum IrValue {
    Const(IrConst),
    Var(IrVar),
}

impl IrValue {
    pub fn ty(&self) -> &IrType {
        match self {
            IrValue::Const(c) => c.ty(),
            IrValue::Var(v) => &v.ty,
        }
    }

    pub fn as_const(&self) -> Option<&IrConst> {
        match self {
            IrValue::Const(c) => Some(c),
            IrValue::Var(_) => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, IrValue::Const(_))
    }
}

impl From<IrConst> for IrValue {
    fn from(c: IrConst) -> Self {
        IrValue::Const(c)
    }
}

impl From<IrVar> for IrValue {
    fn from(v: IrVar) -> Self {
        IrValue::Var(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_of_scalar_and_array() {
        let types = TypeMap::new();
        let z = IrConst::zero(&IrType::I32, &types);
        assert!(z.is_zero_int());

        let arr = IrType::Array { elem: Box::new(IrType::I32), len: 3 };
        match IrConst::zero(&arr, &types) {
            IrConst::Array { elems, .. } => {
                assert_eq!(elems.len(), 3);
                assert!(elems.iter().all(IrConst::is_zero_int));
            }
            other => panic!("expected array zero, got {other:?}"),
        }
    }

    #[test]
    fn float_bits_round_trip() {
        let c = IrConst::float(1.5, IrType::F64);
        assert_eq!(c.float_value(), Some(1.5));
    }
}

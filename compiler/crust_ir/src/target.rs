//! Target description.
//!
//! The architecture record supplies the IR type for every C integer and
//! floating rank plus a pointer-sized integer, and the size/alignment
//! rules struct layout depends on. The semantic core never hard-codes a
//! width outside this record.

use crust_ast::types::{FloatRank, IntRank};

use crate::{IrType, TypeMap};

/// Architecture record consumed by the semantic core.
#[derive(Clone, Debug)]
pub struct Target {
    pub name: &'static str,

    // IR type per signed/unsigned integer rank.
    pub bool_ty: IrType,
    pub schar: IrType,
    pub uchar: IrType,
    pub sshort: IrType,
    pub ushort: IrType,
    pub sint: IrType,
    pub uint: IrType,
    pub slong: IrType,
    pub ulong: IrType,
    pub slonglong: IrType,
    pub ulonglong: IrType,

    // IR type per floating rank.
    pub float_ty: IrType,
    pub double_ty: IrType,
    pub long_double_ty: IrType,

    /// Pointer-sized signed integer (`ptrdiff_t`); `size_t` is its
    /// unsigned counterpart.
    pub ptr_int: IrType,
}

impl Target {
    /// The SysV x86-64 target.
    pub fn x86_64() -> Self {
        Target {
            name: "x86_64",
            bool_ty: IrType::I1,
            schar: IrType::I8,
            uchar: IrType::U8,
            sshort: IrType::I16,
            ushort: IrType::U16,
            sint: IrType::I32,
            uint: IrType::U32,
            slong: IrType::I64,
            ulong: IrType::U64,
            slonglong: IrType::I64,
            ulonglong: IrType::U64,
            float_ty: IrType::F32,
            double_ty: IrType::F64,
            long_double_ty: IrType::F80,
            ptr_int: IrType::I64,
        }
    }

    /// IR type of an integer rank with the given signedness.
    pub fn int_type(&self, rank: IntRank, signed: bool) -> IrType {
        match (rank, signed) {
            (IntRank::Bool, _) => self.bool_ty.clone(),
            (IntRank::Char, true) => self.schar.clone(),
            (IntRank::Char, false) => self.uchar.clone(),
            (IntRank::Short, true) => self.sshort.clone(),
            (IntRank::Short, false) => self.ushort.clone(),
            (IntRank::Int, true) => self.sint.clone(),
            (IntRank::Int, false) => self.uint.clone(),
            (IntRank::Long, true) => self.slong.clone(),
            (IntRank::Long, false) => self.ulong.clone(),
            (IntRank::LongLong, true) => self.slonglong.clone(),
            (IntRank::LongLong, false) => self.ulonglong.clone(),
        }
    }

    /// IR type of a floating rank.
    pub fn float_type(&self, rank: FloatRank) -> IrType {
        match rank {
            FloatRank::Float => self.float_ty.clone(),
            FloatRank::Double => self.double_ty.clone(),
            FloatRank::LongDouble => self.long_double_ty.clone(),
        }
    }

    /// `size_t`: the unsigned pointer-sized integer.
    pub fn size_type(&self) -> IrType {
        self.ptr_int.to_unsigned()
    }

    /// Size of a type in bytes.
    pub fn size_of(&self, ty: &IrType, types: &TypeMap) -> u64 {
        match ty {
            IrType::I1 | IrType::I8 | IrType::U8 => 1,
            IrType::I16 | IrType::U16 => 2,
            IrType::I32 | IrType::U32 | IrType::F32 => 4,
            IrType::I64 | IrType::U64 | IrType::F64 => 8,
            // Stored with full alignment padding on every supported target.
            IrType::F80 => 16,
            IrType::Ptr(_) | IrType::Function { .. } => self.size_of(&self.ptr_int, types),
            IrType::Array { elem, len } => self.size_of(elem, types) * len,
            IrType::Record(id) => types.get(*id).size,
            IrType::Void => 0,
        }
    }

    /// Alignment of a type in bytes.
    pub fn align_of(&self, ty: &IrType, types: &TypeMap) -> u64 {
        match ty {
            IrType::Array { elem, .. } => self.align_of(elem, types),
            IrType::Record(id) => types.get(*id).align,
            IrType::Void => 1,
            _ => self.size_of(ty, types),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_mapping() {
        let target = Target::x86_64();
        assert_eq!(target.int_type(IntRank::Int, true), IrType::I32);
        assert_eq!(target.int_type(IntRank::Int, false), IrType::U32);
        assert_eq!(target.int_type(IntRank::Bool, true), IrType::I1);
        assert_eq!(target.float_type(FloatRank::Double), IrType::F64);
        assert_eq!(target.size_type(), IrType::U64);
    }

    #[test]
    fn sizes_and_alignment() {
        let target = Target::x86_64();
        let types = TypeMap::new();

        assert_eq!(target.size_of(&IrType::I32, &types), 4);
        assert_eq!(target.size_of(&IrType::I8.ptr_to(), &types), 8);
        let arr = IrType::Array { elem: Box::new(IrType::I16), len: 5 };
        assert_eq!(target.size_of(&arr, &types), 10);
        assert_eq!(target.align_of(&arr, &types), 2);
    }
}

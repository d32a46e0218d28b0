//! IR types and record layouts.
//!
//! Scalar IR types encode signedness and width directly. Struct/union
//! types are referenced by [`RecordId`] into the module's [`TypeMap`];
//! the indirection keeps self-referential records (`struct Foo { struct
//! Foo *next; }`) representable — a forward-declared record holds a
//! placeholder layout that is patched in place once the body is resolved.

use std::fmt;

use crust_ast::Name;
use rustc_hash::FxHashMap;

/// Identity of a struct/union layout in the [`TypeMap`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordId(pub u32);

impl RecordId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// IR type variants.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum IrType {
    /// 1-bit integer with zero/nonzero semantics (`_Bool`, comparisons).
    I1,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    F80,
    Ptr(Box<IrType>),
    Array { elem: Box<IrType>, len: u64 },
    Record(RecordId),
    Function {
        ret: Box<IrType>,
        params: Vec<IrType>,
        variadic: bool,
    },
    Void,
}

impl IrType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            IrType::I1
                | IrType::I8
                | IrType::I16
                | IrType::I32
                | IrType::I64
                | IrType::U8
                | IrType::U16
                | IrType::U32
                | IrType::U64
        )
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            IrType::I1 | IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F32 | IrType::F64 | IrType::F80)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrType::Array { .. } | IrType::Record(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, IrType::Function { .. })
    }

    /// Bit width of an integer type; 0 for non-integers.
    pub fn int_bits(&self) -> u32 {
        match self {
            IrType::I1 => 1,
            IrType::I8 | IrType::U8 => 8,
            IrType::I16 | IrType::U16 => 16,
            IrType::I32 | IrType::U32 => 32,
            IrType::I64 | IrType::U64 => 64,
            _ => 0,
        }
    }

    /// The unsigned integer type of the same width.
    #[must_use]
    pub fn to_unsigned(&self) -> IrType {
        match self {
            IrType::I8 => IrType::U8,
            IrType::I16 => IrType::U16,
            IrType::I32 => IrType::U32,
            IrType::I64 => IrType::U64,
            other => other.clone(),
        }
    }

    /// Pointer to `self`.
    #[must_use]
    pub fn ptr_to(&self) -> IrType {
        IrType::Ptr(Box::new(self.clone()))
    }

    /// The pointee of a pointer type.
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::U8 => write!(f, "u8"),
            IrType::U16 => write!(f, "u16"),
            IrType::U32 => write!(f, "u32"),
            IrType::U64 => write!(f, "u64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::F80 => write!(f, "f80"),
            IrType::Ptr(inner) => write!(f, "{inner}*"),
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            IrType::Record(id) => write!(f, "%record.{}", id.0),
            IrType::Function { ret, params, variadic } => {
                write!(f, "{ret}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                if *variadic {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            IrType::Void => write!(f, "void"),
        }
    }
}

/// One member of a record layout, padding included.
#[derive(Clone, PartialEq, Debug)]
pub struct RecordField {
    pub name: Name,
    pub ty: IrType,
    /// Synthetic padding inserted by layout, invisible to field lookup.
    pub is_padding: bool,
}

/// Layout of one struct or union.
///
/// `fields` is the declared order with synthetic padding interleaved
/// (non-packed structs only). `field_index` maps declared field names to
/// indices in `fields`, skipping padding.
#[derive(Clone, PartialEq, Debug)]
pub struct RecordLayout {
    pub name: Name,
    pub fields: Vec<RecordField>,
    pub field_index: FxHashMap<Name, u32>,
    pub is_union: bool,
    pub size: u64,
    pub align: u64,
    /// False while only a forward declaration has been seen.
    pub complete: bool,
}

impl RecordLayout {
    /// Placeholder layout for a forward-declared record.
    pub fn incomplete(name: Name, is_union: bool) -> Self {
        RecordLayout {
            name,
            fields: Vec::new(),
            field_index: FxHashMap::default(),
            is_union,
            size: 0,
            align: 1,
            complete: false,
        }
    }
}

/// Record layouts, indexed by [`RecordId`].
#[derive(Default, Debug)]
pub struct TypeMap {
    records: Vec<RecordLayout>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id with a placeholder layout.
    ///
    /// # Panics
    /// Panics if the map exceeds `u32::MAX` records.
    pub fn declare(&mut self, name: Name, is_union: bool) -> RecordId {
        let raw = u32::try_from(self.records.len())
            .unwrap_or_else(|_| panic!("type map exceeded {} records", u32::MAX));
        self.records.push(RecordLayout::incomplete(name, is_union));
        RecordId(raw)
    }

    /// Patch a placeholder with its computed layout.
    pub fn define(&mut self, id: RecordId, layout: RecordLayout) {
        self.records[id.index()] = layout;
    }

    pub fn get(&self, id: RecordId) -> &RecordLayout {
        &self.records[id.index()]
    }

    pub fn is_complete(&self, id: RecordId) -> bool {
        self.records[id.index()].complete
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_define() {
        let mut map = TypeMap::new();
        let id = map.declare(Name::EMPTY, false);
        assert!(!map.is_complete(id));

        let mut layout = RecordLayout::incomplete(Name::EMPTY, false);
        layout.complete = true;
        layout.size = 8;
        map.define(id, layout);

        assert!(map.is_complete(id));
        assert_eq!(map.get(id).size, 8);
    }

    #[test]
    fn unsigned_of_signed() {
        assert_eq!(IrType::I32.to_unsigned(), IrType::U32);
        assert_eq!(IrType::U32.to_unsigned(), IrType::U32);
        assert_eq!(IrType::F64.to_unsigned(), IrType::F64);
    }

    #[test]
    fn type_display() {
        assert_eq!(IrType::I32.to_string(), "i32");
        assert_eq!(IrType::I8.ptr_to().to_string(), "i8*");
        let arr = IrType::Array { elem: Box::new(IrType::I32), len: 4 };
        assert_eq!(arr.to_string(), "[4 x i32]");
    }
}

//! The C type tree.
//!
//! Types arrive from the parser with typedefs already substituted. A
//! [`CType`] is a cheaply-clonable handle: the kind is behind an `Rc`,
//! qualifiers and storage class ride alongside it so `const int` and `int`
//! share one kind node.
//!
//! Struct/union and enum types may arrive *incomplete* (a tag with no
//! body). The semantic core resolves them against the scoped tag
//! environment and snapshots the binding into [`RecordType::uid`] /
//! [`EnumType::uid`]; an unset uid means "not yet resolved".

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::{ExprId, Name, Token};

bitflags! {
    /// C type qualifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

/// Storage class of a declaration.
///
/// `Typedef` reaches the core only as a no-op: the parser substitutes
/// typedef-names before the core ever sees them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub enum StorageClass {
    #[default]
    None,
    Auto,
    Register,
    Static,
    Extern,
    Typedef,
}

/// Integer conversion rank, ordered per C99 §6.3.1.1.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub enum IntRank {
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

/// Floating-point rank, ordered by conversion precedence.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub enum FloatRank {
    Float,
    Double,
    LongDouble,
}

/// Identity of a resolved struct/union/enum tag.
///
/// Assigned by the semantic core; unique across all scopes, so two
/// same-named tags in different scopes get distinct uids.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct TagUid(pub u32);

/// Array extent.
///
/// The parser produces `None` (incomplete) or `Expr`; the semantic core
/// evaluates size expressions and retrofits inferred lengths as `Fixed`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ArraySize {
    /// No size given: parameter decay or inferred-length initializer.
    None,
    /// A constant expression to be evaluated.
    Expr(ExprId),
    /// A resolved element count.
    Fixed(u64),
}

/// One named member of a struct or union.
#[derive(Clone, PartialEq, Debug)]
pub struct Field {
    pub name: Token,
    pub ty: CType,
}

/// A struct or union type.
///
/// `fields: None` means the body has not been seen (forward declaration).
#[derive(Clone, PartialEq, Debug)]
pub struct RecordType {
    pub tag: Option<Token>,
    pub uid: Option<TagUid>,
    pub fields: Option<Vec<Field>>,
    pub is_union: bool,
    pub packed: bool,
}

/// One enumerator, with an optional constant-expression initializer.
#[derive(Clone, PartialEq, Debug)]
pub struct Enumerator {
    pub name: Token,
    pub value: Option<ExprId>,
}

/// An enumerated type. `enumerators: None` means no body was seen.
#[derive(Clone, PartialEq, Debug)]
pub struct EnumType {
    pub tag: Option<Token>,
    pub uid: Option<TagUid>,
    pub enumerators: Option<Vec<Enumerator>>,
}

/// One function parameter.
#[derive(Clone, PartialEq, Debug)]
pub struct Param {
    pub name: Option<Token>,
    pub ty: CType,
}

/// The C type variants.
#[derive(Clone, PartialEq, Debug)]
pub enum TypeKind {
    Void,
    Int { rank: IntRank, signed: bool },
    Float(FloatRank),
    Pointer(CType),
    Array { elem: CType, size: ArraySize },
    Function { ret: CType, params: Vec<Param>, variadic: bool },
    Record(RecordType),
    Enum(EnumType),
    /// Compiler-provided builtin type, referenced by name.
    Builtin(Name),
}

/// A C type: shared kind plus qualifiers and storage class.
#[derive(Clone, PartialEq, Debug)]
pub struct CType {
    pub kind: Rc<TypeKind>,
    pub quals: Qualifiers,
    pub storage: StorageClass,
}

impl CType {
    pub fn new(kind: TypeKind) -> Self {
        CType {
            kind: Rc::new(kind),
            quals: Qualifiers::empty(),
            storage: StorageClass::None,
        }
    }

    // Convenience constructors for the common scalar types.

    pub fn void() -> Self {
        CType::new(TypeKind::Void)
    }

    pub fn bool_() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Bool, signed: false })
    }

    pub fn char_() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Char, signed: true })
    }

    pub fn int() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Int, signed: true })
    }

    pub fn uint() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Int, signed: false })
    }

    pub fn long() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Long, signed: true })
    }

    pub fn ulong() -> Self {
        CType::new(TypeKind::Int { rank: IntRank::Long, signed: false })
    }

    pub fn signed(rank: IntRank) -> Self {
        CType::new(TypeKind::Int { rank, signed: true })
    }

    pub fn unsigned(rank: IntRank) -> Self {
        CType::new(TypeKind::Int { rank, signed: false })
    }

    pub fn float(rank: FloatRank) -> Self {
        CType::new(TypeKind::Float(rank))
    }

    pub fn double() -> Self {
        CType::new(TypeKind::Float(FloatRank::Double))
    }

    /// Pointer to `self`.
    #[must_use]
    pub fn pointer_to(&self) -> Self {
        CType::new(TypeKind::Pointer(self.clone()))
    }

    /// Array of `self` with the given extent.
    #[must_use]
    pub fn array_of(&self, size: ArraySize) -> Self {
        CType::new(TypeKind::Array { elem: self.clone(), size })
    }

    /// Same type with qualifiers added.
    #[must_use]
    pub fn with_quals(mut self, quals: Qualifiers) -> Self {
        self.quals |= quals;
        self
    }

    /// Same type with a storage class.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageClass) -> Self {
        self.storage = storage;
        self
    }

    // Classification predicates.

    pub fn is_void(&self) -> bool {
        matches!(*self.kind, TypeKind::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(*self.kind, TypeKind::Int { .. } | TypeKind::Enum(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(*self.kind, TypeKind::Int { rank: IntRank::Bool, .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(*self.kind, TypeKind::Float(_))
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(*self.kind, TypeKind::Pointer(_))
    }

    /// Scalar types: arithmetic or pointer.
    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_array(&self) -> bool {
        matches!(*self.kind, TypeKind::Array { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(*self.kind, TypeKind::Function { .. })
    }

    pub fn is_record(&self) -> bool {
        matches!(*self.kind, TypeKind::Record(_))
    }

    pub fn is_const(&self) -> bool {
        self.quals.contains(Qualifiers::CONST)
    }

    /// The pointee of a pointer type, if this is one.
    pub fn pointee(&self) -> Option<&CType> {
        match &*self.kind {
            TypeKind::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// The element type of an array, if this is one.
    pub fn array_elem(&self) -> Option<&CType> {
        match &*self.kind {
            TypeKind::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const() {
            write!(f, "const ")?;
        }
        match &*self.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Int { rank, signed } => {
                let base = match rank {
                    IntRank::Bool => "_Bool",
                    IntRank::Char => "char",
                    IntRank::Short => "short",
                    IntRank::Int => "int",
                    IntRank::Long => "long",
                    IntRank::LongLong => "long long",
                };
                if *signed || matches!(rank, IntRank::Bool) {
                    write!(f, "{base}")
                } else {
                    write!(f, "unsigned {base}")
                }
            }
            TypeKind::Float(rank) => match rank {
                FloatRank::Float => write!(f, "float"),
                FloatRank::Double => write!(f, "double"),
                FloatRank::LongDouble => write!(f, "long double"),
            },
            TypeKind::Pointer(inner) => write!(f, "{inner}*"),
            TypeKind::Array { elem, size } => match size {
                ArraySize::None => write!(f, "{elem}[]"),
                ArraySize::Expr(_) => write!(f, "{elem}[N]"),
                ArraySize::Fixed(n) => write!(f, "{elem}[{n}]"),
            },
            TypeKind::Function { ret, params, variadic } => {
                write!(f, "{ret}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                if *variadic {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            TypeKind::Record(rec) => {
                let kw = if rec.is_union { "union" } else { "struct" };
                match rec.uid {
                    Some(uid) => write!(f, "{kw} #{}", uid.0),
                    None => write!(f, "{kw}"),
                }
            }
            TypeKind::Enum(en) => match en.uid {
                Some(uid) => write!(f, "enum #{}", uid.0),
                None => write!(f, "enum"),
            },
            TypeKind::Builtin(_) => write!(f, "__builtin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_classification() {
        assert!(CType::int().is_scalar());
        assert!(CType::double().is_arithmetic());
        assert!(CType::int().pointer_to().is_scalar());
        assert!(!CType::void().is_scalar());
        assert!(!CType::int().array_of(ArraySize::None).is_scalar());
    }

    #[test]
    fn qualifier_flags() {
        let ty = CType::int().with_quals(Qualifiers::CONST);
        assert!(ty.is_const());
        assert!(!CType::int().is_const());
    }

    #[test]
    fn display_common_types() {
        assert_eq!(CType::int().to_string(), "int");
        assert_eq!(CType::uint().to_string(), "unsigned int");
        assert_eq!(CType::int().pointer_to().to_string(), "int*");
        assert_eq!(
            CType::int().with_quals(Qualifiers::CONST).to_string(),
            "const int"
        );
    }
}

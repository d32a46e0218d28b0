//! Type system operations.
//!
//! - [`Sema::resolve_type`] — snapshot scoped tag bindings into the type,
//!   declaring/completing tags as bodies appear
//! - [`Sema::ir_type_of`] — canonical C-type → IR-type mapping through the
//!   target record
//! - [`Sema::layout_record`] — struct/union layout with synthetic padding
//! - [`types_equal`] — structural equality modulo names
//! - [`Sema::usual_arith`] — C99 §6.3.1.8 usual arithmetic conversions
//! - [`Sema::convert`] — emit or fold `trunc`/`ext`/`bitcast`/`itof`/
//!   `ftoi`/`ptoi`/`itop`
//!
//! Conversions over constants fold without emitting instructions.

use crust_ast::types::{
    ArraySize, CType, EnumType, Field, FloatRank, IntRank, RecordType, TypeKind,
};
use crust_ast::{Name, Pos, Token};
use crust_diagnostic as diag;
use crust_ir::{BinOp, CastOp, Inst, IrConst, IrType, IrValue, RecordField, RecordId, RecordLayout};
use rustc_hash::FxHashMap;

use crate::context::Sema;
use crate::scope::{Symbol, SymbolKind};

/// Structural equality modulo names and qualifiers.
///
/// Records and enums compare by resolved tag uid; arrays compare element
/// types and extents.
pub fn types_equal(a: &CType, b: &CType) -> bool {
    match (&*a.kind, &*b.kind) {
        (TypeKind::Void, TypeKind::Void) => true,
        (
            TypeKind::Int { rank: ra, signed: sa },
            TypeKind::Int { rank: rb, signed: sb },
        ) => ra == rb && sa == sb,
        (TypeKind::Float(ra), TypeKind::Float(rb)) => ra == rb,
        (TypeKind::Pointer(pa), TypeKind::Pointer(pb)) => types_equal(pa, pb),
        (
            TypeKind::Array { elem: ea, size: sa },
            TypeKind::Array { elem: eb, size: sb },
        ) => types_equal(ea, eb) && sa == sb,
        (
            TypeKind::Function { ret: ra, params: pa, variadic: va },
            TypeKind::Function { ret: rb, params: pb, variadic: vb },
        ) => {
            types_equal(ra, rb)
                && va == vb
                && pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| types_equal(&x.ty, &y.ty))
        }
        (TypeKind::Record(ra), TypeKind::Record(rb)) => match (ra.uid, rb.uid) {
            (Some(ua), Some(ub)) => ua == ub,
            _ => false,
        },
        (TypeKind::Enum(ea), TypeKind::Enum(eb)) => match (ea.uid, eb.uid) {
            (Some(ua), Some(ub)) => ua == ub,
            _ => false,
        },
        (TypeKind::Builtin(na), TypeKind::Builtin(nb)) => na == nb,
        _ => false,
    }
}

/// Integer rank and signedness of an integer-class type (enums included).
pub(crate) fn int_parts(ty: &CType) -> Option<(IntRank, bool)> {
    match &*ty.kind {
        TypeKind::Int { rank, signed } => Some((*rank, *signed)),
        TypeKind::Enum(_) => Some((IntRank::Int, true)),
        _ => None,
    }
}

impl Sema<'_> {
    // Resolution

    /// Resolve scoped tag references in a type.
    ///
    /// Walks pointers, arrays, and function types; for records and enums
    /// the currently-in-scope tag binding is snapshotted into the type's
    /// uid. A body declares (or completes) the tag in the current scope;
    /// a bodiless reference to an unknown tag forward-declares it. Array
    /// size expressions are evaluated to fixed extents here.
    ///
    /// Resolution at declaration point is what keeps an inner scope's
    /// shadowing tag from capturing an outer struct's field types.
    pub(crate) fn resolve_type(&mut self, ty: &CType, pos: Pos) -> CType {
        let mut resolved = match &*ty.kind {
            TypeKind::Pointer(p) => self.resolve_type(p, pos).pointer_to(),
            TypeKind::Array { elem, size } => {
                let elem = self.resolve_type(elem, pos);
                let size = match size {
                    ArraySize::Expr(e) => {
                        let e = *e;
                        match self.eval_const_int(e) {
                            Some(n) if n >= 0 => ArraySize::Fixed(n.unsigned_abs()),
                            Some(_) => ArraySize::Fixed(0),
                            None => {
                                let at = self.tu.exprs.pos(e);
                                self.report(diag::not_constant(at, "array size"));
                                ArraySize::Fixed(0)
                            }
                        }
                    }
                    other => *other,
                };
                elem.array_of(size)
            }
            TypeKind::Function { ret, params, variadic } => {
                let ret = self.resolve_type(ret, pos);
                let params = params
                    .iter()
                    .map(|p| crust_ast::types::Param {
                        name: p.name,
                        ty: self.decay_param(&p.ty, pos),
                    })
                    .collect();
                CType::new(TypeKind::Function { ret, params, variadic: *variadic })
            }
            TypeKind::Record(rec) => self.resolve_record(rec, pos),
            TypeKind::Enum(en) => self.resolve_enum(en, pos),
            _ => ty.clone(),
        };
        resolved.quals = ty.quals;
        resolved.storage = ty.storage;
        resolved
    }

    /// Parameter-type adjustment: arrays and functions decay to pointers.
    fn decay_param(&mut self, ty: &CType, pos: Pos) -> CType {
        let resolved = self.resolve_type(ty, pos);
        match &*resolved.kind {
            TypeKind::Array { elem, .. } => elem.pointer_to(),
            TypeKind::Function { .. } => resolved.pointer_to(),
            _ => resolved,
        }
    }

    fn resolve_record(&mut self, rec: &RecordType, pos: Pos) -> CType {
        if rec.uid.is_some() {
            return CType::new(TypeKind::Record(rec.clone()));
        }

        let (name, token) = match rec.tag {
            Some(tok) => (tok.text, Some(tok)),
            None => (self.fresh_anon("__anon_tag_"), None),
        };

        if let Some(fields) = &rec.fields {
            // Tag declaration with a body.
            let uid = match self.scopes.lookup_tag_local(name) {
                Some(existing) if self.scopes.tag(existing).cty.is_some() => {
                    // Both occurrences complete.
                    let previous = self.scopes.tag(existing).token.map_or(Pos::UNKNOWN, |t| t.pos);
                    let at = token.map_or(pos, |t| t.pos);
                    let text = self.interner.lookup(name);
                    self.report(diag::tag_redefinition(at, text, previous));
                    return self
                        .scopes
                        .tag(existing)
                        .cty
                        .clone()
                        .unwrap_or_else(CType::int);
                }
                Some(existing) => existing,
                None => {
                    let uid = self.scopes.new_tag(name, token);
                    self.scopes.bind_tag(name, uid);
                    uid
                }
            };

            // Pre-declare the layout slot so self-references resolve.
            let rid = match self.scopes.tag(uid).record {
                Some(rid) => rid,
                None => {
                    let rid = self.module.types.declare(name, rec.is_union);
                    self.scopes.tag_mut(uid).record = Some(rid);
                    rid
                }
            };

            // Field types are resolved at the declaration point.
            let fields: Vec<Field> = fields
                .iter()
                .map(|f| Field {
                    name: f.name,
                    ty: self.resolve_type(&f.ty, f.name.pos),
                })
                .collect();

            self.layout_record(rid, &fields, rec.is_union, rec.packed, name);

            let resolved = CType::new(TypeKind::Record(RecordType {
                tag: rec.tag,
                uid: Some(uid),
                fields: Some(fields),
                is_union: rec.is_union,
                packed: rec.packed,
            }));
            let tag = self.scopes.tag_mut(uid);
            tag.cty = Some(resolved.clone());
            tag.ir_type = Some(IrType::Record(rid));
            resolved
        } else {
            // Bodiless reference: bind to the visible tag, forward-declaring
            // if none exists.
            let uid = match self.scopes.lookup_tag(name) {
                Some(uid) => uid,
                None => {
                    let uid = self.scopes.new_tag(name, token);
                    self.scopes.bind_tag(name, uid);
                    let rid = self.module.types.declare(name, rec.is_union);
                    self.scopes.tag_mut(uid).record = Some(rid);
                    uid
                }
            };
            if let Some(complete) = self.scopes.tag(uid).cty.clone() {
                complete
            } else {
                CType::new(TypeKind::Record(RecordType {
                    tag: rec.tag,
                    uid: Some(uid),
                    fields: None,
                    is_union: rec.is_union,
                    packed: rec.packed,
                }))
            }
        }
    }

    fn resolve_enum(&mut self, en: &EnumType, pos: Pos) -> CType {
        if en.uid.is_some() {
            return CType::new(TypeKind::Enum(en.clone()));
        }

        let (name, token) = match en.tag {
            Some(tok) => (tok.text, Some(tok)),
            None => (self.fresh_anon("__anon_tag_"), None),
        };

        if let Some(enumerators) = &en.enumerators {
            let uid = match self.scopes.lookup_tag_local(name) {
                Some(existing) if self.scopes.tag(existing).cty.is_some() => {
                    let previous = self.scopes.tag(existing).token.map_or(Pos::UNKNOWN, |t| t.pos);
                    let at = token.map_or(pos, |t| t.pos);
                    let text = self.interner.lookup(name);
                    self.report(diag::tag_redefinition(at, text, previous));
                    return self
                        .scopes
                        .tag(existing)
                        .cty
                        .clone()
                        .unwrap_or_else(CType::int);
                }
                Some(existing) => existing,
                None => {
                    let uid = self.scopes.new_tag(name, token);
                    self.scopes.bind_tag(name, uid);
                    uid
                }
            };

            let resolved = CType::new(TypeKind::Enum(EnumType {
                tag: en.tag,
                uid: Some(uid),
                enumerators: Some(enumerators.clone()),
            }));

            self.register_enumerators(enumerators);

            let int_ir = self.target.sint.clone();
            let tag = self.scopes.tag_mut(uid);
            tag.cty = Some(resolved.clone());
            tag.ir_type = Some(int_ir);
            resolved
        } else {
            let uid = match self.scopes.lookup_tag(name) {
                Some(uid) => uid,
                None => {
                    let uid = self.scopes.new_tag(name, token);
                    self.scopes.bind_tag(name, uid);
                    uid
                }
            };
            if let Some(complete) = self.scopes.tag(uid).cty.clone() {
                complete
            } else {
                CType::new(TypeKind::Enum(EnumType {
                    tag: en.tag,
                    uid: Some(uid),
                    enumerators: None,
                }))
            }
        }
    }

    /// Declare each enumerator as a constant symbol: the previous value
    /// plus one, or its constant-expression value when present.
    fn register_enumerators(&mut self, enumerators: &[crust_ast::types::Enumerator]) {
        let mut next: i64 = 0;
        for e in enumerators {
            if let Some(value_expr) = e.value {
                match self.eval_const_int(value_expr) {
                    Some(v) => next = v,
                    None => {
                        let text = self.text(e.name).to_owned();
                        self.report(diag::enum_constant_not_integer(e.name.pos, &text));
                    }
                }
            }
            let cty = CType::int();
            let ir = self.target.sint.clone();
            let symbol = Symbol {
                token: e.name,
                external_name: e.name.text,
                kind: SymbolKind::EnumConst,
                cty,
                ir_type: ir.clone(),
                ir_ptr: crust_ir::IrVar::new(e.name.text, ir.clone()),
                const_value: Some(IrConst::int(next, ir)),
                alloca_id: None,
            };
            if let Err(previous) = self.scopes.declare(symbol) {
                let text = self.text(e.name).to_owned();
                self.report(diag::redefinition(e.name.pos, &text, previous.pos));
            }
            next = next.wrapping_add(1);
        }
    }

    // C type → IR type

    /// Canonical mapping from a resolved C type to its IR type.
    pub(crate) fn ir_type_of(&mut self, ty: &CType, pos: Pos) -> IrType {
        match &*ty.kind {
            TypeKind::Void => IrType::Void,
            TypeKind::Int { rank, signed } => self.target.int_type(*rank, *signed),
            TypeKind::Float(rank) => self.target.float_type(*rank),
            TypeKind::Enum(en) => {
                if en.uid.is_none() {
                    let resolved = self.resolve_type(ty, pos);
                    return self.ir_type_of(&resolved, pos);
                }
                self.target.sint.clone()
            }
            TypeKind::Pointer(p) => self.ir_type_of(p, pos).ptr_to(),
            TypeKind::Array { elem, size } => {
                let elem_ir = self.ir_type_of(elem, pos);
                let len = match size {
                    ArraySize::Fixed(n) => *n,
                    ArraySize::Expr(e) => {
                        let e = *e;
                        match self.eval_const_int(e) {
                            Some(n) if n >= 0 => n.unsigned_abs(),
                            _ => {
                                let at = self.tu.exprs.pos(e);
                                self.report(diag::not_constant(at, "array size"));
                                0
                            }
                        }
                    }
                    // Incomplete: parameter decay or inferred-length
                    // initializer patches this later.
                    ArraySize::None => 0,
                };
                IrType::Array { elem: Box::new(elem_ir), len }
            }
            TypeKind::Function { ret, params, variadic } => {
                let ret_ir = self.ir_type_of(ret, pos);
                let params_ir = params
                    .iter()
                    .map(|p| match &*p.ty.kind {
                        TypeKind::Array { elem, .. } => {
                            let e = self.ir_type_of(elem, pos);
                            e.ptr_to()
                        }
                        TypeKind::Function { .. } => self.ir_type_of(&p.ty, pos).ptr_to(),
                        _ => self.ir_type_of(&p.ty, pos),
                    })
                    .collect();
                IrType::Function {
                    ret: Box::new(ret_ir),
                    params: params_ir,
                    variadic: *variadic,
                }
            }
            TypeKind::Record(rec) => match rec.uid {
                Some(uid) => {
                    let rid = self
                        .scopes
                        .tag(uid)
                        .record
                        .unwrap_or_else(|| panic!("record tag without a layout slot"));
                    IrType::Record(rid)
                }
                None => {
                    let resolved = self.resolve_type(ty, pos);
                    self.ir_type_of(&resolved, pos)
                }
            },
            TypeKind::Builtin(_) => self.target.ptr_int.clone(),
        }
    }

    // Layout

    /// Compute a record's layout and patch it into the type map.
    ///
    /// Fields land in declared order; non-packed structs get synthetic
    /// `__pad<n>` byte-array fields so every field offset is a multiple
    /// of its target alignment, plus tail padding rounding the size up.
    /// Unions overlay members at offset zero and take the max size.
    pub(crate) fn layout_record(
        &mut self,
        rid: RecordId,
        fields: &[Field],
        is_union: bool,
        packed: bool,
        name: Name,
    ) {
        let mut out: Vec<RecordField> = Vec::with_capacity(fields.len());
        let mut field_index: FxHashMap<Name, u32> = FxHashMap::default();
        let mut offset: u64 = 0;
        let mut max_size: u64 = 0;
        let mut align: u64 = 1;
        let mut pad_n = 0u32;

        for field in fields {
            let fty = self.ir_type_of(&field.ty, field.name.pos);
            let fsize = self.target.size_of(&fty, &self.module.types);
            let falign = if packed {
                1
            } else {
                self.target.align_of(&fty, &self.module.types).max(1)
            };

            if !packed && !is_union {
                let misalign = offset % falign;
                if misalign != 0 {
                    let pad = falign - misalign;
                    let pad_name = self.interner.intern_owned(format!("__pad{pad_n}"));
                    pad_n += 1;
                    out.push(RecordField {
                        name: pad_name,
                        ty: IrType::Array { elem: Box::new(IrType::I8), len: pad },
                        is_padding: true,
                    });
                    offset += pad;
                }
            }

            let idx = u32::try_from(out.len())
                .unwrap_or_else(|_| panic!("record field count exceeded {}", u32::MAX));
            field_index.insert(field.name.text, idx);
            out.push(RecordField {
                name: field.name.text,
                ty: fty,
                is_padding: false,
            });

            if is_union {
                max_size = max_size.max(fsize);
            } else {
                offset += fsize;
            }
            align = align.max(falign);
        }

        let mut size = if is_union { max_size } else { offset };
        if !packed && !is_union && size % align != 0 {
            let pad = align - size % align;
            let pad_name = self.interner.intern_owned(format!("__pad{pad_n}"));
            out.push(RecordField {
                name: pad_name,
                ty: IrType::Array { elem: Box::new(IrType::I8), len: pad },
                is_padding: true,
            });
            size += pad;
        }

        self.module.types.define(
            rid,
            RecordLayout {
                name,
                fields: out,
                field_index,
                is_union,
                size,
                align,
                complete: true,
            },
        );
    }

    // Conversions

    /// Integer promotion: ranks below `int` (and enums) promote to `int`.
    pub(crate) fn promote(&self, ty: &CType) -> CType {
        if matches!(*ty.kind, TypeKind::Enum(_)) {
            return CType::int();
        }
        match int_parts(ty) {
            Some((rank, _)) if rank < IntRank::Int => CType::int(),
            Some((rank, signed)) => CType::new(TypeKind::Int { rank, signed }),
            None => ty.clone(),
        }
    }

    /// C99 §6.3.1.8: the common type of two arithmetic operands.
    pub(crate) fn usual_arith(&self, a: &CType, b: &CType) -> CType {
        if a.is_float() || b.is_float() {
            let ra = match &*a.kind {
                TypeKind::Float(r) => *r,
                _ => FloatRank::Float,
            };
            let rb = match &*b.kind {
                TypeKind::Float(r) => *r,
                _ => FloatRank::Float,
            };
            return CType::float(ra.max(rb));
        }

        let pa = self.promote(a);
        let pb = self.promote(b);
        let (ra, sa) = int_parts(&pa).unwrap_or((IntRank::Int, true));
        let (rb, sb) = int_parts(&pb).unwrap_or((IntRank::Int, true));

        if ra == rb && sa == sb {
            return pa;
        }
        if sa == sb {
            let rank = ra.max(rb);
            return CType::new(TypeKind::Int { rank, signed: sa });
        }

        // Mixed signedness.
        let (urank, srank) = if sa { (rb, ra) } else { (ra, rb) };
        let ubits = self.target.int_type(urank, false).int_bits();
        let sbits = self.target.int_type(srank, true).int_bits();
        if urank >= srank {
            CType::new(TypeKind::Int { rank: urank, signed: false })
        } else if sbits > ubits {
            CType::new(TypeKind::Int { rank: srank, signed: true })
        } else {
            CType::new(TypeKind::Int { rank: srank, signed: false })
        }
    }

    /// Convert a value between C types, emitting the required cast or
    /// folding it over constants. Returns `None` for disallowed
    /// conversions; the caller owns the diagnostic.
    pub(crate) fn convert(
        &mut self,
        value: IrValue,
        from: &CType,
        to: &CType,
        pos: Pos,
    ) -> Option<IrValue> {
        let from_ir = self.ir_type_of(from, pos);
        let to_ir = self.ir_type_of(to, pos);

        if from_ir == to_ir {
            return Some(value);
        }

        // `_Bool` targets get zero/nonzero semantics.
        if to.is_bool() {
            if !from.is_scalar() {
                return None;
            }
            return Some(self.boolify(&from_ir, value));
        }

        let from_int = int_parts(from).is_some();
        let from_signed = int_parts(from).is_some_and(|(_, s)| s);
        let to_int = int_parts(to).is_some();

        // Integer ↔ integer.
        if from_int && to_int {
            if let IrValue::Const(c) = &value {
                if let Some(v) = c.int_value() {
                    return Some(IrConst::int(fold_int(v, &to_ir), to_ir).into());
                }
            }
            let fb = from_ir.int_bits();
            let tb = to_ir.int_bits();
            let op = if fb == tb {
                CastOp::Bitcast
            } else if fb > tb {
                CastOp::Trunc
            } else {
                CastOp::Ext
            };
            return Some(self.emit_cast(op, value, to_ir));
        }

        // Integer → float.
        if from_int && to_ir.is_float() {
            if let IrValue::Const(c) = &value {
                if let Some(v) = c.int_value() {
                    #[expect(clippy::cast_precision_loss, reason = "C conversion semantics")]
                    #[expect(clippy::cast_sign_loss, reason = "unsigned source reinterpreted")]
                    let f = if from_signed { v as f64 } else { v as u64 as f64 };
                    return Some(IrConst::float(f, to_ir).into());
                }
            }
            return Some(self.emit_cast(CastOp::Itof, value, to_ir));
        }

        // Float → integer.
        if from_ir.is_float() && to_int {
            if let IrValue::Const(c) = &value {
                if let Some(f) = c.float_value() {
                    #[expect(clippy::cast_possible_truncation, reason = "C conversion semantics")]
                    let v = f as i64;
                    return Some(IrConst::int(fold_int(v, &to_ir), to_ir).into());
                }
            }
            return Some(self.emit_cast(CastOp::Ftoi, value, to_ir));
        }

        // Float ↔ float.
        if from_ir.is_float() && to_ir.is_float() {
            if let IrValue::Const(c) = &value {
                if let Some(f) = c.float_value() {
                    #[expect(clippy::cast_possible_truncation, reason = "narrowing rounds")]
                    let f = if to_ir == IrType::F32 { f64::from(f as f32) } else { f };
                    return Some(IrConst::float(f, to_ir).into());
                }
            }
            let fs = self.target.size_of(&from_ir, &self.module.types);
            let ts = self.target.size_of(&to_ir, &self.module.types);
            let op = if fs > ts { CastOp::Trunc } else { CastOp::Ext };
            return Some(self.emit_cast(op, value, to_ir));
        }

        // Pointer ↔ pointer.
        if from_ir.is_pointer() && to_ir.is_pointer() {
            match &value {
                IrValue::Const(IrConst::GlobalAddr { name, .. }) => {
                    return Some(IrConst::GlobalAddr { name: *name, ty: to_ir }.into());
                }
                IrValue::Const(IrConst::PtrInt { value: v, .. }) => {
                    return Some(IrConst::PtrInt { value: *v, ty: to_ir }.into());
                }
                _ => {}
            }
            return Some(self.emit_cast(CastOp::Bitcast, value, to_ir));
        }

        // Pointer → integer.
        if from_ir.is_pointer() && to_int {
            if let IrValue::Const(IrConst::PtrInt { value: v, .. }) = &value {
                #[expect(clippy::cast_possible_wrap, reason = "bit reinterpretation")]
                let v = *v as i64;
                return Some(IrConst::int(fold_int(v, &to_ir), to_ir).into());
            }
            return Some(self.emit_cast(CastOp::Ptoi, value, to_ir));
        }

        // Integer → pointer (the integer constant zero is the null pointer).
        if from_int && to_ir.is_pointer() {
            if let IrValue::Const(c) = &value {
                if let Some(v) = c.int_value() {
                    #[expect(clippy::cast_sign_loss, reason = "bit reinterpretation")]
                    return Some(IrConst::PtrInt { value: v as u64, ty: to_ir }.into());
                }
            }
            return Some(self.emit_cast(CastOp::Itop, value, to_ir));
        }

        None
    }

    fn emit_cast(&mut self, op: CastOp, operand: IrValue, to: IrType) -> IrValue {
        let dest = self.temp(to);
        self.emit(Inst::Cast { op, dest: dest.clone(), operand });
        dest.into()
    }

    /// Coerce a scalar to `i1` by comparing against zero. Folds constants.
    ///
    /// The operand's scalar-ness is the caller's obligation (each context
    /// carries its own diagnostic kind).
    pub(crate) fn boolify(&mut self, from_ir: &IrType, value: IrValue) -> IrValue {
        if *from_ir == IrType::I1 {
            return value;
        }
        if let IrValue::Const(c) = &value {
            let truth = match c {
                IrConst::Int { value, .. } => Some(*value != 0),
                IrConst::Float { bits, .. } => Some(f64::from_bits(*bits) != 0.0),
                IrConst::PtrInt { value, .. } => Some(*value != 0),
                IrConst::GlobalAddr { .. } => Some(true),
                _ => None,
            };
            if let Some(t) = truth {
                return IrConst::int(i64::from(t), IrType::I1).into();
            }
        }
        let zero = zero_of(from_ir);
        let dest = self.temp(IrType::I1);
        self.emit(Inst::Binary {
            op: BinOp::Ne,
            dest: dest.clone(),
            lhs: value,
            rhs: zero.into(),
        });
        dest.into()
    }

    // Derived C types for pointer arithmetic and `sizeof`.

    /// `ptrdiff_t`: the signed rank matching the target's pointer width.
    pub(crate) fn ptrdiff_ctype(&self) -> CType {
        let want = self.target.ptr_int.int_bits();
        for rank in [IntRank::Long, IntRank::LongLong, IntRank::Int] {
            if self.target.int_type(rank, true).int_bits() == want {
                return CType::signed(rank);
            }
        }
        CType::long()
    }

    /// `size_t`: the unsigned rank matching the target's pointer width.
    pub(crate) fn size_ctype(&self) -> CType {
        let want = self.target.ptr_int.int_bits();
        for rank in [IntRank::Long, IntRank::LongLong, IntRank::Int] {
            if self.target.int_type(rank, false).int_bits() == want {
                return CType::unsigned(rank);
            }
        }
        CType::ulong()
    }

    /// Size in bytes of a C type on the target.
    pub(crate) fn sizeof_ctype(&mut self, ty: &CType, pos: Pos) -> u64 {
        let ir = self.ir_type_of(ty, pos);
        self.target.size_of(&ir, &self.module.types)
    }

    /// Look up a record field: `(index into layout fields, field C type)`.
    pub(crate) fn record_field(&self, ty: &CType, field: Token) -> Option<(u32, CType)> {
        let TypeKind::Record(rec) = &*ty.kind else {
            return None;
        };
        let uid = rec.uid?;
        let tag = self.scopes.tag(uid);
        let rid = tag.record?;
        let idx = *self.module.types.get(rid).field_index.get(&field.text)?;

        // Field C types come from the tag's completed body.
        let complete = tag.cty.as_ref()?;
        let TypeKind::Record(complete_rec) = &*complete.kind else {
            return None;
        };
        let fields = complete_rec.fields.as_ref()?;
        let fcty = fields.iter().find(|f| f.name.text == field.text)?.ty.clone();
        Some((idx, fcty))
    }
}

/// Truncate/extend a constant to an integer IR type's width and
/// signedness.
pub(crate) fn fold_int(v: i64, ty: &IrType) -> i64 {
    let bits = ty.int_bits();
    if bits == 0 || bits >= 64 {
        return v;
    }
    if bits == 1 {
        return i64::from(v & 1 != 0);
    }
    let mask = (1i64 << bits) - 1;
    let low = v & mask;
    if ty.is_signed_integer() && (low >> (bits - 1)) & 1 == 1 {
        low | !mask
    } else {
        low
    }
}

/// The zero constant of a scalar IR type.
pub(crate) fn zero_of(ty: &IrType) -> IrConst {
    match ty {
        IrType::F32 | IrType::F64 | IrType::F80 => IrConst::Float { bits: 0, ty: ty.clone() },
        IrType::Ptr(_) => IrConst::PtrInt { value: 0, ty: ty.clone() },
        _ => IrConst::int(0, ty.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crust_ast::{StringInterner, TranslationUnit};
    use crust_ir::Target;
    use pretty_assertions::assert_eq;

    use crate::context::Sema;

    fn with_sema<R>(f: impl FnOnce(&mut Sema) -> R) -> R {
        let tu = TranslationUnit::new();
        let target = Target::x86_64();
        let interner = StringInterner::new();
        let mut sema = Sema::new(&tu, &target, "test", &interner);
        f(&mut sema)
    }

    #[test]
    fn small_ranks_promote_to_int() {
        with_sema(|sema| {
            assert!(types_equal(&sema.promote(&CType::char_()), &CType::int()));
            assert!(types_equal(&sema.promote(&CType::bool_()), &CType::int()));
            assert!(types_equal(&sema.promote(&CType::uint()), &CType::uint()));
        });
    }

    #[test]
    fn usual_arithmetic_conversions() {
        with_sema(|sema| {
            // Both small: promoted to int.
            let t = sema.usual_arith(&CType::char_(), &CType::char_());
            assert!(types_equal(&t, &CType::int()));

            // Same rank, mixed signedness: unsigned wins.
            let t = sema.usual_arith(&CType::int(), &CType::uint());
            assert!(types_equal(&t, &CType::uint()));

            // Wider signed absorbs narrower unsigned.
            let t = sema.usual_arith(&CType::uint(), &CType::long());
            assert!(types_equal(&t, &CType::long()));

            // Unsigned of higher rank wins over signed.
            let t = sema.usual_arith(&CType::ulong(), &CType::int());
            assert!(types_equal(&t, &CType::ulong()));

            // Any float dominates.
            let t = sema.usual_arith(&CType::int(), &CType::double());
            assert!(types_equal(&t, &CType::double()));
        });
    }

    #[test]
    fn constant_conversions_emit_nothing() {
        with_sema(|sema| {
            let v = IrValue::Const(IrConst::int(7, IrType::I32));
            let out = sema
                .convert(v, &CType::int(), &CType::long(), Pos::UNKNOWN)
                .expect("int to long");
            assert_eq!(out, IrValue::Const(IrConst::int(7, IrType::I64)));
            assert!(sema.stream.is_empty());

            let v = IrValue::Const(IrConst::int(5, IrType::I32));
            let out = sema
                .convert(v, &CType::int(), &CType::bool_(), Pos::UNKNOWN)
                .expect("int to bool");
            assert_eq!(out, IrValue::Const(IrConst::int(1, IrType::I1)));
            assert!(sema.stream.is_empty());
        });
    }

    #[test]
    fn disallowed_conversions_are_rejected() {
        with_sema(|sema| {
            let v = IrValue::Const(IrConst::float(1.0, IrType::F64));
            let out = sema.convert(
                v,
                &CType::double(),
                &CType::int().pointer_to(),
                Pos::UNKNOWN,
            );
            assert!(out.is_none());
        });
    }

    #[test]
    fn fold_int_masks_and_sign_extends() {
        assert_eq!(fold_int(300, &IrType::I8), 44);
        assert_eq!(fold_int(-1, &IrType::U8), 255);
        assert_eq!(fold_int(128, &IrType::I8), -128);
        assert_eq!(fold_int(-1, &IrType::I64), -1);
    }

    #[test]
    fn union_layout_takes_max_size() {
        with_sema(|sema| {
            let rid = sema.module.types.declare(crust_ast::Name::EMPTY, true);
            let interner = sema.interner;
            let fields = vec![
                Field {
                    name: crust_ast::Token::new(interner.intern("a"), Pos::UNKNOWN),
                    ty: CType::int(),
                },
                Field {
                    name: crust_ast::Token::new(interner.intern("b"), Pos::UNKNOWN),
                    ty: CType::char_(),
                },
            ];
            sema.layout_record(rid, &fields, true, false, crust_ast::Name::EMPTY);

            let layout = sema.module.types.get(rid);
            assert!(layout.complete);
            assert!(layout.is_union);
            assert_eq!(layout.size, 4);
            assert_eq!(layout.align, 4);
            assert_eq!(layout.fields.len(), 2);
        });
    }
}

//! Initializer lowering.
//!
//! One recursive walk serves both worlds: it produces a
//! constant-aggregate value whenever every sub-initializer folds, and
//! (for locals) emits the stores. The walk first builds a *slot tree*
//! mirroring the object's shape — designators move the running cursor,
//! untouched slots zero-fill — then either stores the folded aggregate
//! once or stores a zero/constant base followed by the runtime elements.
//!
//! Globals run the same walk against a scratch stream; anything that
//! fails to fold is reported as a non-constant global initializer by the
//! caller.

use crust_ast::types::{ArraySize, CType, TypeKind};
use crust_ast::{Designator, ExprKind, InitItem, Initializer, Pos};
use crust_diagnostic as diag;
use crust_ir::{Inst, IrConst, IrType, IrValue};

use crate::context::Sema;

/// One initialized position in an object.
pub(crate) enum Slot {
    /// Never written; zero-fills.
    Untouched,
    Scalar(IrConst),
    Runtime(IrValue),
    Agg(Box<AggSlots>),
    /// A sub-initializer was diagnosed.
    Error,
}

/// Slot tree of an aggregate, one entry per IR-level field/element
/// (record padding fields stay untouched).
pub(crate) struct AggSlots {
    pub cty: CType,
    pub slots: Vec<Slot>,
}

/// Outcome of lowering one initializer.
pub(crate) enum InitOutcome {
    /// Fully constant; the aggregate (or scalar) value.
    Constant(IrConst),
    /// Stores were emitted; not expressible as a constant.
    Runtime,
    /// A diagnostic was already reported.
    Error,
}

impl Slot {
    fn has_error(&self) -> bool {
        match self {
            Slot::Error => true,
            Slot::Agg(agg) => agg.slots.iter().any(Slot::has_error),
            _ => false,
        }
    }

    fn is_constant(&self) -> bool {
        match self {
            Slot::Untouched | Slot::Scalar(_) => true,
            Slot::Agg(agg) => agg.slots.iter().all(Slot::is_constant),
            Slot::Runtime(_) | Slot::Error => false,
        }
    }
}

impl Sema<'_> {
    /// Lower an initializer for a local object at `dest`.
    pub(crate) fn lower_local_init(
        &mut self,
        dest: &IrValue,
        cty: &CType,
        init: &Initializer,
        pos: Pos,
    ) -> InitOutcome {
        let slot = self.build_slot(cty, init, pos);
        if slot.has_error() {
            return InitOutcome::Error;
        }
        match slot {
            Slot::Scalar(c) => {
                self.emit(Inst::Store { addr: dest.clone(), value: c.clone().into() });
                InitOutcome::Constant(c)
            }
            Slot::Runtime(v) => {
                self.emit(Inst::Store { addr: dest.clone(), value: v });
                InitOutcome::Runtime
            }
            Slot::Agg(agg) => {
                if agg.slots.iter().all(Slot::is_constant) {
                    // Fast path: one store of the folded aggregate.
                    let value = self.agg_to_const(&agg, true);
                    self.emit(Inst::Store { addr: dest.clone(), value: value.clone().into() });
                    InitOutcome::Constant(value)
                } else {
                    // Store the zero/constant base, then the runtime slots.
                    let base = self.agg_to_const(&agg, false);
                    self.emit(Inst::Store { addr: dest.clone(), value: base.into() });
                    self.emit_runtime_stores(dest, &agg);
                    InitOutcome::Runtime
                }
            }
            Slot::Untouched | Slot::Error => InitOutcome::Error,
        }
    }

    /// Lower a global initializer, which must fold to a constant.
    ///
    /// Runs against a scratch stream; leaf expressions with side effects
    /// simply fail to fold.
    pub(crate) fn lower_global_init(
        &mut self,
        cty: &CType,
        init: &Initializer,
        pos: Pos,
    ) -> InitOutcome {
        let saved = std::mem::take(&mut self.stream);
        let slot = self.build_slot(cty, init, pos);
        let scratch = std::mem::replace(&mut self.stream, saved);

        if slot.has_error() {
            return InitOutcome::Error;
        }
        // Anything that needed instructions — side effects included —
        // is not a constant expression.
        if !scratch.is_empty() {
            return InitOutcome::Runtime;
        }
        match slot {
            Slot::Scalar(c) => InitOutcome::Constant(c),
            Slot::Agg(agg) if agg.slots.iter().all(Slot::is_constant) => {
                InitOutcome::Constant(self.agg_to_const(&agg, true))
            }
            _ => InitOutcome::Runtime,
        }
    }

    /// Walk an initializer, computing the inferred length of an
    /// incomplete array: the maximum index reached plus one.
    pub(crate) fn infer_array_len(&mut self, init: &Initializer) -> u64 {
        match init {
            Initializer::Expr(e) => {
                if let ExprKind::StrLit(tok) = self.tu.exprs.kind(*e).clone() {
                    self.string_bytes(tok).len() as u64 + 1
                } else {
                    1
                }
            }
            Initializer::List(items) => {
                let mut idx: u64 = 0;
                let mut max: u64 = 0;
                for item in items {
                    if let Some(Designator::Index(e)) = item.designators.first() {
                        if let Some(n) = self.eval_const_int(*e) {
                            idx = n.max(0).unsigned_abs();
                        }
                    }
                    idx += 1;
                    max = max.max(idx);
                }
                max
            }
        }
    }

    // Slot tree construction

    fn build_slot(&mut self, cty: &CType, init: &Initializer, pos: Pos) -> Slot {
        match init {
            Initializer::Expr(e) => self.build_expr_slot(cty, *e, pos),
            Initializer::List(items) => match &*cty.kind {
                TypeKind::Array { elem, size } => {
                    let len = match size {
                        ArraySize::Fixed(n) => *n,
                        _ => self.infer_array_len(init),
                    };
                    let elem = elem.clone();
                    self.build_array_slots(cty, &elem, len, items, pos)
                }
                TypeKind::Record(_) => self.build_record_slots(cty, items, pos),
                // A braced scalar: `int x = {1};`. Extra elements are
                // excess.
                _ => {
                    if items.len() > 1 {
                        self.report(diag::excess_initializer(pos));
                    }
                    match items.first() {
                        Some(item) if item.designators.is_empty() => {
                            self.build_slot(cty, &item.init, pos)
                        }
                        _ => {
                            let name = String::new();
                            self.report(diag::invalid_initializer(pos, &name, cty, cty));
                            Slot::Error
                        }
                    }
                }
            },
        }
    }

    /// A single-expression initializer: scalar conversion, struct copy,
    /// or a string literal spelling out a `char` array.
    fn build_expr_slot(&mut self, cty: &CType, e: crust_ast::ExprId, pos: Pos) -> Slot {
        let res = self.lower_expr(e);

        // `char s[] = "...";` — the literal's bytes fill the array.
        if let TypeKind::Array { elem, size } = &*cty.kind {
            if elem.is_integer() && res.is_string {
                if let IrValue::Const(IrConst::GlobalAddr { name, .. }) = &res.value {
                    let stored = self.module.global(*name).map(|g| g.init.clone());
                    if let Some(IrConst::Str { mut data, .. }) = stored {
                        let len = match size {
                            ArraySize::Fixed(n) => *n,
                            _ => data.len() as u64,
                        };
                        if data.len() as u64 > len {
                            self.report(diag::excess_initializer(pos));
                        }
                        data.resize(len as usize, 0);
                        let elem_ir = self.ir_type_of(elem, pos);
                        let ty = IrType::Array { elem: Box::new(elem_ir), len };
                        return Slot::Scalar(IrConst::Str { data, ty });
                    }
                }
            }
        }

        let Some((ec, ev)) = self.rvalue(res) else {
            return Slot::Error;
        };

        if cty.is_record() {
            if crate::types::types_equal(cty, &ec) {
                return match ev {
                    IrValue::Const(c) => Slot::Scalar(c),
                    other => Slot::Runtime(other),
                };
            }
            let name = String::new();
            self.report(diag::invalid_initializer(pos, &name, cty, &ec));
            return Slot::Error;
        }
        if cty.is_array() {
            let name = String::new();
            self.report(diag::invalid_initializer(pos, &name, cty, &ec));
            return Slot::Error;
        }

        match self.convert(ev, &ec, cty, pos) {
            Some(IrValue::Const(c)) => Slot::Scalar(c),
            Some(other) => Slot::Runtime(other),
            None => {
                let name = String::new();
                self.report(diag::invalid_initializer(pos, &name, cty, &ec));
                Slot::Error
            }
        }
    }

    fn build_array_slots(
        &mut self,
        cty: &CType,
        elem: &CType,
        len: u64,
        items: &[InitItem],
        pos: Pos,
    ) -> Slot {
        let mut slots: Vec<Slot> = (0..len).map(|_| Slot::Untouched).collect();
        let mut idx: u64 = 0;

        for item in items {
            let mut rest: &[Designator] = &item.designators;
            if let Some(first) = rest.first() {
                match first {
                    Designator::Index(e) => {
                        match self.eval_const_int(*e) {
                            Some(n) if n >= 0 => idx = n.unsigned_abs(),
                            _ => {
                                let at = self.tu.exprs.pos(*e);
                                self.report(diag::not_constant(at, "array designator"));
                                continue;
                            }
                        }
                        rest = &rest[1..];
                    }
                    Designator::Field(tok) => {
                        let text = self.text(*tok).to_owned();
                        self.report(diag::invalid_field_reference(tok.pos, &text, cty));
                        continue;
                    }
                }
            }

            if idx >= len {
                // Excess elements beyond the known size are discarded.
                self.report(diag::excess_initializer(pos));
                idx += 1;
                continue;
            }

            let slot = self.build_item_slot(elem, rest, &item.init, pos);
            slots[idx as usize] = slot;
            idx += 1;
        }

        Slot::Agg(Box::new(AggSlots { cty: cty.clone(), slots }))
    }

    fn build_record_slots(&mut self, cty: &CType, items: &[InitItem], pos: Pos) -> Slot {
        let Some(shape) = self.record_shape(cty) else {
            let name = String::new();
            self.report(diag::invalid_initializer(pos, &name, cty, cty));
            return Slot::Error;
        };
        let (field_count, real_fields, is_union) = shape;

        let mut slots: Vec<Slot> = (0..field_count).map(|_| Slot::Untouched).collect();
        // Cursor over declared (non-padding) fields.
        let mut cursor: usize = 0;
        let mut initialized_any = false;

        for item in items {
            let mut rest: &[Designator] = &item.designators;
            if let Some(first) = rest.first() {
                match first {
                    Designator::Field(tok) => {
                        match real_fields.iter().position(|(_, name, _)| *name == tok.text) {
                            Some(i) => cursor = i,
                            None => {
                                let text = self.text(*tok).to_owned();
                                self.report(diag::invalid_field_reference(tok.pos, &text, cty));
                                continue;
                            }
                        }
                        rest = &rest[1..];
                    }
                    Designator::Index(e) => {
                        let at = self.tu.exprs.pos(*e);
                        let text = "[...]".to_owned();
                        self.report(diag::invalid_field_reference(at, &text, cty));
                        continue;
                    }
                }
            }

            if cursor >= real_fields.len() || (is_union && initialized_any) {
                self.report(diag::excess_initializer(pos));
                continue;
            }

            let (layout_idx, _, fcty) = &real_fields[cursor];
            let fcty = fcty.clone();
            let slot = self.build_item_slot(&fcty, rest, &item.init, pos);
            slots[*layout_idx as usize] = slot;
            initialized_any = true;
            cursor += 1;
        }

        Slot::Agg(Box::new(AggSlots { cty: cty.clone(), slots }))
    }

    /// Build one item's slot, recursing through any remaining designator
    /// steps by synthesizing a single-element list with the first step
    /// stripped.
    fn build_item_slot(
        &mut self,
        cty: &CType,
        rest: &[Designator],
        init: &Initializer,
        pos: Pos,
    ) -> Slot {
        if rest.is_empty() {
            self.build_slot(cty, init, pos)
        } else {
            let synthesized = Initializer::List(vec![InitItem {
                designators: rest.to_vec(),
                init: init.clone(),
            }]);
            self.build_slot(cty, &synthesized, pos)
        }
    }

    /// Shape of a record for initialization: total layout field count
    /// and the declared fields as `(layout index, name, c type)`.
    #[expect(clippy::type_complexity, reason = "internal shape tuple")]
    fn record_shape(
        &self,
        cty: &CType,
    ) -> Option<(usize, Vec<(u32, crust_ast::Name, CType)>, bool)> {
        let TypeKind::Record(rec) = &*cty.kind else {
            return None;
        };
        let uid = rec.uid?;
        let tag = self.scopes.tag(uid);
        let rid = tag.record?;
        let layout = self.module.types.get(rid);
        let complete = tag.cty.as_ref()?;
        let TypeKind::Record(complete_rec) = &*complete.kind else {
            return None;
        };
        let fields = complete_rec.fields.as_ref()?;

        let mut real = Vec::with_capacity(fields.len());
        for f in fields {
            let idx = *layout.field_index.get(&f.name.text)?;
            real.push((idx, f.name.text, f.ty.clone()));
        }
        Some((layout.fields.len(), real, layout.is_union))
    }

    // Constant synthesis and runtime stores

    /// Fold a slot tree into a constant aggregate. With
    /// `strict` unset, runtime slots contribute zeros (the base value
    /// stored before the runtime elements overwrite their slots).
    fn agg_to_const(&mut self, agg: &AggSlots, strict: bool) -> IrConst {
        let ty = self.ir_type_of(&agg.cty, Pos::UNKNOWN);
        let elem_types: Vec<IrType> = match &ty {
            IrType::Array { elem, len } => (0..*len).map(|_| (**elem).clone()).collect(),
            IrType::Record(rid) => self
                .module
                .types
                .get(*rid)
                .fields
                .iter()
                .map(|f| f.ty.clone())
                .collect(),
            other => panic!("aggregate initializer for non-aggregate `{other}`"),
        };

        let values: Vec<IrConst> = agg
            .slots
            .iter()
            .zip(&elem_types)
            .map(|(slot, ety)| match slot {
                Slot::Untouched => IrConst::zero(ety, &self.module.types),
                Slot::Scalar(c) => c.clone(),
                Slot::Agg(sub) => self.agg_to_const(sub, strict),
                Slot::Runtime(_) if !strict => IrConst::zero(ety, &self.module.types),
                Slot::Runtime(_) | Slot::Error => {
                    panic!("non-constant slot in constant aggregate")
                }
            })
            .collect();

        match &ty {
            IrType::Array { .. } => IrConst::Array { elems: values, ty: ty.clone() },
            IrType::Record(_) => IrConst::Record { fields: values, ty: ty.clone() },
            _ => unreachable!(),
        }
    }

    /// Store every runtime slot through an element/member pointer chain.
    fn emit_runtime_stores(&mut self, dest: &IrValue, agg: &AggSlots) {
        let is_array = agg.cty.is_array();
        for (i, slot) in agg.slots.iter().enumerate() {
            let needs_store = match slot {
                Slot::Runtime(_) => true,
                Slot::Agg(sub) => !sub.slots.iter().all(Slot::is_constant),
                _ => false,
            };
            if !needs_store {
                continue;
            }

            #[expect(clippy::cast_possible_wrap, reason = "element counts fit i64")]
            let addr: IrValue = if is_array {
                let idx = IrConst::int(i as i64, self.target.ptr_int.clone());
                self.gep(dest.clone(), idx.into()).into()
            } else {
                let field = u32::try_from(i)
                    .unwrap_or_else(|_| panic!("record field count exceeded {}", u32::MAX));
                let member_ty = match dest.ty() {
                    IrType::Ptr(inner) => match &**inner {
                        IrType::Record(rid) => {
                            self.module.types.get(*rid).fields[i].ty.clone().ptr_to()
                        }
                        other => panic!("member store through non-record `{other}`"),
                    },
                    other => panic!("member store through non-pointer `{other}`"),
                };
                let dest_var = self.temp(member_ty);
                self.emit(Inst::GetMemberPtr {
                    dest: dest_var.clone(),
                    base: dest.clone(),
                    field,
                });
                dest_var.into()
            };

            match slot {
                Slot::Runtime(v) => {
                    self.emit(Inst::Store { addr, value: v.clone() });
                }
                Slot::Agg(sub) => self.emit_runtime_stores(&addr, sub),
                _ => unreachable!(),
            }
        }
    }
}

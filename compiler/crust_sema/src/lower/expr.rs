//! Expression lowering.
//!
//! The central `lower_expr` dispatch walks the expression arena and
//! produces [`ExprResult`]s: typed IR values that remember whether they
//! denote a location (l-value), a deferred dereference (indirection
//! chain), or a plain value. Loads happen only when an r-value is
//! actually demanded, so `&*p` and `*&x` emit no spurious instructions.
//!
//! Arithmetic on constants folds without emitting; conversions fold
//! through [`Sema::convert`].

use crust_ast::types::{CType, TypeKind};
use crust_ast::{BinaryOp, ExprId, ExprKind, Pos, Token, UnaryOp};
use crust_diagnostic as diag;
use crust_ir::{BinOp, CastOp, Global, Inst, IrConst, IrType, IrValue, IrVar};

use crate::context::Sema;
use crate::scope::SymbolKind;
use crate::types::{fold_int, int_parts, types_equal};

/// How an expression's result denotes its value.
#[derive(Debug)]
pub(crate) enum ResKind {
    /// A plain value, or a location when `is_lvalue`.
    Value,
    /// A deferred dereference: the inner result produces the address.
    Indirection(Box<ExprResult>),
    /// A sub-expression already diagnosed; propagates silently.
    Error,
}

/// The result of lowering one expression.
#[derive(Debug)]
pub(crate) struct ExprResult {
    pub kind: ResKind,
    pub cty: CType,
    /// The value itself, or the address when `is_lvalue`.
    pub value: IrValue,
    pub is_lvalue: bool,
    pub is_string: bool,
    pub addr_of: bool,
    /// Cached constant for `const`-qualified symbols.
    pub const_value: Option<IrConst>,
}

impl ExprResult {
    pub fn error() -> Self {
        ExprResult {
            kind: ResKind::Error,
            cty: CType::int(),
            value: IrValue::Const(IrConst::int(0, IrType::I32)),
            is_lvalue: false,
            is_string: false,
            addr_of: false,
            const_value: None,
        }
    }

    pub fn rvalue(cty: CType, value: IrValue) -> Self {
        ExprResult {
            kind: ResKind::Value,
            cty,
            value,
            is_lvalue: false,
            is_string: false,
            addr_of: false,
            const_value: None,
        }
    }

    pub fn lvalue(cty: CType, addr: IrValue) -> Self {
        ExprResult {
            kind: ResKind::Value,
            cty,
            value: addr,
            is_lvalue: true,
            is_string: false,
            addr_of: false,
            const_value: None,
        }
    }

    pub fn indirection(cty: CType, inner: ExprResult) -> Self {
        ExprResult {
            kind: ResKind::Indirection(Box::new(inner)),
            cty,
            value: IrValue::Const(IrConst::int(0, IrType::I32)),
            is_lvalue: true,
            is_string: false,
            addr_of: false,
            const_value: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ResKind::Error)
    }

    /// True when the result denotes an addressable location.
    pub fn is_addressable(&self) -> bool {
        match self.kind {
            ResKind::Indirection(_) => true,
            ResKind::Value => self.is_lvalue,
            ResKind::Error => false,
        }
    }
}

impl Sema<'_> {
    // Expression Lowering

    /// Lower a single expression.
    ///
    /// The kind is cloned out of the arena so lowering can mutate the
    /// context freely while dispatching.
    pub(crate) fn lower_expr(&mut self, id: ExprId) -> ExprResult {
        let kind = self.tu.exprs.kind(id).clone();
        let pos = self.tu.exprs.pos(id);

        match kind {
            ExprKind::IntLit(tok) => self.lower_int_literal(tok),
            ExprKind::FloatLit(tok) => self.lower_float_literal(tok),
            ExprKind::CharLit(tok) => self.lower_char_literal(tok),
            ExprKind::StrLit(tok) => self.lower_string_literal(tok),
            ExprKind::Ident(tok) => self.lower_ident(tok),
            ExprKind::Unary { op, operand } => self.lower_unary(op, operand, pos),
            ExprKind::Binary { op, left, right } => self.lower_binary(op, left, right, pos),
            ExprKind::Assign { op, target, value } => self.lower_assign(op, target, value, pos),
            ExprKind::Ternary { cond, then_expr, else_expr } => {
                self.lower_ternary(cond, then_expr, else_expr, pos)
            }
            ExprKind::Call { func, args } => self.lower_call(func, args, pos),
            ExprKind::Member { base, field, arrow } => self.lower_member(base, field, arrow, pos),
            ExprKind::Index { base, index } => self.lower_index(base, index, pos),
            ExprKind::Cast { ty, operand } => self.lower_cast(&ty, operand, pos),
            ExprKind::SizeofExpr(operand) => self.lower_sizeof_expr(operand, pos),
            ExprKind::SizeofType(ty) => self.lower_sizeof_type(&ty, pos),
        }
    }

    /// Lower an expression and coerce it to an r-value.
    pub(crate) fn lower_and_rvalue(&mut self, id: ExprId) -> Option<(CType, IrValue)> {
        let res = self.lower_expr(id);
        self.rvalue(res)
    }

    // L-value / r-value coercion

    /// Load the value out of a result.
    ///
    /// - indirection chains load one level per step
    /// - arrays and functions decay to pointers instead of loading
    /// - cached constants of `const` symbols are returned without a load
    ///
    /// `None` propagates an already-diagnosed error.
    pub(crate) fn rvalue(&mut self, res: ExprResult) -> Option<(CType, IrValue)> {
        let pos = Pos::UNKNOWN;
        match res.kind {
            ResKind::Error => None,
            ResKind::Indirection(inner) => {
                let (_, addr) = self.rvalue(*inner)?;
                if res.cty.is_array() {
                    let elem = res.cty.array_elem()?.clone();
                    return Some(self.decay_array(&elem, addr));
                }
                let ir = self.ir_type_of(&res.cty, pos);
                let dest = self.temp(ir);
                self.emit(Inst::Load { dest: dest.clone(), addr });
                Some((res.cty, dest.into()))
            }
            ResKind::Value => {
                if !res.is_lvalue && res.cty.is_function() {
                    // Function designators decay to function pointers.
                    return Some((res.cty.pointer_to(), res.value));
                }
                if res.addr_of || !res.is_lvalue {
                    return Some((res.cty, res.value));
                }
                if let Some(c) = res.const_value {
                    return Some((res.cty, IrValue::Const(c)));
                }
                if res.cty.is_array() {
                    let elem = res.cty.array_elem()?.clone();
                    return Some(self.decay_array(&elem, res.value));
                }
                if res.cty.is_function() {
                    return Some((res.cty.pointer_to(), res.value));
                }
                let ir = self.ir_type_of(&res.cty, pos);
                let dest = self.temp(ir);
                self.emit(Inst::Load { dest: dest.clone(), addr: res.value });
                Some((res.cty, dest.into()))
            }
        }
    }

    /// The address a result denotes. Callers check `is_addressable`
    /// first; `None` only propagates errors.
    pub(crate) fn lvalue_addr(&mut self, res: ExprResult) -> Option<(CType, IrValue)> {
        match res.kind {
            ResKind::Error => None,
            ResKind::Indirection(inner) => {
                let cty = res.cty;
                let (_, addr) = self.rvalue(*inner)?;
                Some((cty, addr))
            }
            ResKind::Value if res.is_lvalue => Some((res.cty, res.value)),
            ResKind::Value => None,
        }
    }

    /// Array-to-pointer decay: the address itself, retyped to the
    /// element pointer. Constant addresses fold; otherwise an element
    /// pointer to index 0 is materialized.
    fn decay_array(&mut self, elem: &CType, addr: IrValue) -> (CType, IrValue) {
        let ptr_cty = elem.pointer_to();
        if let IrValue::Const(IrConst::GlobalAddr { name, ty: IrType::Ptr(inner) }) = &addr {
            if let IrType::Array { elem: elem_ir, .. } = &**inner {
                let folded = IrConst::GlobalAddr {
                    name: *name,
                    ty: IrType::Ptr(elem_ir.clone()),
                };
                return (ptr_cty, folded.into());
            }
        }
        let zero = IrConst::int(0, self.target.ptr_int.clone());
        let dest = self.gep(addr, zero.into());
        (ptr_cty, dest.into())
    }

    /// Emit `get_array_element_ptr`, typing the destination from the base.
    pub(crate) fn gep(&mut self, base: IrValue, index: IrValue) -> IrVar {
        let dest_ty = match base.ty() {
            IrType::Ptr(inner) => match &**inner {
                IrType::Array { elem, .. } => IrType::Ptr(elem.clone()),
                _ => base.ty().clone(),
            },
            other => panic!("element pointer through non-pointer `{other}`"),
        };
        let dest = self.temp(dest_ty);
        self.emit(Inst::GetElemPtr { dest: dest.clone(), base, index });
        dest
    }

    /// Widen an `i1` to the target's `int`.
    pub(crate) fn widen_bool(&mut self, value: IrValue) -> IrValue {
        if let IrValue::Const(c) = &value {
            if let Some(v) = c.int_value() {
                return IrConst::int(v, self.target.sint.clone()).into();
            }
        }
        let dest = self.temp(self.target.sint.clone());
        self.emit(Inst::Cast { op: CastOp::Ext, dest: dest.clone(), operand: value });
        dest.into()
    }

    // Leaves

    fn lower_ident(&mut self, tok: Token) -> ExprResult {
        let Some(sid) = self.scopes.lookup(tok.text) else {
            let text = self.text(tok).to_owned();
            self.report(diag::undeclared_identifier(tok.pos, &text));
            return ExprResult::error();
        };
        let sym = self.scopes.symbol(sid).clone();
        match sym.kind {
            SymbolKind::EnumConst => {
                let value = sym
                    .const_value
                    .unwrap_or_else(|| panic!("enumerator `{}` without a value", self.text(tok)));
                ExprResult::rvalue(sym.cty, IrValue::Const(value))
            }
            // Functions and globals live at link-time-constant addresses,
            // so their `ir_ptr` is an address constant; this is what lets
            // `&global` initialize another global.
            SymbolKind::Function => {
                let addr = IrConst::GlobalAddr {
                    name: sym.external_name,
                    ty: sym.ir_ptr.ty.clone(),
                };
                ExprResult::rvalue(sym.cty, addr.into())
            }
            SymbolKind::Global => {
                let addr = IrConst::GlobalAddr {
                    name: sym.external_name,
                    ty: sym.ir_ptr.ty.clone(),
                };
                let mut res = ExprResult::lvalue(sym.cty, addr.into());
                res.const_value = sym.const_value;
                res
            }
            SymbolKind::Local => {
                let mut res = ExprResult::lvalue(sym.cty, IrValue::Var(sym.ir_ptr));
                res.const_value = sym.const_value;
                res
            }
        }
    }

    /// A string literal becomes an anonymous global `char` array; the
    /// result is its address, usable as an l-value of array type.
    fn lower_string_literal(&mut self, tok: Token) -> ExprResult {
        let mut data = self.string_bytes(tok);
        data.push(0);
        let len = data.len() as u64;

        let arr_ir = IrType::Array { elem: Box::new(self.target.schar.clone()), len };
        let name = self.fresh_anon(".str.");
        self.module.globals.push(Global {
            name,
            ty: arr_ir.clone(),
            init: IrConst::Str { data, ty: arr_ir.clone() },
            is_defined: true,
        });

        let cty = CType::char_().array_of(crust_ast::types::ArraySize::Fixed(len));
        let addr = IrConst::GlobalAddr { name, ty: arr_ir.ptr_to() };
        let mut res = ExprResult::lvalue(cty, addr.into());
        res.is_string = true;
        res
    }

    // Unary operators

    fn lower_unary(&mut self, op: UnaryOp, operand: ExprId, pos: Pos) -> ExprResult {
        match op {
            UnaryOp::AddrOf => {
                let res = self.lower_expr(operand);
                if res.is_error() {
                    return ExprResult::error();
                }
                if !res.is_addressable() {
                    let ty = res.cty.clone();
                    self.report(diag::invalid_unary_operand(pos, "&", &ty));
                    return ExprResult::error();
                }
                let Some((cty, addr)) = self.lvalue_addr(res) else {
                    return ExprResult::error();
                };
                let mut out = ExprResult::rvalue(cty.pointer_to(), addr);
                out.addr_of = true;
                out
            }
            UnaryOp::Deref => {
                let Some((cty, value)) = self.lower_and_rvalue(operand) else {
                    return ExprResult::error();
                };
                let Some(pointee) = cty.pointee().cloned() else {
                    self.report(diag::invalid_unary_operand(pos, "*", &cty));
                    return ExprResult::error();
                };
                if pointee.is_function() {
                    // Dereferencing a function pointer yields the function
                    // designator again.
                    return ExprResult::rvalue(pointee, value);
                }
                ExprResult::indirection(pointee, ExprResult::rvalue(cty, value))
            }
            UnaryOp::Plus | UnaryOp::Neg => {
                let Some((cty, value)) = self.lower_and_rvalue(operand) else {
                    return ExprResult::error();
                };
                if !cty.is_arithmetic() {
                    let text = if matches!(op, UnaryOp::Neg) { "-" } else { "+" };
                    self.report(diag::invalid_unary_operand(pos, text, &cty));
                    return ExprResult::error();
                }
                let promoted = self.promote(&cty);
                let Some(value) = self.convert(value, &cty, &promoted, pos) else {
                    return ExprResult::error();
                };
                if matches!(op, UnaryOp::Plus) {
                    return ExprResult::rvalue(promoted, value);
                }
                let ir = self.ir_type_of(&promoted, pos);
                if let IrValue::Const(c) = &value {
                    if let Some(v) = c.int_value() {
                        return ExprResult::rvalue(
                            promoted,
                            IrConst::int(fold_int(v.wrapping_neg(), &ir), ir).into(),
                        );
                    }
                    if let Some(f) = c.float_value() {
                        return ExprResult::rvalue(promoted, IrConst::float(-f, ir).into());
                    }
                }
                let dest = self.temp(ir);
                self.emit(Inst::Neg { dest: dest.clone(), operand: value });
                ExprResult::rvalue(promoted, dest.into())
            }
            UnaryOp::BitNot => {
                let Some((cty, value)) = self.lower_and_rvalue(operand) else {
                    return ExprResult::error();
                };
                if !cty.is_integer() {
                    self.report(diag::invalid_unary_operand(pos, "~", &cty));
                    return ExprResult::error();
                }
                let promoted = self.promote(&cty);
                let Some(value) = self.convert(value, &cty, &promoted, pos) else {
                    return ExprResult::error();
                };
                let ir = self.ir_type_of(&promoted, pos);
                if let IrValue::Const(c) = &value {
                    if let Some(v) = c.int_value() {
                        return ExprResult::rvalue(
                            promoted,
                            IrConst::int(fold_int(!v, &ir), ir).into(),
                        );
                    }
                }
                let dest = self.temp(ir);
                self.emit(Inst::Not { dest: dest.clone(), operand: value });
                ExprResult::rvalue(promoted, dest.into())
            }
            UnaryOp::Not => {
                let Some((cty, value)) = self.lower_and_rvalue(operand) else {
                    return ExprResult::error();
                };
                if !cty.is_scalar() {
                    self.report(diag::invalid_unary_operand(pos, "!", &cty));
                    return ExprResult::error();
                }
                let from_ir = self.ir_type_of(&cty, pos);
                let truth = self.boolify(&from_ir, value);
                // Logical negation of the truth value.
                let negated = match &truth {
                    IrValue::Const(c) => {
                        let v = c.int_value().unwrap_or(0);
                        IrConst::int(i64::from(v == 0), IrType::I1).into()
                    }
                    IrValue::Var(_) => {
                        let dest = self.temp(IrType::I1);
                        self.emit(Inst::Binary {
                            op: BinOp::Eq,
                            dest: dest.clone(),
                            lhs: truth,
                            rhs: IrConst::int(0, IrType::I1).into(),
                        });
                        dest.into()
                    }
                };
                let widened = self.widen_bool(negated);
                ExprResult::rvalue(CType::int(), widened)
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                self.lower_incdec(op, operand, pos)
            }
        }
    }

    fn lower_incdec(&mut self, op: UnaryOp, operand: ExprId, pos: Pos) -> ExprResult {
        let res = self.lower_expr(operand);
        if res.is_error() {
            return ExprResult::error();
        }
        if !res.is_addressable() {
            self.report(diag::invalid_assignment_target(pos));
            return ExprResult::error();
        }
        let Some((cty, addr)) = self.lvalue_addr(res) else {
            return ExprResult::error();
        };

        let ir = self.ir_type_of(&cty, pos);
        let old = self.temp(ir.clone());
        self.emit(Inst::Load { dest: old.clone(), addr: addr.clone() });

        let negative = matches!(op, UnaryOp::PreDec | UnaryOp::PostDec);
        let new_value = if cty.is_pointer() {
            let step = IrConst::int(if negative { -1 } else { 1 }, self.target.ptr_int.clone());
            IrValue::from(self.gep(old.clone().into(), step.into()))
        } else if cty.is_arithmetic() {
            let one = (CType::int(), IrValue::Const(IrConst::int(1, self.target.sint.clone())));
            let binop = if negative { BinaryOp::Sub } else { BinaryOp::Add };
            let Some((rc, rv)) = self.apply_binary(binop, (cty.clone(), old.clone().into()), one, pos)
            else {
                return ExprResult::error();
            };
            let Some(back) = self.convert(rv, &rc, &cty, pos) else {
                return ExprResult::error();
            };
            back
        } else {
            let text = if negative { "--" } else { "++" };
            self.report(diag::invalid_unary_operand(pos, text, &cty));
            return ExprResult::error();
        };

        self.emit(Inst::Store { addr, value: new_value.clone() });
        let result = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
            new_value
        } else {
            old.into()
        };
        ExprResult::rvalue(cty, result)
    }

    // Binary operators

    fn lower_binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId, pos: Pos) -> ExprResult {
        match op {
            BinaryOp::Comma => {
                let lhs = self.lower_expr(left);
                if self.rvalue(lhs).is_none() {
                    return ExprResult::error();
                }
                let Some((cty, value)) = self.lower_and_rvalue(right) else {
                    return ExprResult::error();
                };
                ExprResult::rvalue(cty, value)
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => self.lower_logical(op, left, right, pos),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq
            | BinaryOp::Ne => self.lower_comparison(op, left, right, pos),
            _ => {
                let Some(lhs) = self.lower_and_rvalue(left) else {
                    return ExprResult::error();
                };
                let Some(rhs) = self.lower_and_rvalue(right) else {
                    return ExprResult::error();
                };
                match self.apply_binary(op, lhs, rhs, pos) {
                    Some((cty, value)) => ExprResult::rvalue(cty, value),
                    None => ExprResult::error(),
                }
            }
        }
    }

    /// Arithmetic, bitwise, shift, and pointer-arithmetic binary
    /// operators over already-coerced operands. Shared with compound
    /// assignment and increment/decrement.
    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        lhs: (CType, IrValue),
        rhs: (CType, IrValue),
        pos: Pos,
    ) -> Option<(CType, IrValue)> {
        let (lc, lv) = lhs;
        let (rc, rv) = rhs;
        let op_text = binary_op_text(op);

        // Pointer arithmetic.
        if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            match (lc.is_pointer(), rc.is_pointer()) {
                (true, false) if rc.is_integer() => {
                    return self.pointer_offset(op, lc, lv, rc, rv, pos);
                }
                (false, true) if lc.is_integer() && matches!(op, BinaryOp::Add) => {
                    return self.pointer_offset(op, rc, rv, lc, lv, pos);
                }
                (true, true) if matches!(op, BinaryOp::Sub) => {
                    return self.pointer_difference(lc, lv, rv, pos);
                }
                (false, false) => {}
                _ => {
                    self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
                    return None;
                }
            }
        }

        // Shifts promote each operand on its own; the result takes the
        // promoted left type.
        if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
            if !lc.is_integer() || !rc.is_integer() {
                self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
                return None;
            }
            let pl = self.promote(&lc);
            let lv = self.convert(lv, &lc, &pl, pos)?;
            let rv = self.convert(rv, &rc, &pl, pos)?;
            let ir = self.ir_type_of(&pl, pos);
            if let (IrValue::Const(a), IrValue::Const(b)) = (&lv, &rv) {
                if let (Some(x), Some(s)) = (a.int_value(), b.int_value()) {
                    let amount = (s & 63) as u32;
                    let v = if matches!(op, BinaryOp::Shl) {
                        x.wrapping_shl(amount)
                    } else if ir.is_signed_integer() {
                        x.wrapping_shr(amount)
                    } else {
                        #[expect(clippy::cast_sign_loss, reason = "logical shift")]
                        #[expect(clippy::cast_possible_wrap, reason = "logical shift")]
                        {
                            ((x as u64).wrapping_shr(amount)) as i64
                        }
                    };
                    return Some((pl, IrConst::int(fold_int(v, &ir), ir).into()));
                }
            }
            let binop = if matches!(op, BinaryOp::Shl) { BinOp::Shl } else { BinOp::Shr };
            let dest = self.temp(ir);
            self.emit(Inst::Binary { op: binop, dest: dest.clone(), lhs: lv, rhs: rv });
            return Some((pl, dest.into()));
        }

        // Everything else requires arithmetic (integer-only for %, &, |, ^).
        let integer_only = matches!(
            op,
            BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
        );
        let ok = if integer_only {
            lc.is_integer() && rc.is_integer()
        } else {
            lc.is_arithmetic() && rc.is_arithmetic()
        };
        if !ok {
            self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
            return None;
        }

        let common = self.usual_arith(&lc, &rc);
        let lv = self.convert(lv, &lc, &common, pos)?;
        let rv = self.convert(rv, &rc, &common, pos)?;
        let ir = self.ir_type_of(&common, pos);

        // Division or remainder by a constant zero: diagnosed, not fatal.
        let mut zero_divisor = false;
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) && common.is_integer() {
            if let IrValue::Const(c) = &rv {
                if c.int_value() == Some(0) {
                    self.report(diag::division_by_zero(pos));
                    zero_divisor = true;
                }
            }
        }

        if !zero_divisor {
            if let (IrValue::Const(a), IrValue::Const(b)) = (&lv, &rv) {
                if let Some(folded) = fold_arith(op, &ir, a, b) {
                    return Some((common, folded.into()));
                }
            }
        }

        let binop = match op {
            BinaryOp::Add => BinOp::Add,
            BinaryOp::Sub => BinOp::Sub,
            BinaryOp::Mul => BinOp::Mul,
            BinaryOp::Div => BinOp::Div,
            BinaryOp::Mod => BinOp::Mod,
            BinaryOp::BitAnd => BinOp::And,
            BinaryOp::BitOr => BinOp::Or,
            BinaryOp::BitXor => BinOp::Xor,
            _ => panic!("unhandled arithmetic operator {op:?}"),
        };
        let dest = self.temp(ir);
        self.emit(Inst::Binary { op: binop, dest: dest.clone(), lhs: lv, rhs: rv });
        Some((common, dest.into()))
    }

    /// `ptr ± integer`: scale by `sizeof(pointee)` via the element
    /// pointer instruction.
    fn pointer_offset(
        &mut self,
        op: BinaryOp,
        ptr_cty: CType,
        ptr_val: IrValue,
        idx_cty: CType,
        idx_val: IrValue,
        pos: Pos,
    ) -> Option<(CType, IrValue)> {
        let diff = self.ptrdiff_ctype();
        let idx = self.convert(idx_val, &idx_cty, &diff, pos)?;
        let idx = if matches!(op, BinaryOp::Sub) {
            match &idx {
                IrValue::Const(c) => {
                    let v = c.int_value().unwrap_or(0);
                    IrConst::int(v.wrapping_neg(), self.target.ptr_int.clone()).into()
                }
                IrValue::Var(_) => {
                    let dest = self.temp(self.target.ptr_int.clone());
                    self.emit(Inst::Neg { dest: dest.clone(), operand: idx });
                    dest.into()
                }
            }
        } else {
            idx
        };
        let dest = self.gep(ptr_val, idx);
        Some((ptr_cty, dest.into()))
    }

    /// `ptr − ptr`: byte difference divided by `sizeof(pointee)`,
    /// yielding `ptrdiff_t`.
    fn pointer_difference(
        &mut self,
        lc: CType,
        lv: IrValue,
        rv: IrValue,
        pos: Pos,
    ) -> Option<(CType, IrValue)> {
        let diff_cty = self.ptrdiff_ctype();
        let diff_ir = self.target.ptr_int.clone();
        let pointee = lc.pointee()?.clone();
        let elem_size = self.sizeof_ctype(&pointee, pos).max(1);

        let li = self.temp(diff_ir.clone());
        self.emit(Inst::Cast { op: CastOp::Ptoi, dest: li.clone(), operand: lv });
        let ri = self.temp(diff_ir.clone());
        self.emit(Inst::Cast { op: CastOp::Ptoi, dest: ri.clone(), operand: rv });

        let sub = self.temp(diff_ir.clone());
        self.emit(Inst::Binary {
            op: BinOp::Sub,
            dest: sub.clone(),
            lhs: li.into(),
            rhs: ri.into(),
        });
        let dest = self.temp(diff_ir.clone());
        #[expect(clippy::cast_possible_wrap, reason = "element sizes are small")]
        let size_const = IrConst::int(elem_size as i64, diff_ir);
        self.emit(Inst::Binary {
            op: BinOp::Div,
            dest: dest.clone(),
            lhs: sub.into(),
            rhs: size_const.into(),
        });
        Some((diff_cty, dest.into()))
    }

    fn lower_comparison(
        &mut self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        pos: Pos,
    ) -> ExprResult {
        let Some((lc, lv)) = self.lower_and_rvalue(left) else {
            return ExprResult::error();
        };
        let Some((rc, rv)) = self.lower_and_rvalue(right) else {
            return ExprResult::error();
        };
        let op_text = binary_op_text(op);

        let (lv, rv, signed, float) = if lc.is_arithmetic() && rc.is_arithmetic() {
            let common = self.usual_arith(&lc, &rc);
            let Some(lv) = self.convert(lv, &lc, &common, pos) else {
                return ExprResult::error();
            };
            let Some(rv) = self.convert(rv, &rc, &common, pos) else {
                return ExprResult::error();
            };
            let signed = int_parts(&common).is_none_or(|(_, s)| s);
            (lv, rv, signed, common.is_float())
        } else if lc.is_pointer() && (rc.is_pointer() || rc.is_integer()) {
            let Some(rv) = self.convert(rv, &rc, &lc, pos) else {
                self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
                return ExprResult::error();
            };
            (lv, rv, false, false)
        } else if rc.is_pointer() && lc.is_integer() {
            let Some(lv) = self.convert(lv, &lc, &rc, pos) else {
                self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
                return ExprResult::error();
            };
            (lv, rv, false, false)
        } else {
            self.report(diag::invalid_binary_operands(pos, op_text, &lc, &rc));
            return ExprResult::error();
        };

        if let (IrValue::Const(a), IrValue::Const(b)) = (&lv, &rv) {
            if let Some(truth) = fold_compare(op, signed, float, a, b) {
                let widened = self.widen_bool(IrConst::int(i64::from(truth), IrType::I1).into());
                return ExprResult::rvalue(CType::int(), widened);
            }
        }

        let binop = match op {
            BinaryOp::Lt => BinOp::Lt,
            BinaryOp::Le => BinOp::Le,
            BinaryOp::Gt => BinOp::Gt,
            BinaryOp::Ge => BinOp::Ge,
            BinaryOp::Eq => BinOp::Eq,
            BinaryOp::Ne => BinOp::Ne,
            _ => panic!("non-comparison operator {op:?}"),
        };
        let dest = self.temp(IrType::I1);
        self.emit(Inst::Binary { op: binop, dest: dest.clone(), lhs: lv, rhs: rv });
        let widened = self.widen_bool(dest.into());
        ExprResult::rvalue(CType::int(), widened)
    }

    /// Short-circuit `&&`/`||`: branch arms store into a stack slot,
    /// joined by a load. A constant left operand decides without
    /// evaluating the right one.
    fn lower_logical(&mut self, op: BinaryOp, left: ExprId, right: ExprId, pos: Pos) -> ExprResult {
        let is_and = matches!(op, BinaryOp::LogicalAnd);

        let Some((lc, lv)) = self.lower_and_rvalue(left) else {
            return ExprResult::error();
        };
        if !lc.is_scalar() {
            self.report(diag::invalid_bool_conversion(pos, &lc));
            return ExprResult::error();
        }
        let l_ir = self.ir_type_of(&lc, pos);
        let l_truth = self.boolify(&l_ir, lv);

        if let IrValue::Const(c) = &l_truth {
            let truth = c.int_value().unwrap_or(0) != 0;
            // Decided by the left operand: the right is not evaluated.
            if truth != is_and {
                let decided = i64::from(truth);
                return ExprResult::rvalue(
                    CType::int(),
                    IrConst::int(decided, self.target.sint.clone()).into(),
                );
            }
            let Some((rc, rv)) = self.lower_and_rvalue(right) else {
                return ExprResult::error();
            };
            if !rc.is_scalar() {
                self.report(diag::invalid_bool_conversion(pos, &rc));
                return ExprResult::error();
            }
            let r_ir = self.ir_type_of(&rc, pos);
            let r_truth = self.boolify(&r_ir, rv);
            let widened = self.widen_bool(r_truth);
            return ExprResult::rvalue(CType::int(), widened);
        }

        let rhs_label = self.fresh_label();
        let short_label = self.fresh_label();
        let end_label = self.fresh_label();

        let slot = self.temp(self.target.sint.ptr_to());
        self.emit_alloca(slot.clone());

        let (then_label, else_label) = if is_and {
            (rhs_label, short_label)
        } else {
            (short_label, rhs_label)
        };
        self.emit(Inst::BrCond { cond: l_truth, then_label, else_label });

        self.emit_label(rhs_label);
        let rhs_ok = (|| {
            let (rc, rv) = self.lower_and_rvalue(right)?;
            if !rc.is_scalar() {
                self.report(diag::invalid_bool_conversion(pos, &rc));
                return None;
            }
            let r_ir = self.ir_type_of(&rc, pos);
            let r_truth = self.boolify(&r_ir, rv);
            let widened = self.widen_bool(r_truth);
            self.emit(Inst::Store { addr: slot.clone().into(), value: widened });
            Some(())
        })();
        if rhs_ok.is_none() {
            return ExprResult::error();
        }
        self.emit(Inst::Br { target: end_label });

        self.emit_label(short_label);
        let short_value = IrConst::int(i64::from(!is_and), self.target.sint.clone());
        self.emit(Inst::Store { addr: slot.clone().into(), value: short_value.into() });
        self.emit(Inst::Br { target: end_label });

        self.emit_label(end_label);
        let result = self.temp(self.target.sint.clone());
        self.emit(Inst::Load { dest: result.clone(), addr: slot.into() });
        ExprResult::rvalue(CType::int(), result.into())
    }

    // Assignment

    fn lower_assign(
        &mut self,
        op: Option<BinaryOp>,
        target: ExprId,
        value: ExprId,
        pos: Pos,
    ) -> ExprResult {
        let target_res = self.lower_expr(target);
        if target_res.is_error() {
            return ExprResult::error();
        }
        if !target_res.is_addressable() {
            self.report(diag::invalid_assignment_target(pos));
            return ExprResult::error();
        }

        let Some((vc, vv)) = self.lower_and_rvalue(value) else {
            return ExprResult::error();
        };
        // The target address is computed exactly once, compound or not.
        let Some((tc, addr)) = self.lvalue_addr(target_res) else {
            return ExprResult::error();
        };

        let (rc, rv) = if let Some(binop) = op {
            let ir = self.ir_type_of(&tc, pos);
            let old = self.temp(ir);
            self.emit(Inst::Load { dest: old.clone(), addr: addr.clone() });
            let Some(applied) = self.apply_binary(binop, (tc.clone(), old.into()), (vc, vv), pos)
            else {
                return ExprResult::error();
            };
            applied
        } else {
            (vc, vv)
        };

        let Some(converted) = self.convert(rv, &rc, &tc, pos) else {
            self.report(diag::invalid_binary_operands(pos, "=", &tc, &rc));
            return ExprResult::error();
        };
        self.emit(Inst::Store { addr, value: converted.clone() });
        ExprResult::rvalue(tc, converted)
    }

    // Ternary

    /// The common type of the two arms of `?:`.
    fn ternary_common(&self, t: &CType, f: &CType) -> Option<CType> {
        if t.is_arithmetic() && f.is_arithmetic() {
            return Some(self.usual_arith(t, f));
        }
        if t.is_void() && f.is_void() {
            return Some(CType::void());
        }
        if t.is_pointer() && f.is_pointer() {
            let (tp, fp) = (t.pointee()?, f.pointee()?);
            if types_equal(tp, fp) {
                return Some(t.clone());
            }
            if tp.is_void() {
                return Some(t.clone());
            }
            if fp.is_void() {
                return Some(f.clone());
            }
            return None;
        }
        if t.is_pointer() && f.is_integer() {
            return Some(t.clone());
        }
        if f.is_pointer() && t.is_integer() {
            return Some(f.clone());
        }
        if t.is_record() && types_equal(t, f) {
            return Some(t.clone());
        }
        None
    }

    fn lower_ternary(
        &mut self,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        pos: Pos,
    ) -> ExprResult {
        let Some((cc, cv)) = self.lower_and_rvalue(cond) else {
            return ExprResult::error();
        };
        if !cc.is_scalar() {
            self.report(diag::invalid_condition(pos, "?:", &cc));
            return ExprResult::error();
        }
        let c_ir = self.ir_type_of(&cc, pos);
        let truth = self.boolify(&c_ir, cv);

        // Constant condition: only the chosen arm is evaluated; the other
        // contributes its type from a discarded lowering.
        if let IrValue::Const(c) = &truth {
            let taken_true = c.int_value().unwrap_or(0) != 0;
            let (taken, other) = if taken_true {
                (then_expr, else_expr)
            } else {
                (else_expr, then_expr)
            };
            let Some((taken_cty, taken_val)) = self.lower_and_rvalue(taken) else {
                return ExprResult::error();
            };
            let Some(other_cty) = self.lower_discarded(other).map(|c| decayed(&c)) else {
                return ExprResult::error();
            };
            let (t_cty, f_cty) = if taken_true {
                (taken_cty.clone(), other_cty)
            } else {
                (other_cty, taken_cty.clone())
            };
            let Some(common) = self.ternary_common(&t_cty, &f_cty) else {
                self.report(diag::invalid_ternary_operands(pos, &t_cty, &f_cty));
                return ExprResult::error();
            };
            if common.is_void() {
                return ExprResult::rvalue(common, taken_val);
            }
            let Some(converted) = self.convert(taken_val, &taken_cty, &common, pos) else {
                self.report(diag::invalid_ternary_operands(pos, &t_cty, &f_cty));
                return ExprResult::error();
            };
            return ExprResult::rvalue(common, converted);
        }

        let true_label = self.fresh_label();
        let false_label = self.fresh_label();
        let end_label = self.fresh_label();
        self.emit(Inst::BrCond {
            cond: truth,
            then_label: true_label,
            else_label: false_label,
        });

        self.emit_label(true_label);
        let Some((t_cty, t_val)) = self.lower_and_rvalue(then_expr) else {
            return ExprResult::error();
        };
        let t_cursor = self.stream.cursor();
        self.emit(Inst::Br { target: end_label });

        self.emit_label(false_label);
        let Some((f_cty, f_val)) = self.lower_and_rvalue(else_expr) else {
            return ExprResult::error();
        };
        let f_cursor = self.stream.cursor();
        self.emit(Inst::Br { target: end_label });

        self.emit_label(end_label);
        let end_cursor = self.stream.cursor();

        let Some(common) = self.ternary_common(&t_cty, &f_cty) else {
            self.report(diag::invalid_ternary_operands(pos, &t_cty, &f_cty));
            return ExprResult::error();
        };
        if common.is_void() {
            return ExprResult::rvalue(common, IrConst::int(0, IrType::I32).into());
        }

        let common_ir = self.ir_type_of(&common, pos);
        let slot = self.temp(common_ir.ptr_to());
        self.emit_alloca(slot.clone());

        // Conversions are inserted at the end of each arm, before its
        // branch to the join.
        self.stream.set_cursor(t_cursor);
        let Some(tv) = self.convert(t_val, &t_cty, &common, pos) else {
            self.report(diag::invalid_ternary_operands(pos, &t_cty, &f_cty));
            return ExprResult::error();
        };
        self.emit(Inst::Store { addr: slot.clone().into(), value: tv });

        self.stream.set_cursor(f_cursor);
        let Some(fv) = self.convert(f_val, &f_cty, &common, pos) else {
            self.report(diag::invalid_ternary_operands(pos, &t_cty, &f_cty));
            return ExprResult::error();
        };
        self.emit(Inst::Store { addr: slot.clone().into(), value: fv });

        self.stream.set_cursor(end_cursor);
        let result = self.temp(common_ir);
        self.emit(Inst::Load { dest: result.clone(), addr: slot.into() });
        ExprResult::rvalue(common, result.into())
    }

    // Calls

    fn lower_call(&mut self, func: ExprId, args: crust_ast::ExprRange, pos: Pos) -> ExprResult {
        let func_res = self.lower_expr(func);
        if func_res.is_error() {
            return ExprResult::error();
        }

        // The callee is a function designator or decays to a function
        // pointer.
        let (fn_cty, fn_val) = if func_res.cty.is_function() {
            (func_res.cty.clone(), func_res.value.clone())
        } else {
            let cty = func_res.cty.clone();
            let Some((c, v)) = self.rvalue(func_res) else {
                return ExprResult::error();
            };
            match c.pointee() {
                Some(p) if p.is_function() => (p.clone(), v),
                _ => {
                    self.report(diag::call_target_not_function(pos, &cty));
                    return ExprResult::error();
                }
            }
        };

        let TypeKind::Function { ret, params, variadic } = &*fn_cty.kind else {
            self.report(diag::call_target_not_function(pos, &fn_cty));
            return ExprResult::error();
        };
        let ret = ret.clone();
        let params = params.clone();
        let variadic = *variadic;

        let arg_ids = self.tu.exprs.list(args).to_vec();
        let count_ok = if variadic {
            arg_ids.len() >= params.len()
        } else {
            arg_ids.len() == params.len()
        };
        if !count_ok {
            self.report(diag::call_argument_count(pos, params.len(), arg_ids.len()));
            return ExprResult::error();
        }

        let mut lowered: smallvec::SmallVec<[IrValue; 8]> = smallvec::SmallVec::new();
        for (i, &arg) in arg_ids.iter().enumerate() {
            let Some((ac, av)) = self.lower_and_rvalue(arg) else {
                return ExprResult::error();
            };
            let value = if i < params.len() {
                let param_ty = &params[i].ty;
                match self.convert(av, &ac, param_ty, pos) {
                    Some(v) => v,
                    None => {
                        let name = params[i]
                            .name
                            .map_or("argument", |t| self.interner.lookup(t.text));
                        self.report(diag::invalid_initializer(pos, name, param_ty, &ac));
                        return ExprResult::error();
                    }
                }
            } else {
                // Default argument promotions for the variadic tail.
                let promoted = if matches!(
                    *ac.kind,
                    TypeKind::Float(crust_ast::types::FloatRank::Float)
                ) {
                    CType::double()
                } else if ac.is_integer() {
                    self.promote(&ac)
                } else {
                    ac.clone()
                };
                match self.convert(av, &ac, &promoted, pos) {
                    Some(v) => v,
                    None => {
                        self.report(diag::invalid_initializer(pos, "argument", &promoted, &ac));
                        return ExprResult::error();
                    }
                }
            };
            lowered.push(value);
        }

        let dest = if ret.is_void() {
            None
        } else {
            let ir = self.ir_type_of(&ret, pos);
            Some(self.temp(ir))
        };
        self.emit(Inst::Call {
            dest: dest.clone(),
            func: fn_val,
            args: lowered.into_vec(),
        });

        match dest {
            Some(d) => ExprResult::rvalue(ret.clone(), d.into()),
            None => ExprResult::rvalue(ret.clone(), IrConst::int(0, IrType::I32).into()),
        }
    }

    // Member access and subscripting

    fn lower_member(&mut self, base: ExprId, field: Token, arrow: bool, pos: Pos) -> ExprResult {
        let base_res = self.lower_expr(base);
        if base_res.is_error() {
            return ExprResult::error();
        }

        let field_text = self.text(field).to_owned();
        let (rec_cty, base_ptr) = if arrow {
            let cty = base_res.cty.clone();
            let Some((c, v)) = self.rvalue(base_res) else {
                return ExprResult::error();
            };
            match c.pointee() {
                Some(p) if p.is_record() => (p.clone(), v),
                _ => {
                    self.report(diag::invalid_field_reference(pos, &field_text, &cty));
                    return ExprResult::error();
                }
            }
        } else {
            if !base_res.cty.is_record() || !base_res.is_addressable() {
                let ty = base_res.cty.clone();
                self.report(diag::invalid_field_reference(pos, &field_text, &ty));
                return ExprResult::error();
            }
            let Some((c, addr)) = self.lvalue_addr(base_res) else {
                return ExprResult::error();
            };
            (c, addr)
        };

        let Some((idx, fcty)) = self.record_field(&rec_cty, field) else {
            self.report(diag::invalid_field_reference(pos, &field_text, &rec_cty));
            return ExprResult::error();
        };

        let f_ir = self.ir_type_of(&fcty, pos);
        let dest = self.temp(f_ir.ptr_to());
        self.emit(Inst::GetMemberPtr { dest: dest.clone(), base: base_ptr, field: idx });
        ExprResult::lvalue(fcty, dest.into())
    }

    /// `a[i]` lowers as `*(a + i)`.
    fn lower_index(&mut self, base: ExprId, index: ExprId, pos: Pos) -> ExprResult {
        let Some((mut bc, mut bv)) = self.lower_and_rvalue(base) else {
            return ExprResult::error();
        };
        let Some((mut ic, mut iv)) = self.lower_and_rvalue(index) else {
            return ExprResult::error();
        };
        // `i[a]` is `a[i]`.
        if bc.is_integer() && ic.is_pointer() {
            std::mem::swap(&mut bc, &mut ic);
            std::mem::swap(&mut bv, &mut iv);
        }
        let (Some(pointee), true) = (bc.pointee().cloned(), ic.is_integer()) else {
            self.report(diag::invalid_binary_operands(pos, "[]", &bc, &ic));
            return ExprResult::error();
        };
        let diff = self.ptrdiff_ctype();
        let Some(idx) = self.convert(iv, &ic, &diff, pos) else {
            return ExprResult::error();
        };
        let dest = self.gep(bv, idx);
        ExprResult::lvalue(pointee, dest.into())
    }

    // Casts and sizeof

    fn lower_cast(&mut self, ty: &CType, operand: ExprId, pos: Pos) -> ExprResult {
        let target_cty = self.resolve_type(ty, pos);
        let Some((oc, ov)) = self.lower_and_rvalue(operand) else {
            return ExprResult::error();
        };
        if target_cty.is_void() {
            return ExprResult::rvalue(CType::void(), IrConst::int(0, IrType::I32).into());
        }
        match self.convert(ov, &oc, &target_cty, pos) {
            Some(v) => ExprResult::rvalue(target_cty, v),
            None => {
                self.report(diag::invalid_unary_operand(pos, "cast", &oc));
                ExprResult::error()
            }
        }
    }

    /// `sizeof expr` types its operand without evaluating it: the
    /// lowering happens into a discarded stream.
    fn lower_sizeof_expr(&mut self, operand: ExprId, pos: Pos) -> ExprResult {
        let Some(cty) = self.lower_discarded(operand) else {
            return ExprResult::error();
        };
        let size = self.sizeof_ctype(&cty, pos);
        self.sizeof_result(size)
    }

    fn lower_sizeof_type(&mut self, ty: &CType, pos: Pos) -> ExprResult {
        let resolved = self.resolve_type(ty, pos);
        let size = self.sizeof_ctype(&resolved, pos);
        self.sizeof_result(size)
    }

    fn sizeof_result(&mut self, size: u64) -> ExprResult {
        let cty = self.size_ctype();
        let ir = self.target.size_type();
        #[expect(clippy::cast_possible_wrap, reason = "object sizes fit i64")]
        let value = IrConst::int(size as i64, ir);
        ExprResult::rvalue(cty, value.into())
    }

    /// Lower an expression into a throwaway stream, keeping only its
    /// type (and any genuine diagnostics).
    fn lower_discarded(&mut self, id: ExprId) -> Option<CType> {
        let saved = std::mem::take(&mut self.stream);
        let res = self.lower_expr(id);
        self.stream = saved;
        if res.is_error() {
            None
        } else {
            Some(res.cty)
        }
    }

    // Constant expressions

    /// Evaluate an expression as a compile-time constant: the regular
    /// lowering runs against a scratch stream, and the result counts only
    /// if it folded completely (no instructions were needed).
    pub(crate) fn eval_const(&mut self, id: ExprId) -> Option<(CType, IrConst)> {
        let saved = std::mem::take(&mut self.stream);
        let res = self.lower_expr(id);
        let rv = self.rvalue(res);
        let scratch = std::mem::replace(&mut self.stream, saved);
        match rv {
            Some((cty, IrValue::Const(c))) if scratch.is_empty() => Some((cty, c)),
            _ => None,
        }
    }

    /// Evaluate an integer constant expression.
    pub(crate) fn eval_const_int(&mut self, id: ExprId) -> Option<i64> {
        match self.eval_const(id) {
            Some((_, c)) => c.int_value(),
            None => None,
        }
    }
}

/// The type an expression takes in r-value position.
fn decayed(cty: &CType) -> CType {
    match &*cty.kind {
        TypeKind::Array { elem, .. } => elem.pointer_to(),
        TypeKind::Function { .. } => cty.pointer_to(),
        _ => cty.clone(),
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::LogicalAnd => "&&",
        BinaryOp::LogicalOr => "||",
        BinaryOp::Comma => ",",
    }
}

/// Fold arithmetic over two constants of a common IR type.
fn fold_arith(op: BinaryOp, ir: &IrType, a: &IrConst, b: &IrConst) -> Option<IrConst> {
    if ir.is_float() {
        let (x, y) = (a.float_value()?, b.float_value()?);
        let v = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            _ => return None,
        };
        return Some(IrConst::float(v, ir.clone()));
    }

    let (x, y) = (a.int_value()?, b.int_value()?);
    let signed = ir.is_signed_integer();
    let v = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div if y != 0 => {
            if signed {
                x.wrapping_div(y)
            } else {
                #[expect(clippy::cast_sign_loss, reason = "unsigned division")]
                #[expect(clippy::cast_possible_wrap, reason = "unsigned division")]
                {
                    ((x as u64) / (y as u64)) as i64
                }
            }
        }
        BinaryOp::Mod if y != 0 => {
            if signed {
                x.wrapping_rem(y)
            } else {
                #[expect(clippy::cast_sign_loss, reason = "unsigned remainder")]
                #[expect(clippy::cast_possible_wrap, reason = "unsigned remainder")]
                {
                    ((x as u64) % (y as u64)) as i64
                }
            }
        }
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        _ => return None,
    };
    Some(IrConst::int(fold_int(v, ir), ir.clone()))
}

/// Fold a comparison over two constants.
fn fold_compare(op: BinaryOp, signed: bool, float: bool, a: &IrConst, b: &IrConst) -> Option<bool> {
    use std::cmp::Ordering;

    let ord = if float {
        a.float_value()?.partial_cmp(&b.float_value()?)?
    } else {
        let (x, y) = (a.int_value()?, b.int_value()?);
        if signed {
            x.cmp(&y)
        } else {
            #[expect(clippy::cast_sign_loss, reason = "unsigned comparison")]
            (x as u64).cmp(&(y as u64))
        }
    };
    Some(match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        _ => return None,
    })
}

//! Statement lowering.
//!
//! Structured control flow lowers to labels and branches; `goto` targets
//! resolve lazily through the function's label map and are checked once
//! the body is complete. `switch` emits its instruction up front with an
//! empty case table and patches it in place as `case`/`default`
//! statements appear.

use crust_ast::{BlockItem, ExprId, Name, Pos, Stmt, StmtKind, Token};
use crust_diagnostic as diag;
use crust_diagnostic::{Diagnostic, ErrorCode};
use crust_ir::{Inst, IrConst, IrType, IrValue};
use rustc_hash::FxHashSet;

use crate::context::{Sema, SwitchCtx};

impl Sema<'_> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => {
                let res = self.lower_expr(*e);
                let _ = self.rvalue(res);
            }
            StmtKind::Compound(items) => {
                self.scopes.enter();
                for item in items {
                    self.lower_block_item(item);
                }
                self.scopes.leave();
            }
            StmtKind::If { cond, then_stmt, else_stmt } => {
                self.lower_if(*cond, then_stmt, else_stmt.as_deref());
            }
            StmtKind::While { cond, body } => self.lower_while(*cond, body),
            StmtKind::DoWhile { body, cond } => self.lower_do_while(body, *cond),
            StmtKind::For { init, cond, post, body } => {
                self.lower_for(init.as_deref(), *cond, *post, body);
            }
            StmtKind::Return(value) => self.lower_return(*value, stmt.pos),
            StmtKind::Break => {
                let target = self.fn_ctx().break_label;
                match target {
                    Some(label) => {
                        self.emit(Inst::Br { target: label });
                    }
                    None => self.report(diag::outside_construct(stmt.pos, "break")),
                }
            }
            StmtKind::Continue => {
                let target = self.fn_ctx().continue_label;
                match target {
                    Some(label) => {
                        self.emit(Inst::Br { target: label });
                    }
                    None => self.report(diag::outside_construct(stmt.pos, "continue")),
                }
            }
            StmtKind::Goto(tok) => {
                let target = self.goto_target(tok.text);
                self.emit(Inst::Br { target });
                self.fn_ctx().gotos.push(*tok);
            }
            StmtKind::Labeled { label, stmt } => self.lower_labeled(*label, stmt),
            StmtKind::Switch { cond, body } => self.lower_switch(*cond, body),
            StmtKind::Case { value, stmt: inner } => self.lower_case(*value, inner, stmt.pos),
            StmtKind::Default(inner) => self.lower_default(inner, stmt.pos),
        }
    }

    pub(crate) fn lower_block_item(&mut self, item: &BlockItem) {
        match item {
            BlockItem::Stmt(stmt) => self.lower_stmt(stmt),
            BlockItem::Decl(decl) => self.lower_local_decl(decl),
        }
    }

    /// Lower a condition to an `i1`, diagnosing non-scalar types. Error
    /// recovery substitutes a constant so the walk can continue.
    fn lower_condition(&mut self, e: ExprId, context: &str) -> IrValue {
        let pos = self.tu.exprs.pos(e);
        let Some((cty, value)) = self.lower_and_rvalue(e) else {
            return IrConst::int(1, IrType::I1).into();
        };
        if !cty.is_scalar() {
            self.report(diag::invalid_condition(pos, context, &cty));
            return IrConst::int(1, IrType::I1).into();
        }
        let ir = self.ir_type_of(&cty, pos);
        self.boolify(&ir, value)
    }

    fn lower_if(&mut self, cond: ExprId, then_stmt: &Stmt, else_stmt: Option<&Stmt>) {
        let truth = self.lower_condition(cond, "if");
        let then_label = self.fresh_label();
        let end_label = self.fresh_label();

        match else_stmt {
            None => {
                self.emit(Inst::BrCond {
                    cond: truth,
                    then_label,
                    else_label: end_label,
                });
                self.emit_label(then_label);
                self.lower_stmt(then_stmt);
                self.emit_label(end_label);
            }
            Some(else_stmt) => {
                let else_label = self.fresh_label();
                self.emit(Inst::BrCond {
                    cond: truth,
                    then_label,
                    else_label,
                });
                self.emit_label(then_label);
                self.lower_stmt(then_stmt);
                self.emit(Inst::Br { target: end_label });
                self.emit_label(else_label);
                self.lower_stmt(else_stmt);
                self.emit_label(end_label);
            }
        }
    }

    /// Pre-test loop: condition at `start`, body, back edge, exit.
    /// `continue` re-tests the condition.
    fn lower_while(&mut self, cond: ExprId, body: &Stmt) {
        let start = self.fresh_label();
        let body_label = self.fresh_label();
        let exit = self.fresh_label();

        self.emit_label(start);
        let truth = self.lower_condition(cond, "while");
        self.emit(Inst::BrCond {
            cond: truth,
            then_label: body_label,
            else_label: exit,
        });
        self.emit_label(body_label);

        let (saved_break, saved_continue) = self.push_loop_labels(exit, start);
        self.lower_stmt(body);
        self.pop_loop_labels(saved_break, saved_continue);

        self.emit(Inst::Br { target: start });
        self.emit_label(exit);
    }

    /// Post-test loop: body, `body_end` (the `continue` target), test.
    fn lower_do_while(&mut self, body: &Stmt, cond: ExprId) {
        let start = self.fresh_label();
        let body_end = self.fresh_label();
        let exit = self.fresh_label();

        self.emit_label(start);
        let (saved_break, saved_continue) = self.push_loop_labels(exit, body_end);
        self.lower_stmt(body);
        self.pop_loop_labels(saved_break, saved_continue);

        self.emit_label(body_end);
        let truth = self.lower_condition(cond, "do-while");
        self.emit(Inst::BrCond {
            cond: truth,
            then_label: start,
            else_label: exit,
        });
        self.emit_label(exit);
    }

    /// `for` opens its own scope for the init clause; the post clause is
    /// emitted after `body_end`, so `continue` runs it.
    fn lower_for(
        &mut self,
        init: Option<&BlockItem>,
        cond: Option<ExprId>,
        post: Option<ExprId>,
        body: &Stmt,
    ) {
        self.scopes.enter();
        if let Some(init) = init {
            self.lower_block_item(init);
        }

        let start = self.fresh_label();
        let body_label = self.fresh_label();
        let body_end = self.fresh_label();
        let exit = self.fresh_label();

        self.emit_label(start);
        if let Some(cond) = cond {
            let truth = self.lower_condition(cond, "for");
            self.emit(Inst::BrCond {
                cond: truth,
                then_label: body_label,
                else_label: exit,
            });
        }
        self.emit_label(body_label);

        let (saved_break, saved_continue) = self.push_loop_labels(exit, body_end);
        self.lower_stmt(body);
        self.pop_loop_labels(saved_break, saved_continue);

        self.emit_label(body_end);
        if let Some(post) = post {
            let res = self.lower_expr(post);
            let _ = self.rvalue(res);
        }
        self.emit(Inst::Br { target: start });
        self.emit_label(exit);

        self.scopes.leave();
    }

    fn push_loop_labels(&mut self, break_label: Name, continue_label: Name) -> (Option<Name>, Option<Name>) {
        let ctx = self.fn_ctx();
        (
            ctx.break_label.replace(break_label),
            ctx.continue_label.replace(continue_label),
        )
    }

    fn pop_loop_labels(&mut self, saved_break: Option<Name>, saved_continue: Option<Name>) {
        let ctx = self.fn_ctx();
        ctx.break_label = saved_break;
        ctx.continue_label = saved_continue;
    }

    fn lower_return(&mut self, value: Option<ExprId>, pos: Pos) {
        let ret_cty = self.fn_ctx().ret_cty.clone();
        match value {
            None => {
                if !ret_cty.is_void() {
                    self.report(diag::return_mismatch(pos, false));
                }
                self.emit(Inst::Ret { value: None });
            }
            Some(e) => {
                if ret_cty.is_void() {
                    self.report(diag::return_mismatch(pos, true));
                    let res = self.lower_expr(e);
                    let _ = self.rvalue(res);
                    self.emit(Inst::Ret { value: None });
                    return;
                }
                let Some((cty, v)) = self.lower_and_rvalue(e) else {
                    self.emit(Inst::Ret { value: None });
                    return;
                };
                match self.convert(v, &cty, &ret_cty, pos) {
                    Some(converted) => {
                        self.emit(Inst::Ret { value: Some(converted) });
                    }
                    None => {
                        self.report(diag::invalid_initializer(pos, "return", &ret_cty, &cty));
                        self.emit(Inst::Ret { value: None });
                    }
                }
            }
        }
    }

    // Labels and goto

    /// The IR label for a source label, creating the mapping on first
    /// mention (labels may be targeted before they are lowered).
    fn goto_target(&mut self, source: Name) -> Name {
        if let Some(label) = self.func.as_ref().and_then(|f| f.labels.get(&source)) {
            return *label;
        }
        let label = self.fresh_label();
        self.fn_ctx().labels.insert(source, label);
        label
    }

    fn lower_labeled(&mut self, label: Token, inner: &Stmt) {
        let previous = self
            .func
            .as_ref()
            .and_then(|f| f.defined_labels.get(&label.text).copied());
        if let Some(previous) = previous {
            let text = self.text(label).to_owned();
            self.report(diag::label_redefinition(label.pos, &text, previous));
        } else {
            self.fn_ctx().defined_labels.insert(label.text, label.pos);
            let target = self.goto_target(label.text);
            self.emit_label(target);
        }
        self.lower_stmt(inner);
    }

    // Switch

    /// The switch instruction goes out first with an empty case table and
    /// the exit label as its pending default; case/default statements
    /// patch it in place while the body lowers.
    fn lower_switch(&mut self, cond: ExprId, body: &Stmt) {
        let cond_pos = self.tu.exprs.pos(cond);
        let value = match self.lower_and_rvalue(cond) {
            Some((cty, v)) if cty.is_integer() => {
                let promoted = self.promote(&cty);
                match self.convert(v, &cty, &promoted, cond_pos) {
                    Some(v) => v,
                    None => IrConst::int(0, self.target.sint.clone()).into(),
                }
            }
            Some((cty, _)) => {
                self.report(diag::invalid_condition(cond_pos, "switch", &cty));
                IrConst::int(0, self.target.sint.clone()).into()
            }
            None => IrConst::int(0, self.target.sint.clone()).into(),
        };

        let exit = self.fresh_label();
        let inst = self.emit(Inst::Switch {
            value,
            cases: Vec::new(),
            default: exit,
        });

        let saved_break = self.fn_ctx().break_label.replace(exit);
        self.fn_ctx().switches.push(SwitchCtx {
            inst,
            seen: FxHashSet::default(),
            has_default: false,
            default_pos: None,
        });

        self.lower_stmt(body);

        self.fn_ctx().switches.pop();
        self.fn_ctx().break_label = saved_break;

        // No default seen: the pending default already names the exit.
        self.emit_label(exit);
    }

    fn lower_case(&mut self, value: ExprId, inner: &Stmt, pos: Pos) {
        if self.func.as_ref().is_none_or(|f| f.switches.is_empty()) {
            self.report(diag::outside_construct(pos, "case"));
            self.lower_stmt(inner);
            return;
        }

        let Some(n) = self.eval_const_int(value) else {
            self.report(diag::invalid_case(pos));
            self.lower_stmt(inner);
            return;
        };

        let (inst, duplicate) = {
            let ctx = self.fn_ctx();
            let sw = ctx
                .switches
                .last_mut()
                .unwrap_or_else(|| panic!("case outside switch survived the guard"));
            (sw.inst, !sw.seen.insert(n))
        };
        if duplicate {
            self.report(diag::duplicate_case(pos, n));
            self.lower_stmt(inner);
            return;
        }

        let label = self.fresh_label();
        let mut patched = self.stream.get(inst).clone();
        if let Inst::Switch { cases, .. } = &mut patched {
            cases.push((n, label));
        }
        self.stream.rewrite(inst, patched);

        self.emit_label(label);
        self.lower_stmt(inner);
    }

    fn lower_default(&mut self, inner: &Stmt, pos: Pos) {
        if self.func.as_ref().is_none_or(|f| f.switches.is_empty()) {
            self.report(diag::outside_construct(pos, "default"));
            self.lower_stmt(inner);
            return;
        }

        let (inst, previous) = {
            let ctx = self.fn_ctx();
            let sw = ctx
                .switches
                .last_mut()
                .unwrap_or_else(|| panic!("default outside switch survived the guard"));
            if sw.has_default {
                (sw.inst, sw.default_pos)
            } else {
                sw.has_default = true;
                sw.default_pos = Some(pos);
                (sw.inst, None)
            }
        };
        if let Some(previous) = previous {
            self.report(
                Diagnostic::error(ErrorCode::E3113, pos)
                    .with_message("multiple `default` labels in one switch")
                    .with_previous(previous),
            );
            self.lower_stmt(inner);
            return;
        }

        let label = self.fresh_label();
        let mut patched = self.stream.get(inst).clone();
        if let Inst::Switch { default, .. } = &mut patched {
            *default = label;
        }
        self.stream.rewrite(inst, patched);

        self.emit_label(label);
        self.lower_stmt(inner);
    }
}

//! Declaration lowering: tags, enumerators, locals, globals, functions.
//!
//! Tag and enumerator side effects ride on type resolution
//! (`resolve_type`), so a bare `struct S { ... };` only needs its type
//! resolved. Variables split by scope: locals allocate a stack slot at
//! the entry prelude, globals become module entries whose initializers
//! must fold to constants. `static` locals get global storage under a
//! uniquified name.

use crust_ast::types::{ArraySize, CType, StorageClass, TypeKind};
use crust_ast::{Declaration, Pos, Token};
use crust_diagnostic as diag;
use crust_ir::{Global, Inst, IrConst, IrValue, IrVar};

use crate::context::Sema;
use crate::lower::init::InitOutcome;
use crate::scope::{Symbol, SymbolKind};

impl Sema<'_> {
    // Local declarations

    pub(crate) fn lower_local_decl(&mut self, decl: &Declaration) {
        let pos = decl.pos;
        let resolved = self.resolve_type(&decl.ty, pos);

        // Tag-only declaration: resolution already declared the tag and
        // any enumerators.
        let Some(name_tok) = decl.name else {
            return;
        };
        if matches!(resolved.storage, StorageClass::Typedef) {
            return;
        }
        if resolved.is_function() {
            self.declare_function(name_tok, &resolved);
            return;
        }
        if matches!(resolved.storage, StorageClass::Static) {
            self.lower_static_local(&resolved, name_tok, decl);
            return;
        }

        let src = self.text(name_tok).to_owned();
        let ir = self.ir_type_of(&resolved, pos);
        let storage = self.storage_name(&src);
        let slot = IrVar::new(storage, ir.ptr_to());
        let alloca_id = self.emit_alloca(slot.clone());

        let symbol = Symbol {
            token: name_tok,
            external_name: storage,
            kind: SymbolKind::Local,
            cty: resolved.clone(),
            ir_type: ir,
            ir_ptr: slot.clone(),
            const_value: None,
            alloca_id: Some(alloca_id),
        };
        let sid = match self.scopes.declare(symbol) {
            Ok(sid) => sid,
            Err(previous) => {
                self.report(diag::redefinition(name_tok.pos, &src, previous.pos));
                return;
            }
        };

        let Some(init) = &decl.init else {
            return;
        };

        // Inferred-length arrays learn their extent from the
        // initializer; the symbol and its alloca are retrofitted before
        // any store goes through them.
        let cty = if matches!(&*resolved.kind, TypeKind::Array { size: ArraySize::None, .. }) {
            let len = self.infer_array_len(init);
            let TypeKind::Array { elem, .. } = &*resolved.kind else {
                unreachable!();
            };
            let mut patched_cty = elem.array_of(ArraySize::Fixed(len));
            patched_cty.quals = resolved.quals;
            let patched_ir = self.ir_type_of(&patched_cty, pos);
            let patched_slot = IrVar::new(storage, patched_ir.ptr_to());
            self.stream
                .rewrite(alloca_id, Inst::Alloca { dest: patched_slot.clone() });
            let sym = self.scopes.symbol_mut(sid);
            sym.cty = patched_cty.clone();
            sym.ir_type = patched_ir;
            sym.ir_ptr = patched_slot;
            patched_cty
        } else {
            resolved
        };

        let dest: IrValue = self.scopes.symbol(sid).ir_ptr.clone().into();
        let outcome = self.lower_local_init(&dest, &cty, init, pos);

        // A `const` scalar with a folded arithmetic initializer becomes a
        // known constant; addresses never do.
        if cty.is_const() {
            if let InitOutcome::Constant(c @ (IrConst::Int { .. } | IrConst::Float { .. })) =
                outcome
            {
                self.scopes.symbol_mut(sid).const_value = Some(c);
            }
        }
    }

    /// A `static` local: global storage under a uniquified name, visible
    /// only through the local symbol.
    fn lower_static_local(&mut self, resolved: &CType, name_tok: Token, decl: &Declaration) {
        let src = self.text(name_tok).to_owned();
        let unique = self.storage_name(&src);
        self.define_global_object(resolved, name_tok, unique, decl);
    }

    // Global declarations

    pub(crate) fn lower_global_decl(&mut self, decl: &Declaration) {
        let pos = decl.pos;
        let resolved = self.resolve_type(&decl.ty, pos);

        let Some(name_tok) = decl.name else {
            return;
        };
        if matches!(resolved.storage, StorageClass::Typedef) {
            return;
        }
        if resolved.is_function() {
            self.declare_function(name_tok, &resolved);
            return;
        }

        let src = self.text(name_tok).to_owned();

        // Redeclaration is permitted iff the types match and no previous
        // definition carried an initializer.
        if let Some(sid) = self.scopes.lookup_local(name_tok.text) {
            let existing = self.scopes.symbol(sid).clone();
            let resolved_cty = self.with_inferred_length(&resolved, decl);
            let ir = self.ir_type_of(&resolved_cty, pos);
            let compatible = existing.kind == SymbolKind::Global && existing.ir_type == ir;
            let already_defined = self
                .module
                .global(existing.external_name)
                .is_some_and(|g| g.is_defined);
            if !compatible || (already_defined && decl.init.is_some()) {
                self.report(diag::redefinition(name_tok.pos, &src, existing.token.pos));
                return;
            }
            if let Some(init) = &decl.init {
                let outcome = self.lower_global_init(&resolved_cty, init, pos);
                self.apply_global_init(existing.external_name, &src, outcome, pos);
                if resolved_cty.is_const() {
                    self.cache_global_const(sid);
                }
            }
            return;
        }

        self.define_global_object(&resolved, name_tok, name_tok.text, decl);
    }

    /// Create the module global and its symbol; shared by file-scope
    /// globals and `static` locals (whose storage is global either way).
    fn define_global_object(
        &mut self,
        resolved: &CType,
        name_tok: Token,
        external: crust_ast::Name,
        decl: &Declaration,
    ) {
        let pos = decl.pos;
        let src = self.text(name_tok).to_owned();
        let cty = self.with_inferred_length(resolved, decl);
        let ir = self.ir_type_of(&cty, pos);

        self.module.globals.push(Global {
            name: external,
            ty: ir.clone(),
            init: IrConst::zero(&ir, &self.module.types),
            is_defined: false,
        });

        let symbol = Symbol {
            token: name_tok,
            external_name: external,
            kind: SymbolKind::Global,
            cty: cty.clone(),
            ir_type: ir.clone(),
            ir_ptr: IrVar::new(external, ir.ptr_to()),
            const_value: None,
            alloca_id: None,
        };
        let sid = match self.scopes.declare(symbol) {
            Ok(sid) => sid,
            Err(previous) => {
                self.report(diag::redefinition(name_tok.pos, &src, previous.pos));
                return;
            }
        };

        if let Some(init) = &decl.init {
            let outcome = self.lower_global_init(&cty, init, pos);
            self.apply_global_init(external, &src, outcome, pos);
            if cty.is_const() {
                self.cache_global_const(sid);
            }
        }
    }

    /// Retrofit an inferred array length from the initializer.
    fn with_inferred_length(&mut self, resolved: &CType, decl: &Declaration) -> CType {
        if let TypeKind::Array { elem, size: ArraySize::None } = &*resolved.kind {
            if let Some(init) = &decl.init {
                let len = self.infer_array_len(init);
                let mut patched = elem.array_of(ArraySize::Fixed(len));
                patched.quals = resolved.quals;
                patched.storage = resolved.storage;
                return patched;
            }
        }
        resolved.clone()
    }

    fn apply_global_init(
        &mut self,
        external: crust_ast::Name,
        src: &str,
        outcome: InitOutcome,
        pos: Pos,
    ) {
        match outcome {
            InitOutcome::Constant(c) => {
                if let Some(global) = self.module.globals.iter_mut().find(|g| g.name == external) {
                    global.init = c;
                    global.is_defined = true;
                }
            }
            InitOutcome::Runtime => {
                self.report(diag::global_initializer_not_constant(pos, src));
            }
            InitOutcome::Error => {}
        }
    }

    /// Cache a `const`-qualified global's arithmetic constant on its
    /// symbol so later uses fold without a load.
    fn cache_global_const(&mut self, sid: crate::scope::SymbolId) {
        let external = self.scopes.symbol(sid).external_name;
        let value = self
            .module
            .global(external)
            .filter(|g| g.is_defined)
            .map(|g| g.init.clone());
        if let Some(c @ (IrConst::Int { .. } | IrConst::Float { .. })) = value {
            self.scopes.symbol_mut(sid).const_value = Some(c);
        }
    }

    // Functions

    /// Declare (or re-declare) a function symbol. Re-declarations are
    /// permitted iff the IR function types are equal.
    pub(crate) fn declare_function(&mut self, name_tok: Token, cty: &CType) {
        let ir = self.ir_type_of(cty, name_tok.pos);

        if let Some(sid) = self.scopes.lookup(name_tok.text) {
            let existing = self.scopes.symbol(sid);
            if existing.kind == SymbolKind::Function && existing.ir_type == ir {
                return;
            }
            let src = self.text(name_tok).to_owned();
            let previous = existing.token.pos;
            self.report(diag::redefinition(name_tok.pos, &src, previous));
            return;
        }

        let symbol = Symbol {
            token: name_tok,
            external_name: name_tok.text,
            kind: SymbolKind::Function,
            cty: cty.clone(),
            ir_type: ir.clone(),
            ir_ptr: IrVar::new(name_tok.text, ir.ptr_to()),
            const_value: None,
            alloca_id: None,
        };
        if let Err(previous) = self.scopes.declare(symbol) {
            let src = self.text(name_tok).to_owned();
            self.report(diag::redefinition(name_tok.pos, &src, previous.pos));
        }
    }
}

//! AST → IR lowering.
//!
//! [`lower`] is the entry point: it walks the translation unit's
//! external declarations, lowering functions and globals into the
//! module. Functions that produced no diagnostics are CFG-finalized and
//! validated; a validator failure is a compiler bug and aborts.
//!
//! # Pipeline Position
//!
//! ```text
//! Lex/Preprocess → Parse → **lower** → optimizer / code generation
//! ```

mod decl;
mod expr;
mod init;
mod literal;
mod stmt;

use crust_ast::{ExternalDecl, FunctionDef, StmtKind, StringInterner, TranslationUnit, TypeKind};
use crust_diagnostic as diag;
use crust_diagnostic::Diagnostic;
use crust_ir::{Inst, InstStream, IrFunction, IrType, IrVar, Module, Target};
use tracing::debug;

use crate::context::{FnCtx, Sema};
use crate::scope::{Symbol, SymbolKind};

/// The lowered module together with everything the core had to say
/// about the input.
pub struct LowerResult {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lower a translation unit to an IR module.
///
/// This is the main entry point for semantic analysis. Each call is
/// self-contained: the context lives for exactly one translation unit.
///
/// # Arguments
///
/// - `tu`: The parsed translation unit (typedefs already substituted).
/// - `target`: The architecture record.
/// - `module_name`: Name stamped on the produced module.
/// - `interner`: Shared string interner for identifiers and generated
///   names.
pub fn lower(
    tu: &TranslationUnit,
    target: &Target,
    module_name: &str,
    interner: &StringInterner,
) -> LowerResult {
    let mut sema = Sema::new(tu, target, module_name, interner);

    for decl in &tu.decls {
        match decl {
            ExternalDecl::Function(def) => sema.lower_function_def(def),
            ExternalDecl::Decl(d) => sema.lower_global_decl(d),
        }
    }

    crate::cfg::sort_globals(&mut sema.module);

    debug!(
        functions = sema.module.functions.len(),
        globals = sema.module.globals.len(),
        errors = sema.sink.error_count(),
        "lowered translation unit"
    );
    LowerResult {
        module: sema.module,
        diagnostics: sema.sink.into_vec(),
    }
}

impl Sema<'_> {
    /// Lower one function definition: declare the symbol, lower the body
    /// in the parameter scope, resolve pending gotos, then finalize and
    /// validate when the function produced no diagnostics.
    fn lower_function_def(&mut self, def: &FunctionDef) {
        let name_text = self.text(def.name).to_owned();
        let _span = tracing::debug_span!("lower_function", name = %name_text).entered();

        let pos = def.pos;
        let resolved = self.resolve_type(&def.ty, pos);
        let TypeKind::Function { ret, params, variadic } = &*resolved.kind else {
            panic!("function definition `{name_text}` with non-function type");
        };
        let ret_cty = ret.clone();
        let params = params.clone();
        let is_variadic = *variadic;

        // Only one definition per name.
        if let Some(previous) = self.function_defs.get(&def.name.text).copied() {
            self.report(diag::redefinition(def.name.pos, &name_text, previous));
            return;
        }
        self.declare_function(def.name, &resolved);
        self.function_defs.insert(def.name.text, def.name.pos);

        let fn_ir = self.ir_type_of(&resolved, pos);
        let (ret_ir, param_irs) = match &fn_ir {
            IrType::Function { ret, params, .. } => ((**ret).clone(), params.clone()),
            _ => panic!("function `{name_text}` mapped to non-function IR type"),
        };

        let watermark = self.sink.len();
        self.stream = InstStream::new();
        self.func = Some(FnCtx::new(def.name.text, ret_cty.clone(), ret_ir.clone()));
        self.scopes.enter();

        // Parameters: an incoming value each, stored into addressable
        // stack slots in the entry prelude.
        let mut param_vars = Vec::with_capacity(params.len());
        for (param, ir) in params.iter().zip(&param_irs) {
            let Some(ptok) = param.name else {
                panic!("unnamed parameter in definition of `{name_text}`");
            };
            let incoming = IrVar::new(ptok.text, ir.clone());
            param_vars.push(incoming.clone());

            let ptext = self.text(ptok).to_owned();
            let storage = self.storage_name(&ptext);
            let slot = IrVar::new(storage, ir.ptr_to());
            let alloca_id = self.emit_alloca(slot.clone());
            self.emit(Inst::Store { addr: slot.clone().into(), value: incoming.into() });

            let symbol = Symbol {
                token: ptok,
                external_name: storage,
                kind: SymbolKind::Local,
                cty: param.ty.clone(),
                ir_type: ir.clone(),
                ir_ptr: slot,
                const_value: None,
                alloca_id: Some(alloca_id),
            };
            if let Err(previous) = self.scopes.declare(symbol) {
                self.report(diag::redefinition(ptok.pos, &ptext, previous.pos));
            }
        }

        // The body's items share the parameter scope.
        let StmtKind::Compound(items) = &def.body.kind else {
            panic!("function body of `{name_text}` is not a compound statement");
        };
        for item in items {
            self.lower_block_item(item);
        }

        // Queued gotos resolve against the labels the body defined.
        let ctx = self
            .func
            .take()
            .unwrap_or_else(|| panic!("function context lost while lowering `{name_text}`"));
        for tok in &ctx.gotos {
            if !ctx.defined_labels.contains_key(&tok.text) {
                let text = self.text(*tok).to_owned();
                self.report(diag::undeclared_label(tok.pos, &text));
            }
        }

        self.scopes.leave();

        let stream = std::mem::take(&mut self.stream);
        let clean = self.sink.len() == watermark;
        let body = if clean {
            crate::cfg::finalize(stream.finalize(), &ret_ir, &self.module.types)
        } else {
            // A function with diagnostics is neither finalized nor
            // validated; keep the raw stream for inspection.
            stream.finalize()
        };

        let func = IrFunction {
            name: def.name.text,
            ty: fn_ir,
            params: param_vars,
            is_variadic,
            body,
        };
        if clean {
            if let Err(err) = crate::validate::validate_function(&func, &self.module) {
                panic!("IR validation failed for `{name_text}`: {err}");
            }
        }
        self.module.functions.push(func);
    }
}

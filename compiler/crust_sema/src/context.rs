//! The generation context.
//!
//! One mutable [`Sema`] is threaded through the whole recursive walk: it
//! owns the module under construction, the symbol environment, the
//! diagnostic sink, the current function's instruction stream, and the
//! fresh-name counters. Read-only inputs (translation unit, interner,
//! target) are borrowed for the pass.

use crust_ast::{Name, Pos, StringInterner, Token, TranslationUnit};
use crust_diagnostic::{Diagnostic, DiagnosticSink};
use crust_ir::{Inst, InstId, InstStream, IrType, IrVar, Module, Target};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::scope::ScopeStack;

/// Per-switch lowering state.
pub(crate) struct SwitchCtx {
    /// The emitted `switch` instruction, patched as cases appear.
    pub inst: InstId,
    /// Case values already taken.
    pub seen: FxHashSet<i64>,
    pub has_default: bool,
    /// Position of the first `default`, for duplicate reports.
    pub default_pos: Option<Pos>,
}

/// Per-function lowering state.
pub(crate) struct FnCtx {
    pub name: Name,
    pub ret_cty: crust_ast::CType,
    pub ret_ir: IrType,
    pub break_label: Option<Name>,
    pub continue_label: Option<Name>,
    /// Innermost-last stack of open switches.
    pub switches: Vec<SwitchCtx>,
    /// Source label name → IR label, created on first mention.
    pub labels: FxHashMap<Name, Name>,
    /// Source labels actually lowered, with their positions.
    pub defined_labels: FxHashMap<Name, Pos>,
    /// Every `goto` seen, checked once the body is complete.
    pub gotos: Vec<Token>,
}

impl FnCtx {
    pub fn new(name: Name, ret_cty: crust_ast::CType, ret_ir: IrType) -> Self {
        FnCtx {
            name,
            ret_cty,
            ret_ir,
            break_label: None,
            continue_label: None,
            switches: Vec::new(),
            labels: FxHashMap::default(),
            defined_labels: FxHashMap::default(),
            gotos: Vec::new(),
        }
    }
}

/// State for the AST-to-IR lowering pass.
pub struct Sema<'a> {
    /// Source translation unit (read-only).
    pub(crate) tu: &'a TranslationUnit,
    /// Shared string interner.
    pub(crate) interner: &'a StringInterner,
    /// Architecture record.
    pub(crate) target: &'a Target,
    /// Module being built.
    pub(crate) module: Module,
    /// Collected diagnostics, in source-walk order.
    pub(crate) sink: DiagnosticSink,
    /// Symbol environment.
    pub(crate) scopes: ScopeStack,
    /// Current function's instruction stream.
    pub(crate) stream: InstStream,
    /// Current function's control-flow state, if inside one.
    pub(crate) func: Option<FnCtx>,
    /// Function definitions already seen, by name.
    pub(crate) function_defs: FxHashMap<Name, Pos>,

    // Fresh-name counters, monotone for the whole module.
    next_temp: u32,
    next_label: u32,
    next_anon: u32,
}

impl<'a> Sema<'a> {
    pub fn new(
        tu: &'a TranslationUnit,
        target: &'a Target,
        module_name: &str,
        interner: &'a StringInterner,
    ) -> Self {
        Sema {
            tu,
            interner,
            target,
            module: Module::new(module_name, target.name),
            sink: DiagnosticSink::new(),
            scopes: ScopeStack::new(),
            stream: InstStream::new(),
            func: None,
            function_defs: FxHashMap::default(),
            next_temp: 0,
            next_label: 0,
            next_anon: 0,
        }
    }

    /// Report a diagnostic.
    pub(crate) fn report(&mut self, diag: Diagnostic) {
        self.sink.push(diag);
    }

    /// The string behind a token.
    pub(crate) fn text(&self, token: Token) -> &'static str {
        self.interner.lookup(token.text)
    }

    /// Fresh IR temporary of the given type.
    pub(crate) fn temp(&mut self, ty: IrType) -> IrVar {
        let n = self.next_temp;
        self.next_temp += 1;
        let name = self.interner.intern_owned(format!("t{n}"));
        IrVar::new(name, ty)
    }

    /// Fresh storage name derived from a source identifier.
    pub(crate) fn storage_name(&mut self, base: &str) -> Name {
        let n = self.next_temp;
        self.next_temp += 1;
        self.interner.intern_owned(format!("{base}.{n}"))
    }

    /// Fresh IR label.
    pub(crate) fn fresh_label(&mut self) -> Name {
        let n = self.next_label;
        self.next_label += 1;
        self.interner.intern_owned(format!("L{n}"))
    }

    /// Fresh anonymous global/tag name with the given prefix.
    pub(crate) fn fresh_anon(&mut self, prefix: &str) -> Name {
        let n = self.next_anon;
        self.next_anon += 1;
        self.interner.intern_owned(format!("{prefix}{n}"))
    }

    /// Append an instruction at the build cursor.
    pub(crate) fn emit(&mut self, inst: Inst) -> InstId {
        self.stream.push(inst)
    }

    /// Append an alloca to the entry prelude.
    pub(crate) fn emit_alloca(&mut self, dest: IrVar) -> InstId {
        self.stream.push_alloca(Inst::Alloca { dest })
    }

    /// Emit a label instruction for an already-generated label name.
    pub(crate) fn emit_label(&mut self, name: Name) {
        self.emit(Inst::Label { name });
    }

    /// The current function's state.
    ///
    /// # Panics
    /// Panics outside a function body; statement lowering only runs
    /// inside one.
    pub(crate) fn fn_ctx(&mut self) -> &mut FnCtx {
        self.func
            .as_mut()
            .unwrap_or_else(|| panic!("statement lowering outside a function"))
    }
}

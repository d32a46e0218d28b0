//! The symbol environment: nested scopes of symbols and tags.
//!
//! Scopes live in a flat slab and are never destroyed — leaving a scope
//! just moves the `current` index to the parent, so symbols stay
//! reachable through the IR that references them. Each scope keeps two
//! independent name maps: ordinary identifiers and struct/union/enum
//! tags, which C namespaces separately.

use crust_ast::types::{CType, TagUid};
use crust_ast::{Name, Token};
use crust_ir::{InstId, IrConst, IrType, IrVar};
use rustc_hash::FxHashMap;

/// What a symbol denotes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SymbolKind {
    Local,
    Global,
    Function,
    EnumConst,
}

/// Handle to a symbol in the environment's slab.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared identifier.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// The declaring token (name + position).
    pub token: Token,
    /// Name in the emitted IR (storage slot or global/function name).
    pub external_name: Name,
    pub kind: SymbolKind,
    pub cty: CType,
    pub ir_type: IrType,
    /// Pointer to the symbol's storage; for functions, the function's
    /// global at pointer-to-function type.
    pub ir_ptr: IrVar,
    /// Cached constant value: enumerators always, `const`-qualified
    /// scalars when their initializer folded.
    pub const_value: Option<IrConst>,
    /// The symbol's `alloca`, kept for inferred-length retrofitting.
    pub alloca_id: Option<InstId>,
}

/// One struct/union/enum tag, possibly still incomplete.
#[derive(Clone, Debug)]
pub struct Tag {
    pub name: Name,
    pub uid: TagUid,
    /// Declaring token position, for redefinition reports.
    pub token: Option<Token>,
    /// Resolved C type; `None` while forward-declared.
    pub cty: Option<CType>,
    /// Corresponding IR type; `None` while forward-declared.
    pub ir_type: Option<IrType>,
    /// The layout slot in the module's type map (records only).
    pub record: Option<crust_ir::RecordId>,
}

struct Scope {
    symbols: FxHashMap<Name, SymbolId>,
    tags: FxHashMap<Name, TagUid>,
    parent: Option<usize>,
}

impl Scope {
    fn new(parent: Option<usize>) -> Self {
        Scope {
            symbols: FxHashMap::default(),
            tags: FxHashMap::default(),
            parent,
        }
    }
}

/// Stack of scopes plus the symbol and tag slabs.
///
/// A context-wide `uid → Tag` registry guarantees unique IR type
/// identity across scopes even when inner scopes shadow a tag name.
pub struct ScopeStack {
    scopes: Vec<Scope>,
    current: usize,
    symbols: Vec<Symbol>,
    tags: Vec<Tag>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Create the environment with the file scope open.
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::new(None)],
            current: 0,
            symbols: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Open a nested scope.
    pub fn enter(&mut self) {
        let parent = self.current;
        self.scopes.push(Scope::new(Some(parent)));
        self.current = self.scopes.len() - 1;
    }

    /// Close the current scope, returning to its parent.
    ///
    /// # Panics
    /// Panics when called on the file scope.
    pub fn leave(&mut self) {
        self.current = self.scopes[self.current]
            .parent
            .unwrap_or_else(|| panic!("left the file scope"));
    }

    /// True while the file scope is current.
    pub fn at_file_scope(&self) -> bool {
        self.current == 0
    }

    /// Declare a symbol in the current scope.
    ///
    /// Fails with the previous declaration's token when the name is
    /// already bound in this scope.
    pub fn declare(&mut self, symbol: Symbol) -> Result<SymbolId, Token> {
        let name = symbol.token.text;
        if let Some(&existing) = self.scopes[self.current].symbols.get(&name) {
            return Err(self.symbols[existing.index()].token);
        }
        let id = SymbolId(
            u32::try_from(self.symbols.len())
                .unwrap_or_else(|_| panic!("symbol slab exceeded {} entries", u32::MAX)),
        );
        self.symbols.push(symbol);
        self.scopes[self.current].symbols.insert(name, id);
        Ok(id)
    }

    /// Look a name up through the scope chain.
    pub fn lookup(&self, name: Name) -> Option<SymbolId> {
        let mut at = Some(self.current);
        while let Some(idx) = at {
            if let Some(&id) = self.scopes[idx].symbols.get(&name) {
                return Some(id);
            }
            at = self.scopes[idx].parent;
        }
        None
    }

    /// Look a name up in the current scope only.
    pub fn lookup_local(&self, name: Name) -> Option<SymbolId> {
        self.scopes[self.current].symbols.get(&name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Register a new tag in the registry (not yet bound to a scope).
    pub fn new_tag(&mut self, name: Name, token: Option<Token>) -> TagUid {
        let uid = TagUid(
            u32::try_from(self.tags.len())
                .unwrap_or_else(|_| panic!("tag registry exceeded {} entries", u32::MAX)),
        );
        self.tags.push(Tag {
            name,
            uid,
            token,
            cty: None,
            ir_type: None,
            record: None,
        });
        uid
    }

    /// Bind a tag name in the current scope.
    pub fn bind_tag(&mut self, name: Name, uid: TagUid) {
        self.scopes[self.current].tags.insert(name, uid);
    }

    /// Look a tag up through the scope chain.
    pub fn lookup_tag(&self, name: Name) -> Option<TagUid> {
        let mut at = Some(self.current);
        while let Some(idx) = at {
            if let Some(&uid) = self.scopes[idx].tags.get(&name) {
                return Some(uid);
            }
            at = self.scopes[idx].parent;
        }
        None
    }

    /// Look a tag up in the current scope only.
    pub fn lookup_tag_local(&self, name: Name) -> Option<TagUid> {
        self.scopes[self.current].tags.get(&name).copied()
    }

    pub fn tag(&self, uid: TagUid) -> &Tag {
        &self.tags[uid.0 as usize]
    }

    pub fn tag_mut(&mut self, uid: TagUid) -> &mut Tag {
        &mut self.tags[uid.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crust_ast::Pos;

    fn sym(token: Token) -> Symbol {
        Symbol {
            token,
            external_name: token.text,
            kind: SymbolKind::Local,
            cty: CType::int(),
            ir_type: IrType::I32,
            ir_ptr: IrVar::new(token.text, IrType::I32.ptr_to()),
            const_value: None,
            alloca_id: None,
        }
    }

    #[test]
    fn declare_and_lookup() {
        let mut scopes = ScopeStack::new();
        let tok = Token::new(Name::EMPTY, Pos::UNKNOWN);

        let id = scopes.declare(sym(tok)).unwrap();
        assert_eq!(scopes.lookup(Name::EMPTY), Some(id));
        assert_eq!(scopes.lookup_local(Name::EMPTY), Some(id));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut scopes = ScopeStack::new();
        let tok = Token::new(Name::EMPTY, Pos::new(Name::EMPTY, 1, 1));

        scopes.declare(sym(tok)).unwrap();
        let err = scopes.declare(sym(tok));
        assert!(err.is_err());
    }

    #[test]
    fn inner_scope_shadows_and_restores() {
        let mut scopes = ScopeStack::new();
        let tok = Token::new(Name::EMPTY, Pos::UNKNOWN);

        let outer = scopes.declare(sym(tok)).unwrap();
        scopes.enter();
        // Same name is free in the inner scope.
        let inner = scopes.declare(sym(tok)).unwrap();
        assert_eq!(scopes.lookup(Name::EMPTY), Some(inner));
        scopes.leave();
        assert_eq!(scopes.lookup(Name::EMPTY), Some(outer));
    }

    #[test]
    fn tags_are_namespaced_separately() {
        let mut scopes = ScopeStack::new();
        let tok = Token::new(Name::EMPTY, Pos::UNKNOWN);

        scopes.declare(sym(tok)).unwrap();
        assert_eq!(scopes.lookup_tag(Name::EMPTY), None);

        let uid = scopes.new_tag(Name::EMPTY, Some(tok));
        scopes.bind_tag(Name::EMPTY, uid);
        assert_eq!(scopes.lookup_tag(Name::EMPTY), Some(uid));
        // Symbol lookup is unaffected.
        assert!(scopes.lookup(Name::EMPTY).is_some());
    }
}

//! Scenario and property tests for the lowering core.
//!
//! The suite builds translation units by hand — the parser is an
//! external collaborator — and checks the lowered IR's structure, the
//! diagnostics, and the invariants the back-end relies on.

use crust_ast::types::{ArraySize, CType, Field, RecordType, TypeKind};
use crust_ast::{
    BinaryOp, BlockItem, Declaration, Designator, Expr, ExprId, ExprKind, ExternalDecl,
    FunctionDef, InitItem, Initializer, Name, Pos, Stmt, StmtKind, StringInterner, Token,
    TranslationUnit, UnaryOp,
};
use crust_ir::{Inst, IrConst, IrType, IrValue, Target};
use pretty_assertions::assert_eq;

use crate::lower::{lower, LowerResult};

/// Hand-built translation units, the way the parser would produce them.
struct Ast {
    tu: TranslationUnit,
    interner: StringInterner,
}

impl Ast {
    fn new() -> Self {
        Ast {
            tu: TranslationUnit::new(),
            interner: StringInterner::new(),
        }
    }

    fn tok(&self, text: &str) -> Token {
        Token::new(self.interner.intern(text), Pos::new(Name::EMPTY, 1, 1))
    }

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.tu.exprs.alloc(Expr::new(kind, Pos::new(Name::EMPTY, 1, 1)))
    }

    fn int(&mut self, text: &str) -> ExprId {
        let tok = self.tok(text);
        self.expr(ExprKind::IntLit(tok))
    }

    fn string(&mut self, quoted: &str) -> ExprId {
        let tok = self.tok(quoted);
        self.expr(ExprKind::StrLit(tok))
    }

    fn ident(&mut self, name: &str) -> ExprId {
        let tok = self.tok(name);
        self.expr(ExprKind::Ident(tok))
    }

    fn bin(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, left, right })
    }

    fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    fn assign(&mut self, op: Option<BinaryOp>, target: ExprId, value: ExprId) -> ExprId {
        self.expr(ExprKind::Assign { op, target, value })
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt::new(kind, Pos::new(Name::EMPTY, 1, 1))
    }

    fn ret(value: Option<ExprId>) -> BlockItem {
        BlockItem::Stmt(Self::stmt(StmtKind::Return(value)))
    }

    fn decl(&self, name: &str, ty: CType, init: Option<Initializer>) -> Declaration {
        Declaration {
            ty,
            name: Some(self.tok(name)),
            init,
            pos: Pos::new(Name::EMPTY, 1, 1),
        }
    }

    fn fn_type(ret: CType, params: &[(&str, CType)], ast: &Ast) -> CType {
        CType::new(TypeKind::Function {
            ret,
            params: params
                .iter()
                .map(|(name, ty)| crust_ast::types::Param {
                    name: Some(ast.tok(name)),
                    ty: ty.clone(),
                })
                .collect(),
            variadic: false,
        })
    }

    fn func(&mut self, name: &str, ret: CType, params: &[(&str, CType)], body: Vec<BlockItem>) {
        let ty = Self::fn_type(ret, params, self);
        let def = FunctionDef {
            ty,
            name: self.tok(name),
            body: Self::stmt(StmtKind::Compound(body)),
            pos: Pos::new(Name::EMPTY, 1, 1),
        };
        self.tu.decls.push(ExternalDecl::Function(def));
    }

    fn global(&mut self, decl: Declaration) {
        self.tu.decls.push(ExternalDecl::Decl(decl));
    }

    fn tag_decl(&mut self, ty: CType) {
        self.tu.decls.push(ExternalDecl::Decl(Declaration {
            ty,
            name: None,
            init: None,
            pos: Pos::new(Name::EMPTY, 1, 1),
        }));
    }

    fn record(&self, tag: &str, fields: &[(&str, CType)], with_body: bool) -> CType {
        CType::new(TypeKind::Record(RecordType {
            tag: Some(self.tok(tag)),
            uid: None,
            fields: with_body.then(|| {
                fields
                    .iter()
                    .map(|(name, ty)| Field { name: self.tok(name), ty: ty.clone() })
                    .collect()
            }),
            is_union: false,
            packed: false,
        }))
    }

    fn lower(&self) -> LowerResult {
        lower(&self.tu, &Target::x86_64(), "test", &self.interner)
    }

    fn body_of<'r>(&self, result: &'r LowerResult, name: &str) -> &'r [Inst] {
        let name = self.interner.intern(name);
        &result
            .module
            .function(name)
            .unwrap_or_else(|| panic!("no function `{name:?}` in module"))
            .body
    }
}

fn ret_const(inst: &Inst) -> Option<i64> {
    match inst {
        Inst::Ret { value: Some(IrValue::Const(c)) } => c.int_value(),
        _ => None,
    }
}

fn count<F: Fn(&Inst) -> bool>(body: &[Inst], pred: F) -> usize {
    body.iter().filter(|i| pred(i)).count()
}

// Concrete scenarios

#[test]
fn return_constant() {
    // int f(void) { return 0; }
    let mut ast = Ast::new();
    let zero = ast.int("0");
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(zero))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.module.functions.len(), 1);

    let body = ast.body_of(&result, "f");
    assert_eq!(body.len(), 1);
    assert_eq!(ret_const(&body[0]), Some(0));
}

#[test]
fn conditional_return() {
    // int g(int x) { if (x) return 1; return 0; }
    let mut ast = Ast::new();
    let x = ast.ident("x");
    let one = ast.int("1");
    let zero = ast.int("0");
    let then_stmt = Ast::stmt(StmtKind::Return(Some(one)));
    ast.func(
        "g",
        CType::int(),
        &[("x", CType::int())],
        vec![
            BlockItem::Stmt(Ast::stmt(StmtKind::If {
                cond: x,
                then_stmt: Box::new(then_stmt),
                else_stmt: None,
            })),
            Ast::ret(Some(zero)),
        ],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());

    let body = ast.body_of(&result, "g");
    assert_eq!(count(body, |i| matches!(i, Inst::BrCond { .. })), 1);
    assert!(count(body, |i| matches!(i, Inst::Label { .. })) >= 2);
    assert_eq!(count(body, |i| matches!(i, Inst::Ret { .. })), 2);
}

#[test]
fn counting_loop() {
    // int h(void) { int s = 0; for (int i = 0; i < 10; ++i) s += i; return s; }
    let mut ast = Ast::new();
    let s_init = ast.int("0");
    let i_init = ast.int("0");
    let i_ref = ast.ident("i");
    let ten = ast.int("10");
    let cond = ast.bin(BinaryOp::Lt, i_ref, ten);
    let i_ref2 = ast.ident("i");
    let post = ast.unary(UnaryOp::PreInc, i_ref2);
    let s_ref = ast.ident("s");
    let i_ref3 = ast.ident("i");
    let add_assign = ast.assign(Some(BinaryOp::Add), s_ref, i_ref3);
    let s_ret = ast.ident("s");

    let loop_body = Ast::stmt(StmtKind::Expr(add_assign));
    let for_stmt = StmtKind::For {
        init: Some(Box::new(BlockItem::Decl(ast.decl(
            "i",
            CType::int(),
            Some(Initializer::Expr(i_init)),
        )))),
        cond: Some(cond),
        post: Some(post),
        body: Box::new(loop_body),
    };
    ast.func(
        "h",
        CType::int(),
        &[],
        vec![
            BlockItem::Decl(ast.decl("s", CType::int(), Some(Initializer::Expr(s_init)))),
            BlockItem::Stmt(Ast::stmt(for_stmt)),
            Ast::ret(Some(s_ret)),
        ],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "h");
    // Pre-test loop: one conditional branch, a back edge, and the
    // alloca prelude property.
    assert_eq!(count(body, |i| matches!(i, Inst::BrCond { .. })), 1);
    let first_non_alloca = body
        .iter()
        .position(|i| !matches!(i, Inst::Alloca { .. }))
        .unwrap_or(0);
    assert!(body[first_non_alloca..]
        .iter()
        .all(|i| !matches!(i, Inst::Alloca { .. })));
}

#[test]
fn inferred_array_with_designator() {
    // int a[] = {[2] = 7, 4};
    let mut ast = Ast::new();
    let two = ast.int("2");
    let seven = ast.int("7");
    let four = ast.int("4");
    let init = Initializer::List(vec![
        InitItem {
            designators: vec![Designator::Index(two)],
            init: Initializer::Expr(seven),
        },
        InitItem { designators: vec![], init: Initializer::Expr(four) },
    ]);
    let decl = ast.decl("a", CType::int().array_of(ArraySize::None), Some(init));
    ast.global(decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());

    let a = result.module.global(ast.interner.intern("a")).unwrap();
    assert_eq!(a.ty, IrType::Array { elem: Box::new(IrType::I32), len: 4 });
    match &a.init {
        IrConst::Array { elems, .. } => {
            let values: Vec<i64> = elems.iter().filter_map(IrConst::int_value).collect();
            assert_eq!(values, vec![0, 0, 7, 4]);
        }
        other => panic!("expected constant array, got {other:?}"),
    }
}

#[test]
fn struct_designator_initializer() {
    // struct P { int x; int y; };  struct P p = { .y = 9 };
    let mut ast = Ast::new();
    let p_body = ast.record("P", &[("x", CType::int()), ("y", CType::int())], true);
    ast.tag_decl(p_body);

    let nine = ast.int("9");
    let init = Initializer::List(vec![InitItem {
        designators: vec![Designator::Field(ast.tok("y"))],
        init: Initializer::Expr(nine),
    }]);
    let p_ref = ast.record("P", &[], false);
    let decl = ast.decl("p", p_ref, Some(init));
    ast.global(decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let p = result.module.global(ast.interner.intern("p")).unwrap();
    match &p.init {
        IrConst::Record { fields, .. } => {
            let values: Vec<i64> = fields.iter().filter_map(IrConst::int_value).collect();
            // Two i32 fields need no padding: {x: 0, y: 9}.
            assert_eq!(values, vec![0, 9]);
        }
        other => panic!("expected constant record, got {other:?}"),
    }
}

#[test]
fn switch_with_cases_and_default() {
    // int main(void) { switch (2) { case 1: return 1; case 2: return 2;
    //                               default: return -1; } }
    let mut ast = Ast::new();
    let scrutinee = ast.int("2");
    let one = ast.int("1");
    let one_v = ast.int("1");
    let two = ast.int("2");
    let two_v = ast.int("2");
    let minus_one_lit = ast.int("1");
    let minus_one = ast.unary(UnaryOp::Neg, minus_one_lit);

    let case1 = Ast::stmt(StmtKind::Case {
        value: one,
        stmt: Box::new(Ast::stmt(StmtKind::Return(Some(one_v)))),
    });
    let case2 = Ast::stmt(StmtKind::Case {
        value: two,
        stmt: Box::new(Ast::stmt(StmtKind::Return(Some(two_v)))),
    });
    let default = Ast::stmt(StmtKind::Default(Box::new(Ast::stmt(StmtKind::Return(Some(
        minus_one,
    ))))));
    let switch = Ast::stmt(StmtKind::Switch {
        cond: scrutinee,
        body: Box::new(Ast::stmt(StmtKind::Compound(vec![
            BlockItem::Stmt(case1),
            BlockItem::Stmt(case2),
            BlockItem::Stmt(default),
        ]))),
    });
    ast.func("main", CType::int(), &[], vec![BlockItem::Stmt(switch)]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "main");
    let switch_inst = body
        .iter()
        .find_map(|i| match i {
            Inst::Switch { cases, default, .. } => Some((cases.clone(), *default)),
            _ => None,
        })
        .expect("switch instruction");
    let (cases, default_label) = switch_inst;
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].0, 1);
    assert_eq!(cases[1].0, 2);

    // The exit label is unreached but present, as the final label; the
    // default label is distinct from it.
    let last_label = body
        .iter()
        .rev()
        .find_map(|i| match i {
            Inst::Label { name } => Some(*name),
            _ => None,
        })
        .expect("exit label");
    assert_ne!(default_label, last_label);
    // Three explicit returns plus the implicit one in the exit block.
    assert_eq!(count(body, |i| matches!(i, Inst::Ret { .. })), 4);
}

// Boundary behaviors

#[test]
fn empty_translation_unit() {
    let ast = Ast::new();
    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    assert!(result.module.functions.is_empty());
    assert!(result.module.globals.is_empty());
}

#[test]
fn missing_return_gets_implicit_zero() {
    // int f(void) { }
    let mut ast = Ast::new();
    ast.func("f", CType::int(), &[], vec![]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    assert_eq!(ret_const(body.last().expect("nonempty body")), Some(0));
}

#[test]
fn void_function_gets_ret_void() {
    // void f(void) { }
    let mut ast = Ast::new();
    ast.func("f", CType::void(), &[], vec![]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    assert_eq!(body.last(), Some(&Inst::Ret { value: None }));
}

#[test]
fn forward_goto_resolves() {
    // void f(void) { goto end; end: ; }
    let mut ast = Ast::new();
    let goto = Ast::stmt(StmtKind::Goto(ast.tok("end")));
    let labeled = Ast::stmt(StmtKind::Labeled {
        label: ast.tok("end"),
        stmt: Box::new(Ast::stmt(StmtKind::Empty)),
    });
    ast.func(
        "f",
        CType::void(),
        &[],
        vec![BlockItem::Stmt(goto), BlockItem::Stmt(labeled)],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "f");
    let target = body
        .iter()
        .find_map(|i| match i {
            Inst::Br { target } => Some(*target),
            _ => None,
        })
        .expect("goto branch");
    assert!(body.iter().any(|i| matches!(i, Inst::Label { name } if *name == target)));
}

#[test]
fn switch_without_default_falls_to_exit() {
    // int f(int x) { switch (x) { case 1: break; } return 0; }
    let mut ast = Ast::new();
    let x = ast.ident("x");
    let one = ast.int("1");
    let zero = ast.int("0");
    let case1 = Ast::stmt(StmtKind::Case {
        value: one,
        stmt: Box::new(Ast::stmt(StmtKind::Break)),
    });
    let switch = Ast::stmt(StmtKind::Switch {
        cond: x,
        body: Box::new(Ast::stmt(StmtKind::Compound(vec![BlockItem::Stmt(case1)]))),
    });
    ast.func(
        "f",
        CType::int(),
        &[("x", CType::int())],
        vec![BlockItem::Stmt(switch), Ast::ret(Some(zero))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "f");
    let (default, case_label) = body
        .iter()
        .find_map(|i| match i {
            Inst::Switch { cases, default, .. } => Some((*default, cases[0].1)),
            _ => None,
        })
        .expect("switch instruction");
    assert_ne!(default, case_label);
    // The default target is the exit label, which exists in the body.
    assert!(body.iter().any(|i| matches!(i, Inst::Label { name } if *name == default)));
}

#[test]
fn inferred_array_length_three() {
    // int f(void) { int a[] = {1, 2, 3}; return 0; }
    let mut ast = Ast::new();
    let one = ast.int("1");
    let two = ast.int("2");
    let three = ast.int("3");
    let zero = ast.int("0");
    let init = Initializer::List(
        [one, two, three]
            .into_iter()
            .map(|e| InitItem { designators: vec![], init: Initializer::Expr(e) })
            .collect(),
    );
    let decl = ast.decl("a", CType::int().array_of(ArraySize::None), Some(init));
    ast.func(
        "f",
        CType::int(),
        &[],
        vec![BlockItem::Decl(decl), Ast::ret(Some(zero))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "f");
    let alloca_ty = body
        .iter()
        .find_map(|i| match i {
            Inst::Alloca { dest } => Some(dest.ty.clone()),
            _ => None,
        })
        .expect("array alloca");
    assert_eq!(
        alloca_ty,
        IrType::Array { elem: Box::new(IrType::I32), len: 3 }.ptr_to()
    );
}

#[test]
fn struct_designator_resumes_after_named_field() {
    // struct Q { int x; int y; int z; };  struct Q q = { .y = 1, 2 };
    let mut ast = Ast::new();
    let body = ast.record(
        "Q",
        &[("x", CType::int()), ("y", CType::int()), ("z", CType::int())],
        true,
    );
    ast.tag_decl(body);

    let one = ast.int("1");
    let two = ast.int("2");
    let init = Initializer::List(vec![
        InitItem {
            designators: vec![Designator::Field(ast.tok("y"))],
            init: Initializer::Expr(one),
        },
        InitItem { designators: vec![], init: Initializer::Expr(two) },
    ]);
    let q_ref = ast.record("Q", &[], false);
    let decl = ast.decl("q", q_ref, Some(init));
    ast.global(decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let q = result.module.global(ast.interner.intern("q")).unwrap();
    match &q.init {
        IrConst::Record { fields, .. } => {
            let values: Vec<i64> = fields.iter().filter_map(IrConst::int_value).collect();
            assert_eq!(values, vec![0, 1, 2]);
        }
        other => panic!("expected constant record, got {other:?}"),
    }
}

// Constant folding and conversions

#[test]
fn arithmetic_folds_to_constant() {
    // int f(void) { return 2 + 3 * 4; }
    let mut ast = Ast::new();
    let two = ast.int("2");
    let three = ast.int("3");
    let four = ast.int("4");
    let mul = ast.bin(BinaryOp::Mul, three, four);
    let add = ast.bin(BinaryOp::Add, two, mul);
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(add))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    assert_eq!(body.len(), 1);
    assert_eq!(ret_const(&body[0]), Some(14));
}

#[test]
fn sizeof_is_a_constant() {
    // int f(void) { return sizeof(int); }
    let mut ast = Ast::new();
    let size = ast.expr(ExprKind::SizeofType(CType::int()));
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(size))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    assert_eq!(body.len(), 1);
    assert_eq!(ret_const(&body[0]), Some(4));
}

#[test]
fn short_circuit_with_constant_left() {
    // int f(int x) { return 0 && x; }
    let mut ast = Ast::new();
    let zero = ast.int("0");
    let x = ast.ident("x");
    let and = ast.bin(BinaryOp::LogicalAnd, zero, x);
    ast.func("f", CType::int(), &[("x", CType::int())], vec![Ast::ret(Some(and))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    // No branching: the left operand decided.
    assert_eq!(count(body, |i| matches!(i, Inst::BrCond { .. })), 0);
    assert!(body.iter().any(|i| ret_const(i) == Some(0)));
}

#[test]
fn short_circuit_runtime_uses_join_slot() {
    // int f(int a, int b) { return a && b; }
    let mut ast = Ast::new();
    let a = ast.ident("a");
    let b = ast.ident("b");
    let and = ast.bin(BinaryOp::LogicalAnd, a, b);
    ast.func(
        "f",
        CType::int(),
        &[("a", CType::int()), ("b", CType::int())],
        vec![Ast::ret(Some(and))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let body = ast.body_of(&result, "f");
    assert_eq!(count(body, |i| matches!(i, Inst::BrCond { .. })), 1);
    // Two arms store into the slot; the join loads it.
    assert!(count(body, |i| matches!(i, Inst::Store { .. })) >= 2);
}

#[test]
fn constant_ternary_takes_one_arm() {
    // int f(void) { return 1 ? 2 : 3; }
    let mut ast = Ast::new();
    let one = ast.int("1");
    let two = ast.int("2");
    let three = ast.int("3");
    let ternary = ast.expr(ExprKind::Ternary { cond: one, then_expr: two, else_expr: three });
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(ternary))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    assert_eq!(body.len(), 1);
    assert_eq!(ret_const(&body[0]), Some(2));
}

#[test]
fn enum_constants_count_from_previous() {
    // enum E { A, B = 5, C };  int f(void) { return C; }
    let mut ast = Ast::new();
    let five = ast.int("5");
    let e = CType::new(TypeKind::Enum(crust_ast::types::EnumType {
        tag: Some(ast.tok("E")),
        uid: None,
        enumerators: Some(vec![
            crust_ast::types::Enumerator { name: ast.tok("A"), value: None },
            crust_ast::types::Enumerator { name: ast.tok("B"), value: Some(five) },
            crust_ast::types::Enumerator { name: ast.tok("C"), value: None },
        ]),
    }));
    ast.tag_decl(e);
    let c = ast.ident("C");
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(c))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let body = ast.body_of(&result, "f");
    assert_eq!(ret_const(&body[0]), Some(6));
}

#[test]
fn const_global_folds_at_use() {
    // const int n = 10;  int f(void) { return n; }
    let mut ast = Ast::new();
    let ten = ast.int("10");
    let n_ty = CType::int().with_quals(crust_ast::types::Qualifiers::CONST);
    let decl = ast.decl("n", n_ty, Some(Initializer::Expr(ten)));
    ast.global(decl);
    let n = ast.ident("n");
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(n))]);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let body = ast.body_of(&result, "f");
    // No load: the cached constant flows straight into the return.
    assert_eq!(count(body, |i| matches!(i, Inst::Load { .. })), 0);
    assert_eq!(ret_const(&body[0]), Some(10));
}

#[test]
fn bool_initializer_is_one_bit() {
    // _Bool b = 5;
    let mut ast = Ast::new();
    let five = ast.int("5");
    let decl = ast.decl("b", CType::bool_(), Some(Initializer::Expr(five)));
    ast.global(decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty());
    let b = result.module.global(ast.interner.intern("b")).unwrap();
    assert_eq!(b.init, IrConst::int(1, IrType::I1));
}

// Pointers, members, strings

#[test]
fn pointer_parameter_indexing() {
    // int f(int *p) { return p[1]; }
    let mut ast = Ast::new();
    let p = ast.ident("p");
    let one = ast.int("1");
    let index = ast.expr(ExprKind::Index { base: p, index: one });
    ast.func(
        "f",
        CType::int(),
        &[("p", CType::int().pointer_to())],
        vec![Ast::ret(Some(index))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let body = ast.body_of(&result, "f");
    assert!(count(body, |i| matches!(i, Inst::GetElemPtr { .. })) >= 1);
}

#[test]
fn member_access_skips_padding_fields() {
    // struct S { char c; int i; };  int f(struct S *s) { return s->i; }
    let mut ast = Ast::new();
    let s_body = ast.record("S", &[("c", CType::char_()), ("i", CType::int())], true);
    ast.tag_decl(s_body);

    let s = ast.ident("s");
    let member = ast.expr(ExprKind::Member { base: s, field: ast.tok("i"), arrow: true });
    let s_ref = ast.record("S", &[], false);
    ast.func(
        "f",
        CType::int(),
        &[("s", s_ref.pointer_to())],
        vec![Ast::ret(Some(member))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let body = ast.body_of(&result, "f");
    // Layout is {c, __pad(3), i}: the named field lands at index 2, and
    // its byte offset (4) is a multiple of its alignment.
    let field = body
        .iter()
        .find_map(|i| match i {
            Inst::GetMemberPtr { field, .. } => Some(*field),
            _ => None,
        })
        .expect("member pointer");
    assert_eq!(field, 2);
}

#[test]
fn string_literal_global_sorts_before_user() {
    // char *s = "hi";
    let mut ast = Ast::new();
    let hi = ast.string("\"hi\"");
    let decl = ast.decl("s", CType::char_().pointer_to(), Some(Initializer::Expr(hi)));
    ast.global(decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    assert_eq!(result.module.globals.len(), 2);
    // Topological order: the anonymous string first, then `s`
    // referencing it.
    match &result.module.globals[0].init {
        IrConst::Str { data, .. } => assert_eq!(data, b"hi\0"),
        other => panic!("expected string data first, got {other:?}"),
    }
    let s = &result.module.globals[1];
    assert_eq!(s.name, ast.interner.intern("s"));
    match &s.init {
        IrConst::GlobalAddr { name, .. } => {
            assert_eq!(*name, result.module.globals[0].name);
        }
        other => panic!("expected global address, got {other:?}"),
    }
}

#[test]
fn address_of_global_in_initializer() {
    // int x = 1;  int *p = &x;
    let mut ast = Ast::new();
    let one = ast.int("1");
    let x_decl = ast.decl("x", CType::int(), Some(Initializer::Expr(one)));
    ast.global(x_decl);
    let x = ast.ident("x");
    let addr = ast.unary(UnaryOp::AddrOf, x);
    let p_decl = ast.decl("p", CType::int().pointer_to(), Some(Initializer::Expr(addr)));
    ast.global(p_decl);

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let names: Vec<Name> = result.module.globals.iter().map(|g| g.name).collect();
    let x_idx = names.iter().position(|&n| n == ast.interner.intern("x")).unwrap();
    let p_idx = names.iter().position(|&n| n == ast.interner.intern("p")).unwrap();
    assert!(x_idx < p_idx);
}

// Diagnostics

#[test]
fn undeclared_identifier_reported() {
    // int f(void) { return g; }
    let mut ast = Ast::new();
    let g = ast.ident("g");
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(g))]);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3001);
}

#[test]
fn local_redefinition_reported() {
    // int f(void) { int x; int x; return 0; }
    let mut ast = Ast::new();
    let zero = ast.int("0");
    let d1 = ast.decl("x", CType::int(), None);
    let d2 = ast.decl("x", CType::int(), None);
    ast.func(
        "f",
        CType::int(),
        &[],
        vec![BlockItem::Decl(d1), BlockItem::Decl(d2), Ast::ret(Some(zero))],
    );

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3003);
    assert!(result.diagnostics[0].previous.is_some());
}

#[test]
fn break_outside_loop_reported() {
    // void f(void) { break; }
    let mut ast = Ast::new();
    ast.func(
        "f",
        CType::void(),
        &[],
        vec![BlockItem::Stmt(Ast::stmt(StmtKind::Break))],
    );

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3114);
}

#[test]
fn duplicate_case_reported() {
    // switch (x) { case 1: break; case 1: break; }
    let mut ast = Ast::new();
    let x = ast.ident("x");
    let one_a = ast.int("1");
    let one_b = ast.int("1");
    let case_a = Ast::stmt(StmtKind::Case {
        value: one_a,
        stmt: Box::new(Ast::stmt(StmtKind::Break)),
    });
    let case_b = Ast::stmt(StmtKind::Case {
        value: one_b,
        stmt: Box::new(Ast::stmt(StmtKind::Break)),
    });
    let switch = Ast::stmt(StmtKind::Switch {
        cond: x,
        body: Box::new(Ast::stmt(StmtKind::Compound(vec![
            BlockItem::Stmt(case_a),
            BlockItem::Stmt(case_b),
        ]))),
    });
    ast.func(
        "f",
        CType::void(),
        &[("x", CType::int())],
        vec![BlockItem::Stmt(switch)],
    );

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3113);
}

#[test]
fn unresolved_goto_reported() {
    // void f(void) { goto nowhere; }
    let mut ast = Ast::new();
    let goto = Ast::stmt(StmtKind::Goto(ast.tok("nowhere")));
    ast.func("f", CType::void(), &[], vec![BlockItem::Stmt(goto)]);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3002);
}

#[test]
fn division_by_constant_zero_reported_not_fatal() {
    // int f(void) { return 1 / 0; }
    let mut ast = Ast::new();
    let one = ast.int("1");
    let zero = ast.int("0");
    let div = ast.bin(BinaryOp::Div, one, zero);
    ast.func("f", CType::int(), &[], vec![Ast::ret(Some(div))]);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3201);
    // Lowering continued: the function is still in the module.
    assert_eq!(result.module.functions.len(), 1);
}

#[test]
fn non_constant_global_initializer_reported() {
    // int x;  int y = x;
    let mut ast = Ast::new();
    let x_decl = ast.decl("x", CType::int(), None);
    ast.global(x_decl);
    let x = ast.ident("x");
    let y_decl = ast.decl("y", CType::int(), Some(Initializer::Expr(x)));
    ast.global(y_decl);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3104);
}

#[test]
fn void_return_mismatch_reported() {
    // void f(void) { return 1; }
    let mut ast = Ast::new();
    let one = ast.int("1");
    ast.func("f", CType::void(), &[], vec![Ast::ret(Some(one))]);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3116);
}

#[test]
fn tag_redefinition_reported() {
    // struct T { int a; };  struct T { int a; };
    let mut ast = Ast::new();
    let t1 = ast.record("T", &[("a", CType::int())], true);
    let t2 = ast.record("T", &[("a", CType::int())], true);
    ast.tag_decl(t1);
    ast.tag_decl(t2);

    let result = ast.lower();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, crust_diagnostic::ErrorCode::E3004);
}

// Idempotence

#[test]
fn lowering_twice_is_structurally_equal() {
    fn build() -> Ast {
        let mut ast = Ast::new();
        let x = ast.ident("x");
        let one = ast.int("1");
        let add = ast.bin(BinaryOp::Add, x, one);
        ast.func("f", CType::int(), &[("x", CType::int())], vec![Ast::ret(Some(add))]);
        ast
    }

    let a = build();
    let first = a.lower();
    let second = a.lower();

    assert_eq!(first.module.functions.len(), second.module.functions.len());
    for (f, s) in first.module.functions.iter().zip(&second.module.functions) {
        assert_eq!(f.body, s.body);
    }
}

// Self-referential records

#[test]
fn recursive_struct_through_pointer() {
    // struct Node { struct Node *next; int v; };
    // int f(struct Node *n) { return n->next->v; }
    let mut ast = Ast::new();
    let node_fwd = ast.record("Node", &[], false);
    let node_body = ast.record(
        "Node",
        &[("next", node_fwd.pointer_to()), ("v", CType::int())],
        true,
    );
    ast.tag_decl(node_body);

    let n = ast.ident("n");
    let next = ast.expr(ExprKind::Member { base: n, field: ast.tok("next"), arrow: true });
    let v = ast.expr(ExprKind::Member { base: next, field: ast.tok("v"), arrow: true });
    let node_ref = ast.record("Node", &[], false);
    ast.func(
        "f",
        CType::int(),
        &[("n", node_ref.pointer_to())],
        vec![Ast::ret(Some(v))],
    );

    let result = ast.lower();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let body = ast.body_of(&result, "f");
    assert_eq!(count(body, |i| matches!(i, Inst::GetMemberPtr { .. })), 2);
}

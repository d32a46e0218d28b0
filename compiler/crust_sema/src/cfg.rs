//! Control-flow finalization.
//!
//! After a body is built, the linear instruction list is partitioned
//! into basic blocks (split at labels and after terminators), blocks
//! unreachable from the entry are pruned, fall-through edges become
//! explicit branches, and the terminal block receives the implicit
//! return — the typed zero of the return type, which subsumes C99's
//! `main` behavior. Finally the module's globals are topologically
//! sorted by initializer reference.

use crust_ast::Name;
use crust_ir::{Inst, IrConst, IrType, Module, TypeMap};
use rustc_hash::FxHashMap;

/// One basic block: an optional leading label and its instructions
/// (label instruction included).
struct Block {
    label: Option<Name>,
    insts: Vec<Inst>,
}

impl Block {
    fn terminated(&self) -> bool {
        self.insts.last().is_some_and(Inst::is_terminator)
    }
}

/// Partition a linear instruction list into basic blocks.
fn split_blocks(insts: Vec<Inst>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut current: Option<Block> = None;

    for inst in insts {
        if let Inst::Label { name } = &inst {
            if let Some(done) = current.take() {
                blocks.push(done);
            }
            current = Some(Block { label: Some(*name), insts: vec![inst] });
            continue;
        }

        let terminator = inst.is_terminator();
        let block = current.get_or_insert_with(|| Block { label: None, insts: Vec::new() });
        block.insts.push(inst);
        if terminator {
            blocks.push(current.take().unwrap_or_else(|| unreachable!()));
        }
    }
    if let Some(done) = current.take() {
        blocks.push(done);
    }
    blocks
}

/// Successor block indices, fall-through included.
fn successors(blocks: &[Block], index: usize, by_label: &FxHashMap<Name, usize>) -> Vec<usize> {
    let block = &blocks[index];
    let Some(last) = block.insts.last() else {
        return (index + 1 < blocks.len()).then_some(index + 1).into_iter().collect();
    };
    match last {
        Inst::Ret { .. } => Vec::new(),
        Inst::Br { target } => by_label.get(target).copied().into_iter().collect(),
        Inst::BrCond { then_label, else_label, .. } => {
            let mut out: Vec<usize> = Vec::with_capacity(2);
            out.extend(by_label.get(then_label).copied());
            out.extend(by_label.get(else_label).copied());
            out
        }
        Inst::Switch { cases, default, .. } => {
            let mut out: Vec<usize> = Vec::with_capacity(cases.len() + 1);
            for (_, label) in cases {
                out.extend(by_label.get(label).copied());
            }
            out.extend(by_label.get(default).copied());
            out
        }
        _ => (index + 1 < blocks.len()).then_some(index + 1).into_iter().collect(),
    }
}

/// Finalize a function body.
///
/// Prunes blocks unreachable from the entry — keeping the final block
/// when it begins with a label, since it is the function's landing
/// block (a switch's unreached exit label stays present). Fall-through
/// edges become explicit `br`s so every block ends in exactly one
/// terminator, and the terminal block gets the implicit return.
pub(crate) fn finalize(insts: Vec<Inst>, ret_ty: &IrType, types: &TypeMap) -> Vec<Inst> {
    let implicit_ret = || Inst::Ret {
        value: (!ret_ty.is_void()).then(|| IrConst::zero(ret_ty, types).into()),
    };

    let mut blocks = split_blocks(insts);
    if blocks.is_empty() {
        return vec![implicit_ret()];
    }

    let by_label: FxHashMap<Name, usize> = blocks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.label.map(|l| (l, i)))
        .collect();

    // Reachability from the entry block.
    let mut reachable = vec![false; blocks.len()];
    let mut work = vec![0usize];
    while let Some(i) = work.pop() {
        if std::mem::replace(&mut reachable[i], true) {
            continue;
        }
        work.extend(successors(&blocks, i, &by_label));
    }

    // The physically-last labeled block survives as the landing block.
    let last = blocks.len() - 1;
    let keep: Vec<bool> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| reachable[i] || (i == last && b.label.is_some()))
        .collect();

    // Re-linearize, making fall-through explicit and terminating the
    // final block.
    let kept: Vec<usize> = (0..blocks.len()).filter(|&i| keep[i]).collect();
    tracing::trace!(
        blocks = blocks.len(),
        kept = kept.len(),
        "pruned control-flow graph"
    );
    let mut out = Vec::new();
    for (pos, &i) in kept.iter().enumerate() {
        let terminated = blocks[i].terminated();
        out.append(&mut blocks[i].insts);
        if !terminated {
            let next_label = kept
                .get(pos + 1)
                .and_then(|&j| blocks.get(j).and_then(|b| b.label));
            match next_label {
                Some(label) => out.push(Inst::Br { target: label }),
                None => out.push(implicit_ret()),
            }
        }
    }
    out
}

/// Topologically sort the module's globals so that a constant
/// initializer never references a global emitted after it. Stable for
/// independent globals.
pub(crate) fn sort_globals(module: &mut Module) {
    fn collect_refs(c: &IrConst, out: &mut Vec<Name>) {
        match c {
            IrConst::GlobalAddr { name, .. } => out.push(*name),
            IrConst::Array { elems, .. } => {
                for e in elems {
                    collect_refs(e, out);
                }
            }
            IrConst::Record { fields, .. } => {
                for f in fields {
                    collect_refs(f, out);
                }
            }
            _ => {}
        }
    }

    let by_name: FxHashMap<Name, usize> = module
        .globals
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name, i))
        .collect();

    let n = module.globals.len();
    let mut order: Vec<usize> = Vec::with_capacity(n);
    // 0 = unvisited, 1 = visiting, 2 = done.
    let mut state = vec![0u8; n];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if state[root] != 0 {
            continue;
        }
        stack.push((root, 0));
        state[root] = 1;
        while let Some((i, edge)) = stack.pop() {
            let mut refs = Vec::new();
            collect_refs(&module.globals[i].init, &mut refs);
            if edge < refs.len() {
                stack.push((i, edge + 1));
                if let Some(&j) = by_name.get(&refs[edge]) {
                    if state[j] == 0 {
                        state[j] = 1;
                        stack.push((j, 0));
                    }
                }
            } else {
                state[i] = 2;
                order.push(i);
            }
        }
    }

    let mut reordered = Vec::with_capacity(n);
    let mut taken = vec![false; n];
    for i in order {
        if !std::mem::replace(&mut taken[i], true) {
            reordered.push(i);
        }
    }

    let mut globals: Vec<Option<crust_ir::Global>> =
        std::mem::take(&mut module.globals).into_iter().map(Some).collect();
    module.globals = reordered
        .into_iter()
        .filter_map(|i| globals[i].take())
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crust_ast::StringInterner;
    use crust_ir::IrValue;

    fn label(interner: &StringInterner, text: &str) -> Name {
        interner.intern(text)
    }

    fn ret0() -> Inst {
        Inst::Ret {
            value: Some(IrValue::Const(IrConst::int(0, IrType::I32))),
        }
    }

    #[test]
    fn empty_body_gets_implicit_return() {
        let types = TypeMap::new();
        let out = finalize(Vec::new(), &IrType::I32, &types);
        assert_eq!(out.len(), 1);
        match &out[0] {
            Inst::Ret { value: Some(IrValue::Const(c)) } => assert!(c.is_zero_int()),
            other => panic!("expected ret 0, got {other:?}"),
        }
    }

    #[test]
    fn void_body_gets_ret_void() {
        let types = TypeMap::new();
        let out = finalize(Vec::new(), &IrType::Void, &types);
        assert_eq!(out, vec![Inst::Ret { value: None }]);
    }

    #[test]
    fn unreachable_unlabeled_block_is_pruned() {
        let types = TypeMap::new();
        let insts = vec![ret0(), ret0()];
        let out = finalize(insts, &IrType::I32, &types);
        assert_eq!(out, vec![ret0()]);
    }

    #[test]
    fn final_labeled_block_survives_unreached() {
        let interner = StringInterner::new();
        let exit = label(&interner, "L0");
        let types = TypeMap::new();
        let insts = vec![ret0(), Inst::Label { name: exit }];
        let out = finalize(insts, &IrType::I32, &types);
        // ret, label, implicit ret
        assert_eq!(out.len(), 3);
        assert!(matches!(out[1], Inst::Label { .. }));
        assert!(matches!(out[2], Inst::Ret { .. }));
    }

    #[test]
    fn fall_through_becomes_explicit_branch() {
        let interner = StringInterner::new();
        let next = label(&interner, "L1");
        let types = TypeMap::new();
        let insts = vec![
            Inst::Br { target: next },
            Inst::Label { name: next },
        ];
        // The entry block branches; the labeled block falls off the end.
        let out = finalize(insts, &IrType::Void, &types);
        assert_eq!(
            out,
            vec![
                Inst::Br { target: next },
                Inst::Label { name: next },
                Inst::Ret { value: None },
            ]
        );
    }

    #[test]
    fn finalize_is_idempotent() {
        let interner = StringInterner::new();
        let next = label(&interner, "L1");
        let types = TypeMap::new();
        let insts = vec![Inst::Br { target: next }, Inst::Label { name: next }];
        let once = finalize(insts, &IrType::I32, &types);
        let twice = finalize(once.clone(), &IrType::I32, &types);
        assert_eq!(once, twice);
    }
}

//! Per-method emission state.
//!
//! Registers and variable bindings live for one function: both restart
//! at every method boundary. The label counters do not — each label kind
//! numbers monotonically through the whole unit, so a label name is
//! unique in the module even though register names are not.

use rustc_hash::FxHashMap;

use crate::ty::{LlvmTy, Operand};

/// Stack slot of a local or parameter: the operand naming the slot and
/// the type stored in it.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub ptr: Operand,
    pub ty: LlvmTy,
}

/// `if_N` / `else_N` / `fi_N`
pub(crate) struct IfLabels {
    pub then: String,
    pub els: String,
    pub end: String,
}

/// `while_N` / `do_N` / `done_N`
pub(crate) struct LoopLabels {
    pub head: String,
    pub body: String,
    pub exit: String,
}

/// `outOfBounds_N` / `withinBounds_N`
pub(crate) struct BoundsLabels {
    pub fail: String,
    pub ok: String,
}

/// `true_N` / `false_N` / `end_N`
pub(crate) struct AndLabels {
    pub rhs: String,
    pub skip: String,
    pub merge: String,
}

/// Mutable generation context for the function currently being emitted.
#[derive(Debug, Default)]
pub(crate) struct EmitState {
    regs: u32,
    vars: FxHashMap<String, Binding>,
    ifs: u32,
    loops: u32,
    bounds: u32,
    ands: u32,
    /// Name of the basic block instructions are currently appended to.
    /// Phi nodes read it to name their predecessors.
    block: String,
}

impl EmitState {
    /// Start a fresh function: registers renumber from `%_0` and the
    /// variable scope empties. Label counters keep counting.
    pub(crate) fn begin_function(&mut self) {
        self.regs = 0;
        self.vars.clear();
        self.block.clear();
    }

    pub(crate) fn fresh_reg(&mut self) -> Operand {
        let reg = self.regs;
        self.regs += 1;
        Operand::Reg(reg)
    }

    pub(crate) fn bind(&mut self, name: &str, ptr: Operand, ty: LlvmTy) {
        self.vars.insert(name.to_owned(), Binding { ptr, ty });
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Binding> {
        self.vars.get(name)
    }

    pub(crate) fn if_labels(&mut self) -> IfLabels {
        let n = self.ifs;
        self.ifs += 1;
        IfLabels {
            then: format!("if_{n}"),
            els: format!("else_{n}"),
            end: format!("fi_{n}"),
        }
    }

    pub(crate) fn loop_labels(&mut self) -> LoopLabels {
        let n = self.loops;
        self.loops += 1;
        LoopLabels {
            head: format!("while_{n}"),
            body: format!("do_{n}"),
            exit: format!("done_{n}"),
        }
    }

    pub(crate) fn bounds_labels(&mut self) -> BoundsLabels {
        let n = self.bounds;
        self.bounds += 1;
        BoundsLabels {
            fail: format!("outOfBounds_{n}"),
            ok: format!("withinBounds_{n}"),
        }
    }

    pub(crate) fn and_labels(&mut self) -> AndLabels {
        let n = self.ands;
        self.ands += 1;
        AndLabels {
            rhs: format!("true_{n}"),
            skip: format!("false_{n}"),
            merge: format!("end_{n}"),
        }
    }

    pub(crate) fn set_block(&mut self, label: &str) {
        label.clone_into(&mut self.block);
    }

    pub(crate) fn block(&self) -> &str {
        &self.block
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registers_restart_per_method() {
        let mut state = EmitState::default();
        assert_eq!(state.fresh_reg(), Operand::Reg(0));
        assert_eq!(state.fresh_reg(), Operand::Reg(1));

        state.begin_function();
        assert_eq!(state.fresh_reg(), Operand::Reg(0));
    }

    #[test]
    fn label_counters_span_the_whole_unit() {
        let mut state = EmitState::default();
        assert_eq!(state.if_labels().then, "if_0");
        assert_eq!(state.loop_labels().exit, "done_0");

        state.begin_function();
        assert_eq!(state.if_labels().els, "else_1");
        assert_eq!(state.loop_labels().head, "while_1");
        assert_eq!(state.bounds_labels().fail, "outOfBounds_0");
        assert_eq!(state.and_labels().merge, "end_0");
    }

    #[test]
    fn bindings_are_scoped_to_one_method() {
        let mut state = EmitState::default();
        state.bind("x", Operand::Name("x".into()), LlvmTy::I32);
        assert_eq!(state.lookup("x").unwrap().ty, LlvmTy::I32);

        state.begin_function();
        assert!(state.lookup("x").is_none());
    }
}

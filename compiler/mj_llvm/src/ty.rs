//! Typed IR values.
//!
//! Every value produced while emitting a method is a [`Value`]: an IR
//! type plus the operand that holds it. Instructions are rendered from
//! these pairs at the last moment, which keeps type adjustments explicit
//! in one place instead of scattered through the emitter, and makes a
//! cast between identical representations impossible to emit.

use std::fmt;

use mj_ir::TypeTag;

/// The four value representations the language lowers to: `i32` for
/// integers, `i1` for booleans, `i32*` for arrays (length word first)
/// and `i8*` for object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LlvmTy {
    I1,
    I32,
    I32Ptr,
    I8Ptr,
}

impl LlvmTy {
    pub(crate) fn of(ty: &TypeTag) -> Self {
        match ty {
            TypeTag::Int => LlvmTy::I32,
            TypeTag::Boolean => LlvmTy::I1,
            TypeTag::IntArray => LlvmTy::I32Ptr,
            TypeTag::Class(_) => LlvmTy::I8Ptr,
        }
    }
}

impl fmt::Display for LlvmTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LlvmTy::I1 => "i1",
            LlvmTy::I32 => "i32",
            LlvmTy::I32Ptr => "i32*",
            LlvmTy::I8Ptr => "i8*",
        })
    }
}

/// Where a value lives: a numbered virtual register, an immediate, or a
/// named register such as `%this` or an `alloca` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    Reg(u32),
    Const(i32),
    Bool(bool),
    Name(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(n) => write!(f, "%_{n}"),
            Operand::Const(n) => write!(f, "{n}"),
            Operand::Bool(b) => write!(f, "{b}"),
            Operand::Name(name) => write!(f, "%{name}"),
        }
    }
}

/// A typed operand. Displays as the instruction-argument form
/// `<type> <operand>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Value {
    pub ty: LlvmTy,
    pub op: Operand,
}

impl Value {
    pub(crate) fn new(ty: LlvmTy, op: Operand) -> Self {
        Value { ty, op }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.op)
    }
}

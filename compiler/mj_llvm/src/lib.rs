//! LLVM IR text emission for the minijava compiler.
//!
//! This crate is the second compiler pass. Given a parsed unit and the
//! symbol table built by `mj_types`, [`generate`] streams a complete
//! textual IR module to a writer: one dispatch-table global per class,
//! a fixed runtime prelude (`calloc`, `printf`, `exit` plus the print
//! and bounds-abort helpers), the entry function, then one function per
//! user method.
//!
//! Emission replays the symbol-table pass's traversal and pops one
//! call-site queue entry per method invocation; any disagreement between
//! the two traversals surfaces as a [`CodegenError`], not as bad output.

mod codegen;
mod error;
mod runtime;
mod state;
mod ty;

pub use codegen::generate;
pub use error::CodegenError;

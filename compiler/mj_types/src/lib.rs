//! Symbol-table construction for the minijava compiler.
//!
//! This crate is the first of the two compiler passes. It walks a parsed
//! unit once and produces:
//! - a [`ClassTable`] of per-class layouts: field byte offsets, method
//!   dispatch slots and instance sizes, with inherited entries copied from
//!   the parent so lookups never chase the hierarchy
//! - a [`CallSiteQueue`] recording, for every method invocation in
//!   traversal order, the static class of its receiver
//!
//! The code generator replays the same traversal and consumes the queue one
//! entry per invocation, so the two passes must enumerate sub-expressions
//! in exactly the same order.

mod builder;
mod error;
mod layout;
mod report;

pub use builder::{build, CallSiteQueue, SymbolTable};
pub use error::SymbolError;
pub use layout::{byte_size, ClassLayout, ClassTable, Field, MethodSignature, POINTER_SIZE};
pub use report::offsets_report;

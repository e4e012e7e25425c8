//! Syntax tree for the minijava source language.
//!
//! This crate contains the data structures shared by every phase of the
//! compiler:
//! - The program tree produced by the parser (`Program` down to `Expr`)
//! - `TypeTag`, the closed set of source types, used both as the tree's
//!   type annotation and as the layout pass's type vocabulary
//!
//! All node kinds are closed enums so each phase can traverse the tree with
//! exhaustive matches. Nodes are plain owned data; phases read them and
//! never mutate them.

pub mod ast;

pub use ast::{
    BinaryOp, ClassDecl, Expr, MainClass, MethodDecl, Program, Statement, TypeTag, VarDecl,
};

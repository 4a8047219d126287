//! Syntax tree for the FTFY interpreter.
//!
//! The source is parsed by an external esprima-compatible parser; this crate
//! lowers its JSON output into a closed [`NodeKind`] enum, keeps the source
//! text around for rendering, and hosts the tree passes that run before
//! evaluation.
//!
//! # Modules
//!
//! - [`ast`]: node model and operators
//! - [`location`]: positions and shared source text
//! - [`lower`]: JSON lowering and syntax errors
//! - [`visitor`]: read-only and rebuilding traversals
//! - [`instrument`]: the line recorder

pub mod ast;
pub mod instrument;
pub mod location;
pub mod lower;
pub mod visitor;

pub use ast::{
    AssignOp, BinaryOp, DeclarationKind, Function, FunctionFlavor, Literal, LogicalOp, Node,
    NodeKind, UnaryOp, UpdateOp, MACRO_PREFIX,
};
pub use instrument::instrument;
pub use location::{Location, Position, SourceText};
pub use lower::{Ast, LowerError, SyntaxError};
pub use visitor::{Fold, Visitor};

//! Core data structures for sparsemerge (pure Rust)
//!
//! Sparse matrices with type-erased values, the built-in type catalog with
//! its cast table, and binary operators.

pub mod arena;
pub mod binop;
pub mod cast;
pub mod error;
pub mod matrix;
pub mod types;

pub use arena::ValueArena;
pub use binop::{BinaryFn, BinaryOp, Opcode};
pub use cast::{cast_factory, cast_fn, copy_user_user, read_element, write_element, CastFn};
pub use error::{Error, Result};
pub use matrix::{Orientation, SparseMatrix, VectorView};
pub use types::{Bool, Element, Scalar, Type, TypeCode, UserType};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

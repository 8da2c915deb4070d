//! Filter query language for list endpoints.
//!
//! Syntax:
//!   field op value          - comparison, op is one of eq, ne, gt, lt
//!   expr1 and expr2         - AND
//!   expr1 or expr2          - OR (no precedence; chains fold left)
//!   (expr)                  - grouping
//!
//! Fields and the type of their values come from a [`Schema`]; every literal
//! is validated and typed while compiling.

mod ast;
mod error;
mod lexer;
mod parser;
mod schema;
mod value;

pub use ast::*;
pub use error::CompileError;
pub use parser::compile;
pub use schema::{Schema, SchemaRegistry, TRACKING};
pub use value::Coercer;

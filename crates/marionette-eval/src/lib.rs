//! Expression evaluation for the marionette configuration language
//!
//! The parser (not part of this crate) produces an [`Expr`] tree; this crate
//! reduces it to a [`Value`] against a lexical [`Scope`]:
//! - Values and truthiness
//! - Numeric coercion shared by every arithmetic operator
//! - Arena-backed scope chains
//! - Expression nodes, child enumeration and tree-wide passes
//! - Operator semantics

mod coerce;
mod error;
mod eval;
mod expr;
mod scope;
mod value;

pub use coerce::*;
pub use error::*;
pub use eval::*;
pub use expr::*;
pub use scope::*;
pub use value::*;

//! Filter subsystem
//!
//! Turns the wire filter object into a native predicate in two steps:
//!
//! 1. [`FilterParser`] validates the wire shape into a [`FilterNode`] tree
//! 2. [`FilterCompiler`] lowers the tree into a [`NativePredicate`]
//!
//! # Compilation rules
//!
//! - Blank operands (`""`, `[]`, `[""]`, `null`) make a leaf a no-op
//! - Combinators drop no-op children and collapse to a lone child
//! - `id` path segments address the primary key `_id`
//! - Identifier and date fields receive typed operands

mod ast;
mod compiler;
mod errors;
mod native;
pub mod normalize;
mod parser;

pub use ast::{Combinator, CombinatorKind, FilterNode, FilterOperator, Predicate};
pub use compiler::FilterCompiler;
pub use errors::{FilterError, FilterResult};
pub use native::{Condition, FieldCondition, NativePredicate, Operand, Pattern};
pub use parser::{FilterParser, OperatorPolicy};

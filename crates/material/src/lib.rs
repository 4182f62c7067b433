//! Material predicates: which (material, variant) pairs belong to a craft type.
//!
//! # Invariants
//! - A predicate is always in its smallest shape: an empty set is
//!   [`MaterialPredicate::None`], a single element is `Single`/`SinglePair`.
//! - `Many` always holds at least two elements.
//! - Predicates are immutable; [`PredicateBuilder`] accumulates and normalises.

mod builder;
mod predicate;

pub use builder::PredicateBuilder;
pub use predicate::{MaterialPredicate, PredicateError};

//! Core verification engine for a refinement-typed language.
//!
//! The pipeline has three layers. [`entailment`] unwinds a typing context
//! into nested universal quantifiers around a constraint. [`horn`] resolves
//! the constraint's holes (unknown refinements) by predicate abstraction
//! over a finite candidate grammar. [`smt`] decides ground implications by
//! canonicalizing the constraint into obligations and discharging each one
//! with z3.
//!
//! All verdicts are conservative booleans: `true` only when every obligation
//! was actually proved, `false` on refutation, solver timeout or `unknown`.

pub mod constraint;
pub mod context;
pub mod dbg;
pub mod entailment;
mod format;
pub mod horn;
pub mod smt;

pub use crate::{
    constraint::{Bind, Constant, Constraint, Hole, Name, Obligation, Term, flat},
    context::{AbstractionType, BaseType, RefinedType, Type, TypingContext},
    entailment::{TypeBinderPolicy, entails, entails_with_policy},
    horn::{
        Assignment, HoleState, NameSupply, build_initial_assignment, fresh, hole_candidates,
        merge_assignments, possible_args, solve, wellformed, wellformed_horn,
    },
    smt::{Session, SmtConfig, Stats, Verdict},
};

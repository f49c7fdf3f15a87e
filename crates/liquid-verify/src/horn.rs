//! Horn-clause solving by predicate abstraction.
//!
//! Holes are resolved against a finite candidate grammar: for every hole we
//! enumerate all relational atoms `op(p, a)` where `op` ranges over the six
//! comparison operators, `p` over the hole's parameters and `a` over the
//! parameters plus a small pool of literals. Solving then runs a
//! greatest-fixpoint refinement: start from the full candidate set for every
//! hole and repeatedly drop candidates not entailed by the clause defining
//! them, under the current (still optimistic) assignment for every other
//! hole. Dropping candidates only weakens assignments, so once the sets are
//! stable the merged assignment is the weakest sound one the grammar admits
//! and the ground constraint can be handed to the bridge for a final
//! verdict.

use std::rc::Rc;

use liquid_common::bug;

use crate::{
    constraint::{Constraint, Hole, Name, Obligation, Term, flat},
    context::{AbstractionType, Type, TypingContext},
    smt::{Session, Verdict},
};

/// Monotone counter backing [`fresh`]. One supply per checking run keeps the
/// generated names unique and the runs reproducible.
#[derive(Debug, Default)]
pub struct NameSupply {
    next: usize,
}

impl NameSupply {
    pub fn fresh(&mut self) -> usize {
        self.next += 1;
        self.next
    }
}

/// Literals every candidate-argument slot offers besides the parameters.
const ARG_LITERALS: [Term; 4] = [
    Term::int(0),
    Term::int(1),
    Term::TRUE,
    Term::FALSE,
];

const QUALIFIER_RELATIONS: [&str; 6] = ["==", "!=", "<", "<=", ">", ">="];

/// Candidate set for one hole, keyed by its canonical parameter list.
#[derive(Clone, Debug)]
pub struct HoleState {
    pub params: Vec<(Term, Name)>,
    pub candidates: Vec<Term>,
}

/// Per-hole candidate sets, in discovery order. A plain vector keeps
/// iteration (and therefore solving) deterministic.
pub type Assignment = Vec<(Name, HoleState)>;

/// Instantiates the holes of a type against the given scope: each refinement
/// hole is replaced by a named hole whose parameters are the base-sorted
/// variables in scope (outermost first) followed by the type's own bound
/// variable, and the bound variable is renamed apart.
pub fn fresh(supply: &mut NameSupply, ctx: &Rc<TypingContext>, ty: &Type) -> Type {
    match ty {
        Type::Base(_) => ty.clone(),
        Type::Refined(rt) => {
            let n = supply.fresh();
            let bound = format!("{}_fresh_{n}", rt.name);
            let hole_name = format!("fresh_{n}");
            let mut params: Vec<(Term, Name)> = ctx
                .vars()
                .into_iter()
                .filter_map(|(name, ty)| {
                    ty.base().map(|base| (Term::var(name.clone()), base.sort_name().to_string()))
                })
                .collect();
            params.push((Term::var(bound.clone()), rt.base.sort_name().to_string()));
            let refinement = rt
                .refinement
                .subst(&rt.name, &Term::var(bound.clone()))
                .map_holes(&|_| {
                    Some(Term::Hole(Hole { name: hole_name.clone(), params: params.clone() }))
                });
            Type::refined(bound, rt.base.clone(), refinement)
        }
        Type::Abstraction(at) => {
            let param_ty = fresh(supply, ctx, &at.param_ty);
            let inner = ctx.push_var(at.param.clone(), param_ty.clone());
            let ret = fresh(supply, &inner, &at.ret);
            Type::Abstraction(AbstractionType {
                param: at.param.clone(),
                param_ty: Box::new(param_ty),
                ret: Box::new(ret),
            })
        }
    }
}

/// A term is Horn-wellformed when holes occur only bare or as direct
/// conjuncts; any other application must be hole-free.
pub fn wellformed_horn(t: &Term) -> bool {
    match t {
        Term::Constant(_) | Term::Var(_) | Term::Hole(_) => true,
        Term::App(op, args) if op == "&&" => args.iter().all(wellformed_horn),
        Term::App(_, args) => !args.iter().any(Term::has_hole),
    }
}

/// Every guard and every leaf of the constraint is Horn-wellformed.
pub fn wellformed(c: &Constraint) -> bool {
    match c {
        Constraint::Pred(t) => wellformed_horn(t),
        Constraint::Conj(lhs, rhs) => wellformed(lhs) && wellformed(rhs),
        Constraint::ForAll(bind, body) => wellformed_horn(&bind.pred) && wellformed(body),
    }
}

/// All argument vectors of the given arity, where each slot independently
/// offers every parameter and every literal from the pool. With `n`
/// parameters that is `(5n)^arity` vectors.
pub fn possible_args(params: &[(Term, Name)], arity: usize) -> Vec<Vec<Term>> {
    if arity == 0 {
        return vec![vec![]];
    }
    let mut out = Vec::new();
    for rest in possible_args(params, arity - 1) {
        for (param, _) in params {
            let mut args = vec![param.clone()];
            args.extend(rest.iter().cloned());
            out.push(args);
            for lit in &ARG_LITERALS {
                let mut args = vec![lit.clone()];
                args.extend(rest.iter().cloned());
                out.push(args);
            }
        }
    }
    out
}

/// The full candidate grammar for one hole: `30 * n^2` relational atoms for
/// `n` parameters, or the two boolean literals when the hole has no
/// parameters at all.
pub fn hole_candidates(hole: &Hole) -> Vec<Term> {
    if hole.params.is_empty() {
        return vec![Term::TRUE, Term::FALSE];
    }
    let slots = possible_args(&hole.params, 1);
    let mut out = Vec::with_capacity(QUALIFIER_RELATIONS.len() * hole.params.len() * slots.len());
    for rel in QUALIFIER_RELATIONS {
        for (param, _) in &hole.params {
            for slot in &slots {
                out.push(Term::app(rel, vec![param.clone(), slot[0].clone()]));
            }
        }
    }
    out
}

/// Seeds every hole of the constraint with its full candidate set. Holes are
/// recorded once, in discovery order; later occurrences reuse the canonical
/// parameter list of the first.
pub fn build_initial_assignment(c: &Constraint) -> Assignment {
    let mut assign: Assignment = Vec::new();
    let mut holes = Vec::new();
    c.holes(&mut holes);
    for hole in holes {
        if assign.iter().any(|(name, _)| name == &hole.name) {
            continue;
        }
        assign.push((
            hole.name.clone(),
            HoleState { params: hole.params.clone(), candidates: hole_candidates(hole) },
        ));
    }
    assign
}

/// Conjoins the surviving candidates into a single right-nested `&&` term.
/// An empty set has no sound reading, so callers must reject it before
/// merging; for completeness it merges to `true`.
pub fn merge_assignments(candidates: &[Term]) -> Term {
    match candidates {
        [] => Term::TRUE,
        [single] => single.clone(),
        [first, rest @ ..] => {
            Term::App("&&".into(), vec![first.clone(), merge_assignments(rest)])
        }
    }
}

/// Rewrites a candidate built over the canonical parameters onto the
/// parameters of a particular occurrence, positionally. The renaming goes
/// through placeholders so swapped parameters cannot capture each other.
fn instantiate(candidate: &Term, canonical: &[(Term, Name)], occurrence: &[(Term, Name)]) -> Term {
    if canonical.len() != occurrence.len() {
        bug!(
            "hole occurrence has {} parameters, expected {}",
            occurrence.len(),
            canonical.len()
        );
    }
    let mut t = candidate.clone();
    for (i, (from, _)) in canonical.iter().enumerate() {
        if let Term::Var(name) = from {
            t = t.subst(name, &Term::var(format!("%{i}")));
        }
    }
    for (i, (to, _)) in occurrence.iter().enumerate() {
        t = t.subst(&format!("%{i}"), to);
    }
    t
}

/// Replaces every hole occurrence in `t` with the conjunction of its current
/// candidates, remapped onto the occurrence's parameters.
fn apply_assignment(t: &Term, assign: &Assignment) -> Term {
    t.map_holes(&|hole| {
        let (_, state) = assign.iter().find(|(name, _)| name == &hole.name)?;
        Some(instantiate(&merge_assignments(&state.candidates), &state.params, &hole.params))
    })
}

/// Resolves the holes of a Horn-wellformed constraint and decides it.
///
/// Clauses whose head is a hole refine that hole's candidate set; each
/// candidate must be entailed by the clause's hypotheses under the current
/// assignment. A hole left with no candidate has no sound reading in the
/// grammar and the whole constraint is rejected. Once the sets stop
/// changing, the merged assignment is substituted everywhere and the ground
/// constraint goes to the bridge.
pub fn solve(smt: &mut Session, c: &Constraint) -> bool {
    debug_assert!(wellformed(c), "constraint is not in Horn form");
    let mut assign = build_initial_assignment(c);
    if assign.is_empty() {
        return smt.valid(c, &[]);
    }

    let obligations = flat(c);
    loop {
        smt.note_fixpoint_pass();
        let mut changed = false;
        for ob in &obligations {
            let Term::Hole(head) = &ob.pos else { continue };
            let idx = assign
                .iter()
                .position(|(name, _)| name == &head.name)
                .unwrap_or_else(|| bug!("hole `{}` missing from the assignment", head.name));
            let pre = apply_assignment(&ob.pre, &assign);
            let canonical = assign[idx].1.params.clone();
            let candidates = std::mem::take(&mut assign[idx].1.candidates);
            let mut kept = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let goal = Obligation {
                    binders: ob.binders.clone(),
                    pre: pre.clone(),
                    pos: instantiate(&candidate, &canonical, &head.params),
                };
                if smt.check(&goal, &[]) == Verdict::Valid {
                    kept.push(candidate);
                } else {
                    changed = true;
                    tracing::debug!(hole = %head.name, candidate = %candidate, "pruned candidate");
                }
            }
            if kept.is_empty() {
                tracing::debug!(hole = %head.name, "no sound candidate remains");
                return false;
            }
            assign[idx].1.candidates = kept;
        }
        if !changed {
            break;
        }
    }

    let ground = c.map_holes(&|hole| {
        let (_, state) = assign.iter().find(|(name, _)| name == &hole.name)?;
        Some(instantiate(&merge_assignments(&state.candidates), &state.params, &hole.params))
    });
    smt.valid(&ground, &[])
}

//! The term and constraint model shared by entailment, the Horn solver and the
//! decision-procedure bridge.
//!
//! Everything here is an immutable value: entailment allocates new implication
//! nodes around existing constraints but never mutates them, and the solver
//! works on transient copies scoped to one call.

use crate::context::BaseType;

pub type Name = String;

/// A literal in refinement position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// An unresolved refinement placeholder.
///
/// The parameter list is the vocabulary the Horn solver may use to build
/// candidate predicates for this hole: one `(term, sort-name)` pair per
/// variable in scope when the hole was instantiated, the hole's own bound
/// variable last.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hole {
    pub name: Name,
    pub params: Vec<(Term, Name)>,
}

/// A refinement predicate term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Constant(Constant),
    Var(Name),
    /// Application of a named operator or function to ordered arguments.
    App(Name, Vec<Term>),
    /// Must be resolved by the Horn solver before reaching the bridge.
    Hole(Hole),
}

impl Term {
    pub const TRUE: Self = Term::Constant(Constant::Bool(true));
    pub const FALSE: Self = Term::Constant(Constant::Bool(false));

    pub const fn int(val: i64) -> Term {
        Term::Constant(Constant::Int(val))
    }

    pub fn var(name: impl Into<Name>) -> Term {
        Term::Var(name.into())
    }

    pub fn app(op: impl Into<Name>, args: Vec<Term>) -> Term {
        Term::App(op.into(), args)
    }

    /// Conjunction, dropping trivially true operands.
    pub fn and(lhs: Term, rhs: Term) -> Term {
        if lhs == Term::TRUE {
            rhs
        } else if rhs == Term::TRUE {
            lhs
        } else {
            Term::App("&&".into(), vec![lhs, rhs])
        }
    }

    pub fn eq(self, other: Term) -> Term {
        Term::App("==".into(), vec![self, other])
    }

    /// Replaces every occurrence of the variable `name` with `replacement`,
    /// descending into hole parameters as well.
    pub fn subst(&self, name: &str, replacement: &Term) -> Term {
        match self {
            Term::Constant(_) => self.clone(),
            Term::Var(v) => {
                if v == name {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            Term::App(op, args) => {
                Term::App(op.clone(), args.iter().map(|a| a.subst(name, replacement)).collect())
            }
            Term::Hole(hole) => {
                let params = hole
                    .params
                    .iter()
                    .map(|(t, sort)| (t.subst(name, replacement), sort.clone()))
                    .collect();
                Term::Hole(Hole { name: hole.name.clone(), params })
            }
        }
    }

    pub fn has_hole(&self) -> bool {
        match self {
            Term::Constant(_) | Term::Var(_) => false,
            Term::App(_, args) => args.iter().any(Term::has_hole),
            Term::Hole(_) => true,
        }
    }

    /// Collects every hole occurrence, left to right.
    pub fn holes<'a>(&'a self, out: &mut Vec<&'a Hole>) {
        match self {
            Term::Constant(_) | Term::Var(_) => {}
            Term::App(_, args) => {
                for arg in args {
                    arg.holes(out);
                }
            }
            Term::Hole(hole) => out.push(hole),
        }
    }

    /// Rewrites every hole occurrence with `f`; occurrences for which `f`
    /// returns `None` are kept as they are.
    pub fn map_holes(&self, f: &impl Fn(&Hole) -> Option<Term>) -> Term {
        match self {
            Term::Constant(_) | Term::Var(_) => self.clone(),
            Term::App(op, args) => {
                Term::App(op.clone(), args.iter().map(|a| a.map_holes(f)).collect())
            }
            Term::Hole(hole) => f(hole).unwrap_or_else(|| self.clone()),
        }
    }
}

/// The binder introduced by an implication: a name, its base type, and the
/// hypothesis guarding the body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bind {
    pub name: Name,
    pub base: BaseType,
    pub pred: Term,
}

/// A verification condition.
///
/// `ForAll` is the implication form: guard and body may reference the bound
/// name. Nesting depth matches the number of context frames consumed so far.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    Pred(Term),
    Conj(Box<Constraint>, Box<Constraint>),
    ForAll(Bind, Box<Constraint>),
}

impl Constraint {
    pub const TRUE: Self = Constraint::Pred(Term::TRUE);

    pub fn conj(c1: Constraint, c2: Constraint) -> Constraint {
        Constraint::Conj(Box::new(c1), Box::new(c2))
    }

    pub fn forall(
        name: impl Into<Name>,
        base: BaseType,
        pred: Term,
        body: Constraint,
    ) -> Constraint {
        Constraint::ForAll(Bind { name: name.into(), base, pred }, Box::new(body))
    }

    pub fn foralls(binds: Vec<Bind>, c: Constraint) -> Constraint {
        binds
            .into_iter()
            .rev()
            .fold(c, |c, bind| Constraint::ForAll(bind, Box::new(c)))
    }

    pub fn has_hole(&self) -> bool {
        match self {
            Constraint::Pred(t) => t.has_hole(),
            Constraint::Conj(c1, c2) => c1.has_hole() || c2.has_hole(),
            Constraint::ForAll(bind, body) => bind.pred.has_hole() || body.has_hole(),
        }
    }

    pub fn holes<'a>(&'a self, out: &mut Vec<&'a Hole>) {
        match self {
            Constraint::Pred(t) => t.holes(out),
            Constraint::Conj(c1, c2) => {
                c1.holes(out);
                c2.holes(out);
            }
            Constraint::ForAll(bind, body) => {
                bind.pred.holes(out);
                body.holes(out);
            }
        }
    }

    pub fn map_holes(&self, f: &impl Fn(&Hole) -> Option<Term>) -> Constraint {
        match self {
            Constraint::Pred(t) => Constraint::Pred(t.map_holes(f)),
            Constraint::Conj(c1, c2) => {
                Constraint::Conj(Box::new(c1.map_holes(f)), Box::new(c2.map_holes(f)))
            }
            Constraint::ForAll(bind, body) => {
                let bind = Bind {
                    name: bind.name.clone(),
                    base: bind.base.clone(),
                    pred: bind.pred.map_holes(f),
                };
                Constraint::ForAll(bind, Box::new(body.map_holes(f)))
            }
        }
    }
}

/// The canonical flattened obligation: "for all binders, `pre` implies `pos`".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obligation {
    pub binders: Vec<(Name, BaseType)>,
    pub pre: Term,
    pub pos: Term,
}

/// Decomposes a constraint tree into independent canonical obligations, one
/// per leaf: conjunctions split, implications contribute their binder and
/// conjoin their guard into the precondition, leaves terminate with a trivial
/// precondition and their goal as postcondition.
pub fn flat(c: &Constraint) -> Vec<Obligation> {
    match c {
        Constraint::Pred(goal) => {
            vec![Obligation { binders: vec![], pre: Term::TRUE, pos: goal.clone() }]
        }
        Constraint::Conj(c1, c2) => {
            let mut obs = flat(c1);
            obs.extend(flat(c2));
            obs
        }
        Constraint::ForAll(bind, body) => {
            flat(body)
                .into_iter()
                .map(|mut ob| {
                    ob.binders.push((bind.name.clone(), bind.base.clone()));
                    ob.pre = Term::and(ob.pre, bind.pred.clone());
                    ob
                })
                .collect()
        }
    }
}

//! The decision-procedure bridge.
//!
//! A [`Session`] owns the solver handle and the opaque-sort cache for one
//! solving session; both are created once and reused across calls so sort
//! identity stays stable. Each obligation is checked inside its own
//! `push`/`pop` scope, so no query ever observes another's assertions.
//!
//! Validity of `pre => pos` is established by asserting `pre && !pos` and
//! proving it unsatisfiable. A `sat` answer refutes the obligation; an
//! `unknown` answer (the solver gave up or hit the time budget) is folded
//! into the same invalid outcome: the bridge only ever reports validity it
//! actually proved. Callers that need to tell the two apart can use
//! [`Session::check`] and inspect the [`Verdict`].

use liquid_common::bug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use z3::{
    FuncDecl, Params, SatResult, Solver,
    ast::{self, Ast},
};

use crate::{
    constraint::{Constant, Constraint, Name, Obligation, Term, flat},
    context::BaseType,
};

/// Configuration for one [`Session`]. The default is read from
/// [`liquid_config`]; tests pass an explicit value to stay isolated.
#[derive(Clone, Copy, Debug)]
pub struct SmtConfig {
    /// Time budget per satisfiability check, in milliseconds.
    pub timeout_ms: u32,
}

impl Default for SmtConfig {
    fn default() -> Self {
        Self { timeout_ms: liquid_config::timeout_ms() }
    }
}

/// Outcome of a single obligation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
    /// The solver answered `unknown` or timed out. [`Session::valid`] treats
    /// this as invalid.
    Unknown,
}

/// Counters for one session, across all `valid`/`check` calls.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    pub num_obligations: usize,
    pub num_queries: usize,
    pub num_valid: usize,
    pub num_unknown: usize,
    /// Fixpoint passes run by the Horn solver in this session.
    pub num_iters: usize,
}

pub struct Session {
    solver: Solver,
    /// Uninterpreted sorts for named base types, keyed by name. Created once
    /// per distinct name and reused so sort identity is stable across calls.
    sorts: FxHashMap<Name, z3::Sort>,
    /// Caller-registered uninterpreted functions, tried after the builtin
    /// operator table.
    funs: FxHashMap<Name, (FuncDecl, Vec<BaseType>)>,
    stats: Stats,
}

impl Session {
    pub fn new(config: SmtConfig) -> Session {
        let solver = Solver::new();
        let mut params = Params::new();
        params.set_u32("timeout", config.timeout_ms);
        solver.set_params(&params);
        Session {
            solver,
            sorts: FxHashMap::default(),
            funs: FxHashMap::default(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub(crate) fn note_fixpoint_pass(&mut self) {
        self.stats.num_iters += 1;
    }

    /// Registers an uninterpreted function usable in applications, resolved
    /// after the builtin operator table.
    pub fn declare_fun(&mut self, name: &str, args: &[BaseType], ret: &BaseType) {
        let domain: Vec<z3::Sort> = args.iter().map(|base| self.base_sort(base)).collect();
        let range = self.base_sort(ret);
        let domain_refs: Vec<&z3::Sort> = domain.iter().collect();
        let decl = FuncDecl::new(name, &domain_refs, &range);
        self.funs.insert(name.to_string(), (decl, args.to_vec()));
    }

    /// Decides validity of a hole-free constraint: every canonical obligation
    /// must be proved, one scoped query at a time.
    pub fn valid(&mut self, c: &Constraint, extra_universals: &[(Name, BaseType)]) -> bool {
        if liquid_config::dump_constraint() {
            let name = format!("vc{}.txt", self.stats.num_obligations);
            let _ = crate::dbg::dump_constraint(liquid_config::log_dir(), &name, c);
        }
        let ok = flat(c)
            .iter()
            .all(|ob| self.check(ob, extra_universals) == Verdict::Valid);
        if liquid_config::verbose() {
            tracing::info!(valid = ok, queries = self.stats.num_queries, "constraint checked");
        }
        ok
    }

    /// Checks a single canonical obligation, returning the three-valued
    /// outcome. Extra universals are materialized like binders and the
    /// asserted formula is wrapped in an explicit quantifier over them.
    pub fn check(&mut self, ob: &Obligation, extra_universals: &[(Name, BaseType)]) -> Verdict {
        self.stats.num_obligations += 1;

        let mut env: FxHashMap<Name, ast::Dynamic> = FxHashMap::default();
        for (name, base) in &ob.binders {
            let cnst = self.make_const(name, base);
            // binders are listed innermost first; the innermost wins
            env.entry(name.clone()).or_insert(cnst);
        }
        let mut bound = Vec::new();
        for (name, base) in extra_universals {
            let cnst = self.make_const(name, base);
            env.insert(name.clone(), cnst.clone());
            bound.push(cnst);
        }

        let Some(query) = self.negated_query(ob, &env, &bound) else {
            tracing::debug!(obligation = %ob, "ill-sorted obligation treated as invalid");
            return Verdict::Invalid;
        };

        self.solver.push();
        self.solver.assert(query);
        let result = self.solver.check();
        self.solver.pop(1);
        self.stats.num_queries += 1;

        match result {
            SatResult::Unsat => {
                self.stats.num_valid += 1;
                Verdict::Valid
            }
            SatResult::Sat => Verdict::Invalid,
            SatResult::Unknown => {
                self.stats.num_unknown += 1;
                Verdict::Unknown
            }
        }
    }

    /// `pre && !pos`, universally quantified over `bound` when non-empty.
    /// `None` means some atom was ill-sorted.
    fn negated_query(
        &mut self,
        ob: &Obligation,
        env: &FxHashMap<Name, ast::Dynamic>,
        bound: &[ast::Dynamic],
    ) -> Option<ast::Bool> {
        let pre = self.term_to_smt(&ob.pre, env)?.as_bool()?;
        let pos = self.term_to_smt(&ob.pos, env)?.as_bool()?;
        let body = ast::Bool::and(&[&pre, &pos.not()]);
        if bound.is_empty() {
            Some(body)
        } else {
            let bound_refs: Vec<&dyn Ast> = bound.iter().map(|b| b as &dyn Ast).collect();
            Some(ast::forall_const(&bound_refs, &[], &body))
        }
    }

    fn term_to_smt(
        &mut self,
        term: &Term,
        env: &FxHashMap<Name, ast::Dynamic>,
    ) -> Option<ast::Dynamic> {
        match term {
            Term::Constant(c) => Some(constant_to_smt(c)),
            Term::Var(name) => {
                match env.get(name) {
                    Some(var) => Some(var.clone()),
                    None => bug!("unbound variable `{name}` reached the decision procedure"),
                }
            }
            Term::Hole(hole) => {
                bug!("hole `{}` reached the decision procedure unresolved", hole.name)
            }
            Term::App(op, args) => self.app_to_smt(op, args, env),
        }
    }

    fn app_to_smt(
        &mut self,
        op: &str,
        args: &[Term],
        env: &FxHashMap<Name, ast::Dynamic>,
    ) -> Option<ast::Dynamic> {
        match (op, args) {
            ("==", [lhs, rhs]) => {
                let lhs = self.term_to_smt(lhs, env)?;
                let rhs = self.term_to_smt(rhs, env)?;
                if lhs.get_sort() != rhs.get_sort() {
                    return None;
                }
                Some(lhs.eq(&rhs).into())
            }
            ("!=", [lhs, rhs]) => {
                let lhs = self.term_to_smt(lhs, env)?;
                let rhs = self.term_to_smt(rhs, env)?;
                if lhs.get_sort() != rhs.get_sort() {
                    return None;
                }
                Some(lhs.eq(&rhs).not().into())
            }
            ("<" | "<=" | ">" | ">=", [lhs, rhs]) => {
                let lhs = self.term_to_smt(lhs, env)?.as_int()?;
                let rhs = self.term_to_smt(rhs, env)?.as_int()?;
                let atom = match op {
                    "<" => lhs.lt(&rhs),
                    "<=" => lhs.le(&rhs),
                    ">" => lhs.gt(&rhs),
                    ">=" => lhs.ge(&rhs),
                    _ => unreachable!(),
                };
                Some(atom.into())
            }
            ("&&" | "||", args) if !args.is_empty() => {
                let mut bools = Vec::with_capacity(args.len());
                for arg in args {
                    bools.push(self.term_to_smt(arg, env)?.as_bool()?);
                }
                let bool_refs: Vec<&ast::Bool> = bools.iter().collect();
                let out =
                    if op == "&&" { ast::Bool::and(&bool_refs) } else { ast::Bool::or(&bool_refs) };
                Some(out.into())
            }
            ("!", [arg]) => Some(self.term_to_smt(arg, env)?.as_bool()?.not().into()),
            ("-->", [lhs, rhs]) => {
                let lhs = self.term_to_smt(lhs, env)?.as_bool()?;
                let rhs = self.term_to_smt(rhs, env)?.as_bool()?;
                Some(lhs.implies(rhs).into())
            }
            ("+" | "-" | "*" | "/" | "%", [lhs, rhs]) => {
                let lhs = self.term_to_smt(lhs, env)?.as_int()?;
                let rhs = self.term_to_smt(rhs, env)?.as_int()?;
                let out: ast::Int = match op {
                    "+" => ast::Int::add(&[&lhs, &rhs]),
                    "-" => ast::Int::sub(&[&lhs, &rhs]),
                    "*" => ast::Int::mul(&[&lhs, &rhs]),
                    "/" => lhs.div(&rhs),
                    "%" => lhs.modulo(&rhs),
                    _ => unreachable!(),
                };
                Some(out.into())
            }
            // domain extensions: sequence length and the two-dimensional
            // shape measure, uninterpreted over their opaque sorts
            ("len", [arg]) => self.measure_to_smt("len", "List", arg, env),
            ("n_rows", [arg]) => self.measure_to_smt("n_rows", "DataSet", arg, env),
            ("n_cols", [arg]) => self.measure_to_smt("n_cols", "DataSet", arg, env),
            _ => {
                let domain = match self.funs.get(op) {
                    Some((_, domain)) => domain.clone(),
                    None => bug!("unknown operator `{op}` applied to {} arguments", args.len()),
                };
                if domain.len() != args.len() {
                    bug!("function `{op}` expects {} arguments, got {}", domain.len(), args.len());
                }
                let mut arg_asts = Vec::with_capacity(args.len());
                for (arg, base) in args.iter().zip(&domain) {
                    let arg = self.term_to_smt(arg, env)?;
                    if arg.get_sort() != self.base_sort(base) {
                        return None;
                    }
                    arg_asts.push(arg);
                }
                let arg_refs: Vec<&dyn Ast> = arg_asts.iter().map(|a| a as &dyn Ast).collect();
                let (decl, _) = self
                    .funs
                    .get(op)
                    .unwrap_or_else(|| bug!("function `{op}` vanished from the session"));
                Some(decl.apply(&arg_refs))
            }
        }
    }

    fn measure_to_smt(
        &mut self,
        fun: &str,
        sort_name: &str,
        arg: &Term,
        env: &FxHashMap<Name, ast::Dynamic>,
    ) -> Option<ast::Dynamic> {
        let arg = self.term_to_smt(arg, env)?;
        let domain = self.opaque_sort(sort_name).clone();
        if arg.get_sort() != domain {
            return None;
        }
        let decl = FuncDecl::new(fun, &[&domain], &z3::Sort::int());
        Some(decl.apply(&[&arg as &dyn Ast]))
    }

    fn make_const(&mut self, name: &str, base: &BaseType) -> ast::Dynamic {
        match base {
            BaseType::Int => ast::Int::new_const(name).into(),
            BaseType::Bool => ast::Bool::new_const(name).into(),
            BaseType::Str => ast::String::new_const(name).into(),
            BaseType::Named(n) => {
                let sort = self.opaque_sort(n).clone();
                FuncDecl::new(name, &[], &sort).apply(&[])
            }
        }
    }

    fn base_sort(&mut self, base: &BaseType) -> z3::Sort {
        match base {
            BaseType::Int => z3::Sort::int(),
            BaseType::Bool => z3::Sort::bool(),
            BaseType::Str => z3::Sort::string(),
            BaseType::Named(name) => self.opaque_sort(name).clone(),
        }
    }

    fn opaque_sort(&mut self, name: &str) -> &z3::Sort {
        self.sorts
            .entry(name.to_string())
            .or_insert_with(|| z3::Sort::uninterpreted(z3::Symbol::String(name.to_string())))
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SmtConfig::default())
    }
}

fn constant_to_smt(c: &Constant) -> ast::Dynamic {
    match c {
        Constant::Int(n) => ast::Int::from_i64(*n).into(),
        Constant::Bool(b) => ast::Bool::from_bool(*b).into(),
        Constant::Str(s) => ast::String::from(s.clone()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, Hole, Term};
    use crate::context::BaseType;

    fn session() -> Session {
        Session::new(SmtConfig { timeout_ms: 1000 })
    }

    fn forall_x_int(guard: Term, goal: Term) -> Constraint {
        Constraint::forall("x", BaseType::Int, guard, Constraint::Pred(goal))
    }

    #[test]
    fn valid_ground_implication() {
        let mut smt = session();
        let c = forall_x_int(
            Term::app(">", vec![Term::var("x"), Term::int(0)]),
            Term::app(">=", vec![Term::var("x"), Term::int(1)]),
        );
        assert!(smt.valid(&c, &[]));
    }

    #[test]
    fn invalid_when_negation_is_satisfiable() {
        let mut smt = session();
        let c = forall_x_int(Term::TRUE, Term::app(">", vec![Term::var("x"), Term::int(0)]));
        assert!(!smt.valid(&c, &[]));
    }

    #[test]
    fn valid_is_idempotent_across_scopes() {
        let mut smt = session();
        let c = forall_x_int(
            Term::var("x").eq(Term::int(3)),
            Term::app(">", vec![Term::var("x"), Term::int(2)]),
        );
        let first = smt.valid(&c, &[]);
        let second = smt.valid(&c, &[]);
        assert_eq!(first, second);
        assert!(first);
        assert_eq!(smt.stats().num_queries, 2);
    }

    #[test]
    fn unknown_or_timeout_is_invalid() {
        // a 1ms budget on a nonlinear query comes back unknown, which must
        // never be reported as valid
        let mut smt = Session::new(SmtConfig { timeout_ms: 1 });
        let cube = |v: &str| {
            Term::app(
                "*",
                vec![Term::var(v), Term::app("*", vec![Term::var(v), Term::var(v)])],
            )
        };
        let pre = Term::and(
            Term::app(">", vec![Term::var("x"), Term::int(100)]),
            Term::and(
                Term::app(">", vec![Term::var("y"), Term::var("x")]),
                Term::app(">", vec![Term::var("z"), Term::var("y")]),
            ),
        );
        let goal = Term::app(
            "!=",
            vec![Term::app("+", vec![cube("x"), cube("y")]), cube("z")],
        );
        let c = Constraint::forall(
            "x",
            BaseType::Int,
            pre,
            Constraint::forall(
                "y",
                BaseType::Int,
                Term::TRUE,
                Constraint::forall("z", BaseType::Int, Term::TRUE, Constraint::Pred(goal)),
            ),
        );
        assert!(!smt.valid(&c, &[]));
    }

    #[test]
    fn opaque_sorts_and_measures() {
        let mut smt = session();
        let xs = Term::var("xs");
        let c = Constraint::forall(
            "xs",
            BaseType::Named("List".into()),
            Term::app(">", vec![Term::app("len", vec![xs.clone()]), Term::int(0)]),
            Constraint::Pred(Term::app(">=", vec![Term::app("len", vec![xs]), Term::int(1)])),
        );
        assert!(smt.valid(&c, &[]));
        // the sort is cached, so a second query over the same name agrees
        assert!(smt.valid(
            &Constraint::forall(
                "d",
                BaseType::Named("DataSet".into()),
                Term::TRUE,
                Constraint::Pred(
                    Term::app("n_rows", vec![Term::var("d")])
                        .eq(Term::app("n_rows", vec![Term::var("d")]))
                ),
            ),
            &[]
        ));
    }

    #[test]
    fn extra_universals_are_quantified() {
        let mut smt = session();
        let tautology = Constraint::Pred(Term::app(">=", vec![Term::var("n"), Term::var("n")]));
        assert!(smt.valid(&tautology, &[("n".into(), BaseType::Int)]));
        let contingent = Constraint::Pred(Term::app(">", vec![Term::var("n"), Term::int(0)]));
        assert!(!smt.valid(&contingent, &[("n".into(), BaseType::Int)]));
    }

    #[test]
    fn ill_sorted_atom_is_invalid_not_fatal() {
        let mut smt = session();
        let c = forall_x_int(Term::TRUE, Term::var("x").eq(Term::TRUE));
        assert!(!smt.valid(&c, &[]));
    }

    #[test]
    fn declared_functions_resolve_after_builtins() {
        let mut smt = session();
        smt.declare_fun("hash", &[BaseType::Int], &BaseType::Int);
        let call = Term::app("hash", vec![Term::var("x")]);
        let c = forall_x_int(
            Term::app(">", vec![call.clone(), Term::int(0)]),
            Term::app(">=", vec![call, Term::int(1)]),
        );
        assert!(smt.valid(&c, &[]));
    }

    #[test]
    #[should_panic]
    fn unresolved_hole_is_fatal() {
        let mut smt = session();
        let c = Constraint::Pred(Term::Hole(Hole { name: "k".into(), params: vec![] }));
        smt.valid(&c, &[]);
    }

    #[test]
    #[should_panic]
    fn unbound_variable_is_fatal() {
        let mut smt = session();
        let c = Constraint::Pred(Term::var("ghost").eq(Term::int(0)));
        smt.valid(&c, &[]);
    }
}

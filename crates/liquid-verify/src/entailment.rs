//! Entailment of a constraint under a typing context.
//!
//! The context is unwound outward into nested universal quantifiers: a
//! refined binder contributes its refinement (with the bound variable
//! substituted by the binder's name) as the guard, a bare base binder
//! contributes a trivial guard, and function-typed binders carry no ground
//! information so they are skipped. The closed constraint is then handed to
//! the Horn solver.

use crate::{
    constraint::{Constraint, Term},
    context::{Type, TypingContext},
    horn::solve,
    smt::Session,
};

/// How type-variable binders participate in entailment. They bind no term
/// and carry no refinement, so the only behavior today is to skip them; the
/// policy is explicit so the choice is visible at the recursion site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeBinderPolicy {
    #[default]
    PassThrough,
}

pub fn entails(smt: &mut Session, ctx: &TypingContext, c: Constraint) -> bool {
    entails_with_policy(smt, ctx, c, TypeBinderPolicy::default())
}

pub fn entails_with_policy(
    smt: &mut Session,
    ctx: &TypingContext,
    c: Constraint,
    policy: TypeBinderPolicy,
) -> bool {
    match ctx {
        TypingContext::Empty => {
            tracing::debug!(constraint = %c, "context closed, solving");
            solve(smt, &c)
        }
        TypingContext::VariableBinder { prev, name, ty } => match ty {
            Type::Abstraction(_) => entails_with_policy(smt, prev, c, policy),
            Type::Base(base) => {
                let c = Constraint::forall(name.clone(), base.clone(), Term::TRUE, c);
                entails_with_policy(smt, prev, c, policy)
            }
            Type::Refined(rt) => {
                let guard = rt.refinement.subst(&rt.name, &Term::var(name.clone()));
                let c = Constraint::forall(name.clone(), rt.base.clone(), guard, c);
                entails_with_policy(smt, prev, c, policy)
            }
        },
        TypingContext::TypeBinder { prev, .. } => match policy {
            TypeBinderPolicy::PassThrough => entails_with_policy(smt, prev, c, policy),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Term;
    use crate::context::{AbstractionType, BaseType};
    use crate::horn::solve;
    use crate::smt::{Session, SmtConfig};

    fn session() -> Session {
        Session::new(SmtConfig { timeout_ms: 1000 })
    }

    #[test]
    fn empty_context_agrees_with_solve() {
        let valid = Constraint::Pred(Term::int(1).eq(Term::int(1)));
        let invalid = Constraint::Pred(Term::int(0).eq(Term::int(1)));
        let mut smt = session();
        assert_eq!(entails(&mut smt, &TypingContext::empty(), valid.clone()), solve(&mut smt, &valid));
        assert_eq!(
            entails(&mut smt, &TypingContext::empty(), invalid.clone()),
            solve(&mut smt, &invalid)
        );
    }

    #[test]
    fn base_binder_becomes_an_unguarded_quantifier() {
        let ctx = TypingContext::empty().push_var("x", Type::Base(BaseType::Int));
        let c = Constraint::forall(
            "v",
            BaseType::Int,
            Term::var("v").eq(Term::var("x")),
            Constraint::Pred(Term::app(
                ">",
                vec![Term::var("v"), Term::app("-", vec![Term::var("x"), Term::int(1)])],
            )),
        );
        let mut smt = session();
        assert!(entails(&mut smt, &ctx, c));

        let too_strong = Constraint::forall(
            "v",
            BaseType::Int,
            Term::var("v").eq(Term::var("x")),
            Constraint::Pred(Term::app(">", vec![Term::var("v"), Term::var("x")])),
        );
        assert!(!entails(&mut smt, &ctx, too_strong));
    }

    #[test]
    fn refined_binder_guards_with_its_refinement() {
        // x : { v: Int | v > 0 }
        let ctx = TypingContext::empty().push_var(
            "x",
            Type::refined("v", BaseType::Int, Term::app(">", vec![Term::var("v"), Term::int(0)])),
        );
        let mut smt = session();
        let weak = Constraint::Pred(Term::app(">=", vec![Term::var("x"), Term::int(1)]));
        assert!(entails(&mut smt, &ctx, weak));
        let strong = Constraint::Pred(Term::app(">=", vec![Term::var("x"), Term::int(2)]));
        assert!(!entails(&mut smt, &ctx, strong));
    }

    #[test]
    fn abstraction_binders_are_skipped() {
        let ctx = TypingContext::empty()
            .push_var(
                "f",
                Type::Abstraction(AbstractionType {
                    param: "a".into(),
                    param_ty: Box::new(Type::Base(BaseType::Int)),
                    ret: Box::new(Type::Base(BaseType::Int)),
                }),
            )
            .push_var("x", Type::Base(BaseType::Int));
        let mut smt = session();
        let c = Constraint::Pred(Term::var("x").eq(Term::var("x")));
        assert!(entails(&mut smt, &ctx, c));
    }

    #[test]
    fn type_binders_pass_through() {
        let ctx = TypingContext::empty()
            .push_type("a")
            .push_var("x", Type::Base(BaseType::Int));
        let mut smt = session();
        let c = Constraint::Pred(Term::app(">=", vec![Term::var("x"), Term::var("x")]));
        assert!(entails(&mut smt, &ctx, c));
    }
}

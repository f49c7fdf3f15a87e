//! Display implementations for terms, constraints and obligations, used by
//! debug dumps and tracing output.

use std::fmt;

use itertools::Itertools;

use crate::{
    constraint::{Constant, Constraint, Obligation, Term},
    context::BaseType,
};

const INFIX_OPS: [&str; 14] = [
    "==", "!=", "<", "<=", ">", ">=", "&&", "||", "-->", "+", "-", "*", "/", "%",
];

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(c) => write!(f, "{c}"),
            Term::Var(name) => write!(f, "{name}"),
            Term::App(op, args) if args.len() == 2 && INFIX_OPS.contains(&op.as_str()) => {
                write!(f, "({} {op} {})", args[0], args[1])
            }
            Term::App(op, args) if op == "!" && args.len() == 1 => {
                write!(f, "(! {})", args[0])
            }
            Term::App(op, args) => write!(f, "{op}({})", args.iter().format(", ")),
            Term::Hole(hole) => {
                write!(
                    f,
                    "?{}({})",
                    hole.name,
                    hole.params.iter().map(|(term, _)| term).format(", ")
                )
            }
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sort_name())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Pred(t) => write!(f, "({t})"),
            Constraint::Conj(lhs, rhs) => write!(f, "(and {lhs} {rhs})"),
            Constraint::ForAll(bind, body) => {
                write!(f, "(forall (({} {}) {}) {body})", bind.name, bind.base, bind.pred)
            }
        }
    }
}

impl fmt::Display for Obligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forall [{}]. {} => {}",
            self.binders.iter().map(|(name, base)| format!("{name}: {base}")).format(", "),
            self.pre,
            self.pos
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::constraint::{Constraint, Hole, Term};
    use crate::context::BaseType;

    #[test]
    fn terms_print_infix() {
        let t = Term::app("+", vec![Term::var("x"), Term::int(1)]).eq(Term::var("y"));
        assert_eq!(t.to_string(), "((x + 1) == y)");
    }

    #[test]
    fn holes_print_their_parameters() {
        let h = Term::Hole(Hole {
            name: "k".into(),
            params: vec![(Term::var("x"), "Int".into()), (Term::var("v"), "Int".into())],
        });
        assert_eq!(h.to_string(), "?k(x, v)");
    }

    #[test]
    fn constraints_print_as_sexprs() {
        let c = Constraint::forall(
            "x",
            BaseType::Int,
            Term::TRUE,
            Constraint::Pred(Term::app(">", vec![Term::var("x"), Term::int(0)])),
        );
        assert_eq!(c.to_string(), "(forall ((x Int) true) ((x > 0)))");
    }
}

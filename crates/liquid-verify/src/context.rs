//! Types and the persistent typing context.

use std::rc::Rc;

use crate::constraint::{Name, Term};

/// A base type, mapped 1:1 to a solver sort. `Named` covers opaque types and
/// type variables; each distinct name gets its own uninterpreted sort.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    Int,
    Bool,
    Str,
    Named(Name),
}

impl BaseType {
    /// The sort name recorded in hole parameters.
    pub fn sort_name(&self) -> &str {
        match self {
            BaseType::Int => "Int",
            BaseType::Bool => "Bool",
            BaseType::Str => "String",
            BaseType::Named(name) => name,
        }
    }
}

/// A base type refined by a predicate. The refinement's free variables are a
/// subset of `{name}` plus the enclosing scope (a caller invariant).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefinedType {
    pub name: Name,
    pub base: BaseType,
    pub refinement: Term,
}

/// A function type. Opaque to entailment: it carries no first-order predicate
/// at this level.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AbstractionType {
    pub param: Name,
    pub param_ty: Box<Type>,
    pub ret: Box<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Base(BaseType),
    Refined(RefinedType),
    Abstraction(AbstractionType),
}

impl Type {
    pub fn refined(name: impl Into<Name>, base: BaseType, refinement: Term) -> Type {
        Type::Refined(RefinedType { name: name.into(), base, refinement })
    }

    /// The base type carried by this type, if it has a representable sort.
    pub fn base(&self) -> Option<&BaseType> {
        match self {
            Type::Base(base) => Some(base),
            Type::Refined(rt) => Some(&rt.base),
            Type::Abstraction(_) => None,
        }
    }
}

/// A persistent, immutable chain of binders, innermost first. Lookup walks
/// outward, so inner names shadow outer ones.
#[derive(Clone, Debug)]
pub enum TypingContext {
    Empty,
    VariableBinder {
        prev: Rc<TypingContext>,
        name: Name,
        ty: Type,
    },
    TypeBinder {
        prev: Rc<TypingContext>,
        name: Name,
    },
}

impl TypingContext {
    pub fn empty() -> Rc<TypingContext> {
        Rc::new(TypingContext::Empty)
    }

    pub fn push_var(self: &Rc<Self>, name: impl Into<Name>, ty: Type) -> Rc<TypingContext> {
        Rc::new(TypingContext::VariableBinder { prev: Rc::clone(self), name: name.into(), ty })
    }

    pub fn push_type(self: &Rc<Self>, name: impl Into<Name>) -> Rc<TypingContext> {
        Rc::new(TypingContext::TypeBinder { prev: Rc::clone(self), name: name.into() })
    }

    /// The type of `name`, innermost binding first.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        let mut curr = self;
        loop {
            match curr {
                TypingContext::Empty => return None,
                TypingContext::VariableBinder { prev, name: n, ty } => {
                    if n == name {
                        return Some(ty);
                    }
                    curr = prev;
                }
                TypingContext::TypeBinder { prev, .. } => curr = prev,
            }
        }
    }

    /// Variable bindings in scope, outermost first.
    pub fn vars(&self) -> Vec<(&Name, &Type)> {
        let mut out = Vec::new();
        let mut curr = self;
        loop {
            match curr {
                TypingContext::Empty => break,
                TypingContext::VariableBinder { prev, name, ty } => {
                    out.push((name, ty));
                    curr = prev;
                }
                TypingContext::TypeBinder { prev, .. } => curr = prev,
            }
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward_and_shadows() {
        let ctx = TypingContext::empty()
            .push_var("x", Type::Base(BaseType::Int))
            .push_type("a")
            .push_var("x", Type::Base(BaseType::Bool));
        assert_eq!(ctx.lookup("x"), Some(&Type::Base(BaseType::Bool)));
        assert_eq!(ctx.lookup("y"), None);
    }

    #[test]
    fn vars_are_outermost_first() {
        let ctx = TypingContext::empty()
            .push_var("x", Type::Base(BaseType::Int))
            .push_var("y", Type::Base(BaseType::Bool));
        let names: Vec<_> = ctx.vars().into_iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
    }
}

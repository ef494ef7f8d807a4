use crate::error::Result;
use crate::term::{Term, Variable};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Host function computing a value from the fixed values of its parameters.
///
/// An `Err` whose kind is branch-local prunes the branch; any other error
/// ends the search and is handed to the caller.
pub type AssignFn = Arc<dyn Fn(&[Term]) -> Result<Term> + Send + Sync>;

/// Host predicate over the fixed values of its parameters. Errors are treated
/// as for [`AssignFn`].
pub type AssertFn = Arc<dyn Fn(&[Term]) -> Result<bool> + Send + Sync>;

fn param_variables(params: &[&str]) -> Result<SmallVec<[Variable; 4]>> {
    params.iter().map(|name| Variable::new(name)).collect()
}

/// Computed goal binding `target` to a host-computed value.
///
/// The host function receives the fixed values of `params`, in order.
#[derive(Clone)]
pub struct Assign {
    target: Variable,
    params: SmallVec<[Variable; 4]>,
    func: AssignFn,
    frame: Option<u64>,
}

impl Assign {
    /// `params` are the variable names the function reads, in argument order.
    pub fn new<F>(target: Variable, params: &[&str], func: F) -> Result<Self>
    where
        F: Fn(&[Term]) -> Result<Term> + Send + Sync + 'static,
    {
        Ok(Self {
            target,
            params: param_variables(params)?,
            func: Arc::new(func),
            frame: None,
        })
    }

    pub fn target(&self) -> &Variable {
        &self.target
    }

    pub fn params(&self) -> &[Variable] {
        &self.params
    }

    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    pub fn call(&self, args: &[Term]) -> Result<Term> {
        (self.func)(args)
    }

    /// Rename the target and every parameter into `frame`.
    pub fn with_frame(&self, frame: u64) -> Self {
        Self {
            target: self.target.with_frame(frame),
            params: self.params.iter().map(|p| p.with_frame(frame)).collect(),
            func: Arc::clone(&self.func),
            frame: Some(frame),
        }
    }

    /// Same computation, writing its result into `target` instead.
    /// Parameters and frame are left alone.
    pub fn retarget(&self, target: Variable) -> Self {
        Self {
            target,
            ..self.clone()
        }
    }
}

impl PartialEq for Assign {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.params == other.params
            && Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is <fn>(", self.target)?;
        write_params(f, &self.params)?;
        f.write_str(")")
    }
}

/// Computed goal that succeeds iff the host predicate holds.
#[derive(Clone)]
pub struct Assert {
    params: SmallVec<[Variable; 4]>,
    func: AssertFn,
    frame: Option<u64>,
}

impl Assert {
    pub fn new<F>(params: &[&str], func: F) -> Result<Self>
    where
        F: Fn(&[Term]) -> Result<bool> + Send + Sync + 'static,
    {
        Ok(Self {
            params: param_variables(params)?,
            func: Arc::new(func),
            frame: None,
        })
    }

    pub fn params(&self) -> &[Variable] {
        &self.params
    }

    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    pub fn call(&self, args: &[Term]) -> Result<bool> {
        (self.func)(args)
    }

    pub fn with_frame(&self, frame: u64) -> Self {
        Self {
            params: self.params.iter().map(|p| p.with_frame(frame)).collect(),
            func: Arc::clone(&self.func),
            frame: Some(frame),
        }
    }
}

impl PartialEq for Assert {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Assert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Assert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("assert <fn>(")?;
        write_params(f, &self.params)?;
        f.write_str(")")
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Variable]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

/// One conjunct of a rule body, or the predicate of a goal.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matched against the database.
    Term(Term),
    /// Evaluated directly against the current bindings.
    Assign(Assign),
    Assert(Assert),
}

impl Predicate {
    pub fn is_computed(&self) -> bool {
        !matches!(self, Predicate::Term(_))
    }

    pub fn with_frame(&self, frame: u64) -> Predicate {
        match self {
            Predicate::Term(t) => Predicate::Term(t.with_frame(frame)),
            Predicate::Assign(a) => Predicate::Assign(a.with_frame(frame)),
            Predicate::Assert(a) => Predicate::Assert(a.with_frame(frame)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Term(t) => fmt::Display::fmt(t, f),
            Predicate::Assign(a) => fmt::Display::fmt(a, f),
            Predicate::Assert(a) => fmt::Display::fmt(a, f),
        }
    }
}

impl From<Term> for Predicate {
    fn from(t: Term) -> Self {
        Predicate::Term(t)
    }
}

impl From<Assign> for Predicate {
    fn from(a: Assign) -> Self {
        Predicate::Assign(a)
    }
}

impl From<Assert> for Predicate {
    fn from(a: Assert) -> Self {
        Predicate::Assert(a)
    }
}

/// A clause: `head` holds if every body predicate holds.
///
/// A fact is a rule with an empty body.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    head: Term,
    body: Arc<[Predicate]>,
}

impl Rule {
    pub fn new(head: Term, body: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }

    pub fn fact(head: Term) -> Self {
        Self::new(head, std::iter::empty())
    }

    pub fn head(&self) -> &Term {
        &self.head
    }

    pub fn body(&self) -> &[Predicate] {
        &self.body
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// A copy of the rule with every variable renamed into `frame`.
    pub fn with_frame(&self, frame: u64) -> Rule {
        Rule {
            head: self.head.with_frame(frame),
            body: self.body.iter().map(|p| p.with_frame(frame)).collect(),
        }
    }
}

impl From<Term> for Rule {
    fn from(head: Term) -> Self {
        Rule::fact(head)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (i, p) in self.body.iter().enumerate() {
            f.write_str(if i == 0 { " :- " } else { ", " })?;
            write!(f, "{}", p)?;
        }
        f.write_str(".")
    }
}

#[cfg(test)]
#[path = "tests/rule.rs"]
mod tests;

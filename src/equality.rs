//! The substitution store.
//!
//! An [`Equality`] records what one search branch has learned so far:
//!
//! - `free`: disjoint groups of variables known to be equal to each other but
//!   not yet to any value;
//! - `fixed`: for each value, the variables bound to exactly that value.
//!
//! A variable sits in at most one free group or one fixed class, never both.
//! Every extending operation returns a new store and leaves the receiver
//! untouched, so sibling branches can keep the snapshot they started from.
//!
//! No occurs-check is performed. Binding a variable to a structure that
//! contains it (directly or through other bindings) is accepted, and a later
//! [`Equality::deep`] on it recurses without bound.

use crate::error::{Error, Result};
use crate::native::deconstruct;
use crate::rule::Predicate;
use crate::term::{Record, Sequence, Term, VarSet, Variable};
use crate::unify::unify;
use hashbrown::HashMap;
use rustc_hash::FxHasher;
use serde_json::Value;
use smallvec::{smallvec, SmallVec};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::BuildHasherDefault;

type FixedMap = HashMap<Term, VarSet, BuildHasherDefault<FxHasher>>;

/// Bindings of the queried variables, in variable order.
pub type Solution = BTreeMap<Variable, Value>;

/// Candidate substitutions produced by [`Equality::inject`].
pub type Candidates<T> = SmallVec<[T; 1]>;

#[derive(Clone, Default)]
pub struct Equality {
    free: Vec<VarSet>,
    fixed: FixedMap,
}

impl Equality {
    /// The empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store directly from its parts.
    ///
    /// The caller is responsible for the groups and classes being disjoint.
    pub fn from_parts<G, F, V>(free: G, fixed: F) -> Self
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = Variable>,
        F: IntoIterator<Item = (Term, V)>,
        V: IntoIterator<Item = Variable>,
    {
        let mut out = Self::new();
        for group in free {
            let group: VarSet = group.into_iter().collect();
            if !group.is_empty() {
                out.free.push(group);
            }
        }
        for (value, vars) in fixed {
            out.fixed.entry(value).or_default().extend(vars);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty() && self.fixed.is_empty()
    }

    /// Free groups, in creation order.
    pub fn free_groups(&self) -> &[VarSet] {
        &self.free
    }

    /// Fixed classes, in no particular order.
    pub fn fixed_classes(&self) -> impl Iterator<Item = (&Term, &VarSet)> + '_ {
        self.fixed.iter()
    }

    /// The free group containing `v`, if any.
    pub fn get_free(&self, v: &Variable) -> Option<&VarSet> {
        self.free.iter().find(|group| group.contains(v))
    }

    fn free_index(&self, v: &Variable) -> Option<usize> {
        self.free.iter().position(|group| group.contains(v))
    }

    /// The value `v` is bound to, looking at `v` and every member of its
    /// free group.
    pub fn get_fixed(&self, v: &Variable) -> Result<&Term> {
        let group = self.get_free(v);
        let candidates = std::iter::once(v).chain(group.into_iter().flatten());
        for candidate in candidates {
            if let Some((value, _)) = self.fixed.iter().find(|(_, vars)| vars.contains(candidate)) {
                return Ok(value);
            }
        }
        Err(Error::UnboundVariable(v.clone()))
    }

    fn fixed_value(&self, v: &Variable) -> Option<Term> {
        self.get_fixed(v).ok().cloned()
    }

    /// Record that `left` equals `right`.
    ///
    /// Structures are compared as opaque values here; use
    /// [`Equality::unify`] to match them element-wise.
    pub fn add(&self, left: &Term, right: &Term) -> Result<Equality> {
        self.clone().add_owned(left, right)
    }

    pub(crate) fn add_owned(self, left: &Term, right: &Term) -> Result<Equality> {
        match (left, right) {
            (Term::Var(l), Term::Var(r)) => self.add_variables(l, r),
            (Term::Var(v), value) | (value, Term::Var(v)) => self.add_value(v, value),
            (Term::Const(l), Term::Const(r)) => {
                if l.same_value(r) {
                    Ok(self)
                } else {
                    Err(Error::ValueMismatch {
                        left: left.clone(),
                        right: right.clone(),
                    })
                }
            }
            (l, r) => {
                if l == r {
                    Ok(self)
                } else {
                    Err(Error::ValueMismatch {
                        left: l.clone(),
                        right: r.clone(),
                    })
                }
            }
        }
    }

    fn add_value(mut self, v: &Variable, value: &Term) -> Result<Equality> {
        if !value.is_hashable() {
            return Err(Error::NotHashable(value.clone()));
        }
        if let Some(existing) = self.fixed_value(v) {
            if &existing == value {
                return Ok(self);
            }
            return Err(Error::InconsistentBinding {
                variable: v.clone(),
                value: value.clone(),
                existing,
            });
        }
        let group = self.take_free(v);
        self.fixed.entry(value.clone()).or_default().extend(group);
        Ok(self)
    }

    fn add_variables(mut self, left: &Variable, right: &Variable) -> Result<Equality> {
        if left == right {
            return Ok(self);
        }
        match (self.fixed_value(left), self.fixed_value(right)) {
            (Some(lv), Some(rv)) => {
                if lv == rv {
                    Ok(self)
                } else {
                    Err(Error::InconsistentBinding {
                        variable: right.clone(),
                        value: lv,
                        existing: rv,
                    })
                }
            }
            (Some(value), None) => {
                let group = self.take_free(right);
                self.fixed.entry(value).or_default().extend(group);
                Ok(self)
            }
            (None, Some(value)) => {
                let group = self.take_free(left);
                self.fixed.entry(value).or_default().extend(group);
                Ok(self)
            }
            (None, None) => {
                let (li, ri) = (self.free_index(left), self.free_index(right));
                if li.is_some() && li == ri {
                    return Ok(self);
                }
                let mut group = self.take_free(left);
                group.extend(self.take_free(right));
                self.free.push(group);
                Ok(self)
            }
        }
    }

    /// Remove and return `v`'s free group, or a singleton of `v`.
    fn take_free(&mut self, v: &Variable) -> VarSet {
        match self.free_index(v) {
            Some(i) => self.free.remove(i),
            None => VarSet::from([v.clone()]),
        }
    }

    /// Structural unification against this store. See [`unify`].
    pub fn unify(&self, left: &Term, right: &Term) -> Result<Equality> {
        unify(left, right, self)
    }

    /// Replace every variable in `term` by its value, recursively.
    ///
    /// Fails with [`Error::UnboundVariable`] if any variable reached has no
    /// value.
    pub fn deep(&self, term: &Term) -> Result<Term> {
        match term {
            Term::Const(_) | Term::Seq(Sequence::Null) => Ok(term.clone()),
            Term::Var(v) => self.deep(self.get_fixed(v)?),
            Term::Seq(s) => {
                let items = s.iter().map(|item| self.deep(item)).collect::<Result<Vec<_>>>()?;
                let tail = match s.open_tail() {
                    Some(tail) => self.deep(tail)?,
                    None => Term::null(),
                };
                Ok(Term::list_with_tail(items, tail))
            }
            Term::Record(r) => Ok(Term::Record(Record::from_symbols(
                r.iter()
                    .map(|(k, v)| Ok((k, self.deep(v)?)))
                    .collect::<Result<Vec<_>>>()?,
            ))),
        }
    }

    /// Substitute what is known into `term`.
    ///
    /// Bound variables become their values. An unbound variable whose free
    /// group contains variables from `to_solve_for` is replaced by each of
    /// them in turn, so one term can yield several candidates; structures
    /// yield the Cartesian product of their parts.
    pub fn inject(&self, term: &Term, to_solve_for: &VarSet) -> Candidates<Term> {
        match term {
            Term::Var(v) => {
                if let Ok(value) = self.get_fixed(v) {
                    return smallvec![value.clone()];
                }
                let wanted: Candidates<Term> = self
                    .get_free(v)
                    .into_iter()
                    .flatten()
                    .filter(|member| to_solve_for.contains(*member))
                    .map(|member| Term::Var(member.clone()))
                    .collect();
                if wanted.is_empty() {
                    smallvec![term.clone()]
                } else {
                    wanted
                }
            }
            Term::Record(r) => {
                let keys: Vec<_> = r.iter().map(|(k, _)| k).collect();
                let factors: Vec<_> = r.values().map(|v| self.inject(v, to_solve_for)).collect();
                cartesian_product(&factors)
                    .into_iter()
                    .map(|values| {
                        Term::Record(Record::from_symbols(keys.iter().copied().zip(values)))
                    })
                    .collect()
            }
            Term::Seq(seq @ Sequence::Cons(_)) => {
                let mut factors: Vec<_> =
                    seq.iter().map(|v| self.inject(v, to_solve_for)).collect();
                let open_tail = seq.open_tail();
                if let Some(tail) = open_tail {
                    factors.push(self.inject(tail, to_solve_for));
                }
                cartesian_product(&factors)
                    .into_iter()
                    .map(|mut items| {
                        let tail = if open_tail.is_some() {
                            items.pop().unwrap_or_else(Term::null)
                        } else {
                            Term::null()
                        };
                        Term::list_with_tail(items, tail)
                    })
                    .collect()
            }
            Term::Const(_) | Term::Seq(Sequence::Null) => smallvec![term.clone()],
        }
    }

    /// [`Equality::inject`] lifted to goal predicates.
    ///
    /// An `Assign` is retargeted to every other member of its target's free
    /// group, so the computed value lands on a variable the caller can see.
    pub fn inject_predicate(
        &self,
        predicate: &Predicate,
        to_solve_for: &VarSet,
    ) -> Candidates<Predicate> {
        match predicate {
            Predicate::Term(t) => self
                .inject(t, to_solve_for)
                .into_iter()
                .map(Predicate::Term)
                .collect(),
            Predicate::Assign(assign) => {
                let others: Candidates<Predicate> = self
                    .get_free(assign.target())
                    .into_iter()
                    .flatten()
                    .filter(|member| *member != assign.target())
                    .map(|member| Predicate::Assign(assign.retarget(member.clone())))
                    .collect();
                if others.is_empty() {
                    smallvec![predicate.clone()]
                } else {
                    others
                }
            }
            Predicate::Assert(_) => smallvec![predicate.clone()],
        }
    }

    /// The native values of every variable in `to_solve_for` that resolves
    /// completely. Variables that do not are left out.
    pub fn solutions(&self, to_solve_for: &VarSet) -> Result<Solution> {
        let mut out = Solution::new();
        for v in to_solve_for {
            let resolved = match self.get_fixed(v).and_then(|value| self.deep(value)) {
                Ok(resolved) => resolved,
                Err(e) if e.is_branch_local() => continue,
                Err(e) => return Err(e),
            };
            out.insert(v.clone(), deconstruct(&resolved)?);
        }
        Ok(out)
    }

    /// Run a computed goal against the current bindings.
    ///
    /// Errors returned by the host function come back unchanged.
    ///
    /// Term predicates are not evaluable here; the search matches them
    /// against the database instead.
    pub fn evaluate(&self, predicate: &Predicate) -> Result<Equality> {
        match predicate {
            Predicate::Assign(assign) => {
                let args = self.arguments(assign.params())?;
                let value = assign.call(&args)?;
                self.add(&Term::Var(assign.target().clone()), &value)
            }
            Predicate::Assert(assert) => {
                let args = self.arguments(assert.params())?;
                if assert.call(&args)? {
                    Ok(self.clone())
                } else {
                    Err(Error::AssertionFailed(render_arguments(assert.params(), &args)))
                }
            }
            Predicate::Term(t) => Err(Error::NotConstructible(format!(
                "{} is not a computed goal",
                t
            ))),
        }
    }

    fn arguments(&self, params: &[Variable]) -> Result<SmallVec<[Term; 4]>> {
        params
            .iter()
            .map(|p| self.get_fixed(p).cloned())
            .collect()
    }
}

fn render_arguments(params: &[Variable], args: &[Term]) -> String {
    params
        .iter()
        .zip(args)
        .map(|(p, a)| format!("{} = {}", p, a))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every way of picking one element from each factor, in lexicographic
/// order. An empty factor list yields one empty combination.
pub(crate) fn cartesian_product<T: Clone>(factors: &[Candidates<T>]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::with_capacity(factors.len())];
    for factor in factors {
        if let [only] = factor.as_slice() {
            for combo in &mut out {
                combo.push(only.clone());
            }
            continue;
        }
        let mut next = Vec::with_capacity(out.len() * factor.len());
        for prefix in &out {
            for item in factor {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        out = next;
    }
    out
}

impl PartialEq for Equality {
    fn eq(&self, other: &Self) -> bool {
        if self.fixed != other.fixed || self.free.len() != other.free.len() {
            return false;
        }
        let mut mine: Vec<&VarSet> = self.free.iter().collect();
        let mut theirs: Vec<&VarSet> = other.free.iter().collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

impl Eq for Equality {}

impl fmt::Display for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn group(vars: &VarSet) -> String {
            let names: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
            format!("{{{}}}", names.join(", "))
        }

        let mut parts: Vec<String> = self.free.iter().map(group).collect();
        let mut fixed: Vec<String> = self
            .fixed
            .iter()
            .map(|(value, vars)| format!("{}: {}", value, group(vars)))
            .collect();
        fixed.sort();
        parts.extend(fixed);
        if parts.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

impl fmt::Debug for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Equality({})", self)
    }
}

#[cfg(test)]
#[path = "tests/equality.rs"]
mod tests;

//! Search - depth-first resolution over a rule database.
//!
//! A [`Search`] keeps a LIFO stack of goals, each paired with the bindings
//! its branch has accumulated. Every step pops one goal and either
//! 1. evaluates it directly, if it is an `Assign` or `Assert`, or
//! 2. tries it against every rule in database order, renaming each rule into
//!    a fresh frame and pushing the rule body (plus whatever the goal still
//!    had left to prove) for each successful head match.
//!
//! A branch with nothing left to prove produces a solution: the native values
//! of the query's variables.

use crate::equality::{cartesian_product, Candidates, Equality, Solution};
use crate::error::{Error, Result};
use crate::metrics::{MetricsReport, SearchMetrics};
use crate::rule::{Predicate, Rule};
use crate::term::{Term, VarSet};
use crate::unify::unify;
use std::collections::VecDeque;

#[cfg(feature = "tracing")]
use crate::trace::{debug, trace};

/// Tuning knobs for a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Frame given to the first rule activation. Later activations count up
    /// from here.
    pub first_frame: u64,
    /// Stop with [`Error::StepLimitExceeded`] after this many goals have been
    /// processed.
    pub max_steps: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            first_frame: 1,
            max_steps: None,
        }
    }
}

/// An ordered collection of rules and facts.
#[derive(Clone, Debug, Default)]
pub struct Database {
    rules: Vec<Rule>,
}

impl Database {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Append a rule. Rules are tried in insertion order.
    pub fn push(&mut self, rule: impl Into<Rule>) {
        self.rules.push(rule.into());
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Search for every solution of `query` with the default configuration.
    pub fn search(&self, query: &Term) -> Search<'_> {
        self.search_with(query, SearchConfig::default())
    }

    pub fn search_with(&self, query: &Term, config: SearchConfig) -> Search<'_> {
        Search::new(self, query, config)
    }
}

impl FromIterator<Rule> for Database {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Extend<Rule> for Database {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        self.rules.extend(iter);
    }
}

/// Search `db` for every solution of `query`.
pub fn search<'a>(db: &'a Database, query: &Term) -> Search<'a> {
    db.search(query)
}

/// A predicate still to be proved, plus the conjunction that follows it.
#[derive(Clone, Debug)]
struct Goal {
    predicate: Predicate,
    body: VecDeque<Predicate>,
}

impl Goal {
    /// Split a non-empty conjunction into its first predicate and the rest.
    fn from_conjunction(predicates: impl Into<VecDeque<Predicate>>) -> Option<Goal> {
        let mut body: VecDeque<Predicate> = predicates.into();
        let predicate = body.pop_front()?;
        Some(Goal { predicate, body })
    }
}

/// Result of a single step of the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepResult {
    /// More work may remain.
    Continue,
    /// The goal stack is empty.
    Exhausted,
}

/// Lazy iterator over the solutions of one query.
///
/// Solutions come out in depth-first order with database order preserved.
/// A malformed input (see [`Error::is_branch_local`]) is yielded once as an
/// `Err` after any solutions already found, and ends the search.
pub struct Search<'a> {
    db: &'a Database,
    to_solve_for: VarSet,
    stack: Vec<(Goal, Equality)>,
    pending: VecDeque<Solution>,
    failure: Option<Error>,
    next_frame: u64,
    steps: usize,
    max_steps: Option<usize>,
    done: bool,
    metrics: SearchMetrics,
}

impl<'a> Search<'a> {
    pub fn new(db: &'a Database, query: &Term, config: SearchConfig) -> Self {
        let root = Goal {
            predicate: Predicate::Term(query.clone()),
            body: VecDeque::new(),
        };
        Self {
            db,
            to_solve_for: query.variables(),
            stack: vec![(root, Equality::new())],
            pending: VecDeque::new(),
            failure: None,
            next_frame: config.first_frame,
            steps: 0,
            max_steps: config.max_steps,
            done: false,
            metrics: SearchMetrics::new(),
        }
    }

    /// The variables solutions report on.
    pub fn to_solve_for(&self) -> &VarSet {
        &self.to_solve_for
    }

    /// Goals processed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Snapshot of the counters. Always zero without the `tracing` feature.
    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    fn step(&mut self) -> Result<StepResult> {
        if self.stack.is_empty() {
            return Ok(StepResult::Exhausted);
        }
        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(Error::StepLimitExceeded(limit));
            }
        }
        let Some((goal, equality)) = self.stack.pop() else {
            return Ok(StepResult::Exhausted);
        };
        self.steps += 1;
        self.metrics.record_step();

        #[cfg(feature = "tracing")]
        trace!(step = self.steps, goal = %goal.predicate, depth = self.stack.len(), "search_pop");

        let Goal { predicate, body } = goal;
        match predicate {
            Predicate::Term(term) => self.resolve(&term, &body, &equality)?,
            computed => self.evaluate(&computed, body, &equality)?,
        }
        Ok(StepResult::Continue)
    }

    fn evaluate(
        &mut self,
        predicate: &Predicate,
        body: VecDeque<Predicate>,
        equality: &Equality,
    ) -> Result<()> {
        let next = match equality.evaluate(predicate) {
            Ok(next) => next,
            Err(e) if e.is_branch_local() => {
                self.metrics.record_evaluation_failure();
                #[cfg(feature = "tracing")]
                trace!(error = %e, "search_prune_computed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.metrics.record_evaluation();
        match Goal::from_conjunction(body) {
            Some(goal) => self.push(goal, next),
            None => self.emit(&next)?,
        }
        Ok(())
    }

    fn resolve(
        &mut self,
        term: &Term,
        rest: &VecDeque<Predicate>,
        equality: &Equality,
    ) -> Result<()> {
        let db = self.db;
        for rule in db.rules() {
            let frame = self.next_frame;
            self.next_frame += 1;
            let renamed = rule.with_frame(frame);
            self.metrics.record_activation();

            let unified = match unify(term, renamed.head(), equality) {
                Ok(unified) => unified,
                Err(e) if e.is_branch_local() => {
                    self.metrics.record_unification_failure();
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.metrics.record_unification();

            #[cfg(feature = "tracing")]
            debug!(frame, rule = %renamed, bindings = %unified, "search_activate");

            if renamed.body().is_empty() && rest.is_empty() {
                self.emit(&unified)?;
                continue;
            }

            let factors: Vec<Candidates<Predicate>> = renamed
                .body()
                .iter()
                .chain(rest)
                .map(|p| unified.inject_predicate(p, &self.to_solve_for))
                .collect();
            for conjunction in cartesian_product(&factors) {
                if let Some(goal) = Goal::from_conjunction(conjunction) {
                    self.push(goal, unified.clone());
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, goal: Goal, equality: Equality) {
        self.stack.push((goal, equality));
        self.metrics.record_push(self.stack.len() as u64);
    }

    fn emit(&mut self, equality: &Equality) -> Result<()> {
        let solution = equality.solutions(&self.to_solve_for)?;
        #[cfg(feature = "tracing")]
        debug!(bindings = %equality, "search_solution");
        self.pending.push_back(solution);
        Ok(())
    }
}

impl Iterator for Search<'_> {
    type Item = Result<Solution>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(solution) = self.pending.pop_front() {
                self.metrics.record_solution();
                return Some(Ok(solution));
            }
            if let Some(e) = self.failure.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            match self.step() {
                Ok(StepResult::Continue) => continue,
                Ok(StepResult::Exhausted) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    debug!(error = %e, steps = self.steps, "search_abort");
                    self.done = true;
                    self.stack.clear();
                    self.failure = Some(e);
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Search<'_> {}

#[cfg(test)]
#[path = "tests/search.rs"]
mod tests;

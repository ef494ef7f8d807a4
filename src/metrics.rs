//! Search metrics collection for profiling and analysis.
//!
//! This module provides aggregate counters for resolution search.
//! When the `tracing` feature is enabled, metrics are collected as the search
//! runs. When disabled, all operations are no-ops with zero overhead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inferlog::Database;
//!
//! let mut search = db.search(&query);
//! let answers: Vec<_> = search.by_ref().collect();
//! let report = search.metrics();
//! println!("Steps: {}, Activations: {}", report.steps, report.rule_activations);
//! ```

/// Aggregate metrics collected during a search.
///
/// Owned by a single [`Search`](crate::Search), so the counters are plain
/// integers.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Default)]
pub struct SearchMetrics {
    /// Goals popped off the stack
    pub steps: u64,
    /// Rules renamed into a fresh frame
    pub rule_activations: u64,
    /// Successful head unifications
    pub unifications: u64,
    /// Failed head unifications
    pub unification_failures: u64,
    /// Successful Assign/Assert evaluations
    pub evaluations: u64,
    /// Failed Assign/Assert evaluations
    pub evaluation_failures: u64,
    /// Goals pushed onto the stack
    pub goals_pushed: u64,
    /// Maximum stack depth observed
    pub max_stack_depth: u64,
    /// Solutions handed to the caller
    pub solutions_yielded: u64,
}

#[cfg(feature = "tracing")]
impl SearchMetrics {
    /// Create a new metrics collector with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    #[inline]
    pub fn record_activation(&mut self) {
        self.rule_activations += 1;
    }

    #[inline]
    pub fn record_unification(&mut self) {
        self.unifications += 1;
    }

    #[inline]
    pub fn record_unification_failure(&mut self) {
        self.unification_failures += 1;
    }

    #[inline]
    pub fn record_evaluation(&mut self) {
        self.evaluations += 1;
    }

    #[inline]
    pub fn record_evaluation_failure(&mut self) {
        self.evaluation_failures += 1;
    }

    /// Record a goal push with the resulting stack depth.
    #[inline]
    pub fn record_push(&mut self, new_depth: u64) {
        self.goals_pushed += 1;
        self.update_max_stack_depth(new_depth);
    }

    #[inline]
    pub fn update_max_stack_depth(&mut self, depth: u64) {
        self.max_stack_depth = self.max_stack_depth.max(depth);
    }

    #[inline]
    pub fn record_solution(&mut self) {
        self.solutions_yielded += 1;
    }

    /// Generate a snapshot report of all metrics.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            steps: self.steps,
            rule_activations: self.rule_activations,
            unifications: self.unifications,
            unification_failures: self.unification_failures,
            evaluations: self.evaluations,
            evaluation_failures: self.evaluation_failures,
            goals_pushed: self.goals_pushed,
            max_stack_depth: self.max_stack_depth,
            solutions_yielded: self.solutions_yielded,
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub steps: u64,
    pub rule_activations: u64,
    pub unifications: u64,
    pub unification_failures: u64,
    pub evaluations: u64,
    pub evaluation_failures: u64,
    pub goals_pushed: u64,
    pub max_stack_depth: u64,
    pub solutions_yielded: u64,
}

impl MetricsReport {
    /// Fraction of head unifications that succeeded.
    pub fn unification_success_rate(&self) -> f64 {
        let total = self.unifications + self.unification_failures;
        if total == 0 {
            1.0
        } else {
            self.unifications as f64 / total as f64
        }
    }

    /// Fraction of computed goals that succeeded.
    pub fn evaluation_success_rate(&self) -> f64 {
        let total = self.evaluations + self.evaluation_failures;
        if total == 0 {
            1.0
        } else {
            self.evaluations as f64 / total as f64
        }
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Search Metrics ===")?;
        writeln!(f, "Steps:              {}", self.steps)?;
        writeln!(f, "Rule activations:   {}", self.rule_activations)?;
        writeln!(
            f,
            "Unifications:       {} ({} failures, {:.1}% success)",
            self.unifications,
            self.unification_failures,
            self.unification_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "Evaluations:        {} ({} failures, {:.1}% success)",
            self.evaluations,
            self.evaluation_failures,
            self.evaluation_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "Goals:              {} pushed, max depth {}",
            self.goals_pushed, self.max_stack_depth
        )?;
        writeln!(f, "Solutions yielded:  {}", self.solutions_yielded)?;
        Ok(())
    }
}

// No-op implementation when tracing is disabled
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Default)]
pub struct SearchMetrics;

#[cfg(not(feature = "tracing"))]
impl SearchMetrics {
    #[inline]
    pub fn new() -> Self {
        SearchMetrics
    }
    #[inline]
    pub fn record_step(&mut self) {}
    #[inline]
    pub fn record_activation(&mut self) {}
    #[inline]
    pub fn record_unification(&mut self) {}
    #[inline]
    pub fn record_unification_failure(&mut self) {}
    #[inline]
    pub fn record_evaluation(&mut self) {}
    #[inline]
    pub fn record_evaluation_failure(&mut self) {}
    #[inline]
    pub fn record_push(&mut self, _new_depth: u64) {}
    #[inline]
    pub fn update_max_stack_depth(&mut self, _depth: u64) {}
    #[inline]
    pub fn record_solution(&mut self) {}
    #[inline]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::default()
    }
    #[inline]
    pub fn reset(&mut self) {}
}

#[cfg(test)]
#[path = "tests/metrics.rs"]
mod tests;

//! Threshold evaluation for metric samples.
//!
//! The evaluator is pure: it compares one sample value against a set of
//! alert definitions and reports which of them fire. It keeps no state
//! between calls, so the same breaching value fires the same alert on
//! every ingest. Deduplication and cooldown are deliberately absent;
//! suppressing repeats is the caller's concern, not the evaluator's.

#[cfg(test)]
mod tests;

use vigil_common::types::{Alert, Condition};

/// Comparison tolerance for the `eq` / `neq` conditions.
///
/// The default is exact IEEE-754 equality, which only fires `eq` when the
/// sample is bit-for-bit the threshold. Counter-style integral metrics
/// (error counts, status codes) compare exactly, so this is usable in
/// practice; for derived float metrics opt into [`Tolerance::Epsilon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// `value == threshold`, no rounding allowance.
    Exact,
    /// `|value - threshold| <= epsilon` counts as equal.
    Epsilon(f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Exact
    }
}

/// Stateless comparator of sample values against alert thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    tolerance: Tolerance,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Returns true when `value` satisfies `condition` against
    /// `threshold`. NaN values satisfy nothing except `neq`.
    pub fn condition_holds(&self, value: f64, condition: Condition, threshold: f64) -> bool {
        let equal = match self.tolerance {
            Tolerance::Exact => value == threshold,
            Tolerance::Epsilon(eps) => (value - threshold).abs() <= eps,
        };
        match condition {
            Condition::Gt => value > threshold,
            Condition::Lt => value < threshold,
            Condition::Eq => equal,
            Condition::Neq => !equal,
        }
    }

    /// Returns the subset of `alerts` whose condition the value breaches,
    /// preserving input order.
    pub fn evaluate<'a>(&self, value: f64, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts
            .iter()
            .filter(|alert| self.condition_holds(value, alert.condition, alert.threshold))
            .collect()
    }
}

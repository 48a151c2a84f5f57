use crate::{AlertEvaluator, Tolerance};
use chrono::Utc;
use vigil_common::types::{Alert, AlertStatus, Condition, Severity};

fn alert(id: &str, condition: Condition, threshold: f64) -> Alert {
    Alert {
        id: id.to_string(),
        metric_name: "system.cpu.percent".to_string(),
        condition,
        threshold,
        severity: Severity::Warning,
        status: AlertStatus::Active,
        created_at: Utc::now(),
        resolved_at: None,
        metadata: None,
    }
}

#[test]
fn test_gt_lt_boundaries() {
    let eval = AlertEvaluator::new();
    assert!(eval.condition_holds(90.1, Condition::Gt, 90.0));
    assert!(!eval.condition_holds(90.0, Condition::Gt, 90.0));
    assert!(eval.condition_holds(89.9, Condition::Lt, 90.0));
    assert!(!eval.condition_holds(90.0, Condition::Lt, 90.0));
}

#[test]
fn test_eq_is_exact_by_default() {
    let eval = AlertEvaluator::new();
    assert!(eval.condition_holds(100.0, Condition::Eq, 100.0));
    // A near-miss does not count as equal.
    assert!(!eval.condition_holds(100.0001, Condition::Eq, 100.0));
    assert!(eval.condition_holds(100.0001, Condition::Neq, 100.0));
}

#[test]
fn test_epsilon_tolerance_opt_in() {
    let eval = AlertEvaluator::with_tolerance(Tolerance::Epsilon(0.001));
    assert!(eval.condition_holds(100.0001, Condition::Eq, 100.0));
    assert!(!eval.condition_holds(100.0001, Condition::Neq, 100.0));
    assert!(!eval.condition_holds(100.5, Condition::Eq, 100.0));
}

#[test]
fn test_nan_fires_nothing_but_neq() {
    let eval = AlertEvaluator::new();
    assert!(!eval.condition_holds(f64::NAN, Condition::Gt, 0.0));
    assert!(!eval.condition_holds(f64::NAN, Condition::Lt, 0.0));
    assert!(!eval.condition_holds(f64::NAN, Condition::Eq, f64::NAN));
    assert!(eval.condition_holds(f64::NAN, Condition::Neq, 0.0));
}

#[test]
fn test_evaluate_returns_breached_subset_in_order() {
    let eval = AlertEvaluator::new();
    let alerts = vec![
        alert("a", Condition::Gt, 90.0),
        alert("b", Condition::Lt, 10.0),
        alert("c", Condition::Gt, 50.0),
    ];
    let fired = eval.evaluate(95.0, &alerts);
    let ids: Vec<&str> = fired.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn test_evaluate_is_stateless_across_calls() {
    let eval = AlertEvaluator::new();
    let alerts = vec![alert("a", Condition::Gt, 90.0)];
    // No dedup: the same breaching value fires every time.
    for _ in 0..3 {
        assert_eq!(eval.evaluate(95.0, &alerts).len(), 1);
    }
}

#[test]
fn test_evaluate_empty_alerts() {
    let eval = AlertEvaluator::new();
    assert!(eval.evaluate(95.0, &[]).is_empty());
}

//! Per-run cost ledger.

use std::collections::BTreeMap;

/// Running cost tracker for one waterfall run.
///
/// `running_cost` never decreases and committed costs are never rolled back.
/// Only the pre-commit `can_afford` check guards the cap: `commit` always
/// records the cost it is given, so an actual cost above its estimate can
/// leave `running_cost` past the cap.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLedger {
    cap: f64,
    running_cost: f64,
    per_stage_actual_cost: BTreeMap<String, f64>,
}

/// Float slack so that e.g. 0.45 + 0.05 against a 0.50 cap isn't rejected.
const EPSILON: f64 = 1e-9;

impl BudgetLedger {
    pub fn new(cap: f64) -> Self {
        let cap = if cap.is_finite() && cap > 0.0 { cap } else { 0.0 };
        Self {
            cap,
            running_cost: 0.0,
            per_stage_actual_cost: BTreeMap::new(),
        }
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    pub fn running_cost(&self) -> f64 {
        self.running_cost
    }

    pub fn remaining(&self) -> f64 {
        (self.cap - self.running_cost).max(0.0)
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.running_cost + sanitize(cost) <= self.cap + EPSILON
    }

    /// Adds a stage cost. Negative or non-finite costs count as zero.
    pub fn commit(&mut self, service: &str, cost: f64) -> f64 {
        let cost = sanitize(cost);
        self.running_cost += cost;
        *self
            .per_stage_actual_cost
            .entry(service.to_string())
            .or_insert(0.0) += cost;
        cost
    }

    pub fn breakdown(&self) -> &BTreeMap<String, f64> {
        &self.per_stage_actual_cost
    }
}

fn sanitize(cost: f64) -> f64 {
    if cost.is_finite() && cost > 0.0 {
        cost
    } else {
        0.0
    }
}

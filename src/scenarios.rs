use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use crate::solver;
use crate::types::{CutPlan, OptimizeParams};

/// Joint-penalty weights swept in the second pass.
const ALPHA_SWEEP: [f64; 4] = [0.0, 100.0, 500.0, 1000.0];

/// One solve result plus the sweep point that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub label: String,
    pub max_pieces: u32,
    pub alpha_joint: f64,
    #[serde(flatten)]
    pub result: CutPlan,
}

/// Deduplicated sweep results, cheapest first, with the three
/// canonical trade-off picks.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    pub all: Vec<Scenario>,
    cost_best: usize,
    length_best: usize,
    joints_best: usize,
}

impl ScenarioSet {
    /// Lowest total actual cost; ties broken by overshoot, then joints.
    pub fn cost_best(&self) -> &Scenario {
        &self.all[self.cost_best]
    }

    /// Lowest overshoot; ties broken by cost, then joints.
    pub fn length_best(&self) -> &Scenario {
        &self.all[self.length_best]
    }

    /// Fewest joints; ties broken by cost, then overshoot.
    pub fn joints_best(&self) -> &Scenario {
        &self.all[self.joints_best]
    }
}

/// Re-runs the exact solve across a grid of piece caps and joint
/// weights, deduplicates by the physical cut list, and derives the
/// cost/length/joints picks. Individual solve failures are swallowed;
/// `None` means nothing succeeded.
pub fn generate_scenarios(base: &OptimizeParams) -> Option<ScenarioSet> {
    if base.required == 0 {
        return None;
    }
    let max_len = base.lengths.iter().copied().filter(|&l| l > 0).max()?;
    let min_pieces = base.required.div_ceil(max_len);

    // The whole grid is laid out up front; each point is an
    // independent solve over its own table.
    let mut grid: Vec<(u32, f64, String)> = Vec::new();
    for cap in min_pieces..=min_pieces.saturating_add(4).min(8) {
        let label = if cap == min_pieces {
            "Minimum Joints".to_string()
        } else if cap == min_pieces + 1 {
            "Balanced".to_string()
        } else {
            format!("{cap} pieces ({} joints)", cap - 1)
        };
        grid.push((cap, base.alpha_joint, label));
    }
    for alpha in ALPHA_SWEEP {
        for cap in min_pieces..=min_pieces.saturating_add(2).min(6) {
            let label = if alpha == 0.0 {
                format!("{cap} pieces (minimize waste)")
            } else if alpha >= 500.0 {
                format!("{cap} pieces (minimize joints)")
            } else {
                format!("{cap} pieces")
            };
            grid.push((cap, alpha, label));
        }
    }

    let mut seen: HashSet<Vec<u32>> = HashSet::new();
    let mut all: Vec<Scenario> = Vec::new();
    for (cap, alpha, label) in grid {
        let params = OptimizeParams {
            max_pieces: Some(cap),
            alpha_joint: alpha,
            ..base.clone()
        };
        let Ok(result) = solver::optimize(&params) else {
            continue;
        };

        // Different parameter points often rebuild the same physical
        // cut list; the sorted multiset is the identity.
        let mut signature = result.plan.clone();
        signature.sort_unstable();
        if !seen.insert(signature) {
            continue;
        }

        all.push(Scenario {
            label,
            max_pieces: cap,
            alpha_joint: alpha,
            result,
        });
    }

    if all.is_empty() {
        return None;
    }

    all.sort_by(|a, b| {
        a.result
            .total_actual_cost
            .total_cmp(&b.result.total_actual_cost)
    });

    let cost_best = argmin(&all, |s| {
        [
            s.result.total_actual_cost,
            s.result.extra as f64,
            s.result.joints as f64,
        ]
    });
    let length_best = argmin(&all, |s| {
        [
            s.result.extra as f64,
            s.result.total_actual_cost,
            s.result.joints as f64,
        ]
    });
    let joints_best = argmin(&all, |s| {
        [
            s.result.joints as f64,
            s.result.total_actual_cost,
            s.result.extra as f64,
        ]
    });

    Some(ScenarioSet {
        all,
        cost_best,
        length_best,
        joints_best,
    })
}

fn argmin(all: &[Scenario], key: impl Fn(&Scenario) -> [f64; 3]) -> usize {
    let mut best = 0;
    for i in 1..all.len() {
        if lex_less(key(&all[i]), key(&all[best])) {
            best = i;
        }
    }
    best
}

fn lex_less(a: [f64; 3], b: [f64; 3]) -> bool {
    for (x, y) in a.iter().zip(&b) {
        match x.total_cmp(y) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> OptimizeParams {
        let mut params = OptimizeParams::new(
            8000,
            vec![500, 800, 1000, 1200, 1500, 2000, 2500, 3000],
        );
        params.small_lengths = vec![500, 800];
        params.cost_per_mm = 0.1;
        params.cost_per_joint_set = 50.0;
        params
    }

    #[test]
    fn test_sweep_produces_unique_scenarios() {
        let set = generate_scenarios(&base_params()).unwrap();
        assert!(!set.all.is_empty());

        let mut signatures: Vec<Vec<u32>> = set
            .all
            .iter()
            .map(|s| {
                let mut sig = s.result.plan.clone();
                sig.sort_unstable();
                sig
            })
            .collect();
        let before = signatures.len();
        signatures.sort();
        signatures.dedup();
        assert_eq!(before, signatures.len(), "duplicate cut lists survived");
    }

    #[test]
    fn test_all_sorted_cheapest_first() {
        let set = generate_scenarios(&base_params()).unwrap();
        for pair in set.all.windows(2) {
            assert!(pair[0].result.total_actual_cost <= pair[1].result.total_actual_cost);
        }
        assert_eq!(
            set.cost_best().result.total_actual_cost,
            set.all[0].result.total_actual_cost
        );
    }

    #[test]
    fn test_picks_are_optimal_under_their_own_criterion() {
        let set = generate_scenarios(&base_params()).unwrap();
        for s in &set.all {
            assert!(set.cost_best().result.total_actual_cost <= s.result.total_actual_cost);
            assert!(set.length_best().result.extra <= s.result.extra);
            assert!(set.joints_best().result.joints <= s.result.joints);
        }
    }

    #[test]
    fn test_pick_tie_breaks() {
        let set = generate_scenarios(&base_params()).unwrap();
        // Among equal-cost scenarios the cost pick has the least
        // overshoot, and among equal-overshoot ones the least cost.
        for s in &set.all {
            if s.result.total_actual_cost == set.cost_best().result.total_actual_cost {
                assert!(set.cost_best().result.extra <= s.result.extra);
            }
            if s.result.extra == set.length_best().result.extra {
                assert!(
                    set.length_best().result.total_actual_cost <= s.result.total_actual_cost
                );
            }
        }
    }

    #[test]
    fn test_scenarios_carry_their_sweep_point() {
        let set = generate_scenarios(&base_params()).unwrap();
        for s in &set.all {
            assert!(s.result.pieces <= s.max_pieces);
            assert!(!s.label.is_empty());
        }
    }

    #[test]
    fn test_no_lengths_yields_none() {
        let params = OptimizeParams::new(8000, vec![]);
        assert!(generate_scenarios(&params).is_none());
    }

    #[test]
    fn test_zero_required_yields_none() {
        let params = OptimizeParams::new(0, vec![500, 1000]);
        assert!(generate_scenarios(&params).is_none());
    }

    #[test]
    fn test_min_pieces_past_grid_yields_none() {
        // ceil(10000/1000) = 10 > 8, so both cap ranges are empty.
        let params = OptimizeParams::new(10_000, vec![1000]);
        assert!(generate_scenarios(&params).is_none());
    }

    #[test]
    fn test_first_scenario_labels() {
        let set = generate_scenarios(&base_params()).unwrap();
        assert!(set.all.iter().any(|s| s.label == "Minimum Joints"));
    }
}

use std::collections::{HashMap, HashSet};

use crate::solver::{checked_required, finalize, infeasible, min_allowed_total, prepare_lengths};
use crate::types::{CutPlan, OptimizeParams, SolveError, Strategy};

/// Branch-and-bound refuses targets above this span.
pub const BRANCH_AND_BOUND_SPAN_LIMIT: u32 = 50_000;
/// Recursive memo refuses problems whose remaining-length bound
/// exceeds this.
pub const MEMO_SPAN_LIMIT: u64 = 100_000_000;

/// Greedy never overshoots by more than this fraction of the target.
const GREEDY_OVERSHOOT_WINDOW: f64 = 0.1;

/// Greedy heuristic: repeatedly append the piece whose new total lands
/// closest to the target, small pieces handicapped by their penalty.
/// Lengths are tried largest first, so equal scores go to the larger
/// piece. Fast, not optimal.
pub fn greedy(params: &OptimizeParams) -> Result<CutPlan, SolveError> {
    let mut lengths = prepare_lengths(&params.lengths)?;
    let required = checked_required(params)?;
    lengths.reverse();

    let small: HashSet<u32> = params.small_lengths.iter().copied().collect();
    let mut plan: Vec<u32> = Vec::new();
    let mut total: u32 = 0;

    while total < required {
        if params.max_pieces.is_some_and(|cap| plan.len() as u32 >= cap) {
            break;
        }

        let mut best_pick: Option<u32> = None;
        let mut best_score = f64::NEG_INFINITY;
        for &li in &lengths {
            let Some(new_total) = total.checked_add(li) else {
                continue;
            };
            let overshoot = new_total as i64 - required as i64;
            if overshoot as f64 > required as f64 * GREEDY_OVERSHOOT_WINDOW {
                continue;
            }

            let handicap = if small.contains(&li) {
                params.beta_small
            } else {
                0.0
            };
            let score = -(overshoot.abs() as f64) - handicap;
            if score > best_score {
                best_score = score;
                best_pick = Some(li);
            }
        }

        let Some(pick) = best_pick else {
            break;
        };
        plan.push(pick);
        total += pick;
    }

    if plan.is_empty() {
        return Err(infeasible(params));
    }
    Ok(finalize(params, plan, total))
}

/// Depth-first search over multisets of pieces with cost pruning.
/// Optimal within its acceptance window, but exponential; refuses
/// targets past [`BRANCH_AND_BOUND_SPAN_LIMIT`].
pub fn branch_and_bound(params: &OptimizeParams) -> Result<CutPlan, SolveError> {
    let mut lengths = prepare_lengths(&params.lengths)?;
    let required = checked_required(params)?;
    if required > BRANCH_AND_BOUND_SPAN_LIMIT {
        return Err(SolveError::ProblemTooLarge {
            strategy: Strategy::BranchAndBound,
            what: "required length",
            bound: required as u64,
            limit: BRANCH_AND_BOUND_SPAN_LIMIT as u64,
            suggestion: Strategy::Bounded,
        });
    }
    lengths.reverse();

    let search = BbSearch {
        params,
        lengths: &lengths,
        small: params.small_lengths.iter().copied().collect(),
        required,
        min_allowed: min_allowed_total(required, params.allow_undershoot_pct),
        // Largest useful total; also caps how deep a branch can grow.
        upper: required.saturating_add(lengths[0]),
    };

    let mut best: Option<(Vec<u32>, u32)> = None;
    let mut best_cost = f64::INFINITY;
    search.recurse(&mut Vec::new(), 0, 0, &mut best, &mut best_cost);

    match best {
        Some((plan, total)) => Ok(finalize(params, plan, total)),
        None => Err(infeasible(params)),
    }
}

struct BbSearch<'a> {
    params: &'a OptimizeParams,
    lengths: &'a [u32],
    small: HashSet<u32>,
    required: u32,
    min_allowed: u32,
    upper: u32,
}

impl BbSearch<'_> {
    fn recurse(
        &self,
        plan: &mut Vec<u32>,
        total: u32,
        start: usize,
        best: &mut Option<(Vec<u32>, u32)>,
        best_cost: &mut f64,
    ) {
        if self
            .params
            .max_pieces
            .is_some_and(|cap| plan.len() as u32 > cap)
        {
            return;
        }

        if total >= self.min_allowed && total <= self.upper && self.within_waste(total) {
            let cost = self.plan_cost(plan, total);
            if cost < *best_cost {
                *best_cost = cost;
                *best = Some((plan.clone(), total));
            }
            // Keep going: more pieces can still be cheaper when
            // shortage dominates.
        }

        if total > self.upper {
            return;
        }
        if !plan.is_empty() && self.plan_cost(plan, total) >= *best_cost {
            return;
        }

        // Non-decreasing index keeps each multiset visited once.
        for i in start..self.lengths.len() {
            let li = self.lengths[i];
            let Some(next) = total.checked_add(li) else {
                continue;
            };
            plan.push(li);
            self.recurse(plan, next, i, best, best_cost);
            plan.pop();
        }
    }

    fn within_waste(&self, total: u32) -> bool {
        match self.params.max_waste_pct {
            Some(limit) => {
                total.saturating_sub(self.required) as f64 / self.required as f64 <= limit
            }
            None => true,
        }
    }

    fn plan_cost(&self, plan: &[u32], total: u32) -> f64 {
        let extra = total.saturating_sub(self.required);
        let shortage = self.required.saturating_sub(total);
        let joints = (plan.len() as u32).saturating_sub(1);
        let small_count = plan.iter().filter(|l| self.small.contains(l)).count() as u32;
        extra as f64
            + self.params.alpha_joint * joints as f64
            + self.params.beta_small * small_count as f64
            + self.params.gamma_short * shortage as f64
    }
}

/// Best completion of a partially built plan, as cached by the memo.
#[derive(Debug, Clone)]
struct Completion {
    total: u32,
    pieces: u32,
    small: u32,
    plan: Vec<u32>,
}

/// Top-down formulation memoized by (remaining, pieces, small).
/// Exists for benchmarking against the iterative tables.
pub fn recursive_memo(params: &OptimizeParams) -> Result<CutPlan, SolveError> {
    let lengths = prepare_lengths(&params.lengths)?;
    let required = checked_required(params)?;
    let max_len = lengths[lengths.len() - 1];

    let bound = required as u64 + max_len as u64 - 1;
    if bound > MEMO_SPAN_LIMIT {
        return Err(SolveError::ProblemTooLarge {
            strategy: Strategy::RecursiveMemo,
            what: "remaining-length bound",
            bound,
            limit: MEMO_SPAN_LIMIT,
            suggestion: Strategy::Greedy,
        });
    }

    let ctx = MemoCtx {
        params,
        lengths: &lengths,
        small: params.small_lengths.iter().copied().collect(),
        required,
    };
    let mut memo: HashMap<(i64, u32, u32), Option<Completion>> = HashMap::new();

    match ctx.solve(required as i64, 0, 0, &mut memo) {
        Some(done) => Ok(finalize(params, done.plan, done.total)),
        None => Err(infeasible(params)),
    }
}

struct MemoCtx<'a> {
    params: &'a OptimizeParams,
    lengths: &'a [u32],
    small: HashSet<u32>,
    required: u32,
}

impl MemoCtx<'_> {
    fn solve(
        &self,
        remaining: i64,
        pieces: u32,
        small: u32,
        memo: &mut HashMap<(i64, u32, u32), Option<Completion>>,
    ) -> Option<Completion> {
        if remaining <= 0 {
            return Some(Completion {
                total: (self.required as i64 - remaining) as u32,
                pieces,
                small,
                plan: Vec::new(),
            });
        }
        if self.params.max_pieces.is_some_and(|cap| pieces >= cap) {
            return None;
        }

        let key = (remaining, pieces, small);
        if let Some(hit) = memo.get(&key) {
            return hit.clone();
        }

        let mut best: Option<Completion> = None;
        let mut best_score = f64::INFINITY;
        for &li in self.lengths {
            let used_small = small + u32::from(self.small.contains(&li));
            let Some(sub) = self.solve(remaining - li as i64, pieces + 1, used_small, memo)
            else {
                continue;
            };

            let extra = sub.total.saturating_sub(self.required);
            let shortage = self.required.saturating_sub(sub.total);
            let joints = sub.pieces.saturating_sub(1);
            let score = extra as f64
                + self.params.alpha_joint * joints as f64
                + self.params.beta_small * sub.small as f64
                + self.params.gamma_short * shortage as f64;

            if score < best_score {
                best_score = score;
                let mut plan = Vec::with_capacity(sub.plan.len() + 1);
                plan.push(li);
                plan.extend(sub.plan);
                best = Some(Completion {
                    total: sub.total,
                    pieces: sub.pieces,
                    small: sub.small,
                    plan,
                });
            }
        }

        memo.insert(key, best.clone());
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::optimize;

    fn assert_shape_valid(plan: &CutPlan, params: &OptimizeParams) {
        assert_eq!(plan.plan.iter().sum::<u32>(), plan.total);
        assert_eq!(plan.pieces as usize, plan.plan.len());
        assert_eq!(plan.joints, plan.pieces.saturating_sub(1));
        let expected_cost = plan.extra as f64
            + params.alpha_joint * plan.joints as f64
            + params.beta_small * plan.small_count as f64
            + params.gamma_short * plan.shortage as f64;
        assert_eq!(plan.cost, expected_cost);
    }

    #[test]
    fn test_all_strategies_find_the_exact_single_piece() {
        let params = OptimizeParams::new(2000, vec![500, 1000, 2000]);
        for strategy in Strategy::ALL {
            let plan = strategy.solve(&params).unwrap();
            assert_shape_valid(&plan, &params);
            assert_eq!(plan.plan, vec![2000], "{strategy} missed the exact piece");
            assert_eq!(plan.extra, 0);
        }
    }

    #[test]
    fn test_greedy_prefers_closest_fit() {
        let params = OptimizeParams::new(1500, vec![500, 800, 1000]);
        let plan = greedy(&params).unwrap();
        assert_shape_valid(&plan, &params);
        // 1000 lands closest first, then 500 completes the span.
        assert_eq!(plan.plan, vec![1000, 500]);
        assert_eq!(plan.total, 1500);
    }

    #[test]
    fn test_greedy_respects_overshoot_window() {
        // Every piece overshoots a 100mm target by more than 10%.
        let mut params = OptimizeParams::new(100, vec![500, 1000]);
        params.max_pieces = Some(1);
        assert!(matches!(greedy(&params), Err(SolveError::Infeasible(_))));
    }

    #[test]
    fn test_greedy_stops_at_piece_cap() {
        let mut params = OptimizeParams::new(3000, vec![1000]);
        params.max_pieces = Some(2);
        let plan = greedy(&params).unwrap();
        assert_shape_valid(&plan, &params);
        assert_eq!(plan.plan, vec![1000, 1000]);
        assert_eq!(plan.shortage, 1000);
    }

    #[test]
    fn test_greedy_handicaps_small_pieces() {
        // Residual 500: the small 500 still gets picked because every
        // other piece overshoots past the window.
        let mut params = OptimizeParams::new(1500, vec![500, 800, 1000]);
        params.small_lengths = vec![500];
        let plan = greedy(&params).unwrap();
        assert_eq!(plan.plan, vec![1000, 500]);
        assert_eq!(plan.small_count, 1);
    }

    #[test]
    fn test_branch_and_bound_matches_dp_on_small_problems() {
        let cases = [
            OptimizeParams::new(1500, vec![500, 800, 1000]),
            OptimizeParams::new(3500, vec![600, 800, 1000, 1200, 1500, 2000]),
            OptimizeParams::new(2400, vec![1200, 2500]),
        ];
        for params in cases {
            let dp = optimize(&params).unwrap();
            let bb = branch_and_bound(&params).unwrap();
            assert_shape_valid(&bb, &params);
            assert_eq!(bb.cost, dp.cost, "cost parity for {}", params.required);
            assert_eq!(bb.total, dp.total);
            assert_eq!(bb.pieces, dp.pieces);
        }
    }

    #[test]
    fn test_branch_and_bound_refuses_large_spans() {
        let params = OptimizeParams::new(60_000, vec![1000]);
        match branch_and_bound(&params) {
            Err(SolveError::ProblemTooLarge {
                strategy, what, ..
            }) => {
                assert_eq!(strategy, Strategy::BranchAndBound);
                assert_eq!(what, "required length");
            }
            other => panic!("expected ProblemTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_branch_and_bound_honors_waste_ceiling() {
        let mut params = OptimizeParams::new(1000, vec![1200]);
        params.max_waste_pct = Some(0.1);
        assert!(matches!(
            branch_and_bound(&params),
            Err(SolveError::Infeasible(_))
        ));
    }

    #[test]
    fn test_branch_and_bound_respects_piece_cap() {
        let mut params = OptimizeParams::new(750, vec![500, 1000, 1500]);
        params.max_pieces = Some(1);
        let plan = branch_and_bound(&params).unwrap();
        assert_eq!(plan.plan, vec![1000]);
        assert_eq!(plan.extra, 250);
    }

    #[test]
    fn test_recursive_memo_matches_dp_on_small_problems() {
        let cases = [
            OptimizeParams::new(1500, vec![500, 800, 1000]),
            OptimizeParams::new(2400, vec![1200, 2500]),
        ];
        for params in cases {
            let dp = optimize(&params).unwrap();
            let memo = recursive_memo(&params).unwrap();
            assert_shape_valid(&memo, &params);
            assert_eq!(memo.cost, dp.cost, "cost parity for {}", params.required);
            assert_eq!(memo.total, dp.total);
        }
    }

    #[test]
    fn test_recursive_memo_respects_piece_cap() {
        let mut params = OptimizeParams::new(750, vec![500, 1000, 1500]);
        params.max_pieces = Some(1);
        let plan = recursive_memo(&params).unwrap();
        assert_shape_valid(&plan, &params);
        assert_eq!(plan.plan, vec![1000]);
    }

    #[test]
    fn test_recursive_memo_refuses_past_span_limit() {
        let params = OptimizeParams::new(200_000_000, vec![1000]);
        assert!(matches!(
            recursive_memo(&params),
            Err(SolveError::ProblemTooLarge {
                strategy: Strategy::RecursiveMemo,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_required_rejected_by_all() {
        let params = OptimizeParams::new(0, vec![500]);
        for strategy in Strategy::ALL {
            assert!(
                matches!(strategy.solve(&params), Err(SolveError::InvalidInput(_))),
                "{strategy} accepted a zero target"
            );
        }
    }
}

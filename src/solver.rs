use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::types::{CutPlan, OptimizeParams, SolveError, Strategy};

/// Largest table the exact builder will allocate, in slots.
pub const EXACT_TABLE_LIMIT: u64 = 100_000_000;
/// Largest table the bounded builder will allocate, in slots.
pub const BOUNDED_TABLE_LIMIT: u64 = 10_000_000;

/// Best known state reaching one table slot. The slot index is the
/// reachable total, so the total itself is not stored.
#[derive(Debug, Clone, Copy)]
struct Node {
    pieces: u32,
    small: u32,
    /// None only for the root state at total 0.
    step: Option<Step>,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    prev: u32,
    len_idx: u32,
}

/// Winning end state, before reconstruction.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    total: u32,
    pieces: u32,
    small: u32,
    extra: u32,
    cost: f64,
}

/// Exact solve: the table covers every useful overshoot, which is one
/// unit less than the largest piece.
pub fn optimize(params: &OptimizeParams) -> Result<CutPlan, SolveError> {
    let lengths = prepare_lengths(&params.lengths)?;
    let required = checked_required(params)?;
    let max_len = largest(&lengths);

    let tmax = required as u64 + max_len as u64 - 1;
    if tmax > EXACT_TABLE_LIMIT {
        return Err(SolveError::ProblemTooLarge {
            strategy: Strategy::Exact,
            what: "table bound",
            bound: tmax,
            limit: EXACT_TABLE_LIMIT,
            suggestion: Strategy::Bounded,
        });
    }

    solve_with_table(params, &lengths, required, tmax as u32)
}

/// Bounded solve: caps overshoot at max(100mm, 5% of the target) to
/// shrink the table for large inputs. Misses plans whose only feasible
/// overshoot is larger than the cap.
pub fn optimize_bounded(params: &OptimizeParams) -> Result<CutPlan, SolveError> {
    let lengths = prepare_lengths(&params.lengths)?;
    let required = checked_required(params)?;
    let max_len = largest(&lengths);

    let max_overshoot = (max_len - 1).min((required / 20).max(100));
    let tmax = required as u64 + max_overshoot as u64;
    if tmax > BOUNDED_TABLE_LIMIT {
        return Err(SolveError::ProblemTooLarge {
            strategy: Strategy::Bounded,
            what: "table bound",
            bound: tmax,
            limit: BOUNDED_TABLE_LIMIT,
            suggestion: Strategy::Greedy,
        });
    }

    solve_with_table(params, &lengths, required, tmax as u32)
}

fn solve_with_table(
    params: &OptimizeParams,
    lengths: &[u32],
    required: u32,
    tmax: u32,
) -> Result<CutPlan, SolveError> {
    let table = build_table(params, lengths, tmax);
    let winner = select_candidate(&table, params, required, tmax)?;
    let plan = reconstruct(&table, lengths, winner.total);
    debug_assert_eq!(plan.len() as u32, winner.pieces);
    debug_assert_eq!(plan.iter().sum::<u32>(), winner.total);
    Ok(finalize(params, plan, winner.total))
}

/// Deduplicate, drop non-positive entries, sort ascending.
pub fn prepare_lengths(raw: &[u32]) -> Result<Vec<u32>, SolveError> {
    let set: BTreeSet<u32> = raw.iter().copied().filter(|&l| l > 0).collect();
    if set.is_empty() {
        return Err(SolveError::InvalidInput("no usable stock lengths".into()));
    }
    Ok(set.into_iter().collect())
}

pub(crate) fn checked_required(params: &OptimizeParams) -> Result<u32, SolveError> {
    if params.required == 0 {
        return Err(SolveError::InvalidInput(
            "required length must be greater than zero".into(),
        ));
    }
    Ok(params.required)
}

/// Smallest total the selector accepts under the undershoot allowance.
pub(crate) fn min_allowed_total(required: u32, allow_undershoot_pct: f64) -> u32 {
    if allow_undershoot_pct > 0.0 {
        (required as f64 * (1.0 - allow_undershoot_pct)).ceil() as u32
    } else {
        required
    }
}

pub(crate) fn infeasible(params: &OptimizeParams) -> SolveError {
    match params.max_waste_pct {
        Some(limit) => SolveError::Infeasible(format!(
            "no solution within {:.1}% waste limit; try increasing max waste, max pieces, or allowing undershoot",
            limit * 100.0
        )),
        None => SolveError::Infeasible(
            "no feasible combination found; try increasing max pieces or allowing undershoot"
                .into(),
        ),
    }
}

/// Unbounded-knapsack forward DP. Candidates that would land past
/// `tmax` are dropped, never clamped, so every stored state's chain
/// sums exactly to its slot index.
fn build_table(params: &OptimizeParams, lengths: &[u32], tmax: u32) -> Vec<Option<Node>> {
    let small: HashSet<u32> = params.small_lengths.iter().copied().collect();
    let mut best: Vec<Option<Node>> = vec![None; tmax as usize + 1];
    best[0] = Some(Node {
        pieces: 0,
        small: 0,
        step: None,
    });

    for t in 0..=tmax {
        let Some(cur) = best[t as usize] else {
            continue;
        };

        for (i, &li) in lengths.iter().enumerate() {
            let nt = t as u64 + li as u64;
            if nt > tmax as u64 {
                continue;
            }
            let nt = nt as u32;

            let cand = Node {
                pieces: cur.pieces + 1,
                small: cur.small + u32::from(small.contains(&li)),
                step: Some(Step {
                    prev: t,
                    len_idx: i as u32,
                }),
            };

            if params.max_pieces.is_some_and(|cap| cand.pieces > cap) {
                continue;
            }

            match best[nt as usize] {
                Some(old) if !better_dp(cand, old) => {}
                _ => best[nt as usize] = Some(cand),
            }
        }
    }

    best
}

/// Tie-break for two states reaching the same slot: fewer pieces, then
/// fewer small pieces. Totals are equal by construction, so the
/// smaller-total rule never fires.
fn better_dp(a: Node, b: Node) -> bool {
    if a.pieces != b.pieces {
        return a.pieces < b.pieces;
    }
    a.small < b.small
}

fn select_candidate(
    table: &[Option<Node>],
    params: &OptimizeParams,
    required: u32,
    tmax: u32,
) -> Result<Candidate, SolveError> {
    let min_allowed = min_allowed_total(required, params.allow_undershoot_pct);

    let mut best: Option<Candidate> = None;
    for t in min_allowed..=tmax {
        let Some(node) = table[t as usize] else {
            continue;
        };

        let extra = t.saturating_sub(required);
        let shortage = required.saturating_sub(t);
        if let Some(limit) = params.max_waste_pct
            && extra as f64 / required as f64 > limit
        {
            continue;
        }

        let joints = node.pieces.saturating_sub(1);
        let cost = extra as f64
            + params.alpha_joint * joints as f64
            + params.beta_small * node.small as f64
            + params.gamma_short * shortage as f64;

        let cand = Candidate {
            total: t,
            pieces: node.pieces,
            small: node.small,
            extra,
            cost,
        };
        if best.is_none_or(|b| better_candidate(cand, b)) {
            best = Some(cand);
        }
    }

    best.ok_or_else(|| infeasible(params))
}

/// Selection contract: for equal cost prefer less overshoot, then
/// fewer pieces, then fewer small pieces, then the smallest total.
fn better_candidate(a: Candidate, b: Candidate) -> bool {
    match a.cost.total_cmp(&b.cost) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => {
            (a.extra, a.pieces, a.small, a.total) < (b.extra, b.pieces, b.small, b.total)
        }
    }
}

/// Walk backpointers from the winning slot to the root, then reverse.
fn reconstruct(table: &[Option<Node>], lengths: &[u32], total: u32) -> Vec<u32> {
    let mut plan = Vec::new();
    let mut cur = table[total as usize];
    while let Some(node) = cur
        && let Some(step) = node.step
    {
        plan.push(lengths[step.len_idx as usize]);
        cur = table[step.prev as usize];
    }
    plan.reverse();
    plan
}

/// Derive every reported metric from the raw plan. Shared by all
/// strategies so the cost formula and result shape live in one place.
/// The joiner length is informational and never added to the span.
pub(crate) fn finalize(params: &OptimizeParams, plan: Vec<u32>, total: u32) -> CutPlan {
    let small: HashSet<u32> = params.small_lengths.iter().copied().collect();

    let mut counts_by_length: BTreeMap<u32, u32> = BTreeMap::new();
    for &len in &plan {
        *counts_by_length.entry(len).or_insert(0) += 1;
    }

    let extra = total.saturating_sub(params.required);
    let shortage = params.required.saturating_sub(total);
    let pieces = plan.len() as u32;
    let joints = pieces.saturating_sub(1);
    let small_count = plan.iter().filter(|l| small.contains(l)).count() as u32;

    let cost = extra as f64
        + params.alpha_joint * joints as f64
        + params.beta_small * small_count as f64
        + params.gamma_short * shortage as f64;

    let material_cost = total as f64 * params.cost_per_mm;
    let joint_cost = joints as f64 * params.cost_per_joint_set;

    CutPlan {
        plan,
        counts_by_length,
        total,
        extra,
        shortage,
        pieces,
        joints,
        small_count,
        cost,
        material_cost,
        joint_cost,
        total_actual_cost: material_cost + joint_cost,
    }
}

fn largest(lengths: &[u32]) -> u32 {
    *lengths
        .last()
        .expect("prepare_lengths returns at least one length")
}

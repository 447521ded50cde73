use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{solver, strategies};

/// Parameters for one solve. Lengths are millimetres.
///
/// The record is immutable for the duration of a solve; callers build
/// a fresh one per invocation rather than mutating shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeParams {
    /// Target rail length.
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub required: u32,
    /// Candidate stock cut lengths.
    #[serde(deserialize_with = "deserialize_u32_vec_from_numbers")]
    pub lengths: Vec<u32>,
    /// Subset of `lengths` that is discouraged (penalized per use).
    #[serde(default, deserialize_with = "deserialize_u32_vec_from_numbers")]
    pub small_lengths: Vec<u32>,
    /// Hard cap on piece count.
    #[serde(default)]
    pub max_pieces: Option<u32>,
    /// Permitted shortfall as a fraction of `required`, e.g. 0.01 for 1%.
    #[serde(default)]
    pub allow_undershoot_pct: f64,
    /// Hard ceiling on overshoot as a fraction of `required`.
    #[serde(default)]
    pub max_waste_pct: Option<f64>,
    /// Penalty per joint (pieces - 1), in mm units.
    #[serde(default = "default_alpha_joint")]
    pub alpha_joint: f64,
    /// Penalty per small piece used.
    #[serde(default = "default_beta_small")]
    pub beta_small: f64,
    /// Penalty per mm of shortfall.
    #[serde(default = "default_gamma_short")]
    pub gamma_short: f64,
    /// Material cost per mm, for the bill of materials only.
    #[serde(default)]
    pub cost_per_mm: f64,
    /// Cost per joint connector set, for the bill of materials only.
    #[serde(default)]
    pub cost_per_joint_set: f64,
    /// Physical joiner length, informational only; never added to the span.
    #[serde(default)]
    pub joiner_length: f64,
}

fn default_alpha_joint() -> f64 {
    220.0
}

fn default_beta_small() -> f64 {
    60.0
}

fn default_gamma_short() -> f64 {
    5.0
}

impl OptimizeParams {
    pub fn new(required: u32, lengths: Vec<u32>) -> Self {
        Self {
            required,
            lengths,
            small_lengths: Vec::new(),
            max_pieces: None,
            allow_undershoot_pct: 0.0,
            max_waste_pct: None,
            alpha_joint: default_alpha_joint(),
            beta_small: default_beta_small(),
            gamma_short: default_gamma_short(),
            cost_per_mm: 0.0,
            cost_per_joint_set: 0.0,
            joiner_length: 0.0,
        }
    }
}

/// A successful solve: the chosen pieces plus every derived metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPlan {
    /// Chosen stock lengths in reconstruction order.
    pub plan: Vec<u32>,
    /// Length -> count histogram of the plan.
    pub counts_by_length: BTreeMap<u32, u32>,
    pub total: u32,
    pub extra: u32,
    pub shortage: u32,
    pub pieces: u32,
    pub joints: u32,
    pub small_count: u32,
    /// Scalar objective: extra + alpha*joints + beta*small + gamma*shortage.
    pub cost: f64,
    pub material_cost: f64,
    pub joint_cost: f64,
    pub total_actual_cost: f64,
}

impl fmt::Display for CutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pieces: Vec<String> = self.plan.iter().map(u32::to_string).collect();
        write!(
            f,
            "[{}] total={}mm extra={}mm joints={}",
            pieces.join(" + "),
            self.total,
            self.extra,
            self.joints
        )
    }
}

/// Domain failures. Always returned as values; no solver panics on
/// bad configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    /// No usable stock lengths, or a non-positive required length.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The strategy's safety ceiling was exceeded before any search
    /// started. Recoverable: pick the suggested strategy or shrink the
    /// problem.
    #[error("problem too large for {strategy}: {what} {bound} exceeds limit {limit}; try {suggestion}")]
    ProblemTooLarge {
        strategy: Strategy,
        what: &'static str,
        bound: u64,
        limit: u64,
        suggestion: Strategy,
    },

    /// The search ran but no state satisfied the undershoot/waste
    /// constraints.
    #[error("{0}")]
    Infeasible(String),
}

/// Solver selection. All variants consume the same `OptimizeParams`
/// and produce the same `CutPlan` shape; `Exact` is the production
/// path, the rest exist for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    Exact,
    Bounded,
    Greedy,
    BranchAndBound,
    RecursiveMemo,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Exact,
        Strategy::Bounded,
        Strategy::Greedy,
        Strategy::BranchAndBound,
        Strategy::RecursiveMemo,
    ];

    pub fn solve(self, params: &OptimizeParams) -> Result<CutPlan, SolveError> {
        match self {
            Strategy::Exact => solver::optimize(params),
            Strategy::Bounded => solver::optimize_bounded(params),
            Strategy::Greedy => strategies::greedy(params),
            Strategy::BranchAndBound => strategies::branch_and_bound(params),
            Strategy::RecursiveMemo => strategies::recursive_memo(params),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Exact => "exact dp",
            Strategy::Bounded => "bounded dp",
            Strategy::Greedy => "greedy",
            Strategy::BranchAndBound => "branch and bound",
            Strategy::RecursiveMemo => "recursive memo",
        };
        write!(f, "{name}")
    }
}

/// Accepts JSON floats for integer millimetre fields (UI clients send
/// `2400.0`); rounds to the nearest mm.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    coerce_u32::<D>(value)
}

/// Vec form of [`deserialize_u32_from_number`] for length lists.
pub fn deserialize_u32_vec_from_numbers<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    values.into_iter().map(coerce_u32::<D>).collect()
}

fn coerce_u32<'de, D>(value: f64) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative millimetre value, got {value}"
        )));
    }
    Ok(value.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults_apply() {
        let params: OptimizeParams =
            serde_json::from_str(r#"{"required": 2000, "lengths": [500, 1000]}"#).unwrap();
        assert_eq!(params.required, 2000);
        assert_eq!(params.lengths, vec![500, 1000]);
        assert!(params.small_lengths.is_empty());
        assert_eq!(params.max_pieces, None);
        assert_eq!(params.alpha_joint, 220.0);
        assert_eq!(params.beta_small, 60.0);
        assert_eq!(params.gamma_short, 5.0);
        assert_eq!(params.cost_per_mm, 0.0);
    }

    #[test]
    fn test_params_accept_float_millimetres() {
        let params: OptimizeParams = serde_json::from_str(
            r#"{"required": 1500.4, "lengths": [500.0, 999.6], "small_lengths": [500.0]}"#,
        )
        .unwrap();
        assert_eq!(params.required, 1500);
        assert_eq!(params.lengths, vec![500, 1000]);
        assert_eq!(params.small_lengths, vec![500]);
    }

    #[test]
    fn test_params_reject_negative_millimetres() {
        let err = serde_json::from_str::<OptimizeParams>(r#"{"required": -5, "lengths": [500]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_strategy_round_trips_kebab_case() {
        let s: Strategy = serde_json::from_str(r#""branch-and-bound""#).unwrap();
        assert_eq!(s, Strategy::BranchAndBound);
        assert_eq!(
            serde_json::to_string(&Strategy::RecursiveMemo).unwrap(),
            r#""recursive-memo""#
        );
    }

    #[test]
    fn test_error_messages_name_the_bound() {
        let err = SolveError::ProblemTooLarge {
            strategy: Strategy::Bounded,
            what: "table bound",
            bound: 20_000_000,
            limit: 10_000_000,
            suggestion: Strategy::Greedy,
        };
        let text = err.to_string();
        assert!(text.contains("bounded dp"));
        assert!(text.contains("20000000"));
        assert!(text.contains("try greedy"));
    }
}

use std::time::{Duration, Instant};

use rail_optimizer::types::{CutPlan, OptimizeParams, SolveError, Strategy};

/// Wall-clock budget per solve. The core runs to completion once
/// started, so the budget is checked around the call, not inside it.
const TIME_BUDGET: Duration = Duration::from_secs(5);

struct Expected {
    pieces: Option<u32>,
    total: Option<u32>,
    extra: Option<u32>,
    max_pieces: Option<u32>,
    max_extra: Option<u32>,
}

impl Expected {
    const NONE: Expected = Expected {
        pieces: None,
        total: None,
        extra: None,
        max_pieces: None,
        max_extra: None,
    };
}

struct Case {
    name: &'static str,
    params: OptimizeParams,
    expected: Expected,
}

fn cases() -> Vec<Case> {
    let mut list = Vec::new();

    let mut p = OptimizeParams::new(2000, vec![500, 1000, 2000]);
    p.small_lengths = vec![500];
    p.max_pieces = Some(10);
    list.push(Case {
        name: "Small - exact match exists",
        params: p,
        expected: Expected {
            pieces: Some(1),
            total: Some(2000),
            extra: Some(0),
            ..Expected::NONE
        },
    });

    let mut p = OptimizeParams::new(1500, vec![500, 800, 1000]);
    p.small_lengths = vec![500];
    p.max_pieces = Some(10);
    list.push(Case {
        name: "Small - needs a combination",
        params: p,
        expected: Expected {
            pieces: Some(2),
            total: Some(1500),
            ..Expected::NONE
        },
    });

    let mut p = OptimizeParams::new(3500, vec![600, 800, 1000, 1200, 1500, 2000]);
    p.small_lengths = vec![600, 800];
    p.max_pieces = Some(8);
    list.push(Case {
        name: "Medium - multiple options",
        params: p,
        expected: Expected {
            max_pieces: Some(4),
            max_extra: Some(200),
            ..Expected::NONE
        },
    });

    let mut p = OptimizeParams::new(8000, vec![500, 800, 1000, 1200, 1500, 2000, 2500, 3000]);
    p.small_lengths = vec![500, 800];
    p.max_pieces = Some(10);
    list.push(Case {
        name: "Large - complex optimization",
        params: p,
        expected: Expected {
            max_pieces: Some(6),
            max_extra: Some(500),
            ..Expected::NONE
        },
    });

    let mut p = OptimizeParams::new(
        15_000,
        vec![600, 800, 1000, 1200, 1500, 2000, 2500, 3000, 4000, 5000],
    );
    p.small_lengths = vec![600, 800, 1000];
    p.max_pieces = Some(12);
    list.push(Case {
        name: "Very large - stress test",
        params: p,
        expected: Expected {
            max_pieces: Some(8),
            max_extra: Some(1000),
            ..Expected::NONE
        },
    });

    // With no waste ceiling a single overshooting piece is feasible;
    // window-limited strategies are expected to miss it.
    let mut p = OptimizeParams::new(100, vec![500, 1000]);
    p.max_pieces = Some(1);
    list.push(Case {
        name: "Edge - overshoot without waste ceiling",
        params: p,
        expected: Expected {
            pieces: Some(1),
            total: Some(500),
            extra: Some(400),
            ..Expected::NONE
        },
    });

    let mut p = OptimizeParams::new(750, vec![500, 1000, 1500]);
    p.max_pieces = Some(1);
    list.push(Case {
        name: "Edge - single piece only",
        params: p,
        expected: Expected {
            pieces: Some(1),
            total: Some(1000),
            ..Expected::NONE
        },
    });

    list
}

fn check(expected: &Expected, outcome: &Result<CutPlan, SolveError>) -> Result<(), String> {
    let plan = match outcome {
        Ok(plan) => plan,
        Err(e) => return Err(format!("failed: {e}")),
    };

    // Structural invariants hold for every strategy.
    let sum: u32 = plan.plan.iter().sum();
    if sum != plan.total {
        return Err(format!("sum mismatch: plan={sum}, total={}", plan.total));
    }
    if plan.pieces as usize != plan.plan.len() {
        return Err(format!(
            "piece count mismatch: pieces={}, plan.len={}",
            plan.pieces,
            plan.plan.len()
        ));
    }

    if let Some(want) = expected.pieces
        && plan.pieces != want
    {
        return Err(format!("expected {want} pieces, got {}", plan.pieces));
    }
    if let Some(want) = expected.total
        && plan.total != want
    {
        return Err(format!("expected total {want}, got {}", plan.total));
    }
    if let Some(want) = expected.extra
        && plan.extra != want
    {
        return Err(format!("expected extra {want}, got {}", plan.extra));
    }
    if let Some(cap) = expected.max_pieces
        && plan.pieces > cap
    {
        return Err(format!("too many pieces: {} > {cap}", plan.pieces));
    }
    if let Some(cap) = expected.max_extra
        && plan.extra > cap
    {
        return Err(format!("too much waste: {} > {cap}", plan.extra));
    }
    Ok(())
}

fn main() {
    let cases = cases();
    let mut passed = vec![0usize; Strategy::ALL.len()];
    let mut elapsed = vec![Duration::ZERO; Strategy::ALL.len()];

    println!("rail cut optimizer - strategy benchmark");
    println!("{}", "=".repeat(72));

    for case in &cases {
        println!();
        println!("{}", case.name);
        println!(
            "  required {} mm, {} lengths, cap {:?}",
            case.params.required,
            case.params.lengths.len(),
            case.params.max_pieces
        );

        for (i, strategy) in Strategy::ALL.into_iter().enumerate() {
            let start = Instant::now();
            let outcome = strategy.solve(&case.params);
            let took = start.elapsed();
            elapsed[i] += took;

            let verdict = if took > TIME_BUDGET {
                Err(format!("exceeded {TIME_BUDGET:?} budget"))
            } else {
                check(&case.expected, &outcome)
            };

            match &verdict {
                Ok(()) => {
                    passed[i] += 1;
                    let plan = outcome.as_ref().expect("checked ok");
                    println!(
                        "  PASS {:<18} {:>9.3}ms  {}",
                        strategy.to_string(),
                        took.as_secs_f64() * 1000.0,
                        plan
                    );
                }
                Err(reason) => {
                    println!(
                        "  FAIL {:<18} {:>9.3}ms  {}",
                        strategy.to_string(),
                        took.as_secs_f64() * 1000.0,
                        reason
                    );
                }
            }
        }
    }

    println!();
    println!("{}", "=".repeat(72));
    println!("summary");
    for (i, strategy) in Strategy::ALL.into_iter().enumerate() {
        println!(
            "  {:<18} {}/{} passed, {:.3}ms total",
            strategy.to_string(),
            passed[i],
            cases.len(),
            elapsed[i].as_secs_f64() * 1000.0
        );
    }
}

use std::path::PathBuf;

use clap::Parser;
use rail_optimizer::render;
use rail_optimizer::scenarios::{self, ScenarioSet};
use rail_optimizer::settings::{self, Priority, Settings};
use rail_optimizer::types::{CutPlan, Strategy};

#[derive(Parser)]
#[command(
    name = "rail_optimizer",
    about = "Rail cut-stock optimizer (unbounded knapsack with joint and small-piece penalties)"
)]
struct Cli {
    /// Target rail length in mm
    #[arg(long, conflicts_with = "modules")]
    required: Option<u32>,

    /// Derive the target length from a module count and the settings geometry
    #[arg(long)]
    modules: Option<u32>,

    /// Stock cut lengths in mm, comma or space separated
    #[arg(long)]
    lengths: Option<String>,

    /// Subset of lengths to discourage (comma or space separated)
    #[arg(long)]
    small: Option<String>,

    /// Hard cap on piece count (0 removes the cap)
    #[arg(long)]
    max_pieces: Option<u32>,

    /// Permitted undershoot fraction, e.g. 0.01 for 1%
    #[arg(long)]
    undershoot: Option<f64>,

    /// Hard waste ceiling fraction, e.g. 0.05 for 5%
    #[arg(long)]
    max_waste: Option<f64>,

    /// Penalty per joint
    #[arg(long)]
    alpha: Option<f64>,

    /// Penalty per small piece
    #[arg(long)]
    beta: Option<f64>,

    /// Penalty per mm of shortage
    #[arg(long)]
    gamma: Option<f64>,

    /// Material cost per mm
    #[arg(long)]
    cost_per_mm: Option<f64>,

    /// Cost per joint hardware set
    #[arg(long)]
    cost_per_joint: Option<f64>,

    /// Solver strategy: exact, bounded, greedy, branch-and-bound, or memo
    #[arg(long, default_value = "exact", value_parser = parse_strategy)]
    strategy: Strategy,

    /// Preferred scenario pick: cost, length, or joints
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,

    /// Sweep piece caps and joint weights, print the trade-off picks
    #[arg(long)]
    scenarios: bool,

    /// Show an ASCII layout of the chosen plan
    #[arg(long)]
    layout: bool,

    /// Settings file (JSON); missing fields fall back to defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long, requires = "settings")]
    save_settings: bool,
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    match s {
        "exact" => Ok(Strategy::Exact),
        "bounded" => Ok(Strategy::Bounded),
        "greedy" => Ok(Strategy::Greedy),
        "branch-and-bound" => Ok(Strategy::BranchAndBound),
        "memo" => Ok(Strategy::RecursiveMemo),
        _ => Err(format!(
            "invalid strategy '{}', expected: exact, bounded, greedy, branch-and-bound, or memo",
            s
        )),
    }
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    match s {
        "cost" => Ok(Priority::Cost),
        "length" => Ok(Priority::Length),
        "joints" => Ok(Priority::Joints),
        _ => Err(format!(
            "invalid priority '{}', expected: cost, length, or joints",
            s
        )),
    }
}

fn main() {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) if path.exists() => Settings::load(path).unwrap_or_else(|e| {
            eprintln!("Error: failed to load settings: {e}");
            std::process::exit(1);
        }),
        _ => Settings::default(),
    };

    apply_overrides(&cli, &mut settings);

    if cli.save_settings
        && let Some(path) = &cli.settings
    {
        if let Err(e) = settings.save(path) {
            eprintln!("Error: failed to save settings: {e}");
            std::process::exit(1);
        }
    }

    let required = match (cli.required, cli.modules) {
        (Some(r), _) => r,
        (None, Some(m)) => settings.required_span(m),
        (None, None) => {
            eprintln!("Error: either --required or --modules must be given");
            std::process::exit(1);
        }
    };

    let params = settings.params(required);

    if cli.scenarios {
        match scenarios::generate_scenarios(&params) {
            Some(set) => print_scenarios(
                &set,
                cli.priority.unwrap_or(settings.priority),
                cli.layout,
                &settings,
                required,
            ),
            None => {
                eprintln!("Error: no scenario produced a feasible plan");
                std::process::exit(1);
            }
        }
    } else {
        match cli.strategy.solve(&params) {
            Ok(plan) => print_plan(&plan, required, cli.layout, settings.joiner_length),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(s) = &cli.lengths {
        settings.lengths = settings::parse_num_list(s);
    }
    if let Some(s) = &cli.small {
        settings.small_lengths = settings::parse_num_list(s);
    }
    if let Some(v) = cli.max_pieces {
        settings.max_pieces = (v > 0).then_some(v);
    }
    if let Some(v) = cli.undershoot {
        settings.allow_undershoot_pct = v;
    }
    if let Some(v) = cli.max_waste {
        settings.max_waste_pct = Some(v);
    }
    if let Some(v) = cli.alpha {
        settings.alpha_joint = v;
    }
    if let Some(v) = cli.beta {
        settings.beta_small = v;
    }
    if let Some(v) = cli.gamma {
        settings.gamma_short = v;
    }
    if let Some(v) = cli.cost_per_mm {
        settings.cost_per_mm = v;
    }
    if let Some(v) = cli.cost_per_joint {
        settings.cost_per_joint_set = v;
    }
}

fn print_plan(plan: &CutPlan, required: u32, layout: bool, joiner_length: f64) {
    let pieces: Vec<String> = plan.plan.iter().map(u32::to_string).collect();
    println!("Plan: {}", pieces.join(" + "));
    for (len, count) in &plan.counts_by_length {
        println!("  {count} x {len} mm");
    }
    if layout {
        print!("{}", render::render_plan(required, &plan.plan));
    }
    println!(
        "Total: {} mm ({} mm over, {} mm short), {} piece{}, {} joint{}",
        plan.total,
        plan.extra,
        plan.shortage,
        plan.pieces,
        if plan.pieces == 1 { "" } else { "s" },
        plan.joints,
        if plan.joints == 1 { "" } else { "s" },
    );
    if plan.joints > 0 && joiner_length > 0.0 {
        println!(
            "Hardware: {} joiner set{} of {} mm",
            plan.joints,
            if plan.joints == 1 { "" } else { "s" },
            joiner_length
        );
    }
    if plan.total_actual_cost > 0.0 {
        println!(
            "Cost: material {:.2} + joints {:.2} = {:.2}",
            plan.material_cost, plan.joint_cost, plan.total_actual_cost
        );
    }
    println!("Score: {:.2}", plan.cost);
}

fn print_scenarios(
    set: &ScenarioSet,
    priority: Priority,
    layout: bool,
    settings: &Settings,
    required: u32,
) {
    for s in &set.all {
        println!(
            "{:<28} {}  cost {:.2}",
            s.label, s.result, s.result.total_actual_cost
        );
    }
    println!();
    println!("Cheapest:          {}", set.cost_best().result);
    println!("Shortest overhang: {}", set.length_best().result);
    println!("Fewest joints:     {}", set.joints_best().result);
    println!();

    let pick = match priority {
        Priority::Cost => set.cost_best(),
        Priority::Length => set.length_best(),
        Priority::Joints => set.joints_best(),
    };
    println!("Selected ({}):", pick.label);
    print_plan(&pick.result, required, layout, settings.joiner_length);
}

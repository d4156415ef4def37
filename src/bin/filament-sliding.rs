//! CLI entry point for the filament-sliding simulator (spec §6).
//!
//! Flag set: a closed group of overrides (`-N`, `-LM`, `-NP`, `-K`,
//! `-GV`), each usable at most once, plus the additive `--params`
//! (parameter file path) and `--runs` (independent replicate count,
//! dispatched in parallel via `rayon`) flags.

use clap::Parser;
use filament_sliding::filament::{Filament, FilamentKind};
use filament_sliding::linker::LinkerType;
use filament_sliding::output::RunLog;
use filament_sliding::params::{ParameterOverrides, Parameters};
use filament_sliding::propagator::Propagator;
use filament_sliding::random::RandomGenerator;
use filament_sliding::reaction::{
    BindFree, BindPartial, HopFull, HopPartial, KineticParams, Reaction, UnbindFull,
    UnbindPartial,
};
use filament_sliding::system_state::{ExternalForceType, SystemState};
use rayon::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "filament-sliding", version, about = "Stochastic cross-linker-mediated filament sliding simulator")]
struct Cli {
    /// Parameter file path (created interactively from defaults if absent).
    #[arg(long, default_value = "filament_sliding.params")]
    params: PathBuf,

    /// Number of independent replicate runs, each seeded from
    /// `<run-name>-<index>` and dispatched in parallel.
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Base run name; also seeds the PRNG (spec §5, L4).
    #[arg(long, default_value = "run")]
    name: String,

    /// Override N_SITES_FIXED.
    #[arg(short = 'N', long)]
    n_sites_fixed: Option<usize>,

    /// Override LATTICE_SPACING.
    #[arg(short = 'L', long = "LM")]
    lattice_spacing: Option<f64>,

    /// Override N_PASSIVE.
    #[arg(short = 'P', long = "NP")]
    n_passive: Option<usize>,

    /// Override SPRING_CONSTANT.
    #[arg(short = 'K', long)]
    spring_constant: Option<f64>,

    /// Override GRAPHICS_INTERVAL.
    #[arg(short = 'G', long = "GV")]
    graphics_interval: Option<u64>,
}

fn uniform_kinetic_params(spring_constant: f64) -> KineticParams {
    KineticParams {
        k_bind_tip: 0.2,
        k_bind_blocked: 0.05,
        k_bind_partial: 0.3,
        k_off_partial: 0.1,
        k_off_full: 0.1,
        spring_constant,
        delta_e_head: 0.0,
        hop_base_head: 0.5,
        hop_base_tail: 0.5,
        delta_e_direction: 0.0,
        delta_e_cooperativity: 0.0,
    }
}

fn all_reactions(spring_constant: f64) -> Vec<Box<dyn Reaction>> {
    let mut reactions: Vec<Box<dyn Reaction>> = Vec::new();
    for &kind in &LinkerType::ALL {
        let p = uniform_kinetic_params(spring_constant);
        reactions.push(Box::new(BindFree::new(kind, p)));
        reactions.push(Box::new(BindPartial::new(kind, p)));
        reactions.push(Box::new(UnbindPartial::new(kind, p)));
        reactions.push(Box::new(UnbindFull::new(kind, p)));
        reactions.push(Box::new(HopPartial::new(kind, p)));
        reactions.push(Box::new(HopFull::new(kind, p)));
    }
    reactions
}

fn run_one(params: &Parameters, run_index: u32, base_name: &str) -> anyhow::Result<()> {
    let seed = format!("{base_name}-{run_index}");
    let mut rng = RandomGenerator::from_seed_str(&seed);

    let fixed = Filament::new(
        FilamentKind::Fixed,
        params.n_sites_fixed,
        params.lattice_spacing,
    );
    let mobile = Filament::new(
        FilamentKind::Mobile,
        params.n_sites_fixed,
        params.lattice_spacing,
    );
    let mut state = SystemState::new(
        fixed,
        mobile,
        params.n_passive,
        params.n_dual,
        params.n_active,
        params.rho,
        params.spring_constant,
        ExternalForceType::BarrierFree,
    )?;

    let mut propagator = Propagator::new(
        all_reactions(params.spring_constant),
        params.diffusion_coefficient,
        params.time_step,
    )?;

    let log_path = format!("{seed}.log.txt");
    let mut log = RunLog::new(std::fs::File::create(&log_path)?);
    log.record(0.0, &format!("equilibrating for {} steps", params.n_equilibrate_steps))?;
    propagator.equilibrate(&mut state, &mut rng, params.n_equilibrate_steps)?;

    log.record(propagator.time(), &format!("running for {} steps", params.n_run_steps))?;
    propagator.run(&mut state, &mut rng, params.n_run_steps, |_state, _outcome| Ok(()))?;
    log.record(propagator.time(), "run complete")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.params.exists() {
        filament_sliding::params::create_default_if_missing(
            &cli.params,
            std::io::stdin().lock(),
            std::io::stdout(),
        )?;
    }
    let mut params = if cli.params.exists() {
        Parameters::read_from(&cli.params)?
    } else {
        Parameters::defaults()
    };

    let overrides = ParameterOverrides {
        n_sites_fixed: cli.n_sites_fixed,
        lattice_spacing: cli.lattice_spacing,
        n_passive: cli.n_passive,
        n_dual: None,
        n_active: None,
        spring_constant: cli.spring_constant,
        graphics_interval: cli.graphics_interval,
    };
    params.apply_overrides(&overrides);

    log::info!("starting {} replicate run(s)", cli.runs);
    (0..cli.runs)
        .into_par_iter()
        .try_for_each(|i| run_one(&params, i, &cli.name))?;

    Ok(())
}

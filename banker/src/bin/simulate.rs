use banker::*;
use tracing_subscriber::EnvFilter;

/// A time-stepped deadlock-avoidance simulator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of processes
    #[arg(short, long, default_value_t = 5)]
    processes:      usize,

    /// Number of resource types
    #[arg(short, long, default_value_t = 3)]
    resources:      usize,

    /// Largest maximum claim per process and resource type
    #[arg(short = 'c', long, default_value_t = 7)]
    max_claim:      u32,

    /// Largest initial availability per resource type
    #[arg(short = 'a', long, default_value_t = 5)]
    max_available:  u32,

    /// Simulation speed
    #[arg(value_enum, long, default_value_t = Speed::Medium)]
    speed:          Speed,

    /// Seed for the random state and the random requests
    #[arg(long)]
    seed:           Option<u64>,

    /// Maximum number of steps (the run also stops once every
    /// process has completed)
    #[arg(short, long, default_value_t = 20)]
    steps:          u64,

    /// Do not wait between steps
    #[arg(long, default_value_t = false)]
    no_wait:        bool,

    /// Instead of simulating, check this many random states
    /// and report how many were safe
    #[arg(long)]
    survey:         Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Args::parse();
    let config = SimConfig {
        processes:      cli.processes,
        resources:      cli.resources,
        max_claim:      cli.max_claim,
        max_available:  cli.max_available,
        speed:          cli.speed,
        seed:           cli.seed.unwrap_or_else(rand::random),
    };
    info!(?config, "configuration");

    if let Some(samples) = cli.survey {
        let total = Instant::now();
        let report = survey(&config, samples)?;
        println!(
            "Safe states:\t{} / {} ({:.2}%)\nSurvey time:\t{} μs",
            report.safe,
            report.samples,
            report.safe_ratio() * 100.0,
            total.elapsed().as_micros()
        );
        return Ok(());
    }

    let mut sim = Simulation::randomized(config)?;
    let initial = check_safety(sim.state());
    println!("[step 0] initial state is {}: {}", if initial.is_safe { "SAFE" } else { "UNSAFE" }, initial);
    while sim.steps_taken() < cli.steps && !sim.is_done() {
        if !cli.no_wait {
            std::thread::sleep(sim.speed().cadence());
        }
        println!("{}", sim.step()?);
    }
    if sim.is_done() {
        println!("All processes completed after {} steps.", sim.steps_taken());
    }

    Ok(())
}

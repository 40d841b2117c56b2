use banker::*;
use tracing_subscriber::EnvFilter;

/// Banker's Algorithm safety checker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Free units per resource type, e.g. "3,3,2"
    #[arg(long, allow_hyphen_values = true)]
    available:  UnitVec,

    /// Maximum claims, one row per process, rows separated by ';',
    /// e.g. "7,5,3;3,2,2"
    #[arg(short, long, allow_hyphen_values = true)]
    maximum:    UnitMatrix,

    /// Current allocation, same layout as --maximum
    #[arg(short = 'l', long, allow_hyphen_values = true)]
    allocation: UnitMatrix,

    /// Installed capacity per resource type; checked against
    /// allocated + available units when given
    #[arg(short, long, allow_hyphen_values = true)]
    total:      Option<UnitVec>,

    /// A request to evaluate after the safety check, e.g. "1:1,0,2"
    #[arg(short, long, allow_hyphen_values = true)]
    request:    Option<ProcessRequest>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Args::parse();

    let mut state = ResourceState::from_matrices(cli.maximum.0, cli.allocation.0, cli.available.0)?;
    if let Some(total) = cli.total {
        state.check_capacity(&total.0)?;
    }
    print_matrix("Need", &state.need());

    let analysis = analyze(&state)?;
    if analysis.safety.is_safe {
        println!("System is SAFE\nSafe sequence:\t{}", analysis.safety);
    } else {
        println!(
            "System is UNSAFE\nCould finish:\t{}\nStalled:\t{}",
            analysis.safety,
            render_order(&analysis.safety.stalled())
        );
    }
    println!(
        "Utilization:\t{}",
        analysis.utilization.iter()
            .enumerate()
            .map(|(j, u)| format!("R{}={:.2}%", j, u * 100.0))
            .join(" ")
    );
    println!("Priority:\t{}", render_order(&analysis.ranking));
    for rec in &analysis.recommendations {
        println!("  - {}", rec);
    }

    if let Some(req) = cli.request {
        let outcome = request_allocation(&mut state, req.process, &req.units);
        println!("Request P{} [{}]: {}", req.process, req.units.iter().join(", "), outcome);
        if outcome.is_granted() {
            println!("Available:\t[{}]", state.available().iter().join(", "));
            print_matrix("Need", &state.need());
        }
    }

    Ok(())
}

fn print_matrix(title: &str, m: &Matrix) {
    println!("{}:", title);
    for (i, row) in m.iter().enumerate() {
        println!("  P{}\t{}", i, row.iter().join("\t"));
    }
}

//! DVPR Scheduler - Command Line Interface
//!
//! Schedules delivery routes for JSON requests and benchmarks the scheduler
//! over request collections.

use clap::{Parser, Subcommand};
use dvpr_scheduler::benchmark::{reply_cost, Benchmark, BenchmarkConfig};
use dvpr_scheduler::request::ScheduleRequest;
use dvpr_scheduler::scheduler::{RouteScheduler, DEFAULT_AROUND_SCOPE, DEFAULT_MAX_ITERATION};

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "dvpr-scheduler")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "A delivery-vehicle-routing scheduler over supplier catalogues")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a single request
    Solve {
        /// Path to the request JSON file
        #[arg(short, long)]
        request: PathBuf,

        /// Scope radius for the around relations
        #[arg(long, default_value_t = DEFAULT_AROUND_SCOPE)]
        scope: f64,

        /// Local search iteration budget
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATION)]
        max_iteration: usize,

        /// Random seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Write the reply to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the reply JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Analyze a request file
    Analyze {
        /// Path to the request JSON file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Benchmark all requests in a directory
    Benchmark {
        /// Directory containing request JSON files
        #[arg(short, long)]
        dir: PathBuf,

        /// Number of seeds per request
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// First seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Run seeds sequentially instead of on the rayon pool
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            request,
            scope,
            max_iteration,
            seed,
            output,
            pretty,
        } => {
            let request = ScheduleRequest::from_file(&request).expect("Failed to read request");
            let scheduler = RouteScheduler::with_params(scope, max_iteration, seed);

            let start = Instant::now();
            let reply = scheduler.schedule(&request).expect("Scheduling failed");
            let elapsed = start.elapsed().as_secs_f64();

            match reply_cost(&request, &reply).expect("Failed to evaluate reply") {
                Some(cost) => log::info!(
                    "rider {:?}, {} stops, cost {:.2}, {:.4}s",
                    reply.deliverer_id,
                    reply.route.len(),
                    cost,
                    elapsed
                ),
                None => log::info!("demand cannot be fulfilled ({:.4}s)", elapsed),
            }

            let json = if pretty {
                serde_json::to_string_pretty(&reply).expect("Failed to serialize reply")
            } else {
                serde_json::to_string(&reply).expect("Failed to serialize reply")
            };
            match output {
                Some(path) => std::fs::write(path, json).expect("Failed to write reply"),
                None => println!("{}", json),
            }
        }

        Commands::Analyze { request } => {
            let request = ScheduleRequest::from_file(&request).expect("Failed to read request");
            println!("{}", request.statistics());
        }

        Commands::Benchmark {
            dir,
            runs,
            seed,
            output,
            sequential,
        } => {
            let config = BenchmarkConfig {
                num_runs: runs,
                base_seed: seed,
                parallel: !sequential,
                ..Default::default()
            };
            let mut benchmark = Benchmark::new(config);
            benchmark.run_directory(&dir);

            std::fs::create_dir_all(&output).expect("Failed to create output directory");
            let results_path = output.join("results.csv");
            benchmark
                .export_to_csv(&results_path)
                .expect("Failed to export results");
            let stats_path = output.join("statistics.csv");
            benchmark
                .export_statistics_csv(&stats_path)
                .expect("Failed to export statistics");

            println!("{}", benchmark.generate_report());
            println!("Results written to {}", output.display());
        }
    }
}

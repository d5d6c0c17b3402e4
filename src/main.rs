//! `reldb`: benchmarks the join algorithms and index kinds on synthetic
//! relations, or runs one query against them.

use std::fs::read_to_string;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use reldb::bench::{IndexBenchmark, JoinBenchmark, generate_relation};
use reldb::{
    Algorithm, Catalog, ColumnRef, ConfigError, Error, IndexKind, Interpreter, PlanConfig,
    QueryError,
};

/// Errors reported by the binary
#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Execution(#[from] Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Index kinds selectable on the command line
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum IndexArg {
    /// Hash buckets, equality only
    Hash,
    /// Bulk-loaded B+-tree, equality and ranges
    Ordered,
}

impl From<IndexArg> for IndexKind {
    fn from(val: IndexArg) -> Self {
        match val {
            IndexArg::Hash => IndexKind::Hash,
            IndexArg::Ordered => IndexKind::Ordered,
        }
    }
}

/// Cli Arguments related to logging
#[derive(clap::Args, Debug)]
struct LoggingArgs {
    /// Increase log verbosity (multiple uses increase verbosity further)
    #[arg(short, long, action = clap::ArgAction::Count, group = "verbosity")]
    verbose: u8,
    /// Reduce log verbosity to show only errors (equivalent to --log error)
    #[arg(short, long, group = "verbosity")]
    quiet: bool,
    /// Set log verbosity (default is "warn")
    #[arg(long = "log", value_parser = clap::builder::PossibleValuesParser::new(["error", "warn", "info", "debug", "trace"]), group = "verbosity")]
    log_level: Option<String>,
}

impl LoggingArgs {
    /// Sets the log level from, in order of priority: `--log`, `-q`, the
    /// number of `-v`, the `RELDB_LOG` environment variable, `warn`.
    fn initialize_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Warn);
        builder.parse_env("RELDB_LOG");
        if let Some(ref level) = self.log_level {
            builder.parse_filters(level);
        } else if self.quiet {
            builder.filter_level(log::LevelFilter::Error);
        } else if self.verbose > 0 {
            builder.filter_level(match self.verbose {
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            });
        }
        builder.init();
    }
}

/// Parameters of the synthetic relations
#[derive(clap::Args, Debug)]
struct DataArgs {
    /// Values are drawn from [0, MAX_VALUE)
    #[arg(long, default_value_t = 100)]
    max_value: i64,
    /// Seed of the random generator
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time every join algorithm on r(a, b) JOIN s(b, c) ON r.b = s.b
    Join {
        /// Algorithms to compare, first one is the reference result
        #[arg(short, long, value_delimiter = ',', default_values_t = Algorithm::ALL)]
        algorithms: Vec<Algorithm>,
        /// Rows of each input relation
        #[arg(short, long, value_delimiter = ',', default_values_t = [100, 1_000])]
        sizes: Vec<usize>,
        #[arg(short, long, default_value_t = 3)]
        repetitions: usize,
        /// Outer rows buffered per pass of the block nested-loop join
        #[arg(long, default_value_t = reldb::join::DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        #[command(flatten)]
        data: DataArgs,
        /// Print the measurements as JSON
        #[arg(long)]
        json: bool,
    },
    /// Time index builds, point lookups and range scans over t(k, v)
    Index {
        #[arg(short, long, value_delimiter = ',', value_enum, default_values_t = [IndexArg::Hash, IndexArg::Ordered])]
        kinds: Vec<IndexArg>,
        #[arg(short, long, value_delimiter = ',', default_values_t = [1_000, 10_000])]
        sizes: Vec<usize>,
        /// Point lookups per index
        #[arg(short, long, default_value_t = 1_000)]
        lookups: usize,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        json: bool,
    },
    /// Run one SELECT against the generated relations r(a, b) and s(b, c)
    Query {
        sql: String,
        /// Rows of each relation
        #[arg(short, long, default_value_t = 1_000)]
        size: usize,
        /// Planner configuration as a JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Force one join algorithm
        #[arg(short, long)]
        algorithm: Option<Algorithm>,
        /// Build this kind of index on r.b and s.b first
        #[arg(short, long, value_enum)]
        index: Option<IndexArg>,
        /// Answer single-table comparisons through indexes
        #[arg(long)]
        index_selection: bool,
        #[command(flatten)]
        data: DataArgs,
    },
}

/// Join algorithm and index benchmarks for reldb
#[derive(clap::Parser, Debug)]
#[command(author, version, about)]
struct CliApp {
    #[command(flatten)]
    logging: LoggingArgs,
    #[command(subcommand)]
    command: Command,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Join {
            algorithms,
            sizes,
            repetitions,
            block_size,
            data,
            json,
        } => {
            let benchmark = JoinBenchmark {
                algorithms,
                sizes,
                repetitions,
                max_value: data.max_value,
                seed: data.seed,
                block_size: block_size.max(1),
            };
            let report = benchmark.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!(
                "{:<18} {:>8} {:>10} {:>10} {:>10}",
                "algorithm", "size", "rows", "mean ms", "min ms"
            );
            for m in &report.measurements {
                println!(
                    "{:<18} {:>8} {:>10} {:>10.3} {:>10.3}",
                    m.algorithm.to_string(),
                    m.size,
                    m.output_rows,
                    millis(m.mean()),
                    millis(m.min())
                );
            }
            for d in &report.disagreements {
                println!(
                    "MISMATCH: {} differs from {} at size {}",
                    d.algorithm, d.reference, d.size
                );
            }
        }
        Command::Index {
            kinds,
            sizes,
            lookups,
            data,
            json,
        } => {
            let benchmark = IndexBenchmark {
                kinds: kinds.into_iter().map(IndexKind::from).collect(),
                sizes,
                lookups,
                max_value: data.max_value,
                seed: data.seed,
            };
            let measurements = benchmark.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&measurements)?);
                return Ok(());
            }
            println!(
                "{:<8} {:>8} {:>10} {:>12} {:>10} {:>12}",
                "index", "size", "build ms", "lookups ms", "range ms", "bytes"
            );
            for m in &measurements {
                let range = m
                    .range
                    .map_or_else(|| "-".to_string(), |r| format!("{:.3}", millis(r)));
                println!(
                    "{:<8} {:>8} {:>10.3} {:>12.3} {:>10} {:>12}",
                    m.kind.to_string(),
                    m.size,
                    millis(m.build),
                    millis(m.lookups),
                    range,
                    m.memory_bytes
                );
            }
        }
        Command::Query {
            sql,
            size,
            config,
            algorithm,
            index,
            index_selection,
            data,
        } => {
            let mut plan = match config {
                Some(path) => {
                    let text = read_to_string(&path).map_err(|source| CliError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    PlanConfig::from_json(&text)?
                }
                None => PlanConfig::default(),
            };
            if let Some(algorithm) = algorithm {
                plan = plan.with_algorithm(algorithm);
            }
            plan.index_selection |= index_selection;

            let mut catalog = Catalog::new();
            let r = generate_relation("r", &["a", "b"], size, data.max_value, data.seed)
                .map_err(Error::from)?;
            let s = generate_relation("s", &["b", "c"], size, data.max_value, data.seed.wrapping_add(1))
                .map_err(Error::from)?;
            catalog.register(r);
            catalog.register(s);
            if let Some(kind) = index {
                for table in ["r", "s"] {
                    catalog
                        .create_index(table, &[ColumnRef::new("b")], kind.into())
                        .map_err(Error::from)?;
                }
            }

            let start = Instant::now();
            let result = Interpreter::new(&catalog, plan).query(&sql)?;
            let elapsed = start.elapsed();
            println!("{result}");
            println!("{} rows in {:.3} ms", result.row_count(), millis(elapsed));
        }
    }
    Ok(())
}

fn main() {
    let app = CliApp::parse();
    app.logging.initialize_logging();
    if let Err(err) = run(app.command) {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

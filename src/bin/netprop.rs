use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use netprop::{
    build_prior, build_start, leave_one_out_all, rank, read_prior_weights, read_seed_list,
    roc_curve, Graph, Method, Propagate, RankedList, RunConfig,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netprop", version, about = "Rank graph nodes by propagation from a seed set")]
struct Cli {
    /// TOML run configuration (load options, convergence, diffusion series)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// -v for debug, -vv for trace; RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Random walk with restart
    Rwr {
        graph: PathBuf,
        seeds: PathBuf,
        /// Restart probability in [0, 1]
        restart: f64,
        output: PathBuf,
    },
    /// Personalized PageRank
    Ppr {
        graph: PathBuf,
        seeds: PathBuf,
        /// Restart probability in [0, 1]
        beta: f64,
        output: PathBuf,
        /// `identifier weight` restart bias; defaults to the seed vector
        #[arg(long)]
        prior: Option<PathBuf>,
    },
    /// Heat diffusion kernel
    Dk {
        graph: PathBuf,
        seeds: PathBuf,
        /// Diffusion time in [0, 2]
        beta: f64,
        output: PathBuf,
    },
    /// Area under the ROC curve of ranked outputs
    Auroc {
        #[arg(required = true)]
        ranked: Vec<PathBuf>,
        /// Ground-truth identifiers, one per line
        #[arg(long)]
        truth: PathBuf,
        /// Identifiers to drop from the ranking (e.g. the seeds used)
        #[arg(long)]
        exclude: Option<PathBuf>,
    },
    /// Leave-one-out recovery of each seed (`all` runs rwr, ppr and dk)
    Loo {
        method: MethodArg,
        graph: PathBuf,
        seeds: PathBuf,
        parameter: f64,
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Rwr,
    Ppr,
    Dk,
    All,
}

impl MethodArg {
    fn label(self) -> &'static str {
        match self {
            MethodArg::Rwr => "rwr",
            MethodArg::Ppr => "ppr",
            MethodArg::Dk => "dk",
            MethodArg::All => "all",
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_graph(path: &Path, config: &RunConfig) -> Result<Graph> {
    let graph = Graph::load(path, &config.load)
        .with_context(|| format!("loading graph {}", path.display()))?;
    graph.warn_if_disconnected();
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph ready"
    );
    Ok(graph)
}

fn run_method(
    config: &RunConfig,
    method: Method,
    graph: &Path,
    seeds: &Path,
    prior: Option<&Path>,
    output: &Path,
) -> Result<()> {
    method.validate()?;
    let graph = load_graph(graph, config)?;
    let ids = read_seed_list(seeds)?;
    let start = build_start(&graph, &ids)?;
    let prior = prior
        .map(|p| -> Result<_> {
            let weighted = read_prior_weights(p)?;
            Ok(build_prior(&graph, &weighted, &start)?)
        })
        .transpose()?;

    let t0 = Instant::now();
    let run = method.propagate(&graph, &start, prior.as_ref())?;
    info!(
        method = method.name(),
        iterations = run.iterations,
        converged = run.converged,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "propagation finished"
    );

    let ranked = rank(&run.scores, &graph)?;
    ranked.save(output)?;
    info!(path = %output.display(), rows = ranked.len(), "ranking written");
    Ok(())
}

fn read_id_set(path: &Path) -> Result<HashSet<String>> {
    Ok(read_seed_list(path)?.into_iter().collect())
}

fn auroc(ranked: &[PathBuf], truth: &Path, exclude: Option<&Path>) -> Result<()> {
    let positives = read_id_set(truth)?;
    let excluded = match exclude {
        Some(p) => read_id_set(p)?,
        None => HashSet::new(),
    };
    for path in ranked {
        let list = RankedList::load(path)?;
        let roc = roc_curve(&list, &positives, &excluded)
            .with_context(|| format!("evaluating {}", path.display()))?;
        println!("{}\t{:.6}", path.display(), roc.auc());
    }
    Ok(())
}

fn loo(
    config: &RunConfig,
    method: MethodArg,
    graph: &Path,
    seeds: &Path,
    parameter: f64,
    output: &Path,
) -> Result<()> {
    let methods = match method {
        MethodArg::All => config.all_methods(parameter).to_vec(),
        one => vec![config.method(one.label(), parameter)?],
    };
    for m in &methods {
        m.validate()?;
    }
    let graph = load_graph(graph, config)?;
    let ids = read_seed_list(seeds)?;
    let reports = leave_one_out_all(&graph, &ids, &methods)?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(file);
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        report.write_text(&mut out)?;
        info!(
            method = report.method.as_str(),
            folds = report.outcomes.len(),
            mean_rank = report.mean_rank(),
            top10 = report.recovered_within(10),
            "leave-one-out finished"
        );
    }
    Ok(())
}

fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(p) => RunConfig::load(p)?,
        None => RunConfig::default(),
    };
    match cli.command {
        Command::Rwr {
            graph,
            seeds,
            restart,
            output,
        } => run_method(
            &config,
            config.random_walk(restart).into(),
            &graph,
            &seeds,
            None,
            &output,
        ),
        Command::Ppr {
            graph,
            seeds,
            beta,
            output,
            prior,
        } => run_method(
            &config,
            config.pagerank(beta).into(),
            &graph,
            &seeds,
            prior.as_deref(),
            &output,
        ),
        Command::Dk {
            graph,
            seeds,
            beta,
            output,
        } => run_method(
            &config,
            config.diffusion_kernel(beta).into(),
            &graph,
            &seeds,
            None,
            &output,
        ),
        Command::Auroc {
            ranked,
            truth,
            exclude,
        } => auroc(&ranked, &truth, exclude.as_deref()),
        Command::Loo {
            method,
            graph,
            seeds,
            parameter,
            output,
        } => loo(&config, method, &graph, &seeds, parameter, &output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use signalphmm::cli::{load_detector, run_detect, run_train, DetectInputs, TrainInputs};
use signalphmm::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, about, version)]
struct Opts {
    /// Show debug logs (`RUST_LOG` overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Number of worker threads (0 uses all cores)
    #[arg(short = 't', long, default_value_t = 0, global = true)]
    threads: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train k-mer emissions and transitions by Baum-Welch
    Train {
        /// Reference FASTA (.gz allowed)
        #[arg(short, long)]
        reference: PathBuf,
        /// Record name in the reference FASTA (first record if not specified)
        #[arg(long)]
        reference_name: Option<String>,
        /// Start of the training window on the reference
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// End (exclusive) of the training window. The end of the record if not specified
        #[arg(long)]
        end: Option<usize>,
        /// Initial emission model (pore model table or trained model)
        #[arg(short, long)]
        pore_model: PathBuf,
        /// Trained model whose transitions are used as the initial transitions
        #[arg(long)]
        init_transitions: Option<PathBuf>,
        /// Topology: anchored, anchored-wide-skip or unanchored
        #[arg(short, long, default_value = "anchored")]
        model_type: String,
        /// Max number of EM iterations
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
        /// Convergence threshold on the largest parameter change
        #[arg(long, default_value_t = 1e-3)]
        threshold: f64,
        /// Minimum number of regions
        #[arg(long, default_value_t = 2)]
        min_regions: usize,
        /// Signal segments `read_id ref_start ref_end s0,s1,...` (.gz allowed)
        signal: PathBuf,
        /// Output model file (.gz allowed). The summary is written to `<output>.json`
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Score reads by the log-likelihood ratio of analogue against canonical
    Detect {
        /// Reference FASTA (.gz allowed)
        #[arg(short, long)]
        reference: PathBuf,
        /// Record name in the reference FASTA (first record if not specified)
        #[arg(long)]
        reference_name: Option<String>,
        /// Canonical emission model
        #[arg(short, long)]
        canonical: PathBuf,
        /// Analogue emission model
        #[arg(short, long)]
        analogue: PathBuf,
        /// Topology: anchored, anchored-wide-skip or unanchored.
        /// The type of the `--transitions` model, or anchored, if not specified
        #[arg(short, long)]
        model_type: Option<String>,
        /// Trained model whose transition rows are used for every read
        #[arg(long)]
        transitions: Option<PathBuf>,
        /// Use only the first N observations of each read
        #[arg(short = 'n', long)]
        segment_length: Option<usize>,
        /// Signal segments `read_id ref_start ref_end s0,s1,...` (.gz allowed)
        signal: PathBuf,
        /// Output tsv `read_id ref_start ref_end llr` (.gz allowed)
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let opts: Opts = Opts::parse();
    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    println!("# started_at={}", chrono::Local::now());
    println!("# opts={:?}", opts);

    match opts.command {
        Commands::Train {
            reference,
            reference_name,
            start,
            end,
            pore_model,
            init_transitions,
            model_type,
            max_iter,
            threshold,
            min_regions,
            signal,
            output,
        } => {
            let model_type: ModelType = model_type.parse()?;
            let config = TrainConfig {
                model_type,
                n_threads: opts.threads,
                max_iter,
                threshold,
                min_regions,
                verbose: opts.verbose,
                ..TrainConfig::default()
            };
            let inputs = TrainInputs {
                reference,
                reference_name,
                start,
                end,
                pore_model,
                init_transitions,
                signal,
                output,
            };
            let model = run_train(&inputs, config)
                .with_context(|| format!("training failed with {:?}", inputs))?;
            println!("# {}", model);
        }
        Commands::Detect {
            reference,
            reference_name,
            canonical,
            analogue,
            model_type,
            transitions,
            segment_length,
            signal,
            output,
        } => {
            let model_type: Option<ModelType> = model_type.map(|s| s.parse::<ModelType>()).transpose()?;
            let detector = load_detector(model_type, transitions.as_deref())
                .with_context(|| format!("failed to load transitions {:?}", transitions))?;
            let inputs = DetectInputs {
                reference,
                reference_name,
                canonical,
                analogue,
                signal,
                output,
                segment_length,
            };
            let n = run_detect(&inputs, &detector, opts.threads)
                .with_context(|| format!("detection failed with {:?}", inputs))?;
            println!("# n_scored={}", n);
        }
    }
    println!("# finished_at={}", chrono::Local::now());
    Ok(())
}

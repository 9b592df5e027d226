//! pdfoutline CLI - document outline inference tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfoutline::pipeline::{document_name, OutlinePipeline, PipelineOptions};
use pdfoutline::render::{read_json, to_json, write_json};
use pdfoutline::training::{
    evaluate, feature_records, join_labels, label_records, read_table, write_table, FeatureRecord,
    LabelRecord,
};
use pdfoutline::{
    ArtifactStore, ExtractedDocument, FeedbackLoop, JsonFormat, LopdfSource, OutlineDocument,
    Strategy, TrainingParams,
};

const CORPUS_FILE: &str = "corpus.csv";

#[derive(Parser)]
#[command(name = "pdfoutline")]
#[command(version)]
#[command(about = "Infer document outlines (title and headings) from PDF layout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the outline of one or more PDFs
    Outline {
        /// Input PDF files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input) or directory (several inputs)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Heading classifier
        #[arg(long, value_enum, default_value = "heuristic")]
        strategy: StrategyArg,

        /// Trained model store (learned strategy)
        #[arg(long, env = "PDFOUTLINE_MODEL_DIR", value_name = "DIR")]
        model_dir: Option<PathBuf>,

        /// Maximum pages to read
        #[arg(long, default_value = "50")]
        max_pages: u32,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Process files one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Extract text fragments into an extraction artifact
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Maximum pages to read
        #[arg(long, default_value = "50")]
        max_pages: u32,
    },

    /// Show the text-native vs OCR routing decision
    Route {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Build a feature table from extraction artifacts
    Features {
        /// Extraction artifact JSON files
        #[arg(value_name = "JSON", required = true)]
        inputs: Vec<PathBuf>,

        /// Output CSV file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Build a label table to correct, pre-filled from an outline
    Labels {
        /// Extraction artifact JSON file
        #[arg(long, value_name = "JSON")]
        extracted: PathBuf,

        /// Outline JSON file for the same document
        #[arg(long, value_name = "JSON")]
        outline: PathBuf,

        /// Output CSV file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Train a model from the corpus and publish it
    Train {
        /// Training corpus directory
        #[arg(long, env = "PDFOUTLINE_CORPUS_DIR", value_name = "DIR")]
        corpus_dir: PathBuf,

        /// Model store directory
        #[arg(long, env = "PDFOUTLINE_MODEL_DIR", value_name = "DIR")]
        model_dir: PathBuf,

        #[command(flatten)]
        params: ParamsArgs,
    },

    /// Promote corrected labels into the corpus and retrain
    Feedback {
        /// Feature table of the latest extraction
        #[arg(long, value_name = "CSV")]
        features: PathBuf,

        /// Corrected label table
        #[arg(long, value_name = "CSV")]
        labels: PathBuf,

        /// Training corpus directory
        #[arg(long, env = "PDFOUTLINE_CORPUS_DIR", value_name = "DIR")]
        corpus_dir: PathBuf,

        /// Model store directory
        #[arg(long, env = "PDFOUTLINE_MODEL_DIR", value_name = "DIR")]
        model_dir: PathBuf,

        #[command(flatten)]
        params: ParamsArgs,
    },

    /// Score the current model against a labelled feature table
    Evaluate {
        /// Feature table
        #[arg(long, value_name = "CSV")]
        features: PathBuf,

        /// Label table
        #[arg(long, value_name = "CSV")]
        labels: PathBuf,

        /// Model store directory
        #[arg(long, env = "PDFOUTLINE_MODEL_DIR", value_name = "DIR")]
        model_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct ParamsArgs {
    /// Boosting stages
    #[arg(long, default_value = "200")]
    estimators: usize,

    /// Seed of the train/test split
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Held-out share of rows
    #[arg(long, default_value = "0.2")]
    test_fraction: f64,
}

impl From<ParamsArgs> for TrainingParams {
    fn from(args: ParamsArgs) -> Self {
        TrainingParams::default()
            .with_estimators(args.estimators)
            .with_seed(args.seed)
            .with_test_fraction(args.test_fraction)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Font-size ranking
    Heuristic,
    /// Trained model
    Learned,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Heuristic => Strategy::Heuristic,
            StrategyArg::Learned => Strategy::Learned,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Outline {
            inputs,
            output,
            strategy,
            model_dir,
            max_pages,
            compact,
            sequential,
        } => {
            let mut options = PipelineOptions::new()
                .with_strategy(strategy.into())
                .with_max_pages(max_pages);
            if sequential {
                options = options.sequential();
            }
            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            cmd_outline(&inputs, output.as_deref(), options, model_dir, format)
        }
        Commands::Extract {
            input,
            output,
            max_pages,
        } => cmd_extract(&input, output.as_deref(), max_pages),
        Commands::Route { input } => cmd_route(&input),
        Commands::Features { inputs, output } => cmd_features(&inputs, &output),
        Commands::Labels {
            extracted,
            outline,
            output,
        } => cmd_labels(&extracted, &outline, &output),
        Commands::Train {
            corpus_dir,
            model_dir,
            params,
        } => cmd_train(&corpus_dir, &model_dir, params.into()),
        Commands::Feedback {
            features,
            labels,
            corpus_dir,
            model_dir,
            params,
        } => cmd_feedback(&features, &labels, &corpus_dir, &model_dir, params.into()),
        Commands::Evaluate {
            features,
            labels,
            model_dir,
        } => cmd_evaluate(&features, &labels, &model_dir),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_outline(
    inputs: &[PathBuf],
    output: Option<&Path>,
    options: PipelineOptions,
    model_dir: Option<PathBuf>,
    format: JsonFormat,
) -> CliResult {
    let mut pipeline = OutlinePipeline::new(options);
    if let Some(dir) = model_dir {
        log::debug!("using model store {}", dir.display());
        pipeline = pipeline.with_artifact_store(ArtifactStore::open(dir));
    }

    if let [input] = inputs {
        let outline = pipeline.process_path(input)?;
        return emit(&outline, output, format);
    }

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Outlining {} documents...", inputs.len()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let items = pipeline.process_batch(inputs)?;
    pb.finish_and_clear();

    let mut failed = 0;
    for item in items {
        let stem = item
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| document_name(&item.path));
        match item.result {
            Ok(outline) => {
                let path = output_dir.join(format!("{}.json", stem));
                write_json(&path, &outline, format)?;
                println!(
                    "  {} {} ({} headings)",
                    "├─".dimmed(),
                    path.display(),
                    outline.metadata.total_headings
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "├─".dimmed(), item.path.display(), e.to_string().red());
            }
        }
    }

    let summary = format!("{} of {} documents outlined", inputs.len() - failed, inputs.len());
    if failed == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
    Ok(())
}

fn emit(outline: &OutlineDocument, output: Option<&Path>, format: JsonFormat) -> CliResult {
    if let Some(path) = output {
        write_json(path, outline, format)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", to_json(outline, format)?);
    }
    Ok(())
}

fn cmd_extract(input: &Path, output: Option<&Path>, max_pages: u32) -> CliResult {
    let pipeline = OutlinePipeline::new(PipelineOptions::new().with_max_pages(max_pages));
    let doc = pipeline.extract_path(input)?;

    if let Some(path) = output {
        doc.save_json(path)?;
        println!(
            "{} {} ({} fragments, {} pages)",
            "Saved to".green(),
            path.display(),
            doc.text_blocks.len(),
            doc.page_count
        );
    } else {
        println!("{}", to_json(&doc, JsonFormat::Pretty)?);
    }
    Ok(())
}

fn cmd_route(input: &Path) -> CliResult {
    let source = LopdfSource::open(input)?;
    let report = OutlinePipeline::default().route(&source)?;

    println!("{}", "Routing".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Sampled pages".bold(), report.sampled_pages);
    println!("{}: {}", "Empty pages".bold(), report.empty_pages);
    println!("{}: {:.2}", "Empty ratio".bold(), report.empty_ratio);
    println!("{}: {:?}", "Decision".bold(), report.decision);
    Ok(())
}

fn cmd_features(inputs: &[PathBuf], output: &Path) -> CliResult {
    let mut rows = Vec::new();
    for input in inputs {
        let doc = ExtractedDocument::load_json(input)?;
        rows.extend(feature_records(&doc));
    }
    write_table(output, &rows)?;
    println!("{} {} ({} rows)", "Saved to".green(), output.display(), rows.len());
    Ok(())
}

fn cmd_labels(extracted: &Path, outline: &Path, output: &Path) -> CliResult {
    let doc = ExtractedDocument::load_json(extracted)?;
    let outline: OutlineDocument = read_json(outline)?;
    let rows = label_records(&doc, &outline);
    write_table(output, &rows)?;
    println!("{} {} ({} rows)", "Saved to".green(), output.display(), rows.len());
    Ok(())
}

fn cmd_train(corpus_dir: &Path, model_dir: &Path, params: TrainingParams) -> CliResult {
    let feedback = FeedbackLoop::new(corpus_dir.join(CORPUS_FILE), ArtifactStore::open(model_dir))
        .with_params(params);
    let artifact = feedback.retrain()?;

    println!("{} {}", "Published model".green().bold(), artifact.version);
    if let Some(report) = &artifact.evaluation {
        println!("{}", report);
    }
    Ok(())
}

fn cmd_feedback(
    features: &Path,
    labels: &Path,
    corpus_dir: &Path,
    model_dir: &Path,
    params: TrainingParams,
) -> CliResult {
    let features: Vec<FeatureRecord> = read_table(features)?;
    let labels: Vec<LabelRecord> = read_table(labels)?;

    let feedback = FeedbackLoop::new(corpus_dir.join(CORPUS_FILE), ArtifactStore::open(model_dir))
        .with_params(params);
    let outcome = feedback.run(&features, &labels)?;

    let promotion = &outcome.promotion;
    println!("{}: {}", "Promoted rows".bold(), promotion.matched);
    if promotion.dropped() > 0 {
        println!(
            "{}: {} unlabelled feature rows, {} unmatched label rows",
            "Dropped".yellow().bold(),
            promotion.unmatched_features,
            promotion.unmatched_labels
        );
    }
    println!("{}: {}", "Corpus rows".bold(), outcome.corpus_rows);
    println!("{} {}", "Published model".green().bold(), outcome.artifact.version);
    if let Some(report) = &outcome.artifact.evaluation {
        println!("{}", report);
    }
    Ok(())
}

fn cmd_evaluate(features: &Path, labels: &Path, model_dir: &Path) -> CliResult {
    let features: Vec<FeatureRecord> = read_table(features)?;
    let labels: Vec<LabelRecord> = read_table(labels)?;
    let artifact = ArtifactStore::open(model_dir).load_current()?;

    let (rows, promotion) = join_labels(&features, &labels);
    if promotion.dropped() > 0 {
        println!(
            "{}: {} feature rows and {} label rows did not join",
            "Note".yellow().bold(),
            promotion.unmatched_features,
            promotion.unmatched_labels
        );
    }
    let report = evaluate(&artifact, &rows)?;

    println!("{} {}", "Model".cyan().bold(), artifact.version);
    println!("{}", "─".repeat(40).dimmed());
    println!("{}", report);
    Ok(())
}

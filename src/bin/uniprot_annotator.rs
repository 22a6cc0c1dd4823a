use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use uniprot_annotator::app::{AnnotateOptions, App};
use uniprot_annotator::cache::AnnotationCache;
use uniprot_annotator::config::ConfigLoader;
use uniprot_annotator::domain::{NameMode, OrganismId};
use uniprot_annotator::error::AnnotatorError;
use uniprot_annotator::output::JsonOutput;

#[derive(Parser)]
#[command(name = "uniprot-annotator")]
#[command(about = "Fetch UniProt sequence features and GO terms for batches of proteins")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./uniprot-annotator.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch annotations for one or more proteins")]
    Fetch(FetchArgs),
    #[command(about = "Print the effective configuration")]
    Config,
}

#[derive(Args)]
struct FetchArgs {
    /// Protein identifiers; comma or whitespace separated lists are accepted
    proteins: Vec<String>,

    /// Read identifiers from a file as well
    #[arg(long)]
    ids_file: Option<String>,

    #[arg(long, value_enum)]
    name_mode: Option<NameMode>,

    /// NCBI taxonomy id used to scope searches
    #[arg(long)]
    organism: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AnnotatorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AnnotatorError) -> u8 {
    match error {
        AnnotatorError::InvalidBatch(_)
        | AnnotatorError::InvalidProteinId(_)
        | AnnotatorError::InvalidOrganismId(_)
        | AnnotatorError::InvalidNameMode(_) => 2,
        AnnotatorError::ConfigRead(_)
        | AnnotatorError::ConfigParse(_)
        | AnnotatorError::ConfigValue(_) => 2,
        AnnotatorError::UniprotHttp(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            JsonOutput::print_config(&config.to_config()).into_diagnostic()?;
            Ok(())
        }
        Commands::Fetch(args) => {
            let mut raw_ids = args.proteins;
            if let Some(path) = args.ids_file {
                let content = fs::read_to_string(&path).into_diagnostic()?;
                raw_ids.push(content);
            }
            let organism = args
                .organism
                .map(|value| value.parse::<OrganismId>())
                .transpose()?;

            let cache = Arc::new(AnnotationCache::new(config.cache_ttl));
            let app = App::from_config(&config, cache)?;
            let result = app.annotate(
                &raw_ids,
                AnnotateOptions {
                    name_mode: args.name_mode,
                    organism,
                },
            )?;
            JsonOutput::print_batch(&result).into_diagnostic()?;
            Ok(())
        }
    }
}

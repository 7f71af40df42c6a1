use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_curate::aggregate::Aggregator;
use kira_curate::config::{ConfigLoader, ResolvedConfig};
use kira_curate::domain::ProjectAccession;
use kira_curate::ena::EnaHttpClient;
use kira_curate::error::CurateError;
use kira_curate::geo::{GeoHttpClient, MinimlOutcome, MinimlResolver, NO_GEO_LINK};
use kira_curate::ncbi::NcbiHttpClient;
use kira_curate::output::{self, JsonOutput};

#[derive(Parser)]
#[command(name = "kira-curate")]
#[command(about = "Fetch SRA run metadata and GEO MINiML exports for dataset curation")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to kira-curate.json when present)")]
    config: Option<String>,

    #[arg(long, global = true, help = "Directory for fallback CSVs and written artifacts")]
    work_dir: Option<String>,

    #[arg(long, global = true, help = "Pause between BioSample batches, in milliseconds")]
    batch_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Merge ENA runs with BioSample attributes (falls back to SraRunTable.csv)")]
    SraMetadata(ProjectArgs),
    #[command(about = "Download the MINiML family XML of the GEO series linked to a BioProject")]
    Miniml(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(help = "BioProject accession, e.g. PRJNA1018599")]
    project: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CurateError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CurateError) -> u8 {
    match error {
        CurateError::NoRunData { .. } => 2,
        CurateError::EnaHttp(_)
        | CurateError::EnaStatus { .. }
        | CurateError::NcbiHttp(_)
        | CurateError::NcbiStatus { .. }
        | CurateError::GeoHttp(_)
        | CurateError::GeoStatus { .. }
        | CurateError::NoRunsFound(_)
        | CurateError::MalformedResponse(_)
        | CurateError::ArchiveNotFound { .. }
        | CurateError::ArchiveMemberNotFound { .. }
        | CurateError::MalformedArchive(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir.into();
    }
    if let Some(delay) = cli.batch_delay_ms {
        config.batch.delay = Duration::from_millis(delay);
    }

    match cli.command {
        Commands::SraMetadata(args) => run_sra_metadata(&args.project, &config),
        Commands::Miniml(args) => run_miniml(&args.project, &config),
    }
}

fn run_sra_metadata(project: &str, config: &ResolvedConfig) -> miette::Result<()> {
    let project: ProjectAccession = project.parse()?;

    let ena = EnaHttpClient::new(&config.ena_portal_url)?;
    let ncbi = NcbiHttpClient::new(&config.eutils_url)?;
    let aggregator = Aggregator::standard(&ena, &ncbi, config.batch, config.work_dir.clone());
    let document = aggregator.aggregate(&project)?;

    output::write_document(&output::metadata_path(&config.work_dir, &project), &document)?;
    JsonOutput::print_document(&document).into_diagnostic()?;
    Ok(())
}

fn run_miniml(project: &str, config: &ResolvedConfig) -> miette::Result<()> {
    let project: ProjectAccession = project.parse()?;

    let ncbi = NcbiHttpClient::new(&config.eutils_url)?;
    let geo = GeoHttpClient::new()?;
    let resolver = MinimlResolver::new(
        &ncbi,
        &geo,
        &config.geo_ftp_url,
        &config.archive_member_suffix,
    );

    match resolver.resolve(&project)? {
        MinimlOutcome::Found { accession, xml } => {
            let path = output::miniml_path(&config.work_dir, &accession);
            output::write_file_atomic(&path, xml.as_bytes())?;
            JsonOutput::print_line(accession.as_str()).into_diagnostic()?;
        }
        MinimlOutcome::NoLinkedSeries => {
            JsonOutput::print_line(NO_GEO_LINK).into_diagnostic()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(
            map_exit_code(&CurateError::NoRunData {
                project: "PRJNA1".to_string(),
                expected: "tmp/PRJNA1_SraRunTable.csv".to_string(),
            }),
            2
        );
        assert_eq!(
            map_exit_code(&CurateError::ArchiveNotFound {
                accession: "GSE1".to_string(),
                message: "404".to_string(),
            }),
            3
        );
        assert_eq!(
            map_exit_code(&CurateError::InvalidProjectAccession("x".to_string())),
            1
        );
    }
}

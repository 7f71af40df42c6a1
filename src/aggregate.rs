use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::biosample::{AttributeMap, AttributeSource, fetch_attributes};
use crate::config::BatchSettings;
use crate::domain::{AggregatedDocument, ProjectAccession, Provenance, RunRecord};
use crate::ena::RunSource;
use crate::error::CurateError;
use crate::tabular;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchingRuns,
    FetchingAttributes,
    Merging,
    FallbackParse,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum Attempt {
    Provided {
        runs: Vec<RunRecord>,
        source: Provenance,
    },
    Unavailable(String),
}

pub trait RunProvider {
    fn label(&self) -> &'static str;
    fn attempt(&self, project: &ProjectAccession) -> Result<Attempt, CurateError>;
}

pub struct NetworkProvider<'a, R: ?Sized, A: ?Sized> {
    runs: &'a R,
    attributes: &'a A,
    batch: BatchSettings,
}

impl<'a, R, A> NetworkProvider<'a, R, A>
where
    R: RunSource + ?Sized,
    A: AttributeSource + ?Sized,
{
    pub fn new(runs: &'a R, attributes: &'a A, batch: BatchSettings) -> Self {
        Self {
            runs,
            attributes,
            batch,
        }
    }
}

impl<R, A> RunProvider for NetworkProvider<'_, R, A>
where
    R: RunSource + ?Sized,
    A: AttributeSource + ?Sized,
{
    fn label(&self) -> &'static str {
        "ENA+BioSample"
    }

    fn attempt(&self, project: &ProjectAccession) -> Result<Attempt, CurateError> {
        tracing::debug!(phase = ?Phase::FetchingRuns);
        let mut runs = match self.runs.fetch_runs(project) {
            Ok(runs) => runs,
            Err(err) if err.is_source_failure() => return Ok(Attempt::Unavailable(err.to_string())),
            Err(err) => return Err(err),
        };

        tracing::debug!(phase = ?Phase::FetchingAttributes);
        let samples = distinct_samples(&runs);
        let fetched = fetch_attributes(self.attributes, &samples, self.batch);
        if fetched.failed_batches > 0 {
            tracing::warn!(
                failed = fetched.failed_batches,
                batches = fetched.batches,
                "some BioSample batches were skipped"
            );
        }

        tracing::debug!(phase = ?Phase::Merging);
        merge_attributes(&mut runs, &fetched.attributes);
        Ok(Attempt::Provided {
            runs,
            source: Provenance::CombinedApi,
        })
    }
}

pub struct FallbackFileProvider {
    work_dir: Utf8PathBuf,
}

impl FallbackFileProvider {
    pub fn new(work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn candidates(&self, project: &ProjectAccession) -> [Utf8PathBuf; 2] {
        [
            fallback_csv_path(&self.work_dir, project),
            self.work_dir.join("SraRunTable.csv"),
        ]
    }
}

impl RunProvider for FallbackFileProvider {
    fn label(&self) -> &'static str {
        "manual CSV"
    }

    fn attempt(&self, project: &ProjectAccession) -> Result<Attempt, CurateError> {
        tracing::debug!(phase = ?Phase::FallbackParse);
        let Some(path) = self
            .candidates(project)
            .into_iter()
            .find(|path| path.as_std_path().is_file())
        else {
            return Ok(Attempt::Unavailable(format!(
                "no SraRunTable.csv under {}",
                self.work_dir
            )));
        };

        tracing::info!(%path, "found manual CSV");
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CurateError::Filesystem(format!("read {path}: {err}")))?;
        let runs = tabular::parse_runs(&content);
        tracing::info!(rows = runs.len(), "parsed manual CSV");
        Ok(Attempt::Provided {
            runs,
            source: Provenance::ManualCsv,
        })
    }
}

pub struct Aggregator<'a> {
    providers: Vec<Box<dyn RunProvider + 'a>>,
    work_dir: Utf8PathBuf,
}

impl<'a> Aggregator<'a> {
    pub fn new(work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            providers: Vec::new(),
            work_dir: work_dir.into(),
        }
    }

    pub fn standard<R, A>(
        runs: &'a R,
        attributes: &'a A,
        batch: BatchSettings,
        work_dir: impl Into<Utf8PathBuf>,
    ) -> Self
    where
        R: RunSource + ?Sized,
        A: AttributeSource + ?Sized,
    {
        let work_dir = work_dir.into();
        Self::new(work_dir.clone())
            .with_provider(NetworkProvider::new(runs, attributes, batch))
            .with_provider(FallbackFileProvider::new(work_dir))
    }

    pub fn with_provider(mut self, provider: impl RunProvider + 'a) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn aggregate(&self, project: &ProjectAccession) -> Result<AggregatedDocument, CurateError> {
        tracing::info!(%project, "fetching SRA metadata");
        for provider in &self.providers {
            match provider.attempt(project)? {
                Attempt::Provided { runs, source } => {
                    tracing::debug!(phase = ?Phase::Done, provider = provider.label());
                    let document = AggregatedDocument::new(project, source, runs);
                    log_summary(&document);
                    return Ok(document);
                }
                Attempt::Unavailable(reason) => {
                    tracing::warn!(provider = provider.label(), %reason, "source unavailable, trying next");
                }
            }
        }

        tracing::debug!(phase = ?Phase::Failed);
        Err(CurateError::NoRunData {
            project: project.to_string(),
            expected: fallback_csv_path(&self.work_dir, project).to_string(),
        })
    }
}

pub fn fallback_csv_path(work_dir: &Utf8Path, project: &ProjectAccession) -> Utf8PathBuf {
    work_dir.join(format!("{project}_SraRunTable.csv"))
}

pub fn distinct_samples(runs: &[RunRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    runs.iter()
        .map(|run| run.sample_accession.as_str())
        .filter(|acc| !acc.is_empty() && seen.insert(*acc))
        .map(str::to_string)
        .collect()
}

pub fn merge_attributes(runs: &mut [RunRecord], attributes: &AttributeMap) {
    for run in runs.iter_mut() {
        if let Some(found) = attributes.get(&run.sample_accession) {
            if !found.is_empty() {
                run.sample_attributes = Some(found.clone());
            }
        }
    }
}

fn log_summary(document: &AggregatedDocument) {
    let samples = document
        .runs()
        .iter()
        .map(|run| run.sample_accession.as_str())
        .collect::<HashSet<_>>()
        .len();
    let with_attributes = document
        .runs()
        .iter()
        .filter(|run| run.sample_attributes.as_ref().is_some_and(|attrs| !attrs.is_empty()))
        .count();
    tracing::info!(
        source = %document.source(),
        runs = document.run_count(),
        samples,
        with_attributes,
        "aggregated run metadata"
    );
}

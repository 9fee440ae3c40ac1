use camino::Utf8PathBuf;
use serde::Serialize;

use crate::analysis::{AnalysisSettings, StepReport, run_analysis};
use crate::domain::{ExperimentId, GenomeAssembly, SignalType};
use crate::download::{DownloadAction, DownloadOutcome, download_manifest};
use crate::encode::EncodeClient;
use crate::error::FlowError;
use crate::layout::{AnalysisLayout, ContentLayout};
use crate::resolver::{FileFilter, resolve_manifest};
use crate::retry::RetryPolicy;
use crate::tools::ToolRunner;
use crate::validate::validate_inputs;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Message(String),
    Transfer {
        accession: String,
        downloaded: u64,
        total: Option<u64>,
    },
    TransferDone {
        accession: String,
    },
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        ProgressEvent::Message(message.into())
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct IntegrateRequest {
    pub experiments: Vec<String>,
    pub output: Utf8PathBuf,
    pub signal_type: String,
    pub genome_assembly: String,
}

impl IntegrateRequest {
    pub fn new(experiments: Vec<String>, output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            experiments,
            output: output.into(),
            signal_type: SignalType::default().to_string(),
            genome_assembly: GenomeAssembly::default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    pub sample_sheet: String,
    pub records: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub files: Vec<DownloadOutcome>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub regions: Vec<Utf8PathBuf>,
    pub content_dir: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub settings: AnalysisSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub output: String,
    pub tracks: usize,
    pub regions: usize,
    pub steps: Vec<StepReport>,
}

#[derive(Clone)]
pub struct App<E, T> {
    encode: E,
    tools: T,
    retry: RetryPolicy,
}

impl<E, T> App<E, T> {
    pub fn new(encode: E, tools: T) -> Self {
        Self {
            encode,
            tools,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl<E: EncodeClient, T> App<E, T> {
    pub fn integrate(
        &self,
        request: &IntegrateRequest,
        sink: &dyn ProgressSink,
    ) -> Result<IntegrationReport, FlowError> {
        let signal_type: SignalType = request.signal_type.parse()?;
        let assembly: GenomeAssembly = request.genome_assembly.parse()?;
        if request.experiments.is_empty() {
            return Err(FlowError::NoExperiments);
        }
        let experiments = request
            .experiments
            .iter()
            .map(|id| id.parse::<ExperimentId>())
            .collect::<Result<Vec<_>, _>>()?;

        let layout = ContentLayout::new(request.output.clone());
        if layout.ensure_data_dir()? {
            sink.event(ProgressEvent::message("Created output directory."));
        }

        let filter = FileFilter::new(signal_type, assembly);
        let manifest = resolve_manifest(&self.encode, &experiments, filter, sink)?;
        let sample_sheet = layout.sample_sheet_path();
        manifest.write(&sample_sheet)?;
        sink.event(ProgressEvent::message(format!(
            "Sample sheet saved in {} directory.",
            layout.root()
        )));
        sink.event(ProgressEvent::message(format!(
            "Extracted {} files.",
            manifest.len()
        )));

        let files = download_manifest(&self.encode, &manifest, &layout, &self.retry, sink)?;
        let skipped = files
            .iter()
            .filter(|outcome| outcome.action == DownloadAction::Skipped)
            .count();
        Ok(IntegrationReport {
            sample_sheet: sample_sheet.to_string(),
            records: manifest.len(),
            downloaded: files.len() - skipped,
            skipped,
            files,
        })
    }
}

impl<T: ToolRunner> App<(), T> {
    pub fn offline(tools: T) -> Self {
        Self::new((), tools)
    }
}

impl<E, T: ToolRunner> App<E, T> {
    pub fn analyze(
        &self,
        request: &AnalyzeRequest,
        sink: &dyn ProgressSink,
    ) -> Result<AnalysisReport, FlowError> {
        let content = ContentLayout::new(request.content_dir.clone());
        let output = AnalysisLayout::new(request.output.clone());
        let inputs = validate_inputs(&content, &request.regions, &output, sink)?;
        let steps = run_analysis(&self.tools, &inputs, &request.settings, sink)?;
        Ok(AnalysisReport {
            output: output.root().to_string(),
            tracks: inputs.tracks.len(),
            regions: inputs.regions.len(),
            steps,
        })
    }
}

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{accession_from_path, region_label};
use crate::error::FlowError;
use crate::manifest::ManifestIndex;
use crate::tools::{ExtraOptions, ToolCommand, ToolExit, ToolRunner};
use crate::validate::AnalysisInputs;

pub const DEFAULT_REF_POINT_LABEL: &str = "CpG";
pub const HEATMAP_DPI: u32 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    pub compute_matrix: ExtraOptions,
    pub plot_heatmap: ExtraOptions,
    pub summary: ExtraOptions,
    pub plot_pca: ExtraOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub window: u32,
    pub workers: u32,
    pub ref_point_label: String,
    pub strict_tools: bool,
    pub options: ToolOptions,
}

impl AnalysisSettings {
    pub fn new(window: u32, workers: u32) -> Self {
        Self {
            window,
            workers,
            ref_point_label: DEFAULT_REF_POINT_LABEL.to_string(),
            strict_tools: false,
            options: ToolOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ComputeMatrix,
    PlotHeatmap,
    BuildSummaryMatrix,
    PlotPca,
}

impl Step {
    pub fn program(&self) -> &'static str {
        match self {
            Step::ComputeMatrix => "computeMatrix",
            Step::PlotHeatmap => "plotHeatmap",
            Step::BuildSummaryMatrix => "multiBigwigSummary",
            Step::PlotPca => "plotPCA",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ComputeMatrix => "compute_matrix",
            Step::PlotHeatmap => "plot_heatmap",
            Step::BuildSummaryMatrix => "build_summary_matrix",
            Step::PlotPca => "plot_PCA",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub command: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

pub fn sample_labels(tracks: &[Utf8PathBuf], index: &ManifestIndex<'_>) -> Vec<String> {
    tracks
        .iter()
        .map(|track| {
            let accession = accession_from_path(track.as_std_path());
            match index.term_name(&accession) {
                Some(term_name) => term_name.to_string(),
                None => {
                    tracing::warn!("{accession} is not in the sample sheet, labelling by accession");
                    accession
                }
            }
        })
        .collect()
}

pub fn region_labels(regions: &[Utf8PathBuf]) -> Vec<String> {
    regions
        .iter()
        .map(|region| region_label(region.as_std_path()))
        .collect()
}

fn path_args(paths: &[Utf8PathBuf]) -> impl Iterator<Item = String> + '_ {
    paths.iter().map(|path| path.to_string())
}

pub fn compute_matrix_command(
    inputs: &AnalysisInputs,
    labels: &[String],
    settings: &AnalysisSettings,
) -> ToolCommand {
    ToolCommand::new(Step::ComputeMatrix.program())
        .arg("reference-point")
        .arg("-p")
        .arg(settings.workers.to_string())
        .arg("-S")
        .args(path_args(&inputs.tracks))
        .arg("-R")
        .args(path_args(&inputs.regions))
        .arg("-a")
        .arg(settings.window.to_string())
        .arg("-b")
        .arg(settings.window.to_string())
        .arg("-o")
        .arg(inputs.output.matrix_path().to_string())
        .arg("--samplesLabel")
        .args(labels.iter().cloned())
        .extra(&settings.options.compute_matrix)
}

pub fn plot_heatmap_command(inputs: &AnalysisInputs, settings: &AnalysisSettings) -> ToolCommand {
    ToolCommand::new(Step::PlotHeatmap.program())
        .arg("-m")
        .arg(inputs.output.matrix_path().to_string())
        .arg("--regionsLabel")
        .args(region_labels(&inputs.regions))
        .arg("--refPointLabel")
        .arg(settings.ref_point_label.clone())
        .arg("--dpi")
        .arg(HEATMAP_DPI.to_string())
        .arg("--perGroup")
        .arg("-o")
        .arg(inputs.output.heatmap_path().to_string())
        .extra(&settings.options.plot_heatmap)
}

pub fn summary_matrix_command(inputs: &AnalysisInputs, settings: &AnalysisSettings) -> ToolCommand {
    ToolCommand::new(Step::BuildSummaryMatrix.program())
        .arg("BED-file")
        .arg("-p")
        .arg(settings.workers.to_string())
        .arg("-b")
        .args(path_args(&inputs.tracks))
        .arg("--BED")
        .args(path_args(&inputs.regions))
        .arg("-o")
        .arg(inputs.output.summary_npz_path().to_string())
        .arg("--smartLabels")
        .arg("--outRawCounts")
        .arg(inputs.output.summary_tsv_path().to_string())
        .extra(&settings.options.summary)
}

pub fn plot_pca_command(
    inputs: &AnalysisInputs,
    labels: &[String],
    settings: &AnalysisSettings,
) -> ToolCommand {
    ToolCommand::new(Step::PlotPca.program())
        .arg("-in")
        .arg(inputs.output.summary_npz_path().to_string())
        .arg("-o")
        .arg(inputs.output.pca_path().to_string())
        .arg("--labels")
        .args(labels.iter().cloned())
        .extra(&settings.options.plot_pca)
}

pub fn run_analysis<R: ToolRunner + ?Sized>(
    runner: &R,
    inputs: &AnalysisInputs,
    settings: &AnalysisSettings,
    sink: &dyn ProgressSink,
) -> Result<Vec<StepReport>, FlowError> {
    let matrix = inputs.output.matrix_path();
    if matrix.as_std_path().exists() {
        sink.event(ProgressEvent::message(
            "Attention! Matrix already exists in this directory. Aborting to prevent overwriting!",
        ));
        return Err(FlowError::OutputCollision(matrix.into_std_path_buf()));
    }

    let index = inputs.manifest.index();
    let labels = sample_labels(&inputs.tracks, &index);

    let plan = [
        (
            Step::ComputeMatrix,
            compute_matrix_command(inputs, &labels, settings),
        ),
        (Step::PlotHeatmap, plot_heatmap_command(inputs, settings)),
        (
            Step::BuildSummaryMatrix,
            summary_matrix_command(inputs, settings),
        ),
        (Step::PlotPca, plot_pca_command(inputs, &labels, settings)),
    ];

    let mut reports = Vec::with_capacity(plan.len());
    for (step, command) in plan {
        let exit = run_step(runner, step, &command, settings.strict_tools, sink)?;
        reports.push(StepReport {
            step,
            command: command.to_string(),
            exit_code: exit.code,
            success: exit.is_success(),
        });
    }
    Ok(reports)
}

fn run_step<R: ToolRunner + ?Sized>(
    runner: &R,
    step: Step,
    command: &ToolCommand,
    strict: bool,
    sink: &dyn ProgressSink,
) -> Result<ToolExit, FlowError> {
    sink.event(ProgressEvent::message(format!("Running: {command}")));
    let exit = runner.run(command)?;
    if !exit.is_success() {
        if strict {
            return Err(FlowError::ToolFailed {
                program: command.program.clone(),
                code: exit.code,
            });
        }
        tracing::warn!("{step}: {} exited with {:?}", command.program, exit.code);
    }
    Ok(exit)
}

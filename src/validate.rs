use camino::Utf8PathBuf;

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::FlowError;
use crate::layout::{AnalysisLayout, ContentLayout};
use crate::manifest::Manifest;

#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub tracks: Vec<Utf8PathBuf>,
    pub regions: Vec<Utf8PathBuf>,
    pub manifest: Manifest,
    pub output: AnalysisLayout,
}

pub fn validate_inputs(
    content: &ContentLayout,
    regions: &[Utf8PathBuf],
    output: &AnalysisLayout,
    sink: &dyn ProgressSink,
) -> Result<AnalysisInputs, FlowError> {
    let tracks = content.list_tracks()?;
    if tracks.is_empty() {
        return Err(FlowError::DataNotFound(format!(
            "Not found bigWig files in data/ in {} directory!",
            content.root()
        )));
    }

    let sample_sheet = content.sample_sheet_path();
    if !sample_sheet.as_std_path().is_file() {
        return Err(FlowError::DataNotFound(format!(
            "Samplesheet not found in {} directory!",
            content.root()
        )));
    }

    if regions.is_empty() {
        return Err(FlowError::DataNotFound(
            "No region files were given!".to_string(),
        ));
    }
    for region in regions {
        if !region.as_std_path().exists() {
            return Err(FlowError::DataNotFound(format!(
                "Region file not found: {region}!"
            )));
        }
    }

    if output.ensure_root()? {
        sink.event(ProgressEvent::message(format!(
            "Created {} directory.",
            output.root()
        )));
    }

    sink.event(ProgressEvent::message("Seems to be ok."));
    let manifest = Manifest::read(&sample_sheet)?;
    tracing::debug!(
        tracks = tracks.len(),
        regions = regions.len(),
        records = manifest.len(),
        "analysis inputs validated"
    );

    Ok(AnalysisInputs {
        tracks,
        regions: regions.to_vec(),
        manifest,
        output: output.clone(),
    })
}

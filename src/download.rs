use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::encode::EncodeClient;
use crate::error::FlowError;
use crate::layout::ContentLayout;
use crate::manifest::{FileRecord, Manifest};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub accession: String,
    pub link: String,
    pub target: Utf8PathBuf,
}

impl DownloadTask {
    pub fn for_record(record: &FileRecord, layout: &ContentLayout) -> Self {
        Self {
            accession: record.accession.clone(),
            link: record.link.clone(),
            target: layout.track_path(&record.accession),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadAction {
    Downloaded,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub accession: String,
    pub path: String,
    pub action: DownloadAction,
    pub bytes: Option<u64>,
    pub attempts: u32,
}

pub fn download_manifest<E: EncodeClient + ?Sized>(
    client: &E,
    manifest: &Manifest,
    layout: &ContentLayout,
    policy: &RetryPolicy,
    sink: &dyn ProgressSink,
) -> Result<Vec<DownloadOutcome>, FlowError> {
    let mut outcomes = Vec::with_capacity(manifest.len());
    for record in manifest {
        let task = DownloadTask::for_record(record, layout);
        outcomes.push(download_track(client, &task, policy, sink)?);
    }
    Ok(outcomes)
}

pub fn download_track<E: EncodeClient + ?Sized>(
    client: &E,
    task: &DownloadTask,
    policy: &RetryPolicy,
    sink: &dyn ProgressSink,
) -> Result<DownloadOutcome, FlowError> {
    let dir = task
        .target
        .parent()
        .map(|parent| parent.to_path_buf())
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    sink.event(ProgressEvent::message(format!(
        "Downloading file: {} to {dir} directory.",
        task.accession
    )));

    if task.target.as_std_path().exists() {
        sink.event(ProgressEvent::message(format!(
            "File {} already in {dir} directory, skipping.",
            task.accession
        )));
        return Ok(DownloadOutcome {
            accession: task.accession.clone(),
            path: task.target.to_string(),
            action: DownloadAction::Skipped,
            bytes: None,
            attempts: 0,
        });
    }

    let start = Instant::now();
    let mut attempts = 0u32;
    let result = policy.run(&task.accession, |attempt| {
        attempts = attempt;
        fetch_once(client, task, &dir, sink)
    });
    let bytes = result.map_err(|exhausted| FlowError::DownloadFailed {
        accession: task.accession.clone(),
        attempts: exhausted.attempts,
        message: exhausted.error.to_string(),
    })?;

    tracing::debug!(
        accession = %task.accession,
        bytes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "track stored"
    );
    sink.event(ProgressEvent::message("File downloaded successfully."));
    Ok(DownloadOutcome {
        accession: task.accession.clone(),
        path: task.target.to_string(),
        action: DownloadAction::Downloaded,
        bytes: Some(bytes),
        attempts,
    })
}

fn fetch_once<E: EncodeClient + ?Sized>(
    client: &E,
    task: &DownloadTask,
    dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<u64, FlowError> {
    let mut part = tempfile::Builder::new()
        .prefix(&format!(".{}", task.accession))
        .suffix(".part")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| FlowError::Filesystem(format!("create scratch file in {dir}: {err}")))?;

    let bytes = client.download(&task.link, part.as_file_mut(), &mut |downloaded, total| {
        sink.event(ProgressEvent::Transfer {
            accession: task.accession.clone(),
            downloaded,
            total,
        });
    })?;

    part.as_file()
        .sync_all()
        .map_err(|err| FlowError::Filesystem(err.to_string()))?;
    part.persist(task.target.as_std_path()).map_err(|err| {
        FlowError::Filesystem(format!("move into {}: {}", task.target, err.error))
    })?;
    sink.event(ProgressEvent::TransferDone {
        accession: task.accession.clone(),
    });
    Ok(bytes)
}

use std::io::{Read, Write};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::ExperimentId;
use crate::error::FlowError;

pub const DEFAULT_BASE_URL: &str = "https://www.encodeproject.org";
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(30);

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentMetadata {
    pub biosample_summary: String,
    pub target: Target,
    pub assay_term_name: String,
    pub biosample_ontology: BiosampleOntology,
    #[serde(default)]
    pub files: Vec<EncodeFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BiosampleOntology {
    pub classification: String,
    pub term_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncodeFile {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default)]
    pub no_file_available: Option<bool>,
    #[serde(default)]
    pub donors: Vec<String>,
    #[serde(default)]
    pub href: Option<String>,
}

pub trait EncodeClient: Send + Sync {
    fn fetch_experiment(&self, id: &ExperimentId) -> Result<ExperimentMetadata, FlowError>;

    /// Streams the file behind `href` into `destination`, calling
    /// `on_progress(downloaded, total)` as bytes arrive. Returns the byte count.
    fn download(
        &self,
        href: &str,
        destination: &mut dyn Write,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, FlowError>;
}

impl<C: EncodeClient + ?Sized> EncodeClient for &C {
    fn fetch_experiment(&self, id: &ExperimentId) -> Result<ExperimentMetadata, FlowError> {
        (**self).fetch_experiment(id)
    }

    fn download(
        &self,
        href: &str,
        destination: &mut dyn Write,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, FlowError> {
        (**self).download(href, destination, on_progress)
    }
}

#[derive(Clone)]
pub struct EncodeHttpClient {
    client: Client,
    base_url: String,
    metadata_timeout: Duration,
}

impl EncodeHttpClient {
    pub fn new() -> Result<Self, FlowError> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_METADATA_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, metadata_timeout: Duration) -> Result<Self, FlowError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("encode-flow/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FlowError::EncodeHttp(err.to_string()))?,
        );
        // Track downloads can run for a long time; only metadata requests carry
        // a timeout.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|err| FlowError::EncodeHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            metadata_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn experiment_url(&self, id: &ExperimentId) -> String {
        format!("{}/experiment/{}/?format=json", self.base_url, id.as_str())
    }

    pub fn content_url(&self, href: &str) -> String {
        format!("{}{}", self.base_url, href)
    }

    fn handle_status(response: Response) -> Result<Response, FlowError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ENCODE request failed".to_string());
        Err(FlowError::EncodeStatus { status, message })
    }
}

impl EncodeClient for EncodeHttpClient {
    fn fetch_experiment(&self, id: &ExperimentId) -> Result<ExperimentMetadata, FlowError> {
        let url = self.experiment_url(id);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.metadata_timeout)
            .send()
            .map_err(|err| FlowError::EncodeHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| FlowError::EncodeHttp(err.to_string()))?;
        parse_experiment(id, &body)
    }

    fn download(
        &self,
        href: &str,
        destination: &mut dyn Write,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, FlowError> {
        let url = self.content_url(href);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| FlowError::EncodeHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        let total = response.content_length();
        copy_with_progress(&mut response, destination, total, on_progress)
    }
}

pub fn parse_experiment(id: &ExperimentId, body: &str) -> Result<ExperimentMetadata, FlowError> {
    serde_json::from_str(body).map_err(|err| FlowError::MalformedMetadata {
        experiment: id.to_string(),
        message: err.to_string(),
    })
}

fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: Option<u64>,
    on_progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64, FlowError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(FlowError::Transfer(err)),
        };
        writer
            .write_all(&buf[..read])
            .map_err(|err| FlowError::Filesystem(err.to_string()))?;
        downloaded += read as u64;
        on_progress(downloaded, total);
    }
    if let Some(total) = total {
        if downloaded < total {
            return Err(FlowError::Transfer(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("received {downloaded} of {total} bytes"),
            )));
        }
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const EXPERIMENT_JSON: &str = r#"{
        "accession": "ENCSR000AKP",
        "biosample_summary": "Homo sapiens K562",
        "target": {"name": "CTCF-human", "label": "CTCF"},
        "assay_term_name": "ChIP-seq",
        "biosample_ontology": {"classification": "cell line", "term_name": "K562"},
        "files": [
            {"accession": "ENCFF001", "file_format": "bigWig", "status": "released",
             "assembly": "GRCh38", "output_type": "signal p-value",
             "no_file_available": false, "donors": ["/human-donors/ENCDO000AAD/"],
             "href": "/files/ENCFF001/@@download/ENCFF001.bigWig"},
            {"accession": "ENCFF002", "file_format": "fastq", "status": "released",
             "no_file_available": false}
        ]
    }"#;

    #[test]
    fn parse_experiment_document() {
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        let meta = parse_experiment(&id, EXPERIMENT_JSON).unwrap();
        assert_eq!(meta.target.name, "CTCF-human");
        assert_eq!(meta.biosample_ontology.term_name, "K562");
        assert_eq!(meta.files.len(), 2);
        assert_eq!(meta.files[1].assembly, None);
    }

    #[test]
    fn missing_target_is_malformed() {
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        let body = r#"{"biosample_summary": "x", "assay_term_name": "ChIP-seq",
            "biosample_ontology": {"classification": "c", "term_name": "t"}, "files": []}"#;
        let err = parse_experiment(&id, body).unwrap_err();
        assert_matches!(err, FlowError::MalformedMetadata { experiment, .. } if experiment == "ENCSR000AKP");
    }

    #[test]
    fn urls_join_base_and_paths() {
        let client =
            EncodeHttpClient::with_base_url("https://mirror.example/", DEFAULT_METADATA_TIMEOUT)
                .unwrap();
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        assert_eq!(
            client.experiment_url(&id),
            "https://mirror.example/experiment/ENCSR000AKP/?format=json"
        );
        assert_eq!(
            client.content_url("/files/ENCFF001/@@download/ENCFF001.bigWig"),
            "https://mirror.example/files/ENCFF001/@@download/ENCFF001.bigWig"
        );
    }

    #[test]
    fn copy_reports_progress_and_detects_truncation() {
        let data = vec![7u8; CHUNK_SIZE + 10];
        let mut out = Vec::new();
        let mut seen = Vec::new();
        let copied = copy_with_progress(
            &mut data.as_slice(),
            &mut out,
            Some(data.len() as u64),
            &mut |done, _| seen.push(done),
        )
        .unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(seen.last().copied(), Some(data.len() as u64));

        let mut out = Vec::new();
        let err = copy_with_progress(&mut data.as_slice(), &mut out, Some(1 << 20), &mut |_, _| {})
            .unwrap_err();
        assert!(err.is_transient());
    }
}

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{ExperimentId, GenomeAssembly, SignalType};
use crate::encode::{EncodeClient, EncodeFile, ExperimentMetadata};
use crate::error::FlowError;
use crate::manifest::{FileRecord, Manifest};

pub const TRACK_FORMAT: &str = "bigWig";
pub const RELEASED: &str = "released";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub signal_type: SignalType,
    pub assembly: GenomeAssembly,
}

impl FileFilter {
    pub fn new(signal_type: SignalType, assembly: GenomeAssembly) -> Self {
        Self {
            signal_type,
            assembly,
        }
    }

    pub fn accepts(&self, file: &EncodeFile) -> bool {
        file.file_format.as_deref() == Some(TRACK_FORMAT)
            && file.status.as_deref() == Some(RELEASED)
            && file.assembly.as_deref() == Some(self.assembly.as_str())
            && file.output_type.as_deref() == Some(self.signal_type.as_str())
            && file.no_file_available == Some(false)
    }
}

pub fn resolve_manifest<E: EncodeClient + ?Sized>(
    client: &E,
    experiments: &[ExperimentId],
    filter: FileFilter,
    sink: &dyn ProgressSink,
) -> Result<Manifest, FlowError> {
    let mut manifest = Manifest::new();
    for experiment in experiments {
        sink.event(ProgressEvent::message(format!("Parsing data from {experiment}.")));
        let metadata = client.fetch_experiment(experiment)?;
        let before = manifest.len();
        for record in experiment_records(experiment, &metadata, filter)? {
            let accession = record.accession.clone();
            if !manifest.push(record) {
                tracing::warn!("{experiment}: file {accession} already listed, skipping duplicate");
            }
        }
        tracing::debug!(
            "{experiment}: {} of {} files selected",
            manifest.len() - before,
            metadata.files.len()
        );
    }
    Ok(manifest)
}

pub fn experiment_records(
    experiment: &ExperimentId,
    metadata: &ExperimentMetadata,
    filter: FileFilter,
) -> Result<Vec<FileRecord>, FlowError> {
    metadata
        .files
        .iter()
        .filter(|file| filter.accepts(file))
        .map(|file| {
            let accession = required(experiment, file.accession.as_ref(), "accession")?;
            if !is_plain_accession(accession) {
                return Err(FlowError::MalformedMetadata {
                    experiment: experiment.to_string(),
                    message: format!("file accession {accession:?} is not a plain name"),
                });
            }
            let href = required(experiment, file.href.as_ref(), "href")?;
            Ok(FileRecord {
                experiment: experiment.to_string(),
                summary: metadata.biosample_summary.clone(),
                target: metadata.target.name.clone(),
                assay: metadata.assay_term_name.clone(),
                cell_classification: metadata.biosample_ontology.classification.clone(),
                term_name: metadata.biosample_ontology.term_name.clone(),
                accession: accession.clone(),
                donors: file.donors.clone(),
                signal: filter.signal_type.as_str().to_string(),
                link: href.clone(),
            })
        })
        .collect()
}

// becomes a file name under data/
fn is_plain_accession(accession: &str) -> bool {
    !accession.is_empty()
        && accession
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn required<'a>(
    experiment: &ExperimentId,
    value: Option<&'a String>,
    field: &str,
) -> Result<&'a String, FlowError> {
    value.ok_or_else(|| FlowError::MalformedMetadata {
        experiment: experiment.to_string(),
        message: format!("selected file is missing `{field}`"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{BiosampleOntology, Target};

    fn track(accession: &str) -> EncodeFile {
        EncodeFile {
            accession: Some(accession.to_string()),
            file_format: Some("bigWig".to_string()),
            status: Some("released".to_string()),
            assembly: Some("GRCh38".to_string()),
            output_type: Some("signal p-value".to_string()),
            no_file_available: Some(false),
            donors: vec!["/human-donors/ENCDO000AAD/".to_string()],
            href: Some(format!("/files/{accession}/@@download/{accession}.bigWig")),
        }
    }

    fn metadata(files: Vec<EncodeFile>) -> ExperimentMetadata {
        ExperimentMetadata {
            biosample_summary: "Homo sapiens K562".to_string(),
            target: Target {
                name: "CTCF-human".to_string(),
            },
            assay_term_name: "ChIP-seq".to_string(),
            biosample_ontology: BiosampleOntology {
                classification: "cell line".to_string(),
                term_name: "K562".to_string(),
            },
            files,
        }
    }

    #[test]
    fn filter_requires_all_five_conditions() {
        let filter = FileFilter::new(SignalType::PValue, GenomeAssembly::Grch38);
        assert!(filter.accepts(&track("ENCFF1")));

        let mut file = track("ENCFF1");
        file.file_format = Some("bigBed".to_string());
        assert!(!filter.accepts(&file));

        let mut file = track("ENCFF1");
        file.status = Some("archived".to_string());
        assert!(!filter.accepts(&file));

        let mut file = track("ENCFF1");
        file.assembly = Some("hg19".to_string());
        assert!(!filter.accepts(&file));

        let mut file = track("ENCFF1");
        file.output_type = Some("fold change over control".to_string());
        assert!(!filter.accepts(&file));

        let mut file = track("ENCFF1");
        file.no_file_available = Some(true);
        assert!(!filter.accepts(&file));

        let mut file = track("ENCFF1");
        file.no_file_available = None;
        assert!(!filter.accepts(&file));
    }

    #[test]
    fn records_inherit_experiment_fields_in_source_order() {
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        let mut rejected = track("ENCFF2");
        rejected.status = Some("revoked".to_string());
        let meta = metadata(vec![track("ENCFF3"), rejected, track("ENCFF1")]);
        let filter = FileFilter::new(SignalType::PValue, GenomeAssembly::Grch38);

        let records = experiment_records(&id, &meta, filter).unwrap();
        let accessions = records
            .iter()
            .map(|record| record.accession.as_str())
            .collect::<Vec<_>>();
        assert_eq!(accessions, vec!["ENCFF3", "ENCFF1"]);
        assert_eq!(records[0].experiment, "ENCSR000AKP");
        assert_eq!(records[0].target, "CTCF-human");
        assert_eq!(records[0].term_name, "K562");
        assert_eq!(records[0].signal, "signal p-value");
    }

    #[test]
    fn selected_file_without_href_is_malformed() {
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        let mut file = track("ENCFF1");
        file.href = None;
        let meta = metadata(vec![file]);
        let filter = FileFilter::new(SignalType::PValue, GenomeAssembly::Grch38);
        let err = experiment_records(&id, &meta, filter).unwrap_err();
        assert!(matches!(err, FlowError::MalformedMetadata { .. }));
    }

    #[test]
    fn accession_that_escapes_the_data_dir_is_malformed() {
        let id: ExperimentId = "ENCSR000AKP".parse().unwrap();
        let filter = FileFilter::new(SignalType::PValue, GenomeAssembly::Grch38);
        for accession in ["../ENCFF1", "ENCFF1/x", "..", ""] {
            let meta = metadata(vec![track(accession)]);
            let err = experiment_records(&id, &meta, filter).unwrap_err();
            assert!(matches!(err, FlowError::MalformedMetadata { .. }), "{accession}");
        }
    }
}

use std::collections::{HashMap, HashSet};
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::FlowError;

pub const HEADER: [&str; 10] = [
    "Experiment",
    "Summary",
    "Target",
    "Assay",
    "Cell classification",
    "Term_name",
    "File",
    "Donor",
    "Signal",
    "Link",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "Experiment")]
    pub experiment: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Assay")]
    pub assay: String,
    #[serde(rename = "Cell classification")]
    pub cell_classification: String,
    #[serde(rename = "Term_name")]
    pub term_name: String,
    #[serde(rename = "File")]
    pub accession: String,
    #[serde(rename = "Donor", with = "donor_list")]
    pub donors: Vec<String>,
    #[serde(rename = "Signal")]
    pub signal: String,
    #[serde(rename = "Link")]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    records: Vec<FileRecord>,
    accessions: HashSet<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FileRecord) -> bool {
        if !self.accessions.insert(record.accession.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, accession: &str) -> bool {
        self.accessions.contains(accession)
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), FlowError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FlowError::Filesystem(format!("create {parent}: {err}")))?;

        let tmp = NamedTempFile::new_in(parent.as_std_path())
            .map_err(|err| FlowError::Filesystem(err.to_string()))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer
                .write_record(HEADER)
                .map_err(|err| FlowError::Manifest(err.to_string()))?;
            for record in &self.records {
                writer
                    .serialize(record)
                    .map_err(|err| FlowError::Manifest(err.to_string()))?;
            }
            writer
                .flush()
                .map_err(|err| FlowError::Manifest(err.to_string()))?;
        }
        tmp.persist(path.as_std_path())
            .map_err(|err| FlowError::Filesystem(format!("write {path}: {}", err.error)))?;
        Ok(())
    }

    pub fn read(path: &Utf8Path) -> Result<Self, FlowError> {
        let mut reader = csv::Reader::from_path(path.as_std_path())
            .map_err(|err| FlowError::Manifest(format!("open {path}: {err}")))?;
        let mut manifest = Manifest::new();
        for row in reader.deserialize::<FileRecord>() {
            let record = row.map_err(|err| FlowError::Manifest(format!("{path}: {err}")))?;
            if !manifest.push(record) {
                tracing::warn!("{path}: duplicate file row ignored");
            }
        }
        Ok(manifest)
    }

    pub fn index(&self) -> ManifestIndex<'_> {
        ManifestIndex::new(self)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone)]
pub struct ManifestIndex<'a> {
    by_accession: HashMap<&'a str, &'a FileRecord>,
}

impl<'a> ManifestIndex<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        let mut by_accession = HashMap::with_capacity(manifest.len());
        for record in manifest {
            by_accession
                .entry(record.accession.as_str())
                .or_insert(record);
        }
        Self { by_accession }
    }

    pub fn get(&self, accession: &str) -> Option<&'a FileRecord> {
        self.by_accession.get(accession).copied()
    }

    pub fn term_name(&self, accession: &str) -> Option<&'a str> {
        self.get(accession).map(|record| record.term_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_accession.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_accession.is_empty()
    }
}

mod donor_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(donors: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&donors.join(";"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .split(';')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn record(experiment: &str, accession: &str, term_name: &str) -> FileRecord {
        FileRecord {
            experiment: experiment.to_string(),
            summary: "Homo sapiens K562".to_string(),
            target: "CTCF".to_string(),
            assay: "ChIP-seq".to_string(),
            cell_classification: "cell line".to_string(),
            term_name: term_name.to_string(),
            accession: accession.to_string(),
            donors: vec!["/human-donors/ENCDO000AAD/".to_string()],
            signal: "signal p-value".to_string(),
            link: format!("/files/{accession}/@@download/{accession}.bigWig"),
        }
    }

    #[test]
    fn push_skips_duplicate_accessions() {
        let mut manifest = Manifest::new();
        assert!(manifest.push(record("ENCSR1", "ENCFF1", "K562")));
        assert!(!manifest.push(record("ENCSR2", "ENCFF1", "HepG2")));
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.records()[0].experiment, "ENCSR1");
    }

    #[test]
    fn header_written_for_empty_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("sample_sheet.csv")).unwrap();
        Manifest::new().write(&path).unwrap();
        let content = fs::read_to_string(path.as_std_path()).unwrap();
        assert_eq!(
            content.trim_end(),
            "Experiment,Summary,Target,Assay,Cell classification,Term_name,File,Donor,Signal,Link"
        );
        assert!(Manifest::read(&path).unwrap().is_empty());
    }

    #[test]
    fn donors_are_joined_in_one_cell() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("sample_sheet.csv")).unwrap();
        let mut manifest = Manifest::new();
        let mut rec = record("ENCSR1", "ENCFF1", "K562");
        rec.donors = vec!["/human-donors/A/".to_string(), "/human-donors/B/".to_string()];
        manifest.push(rec);
        manifest.write(&path).unwrap();

        let content = fs::read_to_string(path.as_std_path()).unwrap();
        assert!(content.contains("/human-donors/A/;/human-donors/B/"));
        let loaded = Manifest::read(&path).unwrap();
        assert_eq!(loaded.records()[0].donors.len(), 2);
    }

    #[test]
    fn index_resolves_term_names() {
        let mut manifest = Manifest::new();
        manifest.push(record("ENCSR1", "ENCFF1", "K562"));
        manifest.push(record("ENCSR2", "ENCFF2", "HepG2"));
        let index = manifest.index();
        assert_eq!(index.term_name("ENCFF2"), Some("HepG2"));
        assert_eq!(index.term_name("ENCFF9"), None);
    }

    #[test]
    fn read_rejects_missing_columns() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("sample_sheet.csv")).unwrap();
        fs::write(path.as_std_path(), "Experiment,File\nENCSR1,ENCFF1\n").unwrap();
        let err = Manifest::read(&path).unwrap_err();
        assert!(matches!(err, FlowError::Manifest(_)));
    }

    #[test]
    fn read_sheet_tracks_accessions() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("sample_sheet.csv")).unwrap();
        let mut manifest = Manifest::new();
        manifest.push(record("ENCSR1", "ENCFF1", "K562"));
        manifest.push(record("ENCSR1", "ENCFF2", "K562"));
        manifest.write(&path).unwrap();

        let mut loaded = Manifest::read(&path).unwrap();
        assert!(loaded.contains("ENCFF2"));
        assert!(!loaded.contains("ENCFF3"));
        assert!(!loaded.push(record("ENCSR2", "ENCFF1", "HepG2")));
        assert!(loaded.push(record("ENCSR2", "ENCFF3", "HepG2")));
        assert_eq!(loaded.len(), 3);
    }
}

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FlowError;

pub const SAMPLE_SHEET_FILE: &str = "sample_sheet.csv";
pub const DATA_DIR: &str = "data";
pub const TRACK_EXTENSION: &str = "bigWig";

#[derive(Debug, Clone)]
pub struct ContentLayout {
    root: Utf8PathBuf,
}

impl ContentLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn data_dir(&self) -> Utf8PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn sample_sheet_path(&self) -> Utf8PathBuf {
        self.root.join(SAMPLE_SHEET_FILE)
    }

    pub fn track_path(&self, accession: &str) -> Utf8PathBuf {
        self.data_dir().join(format!("{accession}.{TRACK_EXTENSION}"))
    }

    pub fn ensure_data_dir(&self) -> Result<bool, FlowError> {
        let created = !self.root.as_std_path().exists();
        fs::create_dir_all(self.data_dir().as_std_path())
            .map_err(|err| FlowError::Filesystem(format!("create {}: {err}", self.data_dir())))?;
        Ok(created)
    }

    pub fn list_tracks(&self) -> Result<Vec<Utf8PathBuf>, FlowError> {
        let data_dir = self.data_dir();
        let entries = match fs::read_dir(data_dir.as_std_path()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(FlowError::Filesystem(format!("read {data_dir}: {err}")));
            }
        };

        let mut tracks = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|err| FlowError::Filesystem(format!("read {data_dir}: {err}")))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_track = path
                .extension()
                .and_then(|value| value.to_str())
                .map(|value| value == TRACK_EXTENSION)
                .unwrap_or(false);
            if !is_track {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(path).map_err(|path| {
                FlowError::Filesystem(format!("non-utf8 path: {}", path.display()))
            })?;
            tracks.push(path);
        }
        tracks.sort();
        Ok(tracks)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisLayout {
    root: Utf8PathBuf,
}

impl AnalysisLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn matrix_path(&self) -> Utf8PathBuf {
        self.root.join("matrix")
    }

    pub fn heatmap_path(&self) -> Utf8PathBuf {
        self.root.join("heatmap.png")
    }

    pub fn summary_npz_path(&self) -> Utf8PathBuf {
        self.root.join("summary.npz")
    }

    pub fn summary_tsv_path(&self) -> Utf8PathBuf {
        self.root.join("summary.tsv")
    }

    pub fn pca_path(&self) -> Utf8PathBuf {
        self.root.join("pca.png")
    }

    pub fn ensure_root(&self) -> Result<bool, FlowError> {
        if self.root.as_std_path().exists() {
            return Ok(false);
        }
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| FlowError::Filesystem(format!("create {}: {err}", self.root)))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_temp() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    #[test]
    fn content_paths() {
        let layout = ContentLayout::new("/runs/k562");
        assert_eq!(layout.sample_sheet_path(), "/runs/k562/sample_sheet.csv");
        assert_eq!(
            layout.track_path("ENCFF001ABC"),
            "/runs/k562/data/ENCFF001ABC.bigWig"
        );
    }

    #[test]
    fn list_tracks_filters_by_extension() {
        let (_temp, root) = utf8_temp();
        let layout = ContentLayout::new(root);
        layout.ensure_data_dir().unwrap();
        let data = layout.data_dir();
        fs::write(data.join("ENCFF002.bigWig"), b"b").unwrap();
        fs::write(data.join("ENCFF001.bigWig"), b"a").unwrap();
        fs::write(data.join("notes.txt"), b"x").unwrap();
        fs::write(data.join("ENCFF003.bigwig"), b"x").unwrap();

        let tracks = layout.list_tracks().unwrap();
        let names = tracks
            .iter()
            .map(|path| path.file_name().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["ENCFF001.bigWig", "ENCFF002.bigWig"]);
    }

    #[test]
    fn list_tracks_without_data_dir_is_empty() {
        let (_temp, root) = utf8_temp();
        let layout = ContentLayout::new(root);
        assert!(layout.list_tracks().unwrap().is_empty());
    }

    #[test]
    fn ensure_root_reports_creation() {
        let (_temp, root) = utf8_temp();
        let layout = AnalysisLayout::new(root.join("out"));
        assert!(layout.ensure_root().unwrap());
        assert!(!layout.ensure_root().unwrap());
    }

    #[test]
    fn unreadable_data_dir_is_a_filesystem_error() {
        let (_temp, root) = utf8_temp();
        fs::write(root.join("data"), b"not a directory").unwrap();
        let layout = ContentLayout::new(root);
        let err = layout.list_tracks().unwrap_err();
        assert!(matches!(err, FlowError::Filesystem(_)));
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    #[default]
    #[serde(rename = "signal p-value")]
    PValue,
    #[serde(rename = "fold change over control")]
    FoldChange,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::PValue => "signal p-value",
            SignalType::FoldChange => "fold change over control",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signal p-value" => Ok(SignalType::PValue),
            "fold change over control" => Ok(SignalType::FoldChange),
            _ => Err(FlowError::WrongSignalType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenomeAssembly {
    #[default]
    #[serde(rename = "GRCh38")]
    Grch38,
    #[serde(rename = "hg19")]
    Hg19,
}

impl GenomeAssembly {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenomeAssembly::Grch38 => "GRCh38",
            GenomeAssembly::Hg19 => "hg19",
        }
    }
}

impl fmt::Display for GenomeAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenomeAssembly {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GRCh38" => Ok(GenomeAssembly::Grch38),
            "hg19" => Ok(GenomeAssembly::Hg19),
            _ => Err(FlowError::WrongGenomeAssembly(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentId(String);

impl ExperimentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExperimentId {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // ends up as a URL path segment
        let is_valid = !trimmed.is_empty()
            && !trimmed
                .chars()
                .any(|ch| ch == '/' || ch == '?' || ch == '#' || ch.is_whitespace());
        if !is_valid {
            return Err(FlowError::InvalidExperimentId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

pub fn accession_from_path(path: &std::path::Path) -> String {
    file_stem_to_first_dot(path)
}

pub fn region_label(path: &std::path::Path) -> String {
    file_stem_to_first_dot(path)
}

fn file_stem_to_first_dot(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(|head| head.to_string()))
        .unwrap_or_default()
}

//! Two pipelines over ENCODE signal tracks.
//!
//! `integrate` turns experiment accessions into a sample sheet
//! (`sample_sheet.csv`) and downloads every qualifying bigWig into `data/`.
//! `analyze` checks those inputs and drives the deepTools command-line tools
//! (`computeMatrix`, `plotHeatmap`, `multiBigwigSummary`, `plotPCA`) over them.

pub mod analysis;
pub mod app;
pub mod config;
pub mod domain;
pub mod download;
pub mod encode;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod output;
pub mod resolver;
pub mod retry;
pub mod tools;
pub mod validate;

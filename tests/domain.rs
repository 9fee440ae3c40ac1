use std::path::Path;

use assert_matches::assert_matches;

use encode_flow::domain::{
    ExperimentId, GenomeAssembly, SignalType, accession_from_path, region_label,
};
use encode_flow::error::FlowError;

#[test]
fn parse_signal_types() {
    let p_value: SignalType = "signal p-value".parse().unwrap();
    assert_eq!(p_value, SignalType::PValue);
    let fold: SignalType = "fold change over control".parse().unwrap();
    assert_eq!(fold, SignalType::FoldChange);
    assert_eq!(fold.to_string(), "fold change over control");
}

#[test]
fn signal_type_is_case_sensitive() {
    let err = "Signal P-Value".parse::<SignalType>().unwrap_err();
    assert_matches!(err, FlowError::WrongSignalType(value) if value == "Signal P-Value");
}

#[test]
fn parse_assemblies() {
    assert_eq!("GRCh38".parse::<GenomeAssembly>().unwrap(), GenomeAssembly::Grch38);
    assert_eq!("hg19".parse::<GenomeAssembly>().unwrap(), GenomeAssembly::Hg19);
    let err = "hg38".parse::<GenomeAssembly>().unwrap_err();
    assert_matches!(err, FlowError::WrongGenomeAssembly(_));
}

#[test]
fn defaults_match_the_command_line() {
    assert_eq!(SignalType::default().as_str(), "signal p-value");
    assert_eq!(GenomeAssembly::default().as_str(), "GRCh38");
}

#[test]
fn parse_experiment_id() {
    let id: ExperimentId = " ENCSR000AKP ".parse().unwrap();
    assert_eq!(id.as_str(), "ENCSR000AKP");
}

#[test]
fn parse_experiment_id_invalid() {
    for raw in ["", "   ", "ENCSR/000", "ENCSR?x=1", "ENC SR"] {
        let err = raw.parse::<ExperimentId>().unwrap_err();
        assert_matches!(err, FlowError::InvalidExperimentId(_));
    }
}

#[test]
fn labels_stop_at_the_first_dot() {
    assert_eq!(
        accession_from_path(Path::new("out/data/ENCFF001ABC.bigWig")),
        "ENCFF001ABC"
    );
    assert_eq!(region_label(Path::new("/regions/cpg.islands.bed")), "cpg");
    assert_eq!(region_label(Path::new("promoters")), "promoters");
}

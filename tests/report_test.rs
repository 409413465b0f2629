//! Report recipes up to the point where drawing starts

use std::fs;
use std::path::Path;

use abcd_plot::report::{self, ProposalRequest, ReportConfig};
use abcd_plot::Error;

fn write_generation(dir: &Path, name: &str) {
    fs::write(
        dir.join(name),
        r#"{"pop": {"acceptance": 0.3, "normalised_particles": [
            {"parameters": {"alpha": 0.2, "beta": 0.7}, "score": 0.4},
            {"parameters": {"alpha": 0.6, "beta": 0.1}, "score": 0.9}
        ]}, "next_gen_tolerance": 0.75}"#,
    )
    .unwrap();
}

fn config(data: &Path, out: &Path) -> ReportConfig {
    ReportConfig::builder()
        .data_dir(data)
        .output_dir(out)
        .skip_isolation_check(true)
        .build()
        .unwrap()
}

#[test]
fn test_summary_report_loads_tables() {
    let data = tempfile::tempdir().unwrap();
    write_generation(data.path(), "gen_1.json");
    write_generation(data.path(), "gen_2.json");

    let run = report::summary(&config(data.path(), data.path())).unwrap();
    assert_eq!(run.particles.num_rows(), 4);
    assert_eq!(run.summary.generations(), vec![1, 2]);
}

#[test]
fn test_posterior_on_empty_run_is_file_not_found() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = report::posterior(&config(data.path(), out.path())).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_generations_report_needs_parameter_column() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_generation(data.path(), "gen_1.json");

    let err = report::generations(&config(data.path(), out.path()), "heads").unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(name) if name == "heads"));
    // Figures are prepared before anything is drawn
    assert!(!out.path().join("plot_0.png").exists());
}

#[test]
fn test_proposal_rejects_unknown_parameters() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_generation(data.path(), "gen_4.json");

    let request = ProposalRequest {
        x: "x".to_string(),
        y: "y".to_string(),
        ..ProposalRequest::default()
    };
    let err = report::proposal(&config(data.path(), out.path()), &request).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(name) if name == "x"));
}

#[test]
fn test_proposal_reports_missing_sample_file() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_generation(data.path(), "gen_4.json");

    let request = ProposalRequest {
        samples: vec![data.path().join("samples/samples_1.json")],
        ..ProposalRequest::default()
    };
    let err = report::proposal(&config(data.path(), out.path()), &request).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_explicit_particles_file_need_not_be_numbered() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_generation(data.path(), "particles.json");

    let request = ProposalRequest {
        particles: Some(data.path().join("particles.json")),
        samples: vec![data.path().join("missing.json")],
        ..ProposalRequest::default()
    };
    // Particles load fine; the missing sample document is the first failure
    let err = report::proposal(&config(data.path(), out.path()), &request).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(path) if path.ends_with("missing.json")));
}

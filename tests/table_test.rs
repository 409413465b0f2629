//! Particle and summary table construction

use abcd_plot::record::GenerationRecord;
use abcd_plot::table::{
    build_fragments, log_tolerance, ParticleTable, SchemaPolicy, SummaryTable, GENERATION_COLUMN,
    SCORE_COLUMN,
};
use abcd_plot::Error;

fn record(particles: &str, acceptance: f64, tolerance: f64) -> GenerationRecord {
    let json = format!(
        r#"{{"pop": {{"acceptance": {acceptance}, "normalised_particles": [{particles}]}},
            "next_gen_tolerance": {tolerance}, "number": 99}}"#
    );
    GenerationRecord::from_json_str(&json, "fixture.json").unwrap()
}

const XY_PARTICLES: &str = r#"
    {"parameters": {"x": 1.0, "y": 2.0}, "score": 0.1, "weight": 0.3},
    {"parameters": {"x": 3.0, "y": 4.0}, "score": 0.2, "weight": 0.3},
    {"parameters": {"x": 5.0, "y": 6.0}, "score": 0.3, "weight": 0.4}
"#;

#[test]
fn test_three_particles_one_generation() {
    let (particles, summary) =
        build_fragments(&record(XY_PARTICLES, 0.5, 0.2), 2, SchemaPolicy::Union).unwrap();

    assert_eq!(particles.num_rows(), 3);
    let names: Vec<String> = particles
        .batch()
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec!["x", "y", SCORE_COLUMN, GENERATION_COLUMN]);
    assert!(particles.generation_numbers().iter().all(|&g| g == 2));
    assert_eq!(particles.scores(), vec![0.1, 0.2, 0.3]);

    assert_eq!(summary.num_rows(), 1);
    assert_eq!(summary.generations(), vec![2]);
    assert_eq!(summary.acceptance(), vec![0.5]);
}

#[test]
fn test_number_field_in_body_is_ignored() {
    let (particles, _) =
        build_fragments(&record(XY_PARTICLES, 0.5, 0.2), 4, SchemaPolicy::Union).unwrap();
    assert_eq!(particles.generations(), vec![4]);
}

#[test]
fn test_log_tolerance_clamps_at_half() {
    assert!((log_tolerance(0.2) - 1.2_f64.ln()).abs() < 1e-12);
    assert!((log_tolerance(10.0) - 1.5_f64.ln()).abs() < 1e-12);
    assert!((log_tolerance(0.5) - log_tolerance(1e9)).abs() < f64::EPSILON);
    assert!(log_tolerance(0.0).abs() < f64::EPSILON);

    let summary = SummaryTable::from_record(&record(XY_PARTICLES, 0.5, 10.0), 1).unwrap();
    assert_eq!(summary.tolerance(), vec![10.0]);
    assert!((summary.log_tolerance()[0] - 0.405_465).abs() < 1e-6);
}

#[test]
fn test_union_policy_pads_missing_keys() {
    let mixed = r#"
        {"parameters": {"a": 1.0}, "score": 0.1},
        {"parameters": {"a": 2.0, "b": 7.0}, "score": 0.2}
    "#;
    let table = ParticleTable::from_record(&record(mixed, 0.1, 1.0), 1, SchemaPolicy::Union).unwrap();
    assert_eq!(table.parameter_names(), ["a".to_string(), "b".to_string()]);
    assert_eq!(table.column_values("b").unwrap(), vec![None, Some(7.0)]);
}

#[test]
fn test_exact_policy_rejects_differing_keys() {
    let mixed = r#"
        {"parameters": {"a": 1.0}, "score": 0.1},
        {"parameters": {"b": 2.0}, "score": 0.2}
    "#;
    let err = ParticleTable::from_record(&record(mixed, 0.1, 1.0), 3, SchemaPolicy::Exact).unwrap_err();
    match err {
        Error::SchemaMismatch { generation, expected, found } => {
            assert_eq!(generation, 3);
            assert_eq!(expected, vec!["a".to_string()]);
            assert_eq!(found, vec!["b".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {other}"),
    }
}

#[test]
fn test_concat_keeps_fragment_order() {
    let fragments = [1, 3, 2].map(|g| {
        ParticleTable::from_record(&record(XY_PARTICLES, 0.5, 0.2), g, SchemaPolicy::Union).unwrap()
    });
    let table = ParticleTable::concat(fragments, SchemaPolicy::Union).unwrap();
    assert_eq!(table.num_rows(), 9);
    assert_eq!(table.generations(), vec![1, 3, 2]);
    assert_eq!(table.latest_generation(), Some(3));
}

#[test]
fn test_concat_unions_across_generations() {
    let first = ParticleTable::from_record(
        &record(r#"{"parameters": {"a": 1.0}, "score": 0.1}"#, 0.5, 1.0),
        1,
        SchemaPolicy::Union,
    )
    .unwrap();
    let second = ParticleTable::from_record(
        &record(r#"{"parameters": {"b": 2.0}, "score": 0.2}"#, 0.5, 1.0),
        2,
        SchemaPolicy::Union,
    )
    .unwrap();

    let union = ParticleTable::concat([first.clone(), second.clone()], SchemaPolicy::Union).unwrap();
    assert_eq!(union.parameter_names(), ["a".to_string(), "b".to_string()]);
    assert_eq!(union.column_values("a").unwrap(), vec![Some(1.0), None]);

    assert!(matches!(
        ParticleTable::concat([first, second], SchemaPolicy::Exact),
        Err(Error::SchemaMismatch { generation: 2, .. })
    ));
}

#[test]
fn test_reserved_parameter_name_rejected() {
    let clash = r#"{"parameters": {"score": 1.0}, "score": 0.1}"#;
    let err = ParticleTable::from_record(&record(clash, 0.5, 1.0), 1, SchemaPolicy::Union).unwrap_err();
    assert!(matches!(err, Error::ReservedColumn(name) if name == "score"));
}

#[test]
fn test_out_of_range_values_are_malformed() {
    let json = r#"{"pop": {"acceptance": 1.5, "normalised_particles": []}, "next_gen_tolerance": 1.0}"#;
    assert!(matches!(
        GenerationRecord::from_json_str(json, "bad.json"),
        Err(Error::MalformedInput { .. })
    ));
    let json = r#"{"pop": {"acceptance": 0.5, "normalised_particles": []}, "next_gen_tolerance": -1.0}"#;
    assert!(matches!(
        GenerationRecord::from_json_str(json, "bad.json"),
        Err(Error::MalformedInput { .. })
    ));
}

#[test]
fn test_statistic_melts_summary() {
    let fragments = [(1, 0.4, 3.0), (2, 0.2, 1.0)]
        .map(|(g, acc, tol)| SummaryTable::from_record(&record(XY_PARTICLES, acc, tol), g).unwrap());
    let summary = SummaryTable::concat(fragments).unwrap();
    assert_eq!(
        summary.statistic(SummaryTable::ACCEPTANCE).unwrap(),
        vec![(1, 0.4), (2, 0.2)]
    );
    assert!(matches!(
        summary.statistic("weight"),
        Err(Error::UnknownColumn(_))
    ));
}

#[test]
fn test_values_by_generation_groups_rows() {
    let fragments = [1, 2].map(|g| {
        ParticleTable::from_record(&record(XY_PARTICLES, 0.5, 0.2), g, SchemaPolicy::Union).unwrap()
    });
    let table = ParticleTable::concat(fragments, SchemaPolicy::Union).unwrap();
    let groups = table.values_by_generation("x").unwrap();
    assert_eq!(groups, vec![(1, vec![1.0, 3.0, 5.0]), (2, vec![1.0, 3.0, 5.0])]);

    let latest = table.filter_generation(2).unwrap();
    assert_eq!(latest.num_rows(), 3);
    assert_eq!(latest.generations(), vec![2]);
}

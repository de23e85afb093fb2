mod common;

use common::{TestWorkspace, generated, load_fixture};
use serde_json::json;
use terminal_insights::{
    data::Dataset,
    io_utils::{self, LoadOptions},
    schema::{FieldType, SAMPLE_ROWS, classify},
};

#[test]
fn shipment_fixture_columns_are_classified() {
    let response = load_fixture("shipments.json");
    let classification = classify(&response.dataset);

    assert_eq!(
        classification.columns,
        vec![
            "shipment_id",
            "lane",
            "gate_in_time",
            "gate_out_time",
            "weight_kg",
            "carrier"
        ]
    );
    assert_eq!(classification.field_type("shipment_id"), Some(FieldType::Nominal));
    assert_eq!(classification.field_type("lane"), Some(FieldType::Ordinal));
    assert_eq!(classification.field_type("gate_in_time"), Some(FieldType::Temporal));
    assert_eq!(classification.field_type("gate_out_time"), Some(FieldType::Temporal));
    assert_eq!(classification.field_type("weight_kg"), Some(FieldType::Quantitative));
    assert_eq!(classification.grouped.temporal, vec!["gate_in_time", "gate_out_time"]);
}

#[test]
fn csv_numbers_arrive_as_text_and_still_classify() {
    let response = load_fixture("carriers.csv");
    let classification = classify(&response.dataset);
    assert_eq!(classification.field_type("teu"), Some(FieldType::Quantitative));
    assert_eq!(classification.field_type("carrier"), Some(FieldType::Nominal));
    assert_eq!(classification.field_type("region"), Some(FieldType::Ordinal));

    let teu = classification.stats("teu").unwrap().numeric.unwrap();
    assert_eq!(teu.min, 100.0);
    // Only the leading rows are sampled.
    assert_eq!(teu.max, 100.0 + 15.0 * (SAMPLE_ROWS as f64 - 1.0));
}

#[test]
fn semicolon_file_with_latin1_text() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("quays.txt");
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode("quay;depth\nAlgeciras Sur;16.5\nGénova;15\n");
    std::fs::write(&path, bytes).unwrap();

    let options = LoadOptions {
        delimiter: Some(b';'),
        encoding: Some("windows-1252".to_string()),
    };
    let response = io_utils::load_payload(&path, &options).expect("load delimited");
    assert_eq!(response.dataset.records()[1]["quay"], "Génova");
    let classification = classify(&response.dataset);
    assert_eq!(classification.field_type("depth"), Some(FieldType::Quantitative));
}

#[test]
fn generated_shipments_have_expected_types() {
    let classification = classify(&generated(60, 5));
    assert_eq!(classification.field_type("weight_kg"), Some(FieldType::Quantitative));
    assert_eq!(classification.field_type("gate_in_time"), Some(FieldType::Temporal));
    assert_eq!(classification.field_type("gate_out_time"), Some(FieldType::Temporal));
    assert_eq!(classification.field_type("shipment_id"), Some(FieldType::Nominal));
}

#[test]
fn later_record_keys_are_not_discovered() {
    let dataset = Dataset::from_json(json!([
        {"lane": "A"},
        {"lane": "B", "late_column": 4}
    ]))
    .unwrap();
    let classification = classify(&dataset);
    assert_eq!(classification.columns, vec!["lane"]);
    assert!(classification.field_type("late_column").is_none());
}

#[test]
fn classification_serializes_grouped_fields() {
    let response = load_fixture("shipments.json");
    let value = serde_json::to_value(classify(&response.dataset)).unwrap();
    assert_eq!(value["types"]["weight_kg"], "quantitative");
    assert_eq!(value["grouped"]["temporal"][1], "gate_out_time");
}

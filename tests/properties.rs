use proptest::prelude::*;
use serde_json::{Map, Value};
use terminal_insights::{
    advisor::suggest_chart_type,
    chart::{ChartRequest, build_spec},
    config::Thresholds,
    data::Dataset,
    explore::validate,
    schema::classify,
    traffic::{analyze, congestion_level},
};

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-zA-Z0-9 :/-]{0,12}".prop_map(Value::String),
        (2000i32..2030, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| Value::String(format!("{y:04}-{m:02}-{d:02}"))),
    ]
}

fn records() -> impl Strategy<Value = Vec<Map<String, Value>>> {
    let keys = prop::collection::vec("[a-z_]{1,8}", 0..6);
    keys.prop_flat_map(|keys| {
        let row = prop::collection::vec(json_leaf(), keys.len()).prop_map(move |values| {
            keys.iter().cloned().zip(values).collect::<Map<String, Value>>()
        });
        prop::collection::vec(row, 0..25)
    })
}

proptest! {
    #[test]
    fn classification_covers_every_first_record_column(rows in records()) {
        let dataset = Dataset::new(rows);
        let classification = classify(&dataset);
        let expected = dataset.columns();
        prop_assert_eq!(classification.types.len(), expected.len());
        for column in &expected {
            prop_assert!(classification.field_type(column).is_some());
        }
        let grouped = &classification.grouped;
        prop_assert_eq!(
            grouped.quantitative.len() + grouped.nominal.len() + grouped.temporal.len() + grouped.ordinal.len(),
            expected.len()
        );
    }

    #[test]
    fn downstream_stages_never_panic(rows in records()) {
        let dataset = Dataset::new(rows);
        let chart_type = suggest_chart_type(&classify(&dataset)).chart_type;
        let spec = build_spec(&dataset, &ChartRequest::new(chart_type));
        prop_assert_eq!(spec.is_placeholder(), dataset.is_empty() || dataset.columns().is_empty());
        let analysis = analyze(&dataset);
        prop_assert_eq!(analysis.kpis.total_records, dataset.len());
        prop_assert!(analysis.kpis.on_time_percentage >= 0.0 && analysis.kpis.on_time_percentage <= 100.0);
        let raw = serde_json::to_value(&dataset).unwrap();
        let _ = validate(&raw);
    }

    #[test]
    fn congestion_level_is_monotone(a in 0usize..40, b in 0usize..40) {
        let thresholds = Thresholds::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(congestion_level(low, &thresholds) <= congestion_level(high, &thresholds));
    }
}

mod common;

use common::load_fixture;
use serde_json::json;
use terminal_insights::{
    advisor::{ChartType, suggest_chart_type, suggest_fields},
    chart::{Aggregate, ChartRequest, Mark, build_spec},
    data::Dataset,
    schema::classify,
};

#[test]
fn shipments_suggest_a_time_series() {
    let response = load_fixture("shipments.json");
    let classification = classify(&response.dataset);
    let fields = suggest_fields(&classification);
    assert_eq!(fields.x_field.as_deref(), Some("gate_in_time"));
    assert_eq!(fields.y_field.as_deref(), Some("weight_kg"));
    assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Line);
}

#[test]
fn carriers_suggest_a_bar_chart_over_the_nominal_field() {
    let response = load_fixture("carriers.csv");
    let classification = classify(&response.dataset);
    let fields = suggest_fields(&classification);
    assert_eq!(fields.x_field.as_deref(), Some("carrier"));
    assert_eq!(fields.y_field.as_deref(), Some("teu"));
    assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Bar);
}

#[test]
fn bar_spec_sums_measure_and_hides_busy_legend() {
    let response = load_fixture("carriers.csv");
    let spec = build_spec(&response.dataset, &ChartRequest::new(ChartType::Bar));
    assert_eq!(spec.mark, Mark::Bar);
    let y = spec.encoding.y.as_ref().unwrap();
    assert_eq!(y.field, "teu");
    assert_eq!(y.aggregate, Some(Aggregate::Sum));
    let color = spec.encoding.color.as_ref().unwrap();
    assert_eq!(color.field, "carrier");
    assert_eq!(color.legend, Some(false), "twelve carriers exceed the legend limit");
    assert_eq!(spec.title, "Teu by Carrier");
    assert_eq!(spec.data.len(), 12);
}

#[test]
fn query_echo_becomes_the_title() {
    let response = load_fixture("shipments.json");
    let query = response.sql_query.clone().expect("fixture carries a query");
    let spec = build_spec(
        &response.dataset,
        &ChartRequest::new(ChartType::Line).with_query(&query),
    );
    assert_eq!(spec.mark, Mark::Line);
    assert_eq!(spec.title, format!("{}...", &query[..50]));
    assert_eq!(spec.style.stroke_width, Some(2.0));
    assert!(spec.style.point);
}

#[test]
fn question_wins_over_query() {
    let response = load_fixture("shipments.json");
    let request = ChartRequest::new(ChartType::Scatter)
        .with_fields("weight_kg", "weight_kg")
        .with_question("How heavy are today's trucks?")
        .with_query("SELECT 1");
    let spec = build_spec(&response.dataset, &request);
    assert_eq!(spec.title, "How heavy are today's trucks?");
    assert_eq!(spec.mark, Mark::Point);
    // First categorical column that is not on an axis.
    assert_eq!(spec.encoding.color.as_ref().unwrap().field, "shipment_id");
}

#[test]
fn pie_spec_counts_categories() {
    let dataset = Dataset::from_json(json!([
        {"status": "COMPLETED"},
        {"status": "DELAYED"},
        {"status": "COMPLETED"}
    ]))
    .unwrap();
    let classification = classify(&dataset);
    assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Pie);

    let spec = build_spec(&dataset, &ChartRequest::new(ChartType::Pie));
    let value = serde_json::to_value(&spec).unwrap();
    assert_eq!(value["mark"], "arc");
    assert_eq!(value["encoding"]["theta"]["aggregate"], "count");
    assert_eq!(value["encoding"]["color"]["field"], "status");
    assert_eq!(value["title"], "Status");
}

#[test]
fn unusable_inputs_give_text_placeholders() {
    let empty = build_spec(&Dataset::default(), &ChartRequest::new(ChartType::Bar));
    assert!(empty.is_placeholder());
    assert!(empty.data.is_empty());

    let response = load_fixture("shipments.json");
    let missing = build_spec(
        &response.dataset,
        &ChartRequest::new(ChartType::Bar).with_fields("berth", "weight_kg"),
    );
    assert!(missing.is_placeholder());
    assert_eq!(missing.style.text.as_deref(), Some("Field 'berth' not found"));
}

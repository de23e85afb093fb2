//! Seeded shipment generator used when no live data source answers.

use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::{
    cli::GenerateArgs,
    data::{Dataset, Record},
    io_utils,
};

const LANES: &[&str] = &["Lane 1", "Lane 2", "Lane 3", "Lane 4", "Lane 5", "Lane 6"];
// Relative traffic per lane; the first lanes carry most of the load.
const LANE_WEIGHTS: &[u32] = &[30, 24, 18, 12, 10, 6];
const CARRIERS: &[&str] = &[
    "Maersk",
    "MSC",
    "CMA CGM",
    "Hapag-Lloyd",
    "Evergreen",
    "ONE",
];
/// Gate-in times spread over this many minutes before the base time.
const WINDOW_MINUTES: i64 = 8 * 60;
pub const MIN_TURNAROUND_MINUTES: i64 = 20;
pub const MAX_TURNAROUND_MINUTES: i64 = 240;

pub fn execute(args: &GenerateArgs) -> Result<()> {
    let base_time = args.base_time.unwrap_or_else(Utc::now);
    let dataset = generate(args.rows, args.seed, base_time);
    io_utils::write_json(args.output.as_deref(), &dataset)?;
    info!(
        "Generated {} shipment record(s) with seed {}",
        dataset.len(),
        args.seed
    );
    Ok(())
}

/// Builds `rows` shipment records whose gate-in times fall in the eight hours
/// before `base_time`. Equal seeds and base times give equal datasets.
pub fn generate(rows: usize, seed: u64, base_time: DateTime<Utc>) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows).map(|index| shipment(&mut rng, index, base_time)).collect()
}

fn shipment(rng: &mut StdRng, index: usize, base_time: DateTime<Utc>) -> Record {
    let gate_in = base_time - Duration::minutes(rng.gen_range(0..=WINDOW_MINUTES));
    let turnaround = turnaround_minutes(rng);
    let gate_out = gate_in + Duration::minutes(turnaround);
    let status = if turnaround > 90 { "DELAYED" } else { "COMPLETED" };

    let fields: [(&str, Value); 8] = [
        ("shipment_id", json!(format!("SHP-{:05}", index + 1))),
        ("truck_id", json!(format!("TRK-{:03}", rng.gen_range(1..=400)))),
        ("lane", json!(pick_lane(rng))),
        ("gate_in_time", json!(timestamp(gate_in))),
        ("gate_out_time", json!(timestamp(gate_out))),
        ("status", json!(status)),
        ("weight_kg", json!(rng.gen_range(2_000..=30_000))),
        ("carrier", json!(CARRIERS[rng.gen_range(0..CARRIERS.len())])),
    ];
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

// Most visits are quick; roughly one in six runs long enough to be flagged.
fn turnaround_minutes(rng: &mut StdRng) -> i64 {
    match rng.gen_range(0..100) {
        0..=83 => rng.gen_range(MIN_TURNAROUND_MINUTES..=90),
        84..=94 => rng.gen_range(91..180),
        _ => rng.gen_range(180..=MAX_TURNAROUND_MINUTES),
    }
}

fn pick_lane(rng: &mut StdRng) -> &'static str {
    let total: u32 = LANE_WEIGHTS.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (lane, weight) in LANES.iter().zip(LANE_WEIGHTS) {
        if roll < *weight {
            return *lane;
        }
        roll -= weight;
    }
    LANES[0]
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_timestamp;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_records() {
        assert_eq!(generate(25, 11, base()), generate(25, 11, base()));
        assert_ne!(generate(25, 11, base()), generate(25, 12, base()));
    }

    #[test]
    fn records_carry_every_field_in_order() {
        let dataset = generate(3, 1, base());
        assert_eq!(
            dataset.columns(),
            vec![
                "shipment_id",
                "truck_id",
                "lane",
                "gate_in_time",
                "gate_out_time",
                "status",
                "weight_kg",
                "carrier"
            ]
        );
        assert_eq!(dataset.records()[2]["shipment_id"], "SHP-00003");
    }

    #[test]
    fn turnaround_stays_in_range() {
        let dataset = generate(500, 3, base());
        for record in &dataset {
            let start = parse_timestamp(&record["gate_in_time"]).unwrap();
            let end = parse_timestamp(&record["gate_out_time"]).unwrap();
            let minutes = (end - start).num_minutes();
            assert!((MIN_TURNAROUND_MINUTES..=MAX_TURNAROUND_MINUTES).contains(&minutes));
            assert!(start <= base().naive_utc());
            let delayed = record["status"] == "DELAYED";
            assert_eq!(delayed, minutes > 90);
        }
    }

    #[test]
    fn some_shipments_are_stuck() {
        let dataset = generate(300, 7, base());
        let delayed = dataset
            .iter()
            .filter(|record| record["status"] == "DELAYED")
            .count();
        assert!(delayed > 0 && delayed < 150, "delayed = {delayed}");
    }

    #[test]
    fn zero_rows_is_empty() {
        assert!(generate(0, 7, base()).is_empty());
    }
}

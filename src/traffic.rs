//! Terminal operations analysis: lane load, hourly congestion, turnaround,
//! stuck shipments, utilization grades, alerts and headline KPIs.
//!
//! Column roles are discovered by name through [`RoleDetectors`]; timestamp
//! columns come from field type inference. Any sub-computation whose
//! prerequisite column is absent yields an empty or `None` result instead of
//! failing, so `analyze` is total over every [`Dataset`].

use std::{collections::BTreeMap, fmt};

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    cli::{AnalyzeArgs, OutputFormat},
    config::{AnalyzerConfig, Thresholds},
    data::{Dataset, Record, format_number, parse_timestamp, value_key},
    io_utils,
    roles::RoleDetectors,
    schema::classify,
    table,
};

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let config = AnalyzerConfig::load_or_default(args.config.as_deref())?;
    let analyzer = TrafficAnalyzer::from_config(&config)?;
    let response = io_utils::load_payload(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let analysis = analyzer.analyze(&response.dataset);

    if args.output.is_some() || args.format == OutputFormat::Json {
        io_utils::write_json(args.output.as_deref(), &analysis)?;
    }
    if args.format == OutputFormat::Table {
        print_analysis(&analysis);
    }
    info!(
        "Analyzed {} record(s) across {} lane(s); {} alert(s)",
        analysis.kpis.total_records,
        analysis.kpis.active_lanes,
        analysis.alerts.len()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CongestionLevel {
    Normal,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Efficiency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    Delay,
    Congestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationsRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredColumns {
    pub lane: Vec<String>,
    pub shipment: Vec<String>,
    pub temporal: Vec<String>,
}

impl DiscoveredColumns {
    pub fn primary_lane(&self) -> Option<&str> {
        self.lane.first().map(String::as_str)
    }

    pub fn primary_shipment(&self) -> Option<&str> {
        self.shipment.first().map(String::as_str)
    }

    pub fn start_time(&self) -> Option<&str> {
        self.temporal.first().map(String::as_str)
    }

    pub fn end_time(&self) -> Option<&str> {
        self.temporal.get(1).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneMetrics {
    pub lane: String,
    pub shipment_count: usize,
    pub grade: Grade,
    /// Worst level seen across this lane's hourly buckets.
    pub congestion_level: CongestionLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionBucket {
    pub lane: String,
    pub hour: u32,
    pub count: usize,
    pub level: CongestionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnaroundDetail {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnaroundSummary {
    pub start_column: String,
    pub end_column: String,
    pub average_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
    pub details: Vec<TurnaroundDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StuckShipment {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,
    pub turnaround_minutes: f64,
    pub delay_minutes: f64,
    pub status: ShipmentStatus,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneUtilization {
    pub lane: String,
    pub shipment_count: usize,
    pub utilization: f64,
    pub grade: Grade,
    pub efficiency: Efficiency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_records: usize,
    pub active_lanes: usize,
    pub average_turnaround_minutes: Option<i64>,
    pub on_time_percentage: f64,
    pub efficiency: OperationsRating,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAnalysis {
    pub analyzed_at: DateTime<Utc>,
    pub columns: DiscoveredColumns,
    pub lane_metrics: Vec<LaneMetrics>,
    pub congestion: Vec<CongestionBucket>,
    pub turnaround: Option<TurnaroundSummary>,
    pub stuck_shipments: Vec<StuckShipment>,
    pub utilization: Vec<LaneUtilization>,
    pub alerts: Vec<Alert>,
    pub kpis: Kpis,
}

pub fn congestion_level(count: usize, thresholds: &Thresholds) -> CongestionLevel {
    if count > thresholds.heavy_congestion {
        CongestionLevel::Heavy
    } else if count > thresholds.moderate_congestion {
        CongestionLevel::Moderate
    } else {
        CongestionLevel::Normal
    }
}

pub fn grade_for(utilization: f64) -> Grade {
    match utilization {
        u if u >= 0.9 => Grade::A,
        u if u >= 0.7 => Grade::B,
        u if u >= 0.5 => Grade::C,
        u if u >= 0.3 => Grade::D,
        _ => Grade::F,
    }
}

pub fn efficiency_for(utilization: f64) -> Efficiency {
    if utilization >= 0.8 {
        Efficiency::High
    } else if utilization >= 0.5 {
        Efficiency::Medium
    } else {
        Efficiency::Low
    }
}

pub fn rating_for(on_time_percentage: f64) -> OperationsRating {
    if on_time_percentage > 90.0 {
        OperationsRating::Excellent
    } else if on_time_percentage > 80.0 {
        OperationsRating::Good
    } else if on_time_percentage > 70.0 {
        OperationsRating::Fair
    } else {
        OperationsRating::Poor
    }
}

/// Runs the full analysis with the terminal-operations defaults.
pub fn analyze(dataset: &Dataset) -> TrafficAnalysis {
    TrafficAnalyzer::default().analyze(dataset)
}

#[derive(Debug, Default)]
pub struct TrafficAnalyzer {
    detectors: RoleDetectors,
    thresholds: Thresholds,
}

impl TrafficAnalyzer {
    pub fn new(detectors: RoleDetectors, thresholds: Thresholds) -> Self {
        Self {
            detectors,
            thresholds,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        config.thresholds.ensure_valid()?;
        Ok(Self::new(
            RoleDetectors::from_config(&config.roles)?,
            config.thresholds.clone(),
        ))
    }

    pub fn analyze(&self, dataset: &Dataset) -> TrafficAnalysis {
        self.analyze_at(dataset, Utc::now())
    }

    /// Same as [`analyze`](Self::analyze) with alerts stamped at `now`.
    pub fn analyze_at(&self, dataset: &Dataset, now: DateTime<Utc>) -> TrafficAnalysis {
        let columns = self.discover_columns(dataset);
        let congestion = self.congestion(dataset, &columns);
        let turnaround = self.turnaround(dataset, &columns);
        let stuck_shipments = turnaround
            .as_ref()
            .map(|summary| self.stuck_shipments(summary))
            .unwrap_or_default();
        let utilization = self.utilization(dataset, &columns);
        let lane_metrics = lane_metrics(&utilization, &congestion);
        let alerts = alerts(&stuck_shipments, &congestion, now);
        let kpis = kpis(
            dataset.len(),
            utilization.len(),
            turnaround.as_ref(),
            stuck_shipments.len(),
        );
        TrafficAnalysis {
            analyzed_at: now,
            columns,
            lane_metrics,
            congestion,
            turnaround,
            stuck_shipments,
            utilization,
            alerts,
            kpis,
        }
    }

    pub fn discover_columns(&self, dataset: &Dataset) -> DiscoveredColumns {
        let names = dataset.columns();
        let columns = DiscoveredColumns {
            lane: self.detectors.lane.find(&names),
            shipment: self.detectors.shipment.find(&names),
            temporal: classify(dataset).grouped.temporal,
        };
        debug!(
            "Discovered lane={:?} shipment={:?} temporal={:?}",
            columns.lane, columns.shipment, columns.temporal
        );
        columns
    }

    /// Shipment counts per (lane, hour-of-day) of the primary timestamp.
    pub fn congestion(&self, dataset: &Dataset, columns: &DiscoveredColumns) -> Vec<CongestionBucket> {
        let (Some(lane_column), Some(time_column)) = (columns.primary_lane(), columns.start_time())
        else {
            debug!("Congestion skipped: needs a lane column and a timestamp column");
            return Vec::new();
        };
        let mut buckets: BTreeMap<(String, u32), usize> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in dataset {
            let lane = cell_text(record, lane_column);
            let hour = record.get(time_column).and_then(parse_timestamp).map(|t| t.hour());
            match (lane, hour) {
                (Some(lane), Some(hour)) => *buckets.entry((lane, hour)).or_default() += 1,
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("Congestion skipped {skipped} record(s) without lane or parseable time");
        }
        buckets
            .into_iter()
            .map(|((lane, hour), count)| CongestionBucket {
                lane,
                hour,
                count,
                level: congestion_level(count, &self.thresholds),
            })
            .collect()
    }

    /// Minutes between the first two timestamp columns, per record.
    pub fn turnaround(
        &self,
        dataset: &Dataset,
        columns: &DiscoveredColumns,
    ) -> Option<TurnaroundSummary> {
        let (Some(start_column), Some(end_column)) = (columns.start_time(), columns.end_time())
        else {
            debug!("Turnaround skipped: fewer than two timestamp columns");
            return None;
        };
        let details: Vec<TurnaroundDetail> = dataset
            .iter()
            .enumerate()
            .filter_map(|(record_index, record)| {
                let start = record.get(start_column).and_then(parse_timestamp)?;
                let end = record.get(end_column).and_then(parse_timestamp)?;
                Some(TurnaroundDetail {
                    record_index,
                    shipment_id: columns
                        .primary_shipment()
                        .and_then(|column| cell_text(record, column)),
                    lane: columns
                        .primary_lane()
                        .and_then(|column| cell_text(record, column)),
                    minutes: (end - start).num_seconds() as f64 / 60.0,
                })
            })
            .collect();
        if details.is_empty() {
            debug!("Turnaround skipped: no record had both timestamps");
            return None;
        }
        let total: f64 = details.iter().map(|d| d.minutes).sum();
        let min_minutes = details.iter().map(|d| d.minutes).fold(f64::INFINITY, f64::min);
        let max_minutes = details
            .iter()
            .map(|d| d.minutes)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(TurnaroundSummary {
            start_column: start_column.to_string(),
            end_column: end_column.to_string(),
            average_minutes: total / details.len() as f64,
            min_minutes,
            max_minutes,
            details,
        })
    }

    pub fn stuck_shipments(&self, turnaround: &TurnaroundSummary) -> Vec<StuckShipment> {
        let thresholds = &self.thresholds;
        turnaround
            .details
            .iter()
            .filter(|detail| detail.minutes > thresholds.stuck_minutes)
            .map(|detail| StuckShipment {
                record_index: detail.record_index,
                shipment_id: detail.shipment_id.clone(),
                lane: detail.lane.clone(),
                turnaround_minutes: detail.minutes,
                delay_minutes: detail.minutes - thresholds.baseline_minutes,
                status: ShipmentStatus::Delayed,
                severity: if detail.minutes >= thresholds.critical_minutes {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
            })
            .collect()
    }

    /// Lane counts relative to the busiest lane, sorted by lane name.
    pub fn utilization(&self, dataset: &Dataset, columns: &DiscoveredColumns) -> Vec<LaneUtilization> {
        let Some(lane_column) = columns.primary_lane() else {
            debug!("Utilization skipped: no lane column");
            return Vec::new();
        };
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in dataset {
            if let Some(lane) = cell_text(record, lane_column) {
                *counts.entry(lane).or_default() += 1;
            }
        }
        let busiest = counts.values().copied().max().unwrap_or(0);
        if busiest == 0 {
            return Vec::new();
        }
        counts
            .into_iter()
            .map(|(lane, shipment_count)| {
                let utilization = shipment_count as f64 / busiest as f64;
                LaneUtilization {
                    lane,
                    shipment_count,
                    utilization,
                    grade: grade_for(utilization),
                    efficiency: efficiency_for(utilization),
                }
            })
            .collect()
    }
}

fn cell_text(record: &Record, column: &str) -> Option<String> {
    record
        .get(column)
        .and_then(value_key)
        .map(|key| key.into_owned())
}

fn lane_metrics(utilization: &[LaneUtilization], congestion: &[CongestionBucket]) -> Vec<LaneMetrics> {
    utilization
        .iter()
        .map(|lane| LaneMetrics {
            lane: lane.lane.clone(),
            shipment_count: lane.shipment_count,
            grade: lane.grade,
            congestion_level: congestion
                .iter()
                .filter(|bucket| bucket.lane == lane.lane)
                .map(|bucket| bucket.level)
                .max()
                .unwrap_or(CongestionLevel::Normal),
        })
        .collect()
}

fn alerts(stuck: &[StuckShipment], congestion: &[CongestionBucket], now: DateTime<Utc>) -> Vec<Alert> {
    let delays = stuck.iter().map(|shipment| {
        let who = shipment
            .shipment_id
            .clone()
            .unwrap_or_else(|| format!("record #{}", shipment.record_index + 1));
        let message = match &shipment.lane {
            Some(lane) => format!(
                "Shipment {who} in lane {lane} has been in the terminal for {} minutes",
                format_number(shipment.turnaround_minutes)
            ),
            None => format!(
                "Shipment {who} has been in the terminal for {} minutes",
                format_number(shipment.turnaround_minutes)
            ),
        };
        Alert {
            kind: AlertKind::Delay,
            severity: shipment.severity,
            message,
            timestamp: now,
            data: serde_json::to_value(shipment).unwrap_or(Value::Null),
        }
    });
    let jams = congestion
        .iter()
        .filter(|bucket| bucket.level == CongestionLevel::Heavy)
        .map(|bucket| Alert {
            kind: AlertKind::Congestion,
            severity: Severity::Warning,
            message: format!(
                "Heavy congestion in lane {} at {:02}:00 with {} shipments",
                bucket.lane, bucket.hour, bucket.count
            ),
            timestamp: now,
            data: json!({ "lane": bucket.lane, "hour": bucket.hour, "count": bucket.count }),
        });
    delays.chain(jams).collect()
}

fn kpis(
    total_records: usize,
    active_lanes: usize,
    turnaround: Option<&TurnaroundSummary>,
    stuck_count: usize,
) -> Kpis {
    let on_time_percentage = if total_records == 0 {
        100.0
    } else {
        total_records.saturating_sub(stuck_count) as f64 / total_records as f64 * 100.0
    };
    Kpis {
        total_records,
        active_lanes,
        average_turnaround_minutes: turnaround.map(|t| t.average_minutes.round() as i64),
        on_time_percentage,
        efficiency: rating_for(on_time_percentage),
    }
}

fn print_analysis(analysis: &TrafficAnalysis) {
    let kpis = &analysis.kpis;
    let headers = vec!["kpi".to_string(), "value".to_string()];
    let rows = vec![
        vec!["total_records".to_string(), kpis.total_records.to_string()],
        vec!["active_lanes".to_string(), kpis.active_lanes.to_string()],
        vec![
            "average_turnaround_minutes".to_string(),
            kpis.average_turnaround_minutes
                .map(|m| m.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        ],
        vec![
            "on_time_percentage".to_string(),
            format_number(kpis.on_time_percentage),
        ],
        vec!["efficiency".to_string(), format!("{:?}", kpis.efficiency)],
    ];
    table::print_table(&headers, &rows);

    if !analysis.lane_metrics.is_empty() {
        println!();
        let headers = ["lane", "shipments", "grade", "congestion"]
            .map(String::from)
            .to_vec();
        let rows = analysis
            .lane_metrics
            .iter()
            .map(|lane| {
                vec![
                    lane.lane.clone(),
                    lane.shipment_count.to_string(),
                    lane.grade.to_string(),
                    format!("{:?}", lane.congestion_level),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
    }

    if !analysis.alerts.is_empty() {
        println!();
        let headers = ["severity", "type", "message"].map(String::from).to_vec();
        let rows = analysis
            .alerts
            .iter()
            .map(|alert| {
                vec![
                    format!("{:?}", alert.severity).to_uppercase(),
                    format!("{:?}", alert.kind).to_uppercase(),
                    alert.message.clone(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
    }
}

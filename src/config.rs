//! Analyzer configuration: column-role keywords and operational thresholds.
//!
//! Every field has a default so an empty file, a partial file, or no file at
//! all yields the terminal-operations behaviour. Files ending in `.json` are
//! read as JSON; anything else is read as YAML.

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub roles: RoleConfig,
    pub thresholds: Thresholds,
}

/// Case-insensitive substrings and regex patterns that mark a column's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub lane_keywords: Vec<String>,
    pub shipment_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lane_patterns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shipment_patterns: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            lane_keywords: to_strings(&["lane", "bay", "dock", "gate"]),
            shipment_keywords: to_strings(&["shipment", "ticket", "load", "truck"]),
            lane_patterns: Vec::new(),
            shipment_patterns: Vec::new(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Bucket counts above this are `Heavy`.
    pub heavy_congestion: usize,
    /// Bucket counts above this are `Moderate`.
    pub moderate_congestion: usize,
    /// Turnarounds above this many minutes are stuck.
    pub stuck_minutes: f64,
    /// Stuck turnarounds at or above this many minutes are critical.
    pub critical_minutes: f64,
    /// Expected turnaround subtracted to get the delay.
    pub baseline_minutes: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heavy_congestion: 10,
            moderate_congestion: 5,
            stuck_minutes: 90.0,
            critical_minutes: 180.0,
            baseline_minutes: 45.0,
        }
    }
}

impl Thresholds {
    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(
            self.moderate_congestion < self.heavy_congestion,
            "moderate_congestion ({}) must be below heavy_congestion ({})",
            self.moderate_congestion,
            self.heavy_congestion
        );
        ensure!(
            self.stuck_minutes <= self.critical_minutes,
            "stuck_minutes ({}) cannot exceed critical_minutes ({})",
            self.stuck_minutes,
            self.critical_minutes
        );
        ensure!(
            self.baseline_minutes >= 0.0,
            "baseline_minutes must not be negative"
        );
        Ok(())
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: AnalyzerConfig = if is_json {
            serde_json::from_str(&raw).with_context(|| format!("Parsing JSON config {path:?}"))?
        } else if raw.trim().is_empty() {
            AnalyzerConfig::default()
        } else {
            serde_yaml::from_str(&raw).with_context(|| format!("Parsing YAML config {path:?}"))?
        };
        config
            .thresholds
            .ensure_valid()
            .with_context(|| format!("Validating thresholds in {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

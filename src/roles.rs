//! Column-role detection by name.
//!
//! A [`RoleDetector`] holds an ordered list of [`ColumnPredicate`]s; a column
//! takes the role when any predicate matches its name. The terminal
//! operations defaults live in [`RoleDetectors::default`], and other domains
//! can supply their own predicates without touching the scoring code.

use std::fmt;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::RoleConfig;

pub trait ColumnPredicate: fmt::Debug + Send + Sync {
    fn matches(&self, column: &str) -> bool;
}

/// Matches when the lowercased name contains any needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameContains {
    needles: Vec<String>,
}

impl NameContains {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|needle| needle.as_ref().trim().to_lowercase())
                .filter(|needle| !needle.is_empty())
                .collect(),
        }
    }
}

impl ColumnPredicate for NameContains {
    fn matches(&self, column: &str) -> bool {
        let lowered = column.to_lowercase();
        self.needles.iter().any(|needle| lowered.contains(needle))
    }
}

#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("Compiling role pattern '{pattern}'"))?;
        Ok(Self { regex })
    }
}

impl ColumnPredicate for NamePattern {
    fn matches(&self, column: &str) -> bool {
        self.regex.is_match(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Lane,
    Shipment,
}

#[derive(Debug)]
pub struct RoleDetector {
    role: ColumnRole,
    predicates: Vec<Box<dyn ColumnPredicate>>,
}

impl RoleDetector {
    pub fn new(role: ColumnRole) -> Self {
        Self {
            role,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: impl ColumnPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn role(&self) -> ColumnRole {
        self.role
    }

    pub fn matches(&self, column: &str) -> bool {
        self.predicates.iter().any(|p| p.matches(column))
    }

    /// Matching columns in the order they were given.
    pub fn find(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .filter(|column| self.matches(column))
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct RoleDetectors {
    pub lane: RoleDetector,
    pub shipment: RoleDetector,
}

impl RoleDetectors {
    pub fn from_config(config: &RoleConfig) -> Result<Self> {
        Ok(Self {
            lane: build_detector(ColumnRole::Lane, &config.lane_keywords, &config.lane_patterns)?,
            shipment: build_detector(
                ColumnRole::Shipment,
                &config.shipment_keywords,
                &config.shipment_patterns,
            )?,
        })
    }
}

impl Default for RoleDetectors {
    fn default() -> Self {
        let defaults = RoleConfig::default();
        Self {
            lane: RoleDetector::new(ColumnRole::Lane)
                .with_predicate(NameContains::new(&defaults.lane_keywords)),
            shipment: RoleDetector::new(ColumnRole::Shipment)
                .with_predicate(NameContains::new(&defaults.shipment_keywords)),
        }
    }
}

fn build_detector(role: ColumnRole, keywords: &[String], patterns: &[String]) -> Result<RoleDetector> {
    let mut detector = RoleDetector::new(role);
    if !keywords.is_empty() {
        detector = detector.with_predicate(NameContains::new(keywords));
    }
    for pattern in patterns {
        detector = detector.with_predicate(NamePattern::new(pattern)?);
    }
    Ok(detector)
}

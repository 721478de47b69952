//! Output types and renderers for peaklist commands: the canonical GeoJSON
//! export shape, check-mode reports, summary statistics, and climb history.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Canonical export output: one feature per physical summit.
#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: PeakProperties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: PeakProperties) -> Self {
        Feature {
            kind: "Feature",
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl Geometry {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Geometry {
            kind: "Point",
            coordinates: [longitude, latitude],
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PeakProperties {
    /// Own id for a plain peak; the full ordered peer list when aliased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ids: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name2: Option<String>,
    /// Rendered prominence, uncertainty annotation preserved.
    pub prominence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(rename = "Pb", skip_serializing_if = "Option::is_none")]
    pub peakbagger: Option<String>,
    #[serde(rename = "LoJ", skip_serializing_if = "Option::is_none")]
    pub listsofjohn: Option<String>,
    #[serde(rename = "SP", skip_serializing_if = "Option::is_none")]
    pub summitpost: Option<String>,
    #[serde(rename = "W", skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    pub elevation: ElevationOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
    #[serde(skip_serializing_if = "is_false")]
    pub emblem: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub mtneer: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub foreign: bool,
}

/// A single scalar when the peak has exactly one unsourced spot reading,
/// otherwise the full tagged sequence in input order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ElevationOut {
    Scalar(u32),
    Readings(Vec<ElevationReadingOut>),
}

impl Default for ElevationOut {
    fn default() -> Self {
        ElevationOut::Scalar(0)
    }
}

#[derive(Debug, Serialize)]
pub struct ElevationReadingOut {
    /// Provenance class: `topo`, `spot`, or `survey`.
    pub class: &'static str,
    pub feet: u32,
    /// Contour-interval width for range readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Public scan id for topo readings, NGS pid for survey readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialize the collection as pretty-printed GeoJSON.
pub fn render_geojson(collection: &FeatureCollection) -> String {
    let mut rendered = serde_json::to_string_pretty(collection)
        .expect("export records serialize without error");
    rendered.push('\n');
    rendered
}

/// One advisory reconciliation mismatch from check mode.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub list: String,
    pub id: String,
    pub field: &'static str,
    pub source: String,
    pub reported: i64,
    pub expected: String,
}

/// Render check findings, one line each, with a trailing tally.
pub fn render_check_report(findings: &[CheckFinding], peaks_checked: usize) -> String {
    let mut out = String::new();
    for finding in findings {
        out.push_str(&format!(
            "{} {}: {} {} {} does not match model ({})\n",
            finding.list, finding.id, finding.source, finding.field, finding.reported,
            finding.expected
        ));
    }
    out.push_str(&format!(
        "{} peaks checked, {} mismatches\n",
        peaks_checked,
        findings.len()
    ));
    out
}

/// Per-list summary counts.
#[derive(Debug, Clone)]
pub struct ListStats {
    pub code: String,
    pub name: String,
    pub peaks: usize,
    pub climbed: usize,
    pub emblem: usize,
    pub emblem_climbed: usize,
    pub mtneer: usize,
    pub mtneer_climbed: usize,
    pub delisted: usize,
    pub suspended: usize,
}

pub fn render_stats(stats: &[ListStats]) -> String {
    let mut out = String::from(
        "list   peaks  climbed   emblem   mtneer  delisted  suspended\n",
    );
    for entry in stats {
        out.push_str(&format!(
            "{:<5} {:>6} {:>8} {:>8} {:>8} {:>9} {:>10}\n",
            entry.code,
            entry.peaks,
            entry.climbed,
            format!("{}/{}", entry.emblem_climbed, entry.emblem),
            format!("{}/{}", entry.mtneer_climbed, entry.mtneer),
            entry.delisted,
            entry.suspended,
        ));
    }
    out
}

/// One ascent in the cross-list climb history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub list: String,
    pub id: String,
    pub name: String,
    pub party: String,
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{}/{}/{}  {} {}  {}  {}\n",
            entry.date.month(),
            entry.date.day(),
            entry.date.year(),
            entry.list,
            entry.id,
            entry.name,
            entry.party,
        ));
    }
    out
}

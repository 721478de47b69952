//! Check-mode reconciliation of externally reported elevations and
//! prominences against the model's own estimates.

use serde::Deserialize;
use tracing::debug;

use peaklist_format::CheckFinding;
use peaklist_model::{format_feet, Elevation, ElevationSource, Peak, RunContext};
use peaklist_parser::Document;

/// Vertical-datum grid interpolation, supplied from outside the core. The
/// value is the NAVD88 minus NGVD29 shift in feet at the given location.
pub trait DatumShift {
    fn shift_feet(&self, lat: f64, lng: f64) -> f64;
}

/// Flat fallback shift, configured in `.peaklists.toml`.
pub struct ConstantShift(pub f64);

impl DatumShift for ConstantShift {
    fn shift_feet(&self, _lat: f64, _lng: f64) -> f64 {
        self.0
    }
}

/// One externally fetched record, as handed to the core in the records
/// file. Sources map one-to-one onto matching strategies.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalRecord {
    pub list: String,
    pub id: String,
    pub source: RecordSource,
    #[serde(default)]
    pub elevation: Option<i64>,
    #[serde(default)]
    pub prominence: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RecordSource {
    Pb,
    LoJ,
    #[serde(rename = "NGS")]
    Ngs,
}

impl RecordSource {
    fn as_str(self) -> &'static str {
        match self {
            RecordSource::Pb => "Pb",
            RecordSource::LoJ => "LoJ",
            RecordSource::Ngs => "NGS",
        }
    }
}

/// A record that names a peak no parsed document contains.
#[derive(Debug, thiserror::Error)]
#[error("record references unknown peak '{list} {id}'")]
pub struct UnknownRecordTarget {
    pub list: String,
    pub id: String,
}

/// Compare every record against the model. Mismatches are advisory: all of
/// them are collected and reported together.
pub fn run_check(
    documents: &[Document],
    ctx: &RunContext,
    records: &[ExternalRecord],
    shift: &dyn DatumShift,
) -> Result<Vec<CheckFinding>, UnknownRecordTarget> {
    let mut findings = Vec::new();

    for record in records {
        let peak = find_peak(documents, &record.list, &record.id).ok_or_else(|| {
            UnknownRecordTarget {
                list: record.list.clone(),
                id: record.id.clone(),
            }
        })?;
        debug!(peak = %peak.listed_id(), source = record.source.as_str(), "checking record");

        if let Some(reported) = record.elevation {
            if let Some(expected) = elevation_mismatch(peak, ctx, record.source, reported, shift) {
                findings.push(CheckFinding {
                    list: record.list.clone(),
                    id: record.id.clone(),
                    field: "elevation",
                    source: record.source.as_str().to_owned(),
                    reported,
                    expected,
                });
            }
        }

        if let Some(reported) = record.prominence {
            if let Some(expected) = prominence_mismatch(peak, record.source, reported) {
                findings.push(CheckFinding {
                    list: record.list.clone(),
                    id: record.id.clone(),
                    field: "prominence",
                    source: record.source.as_str().to_owned(),
                    reported,
                    expected,
                });
            }
        }
    }

    findings.sort_by(|a, b| {
        (a.list.as_str(), a.id.as_str(), a.field).cmp(&(b.list.as_str(), b.id.as_str(), b.field))
    });
    Ok(findings)
}

fn find_peak<'a>(documents: &'a [Document], list: &str, id: &str) -> Option<&'a Peak> {
    let document = documents.iter().find(|doc| doc.list.code == list)?;
    let id = id.parse().ok()?;
    document.list.peak(&id)
}

/// Elevation matching, one strategy per source:
/// exact (Pb), half-contour-interval adjustment (LoJ), or vertical-datum
/// shift against NAVD88 survey readings (NGS). Returns the expected value
/// rendering when nothing matches.
fn elevation_mismatch(
    peak: &Peak,
    ctx: &RunContext,
    source: RecordSource,
    reported: i64,
    shift: &dyn DatumShift,
) -> Option<String> {
    let primary = &peak.elevations[0];
    let estimate = primary.estimate(ctx);

    let matched = match source {
        RecordSource::Pb => reported == estimate.feet as i64,
        RecordSource::LoJ => reported == estimate.avg().round() as i64,
        RecordSource::Ngs => {
            let survey = peak
                .elevations
                .iter()
                .find(|reading| matches!(reading.source, ElevationSource::Survey { .. }));
            match survey {
                None => false,
                Some(reading) => {
                    let lat: f64 = peak.latitude.parse().expect("latitude validated by grammar");
                    let lng: f64 = peak
                        .longitude
                        .parse()
                        .expect("longitude validated by grammar");
                    let adjusted = reported as f64 - shift.shift_feet(lat, lng);
                    adjusted.round() as i64 == reading.feet as i64
                }
            }
        }
    };

    if matched {
        None
    } else {
        Some(render_elevation_expectation(primary, peak, source))
    }
}

fn render_elevation_expectation(primary: &Elevation, peak: &Peak, source: RecordSource) -> String {
    match source {
        RecordSource::Ngs => {
            let survey = peak
                .elevations
                .iter()
                .find(|reading| matches!(reading.source, ElevationSource::Survey { .. }));
            match survey {
                Some(reading) => format!("{}' NAVD88", format_feet(reading.feet)),
                None => "no survey reading".to_owned(),
            }
        }
        _ => format!(
            "{}'{}",
            format_feet(primary.feet),
            if primary.is_range { "+" } else { "" }
        ),
    }
}

/// Prominence matching against the authoritative first entry. `Pb` accepts
/// any value inside the uncertainty band; `LoJ` reports the band midpoint;
/// `NGS` records never carry prominence, so any value is a mismatch.
fn prominence_mismatch(peak: &Peak, source: RecordSource, reported: i64) -> Option<String> {
    let prominence = &peak.prominences[0];

    let matched = match source {
        RecordSource::Pb => {
            if prominence.is_exact() {
                reported == prominence.avg().round() as i64
            } else {
                (prominence.min()..=prominence.max()).contains(&reported)
            }
        }
        RecordSource::LoJ => reported == prominence.avg().round() as i64,
        RecordSource::Ngs => false,
    };

    if matched {
        None
    } else {
        Some(prominence.display_value())
    }
}

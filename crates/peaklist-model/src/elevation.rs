//! Elevation readings, provenance sources, and the ordering invariant.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::RunContext;

/// USGS quadrangle series, ordered by precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSeries {
    SevenAndHalfMinute,
    FifteenMinute,
    ThirtyMinute,
}

impl MapSeries {
    pub fn label(self) -> &'static str {
        match self {
            MapSeries::SevenAndHalfMinute => "7.5'",
            MapSeries::FifteenMinute => "15'",
            MapSeries::ThirtyMinute => "30'",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "7.5'" => Some(MapSeries::SevenAndHalfMinute),
            "15'" => Some(MapSeries::FifteenMinute),
            "30'" => Some(MapSeries::ThirtyMinute),
            _ => None,
        }
    }

    /// Contour interval in feet for maps of this series.
    pub fn contour_interval(self) -> u32 {
        match self {
            MapSeries::SevenAndHalfMinute => 40,
            MapSeries::FifteenMinute => 80,
            MapSeries::ThirtyMinute => 100,
        }
    }

    /// Lower ranks sort as more precise.
    fn precision_rank(self) -> u8 {
        match self {
            MapSeries::SevenAndHalfMinute => 0,
            MapSeries::FifteenMinute => 1,
            MapSeries::ThirtyMinute => 2,
        }
    }
}

/// A topographic map referenced as elevation provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoMap {
    /// Internal map id, as it appears in document links.
    pub id: String,
    pub series: MapSeries,
    pub name: String,
    pub year: u32,
}

/// An NGS survey station referenced as elevation provenance. Station
/// datasheets report NAVD88 heights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyStation {
    pub pid: String,
    /// Full designation text, e.g. `VABM Olancha`.
    pub designation: String,
}

/// A registration conflicted with an earlier one for the same key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind} '{key}' registered twice with different attributes")]
pub struct RegistryError {
    pub kind: &'static str,
    pub key: String,
}

/// Run-scoped topo map registry, populated monotonically by first use.
#[derive(Debug, Default)]
pub struct TopoRegistry {
    maps: BTreeMap<String, TopoMap>,
}

impl TopoRegistry {
    pub fn register(&mut self, map: TopoMap) -> Result<(), RegistryError> {
        match self.maps.get(&map.id) {
            None => {
                self.maps.insert(map.id.clone(), map);
                Ok(())
            }
            Some(existing) if *existing == map => Ok(()),
            Some(_) => Err(RegistryError {
                kind: "topo map",
                key: map.id,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TopoMap> {
        self.maps.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopoMap> {
        self.maps.values()
    }
}

/// Run-scoped survey station registry.
#[derive(Debug, Default)]
pub struct SurveyRegistry {
    stations: BTreeMap<String, SurveyStation>,
}

impl SurveyRegistry {
    pub fn register(&mut self, station: SurveyStation) -> Result<(), RegistryError> {
        match self.stations.get(&station.pid) {
            None => {
                self.stations.insert(station.pid.clone(), station);
                Ok(())
            }
            Some(existing) if *existing == station => Ok(()),
            Some(_) => Err(RegistryError {
                kind: "survey station",
                key: station.pid,
            }),
        }
    }

    pub fn get(&self, pid: &str) -> Option<&SurveyStation> {
        self.stations.get(pid)
    }
}

/// Provenance of one elevation reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElevationSource {
    None,
    Topo { map_id: String },
    Survey { pid: String },
}

/// One elevation reading from the elevation cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elevation {
    pub feet: u32,
    /// True when the value is a contour band rather than a spot height.
    pub is_range: bool,
    pub annotation: Option<String>,
    pub source: ElevationSource,
}

impl Elevation {
    /// Contour interval in feet; zero for spot heights. Range readings
    /// without a map source use the standard 40-foot interval.
    pub fn interval(&self, ctx: &RunContext) -> u32 {
        if !self.is_range {
            return 0;
        }
        match &self.source {
            ElevationSource::Topo { map_id } => ctx
                .topos
                .get(map_id)
                .map(|map| map.series.contour_interval())
                .unwrap_or(40),
            _ => 40,
        }
    }

    pub fn estimate(&self, ctx: &RunContext) -> Estimate {
        Estimate {
            feet: self.feet,
            interval: self.interval(ctx),
        }
    }

    fn order_key(&self, ctx: &RunContext) -> (u8, u8, i64) {
        match &self.source {
            ElevationSource::Topo { map_id } => match ctx.topos.get(map_id) {
                Some(map) => (0, map.series.precision_rank(), -(map.year as i64)),
                None => (0, u8::MAX, 0),
            },
            ElevationSource::None => (1, 0, 0),
            ElevationSource::Survey { .. } => (2, 0, 0),
        }
    }
}

/// A value-or-half-open-range in feet: `[feet, feet + interval)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub feet: u32,
    pub interval: u32,
}

impl Estimate {
    pub fn spot(feet: u32) -> Self {
        Estimate { feet, interval: 0 }
    }

    pub fn is_range(self) -> bool {
        self.interval > 0
    }

    pub fn min(self) -> u32 {
        self.feet
    }

    pub fn max(self) -> u32 {
        self.feet + self.interval
    }

    pub fn avg(self) -> f64 {
        self.feet as f64 + self.interval as f64 / 2.0
    }
}

/// Violations of the elevation-list invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElevationError {
    #[error("elevation-order: no elevation readings")]
    Empty,
    #[error("elevation-order: reading {index} is more authoritative than its predecessor")]
    OutOfOrder { index: usize },
    #[error(
        "elevation-order: readings {} and {index} tie in precedence without distinct annotations",
        .index - 1
    )]
    TiedPrecedence { index: usize },
    #[error("elevation-order: a survey marker cannot be the sole elevation source")]
    SurveyWithoutTopo,
    #[error("elevation-order: survey reading {index} cannot be a contour band")]
    SurveyRange { index: usize },
}

/// Check the ordering invariant over a peak's parsed readings. Pure: the
/// sequence is consumed as-is and never reordered.
pub fn check_elevation_order(
    readings: &[Elevation],
    ctx: &RunContext,
) -> Result<(), ElevationError> {
    if readings.is_empty() {
        return Err(ElevationError::Empty);
    }

    for (index, reading) in readings.iter().enumerate() {
        if reading.is_range && matches!(reading.source, ElevationSource::Survey { .. }) {
            return Err(ElevationError::SurveyRange { index });
        }
    }

    if matches!(readings[0].source, ElevationSource::Survey { .. }) {
        return Err(ElevationError::SurveyWithoutTopo);
    }

    for index in 1..readings.len() {
        let prev = &readings[index - 1];
        let this = &readings[index];
        let prev_key = prev.order_key(ctx);
        let this_key = this.order_key(ctx);

        if this_key < prev_key {
            return Err(ElevationError::OutOfOrder { index });
        }
        if this_key == prev_key {
            let both_topo = matches!(prev.source, ElevationSource::Topo { .. })
                && matches!(this.source, ElevationSource::Topo { .. });
            let distinct_annotations = match (&prev.annotation, &this.annotation) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            };
            if !(both_topo && distinct_annotations) {
                return Err(ElevationError::TiedPrecedence { index });
            }
        }
    }

    Ok(())
}

/// Render feet with comma grouping, the only form the documents accept.
pub fn format_feet(feet: u32) -> String {
    let digits = feet.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parse comma-grouped feet, rejecting non-canonical grouping.
pub fn parse_feet(text: &str) -> Option<u32> {
    let value: u32 = text.replace(',', "").parse().ok()?;
    (format_feet(value) == text).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_maps() -> RunContext {
        let mut ctx = RunContext::new();
        ctx.topos
            .register(TopoMap {
                id: "o36118b1".into(),
                series: MapSeries::SevenAndHalfMinute,
                name: "Olancha".into(),
                year: 1984,
            })
            .unwrap();
        ctx.topos
            .register(TopoMap {
                id: "q36118a1".into(),
                series: MapSeries::FifteenMinute,
                name: "Olancha".into(),
                year: 1956,
            })
            .unwrap();
        ctx
    }

    fn topo(feet: u32, map_id: &str) -> Elevation {
        Elevation {
            feet,
            is_range: false,
            annotation: None,
            source: ElevationSource::Topo {
                map_id: map_id.into(),
            },
        }
    }

    fn unsourced(feet: u32) -> Elevation {
        Elevation {
            feet,
            is_range: false,
            annotation: None,
            source: ElevationSource::None,
        }
    }

    fn survey(feet: u32) -> Elevation {
        Elevation {
            feet,
            is_range: false,
            annotation: None,
            source: ElevationSource::Survey { pid: "GT1146".into() },
        }
    }

    #[test]
    fn feet_formatting_round_trips() {
        assert_eq!(format_feet(982), "982");
        assert_eq!(format_feet(6234), "6,234");
        assert_eq!(format_feet(14494), "14,494");
        assert_eq!(parse_feet("14,494"), Some(14494));
        assert_eq!(parse_feet("1494"), None);
        assert_eq!(parse_feet("14,94"), None);
    }

    #[test]
    fn finer_series_sorts_before_coarser() {
        let ctx = ctx_with_maps();
        let ordered = vec![topo(12123, "o36118b1"), topo(12135, "q36118a1"), survey(12130)];
        assert!(check_elevation_order(&ordered, &ctx).is_ok());

        let reversed = vec![topo(12135, "q36118a1"), topo(12123, "o36118b1")];
        assert_eq!(
            check_elevation_order(&reversed, &ctx),
            Err(ElevationError::OutOfOrder { index: 1 })
        );
    }

    #[test]
    fn unsourced_sits_between_topo_and_survey() {
        let ctx = ctx_with_maps();
        let ordered = vec![topo(12123, "o36118b1"), unsourced(12120), survey(12130)];
        assert!(check_elevation_order(&ordered, &ctx).is_ok());

        let survey_first = vec![survey(12130), topo(12123, "o36118b1")];
        assert_eq!(
            check_elevation_order(&survey_first, &ctx),
            Err(ElevationError::OutOfOrder { index: 1 })
        );
    }

    #[test]
    fn survey_alone_is_rejected() {
        let ctx = RunContext::new();
        assert_eq!(
            check_elevation_order(&[survey(12130)], &ctx),
            Err(ElevationError::SurveyWithoutTopo)
        );
    }

    #[test]
    fn topo_ties_need_distinct_annotations() {
        let ctx = ctx_with_maps();
        let mut first = topo(12123, "o36118b1");
        let mut second = topo(12120, "o36118b1");
        assert_eq!(
            check_elevation_order(&[first.clone(), second.clone()], &ctx),
            Err(ElevationError::TiedPrecedence { index: 1 })
        );

        first.annotation = Some("summit block".into());
        second.annotation = Some("north contour".into());
        assert!(check_elevation_order(&[first, second], &ctx).is_ok());
    }

    #[test]
    fn estimates_use_map_contour_intervals() {
        let ctx = ctx_with_maps();
        let mut reading = topo(12120, "q36118a1");
        reading.is_range = true;
        let estimate = reading.estimate(&ctx);
        assert_eq!(estimate.min(), 12120);
        assert_eq!(estimate.max(), 12200);
        assert!((estimate.avg() - 12160.0).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_rejects_conflicting_registration() {
        let mut ctx = ctx_with_maps();
        let err = ctx
            .topos
            .register(TopoMap {
                id: "o36118b1".into(),
                series: MapSeries::SevenAndHalfMinute,
                name: "Olancha".into(),
                year: 1994,
            })
            .unwrap_err();
        assert_eq!(err.kind, "topo map");
    }
}

//! Entity model for peak-register documents.
//!
//! Everything here is plain data plus pure validation helpers. Entities are
//! built once by the parser and stay read-only afterward, except for
//! alias-copy propagation which goes through the explicit
//! [`Peak::copy_from_alias_source`] field list. Registries shared across a
//! run live in [`RunContext`]; a fresh run starts with empty registries.

pub mod elevation;
pub mod land;
pub mod prominence;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

pub use elevation::{
    check_elevation_order, format_feet, parse_feet, Elevation, ElevationError, ElevationSource,
    Estimate, MapSeries, RegistryError, SurveyRegistry, SurveyStation, TopoMap, TopoRegistry,
};
pub use land::{check_land_chain, LandArea, LandClass, LandError, LandRegistry, LandUse};
pub use prominence::{Prominence, ProminenceTag};

/// Process-wide registries for a single run, passed by reference into the
/// parser and resolver instead of living in ambient global state.
#[derive(Debug, Default)]
pub struct RunContext {
    pub topos: TopoRegistry,
    pub surveys: SurveyRegistry,
    pub lands: LandRegistry,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One configured list populated by parsing its document.
#[derive(Debug, Clone)]
pub struct PeakList {
    pub code: String,
    pub name: String,
    pub expected_peaks: usize,
    pub expected_sections: usize,
    pub country: String,
    pub state: String,
    pub extra_column: bool,
    pub rank: u32,
    pub sections: Vec<Section>,
}

impl PeakList {
    pub fn peaks(&self) -> impl Iterator<Item = &Peak> {
        self.sections.iter().flat_map(|section| section.peaks.iter())
    }

    pub fn peak(&self, id: &PeakId) -> Option<&Peak> {
        self.sections
            .get((id.section as usize).checked_sub(1)?)
            .and_then(|section| section.peaks.iter().find(|peak| peak.id == *id))
    }

    pub fn total_peaks(&self) -> usize {
        self.sections.iter().map(|section| section.peaks.len()).sum()
    }
}

/// One numbered section of a list.
#[derive(Debug, Clone)]
pub struct Section {
    /// 1-based position, equal to the running count at parse time.
    pub number: u32,
    pub name: String,
    /// Raw location override from the section header, e.g. `US-NV/US-CA`.
    pub location: Option<String>,
    pub country: String,
    pub state: String,
    pub peaks: Vec<Peak>,
}

/// Composite peak identifier within a list: section, number, subletter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeakId {
    pub section: u32,
    pub number: u32,
    pub subletter: Option<char>,
}

impl fmt::Display for PeakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.number)?;
        if let Some(letter) = self.subletter {
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid peak id '{0}'")]
pub struct PeakIdParseError(String);

impl FromStr for PeakId {
    type Err = PeakIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let err = || PeakIdParseError(value.to_owned());
        let (section, rest) = value.split_once('.').ok_or_else(err)?;
        let section: u32 = section.parse().map_err(|_| err())?;

        let (digits, subletter) = if rest.ends_with('a') || rest.ends_with('b') {
            (&rest[..rest.len() - 1], rest.chars().last())
        } else {
            (rest, None)
        };
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(err());
        }
        let number: u32 = digits.parse().map_err(|_| err())?;
        if section == 0 || number == 0 {
            return Err(err());
        }

        Ok(PeakId {
            section,
            number,
            subletter,
        })
    }
}

/// A list-qualified peak id, e.g. `SPS 1.1`. Used for alias references,
/// land-area membership, and high-point claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListedId {
    pub list: String,
    pub id: PeakId,
}

impl fmt::Display for ListedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.list, self.id)
    }
}

impl FromStr for ListedId {
    type Err = PeakIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let err = || PeakIdParseError(value.to_owned());
        let (list, id) = value.split_once(' ').ok_or_else(err)?;
        if list.is_empty() || !list.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Err(err());
        }
        Ok(ListedId {
            list: list.to_owned(),
            id: id.parse()?,
        })
    }
}

/// Row status flags. Emblem and mountaineer are mutually exclusive, as are
/// delisted and suspended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakFlags {
    pub emblem: bool,
    pub mtneer: bool,
    pub delisted: bool,
    pub suspended: bool,
    pub climbed: bool,
}

/// Climbing grade, a class or a class range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    pub low: u8,
    pub high: Option<u8>,
}

impl Grade {
    pub fn new(low: u8, high: Option<u8>) -> Option<Self> {
        if low < 1 || low > 6 {
            return None;
        }
        if let Some(high) = high {
            if high <= low || high > 6 {
                return None;
            }
        }
        Some(Grade { low, high })
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class {}", self.low)?;
        if let Some(high) = self.high {
            write!(f, "-{high}")?;
        }
        Ok(())
    }
}

/// External catalog identifiers, one per supported catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIds {
    pub peakbagger: Option<String>,
    pub listsofjohn: Option<String>,
    pub summitpost: Option<String>,
    pub wikipedia: Option<String>,
}

/// State of the weather-link cell. The distinction between an empty
/// sentinel and a wholly absent line matters for exact redisplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCell {
    Link,
    Empty,
    Absent,
}

/// A single ascent record from the climb-log cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClimbRecord {
    pub date: NaiveDate,
    pub party: ClimbParty,
    /// Verbatim note lines, when the record carries a note block.
    pub note: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClimbParty {
    Solo,
    With(Vec<Companion>),
}

impl fmt::Display for ClimbParty {
    /// Plain-text rendering without companion links, e.g.
    /// `with Ben, Marcy and Tom`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClimbParty::Solo => f.write_str("solo"),
            ClimbParty::With(companions) => {
                f.write_str("with ")?;
                for (idx, companion) in companions.iter().enumerate() {
                    if idx > 0 {
                        if idx + 1 == companions.len() {
                            f.write_str(" and ")?;
                        } else {
                            f.write_str(", ")?;
                        }
                    }
                    f.write_str(&companion.name)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    pub name: String,
    pub url: Option<String>,
}

/// One peak entry.
#[derive(Debug, Clone)]
pub struct Peak {
    pub id: PeakId,
    pub list_code: String,
    pub name: String,
    pub alt_name: Option<String>,
    /// Whether the id cell carried the stable anchor attribute.
    pub has_anchor: bool,
    /// Fixed-precision decimal text, preserved exactly for redisplay.
    pub latitude: String,
    pub longitude: String,
    pub zoom: u8,
    /// Raw location override from the row, e.g. `MX-BC`.
    pub loc_override: Option<String>,
    pub country: String,
    pub state: String,
    pub elevations: Vec<Elevation>,
    pub prominences: Vec<Prominence>,
    pub land_areas: Vec<LandUse>,
    pub grade: Option<Grade>,
    pub catalogs: CatalogIds,
    pub extra: Option<String>,
    pub weather: WeatherCell,
    pub climbs: Vec<ClimbRecord>,
    pub flags: PeakFlags,
    /// Alias-source reference when this entry borrows from another list.
    pub alias_of: Option<ListedId>,
    /// Peers aliasing this entry. Authored as `data-also`, re-derived from
    /// back-links by the resolver.
    pub also_listed: Vec<ListedId>,
}

impl Peak {
    pub fn listed_id(&self) -> ListedId {
        ListedId {
            list: self.list_code.clone(),
            id: self.id,
        }
    }

    /// Copy the data an alias borrows from its source. The list is
    /// deliberately explicit: a new `Peak` field does not participate in
    /// alias propagation until it is added here.
    ///
    /// Not copied: id, list code, display name, anchor, status flags,
    /// extra-column text, weather-link presence, climb history (coupled to
    /// the per-list climbed flag), and the alias links themselves.
    pub fn copy_from_alias_source(&mut self, source: &Peak) {
        self.alt_name = source.alt_name.clone();
        self.latitude = source.latitude.clone();
        self.longitude = source.longitude.clone();
        self.zoom = source.zoom;
        self.elevations = source.elevations.clone();
        self.prominences = source.prominences.clone();
        self.land_areas = source.land_areas.clone();
        self.grade = source.grade;
        self.catalogs = source.catalogs.clone();
    }
}

/// Violation of the three-case id successor rule.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("peak id '{got}' does not follow '{previous}'; expected one of {expected}")]
pub struct IdSequenceError {
    pub previous: String,
    pub got: String,
    pub expected: String,
}

/// Check the id sequencing invariant for a peak following `prev` within
/// section `section`. The first peak of a section passes `None`.
pub fn check_id_sequence(
    section: u32,
    prev: Option<&PeakId>,
    next: &PeakId,
) -> Result<(), IdSequenceError> {
    let successors: Vec<PeakId> = match prev {
        None => vec![
            PeakId {
                section,
                number: 1,
                subletter: None,
            },
            PeakId {
                section,
                number: 1,
                subletter: Some('a'),
            },
        ],
        Some(prev) => {
            let mut successors = vec![
                PeakId {
                    section,
                    number: prev.number + 1,
                    subletter: None,
                },
                PeakId {
                    section,
                    number: prev.number + 1,
                    subletter: Some('a'),
                },
            ];
            if prev.subletter == Some('a') {
                successors.push(PeakId {
                    section,
                    number: prev.number,
                    subletter: Some('b'),
                });
            }
            successors
        }
    };

    if successors.contains(next) {
        return Ok(());
    }

    Err(IdSequenceError {
        previous: prev
            .map(|id| id.to_string())
            .unwrap_or_else(|| "start of section".to_owned()),
        got: next.to_string(),
        expected: successors
            .iter()
            .map(|id| format!("'{id}'"))
            .collect::<Vec<_>>()
            .join(", "),
    })
}

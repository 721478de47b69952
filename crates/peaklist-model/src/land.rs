//! Land-management areas, class precedence, and the nesting invariant.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::ListedId;

/// Land-management authority classes, ordered by precedence. Wilderness is
/// a designation layered onto a federal base class, not a base class
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandClass {
    Private,
    Municipal,
    County,
    Regional,
    State,
    Blm,
    Fws,
    Fs,
    Nps,
    Wilderness,
}

impl LandClass {
    /// Derive the class from an area name. Regional-district names are
    /// checked before the wilderness suffix so that a "Regional Wilderness"
    /// park unit is not mistaken for a federal wilderness designation.
    pub fn classify(name: &str) -> LandClass {
        if name.ends_with(" Regional Park")
            || name.ends_with(" Regional Preserve")
            || name.ends_with(" Regional Wilderness")
        {
            return LandClass::Regional;
        }
        if name.ends_with(" Wilderness") {
            return LandClass::Wilderness;
        }
        if name.ends_with(" National Forest") {
            return LandClass::Fs;
        }
        if name.ends_with(" National Park")
            || name.ends_with(" National Monument")
            || name.ends_with(" National Preserve")
        {
            return LandClass::Nps;
        }
        if name.ends_with(" National Wildlife Refuge") {
            return LandClass::Fws;
        }
        if name.starts_with("BLM ") {
            return LandClass::Blm;
        }
        if name.ends_with(" State Park") || name.ends_with(" State Recreation Area") {
            return LandClass::State;
        }
        if name.ends_with(" County Park") {
            return LandClass::County;
        }
        if name.starts_with("City of ") {
            return LandClass::Municipal;
        }
        LandClass::Private
    }

    /// Precedence position for base classes; wilderness has none.
    pub fn base_precedence(self) -> Option<u8> {
        match self {
            LandClass::Private => Some(0),
            LandClass::Municipal => Some(1),
            LandClass::County => Some(2),
            LandClass::Regional => Some(3),
            LandClass::State => Some(4),
            LandClass::Blm => Some(5),
            LandClass::Fws => Some(6),
            LandClass::Fs => Some(7),
            LandClass::Nps => Some(8),
            LandClass::Wilderness => None,
        }
    }

    /// Whether a wilderness designation may layer onto this class.
    pub fn is_wilderness_base(self) -> bool {
        matches!(
            self,
            LandClass::Blm | LandClass::Fws | LandClass::Fs | LandClass::Nps
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LandClass::Private => "private",
            LandClass::Municipal => "municipal",
            LandClass::County => "county",
            LandClass::Regional => "regional",
            LandClass::State => "state",
            LandClass::Blm => "BLM",
            LandClass::Fws => "FWS",
            LandClass::Fs => "FS",
            LandClass::Nps => "NPS",
            LandClass::Wilderness => "wilderness",
        }
    }

    /// Validate an area link against the class's expected host.
    pub fn url_is_valid(self, url: &str) -> bool {
        if !url.starts_with("https://") {
            return false;
        }
        let required = match self {
            LandClass::Fs => Some("fs.usda.gov"),
            LandClass::Nps => Some("nps.gov"),
            LandClass::Blm => Some("blm.gov"),
            LandClass::Fws => Some("fws.gov"),
            LandClass::Wilderness => Some("wilderness.net"),
            LandClass::State => None,
            _ => None,
        };
        match self {
            LandClass::State => url.contains("parks.ca.gov") || url.contains("parks.nv.gov"),
            _ => required.map(|host| url.contains(host)).unwrap_or(true),
        }
    }
}

/// One link in a peak's ownership chain, as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandUse {
    pub name: String,
    pub url: Option<String>,
    pub high_point: bool,
}

impl LandUse {
    pub fn class(&self) -> LandClass {
        LandClass::classify(&self.name)
    }
}

/// Registry entry for one land-management area.
#[derive(Debug, Clone)]
pub struct LandArea {
    pub name: String,
    pub class: LandClass,
    pub url: Option<String>,
    pub members: BTreeSet<ListedId>,
    pub high_point: Option<ListedId>,
}

/// Land-related validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandError {
    #[error("land-nesting: '{name}' ({class}) cannot nest under a {previous} area")]
    NestingOrder {
        name: String,
        class: &'static str,
        previous: &'static str,
    },
    #[error("land-nesting: wilderness '{name}' has no federal base area in the chain")]
    WildernessWithoutBase { name: String },
    #[error("land-nesting: chain carries more than one wilderness designation ('{name}')")]
    DoubleWilderness { name: String },
    #[error("land-link: '{url}' is not a valid link for {class} area '{name}'")]
    BadLink {
        name: String,
        class: &'static str,
        url: String,
    },
    #[error("land-registry: area '{name}' re-registered with a different link")]
    LinkConflict { name: String },
    #[error("land-registry: area '{name}' already has high point {existing}, claimed again by {claimed}")]
    HighPointConflict {
        name: String,
        existing: ListedId,
        claimed: ListedId,
    },
}

/// Run-scoped registry of land-management areas keyed by name.
#[derive(Debug, Default)]
pub struct LandRegistry {
    areas: BTreeMap<String, LandArea>,
}

impl LandRegistry {
    /// Record one use of an area by a peak, registering the area on first
    /// sight and checking consistency afterwards.
    pub fn record_use(&mut self, entry: &LandUse, peak: &ListedId) -> Result<(), LandError> {
        let class = entry.class();
        if let Some(url) = &entry.url {
            if !class.url_is_valid(url) {
                return Err(LandError::BadLink {
                    name: entry.name.clone(),
                    class: class.as_str(),
                    url: url.clone(),
                });
            }
        }

        let area = self
            .areas
            .entry(entry.name.clone())
            .or_insert_with(|| LandArea {
                name: entry.name.clone(),
                class,
                url: entry.url.clone(),
                members: BTreeSet::new(),
                high_point: None,
            });

        if area.url != entry.url {
            return Err(LandError::LinkConflict {
                name: entry.name.clone(),
            });
        }

        area.members.insert(peak.clone());

        if entry.high_point {
            match &area.high_point {
                Some(existing) if existing != peak => {
                    return Err(LandError::HighPointConflict {
                        name: entry.name.clone(),
                        existing: existing.clone(),
                        claimed: peak.clone(),
                    });
                }
                _ => area.high_point = Some(peak.clone()),
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LandArea> {
        self.areas.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LandArea> {
        self.areas.values()
    }
}

/// Check the class-nesting invariant over an ownership chain. Pure: the
/// chain is consumed in authored order and never rewritten.
pub fn check_land_chain(chain: &[LandUse]) -> Result<(), LandError> {
    let mut last_base: Option<LandClass> = None;
    let mut wilderness_seen = false;
    let mut base_supports_wilderness = false;

    for entry in chain {
        let class = entry.class();
        match class.base_precedence() {
            None => {
                if wilderness_seen {
                    return Err(LandError::DoubleWilderness {
                        name: entry.name.clone(),
                    });
                }
                if !base_supports_wilderness {
                    return Err(LandError::WildernessWithoutBase {
                        name: entry.name.clone(),
                    });
                }
                wilderness_seen = true;
            }
            Some(precedence) => {
                if let Some(previous) = last_base {
                    // Unwrap is safe: last_base only holds base classes.
                    if precedence < previous.base_precedence().unwrap() {
                        return Err(LandError::NestingOrder {
                            name: entry.name.clone(),
                            class: class.as_str(),
                            previous: previous.as_str(),
                        });
                    }
                }
                last_base = Some(class);
                if class.is_wilderness_base() {
                    base_supports_wilderness = true;
                }
            }
        }
    }

    Ok(())
}

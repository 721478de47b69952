//! Topographic prominence: peak estimate minus saddle estimate.

use std::fmt;
use std::str::FromStr;

use crate::elevation::{format_feet, Estimate};

/// Provenance tag for a prominence entry. The set is closed; anything else
/// in the tag position is a grammar error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProminenceTag {
    Clean,
    Peakbagger,
    ListsOfJohn,
}

impl ProminenceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ProminenceTag::Clean => "clean",
            ProminenceTag::Peakbagger => "Pb",
            ProminenceTag::ListsOfJohn => "LoJ",
        }
    }
}

impl fmt::Display for ProminenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProminenceTag {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clean" => Ok(ProminenceTag::Clean),
            "Pb" => Ok(ProminenceTag::Peakbagger),
            "LoJ" => Ok(ProminenceTag::ListsOfJohn),
            _ => Err(()),
        }
    }
}

/// One prominence entry, authored as `peak - saddle` estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct Prominence {
    pub peak: Estimate,
    pub saddle: Estimate,
    pub tag: Option<ProminenceTag>,
    pub annotation: Option<String>,
}

impl Prominence {
    pub fn avg(&self) -> f64 {
        self.peak.avg() - self.saddle.avg()
    }

    pub fn min(&self) -> i64 {
        self.peak.min() as i64 - self.saddle.max() as i64
    }

    pub fn max(&self) -> i64 {
        self.peak.max() as i64 - self.saddle.min() as i64
    }

    pub fn is_exact(&self) -> bool {
        !self.peak.is_range() && !self.saddle.is_range()
    }

    /// The bare value as displayed: a single figure when both estimates are
    /// spot heights, otherwise the possible range.
    pub fn display_value(&self) -> String {
        if self.is_exact() {
            format!("{}'", format_feet(self.avg() as u32))
        } else {
            format!(
                "{}-{}'",
                format_feet(self.min().max(0) as u32),
                format_feet(self.max().max(0) as u32)
            )
        }
    }

    /// Full rendering with tag and annotation, as exported.
    pub fn render(&self) -> String {
        let mut out = self.display_value();
        if let Some(tag) = self.tag {
            out.push_str(&format!(" ({tag})"));
        }
        if let Some(annotation) = &self.annotation {
            out.push_str(&format!(" [{annotation}]"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_prominence_displays_single_value() {
        let prominence = Prominence {
            peak: Estimate::spot(12123),
            saddle: Estimate::spot(8084),
            tag: None,
            annotation: None,
        };
        assert!(prominence.is_exact());
        assert_eq!(prominence.display_value(), "4,039'");
    }

    #[test]
    fn range_prominence_displays_bounds() {
        let prominence = Prominence {
            peak: Estimate {
                feet: 6240,
                interval: 40,
            },
            saddle: Estimate {
                feet: 5880,
                interval: 40,
            },
            tag: None,
            annotation: None,
        };
        assert_eq!(prominence.min(), 320);
        assert_eq!(prominence.max(), 400);
        assert!((prominence.avg() - 360.0).abs() < f64::EPSILON);
        assert_eq!(prominence.display_value(), "320-400'");
    }

    #[test]
    fn render_appends_tag_and_annotation() {
        let prominence = Prominence {
            peak: Estimate::spot(12123),
            saddle: Estimate::spot(8084),
            tag: Some(ProminenceTag::Clean),
            annotation: Some("saddle in Olancha Pass".into()),
        };
        assert_eq!(
            prominence.render(),
            "4,039' (clean) [saddle in Olancha Pass]"
        );
    }

    #[test]
    fn tags_round_trip() {
        for tag in [
            ProminenceTag::Clean,
            ProminenceTag::Peakbagger,
            ProminenceTag::ListsOfJohn,
        ] {
            assert_eq!(tag.as_str().parse::<ProminenceTag>().unwrap(), tag);
        }
        assert!("loj".parse::<ProminenceTag>().is_err());
    }
}

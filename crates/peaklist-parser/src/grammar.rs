//! Grammar table for the peak-register dialect.
//!
//! Every line shape the parser recognizes lives here as one compiled
//! pattern plus one matcher function returning a typed capture. Shapes are
//! dispatched in order of specificity at each position; cells are consumed
//! in the fixed per-entry order, so most matchers are tried against a line
//! whose expected kind is already known.

use once_cell::sync::Lazy;
use regex::Regex;

use peaklist_model::{Estimate, MapSeries, PeakFlags, ProminenceTag};

pub const TABLE_START: &str = "<table id=\"peaks\">";
pub const TABLE_END: &str = "</table>";
pub const ROW_END: &str = "</tr>";
pub const EMPTY_CELL: &str = "<td></td>";
pub const NOTE_OPEN: &str = "<div class=\"note\">";
pub const NOTE_CLOSE: &str = "</div>";

/// Entries allowed to omit the weather-link line entirely, mirroring
/// long-standing gaps in the source registers.
const WEATHER_GAPS: &[(&str, &str)] = &[("DPS", "1.3"), ("DPS", "9.5"), ("GBP", "11.2")];

pub fn weather_line_may_be_absent(list_code: &str, peak_id: &str) -> bool {
    WEATHER_GAPS
        .iter()
        .any(|(list, id)| *list == list_code && *id == peak_id)
}

/// Cell positions within an entry, used to name expectations in errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Id,
    Name,
    Land,
    Elevation,
    Grade,
    Prominence,
    Peakbagger,
    ListsOfJohn,
    SummitPost,
    Wikipedia,
    Extra,
    Weather,
    ClimbLog,
}

impl CellKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CellKind::Id => "id cell",
            CellKind::Name => "name cell",
            CellKind::Land => "land cell",
            CellKind::Elevation => "elevation cell",
            CellKind::Grade => "grade cell",
            CellKind::Prominence => "prominence cell",
            CellKind::Peakbagger => "Pb cell",
            CellKind::ListsOfJohn => "LoJ cell",
            CellKind::SummitPost => "SP cell",
            CellKind::Wikipedia => "W cell",
            CellKind::Extra => "extra cell",
            CellKind::Weather => "weather cell",
            CellKind::ClimbLog => "climb cell",
        }
    }
}

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<tr class="section"><td colspan="(?P<cols>\d+)">(?P<num>\d+)\. (?P<name>[^<(]+?)(?: \((?P<loc>[A-Z]{2}-[A-Z]{2}(?:/[A-Z]{2}-[A-Z]{2})*)\))?</td></tr>$"#,
    )
    .expect("section pattern compiles")
});

static PEAK_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<tr class="peak(?P<distinction> emblem| mtneer)?(?P<status> delisted| suspended)?(?P<climbed> climbed)?"(?: data-from="(?P<from>[^"]+)")?(?: data-also="(?P<also>[^"]+)")?(?: data-loc="(?P<loc>[A-Z]{2}-[A-Z]{2})")?>$"#,
    )
    .expect("peak row pattern compiles")
});

static ID_CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<td(?: id="(?P<anchor>[A-Z]+\d+\.\d+[ab]?)")?>(?P<id>\d+\.\d+[ab]?)</td>$"#)
        .expect("id cell pattern compiles")
});

static NAME_CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<td><a href="https://caltopo\.com/map\.html#ll=(?P<lat>-?\d{1,2}\.\d{4,6}),(?P<lng>-?\d{1,3}\.\d{4,6})&z=(?P<zoom>\d{2})">(?P<name>[^<]+)</a>(?P<suffix> \*| \+)?(?:<br>\((?P<alt>[^<)]+)\))?</td>$"#,
    )
    .expect("name cell pattern compiles")
});

static CELL_INNER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<td>(?P<inner>.*)</td>$").expect("cell pattern compiles"));

static LAND_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:<a href="(?P<url>https://[^"]+)">(?P<linked>[^<]+)</a>|(?P<plain>[^<]+?))(?P<hp> \(highest point\))?$"#,
    )
    .expect("land entry pattern compiles")
});

static ELEVATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<feet>\d{1,3}(?:,\d{3})*)'(?P<plus>\+)?(?: <a href="(?P<url>[^"]+)">(?P<text>[^<]+)</a>)?(?: \[(?P<ann>[^\]]+)\])?$"#,
    )
    .expect("elevation pattern compiles")
});

static TOPO_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://ngmdb\.usgs\.gov/topoview/(?P<mapid>[a-z0-9]+)$")
        .expect("topo url pattern compiles")
});

static TOPO_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^USGS (?P<series>7\.5'|15'|30') (?P<name>.+) \((?P<year>\d{4})\)$")
        .expect("topo text pattern compiles")
});

static SURVEY_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://www\.ngs\.noaa\.gov/cgi-bin/ds_mark\.prl\?PidBox=(?P<pid>[A-Z]{2}\d{4})$")
        .expect("survey url pattern compiles")
});

static SURVEY_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<designation>(?:BM|VABM) .+)$").expect("survey text pattern compiles")
});

static GRADE_CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<td>Class (?P<low>[1-6])(?:-(?P<high>[1-6]))?</td>$")
        .expect("grade cell pattern compiles")
});

static PROMINENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<pfeet>\d{1,3}(?:,\d{3})*)'(?P<pplus>\+)? - (?P<sfeet>\d{1,3}(?:,\d{3})*)'(?P<splus>\+)?(?: \((?P<tag>clean|Pb|LoJ)\))?(?: \[(?P<ann>[^\]]+)\])?$"#,
    )
    .expect("prominence pattern compiles")
});

static PEAKBAGGER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<td><a href="https://peakbagger\.com/peak\.aspx\?pid=(?P<id>\d+)">Pb</a></td>$"#)
        .expect("peakbagger cell pattern compiles")
});

static LISTSOFJOHN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<td><a href="https://listsofjohn\.com/peak/(?P<id>\d+)">LoJ</a></td>$"#)
        .expect("listsofjohn cell pattern compiles")
});

static SUMMITPOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<td><a href="https://www\.summitpost\.org/(?P<id>[a-z0-9-]+/\d+)">SP</a></td>$"#)
        .expect("summitpost cell pattern compiles")
});

static WIKIPEDIA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<td><a href="https://en\.wikipedia\.org/wiki/(?P<id>[^"]+)">W</a></td>$"#)
        .expect("wikipedia cell pattern compiles")
});

static WEATHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<td><a href="https://forecast\.weather\.gov/MapClick\.php\?lon=(?P<lng>-?\d{1,3}\.\d{4,6})&lat=(?P<lat>-?\d{1,2}\.\d{4,6})">WX</a></td>$"#,
    )
    .expect("weather cell pattern compiles")
});

/// Accepted display-name shapes. A name passes when at least one matches.
static NAME_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Mount Whitney, Mt. Russell
        r"^(?:Mount|Mt\.) [A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*$",
        // Olancha Peak, Black Kaweah, White Mountain Peak
        r"^[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)* (?:Peak|Mountain|Mountains|Butte|Dome|Point|Ridge|Crag|Crags|Needle|Needles|Bluff|Benchmark|Hill)$",
        // "Polemonium Peak" style unofficial names
        r#"^"[^"]{2,}"$"#,
        // Peak 11245
        r"^Peak \d{4,5}$",
        // North Guard-Mount Farquhar (hyphenated double names)
        r"^[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*-[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*$",
        // Mount Ansel-Adams
        r"^(?:Mount|Mt\.) [A-Z][a-z]+-[A-Z][a-z]+$",
        // Devil's Crag #1 and other possessives
        r"^[A-Z][a-z]+'s(?: [A-Z][A-Za-z]+)+(?: #\d+)?$",
        // Matterhorn Peak #2 style ordinals
        r"^[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)* #\d+$",
        // Mount McAdie, Mt. MacDonald, Mount O'Brien
        r"^(?:Mount|Mt\.) (?:Mc|Mac|O')[A-Z][a-z]+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("name shape pattern compiles"))
    .collect()
});

pub fn name_matches_accepted_shape(name: &str) -> bool {
    NAME_SHAPES.iter().any(|shape| shape.is_match(name))
}

/// Top-level constructs recognized between table start and end.
#[derive(Debug)]
pub enum TableLine {
    Section(SectionHeader),
    PeakStart(RowStart),
    TableEnd,
}

pub fn classify_table_line(line: &str) -> Option<TableLine> {
    if line == TABLE_END {
        return Some(TableLine::TableEnd);
    }
    if let Some(header) = match_section_header(line) {
        return Some(TableLine::Section(header));
    }
    match_peak_row(line).map(TableLine::PeakStart)
}

#[derive(Debug)]
pub struct SectionHeader {
    pub cols: u32,
    pub number: u32,
    pub name: String,
    pub location: Option<String>,
}

pub fn match_section_header(line: &str) -> Option<SectionHeader> {
    let caps = SECTION_RE.captures(line)?;
    Some(SectionHeader {
        cols: caps["cols"].parse().ok()?,
        number: caps["num"].parse().ok()?,
        name: caps["name"].to_owned(),
        location: caps.name("loc").map(|m| m.as_str().to_owned()),
    })
}

#[derive(Debug)]
pub struct RowStart {
    pub flags: PeakFlags,
    pub from: Option<String>,
    pub also: Option<String>,
    pub loc: Option<String>,
}

pub fn match_peak_row(line: &str) -> Option<RowStart> {
    let caps = PEAK_ROW_RE.captures(line)?;
    let mut flags = PeakFlags::default();
    match caps.name("distinction").map(|m| m.as_str()) {
        Some(" emblem") => flags.emblem = true,
        Some(" mtneer") => flags.mtneer = true,
        _ => {}
    }
    match caps.name("status").map(|m| m.as_str()) {
        Some(" delisted") => flags.delisted = true,
        Some(" suspended") => flags.suspended = true,
        _ => {}
    }
    flags.climbed = caps.name("climbed").is_some();
    Some(RowStart {
        flags,
        from: caps.name("from").map(|m| m.as_str().to_owned()),
        also: caps.name("also").map(|m| m.as_str().to_owned()),
        loc: caps.name("loc").map(|m| m.as_str().to_owned()),
    })
}

#[derive(Debug)]
pub struct IdCell {
    pub anchor: Option<String>,
    pub id: String,
}

pub fn match_id_cell(line: &str) -> Option<IdCell> {
    let caps = ID_CELL_RE.captures(line)?;
    Some(IdCell {
        anchor: caps.name("anchor").map(|m| m.as_str().to_owned()),
        id: caps["id"].to_owned(),
    })
}

#[derive(Debug)]
pub struct NameCell {
    pub lat: String,
    pub lng: String,
    pub zoom: u8,
    pub name: String,
    pub suffix: Option<char>,
    pub alt: Option<String>,
}

pub fn match_name_cell(line: &str) -> Option<NameCell> {
    let caps = NAME_CELL_RE.captures(line)?;
    let suffix = caps.name("suffix").map(|m| match m.as_str() {
        " *" => '*',
        _ => '+',
    });
    Some(NameCell {
        lat: caps["lat"].to_owned(),
        lng: caps["lng"].to_owned(),
        zoom: caps["zoom"].parse().ok()?,
        name: caps["name"].to_owned(),
        suffix,
        alt: caps.name("alt").map(|m| m.as_str().to_owned()),
    })
}

/// Inner content of a single-line `<td>…</td>` cell.
pub fn cell_inner(line: &str) -> Option<&str> {
    CELL_INNER_RE
        .captures(line)
        .and_then(|caps| caps.name("inner"))
        .map(|m| m.as_str())
}

#[derive(Debug)]
pub struct LandEntry {
    pub name: String,
    pub url: Option<String>,
    pub high_point: bool,
}

pub fn match_land_entry(entry: &str) -> Option<LandEntry> {
    let caps = LAND_ENTRY_RE.captures(entry)?;
    let (name, url) = match caps.name("linked") {
        Some(linked) => (
            linked.as_str().to_owned(),
            Some(caps["url"].to_owned()),
        ),
        None => (caps.name("plain")?.as_str().to_owned(), None),
    };
    Some(LandEntry {
        name,
        url,
        high_point: caps.name("hp").is_some(),
    })
}

#[derive(Debug)]
pub struct ElevationReading {
    pub feet: u32,
    pub is_range: bool,
    pub source: Option<(String, String)>,
    pub annotation: Option<String>,
}

pub fn match_elevation_reading(entry: &str) -> Option<ElevationReading> {
    let caps = ELEVATION_RE.captures(entry)?;
    let feet = peaklist_model::parse_feet(&caps["feet"])?;
    let source = caps
        .name("url")
        .map(|url| (url.as_str().to_owned(), caps["text"].to_owned()));
    Some(ElevationReading {
        feet,
        is_range: caps.name("plus").is_some(),
        source,
        annotation: caps.name("ann").map(|m| m.as_str().to_owned()),
    })
}

/// A decoded elevation provenance link.
#[derive(Debug)]
pub enum ProvenanceLink {
    Topo {
        map_id: String,
        series: MapSeries,
        name: String,
        year: u32,
    },
    Survey {
        pid: String,
        designation: String,
    },
}

pub fn match_provenance_link(url: &str, text: &str) -> Option<ProvenanceLink> {
    if let Some(url_caps) = TOPO_URL_RE.captures(url) {
        let text_caps = TOPO_TEXT_RE.captures(text)?;
        return Some(ProvenanceLink::Topo {
            map_id: url_caps["mapid"].to_owned(),
            series: MapSeries::from_label(&text_caps["series"])?,
            name: text_caps["name"].to_owned(),
            year: text_caps["year"].parse().ok()?,
        });
    }
    if let Some(url_caps) = SURVEY_URL_RE.captures(url) {
        let text_caps = SURVEY_TEXT_RE.captures(text)?;
        return Some(ProvenanceLink::Survey {
            pid: url_caps["pid"].to_owned(),
            designation: text_caps["designation"].to_owned(),
        });
    }
    None
}

#[derive(Debug)]
pub struct GradeCell {
    pub low: u8,
    pub high: Option<u8>,
}

pub fn match_grade_cell(line: &str) -> Option<GradeCell> {
    let caps = GRADE_CELL_RE.captures(line)?;
    Some(GradeCell {
        low: caps["low"].parse().ok()?,
        high: caps.name("high").and_then(|m| m.as_str().parse().ok()),
    })
}

#[derive(Debug)]
pub struct ProminenceEntry {
    pub peak: Estimate,
    pub saddle: Estimate,
    pub tag: Option<ProminenceTag>,
    pub annotation: Option<String>,
}

/// Contour-band estimates in prominence cells use the standard interval.
const PROMINENCE_BAND_INTERVAL: u32 = 40;

pub fn match_prominence_entry(entry: &str) -> Option<ProminenceEntry> {
    let caps = PROMINENCE_RE.captures(entry)?;
    let estimate = |feet_text: &str, plus: bool| -> Option<Estimate> {
        let feet = peaklist_model::parse_feet(feet_text)?;
        Some(Estimate {
            feet,
            interval: if plus { PROMINENCE_BAND_INTERVAL } else { 0 },
        })
    };
    Some(ProminenceEntry {
        peak: estimate(&caps["pfeet"], caps.name("pplus").is_some())?,
        saddle: estimate(&caps["sfeet"], caps.name("splus").is_some())?,
        tag: caps.name("tag").and_then(|m| m.as_str().parse().ok()),
        annotation: caps.name("ann").map(|m| m.as_str().to_owned()),
    })
}

/// Match one of the four catalog cells. `Some(None)` is the empty sentinel,
/// `Some(Some(id))` a valid link, `None` a grammar mismatch.
pub fn match_catalog_cell(line: &str, kind: CellKind) -> Option<Option<String>> {
    if line == EMPTY_CELL {
        return Some(None);
    }
    let pattern: &Regex = match kind {
        CellKind::Peakbagger => &PEAKBAGGER_RE,
        CellKind::ListsOfJohn => &LISTSOFJOHN_RE,
        CellKind::SummitPost => &SUMMITPOST_RE,
        CellKind::Wikipedia => &WIKIPEDIA_RE,
        _ => return None,
    };
    pattern
        .captures(line)
        .map(|caps| Some(caps["id"].to_owned()))
}

#[derive(Debug)]
pub struct WeatherLink {
    pub lat: String,
    pub lng: String,
}

pub fn match_weather_cell(line: &str) -> Option<WeatherLink> {
    let caps = WEATHER_RE.captures(line)?;
    Some(WeatherLink {
        lat: caps["lat"].to_owned(),
        lng: caps["lng"].to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_header_captures_location_override() {
        let header = match_section_header(
            r#"<tr class="section"><td colspan="13">3. Last Chance Range (US-NV/US-CA)</td></tr>"#,
        )
        .unwrap();
        assert_eq!(header.cols, 13);
        assert_eq!(header.number, 3);
        assert_eq!(header.name, "Last Chance Range");
        assert_eq!(header.location.as_deref(), Some("US-NV/US-CA"));
    }

    #[test]
    fn peak_row_rejects_misordered_classes() {
        assert!(match_peak_row(r#"<tr class="peak emblem climbed">"#).is_some());
        assert!(match_peak_row(r#"<tr class="peak climbed emblem">"#).is_none());
        assert!(match_peak_row(r#"<tr class="peak emblem mtneer">"#).is_none());
    }

    #[test]
    fn peak_row_captures_attributes() {
        let row = match_peak_row(
            r#"<tr class="peak climbed" data-from="SPS 1.1" data-loc="MX-BC">"#,
        )
        .unwrap();
        assert!(row.flags.climbed);
        assert!(!row.flags.emblem);
        assert_eq!(row.from.as_deref(), Some("SPS 1.1"));
        assert_eq!(row.loc.as_deref(), Some("MX-BC"));
    }

    #[test]
    fn name_cell_captures_coordinates_and_suffix() {
        let cell = match_name_cell(
            r#"<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a> *<br>(Olancha Pk)</td>"#,
        )
        .unwrap();
        assert_eq!(cell.lat, "36.265444");
        assert_eq!(cell.lng, "-118.118131");
        assert_eq!(cell.zoom, 15);
        assert_eq!(cell.suffix, Some('*'));
        assert_eq!(cell.alt.as_deref(), Some("Olancha Pk"));
    }

    #[test]
    fn elevation_reading_decodes_topo_provenance() {
        let reading = match_elevation_reading(
            r#"12,123' <a href="https://ngmdb.usgs.gov/topoview/o36118b1">USGS 7.5' Olancha (1984)</a>"#,
        )
        .unwrap();
        assert_eq!(reading.feet, 12123);
        assert!(!reading.is_range);
        let (url, text) = reading.source.unwrap();
        match match_provenance_link(&url, &text).unwrap() {
            ProvenanceLink::Topo {
                map_id,
                series,
                name,
                year,
            } => {
                assert_eq!(map_id, "o36118b1");
                assert_eq!(series, MapSeries::SevenAndHalfMinute);
                assert_eq!(name, "Olancha");
                assert_eq!(year, 1984);
            }
            other => panic!("expected topo link, got {other:?}"),
        }
    }

    #[test]
    fn elevation_reading_rejects_bad_grouping() {
        assert!(match_elevation_reading("12123'").is_none());
        assert!(match_elevation_reading("1,21,23'").is_none());
    }

    #[test]
    fn prominence_entry_carries_band_estimates() {
        let entry = match_prominence_entry("6,240'+ - 5,880'+ (clean)").unwrap();
        assert_eq!(entry.peak.feet, 6240);
        assert_eq!(entry.peak.interval, 40);
        assert_eq!(entry.saddle.interval, 40);
        assert_eq!(entry.tag, Some(ProminenceTag::Clean));
    }

    #[test]
    fn accepted_name_shapes_cover_register_names() {
        for name in [
            "Mount Whitney",
            "Mt. Russell",
            "Olancha Peak",
            "\"Polemonium Peak\"",
            "Peak 11245",
            "North Guard-Mount Farquhar",
            "Devil's Crag #1",
            "Matterhorn Peak #2",
            "Mount McAdie",
        ] {
            assert!(name_matches_accepted_shape(name), "rejected {name:?}");
        }
        for name in ["olancha peak", "Olancha", "Peak", "X"] {
            assert!(!name_matches_accepted_shape(name), "accepted {name:?}");
        }
    }

    #[test]
    fn catalog_cells_accept_links_and_sentinel() {
        assert_eq!(
            match_catalog_cell(EMPTY_CELL, CellKind::Peakbagger),
            Some(None)
        );
        assert_eq!(
            match_catalog_cell(
                r#"<td><a href="https://peakbagger.com/peak.aspx?pid=2516">Pb</a></td>"#,
                CellKind::Peakbagger
            ),
            Some(Some("2516".to_owned()))
        );
        assert_eq!(
            match_catalog_cell(
                r#"<td><a href="https://peakbagger.com/peak.aspx?pid=2516">Pb</a></td>"#,
                CellKind::ListsOfJohn
            ),
            None
        );
    }
}

//! Single-pass document parser with interleaved validation.
//!
//! Cells are consumed in a fixed, mandatory order per entry; every
//! invariant that depends only on already-parsed state is checked the
//! moment its inputs are complete, so no partially-validated model ever
//! escapes this module.

use tracing::debug;

use peaklist_config::ListSettings;
use peaklist_model::{
    check_elevation_order, check_id_sequence, check_land_chain, CatalogIds, Elevation,
    ElevationSource, Grade, LandUse, ListedId, Peak, PeakFlags, PeakId, PeakList, Prominence,
    RunContext, Section, WeatherCell,
};

use crate::climb;
use crate::cursor::LineCursor;
use crate::error::{ParseError, ParseResult};
use crate::grammar::{self, CellKind, ProvenanceLink, RowStart, SectionHeader, TableLine};
use crate::Document;

/// Columns in the entry table: id, name, land, elevation, grade,
/// prominence, four catalogs, weather, climb log.
const BASE_COLUMN_COUNT: u32 = 12;

/// Parse and validate one list document. Registries in `ctx` are populated
/// as provenance sources and land areas are first seen.
pub fn parse_document(
    contents: &str,
    settings: &ListSettings,
    ctx: &mut RunContext,
) -> ParseResult<Document> {
    Parser {
        cursor: LineCursor::new(contents),
        settings,
        ctx,
    }
    .run()
}

struct Parser<'a> {
    cursor: LineCursor<'a>,
    settings: &'a ListSettings,
    ctx: &'a mut RunContext,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> ParseResult<Document> {
        let mut preamble = Vec::new();
        loop {
            match self.cursor.next() {
                None => {
                    return Err(self.err(
                        "grammar",
                        format!("missing table start '{}'", grammar::TABLE_START),
                    ))
                }
                Some(line) if line == grammar::TABLE_START => break,
                Some(line) => preamble.push(line.to_owned()),
            }
        }

        let mut sections: Vec<Section> = Vec::new();
        let mut total_peaks = 0usize;
        loop {
            let line = self.expect_line("section header, peak row, or table end")?;
            match grammar::classify_table_line(line) {
                Some(TableLine::TableEnd) => break,
                Some(TableLine::Section(header)) => {
                    let section = self.build_section(header, sections.len())?;
                    debug!(section = section.number, name = %section.name, "parsed section header");
                    sections.push(section);
                }
                Some(TableLine::PeakStart(row)) => {
                    let section = sections.last_mut().ok_or_else(|| {
                        ParseError::new(
                            self.cursor.line_number(),
                            "grammar",
                            "peak row before any section header",
                        )
                    })?;
                    let section_number = section.number;
                    let country = section.country.clone();
                    let state = section.state.clone();
                    let prev = section.peaks.last().map(|peak| peak.id);
                    let peak = self.parse_peak(row, section_number, &country, &state, prev)?;
                    total_peaks += 1;
                    section.peaks.push(peak);
                }
                None => {
                    return Err(self.err(
                        "grammar",
                        format!("'{line}' is not a section header, peak row, or table end"),
                    ))
                }
            }
        }

        if sections.len() != self.settings.sections {
            return Err(self.err(
                "count-mismatch",
                format!(
                    "list {} declares {} sections but the table has {}",
                    self.settings.code,
                    self.settings.sections,
                    sections.len()
                ),
            ));
        }
        if total_peaks != self.settings.peaks {
            return Err(self.err(
                "count-mismatch",
                format!(
                    "list {} declares {} peaks but the table has {}",
                    self.settings.code, self.settings.peaks, total_peaks
                ),
            ));
        }

        let mut postamble = Vec::new();
        while let Some(line) = self.cursor.next() {
            postamble.push(line.to_owned());
        }

        debug!(
            list = %self.settings.code,
            sections = sections.len(),
            peaks = total_peaks,
            "parsed document"
        );

        Ok(Document {
            list: PeakList {
                code: self.settings.code.clone(),
                name: self.settings.name.clone(),
                expected_peaks: self.settings.peaks,
                expected_sections: self.settings.sections,
                country: self.settings.country.clone(),
                state: self.settings.state.clone(),
                extra_column: self.settings.extra_column,
                rank: self.settings.rank,
                sections,
            },
            preamble,
            postamble,
        })
    }

    fn build_section(&mut self, header: SectionHeader, seen: usize) -> ParseResult<Section> {
        let expected_cols = BASE_COLUMN_COUNT + u32::from(self.settings.extra_column);
        if header.cols != expected_cols {
            return Err(self.err(
                "grammar",
                format!(
                    "section header colspan {} but the table has {expected_cols} columns",
                    header.cols
                ),
            ));
        }
        let expected_number = seen as u32 + 1;
        if header.number != expected_number {
            return Err(self.err(
                "section-sequence",
                format!(
                    "section header numbered {} but {} sections seen; expected {expected_number}",
                    header.number, seen
                ),
            ));
        }

        let (country, state) = match &header.location {
            Some(location) => split_location(location),
            None => (
                self.settings.country.clone(),
                self.settings.state.clone(),
            ),
        };

        Ok(Section {
            number: header.number,
            name: header.name,
            location: header.location,
            country,
            state,
            peaks: Vec::new(),
        })
    }

    fn parse_peak(
        &mut self,
        row: RowStart,
        section_number: u32,
        country: &str,
        state: &str,
        prev: Option<PeakId>,
    ) -> ParseResult<Peak> {
        let alias_of = match &row.from {
            Some(from) => Some(self.parse_listed_id(from)?),
            None => None,
        };
        if let Some(reference) = &alias_of {
            if reference.list == self.settings.code {
                return Err(self.err(
                    "alias-ref",
                    format!("alias reference '{reference}' must name another list"),
                ));
            }
        }
        let also_listed = match &row.also {
            Some(also) => also
                .split(", ")
                .map(|item| self.parse_listed_id(item))
                .collect::<ParseResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let (id, has_anchor) = self.parse_id_cell(section_number, prev)?;
        let listed_id = ListedId {
            list: self.settings.code.clone(),
            id,
        };
        debug!(peak = %listed_id, "parsing entry");

        let name_cell = self.parse_name_cell(&row.flags)?;
        let land_areas = self.parse_land_cell(&listed_id)?;
        let elevations = self.parse_elevation_cell()?;
        let grade = self.parse_grade_cell()?;
        let prominences = self.parse_prominence_cell(&elevations)?;

        let catalogs = CatalogIds {
            peakbagger: self.parse_catalog_cell(CellKind::Peakbagger)?,
            listsofjohn: self.parse_catalog_cell(CellKind::ListsOfJohn)?,
            summitpost: self.parse_catalog_cell(CellKind::SummitPost)?,
            wikipedia: self.parse_catalog_cell(CellKind::Wikipedia)?,
        };

        let extra = if self.settings.extra_column {
            Some(self.parse_extra_cell()?)
        } else {
            None
        };

        let (weather, carried) =
            self.parse_weather_cell(&listed_id, &name_cell.lat, &name_cell.lng)?;

        let climbs = self.parse_climb_cell_and_row_end(&row.flags, carried)?;

        let (country, state) = match &row.loc {
            Some(location) => split_location(location),
            None => (country.to_owned(), state.to_owned()),
        };

        Ok(Peak {
            id,
            list_code: self.settings.code.clone(),
            name: name_cell.name,
            alt_name: name_cell.alt,
            has_anchor,
            latitude: name_cell.lat,
            longitude: name_cell.lng,
            zoom: name_cell.zoom,
            loc_override: row.loc,
            country,
            state,
            elevations,
            prominences,
            land_areas,
            grade,
            catalogs,
            extra,
            weather,
            climbs,
            flags: row.flags,
            alias_of,
            also_listed,
        })
    }

    fn parse_id_cell(
        &mut self,
        section_number: u32,
        prev: Option<PeakId>,
    ) -> ParseResult<(PeakId, bool)> {
        let line = self.expect_cell(CellKind::Id)?;
        let cell = grammar::match_id_cell(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Id, line))?;
        let id: PeakId = cell
            .id
            .parse()
            .map_err(|_| self.err("grammar", format!("bad peak id '{}'", cell.id)))?;

        if id.section != section_number {
            return Err(self.err(
                "id-sequence",
                format!("peak id '{id}' is not in section {section_number}"),
            ));
        }
        check_id_sequence(section_number, prev.as_ref(), &id)
            .map_err(|violation| self.err("id-sequence", violation.to_string()))?;

        if let Some(anchor) = &cell.anchor {
            let expected = format!("{}{}", self.settings.code, id);
            if *anchor != expected {
                return Err(self.err(
                    "anchor",
                    format!("anchor id '{anchor}' must equal '{expected}'"),
                ));
            }
        }

        Ok((id, cell.anchor.is_some()))
    }

    fn parse_name_cell(&mut self, flags: &PeakFlags) -> ParseResult<grammar::NameCell> {
        let line = self.expect_cell(CellKind::Name)?;
        let cell = grammar::match_name_cell(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Name, line))?;

        if !(10..=18).contains(&cell.zoom) {
            return Err(self.err(
                "grammar",
                format!("zoom level {} outside 10..=18", cell.zoom),
            ));
        }
        if !grammar::name_matches_accepted_shape(&cell.name) {
            return Err(self.err(
                "name-shape",
                format!("'{}' matches no accepted name shape", cell.name),
            ));
        }

        let expected_suffix = if flags.emblem {
            Some('*')
        } else if flags.mtneer {
            Some('+')
        } else {
            None
        };
        if cell.suffix != expected_suffix {
            return Err(self.err(
                "status-flags",
                match expected_suffix {
                    Some(suffix) => format!("name cell must carry ' {suffix}' for this row class"),
                    None => "name suffix requires an emblem or mtneer row class".to_owned(),
                },
            ));
        }

        Ok(cell)
    }

    fn parse_land_cell(&mut self, peak: &ListedId) -> ParseResult<Vec<LandUse>> {
        let line = self.expect_cell(CellKind::Land)?;
        if line == grammar::EMPTY_CELL {
            return Ok(Vec::new());
        }
        let inner = grammar::cell_inner(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Land, line))?;

        let mut chain = Vec::new();
        for entry in inner.split("<br>") {
            let matched = grammar::match_land_entry(entry)
                .ok_or_else(|| self.err("grammar", format!("bad land entry '{entry}'")))?;
            chain.push(LandUse {
                name: matched.name,
                url: matched.url,
                high_point: matched.high_point,
            });
        }

        check_land_chain(&chain).map_err(|violation| self.err("land-nesting", violation.to_string()))?;
        for entry in &chain {
            self.ctx.lands.record_use(entry, peak).map_err(|violation| {
                let rule = match violation {
                    peaklist_model::LandError::BadLink { .. } => "land-link",
                    _ => "land-registry",
                };
                self.err(rule, violation.to_string())
            })?;
        }

        Ok(chain)
    }

    fn parse_elevation_cell(&mut self) -> ParseResult<Vec<Elevation>> {
        let line = self.expect_cell(CellKind::Elevation)?;
        let inner = grammar::cell_inner(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Elevation, line))?;

        let mut readings = Vec::new();
        for entry in inner.split("<br>") {
            let matched = grammar::match_elevation_reading(entry)
                .ok_or_else(|| self.err("grammar", format!("bad elevation reading '{entry}'")))?;

            let source = match matched.source {
                None => ElevationSource::None,
                Some((url, text)) => match grammar::match_provenance_link(&url, &text) {
                    Some(ProvenanceLink::Topo {
                        map_id,
                        series,
                        name,
                        year,
                    }) => {
                        self.ctx
                            .topos
                            .register(peaklist_model::TopoMap {
                                id: map_id.clone(),
                                series,
                                name,
                                year,
                            })
                            .map_err(|conflict| self.err("registry", conflict.to_string()))?;
                        ElevationSource::Topo { map_id }
                    }
                    Some(ProvenanceLink::Survey { pid, designation }) => {
                        self.ctx
                            .surveys
                            .register(peaklist_model::SurveyStation {
                                pid: pid.clone(),
                                designation,
                            })
                            .map_err(|conflict| self.err("registry", conflict.to_string()))?;
                        ElevationSource::Survey { pid }
                    }
                    None => {
                        return Err(self.err(
                            "grammar",
                            format!("unrecognized elevation provenance link '{url}'"),
                        ))
                    }
                },
            };

            readings.push(Elevation {
                feet: matched.feet,
                is_range: matched.is_range,
                annotation: matched.annotation,
                source,
            });
        }

        check_elevation_order(&readings, self.ctx)
            .map_err(|violation| self.err("elevation-order", violation.to_string()))?;

        Ok(readings)
    }

    fn parse_grade_cell(&mut self) -> ParseResult<Option<Grade>> {
        let line = self.expect_cell(CellKind::Grade)?;
        if line == grammar::EMPTY_CELL {
            return Ok(None);
        }
        let cell = grammar::match_grade_cell(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Grade, line))?;
        let grade = Grade::new(cell.low, cell.high).ok_or_else(|| {
            self.err(
                "grammar",
                format!(
                    "grade range 'Class {}-{}' must increase",
                    cell.low,
                    cell.high.unwrap_or(cell.low)
                ),
            )
        })?;
        Ok(Some(grade))
    }

    fn parse_prominence_cell(&mut self, elevations: &[Elevation]) -> ParseResult<Vec<Prominence>> {
        let line = self.expect_cell(CellKind::Prominence)?;
        let inner = grammar::cell_inner(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Prominence, line))?;

        let mut entries = Vec::new();
        for entry in inner.split("<br>") {
            let matched = grammar::match_prominence_entry(entry)
                .ok_or_else(|| self.err("grammar", format!("bad prominence entry '{entry}'")))?;
            entries.push(Prominence {
                peak: matched.peak,
                saddle: matched.saddle,
                tag: matched.tag,
                annotation: matched.annotation,
            });
        }

        // The authoritative entry must agree with the primary elevation
        // reading in both value and range-ness.
        let primary = &elevations[0];
        let first = &entries[0];
        if first.peak.feet != primary.feet || first.peak.is_range() != primary.is_range {
            return Err(self.err(
                "prominence-arithmetic",
                format!(
                    "prominence peak estimate {}'{} does not match primary elevation {}'{}",
                    peaklist_model::format_feet(first.peak.feet),
                    if first.peak.is_range() { "+" } else { "" },
                    peaklist_model::format_feet(primary.feet),
                    if primary.is_range { "+" } else { "" },
                ),
            ));
        }

        Ok(entries)
    }

    fn parse_catalog_cell(&mut self, kind: CellKind) -> ParseResult<Option<String>> {
        let line = self.expect_cell(kind)?;
        grammar::match_catalog_cell(line, kind).ok_or_else(|| self.cell_mismatch(kind, line))
    }

    fn parse_extra_cell(&mut self) -> ParseResult<String> {
        let line = self.expect_cell(CellKind::Extra)?;
        let inner = grammar::cell_inner(line)
            .ok_or_else(|| self.cell_mismatch(CellKind::Extra, line))?;
        if inner.contains('<') {
            return Err(self.cell_mismatch(CellKind::Extra, line));
        }
        Ok(inner.to_owned())
    }

    /// Returns the weather state plus, when the line was absent for an
    /// allow-listed entry, the already-read line that belongs to the next
    /// position.
    fn parse_weather_cell(
        &mut self,
        peak: &ListedId,
        lat: &str,
        lng: &str,
    ) -> ParseResult<(WeatherCell, Option<&'a str>)> {
        let line = self.expect_cell(CellKind::Weather)?;

        if line == grammar::EMPTY_CELL {
            return Ok((WeatherCell::Empty, None));
        }
        if let Some(link) = grammar::match_weather_cell(line) {
            if link.lat != lat || link.lng != lng {
                return Err(self.err(
                    "weather-link",
                    format!(
                        "weather link points at ({}, {}) but the peak is at ({lat}, {lng})",
                        link.lat, link.lng
                    ),
                ));
            }
            return Ok((WeatherCell::Link, None));
        }
        if grammar::weather_line_may_be_absent(&peak.list, &peak.id.to_string()) {
            return Ok((WeatherCell::Absent, Some(line)));
        }
        Err(self.cell_mismatch(CellKind::Weather, line))
    }

    fn parse_climb_cell_and_row_end(
        &mut self,
        flags: &PeakFlags,
        carried: Option<&'a str>,
    ) -> ParseResult<Vec<peaklist_model::ClimbRecord>> {
        let line = match carried {
            Some(line) => line,
            None => self.expect_line("climb cell or row end")?,
        };

        if !flags.climbed {
            if line == grammar::ROW_END {
                return Ok(Vec::new());
            }
            if line.starts_with("<td>") {
                return Err(self.err(
                    "status-flags",
                    "climb log present without the climbed row class",
                ));
            }
            return Err(self.err("grammar", format!("expected '{}'", grammar::ROW_END)));
        }

        if line == grammar::ROW_END {
            return Err(self.err(
                "status-flags",
                "climbed row class without a climb log cell",
            ));
        }

        let start_line = self.cursor.line_number();
        let first = line
            .strip_prefix("<td>")
            .ok_or_else(|| self.cell_mismatch(CellKind::ClimbLog, line))?;

        let mut parts: Vec<&str> = vec![first];
        let mut in_note = note_state_after(first, false, self)?;
        while in_note || !parts.last().expect("non-empty").ends_with("</td>") {
            let next = self.expect_line("climb cell continuation")?;
            if in_note && !next.starts_with(grammar::NOTE_CLOSE) {
                if next.contains("<br>") || next.contains(grammar::NOTE_OPEN) {
                    return Err(self.err(
                        "grammar",
                        "climb note lines cannot contain '<br>' or open another note",
                    ));
                }
                parts.push(next);
                continue;
            }
            in_note = note_state_after(next, in_note, self)?;
            parts.push(next);
        }

        let mut content = parts.join("\n");
        content.truncate(content.len() - "</td>".len());

        let records = climb::parse_climb_cell(&content, start_line)?;

        let row_end = self.expect_line("row end")?;
        if row_end != grammar::ROW_END {
            return Err(self.err("grammar", format!("expected '{}'", grammar::ROW_END)));
        }

        Ok(records)
    }

    fn parse_listed_id(&self, text: &str) -> ParseResult<ListedId> {
        text.parse()
            .map_err(|_| self.err("grammar", format!("bad list-qualified id '{text}'")))
    }

    fn expect_cell(&mut self, kind: CellKind) -> ParseResult<&'a str> {
        self.expect_line(kind.as_str())
    }

    fn expect_line(&mut self, what: &str) -> ParseResult<&'a str> {
        self.cursor.next().ok_or_else(|| {
            ParseError::new(
                self.cursor.line_number() + 1,
                "grammar",
                format!("unexpected end of input; expected {what}"),
            )
        })
    }

    fn cell_mismatch(&self, kind: CellKind, line: &str) -> ParseError {
        self.err(
            "grammar",
            format!("'{line}' does not match the {}", kind.as_str()),
        )
    }

    fn err(&self, rule: &'static str, message: impl Into<String>) -> ParseError {
        ParseError::new(self.cursor.line_number(), rule, message)
    }
}

/// Track note-block state across one physical line of a climb cell.
/// Outside a note, a line either opens one (ending with the marker) or ends
/// the cell; inside, only a closing line changes state.
fn note_state_after(line: &str, in_note: bool, parser: &Parser<'_>) -> Result<bool, ParseError> {
    if line.ends_with(grammar::NOTE_OPEN) {
        return Ok(true);
    }
    if in_note && line.starts_with(grammar::NOTE_CLOSE) && !line.ends_with("</td>") {
        return Err(parser.err(
            "grammar",
            "climb note close must continue with '<br>' records or end the cell",
        ));
    }
    if !in_note || line.starts_with(grammar::NOTE_CLOSE) {
        if !line.ends_with("</td>") && !line.ends_with(grammar::NOTE_OPEN) {
            return Err(parser.err(
                "grammar",
                "climb cell line must end with the note marker or '</td>'",
            ));
        }
        return Ok(false);
    }
    Ok(in_note)
}

fn split_location(location: &str) -> (String, String) {
    let first = location.split('/').next().expect("split yields one item");
    let (country, state) = first.split_once('-').expect("location shape is CC-SS");
    (country.to_owned(), state.to_owned())
}

//! Document writer: regenerates a list document from model state.
//!
//! Passthrough text is reproduced verbatim; every table construct is
//! re-derived from the entities, which is what makes parse → write a
//! byte-exact round trip when the model is untouched in between.

use peaklist_model::{
    format_feet, Elevation, ElevationSource, Estimate, LandUse, Peak, PeakList, Prominence,
    RunContext, Section, WeatherCell,
};

use crate::climb;
use crate::grammar::{EMPTY_CELL, ROW_END, TABLE_END, TABLE_START};
use crate::Document;

/// Render the whole document. Provenance registries must contain every map
/// and station referenced by the model, which parsing guarantees.
pub fn write_document(document: &Document, ctx: &RunContext) -> String {
    let mut out = String::new();

    for line in &document.preamble {
        out.push_str(line);
        out.push('\n');
    }

    out.push_str(TABLE_START);
    out.push('\n');
    for section in &document.list.sections {
        write_section_header(&mut out, &document.list, section);
        for peak in &section.peaks {
            write_peak(&mut out, &document.list, peak, ctx);
        }
    }
    out.push_str(TABLE_END);
    out.push('\n');

    for line in &document.postamble {
        out.push_str(line);
        out.push('\n');
    }

    out
}

fn write_section_header(out: &mut String, list: &PeakList, section: &Section) {
    let cols = 12 + u32::from(list.extra_column);
    out.push_str(&format!(
        "<tr class=\"section\"><td colspan=\"{cols}\">{}. {}",
        section.number, section.name
    ));
    if let Some(location) = &section.location {
        out.push_str(&format!(" ({location})"));
    }
    out.push_str("</td></tr>\n");
}

fn write_peak(out: &mut String, list: &PeakList, peak: &Peak, ctx: &RunContext) {
    write_row_start(out, peak);

    if peak.has_anchor {
        out.push_str(&format!(
            "<td id=\"{}{}\">{}</td>\n",
            peak.list_code, peak.id, peak.id
        ));
    } else {
        out.push_str(&format!("<td>{}</td>\n", peak.id));
    }

    write_name_cell(out, peak);
    write_land_cell(out, &peak.land_areas);
    write_elevation_cell(out, &peak.elevations, ctx);

    match &peak.grade {
        Some(grade) => out.push_str(&format!("<td>{grade}</td>\n")),
        None => {
            out.push_str(EMPTY_CELL);
            out.push('\n');
        }
    }

    write_prominence_cell(out, &peak.prominences);

    write_catalog_cell(out, peak.catalogs.peakbagger.as_deref(), "Pb", |id| {
        format!("https://peakbagger.com/peak.aspx?pid={id}")
    });
    write_catalog_cell(out, peak.catalogs.listsofjohn.as_deref(), "LoJ", |id| {
        format!("https://listsofjohn.com/peak/{id}")
    });
    write_catalog_cell(out, peak.catalogs.summitpost.as_deref(), "SP", |id| {
        format!("https://www.summitpost.org/{id}")
    });
    write_catalog_cell(out, peak.catalogs.wikipedia.as_deref(), "W", |id| {
        format!("https://en.wikipedia.org/wiki/{id}")
    });

    if list.extra_column {
        out.push_str(&format!(
            "<td>{}</td>\n",
            peak.extra.as_deref().unwrap_or("")
        ));
    }

    match peak.weather {
        WeatherCell::Link => out.push_str(&format!(
            "<td><a href=\"https://forecast.weather.gov/MapClick.php?lon={}&lat={}\">WX</a></td>\n",
            peak.longitude, peak.latitude
        )),
        WeatherCell::Empty => {
            out.push_str(EMPTY_CELL);
            out.push('\n');
        }
        WeatherCell::Absent => {}
    }

    if peak.flags.climbed {
        out.push_str("<td>");
        out.push_str(&climb::render_climbs(&peak.climbs));
        out.push_str("</td>\n");
    }

    out.push_str(ROW_END);
    out.push('\n');
}

fn write_row_start(out: &mut String, peak: &Peak) {
    let mut classes = String::from("peak");
    if peak.flags.emblem {
        classes.push_str(" emblem");
    } else if peak.flags.mtneer {
        classes.push_str(" mtneer");
    }
    if peak.flags.delisted {
        classes.push_str(" delisted");
    } else if peak.flags.suspended {
        classes.push_str(" suspended");
    }
    if peak.flags.climbed {
        classes.push_str(" climbed");
    }

    out.push_str(&format!("<tr class=\"{classes}\""));
    if let Some(reference) = &peak.alias_of {
        out.push_str(&format!(" data-from=\"{reference}\""));
    }
    if !peak.also_listed.is_empty() {
        let peers: Vec<String> = peak.also_listed.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!(" data-also=\"{}\"", peers.join(", ")));
    }
    if let Some(location) = &peak.loc_override {
        out.push_str(&format!(" data-loc=\"{location}\""));
    }
    out.push_str(">\n");
}

fn write_name_cell(out: &mut String, peak: &Peak) {
    out.push_str(&format!(
        "<td><a href=\"https://caltopo.com/map.html#ll={},{}&z={}\">{}</a>",
        peak.latitude, peak.longitude, peak.zoom, peak.name
    ));
    if peak.flags.emblem {
        out.push_str(" *");
    } else if peak.flags.mtneer {
        out.push_str(" +");
    }
    if let Some(alt) = &peak.alt_name {
        out.push_str(&format!("<br>({alt})"));
    }
    out.push_str("</td>\n");
}

fn write_land_cell(out: &mut String, chain: &[LandUse]) {
    if chain.is_empty() {
        out.push_str(EMPTY_CELL);
        out.push('\n');
        return;
    }

    let entries: Vec<String> = chain
        .iter()
        .map(|entry| {
            let mut rendered = match &entry.url {
                Some(url) => format!("<a href=\"{url}\">{}</a>", entry.name),
                None => entry.name.clone(),
            };
            if entry.high_point {
                rendered.push_str(" (highest point)");
            }
            rendered
        })
        .collect();
    out.push_str(&format!("<td>{}</td>\n", entries.join("<br>")));
}

fn write_elevation_cell(out: &mut String, readings: &[Elevation], ctx: &RunContext) {
    let entries: Vec<String> = readings
        .iter()
        .map(|reading| render_elevation(reading, ctx))
        .collect();
    out.push_str(&format!("<td>{}</td>\n", entries.join("<br>")));
}

fn render_elevation(reading: &Elevation, ctx: &RunContext) -> String {
    let mut rendered = format!(
        "{}'{}",
        format_feet(reading.feet),
        if reading.is_range { "+" } else { "" }
    );

    match &reading.source {
        ElevationSource::None => {}
        ElevationSource::Topo { map_id } => {
            let map = ctx
                .topos
                .get(map_id)
                .expect("topo map registered during parse");
            rendered.push_str(&format!(
                " <a href=\"https://ngmdb.usgs.gov/topoview/{}\">USGS {} {} ({})</a>",
                map.id,
                map.series.label(),
                map.name,
                map.year
            ));
        }
        ElevationSource::Survey { pid } => {
            let station = ctx
                .surveys
                .get(pid)
                .expect("survey station registered during parse");
            rendered.push_str(&format!(
                " <a href=\"https://www.ngs.noaa.gov/cgi-bin/ds_mark.prl?PidBox={}\">{}</a>",
                station.pid, station.designation
            ));
        }
    }

    if let Some(annotation) = &reading.annotation {
        rendered.push_str(&format!(" [{annotation}]"));
    }

    rendered
}

fn write_prominence_cell(out: &mut String, entries: &[Prominence]) {
    let rendered: Vec<String> = entries
        .iter()
        .map(|prominence| {
            let mut entry = format!(
                "{} - {}",
                render_estimate(prominence.peak),
                render_estimate(prominence.saddle)
            );
            if let Some(tag) = prominence.tag {
                entry.push_str(&format!(" ({tag})"));
            }
            if let Some(annotation) = &prominence.annotation {
                entry.push_str(&format!(" [{annotation}]"));
            }
            entry
        })
        .collect();
    out.push_str(&format!("<td>{}</td>\n", rendered.join("<br>")));
}

fn render_estimate(estimate: Estimate) -> String {
    format!(
        "{}'{}",
        format_feet(estimate.feet),
        if estimate.is_range() { "+" } else { "" }
    )
}

fn write_catalog_cell(
    out: &mut String,
    id: Option<&str>,
    label: &str,
    url: impl Fn(&str) -> String,
) {
    match id {
        Some(id) => out.push_str(&format!("<td><a href=\"{}\">{label}</a></td>\n", url(id))),
        None => {
            out.push_str(EMPTY_CELL);
            out.push('\n');
        }
    }
}

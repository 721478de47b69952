use std::path::PathBuf;

use peaklist_config::ListSettings;
use peaklist_model::{ElevationSource, RunContext, WeatherCell};
use peaklist_parser::{parse_document, write_document};
use pretty_assertions::assert_eq;

const MINIMAL: &str = include_str!("registers/minimal.html");
const SPS: &str = include_str!("registers/sps.html");
const DPS: &str = include_str!("registers/dps.html");

fn settings(code: &str, peaks: usize, sections: usize, extra_column: bool) -> ListSettings {
    ListSettings {
        code: code.to_owned(),
        name: "Test List".to_owned(),
        file: PathBuf::from("test.html"),
        peaks,
        sections,
        country: "US".to_owned(),
        state: "CA".to_owned(),
        extra_column,
        rank: 1,
    }
}

#[test]
fn minimal_document_round_trips_byte_identical() {
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let document = parse_document(MINIMAL, &settings, &mut ctx).unwrap();

    assert_eq!(document.preamble, vec!["<p>Register of peaks.</p>"]);
    assert_eq!(document.postamble, vec!["<p>End of register.</p>"]);

    let peak = document.list.peak(&"1.1".parse().unwrap()).unwrap();
    assert_eq!(peak.name, "Olancha Peak");
    assert_eq!(peak.elevations.len(), 1);
    assert_eq!(peak.elevations[0].source, ElevationSource::None);
    assert_eq!(peak.weather, WeatherCell::Empty);

    assert_eq!(write_document(&document, &ctx), MINIMAL);
}

#[test]
fn full_register_round_trips_byte_identical() {
    let settings = settings("SPS", 4, 2, false);
    let mut ctx = RunContext::new();
    let document = parse_document(SPS, &settings, &mut ctx).unwrap();
    assert_eq!(write_document(&document, &ctx), SPS);
}

#[test]
fn full_register_builds_expected_model() {
    let settings = settings("SPS", 4, 2, false);
    let mut ctx = RunContext::new();
    let document = parse_document(SPS, &settings, &mut ctx).unwrap();

    assert_eq!(document.list.sections.len(), 2);
    assert_eq!(document.list.total_peaks(), 4);

    let olancha = document.list.peak(&"1.1".parse().unwrap()).unwrap();
    assert!(olancha.flags.emblem);
    assert!(olancha.flags.climbed);
    assert!(olancha.has_anchor);
    assert_eq!(olancha.also_listed, vec!["DPS 1.2".parse().unwrap()]);
    assert_eq!(olancha.elevations.len(), 2);
    assert!(matches!(
        olancha.elevations[1].source,
        ElevationSource::Survey { .. }
    ));
    assert_eq!(olancha.climbs.len(), 1);
    assert_eq!(
        olancha.climbs[0].note.as_ref().map(|lines| lines.len()),
        Some(2)
    );
    assert_eq!(olancha.catalogs.peakbagger.as_deref(), Some("2516"));

    let kern = document.list.peak(&"1.2".parse().unwrap()).unwrap();
    assert!(kern.elevations[0].is_range);
    assert_eq!(kern.catalogs.wikipedia.as_deref(), Some("Kern_Peak"));
    assert!(kern.grade.is_none());

    let second_section = &document.list.sections[1];
    assert_eq!(second_section.location.as_deref(), Some("US-CA"));
    assert_eq!(second_section.peaks[0].id.subletter, Some('a'));
    assert_eq!(second_section.peaks[1].id.subletter, Some('b'));

    let map = ctx.topos.get("o36118b1").unwrap();
    assert_eq!(map.year, 1984);
    let wilderness = ctx.lands.get("South Sierra Wilderness").unwrap();
    assert_eq!(
        wilderness.high_point,
        Some("SPS 1.1".parse().unwrap())
    );
}

#[test]
fn extra_column_register_round_trips_with_absent_weather_line() {
    let settings = settings("DPS", 3, 1, true);
    let mut ctx = RunContext::new();
    let document = parse_document(DPS, &settings, &mut ctx).unwrap();

    let telescope = document.list.peak(&"1.1".parse().unwrap()).unwrap();
    assert_eq!(telescope.extra.as_deref(), Some("DV"));

    let alias = document.list.peak(&"1.2".parse().unwrap()).unwrap();
    assert_eq!(alias.alias_of, Some("SPS 1.1".parse().unwrap()));
    assert_eq!(alias.extra.as_deref(), Some(""));

    let cerro = document.list.peak(&"1.3".parse().unwrap()).unwrap();
    assert_eq!(cerro.weather, WeatherCell::Absent);
    assert_eq!(cerro.country, "MX");
    assert_eq!(cerro.state, "BC");

    assert_eq!(write_document(&document, &ctx), DPS);
}

#[test]
fn id_jump_fails_with_sequencing_violation() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
<td></td>
<td>6,234'</td>
<td></td>
<td>6,234' - 5,822'</td>
<td></td>
<td></td>
<td></td>
<td></td>
<td></td>
</tr>
<tr class="peak">
<td>1.3</td>
"#;
    let settings = settings("SPS", 2, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 17);
    assert_eq!(err.rule, "id-sequence");
    assert!(err.message.contains("1.3"));
    assert!(err.message.contains("'1.2'"));
}

#[test]
fn survey_marker_alone_is_a_fatal_ordering_error() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
<td></td>
<td>12,135' <a href="https://www.ngs.noaa.gov/cgi-bin/ds_mark.prl?PidBox=GT1146">VABM Olancha</a></td>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 7);
    assert_eq!(err.rule, "elevation-order");
    assert!(err.message.contains("sole elevation source"));
}

#[test]
fn prominence_must_match_primary_elevation() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
<td></td>
<td>6,234'</td>
<td></td>
<td>6,240' - 5,822'</td>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 9);
    assert_eq!(err.rule, "prominence-arithmetic");
    assert!(err.message.contains("6,240"));
    assert!(err.message.contains("6,234"));
}

#[test]
fn grammar_mismatch_names_the_expected_cell() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak">
<td>1.1</td>
<td>Olancha Peak</td>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 5);
    assert_eq!(err.rule, "grammar");
    assert!(err.message.contains("name cell"));
}

#[test]
fn section_numbering_must_match_running_count() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">2. Olancha Area</td></tr>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 2);
    assert_eq!(err.rule, "section-sequence");
}

#[test]
fn declared_counts_are_checked_at_table_end() {
    let settings = settings("SPS", 2, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(MINIMAL, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.rule, "count-mismatch");
    assert!(err.message.contains("declares 2 peaks"));
}

#[test]
fn emblem_class_requires_name_suffix() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak emblem">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 5);
    assert_eq!(err.rule, "status-flags");
}

#[test]
fn climbed_class_requires_climb_cell() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak climbed">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
<td></td>
<td>6,234'</td>
<td></td>
<td>6,234' - 5,822'</td>
<td></td>
<td></td>
<td></td>
<td></td>
<td></td>
</tr>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.rule, "status-flags");
    assert!(err.message.contains("without a climb log cell"));
}

#[test]
fn weather_link_must_match_peak_coordinates() {
    let doc = r#"<table id="peaks">
<tr class="section"><td colspan="12">1. Olancha Area</td></tr>
<tr class="peak">
<td>1.1</td>
<td><a href="https://caltopo.com/map.html#ll=36.265444,-118.118131&z=15">Olancha Peak</a></td>
<td></td>
<td>6,234'</td>
<td></td>
<td>6,234' - 5,822'</td>
<td></td>
<td></td>
<td></td>
<td></td>
<td><a href="https://forecast.weather.gov/MapClick.php?lon=-118.200000&lat=36.265444">WX</a></td>
"#;
    let settings = settings("SPS", 1, 1, false);
    let mut ctx = RunContext::new();
    let err = parse_document(doc, &settings, &mut ctx).unwrap_err();

    assert_eq!(err.line, 14);
    assert_eq!(err.rule, "weather-link");
}

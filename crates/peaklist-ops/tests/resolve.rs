use std::path::PathBuf;

use peaklist_config::ListSettings;
use peaklist_model::RunContext;
use peaklist_ops::{resolve_aliases, ResolveError};
use peaklist_parser::{parse_document, Document};
use pretty_assertions::assert_eq;

const SPS: &str = include_str!("../../peaklist-parser/tests/registers/sps.html");
const DPS: &str = include_str!("../../peaklist-parser/tests/registers/dps.html");

fn settings(code: &str, peaks: usize, sections: usize, extra_column: bool, rank: u32) -> ListSettings {
    ListSettings {
        code: code.to_owned(),
        name: format!("{code} Test List"),
        file: PathBuf::from(format!("{}.html", code.to_lowercase())),
        peaks,
        sections,
        country: "US".to_owned(),
        state: "CA".to_owned(),
        extra_column,
        rank,
    }
}

fn load_pair() -> (Vec<Document>, RunContext) {
    let mut ctx = RunContext::new();
    let sps = parse_document(SPS, &settings("SPS", 4, 2, false, 1), &mut ctx).unwrap();
    let dps = parse_document(DPS, &settings("DPS", 3, 1, true, 2), &mut ctx).unwrap();
    (vec![sps, dps], ctx)
}

#[test]
fn alias_copies_data_and_records_back_links() {
    let (mut documents, _ctx) = load_pair();
    resolve_aliases(&mut documents).unwrap();

    let source = documents[0].list.peak(&"1.1".parse().unwrap()).unwrap();
    let alias = documents[1].list.peak(&"1.2".parse().unwrap()).unwrap();

    // Alias symmetry: the alias appears in the source's peer list exactly
    // once, and the copied fields agree.
    let peers: Vec<String> = source
        .also_listed
        .iter()
        .map(|peer| peer.to_string())
        .collect();
    assert_eq!(peers, vec!["DPS 1.2".to_owned()]);

    assert_eq!(alias.elevations, source.elevations);
    assert_eq!(alias.prominences, source.prominences);
    assert_eq!(alias.land_areas, source.land_areas);
    assert_eq!(alias.catalogs, source.catalogs);
    assert_eq!(alias.grade, source.grade);
    assert_eq!(alias.latitude, source.latitude);
    assert_eq!(alias.zoom, source.zoom);

    // The land chain copy includes the high-point marker.
    assert!(alias.land_areas.iter().any(|entry| entry.high_point));

    // Identity stays put.
    assert_eq!(alias.list_code, "DPS");
    assert!(!alias.flags.emblem);
    assert!(source.flags.emblem);
}

#[test]
fn alias_cycle_fails_as_chained_alias_at_resolution() {
    let (mut documents, _ctx) = load_pair();

    // DPS 1.2 already aliases SPS 1.1; close the loop.
    documents[0].list.sections[0].peaks[0].alias_of = Some("DPS 1.2".parse().unwrap());

    let err = resolve_aliases(&mut documents).unwrap_err();
    assert!(matches!(err, ResolveError::ChainedAlias { .. }));
}

#[test]
fn two_aliases_from_one_list_are_ambiguous() {
    let (mut documents, _ctx) = load_pair();
    documents[1].list.sections[0].peaks[2].alias_of = Some("SPS 1.1".parse().unwrap());

    let err = resolve_aliases(&mut documents).unwrap_err();
    match err {
        ResolveError::DuplicateAlias { target, .. } => {
            assert_eq!(target.to_string(), "SPS 1.1");
        }
        other => panic!("expected duplicate-alias error, got {other}"),
    }
}

#[test]
fn unknown_list_reference_suggests_nearest_code() {
    let (mut documents, _ctx) = load_pair();
    documents[1].list.sections[0].peaks[1].alias_of = Some("SPX 1.1".parse().unwrap());

    let err = resolve_aliases(&mut documents).unwrap_err();
    match err {
        ResolveError::UnknownList { suggestion, .. } => {
            assert_eq!(suggestion.as_deref(), Some("SPS"));
        }
        other => panic!("expected unknown-list error, got {other}"),
    }
}

#[test]
fn unknown_peak_reference_is_fatal() {
    let (mut documents, _ctx) = load_pair();
    documents[1].list.sections[0].peaks[1].alias_of = Some("SPS 9.9".parse().unwrap());

    let err = resolve_aliases(&mut documents).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownPeak { .. }));
}

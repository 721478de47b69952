use std::fs;
use std::path::Path;

use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const SPS: &str = include_str!("../../peaklist-parser/tests/registers/sps.html");
const DPS: &str = include_str!("../../peaklist-parser/tests/registers/dps.html");

const CONFIG: &str = r#"
[project]
name = "test lists"
data-dir = "data"

[[list]]
code = "SPS"
name = "Sierra Peaks Section"
file = "sps.html"
peaks = 4
sections = 2
state = "CA"
rank = 1

[[list]]
code = "DPS"
name = "Desert Peaks Section"
file = "dps.html"
peaks = 3
sections = 1
state = "CA"
extra-column = true
rank = 2

[check]
datum-shift-feet = 6.2

[scans]
file = "scans.json"
"#;

fn cargo_bin() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("peaklist").unwrap()
}

fn write_project() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".peaklists.toml"), CONFIG).unwrap();
    fs::create_dir(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/sps.html"), SPS).unwrap();
    fs::write(dir.path().join("data/dps.html"), DPS).unwrap();
    fs::write(
        dir.path().join("scans.json"),
        r#"{"o36118b1": "5132478"}"#,
    )
    .unwrap();
    dir
}

fn write_records(dir: &Path, contents: &str) {
    fs::write(dir.join("records.json"), contents).unwrap();
}

#[test]
fn parse_reports_each_list() {
    let dir = write_project();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path()).arg("parse");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SPS: 4 peaks in 2 sections ok"))
        .stdout(predicate::str::contains("DPS: 3 peaks in 1 sections ok"));
}

#[test]
fn parse_failure_cites_line_and_rule() {
    let dir = write_project();
    let broken = SPS.replace("<td id=\"SPS1.2\">1.2</td>", "<td id=\"SPS1.3\">1.3</td>");
    fs::write(dir.path().join("data/sps.html"), broken).unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path()).arg("parse").arg("SPS");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("id-sequence"))
        .stderr(predicate::str::contains("line 26"));
}

#[test]
fn unknown_list_suggests_nearest_code() {
    let dir = write_project();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path()).arg("parse").arg("SPX");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("did you mean 'SPS'"));
}

#[test]
fn rewrite_check_passes_on_round_trip_clean_document() {
    let dir = write_project();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("rewrite")
        .arg("SPS")
        .arg("--check");

    cmd.assert().success();

    // The source document is untouched in check mode.
    let after = fs::read_to_string(dir.path().join("data/sps.html")).unwrap();
    assert_eq!(after, SPS);
}

#[test]
fn check_reports_mismatches_and_exits_nonzero() {
    let dir = write_project();
    write_records(
        dir.path(),
        r#"[
  {"list": "SPS", "id": "1.1", "source": "Pb", "elevation": 12120, "prominence": null},
  {"list": "SPS", "id": "1.2", "source": "LoJ", "elevation": 11500, "prominence": null}
]"#,
    );

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("check")
        .arg("--records")
        .arg("records.json");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "SPS 1.1: Pb elevation 12120 does not match model (12,123')",
        ))
        .stdout(predicate::str::contains("2 peaks checked, 1 mismatches"));
}

#[test]
fn check_passes_when_records_reconcile() {
    let dir = write_project();
    write_records(
        dir.path(),
        r#"[
  {"list": "SPS", "id": "1.1", "source": "NGS", "elevation": 12141, "prominence": null}
]"#,
    );

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("check")
        .arg("--records")
        .arg("records.json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 peaks checked, 0 mismatches"));
}

#[test]
fn export_collapses_alias_groups_and_resolves_scan_ids() {
    let dir = write_project();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path()).arg("export").arg("SPS");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"FeatureCollection\""))
        .stdout(predicate::str::contains("SPS 1.1"))
        .stdout(predicate::str::contains("DPS 1.2"))
        .stdout(predicate::str::contains("5132478"));
}

#[test]
fn stats_and_history_summarise_all_lists() {
    let dir = write_project();

    let mut stats = cargo_bin();
    stats.current_dir(dir.path()).arg("stats");
    stats
        .assert()
        .success()
        .stdout(predicate::str::contains("SPS"))
        .stdout(predicate::str::contains("DPS"));

    let mut history = cargo_bin();
    history.current_dir(dir.path()).arg("history");
    history
        .assert()
        .success()
        .stdout(predicate::str::contains("6/14/2008  SPS 1.1  Olancha Peak  with Ben and Marcy"))
        .stdout(predicate::str::contains("9/2/2011  SPS 2.1a  Black Kaweah Peak  solo"));
}

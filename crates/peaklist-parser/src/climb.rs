//! Climb-log sub-grammar: date + party records, optional multi-line notes.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use peaklist_model::{ClimbParty, ClimbRecord, Companion};

use crate::error::{ParseError, ParseResult};
use crate::grammar::{NOTE_CLOSE, NOTE_OPEN};

static RECORD_HEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4}) (?P<party>solo|with .+)$")
        .expect("climb record pattern compiles")
});

static COMPANION_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<a href="(?P<url>https://[^"]+)">(?P<name>[^<]+)</a>$"#)
        .expect("companion link pattern compiles")
});

/// Parse assembled climb-cell content (the text between `<td>` and
/// `</td>`, note newlines included). `line` is where the cell began, used
/// for error reporting.
pub fn parse_climb_cell(content: &str, line: usize) -> ParseResult<Vec<ClimbRecord>> {
    let mut records = Vec::new();
    for piece in content.split("<br>") {
        records.push(parse_record(piece, line)?);
    }
    Ok(records)
}

fn parse_record(piece: &str, line: usize) -> ParseResult<ClimbRecord> {
    let (head, note) = match piece.find(NOTE_OPEN) {
        Some(idx) => {
            let (head, rest) = piece.split_at(idx);
            (head, Some(parse_note_block(rest, line)?))
        }
        None => (piece, None),
    };

    let caps = RECORD_HEAD_RE.captures(head).ok_or_else(|| {
        ParseError::new(
            line,
            "grammar",
            format!("climb record '{head}' does not match 'M/D/YYYY solo|with …'"),
        )
    })?;

    let month: u32 = caps["m"].parse().expect("digits parse");
    let day: u32 = caps["d"].parse().expect("digits parse");
    let year: i32 = caps["y"].parse().expect("digits parse");
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ParseError::new(
            line,
            "grammar",
            format!("'{month}/{day}/{year}' is not a calendar date"),
        )
    })?;

    let party = match &caps["party"] {
        "solo" => ClimbParty::Solo,
        with => ClimbParty::With(parse_companions(
            with.strip_prefix("with ").expect("party starts with 'with '"),
            line,
        )?),
    };

    Ok(ClimbRecord { date, party, note })
}

fn parse_note_block(block: &str, line: usize) -> ParseResult<Vec<String>> {
    let bad = || {
        ParseError::new(
            line,
            "grammar",
            "climb note must be '<div class=\"note\">', verbatim lines, '</div>'",
        )
    };

    let inner = block
        .strip_prefix(NOTE_OPEN)
        .and_then(|rest| rest.strip_suffix(NOTE_CLOSE))
        .ok_or_else(bad)?;
    let inner = inner
        .strip_prefix('\n')
        .and_then(|rest| rest.strip_suffix('\n'))
        .ok_or_else(bad)?;
    if inner.is_empty() {
        return Err(bad());
    }

    Ok(inner.split('\n').map(str::to_owned).collect())
}

fn parse_companions(text: &str, line: usize) -> ParseResult<Vec<Companion>> {
    let mut names: Vec<&str> = Vec::new();
    match text.rsplit_once(" and ") {
        Some((head, last)) => {
            names.extend(head.split(", "));
            names.push(last);
        }
        None => names.push(text),
    }

    names
        .into_iter()
        .map(|name| parse_companion(name, line))
        .collect()
}

fn parse_companion(token: &str, line: usize) -> ParseResult<Companion> {
    if let Some(caps) = COMPANION_LINK_RE.captures(token) {
        return Ok(Companion {
            name: caps["name"].to_owned(),
            url: Some(caps["url"].to_owned()),
        });
    }
    if token.is_empty() || token.contains('<') || token.contains(',') {
        return Err(ParseError::new(
            line,
            "grammar",
            format!("bad companion name '{token}'"),
        ));
    }
    Ok(Companion {
        name: token.to_owned(),
        url: None,
    })
}

/// Render climb records back to cell content, the inverse of
/// [`parse_climb_cell`].
pub fn render_climbs(records: &[ClimbRecord]) -> String {
    records
        .iter()
        .map(render_record)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn render_record(record: &ClimbRecord) -> String {
    let mut out = format!(
        "{}/{}/{} {}",
        record.date.month(),
        record.date.day(),
        record.date.year(),
        render_party(&record.party)
    );
    if let Some(note) = &record.note {
        out.push_str(NOTE_OPEN);
        out.push('\n');
        out.push_str(&note.join("\n"));
        out.push('\n');
        out.push_str(NOTE_CLOSE);
    }
    out
}

fn render_party(party: &ClimbParty) -> String {
    match party {
        ClimbParty::Solo => "solo".to_owned(),
        ClimbParty::With(companions) => {
            let rendered: Vec<String> = companions.iter().map(render_companion).collect();
            let joined = match rendered.len() {
                1 => rendered[0].clone(),
                _ => format!(
                    "{} and {}",
                    rendered[..rendered.len() - 1].join(", "),
                    rendered[rendered.len() - 1]
                ),
            };
            format!("with {joined}")
        }
    }
}

fn render_companion(companion: &Companion) -> String {
    match &companion.url {
        Some(url) => format!(r#"<a href="{url}">{}</a>"#, companion.name),
        None => companion.name.clone(),
    }
}

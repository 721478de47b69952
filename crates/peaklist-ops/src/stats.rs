//! Summary statistics and cross-list climb history.

use peaklist_format::{HistoryEntry, ListStats};
use peaklist_parser::Document;

pub fn build_stats(documents: &[Document]) -> Vec<ListStats> {
    documents
        .iter()
        .map(|document| {
            let mut stats = ListStats {
                code: document.list.code.clone(),
                name: document.list.name.clone(),
                peaks: 0,
                climbed: 0,
                emblem: 0,
                emblem_climbed: 0,
                mtneer: 0,
                mtneer_climbed: 0,
                delisted: 0,
                suspended: 0,
            };
            for peak in document.list.peaks() {
                stats.peaks += 1;
                if peak.flags.climbed {
                    stats.climbed += 1;
                }
                if peak.flags.emblem {
                    stats.emblem += 1;
                    if peak.flags.climbed {
                        stats.emblem_climbed += 1;
                    }
                }
                if peak.flags.mtneer {
                    stats.mtneer += 1;
                    if peak.flags.climbed {
                        stats.mtneer_climbed += 1;
                    }
                }
                if peak.flags.delisted {
                    stats.delisted += 1;
                }
                if peak.flags.suspended {
                    stats.suspended += 1;
                }
            }
            stats
        })
        .collect()
}

/// All climbs across all lists, chronological; ties order by list rank
/// then id.
pub fn build_history(documents: &[Document]) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    for document in documents {
        for peak in document.list.peaks() {
            for climb in &peak.climbs {
                entries.push((
                    document.list.rank,
                    HistoryEntry {
                        date: climb.date,
                        list: document.list.code.clone(),
                        id: peak.id.to_string(),
                        name: peak.name.clone(),
                        party: climb.party.to_string(),
                    },
                ));
            }
        }
    }
    entries.sort_by(|a, b| {
        (a.1.date, a.0, a.1.id.as_str()).cmp(&(b.1.date, b.0, b.1.id.as_str()))
    });
    entries.into_iter().map(|(_, entry)| entry).collect()
}

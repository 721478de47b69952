//! Cross-reference resolution: copy data from alias sources and record the
//! inverse links, in one global pass after every document has parsed.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use peaklist_model::ListedId;
use peaklist_parser::Document;

/// Fatal alias-resolution failures, reported only after all documents have
/// otherwise parsed successfully.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{from}: alias reference '{reference}' names an unknown list{}",
        suggestion_text(.suggestion))]
    UnknownList {
        from: ListedId,
        reference: ListedId,
        suggestion: Option<String>,
    },
    #[error("{from}: alias reference '{reference}' names an unknown peak")]
    UnknownPeak { from: ListedId, reference: ListedId },
    #[error("{from}: alias reference '{reference}' is itself an alias; chained aliasing is not allowed")]
    ChainedAlias { from: ListedId, reference: ListedId },
    #[error("'{first}' and '{second}' both alias '{target}' from the same list")]
    DuplicateAlias {
        target: ListedId,
        first: ListedId,
        second: ListedId,
    },
}

fn suggestion_text(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(code) => format!("; did you mean '{code}'?"),
        None => String::new(),
    }
}

/// Location of one peak across the parsed documents.
#[derive(Clone, Copy)]
struct PeakLocation {
    document: usize,
    section: usize,
    peak: usize,
}

/// Resolve every alias reference across the given documents. On success,
/// each aliasing peak carries the copied data of its source, and each
/// source's peer list is rebuilt from the back-links, ordered by list rank.
pub fn resolve_aliases(documents: &mut [Document]) -> Result<(), ResolveError> {
    let list_index: HashMap<String, usize> = documents
        .iter()
        .enumerate()
        .map(|(idx, document)| (document.list.code.clone(), idx))
        .collect();

    struct Job {
        alias: PeakLocation,
        alias_id: ListedId,
        alias_rank: u32,
        reference: ListedId,
    }

    let mut jobs = Vec::new();
    for (document_idx, document) in documents.iter().enumerate() {
        for (section_idx, section) in document.list.sections.iter().enumerate() {
            for (peak_idx, peak) in section.peaks.iter().enumerate() {
                if let Some(reference) = &peak.alias_of {
                    jobs.push(Job {
                        alias: PeakLocation {
                            document: document_idx,
                            section: section_idx,
                            peak: peak_idx,
                        },
                        alias_id: peak.listed_id(),
                        alias_rank: document.list.rank,
                        reference: reference.clone(),
                    });
                }
            }
        }
    }

    // Two aliases of one target from the same list are ambiguous.
    let mut claimed: HashMap<(ListedId, String), ListedId> = HashMap::new();
    for job in &jobs {
        let key = (job.reference.clone(), job.alias_id.list.clone());
        if let Some(first) = claimed.get(&key) {
            return Err(ResolveError::DuplicateAlias {
                target: job.reference.clone(),
                first: first.clone(),
                second: job.alias_id.clone(),
            });
        }
        claimed.insert(key, job.alias_id.clone());
    }

    let mut back_links: HashMap<ListedId, Vec<(u32, ListedId)>> = HashMap::new();

    for job in &jobs {
        let target_document = *list_index.get(&job.reference.list).ok_or_else(|| {
            ResolveError::UnknownList {
                from: job.alias_id.clone(),
                reference: job.reference.clone(),
                suggestion: suggest_code(&job.reference.list, list_index.keys()),
            }
        })?;

        let (section_idx, peak_idx) = locate_peak(&documents[target_document], &job.reference.id)
            .ok_or_else(|| ResolveError::UnknownPeak {
                from: job.alias_id.clone(),
                reference: job.reference.clone(),
            })?;

        let source = {
            let peak = &documents[target_document].list.sections[section_idx].peaks[peak_idx];
            if peak.alias_of.is_some() {
                return Err(ResolveError::ChainedAlias {
                    from: job.alias_id.clone(),
                    reference: job.reference.clone(),
                });
            }
            peak.clone()
        };

        let alias = &mut documents[job.alias.document].list.sections[job.alias.section].peaks
            [job.alias.peak];
        alias.copy_from_alias_source(&source);
        debug!(alias = %job.alias_id, source = %job.reference, "resolved alias");

        back_links
            .entry(job.reference.clone())
            .or_default()
            .push((job.alias_rank, job.alias_id.clone()));
    }

    for (target, mut peers) in back_links {
        peers.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let document = list_index[&target.list];
        let (section_idx, peak_idx) =
            locate_peak(&documents[document], &target.id).expect("target located above");
        documents[document].list.sections[section_idx].peaks[peak_idx].also_listed =
            peers.into_iter().map(|(_, id)| id).collect();
    }

    Ok(())
}

fn locate_peak(document: &Document, id: &peaklist_model::PeakId) -> Option<(usize, usize)> {
    for (section_idx, section) in document.list.sections.iter().enumerate() {
        for (peak_idx, peak) in section.peaks.iter().enumerate() {
            if peak.id == *id {
                return Some((section_idx, peak_idx));
            }
        }
    }
    None
}

/// Nearest known list code, when one is plausibly a typo for another.
pub(crate) fn suggest_code<'a>(
    unknown: &str,
    candidates: impl Iterator<Item = &'a String>,
) -> Option<String> {
    candidates
        .map(|candidate| {
            (
                candidate.as_str(),
                strsim::normalized_levenshtein(unknown, candidate),
            )
        })
        .filter(|(_, score)| *score > 0.6)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(code, _)| code.to_owned())
}

//! Export assembly: the canonical feature output for one list, with alias
//! groups collapsed onto their source peaks.

use std::collections::HashMap;
use std::path::Path;

use peaklist_format::{
    ElevationOut, ElevationReadingOut, Feature, FeatureCollection, Geometry, PeakProperties,
};
use peaklist_model::{ElevationSource, Peak, RunContext};
use peaklist_parser::Document;

/// Lookup from an internal topo map id to its public scan id, consumed
/// only when emitting the distribution format.
pub trait ScanResolver {
    fn scan_id(&self, map_id: &str) -> Option<String>;
}

/// Used when no scan table is configured; internal ids pass through.
pub struct NoScans;

impl ScanResolver for NoScans {
    fn scan_id(&self, _map_id: &str) -> Option<String> {
        None
    }
}

/// JSON-backed scan table, `{"o36118b1": "5132478", …}`.
pub struct ScanTable {
    entries: HashMap<String, String>,
}

impl ScanTable {
    pub fn new(entries: HashMap<String, String>) -> Self {
        ScanTable { entries }
    }

    pub fn from_path(path: &Path) -> Result<Self, crate::OperationError> {
        let raw = std::fs::read_to_string(path).map_err(|source| crate::OperationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries =
            serde_json::from_str(&raw).map_err(|source| crate::OperationError::ScanTable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(ScanTable { entries })
    }
}

impl ScanResolver for ScanTable {
    fn scan_id(&self, map_id: &str) -> Option<String> {
        self.entries.get(map_id).cloned()
    }
}

/// Build the export collection for `code`. Alias entries are skipped; the
/// peak they reference carries the combined id list instead.
pub fn build_features(
    documents: &[Document],
    code: &str,
    ctx: &RunContext,
    scans: &dyn ScanResolver,
) -> FeatureCollection {
    let mut features = Vec::new();

    for document in documents {
        if document.list.code != code {
            continue;
        }
        for peak in document.list.peaks() {
            if peak.alias_of.is_some() {
                continue;
            }
            features.push(build_feature(peak, ctx, scans));
        }
    }

    FeatureCollection::new(features)
}

fn build_feature(peak: &Peak, ctx: &RunContext, scans: &dyn ScanResolver) -> Feature {
    let latitude: f64 = peak.latitude.parse().expect("latitude validated by grammar");
    let longitude: f64 = peak
        .longitude
        .parse()
        .expect("longitude validated by grammar");

    let (id, ids) = if peak.also_listed.is_empty() {
        (Some(peak.listed_id().to_string()), Vec::new())
    } else {
        let mut ids = vec![peak.listed_id().to_string()];
        ids.extend(peak.also_listed.iter().map(|peer| peer.to_string()));
        (None, ids)
    };

    let properties = PeakProperties {
        id,
        ids,
        name: peak.name.clone(),
        name2: peak.alt_name.clone(),
        prominence: peak.prominences[0].render(),
        grade: peak.grade.map(|grade| grade.to_string()),
        peakbagger: peak
            .catalogs
            .peakbagger
            .as_ref()
            .map(|id| format!("https://peakbagger.com/peak.aspx?pid={id}")),
        listsofjohn: peak
            .catalogs
            .listsofjohn
            .as_ref()
            .map(|id| format!("https://listsofjohn.com/peak/{id}")),
        summitpost: peak
            .catalogs
            .summitpost
            .as_ref()
            .map(|id| format!("https://www.summitpost.org/{id}")),
        wikipedia: peak
            .catalogs
            .wikipedia
            .as_ref()
            .map(|id| format!("https://en.wikipedia.org/wiki/{id}")),
        elevation: build_elevation(peak, ctx, scans),
        zoom: (peak.zoom != 15).then_some(peak.zoom),
        emblem: peak.flags.emblem,
        mtneer: peak.flags.mtneer,
        foreign: peak.country != "US",
    };

    Feature::new(Geometry::point(longitude, latitude), properties)
}

fn build_elevation(peak: &Peak, ctx: &RunContext, scans: &dyn ScanResolver) -> ElevationOut {
    if let [only] = peak.elevations.as_slice() {
        if only.source == ElevationSource::None && !only.is_range {
            return ElevationOut::Scalar(only.feet);
        }
    }

    let readings = peak
        .elevations
        .iter()
        .map(|reading| {
            let (class, source) = match &reading.source {
                ElevationSource::None => ("spot", None),
                ElevationSource::Topo { map_id } => (
                    "topo",
                    Some(
                        scans
                            .scan_id(map_id)
                            .unwrap_or_else(|| map_id.clone()),
                    ),
                ),
                ElevationSource::Survey { pid } => ("survey", Some(pid.clone())),
            };
            ElevationReadingOut {
                class,
                feet: reading.feet,
                interval: reading.is_range.then(|| reading.interval(ctx)),
                source,
            }
        })
        .collect();

    ElevationOut::Readings(readings)
}

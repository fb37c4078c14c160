use crate::geometry::{self, GeometryKind};
use std::path::Path;

/// Generalization profile a feature collection is built with. Explicit
/// buckets carry hand-tuned tippecanoe templates; everything else falls back
/// to a geometry-derived profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bucket {
    Water,
    SettlementExtents,
    Roads,
    Places,
    BasePolygons,
    Geometry(GeometryKind),
}

/// Declared layer names matched case-insensitively, first match wins.
const NAME_RULES: &[(&[&str], Bucket)] = &[
    (&["water"], Bucket::Water),
    (
        &["settlement-extents", "settlementextents"],
        Bucket::SettlementExtents,
    ),
    (&["roads"], Bucket::Roads),
    (&["places", "placenames"], Bucket::Places),
    (
        &["land_use", "land_cover", "land_residential", "infrastructure"],
        Bucket::BasePolygons,
    ),
];

/// Filename substring rules in fixed priority order. Land keywords come
/// first so any land* variant wins over the looser matches below it.
const FILENAME_RULES: &[(&[&str], Bucket)] = &[
    (
        &[
            "land_use",
            "land_cover",
            "land_residential",
            "infrastructure",
            "land",
        ],
        Bucket::BasePolygons,
    ),
    (&["water"], Bucket::Water),
    (&["extents", "settlement"], Bucket::SettlementExtents),
    (&["roads"], Bucket::Roads),
    (&["places", "placenames"], Bucket::Places),
];

/// Resolves a feature collection to its rule bucket. Strict precedence:
/// declared layer name, then filename pattern, then geometry sniffing.
/// A file whose name coincidentally contains another theme's keyword still
/// resolves by its declared name.
pub fn resolve(declared_layer: Option<&str>, file: Option<&Path>) -> Bucket {
    if let Some(name) = declared_layer {
        let name = name.to_lowercase();

        for (names, bucket) in NAME_RULES {
            if names.contains(&name.as_str()) {
                return *bucket;
            }
        }
    }

    if let Some(file) = file {
        if let Some(file_name) = file.file_name().and_then(|name| name.to_str()) {
            let file_name = file_name.to_lowercase();

            for (keywords, bucket) in FILENAME_RULES {
                if keywords.iter().any(|keyword| file_name.contains(keyword)) {
                    return *bucket;
                }
            }
        }

        if file.exists() {
            return Bucket::Geometry(geometry::classify(file));
        }
    }

    Bucket::Geometry(GeometryKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs::File, io::Write};
    use tempfile::TempDir;

    #[test]
    fn declared_name_beats_filename_pattern() {
        let bucket = resolve(Some("roads"), Some(Path::new("water.geojsonseq")));

        assert_eq!(bucket, Bucket::Roads);
    }

    #[test]
    fn declared_name_is_case_insensitive() {
        assert_eq!(resolve(Some("WATER"), None), Bucket::Water);
        assert_eq!(
            resolve(Some("SettlementExtents"), None),
            Bucket::SettlementExtents
        );
    }

    #[test]
    fn land_keywords_win_over_water_in_filenames() {
        let bucket = resolve(None, Some(Path::new("land_use_water.geojsonseq")));

        assert_eq!(bucket, Bucket::BasePolygons);
    }

    #[test]
    fn filename_patterns_in_priority_order() {
        assert_eq!(
            resolve(None, Some(Path::new("coastal_water.geojsonseq"))),
            Bucket::Water
        );
        assert_eq!(
            resolve(None, Some(Path::new("village_extents.geojsonseq"))),
            Bucket::SettlementExtents
        );
        assert_eq!(
            resolve(None, Some(Path::new("major_roads.geojsonseq"))),
            Bucket::Roads
        );
        assert_eq!(
            resolve(None, Some(Path::new("placenames.geojson"))),
            Bucket::Places
        );
    }

    #[test]
    fn unmatched_existing_file_falls_back_to_geometry() {
        let dir = TempDir::new().unwrap();

        let path = dir.path().join("poi.geojsonseq");

        let mut file = File::create(&path).unwrap();

        writeln!(
            file,
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[1,2]}},"properties":{{}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[3,4]}},"properties":{{}}}}"#
        )
        .unwrap();

        assert_eq!(
            resolve(None, Some(&path)),
            Bucket::Geometry(GeometryKind::Point)
        );
    }

    #[test]
    fn missing_file_resolves_to_unknown_fallback() {
        let bucket = resolve(None, Some(Path::new("/nonexistent/mystery.geojson")));

        assert_eq!(bucket, Bucket::Geometry(GeometryKind::Unknown));
    }

    #[test]
    fn nothing_given_resolves_to_unknown_fallback() {
        assert_eq!(resolve(None, None), Bucket::Geometry(GeometryKind::Unknown));
    }
}

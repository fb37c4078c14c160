use serde_json::Value;
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::warn;

/// Sampling cap so classification stays cheap on arbitrarily large files.
const MAX_SAMPLES: usize = 100;

/// Dominant geometry category of a feature-collection file. Multi-part
/// variants count as their single-part base category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    Mixed,
    Unknown,
}

/// Inspects up to [`MAX_SAMPLES`] features of `path` and returns the dominant
/// geometry category. Never fails: an unreadable or unparsable file is
/// reported as [`GeometryKind::Unknown`] after a diagnostic log line.
pub fn classify(path: &Path) -> GeometryKind {
    match try_classify(path) {
        Ok(kind) => kind,
        Err(error) => {
            warn!(
                "could not detect geometry type for {}: {error}",
                path.display()
            );

            GeometryKind::Unknown
        }
    }
}

fn try_classify(path: &Path) -> std::io::Result<GeometryKind> {
    let kinds = if is_line_delimited(path)? {
        sample_lines(path)?
    } else {
        sample_document(path)?
    };

    Ok(verdict(&kinds))
}

fn verdict(kinds: &HashSet<GeometryKind>) -> GeometryKind {
    match kinds.len() {
        0 => GeometryKind::Unknown,
        1 => *kinds.iter().next().unwrap_or(&GeometryKind::Unknown),
        _ => GeometryKind::Mixed,
    }
}

/// A file is treated as a newline-delimited feature sequence when its first
/// line parses as a complete Feature and a further line does too. Filename
/// suffixes are deliberately ignored; mislabelled files are common.
fn is_line_delimited(path: &Path) -> std::io::Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut first = String::new();
    let mut second = String::new();

    reader.read_line(&mut first)?;

    if !is_single_feature(first.trim()) {
        return Ok(false);
    }

    reader.read_line(&mut second)?;

    Ok(is_single_feature(second.trim()))
}

fn is_single_feature(line: &str) -> bool {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| {
            value
                .get("type")
                .and_then(Value::as_str)
                .map(|kind| kind == "Feature")
        })
        .unwrap_or(false)
}

fn sample_lines(path: &Path) -> std::io::Result<HashSet<GeometryKind>> {
    let reader = BufReader::new(File::open(path)?);

    let mut kinds = HashSet::new();
    let mut samples = 0;

    for line in reader.lines() {
        if samples >= MAX_SAMPLES {
            break;
        }

        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        let Ok(feature) = serde_json::from_str::<Value>(&line) else {
            continue;
        };

        if let Some(kind) = feature_kind(&feature) {
            kinds.insert(kind);

            samples += 1;
        }
    }

    Ok(kinds)
}

fn sample_document(path: &Path) -> std::io::Result<HashSet<GeometryKind>> {
    let reader = BufReader::new(File::open(path)?);

    let mut kinds = HashSet::new();

    let Ok(document) = serde_json::from_reader::<_, Value>(reader) else {
        return Ok(kinds);
    };

    if let Some(features) = document.get("features").and_then(Value::as_array) {
        for feature in features.iter().take(MAX_SAMPLES) {
            if let Some(kind) = feature_kind(feature) {
                kinds.insert(kind);
            }
        }
    } else if let Some(kind) = feature_kind(&document) {
        // single-feature document
        kinds.insert(kind);
    }

    Ok(kinds)
}

fn feature_kind(feature: &Value) -> Option<GeometryKind> {
    feature
        .get("geometry")?
        .get("type")?
        .as_str()
        .and_then(base_kind)
}

fn base_kind(geometry_type: &str) -> Option<GeometryKind> {
    match geometry_type {
        "Point" | "MultiPoint" => Some(GeometryKind::Point),
        "LineString" | "MultiLineString" => Some(GeometryKind::Line),
        "Polygon" | "MultiPolygon" => Some(GeometryKind::Polygon),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);

        let mut file = File::create(&path).unwrap();

        file.write_all(content.as_bytes()).unwrap();

        path
    }

    fn feature(geometry_type: &str, coordinates: &str) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{{"type":"{geometry_type}","coordinates":{coordinates}}},"properties":{{}}}}"#
        )
    }

    #[test]
    fn single_category_sequence() {
        let dir = TempDir::new().unwrap();

        let content = [
            feature("Point", "[1.0,2.0]"),
            feature("MultiPoint", "[[1.0,2.0]]"),
            feature("Point", "[3.0,4.0]"),
        ]
        .join("\n");

        let path = write_file(&dir, "places.geojsonseq", &content);

        assert_eq!(classify(&path), GeometryKind::Point);
    }

    #[test]
    fn mixed_categories() {
        let dir = TempDir::new().unwrap();

        let content = [
            feature("Point", "[1.0,2.0]"),
            feature("Polygon", "[[[0,0],[1,0],[1,1],[0,0]]]"),
        ]
        .join("\n");

        let path = write_file(&dir, "stuff.geojsonseq", &content);

        assert_eq!(classify(&path), GeometryKind::Mixed);
    }

    #[test]
    fn multipart_normalizes_before_aggregation() {
        let dir = TempDir::new().unwrap();

        let content = [
            feature("LineString", "[[0,0],[1,1]]"),
            feature("MultiLineString", "[[[0,0],[1,1]]]"),
        ]
        .join("\n");

        let path = write_file(&dir, "roads.geojsonseq", &content);

        assert_eq!(classify(&path), GeometryKind::Line);
    }

    #[test]
    fn line_delimited_detected_despite_geojson_suffix() {
        let dir = TempDir::new().unwrap();

        let content = [
            feature("LineString", "[[0,0],[1,1]]"),
            feature("LineString", "[[2,2],[3,3]]"),
        ]
        .join("\n");

        let path = write_file(&dir, "mislabelled.geojson", &content);

        assert_eq!(classify(&path), GeometryKind::Line);
    }

    #[test]
    fn whole_document_collection() {
        let dir = TempDir::new().unwrap();

        let content = format!(
            r#"{{"type":"FeatureCollection","features":[{},{}]}}"#,
            feature("MultiPolygon", "[[[[0,0],[1,0],[1,1],[0,0]]]]"),
            feature("Polygon", "[[[0,0],[1,0],[1,1],[0,0]]]"),
        );

        let path = write_file(&dir, "land.geojson", &content);

        assert_eq!(classify(&path), GeometryKind::Polygon);
    }

    #[test]
    fn features_without_geometry_are_skipped() {
        let dir = TempDir::new().unwrap();

        let content = [
            feature("Point", "[1.0,2.0]"),
            feature("Point", "[1.0,2.0]"),
            r#"{"type":"Feature","geometry":null,"properties":{}}"#.to_string(),
            "not json at all".to_string(),
        ]
        .join("\n");

        let path = write_file(&dir, "sparse.geojsonseq", &content);

        assert_eq!(classify(&path), GeometryKind::Point);
    }

    #[test]
    fn empty_file_is_unknown() {
        let dir = TempDir::new().unwrap();

        let path = write_file(&dir, "empty.geojsonseq", "");

        assert_eq!(classify(&path), GeometryKind::Unknown);
    }

    #[test]
    fn missing_file_is_unknown_and_does_not_panic() {
        let dir = TempDir::new().unwrap();

        let path = dir.path().join("nope.geojson");

        assert_eq!(classify(&path), GeometryKind::Unknown);
    }

    #[test]
    fn unparsable_document_is_unknown() {
        let dir = TempDir::new().unwrap();

        let path = write_file(&dir, "broken.geojson", "{\"type\": \"FeatureCollec");

        assert_eq!(classify(&path), GeometryKind::Unknown);
    }
}

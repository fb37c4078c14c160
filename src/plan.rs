use crate::{extent::Extent, geometry::GeometryKind, rules::Bucket};
use std::path::{Path, PathBuf};

/// A fully materialized invocation of the tile-building tool: the argument
/// vector plus the output path and declared layer it was planned for.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub output: PathBuf,
    pub layer: String,
    pub args: Vec<String>,
}

/// Building level-of-detail tier. Tiers render the same input into separate
/// archives with disjoint zoom windows so the client can crossfade between
/// them at the boundaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildingLod {
    Low,
    Medium,
    High,
}

impl BuildingLod {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub const fn zoom_window(self) -> (u8, u8) {
        match self {
            Self::Low => (0, 9),
            Self::Medium => (11, 13),
            Self::High => (13, 15),
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Low => "_low_lod",
            Self::Medium => "_medium_lod",
            Self::High => "_high_lod",
        }
    }

    const fn args(self) -> &'static [&'static str] {
        match self {
            Self::Low => &["--simplification=10", "--drop-rate=0.5", "--buffer=8"],
            Self::Medium => &["--simplification=5", "--drop-rate=0.333", "--buffer=8"],
            Self::High => &["--simplification=10", "--drop-rate=0.1", "--buffer=4"],
        }
    }
}

const WATER: &[&str] = &[
    "--simplification=2",
    "--low-detail=11",
    "--full-detail=13",
    "--no-tiny-polygon-reduction",
    "--no-feature-limit",
    "--extend-zooms-if-still-dropping",
    "--maximum-tile-bytes=2097152",
    "--maximum-zoom=15",
    "--gamma=0.9",
];

const SETTLEMENT_EXTENTS: &[&str] = &[
    "--simplification=5",
    "--drop-rate=0.25",
    "--low-detail=11",
    "--full-detail=14",
    "--coalesce-smallest-as-needed",
    "--gamma=0.8",
    "--maximum-zoom=13",
    "--minimum-zoom=6",
    "--cluster-distance=2",
    "--minimum-detail=8",
];

const ROADS: &[&str] = &[
    "--no-line-simplification",
    "--buffer=16",
    "--drop-rate=0.05",
    "--drop-smallest",
    "--simplification=5",
    "--minimum-zoom=7",
    "--extend-zooms-if-still-dropping",
    "--coalesce-smallest-as-needed",
    "--full-detail=13",
    "--minimum-detail=10",
];

const PLACES: &[&str] = &["--cluster-distance=35", "--drop-rate=0.1"];

const BASE_POLYGONS: &[&str] = &[
    "--simplification=5",
    "--drop-rate=0.1",
    "--low-detail=10",
    "--full-detail=14",
    "--coalesce-smallest-as-needed",
    "--maximum-zoom=15",
    "--minimum-zoom=9",
    "--no-tiny-polygon-reduction",
];

const POINT_FALLBACK: &[&str] = &[
    "--cluster-distance=35",
    "--drop-rate=0.05",
    "--low-detail=8",
    "--full-detail=11",
    "--coalesce-smallest-as-needed",
    "--extend-zooms-if-still-dropping",
    "--gamma=0.3",
    "--maximum-zoom=15",
    "--minimum-zoom=6",
    "--simplification=1",
];

const LINE_FALLBACK: &[&str] = &[
    "--no-line-simplification",
    "--drop-rate=0.08",
    "--low-detail=9",
    "--full-detail=12",
    "--coalesce-smallest-as-needed",
    "--extend-zooms-if-still-dropping",
    "--gamma=0.4",
    "--maximum-zoom=15",
    "--minimum-zoom=7",
    "--simplification=3",
    "--buffer=12",
];

const POLYGON_FALLBACK: &[&str] = &[
    "--simplification=5",
    "--drop-rate=0.1",
    "--low-detail=10",
    "--full-detail=13",
    "--coalesce-smallest-as-needed",
    "--extend-zooms-if-still-dropping",
    "--gamma=0.5",
    "--maximum-zoom=15",
    "--minimum-zoom=8",
    "--no-tiny-polygon-reduction",
];

/// Feature-preserving defaults for mixed or undetectable geometry.
const CONSERVATIVE_FALLBACK: &[&str] = &[
    "--simplification=3",
    "--drop-rate=0.08",
    "--low-detail=9",
    "--full-detail=12",
    "--coalesce-smallest-as-needed",
    "--extend-zooms-if-still-dropping",
    "--gamma=0.4",
    "--maximum-zoom=15",
    "--minimum-zoom=7",
];

/// Canonical parameter template for a bucket. Total over all buckets; there
/// is no failure path, the conservative template is the safety net.
pub const fn bucket_args(bucket: Bucket) -> &'static [&'static str] {
    match bucket {
        Bucket::Water => WATER,
        Bucket::SettlementExtents => SETTLEMENT_EXTENTS,
        Bucket::Roads => ROADS,
        Bucket::Places => PLACES,
        Bucket::BasePolygons => BASE_POLYGONS,
        Bucket::Geometry(GeometryKind::Point) => POINT_FALLBACK,
        Bucket::Geometry(GeometryKind::Line) => LINE_FALLBACK,
        Bucket::Geometry(GeometryKind::Polygon) => POLYGON_FALLBACK,
        Bucket::Geometry(GeometryKind::Mixed | GeometryKind::Unknown) => CONSERVATIVE_FALLBACK,
    }
}

/// Shared high-quality options every single-file build starts from; bucket
/// templates may override individual flags (tippecanoe takes the last value).
fn base_args(output: &Path, layer: &str, extent: &Extent) -> Vec<String> {
    vec![
        "-fo".into(),
        output.display().to_string(),
        "-zg".into(),
        "-l".into(),
        layer.into(),
        "--single-precision".into(),
        "--clip-bounding-box".into(),
        extent.to_string(),
        "--buffer=8".into(),
        "--no-polygon-splitting".into(),
        "--detect-shared-borders".into(),
        "--drop-smallest".into(),
        "--maximum-tile-bytes=1048576".into(),
        "--preserve-input-order".into(),
        "--coalesce-densest-as-needed".into(),
        "--drop-fraction-as-needed".into(),
        "-P".into(),
    ]
}

/// Plans a single-file build: base options, the bucket's template, then the
/// trailing positional input path.
pub fn plan(bucket: Bucket, output: &Path, layer: &str, extent: &Extent, input: &Path) -> Plan {
    let mut args = base_args(output, layer, extent);

    args.extend(bucket_args(bucket).iter().map(ToString::to_string));

    args.push(input.display().to_string());

    Plan {
        output: output.to_path_buf(),
        layer: layer.to_string(),
        args,
    }
}

/// Plans one building LOD tier with its fixed zoom window.
pub fn plan_building(
    lod: BuildingLod,
    output: &Path,
    layer: &str,
    extent: &Extent,
    input: &Path,
) -> Plan {
    let (min_zoom, max_zoom) = lod.zoom_window();

    let mut args = vec![
        "-fo".into(),
        output.display().to_string(),
        format!("-z{max_zoom}"),
        format!("-Z{min_zoom}"),
        "-l".into(),
        layer.into(),
        "--clip-bounding-box".into(),
        extent.to_string(),
        "--drop-smallest".into(),
        "--coalesce-smallest-as-needed".into(),
        "--detect-shared-borders".into(),
        "--preserve-input-order".into(),
        "--maximum-tile-bytes=1048576".into(),
        "-P".into(),
    ];

    args.extend(lod.args().iter().map(ToString::to_string));

    args.push(input.display().to_string());

    Plan {
        output: output.to_path_buf(),
        layer: layer.to_string(),
        args,
    }
}

/// Plans a themed multi-layer archive: one invocation with a layer
/// declaration per sub-layer instead of a single positional input. Sequence
/// files use `--named-layer`, whole documents use `-L`.
pub fn plan_theme(
    bucket: Option<Bucket>,
    output: &Path,
    layers: &[(String, PathBuf)],
    extent: &Extent,
) -> Plan {
    let mut args = vec![
        "-fo".into(),
        output.display().to_string(),
        "-zg".into(),
        "--clip-bounding-box".into(),
        extent.to_string(),
        "--cluster-maxzoom=11".into(),
    ];

    for (layer, file) in layers {
        let declaration = format!("{layer}:{}", file.display());

        if file.extension().is_some_and(|ext| ext == "geojsonseq") {
            args.push("--named-layer".into());
        } else {
            args.push("-L".into());
        }

        args.push(declaration);
    }

    if let Some(bucket) = bucket {
        args.extend(bucket_args(bucket).iter().map(ToString::to_string));
    }

    let layer = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Plan {
        output: output.to_path_buf(),
        layer,
        args,
    }
}

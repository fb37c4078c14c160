use crate::{error::Error, extent::Extent};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::info;

pub const MANIFEST_FILE: &str = "tilejson.json";

const TILEJSON_VERSION: &str = "3.0.0";

const MIN_ZOOM: u8 = 0;
const MAX_ZOOM: u8 = 14;

/// The served tile index: one document describing every archive in the
/// output directory. Rebuilt from scratch on every assembly pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileManifest {
    pub tilejson: String,
    pub name: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: [f64; 4],
    pub tiles: Vec<String>,
    pub vector_layers: Vec<VectorLayer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,
    pub description: String,
    pub fields: BTreeMap<String, String>,
}

struct KnownLayer {
    id: &'static str,
    description: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

/// Archives with known layer structure, one entry per theme plus the three
/// building LOD tiers. Anything else gets a generic descriptor.
const KNOWN_ARCHIVES: &[(&str, &[KnownLayer])] = &[
    (
        "base.pmtiles",
        &[
            KnownLayer {
                id: "land_use",
                description: "Land use polygons",
                fields: &[("subtype", "String"), ("class", "String")],
            },
            KnownLayer {
                id: "land_cover",
                description: "Land cover polygons",
                fields: &[("subtype", "String"), ("class", "String")],
            },
            KnownLayer {
                id: "land_residential",
                description: "Residential areas",
                fields: &[("subtype", "String"), ("class", "String")],
            },
            KnownLayer {
                id: "water",
                description: "Water bodies",
                fields: &[("subtype", "String"), ("class", "String")],
            },
            KnownLayer {
                id: "infrastructure",
                description: "Infrastructure",
                fields: &[("subtype", "String"), ("class", "String")],
            },
        ],
    ),
    (
        "settlement-extents.pmtiles",
        &[KnownLayer {
            id: "settlementextents",
            description: "Settlement boundary extents",
            fields: &[("name", "String"), ("type", "String"), ("id", "String")],
        }],
    ),
    (
        "transportation.pmtiles",
        &[KnownLayer {
            id: "roads",
            description: "Road network",
            fields: &[("class", "String"), ("subclass", "String")],
        }],
    ),
    (
        "places.pmtiles",
        &[
            KnownLayer {
                id: "places",
                description: "Points of interest",
                fields: &[("category", "String"), ("confidence", "Number")],
            },
            KnownLayer {
                id: "placenames",
                description: "Place names",
                fields: &[("subtype", "String"), ("locality_type", "String")],
            },
            KnownLayer {
                id: "health_facilities",
                description: "Health facilities",
                fields: &[("name", "String"), ("type", "String"), ("id", "String")],
            },
            KnownLayer {
                id: "settlement_names",
                description: "Settlement names",
                fields: &[("name", "String"), ("type", "String"), ("id", "String")],
            },
        ],
    ),
    (
        "admin.pmtiles",
        &[
            KnownLayer {
                id: "health_areas",
                description: "Health administrative areas",
                fields: &[("name", "String"), ("type", "String"), ("id", "String")],
            },
            KnownLayer {
                id: "health_zones",
                description: "Health administrative zones",
                fields: &[("name", "String"), ("type", "String"), ("id", "String")],
            },
        ],
    ),
    (
        "buildings_low_lod.pmtiles",
        &[KnownLayer {
            id: "buildings",
            description: "Buildings (Low LOD)",
            fields: &[("name", "String"), ("height", "Number"), ("level", "Number")],
        }],
    ),
    (
        "buildings_medium_lod.pmtiles",
        &[KnownLayer {
            id: "buildings",
            description: "Buildings (Medium LOD)",
            fields: &[("name", "String"), ("height", "Number"), ("level", "Number")],
        }],
    ),
    (
        "buildings_high_lod.pmtiles",
        &[KnownLayer {
            id: "buildings",
            description: "Buildings (High LOD)",
            fields: &[("name", "String"), ("height", "Number"), ("level", "Number")],
        }],
    ),
];

/// Scans `tile_dir` for archives and assembles the manifest, trusting only
/// the filesystem so the index can be rebuilt standalone from a pre-existing
/// output directory. Archives are listed in sorted-path order.
pub fn assemble(tile_dir: &Path, name: &str, extent: &Extent) -> Result<TileManifest, Error> {
    let mut archives: Vec<_> = fs::read_dir(tile_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "pmtiles"))
        .collect();

    archives.sort();

    let mut manifest = TileManifest {
        tilejson: TILEJSON_VERSION.to_string(),
        name: name.to_string(),
        minzoom: MIN_ZOOM,
        maxzoom: MAX_ZOOM,
        bounds: extent.bounds(),
        tiles: Vec::new(),
        vector_layers: Vec::new(),
    };

    for archive in &archives {
        let file_name = archive.file_name().unwrap_or_default().to_string_lossy();

        manifest.tiles.push(format!("pmtiles://tiles/{file_name}"));

        if let Some(layers) = known_layers(&file_name) {
            manifest.vector_layers.extend(layers.iter().map(|layer| {
                VectorLayer {
                    id: layer.id.to_string(),
                    description: layer.description.to_string(),
                    fields: layer
                        .fields
                        .iter()
                        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                        .collect(),
                }
            }));
        } else {
            let stem = archive
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();

            info!("added custom layer to manifest from {file_name}");

            manifest.vector_layers.push(VectorLayer {
                id: "layer".to_string(),
                description: format!("Custom layer: {stem}"),
                fields: [("id", "String"), ("name", "String")]
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            });
        }
    }

    Ok(manifest)
}

/// Serializes the whole document in memory, then writes it once, wholly
/// replacing any prior manifest.
pub fn write(manifest: &TileManifest, path: &Path) -> Result<(), Error> {
    let document = serde_json::to_string_pretty(manifest)?;

    fs::write(path, document).map_err(|source| Error::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "manifest written: {} tile sources, {} vector layers",
        manifest.tiles.len(),
        manifest.vector_layers.len()
    );

    Ok(())
}

fn known_layers(file_name: &str) -> Option<&'static [KnownLayer]> {
    KNOWN_ARCHIVES
        .iter()
        .find(|(known, _)| *known == file_name)
        .map(|(_, layers)| *layers)
}

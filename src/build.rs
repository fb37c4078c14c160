use crate::{
    error::Error,
    extent::Extent,
    plan::{self, BuildingLod, Plan},
    progress::Progress,
    rules::{self, Bucket},
};
use glob::Pattern;
use std::{
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Layer name given to every standalone archive so clients can address them
/// uniformly.
const STANDALONE_LAYER: &str = "layer";

/// How a build pass finds its inputs, where archives go, and which external
/// tool packs them. Passed in explicitly; there is no process-wide default.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub extent: Extent,
    pub data_dirs: Vec<PathBuf>,
    pub tile_dir: PathBuf,
    pub tool: PathBuf,
    pub skip_low_lod: bool,
    pub skip_medium_lod: bool,
    pub skip_high_lod: bool,
}

impl BuildConfig {
    fn enabled_lods(&self) -> Vec<BuildingLod> {
        BuildingLod::ALL
            .into_iter()
            .filter(|lod| match lod {
                BuildingLod::Low => !self.skip_low_lod,
                BuildingLod::Medium => !self.skip_medium_lod,
                BuildingLod::High => !self.skip_high_lod,
            })
            .collect()
    }
}

/// One invocation of the external tile tool.
#[derive(Clone, Debug)]
pub struct BuildUnit {
    pub name: String,
    pub plan: Plan,
}

/// Outcome of one build unit: the archive path on success, the tool's
/// diagnostic output on failure. Units are never retried.
#[derive(Debug)]
pub struct BuildResult {
    pub name: String,
    pub outcome: Result<PathBuf, String>,
}

impl BuildResult {
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

struct Theme {
    name: &'static str,
    /// (declared sub-layer, filename pattern) pairs merged into one archive.
    layers: &'static [(&'static str, &'static str)],
    /// Settings source for the merged invocation.
    bucket: Option<Bucket>,
    multi_lod: bool,
}

const THEMES: &[Theme] = &[
    Theme {
        name: "base",
        layers: &[
            ("land_use", "land_use.geojsonseq"),
            ("land_cover", "land_cover.geojsonseq"),
            ("land_residential", "land_residential.geojsonseq"),
            ("water", "water.geojsonseq"),
            ("infrastructure", "infrastructure.geojsonseq"),
        ],
        bucket: Some(Bucket::BasePolygons),
        multi_lod: false,
    },
    Theme {
        name: "settlement-extents",
        layers: &[("settlementextents", "*extent*.geojsonseq")],
        bucket: Some(Bucket::SettlementExtents),
        multi_lod: false,
    },
    Theme {
        name: "transportation",
        layers: &[("roads", "roads.geojsonseq")],
        bucket: Some(Bucket::Roads),
        multi_lod: false,
    },
    Theme {
        name: "places",
        layers: &[
            ("places", "places.geojson"),
            ("placenames", "placenames.geojson"),
            ("health_facilities", "health_facilities.geojson"),
            ("settlement_names", "settlement_names.geojson"),
        ],
        bucket: Some(Bucket::Places),
        multi_lod: false,
    },
    Theme {
        name: "admin",
        layers: &[
            ("health_areas", "health_areas.geojson"),
            ("health_zones", "health_zones.geojson"),
        ],
        bucket: None,
        multi_lod: false,
    },
    Theme {
        name: "buildings",
        layers: &[("buildings", "buildings.geojsonseq")],
        bucket: None,
        multi_lod: true,
    },
];

/// Builds every themed archive plus any custom standalone inputs, one tool
/// invocation per unit. A unit failure is recorded and the batch continues;
/// only a missing tool binary aborts the run.
pub fn build(
    config: &BuildConfig,
    filter: Option<&Pattern>,
    theme_filter: Option<&str>,
    custom_inputs: &[PathBuf],
    progress: &dyn Progress,
) -> Result<Vec<BuildResult>, Error> {
    let mut units = plan_custom_units(config, filter, custom_inputs);

    units.extend(plan_theme_units(config, filter, theme_filter));

    run_units(config, units, progress)
}

/// Builds only custom standalone inputs, skipping the theme table entirely.
pub fn build_custom(
    config: &BuildConfig,
    filter: Option<&Pattern>,
    custom_inputs: &[PathBuf],
    progress: &dyn Progress,
) -> Result<Vec<BuildResult>, Error> {
    let units = plan_custom_units(config, filter, custom_inputs);

    run_units(config, units, progress)
}

fn run_units(
    config: &BuildConfig,
    units: Vec<BuildUnit>,
    progress: &dyn Progress,
) -> Result<Vec<BuildResult>, Error> {
    std::fs::create_dir_all(&config.tile_dir)?;

    let total = units.len();

    let mut results = Vec::with_capacity(total);

    for (index, unit) in units.into_iter().enumerate() {
        info!("generating {}", unit.plan.output.display());

        let outcome = run_tool(&config.tool, &unit.plan)?;

        if let Err(ref detail) = outcome {
            warn!("{} failed: {}", unit.name, detail.trim());
        }

        results.push(BuildResult {
            name: unit.name,
            outcome,
        });

        progress.update(index + 1, total);
    }

    let failed = results.iter().filter(|result| !result.succeeded()).count();

    info!("processed {} units, {failed} failed", results.len());

    Ok(results)
}

/// Outer `Err` is fatal (tool binary missing); inner `Err` is a unit-level
/// failure carrying the tool's stderr.
fn run_tool(tool: &Path, plan: &Plan) -> Result<Result<PathBuf, String>, Error> {
    let output = match Command::new(tool).args(&plan.args).output() {
        Ok(output) => output,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ToolNotFound {
                tool: tool.display().to_string(),
            });
        }
        Err(error) => return Ok(Err(error.to_string())),
    };

    if output.status.success() {
        return Ok(Ok(plan.output.clone()));
    }

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    Ok(Err(if stderr.trim().is_empty() {
        format!("exit status {}", output.status)
    } else {
        stderr
    }))
}

fn plan_custom_units(
    config: &BuildConfig,
    filter: Option<&Pattern>,
    custom_inputs: &[PathBuf],
) -> Vec<BuildUnit> {
    let mut units = Vec::new();

    for input in custom_inputs {
        let Some(path) = locate_custom_input(config, input) else {
            warn!("custom file not found: {}", input.display());

            continue;
        };

        let file_name = path.file_name().unwrap_or_default().to_string_lossy();

        if let Some(filter) = filter {
            if !filter.matches(&file_name) {
                info!("skipping {file_name} (does not match filter)");

                continue;
            }
        }

        let name = archive_stem(&path);

        let output = config.tile_dir.join(format!("{name}.pmtiles"));

        let bucket = rules::resolve(Some(STANDALONE_LAYER), Some(&path));

        units.push(BuildUnit {
            name,
            plan: plan::plan(bucket, &output, STANDALONE_LAYER, &config.extent, &path),
        });
    }

    units
}

fn plan_theme_units(
    config: &BuildConfig,
    filter: Option<&Pattern>,
    theme_filter: Option<&str>,
) -> Vec<BuildUnit> {
    let mut units = Vec::new();

    for theme in THEMES {
        if theme_filter.is_some_and(|wanted| wanted != theme.name) {
            info!("skipping {} theme (does not match filter)", theme.name);

            continue;
        }

        let mut layer_files = Vec::new();

        for (layer, pattern) in theme.layers {
            let mut matches = find_files(&config.data_dirs, pattern);

            if let Some(filter) = filter {
                matches.retain(|path| {
                    path.file_name()
                        .is_some_and(|name| filter.matches(&name.to_string_lossy()))
                });
            }

            if let Some(file) = matches.into_iter().next() {
                layer_files.push(((*layer).to_string(), file));
            }
        }

        if layer_files.is_empty() {
            info!("no files found for {} theme", theme.name);

            continue;
        }

        if theme.multi_lod {
            for (_, file) in &layer_files {
                let stem = archive_stem(file);

                for lod in config.enabled_lods() {
                    let name = format!("{stem}{}", lod.suffix());

                    let output = config.tile_dir.join(format!("{name}.pmtiles"));

                    units.push(BuildUnit {
                        name,
                        plan: plan::plan_building(
                            lod,
                            &output,
                            STANDALONE_LAYER,
                            &config.extent,
                            file,
                        ),
                    });
                }
            }

            continue;
        }

        let output = config.tile_dir.join(format!("{}.pmtiles", theme.name));

        units.push(BuildUnit {
            name: theme.name.to_string(),
            plan: plan::plan_theme(theme.bucket, &output, &layer_files, &config.extent),
        });
    }

    units
}

/// Sorted-path matches for `pattern` across all data directories, so a fixed
/// directory state always yields the same discovery order.
fn find_files(data_dirs: &[PathBuf], pattern: &str) -> Vec<PathBuf> {
    let Ok(pattern) = Pattern::new(pattern) else {
        return Vec::new();
    };

    let mut matches: Vec<PathBuf> = data_dirs
        .iter()
        .flat_map(|dir| {
            WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    matches.sort();

    matches
}

fn locate_custom_input(config: &BuildConfig, input: &Path) -> Option<PathBuf> {
    if input.is_absolute() {
        return input.exists().then(|| input.to_path_buf());
    }

    for dir in &config.data_dirs {
        let candidate = dir.join(input);

        if candidate.exists() {
            return Some(candidate);
        }
    }

    // also accept a glob pattern relative to the data directories
    find_files(&config.data_dirs, &input.to_string_lossy())
        .into_iter()
        .next()
}

/// Archive name for an input file; strips a doubled sequence suffix left by
/// upstream conversions.
fn archive_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.strip_suffix(".geojsonseq")
        .map_or(stem.clone(), ToString::to_string)
}

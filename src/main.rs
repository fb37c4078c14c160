mod build;
mod download;
mod error;
mod extent;
mod geometry;
mod manifest;
mod options;
mod plan;
mod progress;
mod rules;

use build::BuildConfig;
use clap::Parser;
use error::Error;
use glob::Pattern;
use options::{CommandKind, Options, TilesArgs};
use progress::ConsoleProgress;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let options = Options::parse();

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");

            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options) -> Result<(), Error> {
    let extent = options.extent.snap_to_tiles(options.snap_zoom);

    if extent != options.extent {
        info!("extent snapped to tile grid: {extent}");
    }

    match &options.command {
        CommandKind::Download => download(options),
        CommandKind::Tiles(args) => tiles(options, args),
        CommandKind::Custom(args) => {
            let config = build_config(options);
            let filter = parse_filter(args.filter.as_deref())?;

            let results = build::build_custom(
                &config,
                filter.as_ref(),
                &as_paths(&args.inputs),
                &ConsoleProgress,
            )?;

            finish(options, &results)
        }
        CommandKind::All(args) => {
            download(options)?;

            tiles(options, args)
        }
    }
}

fn download(options: &Options) -> Result<(), Error> {
    let extent = options
        .extent
        .snap_to_tiles(options.snap_zoom)
        .buffered(options.download_buffer);

    let data_dir = options
        .data_dir
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"));

    download::run(
        &options.template,
        &data_dir,
        &extent,
        &options.query_tool,
        &ConsoleProgress,
    )
}

fn tiles(options: &Options, args: &TilesArgs) -> Result<(), Error> {
    let config = build_config(options);
    let filter = parse_filter(args.filter.as_deref())?;

    let results = build::build(
        &config,
        filter.as_ref(),
        args.theme.as_deref(),
        &as_paths(&args.inputs),
        &ConsoleProgress,
    )?;

    finish(options, &results)
}

/// Assembles the manifest from whatever archives ended up on disk, then
/// reports the batch outcome. Partial batches still get a manifest.
fn finish(options: &Options, results: &[build::BuildResult]) -> Result<(), Error> {
    let extent = options.extent.snap_to_tiles(options.snap_zoom);

    let manifest = manifest::assemble(&options.tile_dir, &options.name, &extent)?;

    manifest::write(&manifest, &options.tile_dir.join(manifest::MANIFEST_FILE))?;

    let failed = results.iter().filter(|result| !result.succeeded()).count();

    if failed > 0 {
        error!("{failed} of {} archives failed", results.len());
    }

    Ok(())
}

fn build_config(options: &Options) -> BuildConfig {
    BuildConfig {
        extent: options.extent.snap_to_tiles(options.snap_zoom),
        data_dirs: options.data_dir.clone(),
        tile_dir: options.tile_dir.clone(),
        tool: options.tool.clone(),
        skip_low_lod: options.skip_low_lod,
        skip_medium_lod: options.skip_medium_lod,
        skip_high_lod: options.skip_high_lod,
    }
}

fn parse_filter(filter: Option<&str>) -> Result<Option<Pattern>, Error> {
    filter.map(Pattern::new).transpose().map_err(Error::from)
}

fn as_paths(inputs: &[String]) -> Vec<PathBuf> {
    inputs.iter().map(PathBuf::from).collect()
}

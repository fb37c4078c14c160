use crate::extent::Extent;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser, PartialEq)]
pub struct Options {
    /// Geographic extent to process as `xmin,ymin,xmax,ymax` (WGS84 degrees)
    #[clap(long)]
    pub extent: Extent,

    /// Directory with downloaded feature collections; may be repeated
    #[clap(long, default_value = "data")]
    pub data_dir: Vec<PathBuf>,

    /// Directory receiving the tile archives and the manifest
    #[clap(long, default_value = "tiles")]
    pub tile_dir: PathBuf,

    /// Tile-building binary
    #[clap(long, default_value = "tippecanoe")]
    pub tool: PathBuf,

    /// Query-engine binary used by the download step
    #[clap(long, default_value = "duckdb")]
    pub query_tool: PathBuf,

    /// SQL template driving the download step
    #[clap(long, default_value = "tileQueries.template")]
    pub template: PathBuf,

    /// Degrees added around the extent when downloading so edge features are complete
    #[clap(long, default_value_t = 0.2)]
    pub download_buffer: f64,

    /// Zoom level whose tile grid the extent is snapped to
    #[clap(long, default_value_t = 8)]
    pub snap_zoom: u8,

    /// Name recorded in the manifest
    #[clap(long, default_value = "Basemap prototype")]
    pub name: String,

    /// Skip the low-LOD building archive
    #[clap(long)]
    pub skip_low_lod: bool,

    /// Skip the medium-LOD building archive
    #[clap(long)]
    pub skip_medium_lod: bool,

    /// Skip the high-LOD building archive
    #[clap(long)]
    pub skip_high_lod: bool,

    #[clap(subcommand)]
    pub command: CommandKind,
}

#[derive(Clone, Debug, Subcommand, PartialEq)]
pub enum CommandKind {
    /// Extract feature collections for the extent into the data directory
    Download,

    /// Build tile archives from downloaded data and write the manifest
    Tiles(TilesArgs),

    /// Build archives only for explicitly named standalone files
    Custom(CustomArgs),

    /// Download, then build everything and write the manifest
    All(TilesArgs),
}

#[derive(Clone, Debug, Args, PartialEq)]
pub struct TilesArgs {
    /// Only build archives whose input file names match this glob pattern
    #[clap(long)]
    pub filter: Option<String>,

    /// Only build the named theme
    #[clap(long)]
    pub theme: Option<String>,

    /// Additional standalone input files to build as custom archives; may be repeated
    #[clap(long = "input")]
    pub inputs: Vec<String>,
}

#[derive(Clone, Debug, Args, PartialEq)]
pub struct CustomArgs {
    /// Only build archives whose input file names match this glob pattern
    #[clap(long)]
    pub filter: Option<String>,

    /// Standalone input files to build; may be repeated
    #[clap(long = "input", required = true)]
    pub inputs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_command_line() {
        let options = Options::parse_from([
            "basemap-maker",
            "--extent",
            "10,20,30,40",
            "tiles",
        ]);

        assert_eq!(options.extent.to_string(), "10,20,30,40");
        assert_eq!(options.tool, PathBuf::from("tippecanoe"));
        assert_eq!(options.data_dir, vec![PathBuf::from("data")]);
        assert!(matches!(options.command, CommandKind::Tiles(_)));
    }

    #[test]
    fn extent_is_required() {
        assert!(Options::try_parse_from(["basemap-maker", "tiles"]).is_err());
    }

    #[test]
    fn custom_requires_an_input() {
        assert!(
            Options::try_parse_from(["basemap-maker", "--extent", "10,20,30,40", "custom"])
                .is_err()
        );

        let options = Options::parse_from([
            "basemap-maker",
            "--extent",
            "10,20,30,40",
            "custom",
            "--input",
            "extra.geojson",
        ]);

        match options.command {
            CommandKind::Custom(args) => assert_eq!(args.inputs, vec!["extra.geojson"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn data_dir_is_repeatable() {
        let options = Options::parse_from([
            "basemap-maker",
            "--extent",
            "10,20,30,40",
            "--data-dir",
            "data",
            "--data-dir",
            "more-data",
            "tiles",
        ]);

        assert_eq!(options.data_dir.len(), 2);
    }

    #[test]
    fn lod_skips_default_off() {
        let options = Options::parse_from([
            "basemap-maker",
            "--extent",
            "10,20,30,40",
            "--skip-medium-lod",
            "tiles",
        ]);

        assert!(!options.skip_low_lod);
        assert!(options.skip_medium_lod);
        assert!(!options.skip_high_lod);
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rainfall-raster")]
#[command(about = "Daily rainfall station records to monthly and climatology GeoTIFF rasters")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// TOML configuration file; RAINFALL_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide progress spinners
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate, merge, rasterize and build the climatology in one run
    Run {
        #[arg(short, long, help = "Directory of daily *_YYYY.csv files")]
        input_dir: Option<PathBuf>,

        #[arg(short, long, help = "Output root directory")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Worker threads for rasterization")]
        max_workers: Option<usize>,
    },

    /// Daily files to monthly_rainfall_<YYYY>.csv tables
    Aggregate {
        #[arg(short, long, help = "Directory of daily *_YYYY.csv files")]
        input_dir: Option<PathBuf>,

        #[arg(short, long, help = "Output root directory")]
        output_dir: Option<PathBuf>,
    },

    /// Monthly tables to monthly_rainfall_merged.csv
    Merge {
        #[arg(short, long, help = "Output root directory holding monthly/")]
        output_dir: Option<PathBuf>,
    },

    /// Point file to one GeoTIFF per attribute column
    Rasterize {
        #[arg(short, long, help = "Delimited point file")]
        input: PathBuf,

        #[arg(short, long, help = "Directory for the rasters [default: <output_dir>/rasters]")]
        output_dir: Option<PathBuf>,
    },

    /// Merged table to twelve monthly climatology GeoTIFFs
    Climatology {
        #[arg(short, long, help = "Merged monthly table")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Directory for the rasters [default: <output_dir>/rasters/climatology]"
        )]
        output_dir: Option<PathBuf>,
    },
}

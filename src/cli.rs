use crate::search::DispatchMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "citrus-imageset")]
#[command(about = "Citrus pest/deficiency image dataset builder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose log output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect, filter and publish images for one or both index sheets
    Run {
        /// Excel training index (sheets "Plagas" and "Deficiencias")
        #[arg(required = true)]
        excel: PathBuf,

        /// Sheet to process (plagas/deficiencias/both)
        #[arg(short, long, default_value = "both")]
        sheet: SheetSelection,

        /// Query fan-out mode (sequential/concurrent)
        #[arg(short, long, default_value = "concurrent")]
        mode: DispatchMode,

        /// Skip the first N data rows of each sheet
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Process at most N rows per sheet
        #[arg(long)]
        limit: Option<usize>,

        /// Keep relevant pest images local only; deficiency uploads are unaffected
        #[arg(long)]
        skip_pest_upload: bool,

        /// Aggregate per-row search payload output
        #[arg(short, long, default_value = "new_data.json")]
        output: PathBuf,
    },

    /// Show which credentials are configured
    Config {
        /// Show configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub enum SheetSelection {
    Plagas,
    Deficiencias,
    #[default]
    Both,
}

impl SheetSelection {
    pub fn sheet_names(&self) -> &'static [&'static str] {
        match self {
            SheetSelection::Plagas => &[crate::sheet::SHEET_PLAGAS],
            SheetSelection::Deficiencias => &[crate::sheet::SHEET_DEFICIENCIAS],
            SheetSelection::Both => &[crate::sheet::SHEET_PLAGAS, crate::sheet::SHEET_DEFICIENCIAS],
        }
    }
}

impl std::str::FromStr for SheetSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plagas" | "pests" => Ok(SheetSelection::Plagas),
            "deficiencias" | "deficiencies" => Ok(SheetSelection::Deficiencias),
            "both" => Ok(SheetSelection::Both),
            _ => Err(format!(
                "Unknown sheet: {}. Use plagas, deficiencias, or both",
                s
            )),
        }
    }
}

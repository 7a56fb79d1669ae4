use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// IVTC cadence annotation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to file (default: ivtcdn.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project for a source script, tiled with the default cadence
    New {
        /// Source script the clip comes from (.vpy)
        script: PathBuf,

        /// Number of separated fields in the clip
        #[arg(short = 'n', long = "fields", value_name = "N")]
        fields: usize,

        /// Project file to write (.ivtc)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: PathBuf,
    },

    /// Print a project summary (field/frame counts, markers, overrides)
    Info {
        /// Project file (.ivtc)
        project: PathBuf,
    },

    /// Dump the project document as plain JSON to stdout
    Dump {
        /// Project file (.ivtc)
        project: PathBuf,
    },

    /// Upgrade a legacy project file to the current schema in place
    Migrate {
        /// Project file (.ivtc)
        project: PathBuf,
    },

    /// Copy a cycle's cadence pattern across its enclosing scene
    Propagate {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Cycle to propagate from (default: the project's active cycle)
        #[arg(short = 'c', long = "cycle", value_name = "N")]
        cycle: Option<usize>,
    },

    /// Set the cadence action of a single field
    SetAction {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Field index
        field: usize,

        /// Action: numeric code 0-9 or name (e.g. "drop", "top_frame_2")
        action: String,
    },

    /// Set the note label of a single field
    SetNote {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Field index
        field: usize,

        /// Note label (conventionally A-D)
        note: String,
    },

    /// Toggle the scene-change marker on a field
    ToggleScene {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Field index
        field: usize,
    },

    /// Toggle the "Next" no-match override on an output frame
    ToggleNoMatch {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Output frame index
        frame: usize,
    },

    /// Set the free-form attribute text of an output frame (empty clears)
    SetAttribute {
        /// Project file (.ivtc)
        project: PathBuf,

        /// Output frame index
        frame: usize,

        /// Attribute text; empty or whitespace removes the attribute
        #[arg(default_value = "")]
        text: String,
    },
}

//! Command-line surface (spec §6.1): every recognized flag, kept
//! separate from `main.rs` so dispatch stays focused on wiring.

use clap::{Parser, Subcommand};

/// respack - OpenHarmony-style resource packager
#[derive(Parser)]
#[command(name = "respack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Resource source directory (repeatable)
    #[arg(short = 'i', long = "inputPath")]
    pub input_path: Vec<String>,

    /// App package name
    #[arg(short = 'p', long = "packageName")]
    pub package_name: Option<String>,

    /// Output root
    #[arg(short = 'o', long = "outputPath")]
    pub output_path: Option<String>,

    /// Generated header artifact path (repeatable)
    #[arg(short = 'r', long = "resHeader")]
    pub res_header: Vec<String>,

    /// Overwrite existing output
    #[arg(short = 'f', long = "forceWrite")]
    pub force_write: bool,

    /// Comma-separated module names, aligned by position with --inputPath
    #[arg(short = 'm', long = "modules")]
    pub modules: Option<String>,

    /// Path to module.json / config.json
    #[arg(short = 'j', long = "json")]
    pub json: Option<String>,

    /// Hex start id: [0x01000000,0x06FFFFFF) or [0x08000000,0xFFFFFFFF)
    #[arg(short = 'e', long = "startId")]
    pub start_id: Option<String>,

    /// Append-mode source (repeatable)
    #[arg(short = 'x', long = "append")]
    pub append: Vec<String>,

    /// Incremental-compile flag
    #[arg(short = 'z', long = "combine")]
    pub combine: bool,

    /// Path to a JSON describing the option set
    #[arg(short = 'l', long = "fileList")]
    pub file_list: Option<String>,

    /// Directory to emit id_defined.json
    #[arg(long = "ids")]
    pub ids: Option<String>,

    /// Path to an input id_defined.json
    #[arg(long = "defined-ids")]
    pub defined_ids: Option<String>,

    /// Entry-module build dir (feature-module builds)
    #[arg(long = "dependEntry")]
    pub depend_entry: Option<String>,

    /// Enable the icon-size checker
    #[arg(long = "icon-check")]
    pub icon_check: bool,

    /// Selective-compile filter (spec §6.3)
    #[arg(long = "target-config")]
    pub target_config: Option<String>,

    /// Path(s) to a system id_defined.json (repeatable)
    #[arg(long = "defined-sysids")]
    pub defined_sysids: Vec<String>,

    /// Path to opt-compression.json
    #[arg(long = "compressed-config")]
    pub compressed_config: Option<String>,

    /// Worker-thread count
    #[arg(long = "thread")]
    pub thread: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect a built HAP (out of scope; see spec §6.1)
    Dump {
        /// Path to the HAP or resources.index to inspect
        config: Option<String>,
    },
}

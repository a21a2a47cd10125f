use std::path::PathBuf;

use url::Url;

#[derive(clap::Parser, Debug)]
#[clap(name = "folio", version, about = "Export rich-text documents to PDF, DOCX and HTML")]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Export an HTML document
    Export {
        /// Target format
        #[clap(value_enum)]
        format: FormatArg,
        /// Input HTML file, or `-` for stdin
        input: String,
        /// Output name (defaults to the input file stem)
        #[clap(long, short)]
        output: Option<String>,
        /// Directory the artifact is written to
        #[clap(long)]
        out_dir: Option<PathBuf>,
        /// Base URL relative image sources are resolved against
        #[clap(long)]
        base_url: Option<Url>,
        /// Run the export without writing the artifact
        #[clap(long)]
        dry_run: bool,
    },
    /// List the supported export formats
    Formats,
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Pdf,
    Docx,
    Html,
}

impl From<FormatArg> for folio_export::TargetFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => folio_export::TargetFormat::Pdf,
            FormatArg::Docx => folio_export::TargetFormat::Docx,
            FormatArg::Html => folio_export::TargetFormat::Html,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show all configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Get a configuration value, or every value of a section
    Get {
        /// Key such as `images.timeout_ms`, or a section such as `images`
        key: String,
    },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
}

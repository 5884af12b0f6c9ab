// Command-line surface for the aidetect binary
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

use crate::app::InputSource;
use crate::config::{clamp_display_chunks, Settings};
use crate::extraction::InputMode;
use crate::report::DisplayOptions;

#[derive(Parser, Debug)]
#[command(
    name = "aidetect",
    author,
    version,
    about = "Estimate whether text was machine generated"
)]
pub struct Cli {
    /// Config file (defaults to $AIDETECT_CONFIG, ./aidetect.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify text or a document
    Detect(DetectArgs),
    /// Print the text extracted from a document
    Extract(ExtractArgs),
    /// List preset models and whether they are installed
    Models,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Text to classify; `-` reads stdin
    #[arg(long)]
    pub text: Option<String>,

    /// Document to extract and classify
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Input kind; inferred from the file extension when omitted
    #[arg(long, value_enum, requires = "file")]
    pub mode: Option<InputMode>,

    /// Model identifier (preset or a directory under the models dir)
    #[arg(long)]
    pub model: Option<String>,

    /// Number of chunks to list (1-50)
    #[arg(long)]
    pub max_chunks: Option<usize>,

    /// Print the raw text under each chunk row
    #[arg(long)]
    pub show_chunks: bool,

    /// Only list chunks whose text or label contains this
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Classify chunks on this many blocking workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long, value_enum)]
    pub mode: Option<InputMode>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl SourceArgs {
    pub fn into_source(self, mode: Option<InputMode>) -> std::io::Result<InputSource> {
        match (self.text, self.file) {
            (Some(text), _) if text == "-" => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(InputSource::Text(buf))
            }
            (Some(text), _) => Ok(InputSource::Text(text)),
            (None, Some(path)) => Ok(InputSource::File { path, mode }),
            (None, None) => Ok(InputSource::Text(String::new())),
        }
    }
}

impl DetectArgs {
    /// Fold flag values over the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.detector.model = model.clone();
        }
        if let Some(workers) = self.workers {
            settings.detector.workers = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.detector.chunk_size = chunk_size;
        }
        if let Some(max_chunks) = self.max_chunks {
            settings.display.max_chunks = max_chunks;
        }
        if self.show_chunks {
            settings.display.show_chunk_text = true;
        }
    }

    pub fn display_options(&self, settings: &Settings) -> DisplayOptions {
        DisplayOptions {
            max_chunks: clamp_display_chunks(settings.display.max_chunks),
            show_text: settings.display.show_chunk_text,
            search: self.search.clone(),
        }
    }
}

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use classfold::config::{DEFAULT_FILES_PER_CLASS, DEFAULT_NUM_CLASSES};

/// Classfold: validate and normalize labeled image dataset archives
#[derive(Parser)]
#[command(name = "classfold")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the object store buckets
    #[arg(
        long,
        global = true,
        env = "CLASSFOLD_STORE",
        default_value = "./classfold-store"
    )]
    pub store: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a dataset archive without storing it
    Validate {
        /// Path to the .zip archive
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Expected number of classes
        #[arg(long, default_value_t = DEFAULT_NUM_CLASSES)]
        classes: usize,

        /// Expected number of files in every class
        #[arg(long, default_value_t = DEFAULT_FILES_PER_CLASS)]
        files_per_class: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate an archive and store the dataset in a bucket
    Ingest {
        /// Path to the .zip archive
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Target bucket
        #[arg(short, long)]
        bucket: String,

        /// Store under this name instead of the archive's dataset folder name
        #[arg(long)]
        dataset_name: Option<String>,

        /// Create the bucket if it does not exist
        #[arg(long)]
        create_bucket: bool,

        /// Expected number of classes
        #[arg(long, default_value_t = DEFAULT_NUM_CLASSES)]
        classes: usize,

        /// Expected number of files in every class
        #[arg(long, default_value_t = DEFAULT_FILES_PER_CLASS)]
        files_per_class: usize,
    },

    /// List datasets, classes of a dataset, or samples of a class
    List {
        #[arg(short, long)]
        bucket: String,

        #[arg(short, long)]
        dataset: Option<String>,

        #[arg(short, long, requires = "dataset")]
        class: Option<String>,
    },

    /// Delete a dataset, a class or a single sample
    Delete {
        #[arg(short, long)]
        bucket: String,

        #[arg(short, long)]
        dataset: String,

        #[arg(short, long)]
        class: Option<String>,

        /// Sample file name (requires --class)
        #[arg(short, long, requires = "class")]
        sample: Option<String>,
    },

    /// Copy a dataset or one class out of the store
    Download {
        #[arg(short, long)]
        bucket: String,

        #[arg(short, long)]
        dataset: String,

        #[arg(short, long)]
        class: Option<String>,

        /// Destination directory
        #[arg(long, value_name = "DIR")]
        dest: PathBuf,
    },

    /// Create or delete buckets
    Bucket {
        #[command(subcommand)]
        action: BucketAction,
    },

    /// Upload, download or delete single files at the top level of a bucket
    File {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Run the HTTP API
    Serve {
        /// Port for the web server
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum BucketAction {
    /// Create a bucket
    Create {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Delete a bucket and everything in it
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum FileAction {
    /// Store a file; an existing file of the same name is replaced
    Upload {
        #[arg(short, long)]
        bucket: String,

        /// File to upload; stored under its file name
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Metadata string stored with the file
        #[arg(short, long)]
        metadata: Option<String>,
    },
    /// Copy a file out of the store
    Download {
        #[arg(short, long)]
        bucket: String,

        #[arg(value_name = "NAME")]
        name: String,

        /// Destination directory
        #[arg(long, value_name = "DIR")]
        dest: PathBuf,
    },
    /// Delete a file
    Delete {
        #[arg(short, long)]
        bucket: String,

        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use text, json, or csv.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

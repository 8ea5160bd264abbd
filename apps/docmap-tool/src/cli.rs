use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the partial update that turns one stored document into another
    Diff {
        /// Schema definition file
        #[arg(short, long)]
        schema: PathBuf,

        /// Stored document before the edit
        #[arg(short, long)]
        before: PathBuf,

        /// Document after the edit
        #[arg(short, long)]
        after: PathBuf,
    },

    /// List the accessor methods generated for a schema
    Accessors {
        /// Schema definition file
        #[arg(short, long)]
        schema: PathBuf,

        /// Only list accessors of this attribute
        #[arg(long)]
        attribute: Option<String>,
    },

    /// Invoke one generated accessor on a stored document
    Call {
        /// Schema definition file
        #[arg(short, long)]
        schema: PathBuf,

        /// Stored document
        #[arg(short, long)]
        document: PathBuf,

        /// Generated method name, e.g. `name=` or `name_changed?`
        #[arg(short, long)]
        method: String,

        /// JSON value for writer accessors
        #[arg(long)]
        value: Option<String>,
    },
}

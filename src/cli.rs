use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
}

#[derive(Parser)]
#[command(name = "ytscribe", about = "YouTube caption transcript service", version)]
pub struct Cli {
    /// Config file (default: ~/.config/ytscribe/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show extraction details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP transcript service
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch one transcript and print it
    Fetch {
        /// YouTube video URL or video ID (reads from stdin if omitted)
        url: Option<String>,

        /// Output format: text (default), json, srt
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Preferred caption language (overrides config)
        #[arg(short, long)]
        lang: Option<String>,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

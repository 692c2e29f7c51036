use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::capture::View;

/// Command line interface for the screening relay and client.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Config file (defaults to <config_dir>/teledent/config.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay in front of the inference service.
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Probe the relay's health endpoint.
    Health {
        /// Relay API base URL, e.g. http://127.0.0.1:3000/api
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Screen a set of intraoral photos.
    Screen(ScreenArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScreenArgs {
    /// Front teeth photo
    #[arg(long)]
    pub front: Option<PathBuf>,
    /// Left side photo
    #[arg(long)]
    pub left: Option<PathBuf>,
    /// Right side photo
    #[arg(long)]
    pub right: Option<PathBuf>,
    /// Upper jaw photo
    #[arg(long)]
    pub upper: Option<PathBuf>,
    /// Lower jaw photo
    #[arg(long)]
    pub lower: Option<PathBuf>,

    /// Relay API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Analyze whatever views were supplied instead of requiring all five.
    #[arg(long, default_value_t = false)]
    pub allow_incomplete: bool,

    /// Directory to write annotated images into.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print the full report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl ScreenArgs {
    /// Supplied photo paths, in view order.
    pub fn view_paths(&self) -> Vec<(View, &PathBuf)> {
        [
            (View::Front, &self.front),
            (View::Left, &self.left),
            (View::Right, &self.right),
            (View::Upper, &self.upper),
            (View::Lower, &self.lower),
        ]
        .into_iter()
        .filter_map(|(view, path)| path.as_ref().map(|p| (view, p)))
        .collect()
    }
}

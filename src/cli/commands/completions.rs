//! Shell completion generation
//!
//! ```bash
//! # Bash - add to ~/.bashrc
//! source <(dineflow completions bash)
//!
//! # Zsh - add to ~/.zshrc
//! source <(dineflow completions zsh)
//!
//! # Fish
//! dineflow completions fish -o ~/.config/fish/completions/dineflow.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::write_output;
use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut script = Vec::new();
    generate(args.shell, &mut Cli::command(), "dineflow", &mut script);
    let script = String::from_utf8(script).into_diagnostic()?;
    write_output(&script, args.output)
}

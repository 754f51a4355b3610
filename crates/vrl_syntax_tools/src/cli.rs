//! CLI interface for vrl-syntax-tools

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vrl-syntax")]
#[command(about = "Inspect VRL grammar artifacts and parse source files")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a built-in grammar as an artifact
    DemoGrammar {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = DemoLanguage::Vrl)]
        language: DemoLanguage,
    },

    /// Summarize a grammar artifact
    Inspect {
        /// Compiled grammar artifact
        grammar: PathBuf,

        #[arg(short, long, value_enum, default_value_t = InspectFormat::Text)]
        format: InspectFormat,
    },

    /// Parse a source file and print its syntax tree
    Parse {
        /// Compiled grammar artifact
        #[arg(short, long)]
        grammar: PathBuf,

        /// Source file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = TreeFormat::Sexp)]
        format: TreeFormat,

        /// Abort after this many tokens
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Abort after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum number of parallel GLR stacks
        #[arg(long)]
        max_stacks: Option<usize>,
    },

    /// Reparse `new` incrementally from the tree of `old` and report what changed
    Diff {
        /// Compiled grammar artifact
        #[arg(short, long)]
        grammar: PathBuf,

        old: PathBuf,

        new: PathBuf,

        /// Also check the reparse against a full parse
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoLanguage {
    /// VRL expressions: newline terminated, `??`, `||` and `+` operators
    Vrl,
    /// `let` declarations and `;` terminated sums
    Statements,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    Text,
    Json,
    /// Graphviz rendering of the LR automaton
    Dot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TreeFormat {
    Sexp,
    /// Indented tree with ranges and token text
    Debug,
    Json,
}

//! vrl-syntax CLI
//!
//! Command-line tools for grammar artifacts and syntax trees.

use anyhow::{bail, Context, Result};
use clap::Parser as _;
use std::fs;
use std::path::Path;
use std::time::Duration;
use vrl_syntax::testing::{statements_language, vrl_language};
use vrl_syntax::{Language, ParseBudget, Parser, ParserConfig};
use vrl_syntax_tools::cli::{Cli, Commands, DemoLanguage, InspectFormat, TreeFormat};
use vrl_syntax_tools::render;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    match cli.command {
        Commands::DemoGrammar { output, language } => {
            let language = match language {
                DemoLanguage::Vrl => vrl_language(),
                DemoLanguage::Statements => statements_language(),
            };
            let bytes = language.to_bytes();
            fs::write(&output, &bytes).with_context(|| format!("writing {}", output.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), output.display());
        }
        Commands::Inspect { grammar, format } => {
            let language = load_language(&grammar)?;
            match format {
                InspectFormat::Text => print!("{}", render::language_summary(&language)),
                InspectFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&render::language_json(&language))?);
                }
                InspectFormat::Dot => print!("{}", render::automaton_dot(&language)),
            }
        }
        Commands::Parse {
            grammar,
            input,
            format,
            max_tokens,
            timeout_ms,
            max_stacks,
        } => {
            let language = load_language(&grammar)?;
            let text = read_source(&input)?;
            let mut budget = ParseBudget::unlimited();
            if let Some(limit) = max_tokens {
                budget = budget.with_max_tokens(limit);
            }
            if let Some(ms) = timeout_ms {
                budget = budget.with_timeout(Duration::from_millis(ms));
            }
            let mut config = ParserConfig::default().with_budget(budget);
            if let Some(limit) = max_stacks {
                config = config.with_max_stacks(limit);
            }
            let tree = Parser::with_config(language, config)
                .parse(&text)
                .with_context(|| format!("parsing {}", input.display()))?;
            match format {
                TreeFormat::Sexp => println!("{}", tree.to_sexp()),
                TreeFormat::Debug => print!("{}", render::tree_debug(&tree)),
                TreeFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&render::tree_json(&tree.root()))?);
                }
            }
            log::debug!("metrics: {:?}", tree.metrics());
            for error in tree.syntax_errors() {
                eprintln!("{}: {error}", input.display());
            }
        }
        Commands::Diff {
            grammar,
            old,
            new,
            verify,
        } => {
            let language = load_language(&grammar)?;
            let old_text = read_source(&old)?;
            let new_text = read_source(&new)?;
            let parser = Parser::new(language);
            let prior = parser.parse(&old_text)?;
            let edit = render::minimal_edit(&old_text, &new_text);
            let (tree, stats) = parser.reparse_with_stats(&prior, edit, &new_text)?;
            println!("edit {edit}");
            for range in tree.changed_ranges(&prior) {
                println!("changed {range}: {:?}", new_text.get(range.as_usize_range()).unwrap_or_default());
            }
            println!("{}", serde_json::to_string_pretty(&stats)?);
            if verify && tree != parser.parse(&new_text)? {
                bail!("incremental reparse differs from a full parse");
            }
        }
    }

    Ok(())
}

fn load_language(path: &Path) -> Result<Language> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Language::load(&bytes).with_context(|| format!("loading grammar {}", path.display()))
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

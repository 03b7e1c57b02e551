use anyhow::Context as _;
use canonlr::{
    automaton::Automaton,
    driver,
    grammar::Grammar,
    table::{Config, ParseTable, TableError},
};
use clap::Parser;
use std::{fs, path::PathBuf, process};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    /// Terminal names to parse. `$` ends the input.
    tokens: Vec<String>,

    /// Read whitespace-separated terminal names from the file.
    #[arg(long, conflicts_with = "tokens")]
    input: Option<PathBuf>,

    /// Write the ACTION/GOTO tables as CSV to the file.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Write the item sets and transitions of the automaton to the file.
    #[arg(long)]
    automaton: Option<PathBuf>,

    /// Print the stacks before each parsing step.
    #[arg(long)]
    trace: bool,

    /// Skip malformed grammar lines instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Resolve shift/reduce conflicts in favor of shift.
    #[arg(long)]
    prefer_shift: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = if args.lenient {
        let source = fs::read_to_string(&args.grammar).with_context(|| {
            anyhow::anyhow!("failed to read the grammar file {}", args.grammar.display())
        })?;
        Grammar::from_str_lenient(&source)?
    } else {
        Grammar::from_file(&args.grammar).with_context(|| {
            anyhow::anyhow!("failed to load the grammar file {}", args.grammar.display())
        })?
    };

    let mut empty_nonterminals = vec![];
    for nonterminal in grammar.nonterminals.values() {
        if grammar.productions_of(nonterminal.id()).next().is_none() {
            empty_nonterminals.push(nonterminal.name());
        }
    }
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    let automaton = Automaton::build(&grammar);
    if let Some(path) = &args.automaton {
        fs::write(path, automaton.display(&grammar).to_string())
            .with_context(|| anyhow::anyhow!("failed to write {}", path.display()))?;
    }

    let mut config = Config::new();
    if args.prefer_shift {
        config.prefer_shift();
    }
    let table = match ParseTable::generate_with_config(&grammar, &automaton, &config) {
        Ok(table) => table,
        Err(err) => {
            for conflict in err.conflicts() {
                eprintln!("[error] {}", conflict);
            }
            if matches!(err, TableError::Conflicts(..)) {
                eprintln!("[hint] rerun with --prefer-shift to resolve them by shifting");
            }
            return Err(err).context("failed to build the parse table");
        }
    };
    if let Some(path) = &args.table {
        fs::write(path, table.display_csv(&grammar).to_string())
            .with_context(|| anyhow::anyhow!("failed to write {}", path.display()))?;
    }

    let tokens = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| anyhow::anyhow!("failed to read {}", path.display()))?
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect(),
        None => args.tokens.clone(),
    };
    if tokens.is_empty() && args.input.is_none() {
        return Ok(());
    }

    let report = driver::parse(&grammar, &table, &tokens, args.trace)?;
    for step in &report.trace {
        println!("{}", step.display(&grammar));
    }
    println!("{}", report.display(&grammar));

    if !report.is_accepted() {
        process::exit(1);
    }

    Ok(())
}

//! Syntax support for grammar files.
//!
//! A grammar file contains one rule per line:
//!
//! ```text
//! # comment
//! S' -> S
//! S  -> C C
//! C  -> c C | d
//! A  -> ε
//! ```
//!
//! Symbols that appear on the left-hand side of some rule are nonterminals,
//! every other symbol is a terminal. The left-hand side of the first rule is
//! the start symbol.

use crate::{
    grammar::{GrammarDef, GrammarDefError, NonterminalID, SymbolID, TerminalID, END_MARKER, EPSILON},
    types::{Map, Set},
};
use std::fmt;

const ARROW: &str = "->";
const ALTERNATIVE: char = '|';
const COMMENT: char = '#';

/// A rule line, possibly with several alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDesc {
    pub line: usize,
    pub left: String,
    pub alternatives: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {}: {}", line, kind)]
pub struct SyntaxError {
    pub line: usize,
    pub kind: SyntaxErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    /// The line does not contain `->`.
    MissingArrow { text: String },

    /// Nothing in front of `->`.
    EmptyLeft,

    /// More than one symbol in front of `->`.
    MultipleLeft { text: String },

    /// `$` or `ε` used as a symbol.
    ReservedSymbol { symbol: String },

    /// An empty alternative next to `|`. The empty production must be written as `ε`.
    EmptyAlternative,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArrow { text } => write!(f, "the line does not contain `->': {}", text),
            Self::EmptyLeft => f.write_str("missing the left-hand side"),
            Self::MultipleLeft { text } => {
                write!(f, "the left-hand side must be a single symbol: {}", text)
            }
            Self::ReservedSymbol { symbol } => write!(f, "reserved symbol `{}' used", symbol),
            Self::EmptyAlternative => {
                write!(f, "empty alternative around `{}' (write `{}')", ALTERNATIVE, EPSILON)
            }
        }
    }
}

/// Split the grammar source into rule lines.
///
/// Blank and comment-only lines produce nothing; each other line produces
/// either a rule or the reason why it is malformed.
pub fn parse(source: &str) -> impl Iterator<Item = Result<RuleDesc, SyntaxError>> + '_ {
    source.lines().enumerate().filter_map(|(i, line)| {
        let line_no = i + 1;
        let text = match line.split_once(COMMENT) {
            Some((text, _comment)) => text,
            None => line,
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(parse_line(text).map_err(|kind| SyntaxError { line: line_no, kind }).map(
            |(left, alternatives)| RuleDesc {
                line: line_no,
                left,
                alternatives,
            },
        ))
    })
}

fn parse_line(text: &str) -> Result<(String, Vec<Vec<String>>), SyntaxErrorKind> {
    let (left, right) = text
        .split_once(ARROW)
        .ok_or_else(|| SyntaxErrorKind::MissingArrow {
            text: text.to_owned(),
        })?;

    let mut left_symbols = left.split_whitespace();
    let left = match (left_symbols.next(), left_symbols.next()) {
        (None, _) => return Err(SyntaxErrorKind::EmptyLeft),
        (Some(left), None) => left,
        (Some(_), Some(_)) => {
            return Err(SyntaxErrorKind::MultipleLeft {
                text: left.trim().to_owned(),
            })
        }
    };
    if is_reserved(left) {
        return Err(SyntaxErrorKind::ReservedSymbol {
            symbol: left.to_owned(),
        });
    }

    let has_alternatives = right.contains(ALTERNATIVE);
    let mut alternatives = vec![];
    for alternative in right.split(ALTERNATIVE) {
        if has_alternatives && alternative.trim().is_empty() {
            return Err(SyntaxErrorKind::EmptyAlternative);
        }
        let mut symbols = vec![];
        for symbol in alternative.split_whitespace() {
            match symbol {
                // ε is the unit of concatenation.
                EPSILON => continue,
                END_MARKER => {
                    return Err(SyntaxErrorKind::ReservedSymbol {
                        symbol: symbol.to_owned(),
                    })
                }
                _ => symbols.push(symbol.to_owned()),
            }
        }
        alternatives.push(symbols);
    }

    Ok((left.to_owned(), alternatives))
}

fn is_reserved(symbol: &str) -> bool {
    symbol == END_MARKER || symbol == EPSILON
}

/// Register the parsed rules into the grammar definition.
pub(crate) fn define_grammar(
    g: &mut GrammarDef<'_>,
    rules: Vec<RuleDesc>,
) -> Result<(), GrammarDefError> {
    let lefts: Set<&str> = rules.iter().map(|rule| rule.left.as_str()).collect();

    // The first rule is taken as the augmented start production if it has
    // the form `X -> Y` and `X` is never referred to elsewhere.
    let augmented = rules.first().and_then(|first| match &first.alternatives[..] {
        [alternative] => match &alternative[..] {
            [symbol] if lefts.contains(symbol.as_str()) && *symbol != first.left => {
                let referred = rules.iter().skip(1).any(|rule| {
                    rule.left == first.left
                        || rule
                            .alternatives
                            .iter()
                            .any(|alt| alt.iter().any(|s| *s == first.left))
                });
                (!referred).then(|| (first.left.as_str(), symbol.as_str()))
            }
            _ => None,
        },
        _ => None,
    });

    let mut nonterminals: Map<&str, NonterminalID> = Map::default();
    let mut terminals: Map<&str, TerminalID> = Map::default();

    let body = match augmented {
        Some((augmented_name, _)) => {
            g.augmented_name(augmented_name)?;
            &rules[1..]
        }
        None => &rules[..],
    };

    for rule in body {
        if !nonterminals.contains_key(rule.left.as_str()) {
            let id = g.nonterminal(&rule.left)?;
            nonterminals.insert(&rule.left, id);
        }
    }
    for rule in body {
        for symbol in rule.alternatives.iter().flatten() {
            if !nonterminals.contains_key(symbol.as_str()) && !terminals.contains_key(symbol.as_str()) {
                let id = g.terminal(symbol)?;
                terminals.insert(symbol, id);
            }
        }
    }

    let start = match augmented {
        Some((_, start)) => nonterminals.get(start).copied(),
        None => body.first().and_then(|rule| nonterminals.get(rule.left.as_str()).copied()),
    };
    if let Some(start) = start {
        g.start_symbol(start)?;
    }

    for rule in body {
        let left = nonterminals[rule.left.as_str()];
        for alternative in &rule.alternatives {
            let right = alternative.iter().map(|symbol| {
                match nonterminals.get(symbol.as_str()) {
                    Some(n) => SymbolID::N(*n),
                    None => SymbolID::T(terminals[symbol.as_str()]),
                }
            });
            g.rule(left, right)?;
        }
    }

    Ok(())
}

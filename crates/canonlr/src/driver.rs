//! Parsing a sequence of terminal names with a compiled table.

use crate::{
    automaton::StateID,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, END_MARKER},
    table::ParseTable,
    util::display_fn,
};
use canonlr_runtime::parser::{ParseError, ParseEvent, ParseItem, Parser, Rejection};
use std::{convert::Infallible, fmt};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("unknown terminal `{}' at position {}", name, position)]
    UnknownTerminal { position: usize, name: String },

    #[error(transparent)]
    Engine(#[from] ParseError<Infallible>),
}

/// A snapshot of the parser, taken before each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub states: Vec<StateID>,
    /// The pushed symbols, bottom first. The end marker at the bottom is implicit.
    pub symbols: Vec<SymbolID>,
    /// `None` means the end of input.
    pub lookahead: Option<TerminalID>,
}

impl TraceStep {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            f.write_str("State stack: [")?;
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", state)?;
            }
            write!(f, "], Symbol stack: [{}", END_MARKER)?;
            for symbol in &self.symbols {
                write!(f, ", {}", g.symbol_name(*symbol))?;
            }
            let lookahead = self.lookahead.unwrap_or(TerminalID::EOI);
            write!(f, "], Next token: {}", g.terminals[&lookahead])
        })
    }
}

#[derive(Debug)]
pub struct ParseReport {
    /// `None` if the input was accepted.
    pub rejection: Option<Rejection<StateID, TerminalID, NonterminalID>>,
    pub trace: Vec<TraceStep>,
}

impl ParseReport {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| match &self.rejection {
            None => f.write_str("accepted"),
            Some(Rejection::NoAction { state, lookahead }) => {
                let lookahead = lookahead.unwrap_or(TerminalID::EOI);
                write!(
                    f,
                    "rejected: no action in state {} on `{}'",
                    state, g.terminals[&lookahead]
                )
            }
            Some(Rejection::NoGoto { state, symbol }) => write!(
                f,
                "rejected: no goto in state {} on `{}'",
                state, g.nonterminals[symbol]
            ),
        })
    }
}

/// Resolve terminal names into their IDs.
///
/// An explicit end marker terminates the sequence; anything after it is ignored.
pub fn resolve_terminals<I, S>(grammar: &Grammar, names: I) -> Result<Vec<TerminalID>, DriverError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tokens = vec![];
    for (position, name) in names.into_iter().enumerate() {
        let name = name.as_ref();
        if name == END_MARKER {
            break;
        }
        let id = grammar
            .terminal_id(name)
            .ok_or_else(|| DriverError::UnknownTerminal {
                position,
                name: name.to_owned(),
            })?;
        tokens.push(id);
    }
    Ok(tokens)
}

/// Parse a sequence of terminal names, optionally recording every step.
pub fn parse<I, S>(
    grammar: &Grammar,
    table: &ParseTable,
    names: I,
    trace: bool,
) -> Result<ParseReport, DriverError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tokens = resolve_terminals(grammar, names)?;
    let mut tokens = tokens.into_iter().map(Ok::<_, Infallible>);

    let mut parser = Parser::new(table);
    let mut steps = vec![];
    loop {
        if trace {
            let lookahead = parser.peek(&mut tokens)?.copied();
            steps.push(TraceStep {
                states: parser.state_stack().to_vec(),
                symbols: parser
                    .item_stack()
                    .iter()
                    .map(|item| match item {
                        ParseItem::T(t) => SymbolID::T(*t),
                        ParseItem::N(n) => SymbolID::N(*n),
                    })
                    .collect(),
                lookahead,
            });
        }

        match parser.next_event(&mut tokens)? {
            ParseEvent::Shift(next) => tracing::trace!("shift to {}", next),
            ParseEvent::Reduce(reduce) => {
                tracing::trace!("reduce by {}", grammar.production(reduce).display(grammar))
            }
            ParseEvent::Accept => {
                return Ok(ParseReport {
                    rejection: None,
                    trace: steps,
                })
            }
            ParseEvent::Reject(rejection) => {
                tracing::debug!("rejected in state {}", rejection.state());
                return Ok(ParseReport {
                    rejection: Some(rejection),
                    trace: steps,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Automaton;

    fn compile(source: &str) -> (Grammar, ParseTable) {
        let grammar = Grammar::from_str(source).unwrap();
        let automaton = Automaton::build(&grammar);
        let table = ParseTable::generate(&grammar, &automaton).unwrap();
        (grammar, table)
    }

    #[test]
    fn trace_of_accepted_input() {
        let (grammar, table) = compile("S' -> S\nS -> C C\nC -> c C | d\n");
        let report = parse(&grammar, &table, ["c", "d", "d"], true).unwrap();
        assert!(report.is_accepted());
        assert_eq!(report.display(&grammar).to_string(), "accepted");

        let lines: Vec<_> = report
            .trace
            .iter()
            .map(|step| step.display(&grammar).to_string())
            .collect();
        assert_eq!(
            lines,
            [
                "State stack: [0], Symbol stack: [$], Next token: c",
                "State stack: [0, 1], Symbol stack: [$, c], Next token: d",
                "State stack: [0, 1, 2], Symbol stack: [$, c, d], Next token: d",
                "State stack: [0, 1, 5], Symbol stack: [$, c, C], Next token: d",
                "State stack: [0, 4], Symbol stack: [$, C], Next token: d",
                "State stack: [0, 4, 7], Symbol stack: [$, C, d], Next token: $",
                "State stack: [0, 4, 8], Symbol stack: [$, C, C], Next token: $",
                "State stack: [0, 3], Symbol stack: [$, S], Next token: $",
            ]
        );
    }

    #[test]
    fn rejection_names_state_and_token() {
        let (grammar, table) = compile("S' -> S\nS -> C C\nC -> c C | d\n");
        let report = parse(&grammar, &table, ["c", "c", "d"], false).unwrap();
        assert!(!report.is_accepted());
        assert!(report.trace.is_empty());
        assert_eq!(
            report.rejection,
            Some(Rejection::NoAction {
                state: StateID::from_raw(2),
                lookahead: None,
            })
        );
        assert_eq!(
            report.display(&grammar).to_string(),
            "rejected: no action in state 2 on `$'"
        );
    }

    #[test]
    fn end_marker_terminates_input() {
        let (grammar, table) = compile("S -> A b\nA -> a | ε\n");
        assert!(parse(&grammar, &table, ["a", "b", "$", "b"], false)
            .unwrap()
            .is_accepted());
        assert!(parse(&grammar, &table, ["b", "$"], false)
            .unwrap()
            .is_accepted());
    }

    #[test]
    fn unknown_terminal() {
        let (grammar, table) = compile("S -> A b\nA -> a | ε\n");
        let err = parse(&grammar, &table, ["a", "z", "b"], false).unwrap_err();
        assert!(matches!(
            err,
            DriverError::UnknownTerminal { position: 1, ref name } if name == "z"
        ));

        // nonterminal names are not tokens.
        let err = parse(&grammar, &table, ["A", "b"], false).unwrap_err();
        assert!(matches!(err, DriverError::UnknownTerminal { position: 0, .. }));
    }
}

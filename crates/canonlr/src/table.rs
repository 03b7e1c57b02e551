//! ACTION/GOTO tables derived from the canonical automaton.

use crate::{
    automaton::{Automaton, StateID},
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
};
use canonlr_runtime::{definition::ParseAction, parser::Token};
use std::fmt;

/// The action that the automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(n) => write!(f, "shift({:02})", n),
            Self::Reduce(p) => write!(f, "reduce({})", p),
            Self::Accept => f.write_str("accept"),
        }
    }
}

/// How to settle a table cell with more than one candidate action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ConflictPolicy {
    /// Report every conflict and fail.
    #[default]
    Error,

    /// Prefer the shift action in shift/reduce conflicts, and the production
    /// with the lowest index in reduce/reduce conflicts.
    PreferShift,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    conflict_policy: ConflictPolicy,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Error,
        }
    }

    pub fn conflict_policy(&mut self, policy: ConflictPolicy) -> &mut Self {
        self.conflict_policy = policy;
        self
    }

    /// Resolve shift/reduce conflicts in favor of shift.
    pub fn prefer_shift(&mut self) -> &mut Self {
        self.conflict_policy(ConflictPolicy::PreferShift)
    }
}

/// A table cell with competing actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub terminal: TerminalID,
    pub terminal_name: String,
    pub actions: Vec<Action>,
}

impl Conflict {
    pub fn is_shift_reduce(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Shift(..)))
    }

    fn involves_accept(&self) -> bool {
        self.actions.contains(&Action::Accept)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.involves_accept() {
            "accept"
        } else if self.is_shift_reduce() {
            "shift/reduce"
        } else {
            "reduce/reduce"
        };
        write!(
            f,
            "{} conflict in state {} on `{}':",
            kind, self.state, self.terminal_name
        )?;
        for action in &self.actions {
            write!(f, " {}", action)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("detected {} conflict(s)", _0.len())]
    Conflicts(Vec<Conflict>),

    #[error("cannot resolve conflicts with the accept action: {}", _0)]
    AcceptConflict(Conflict),
}

impl TableError {
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::Conflicts(conflicts) => &conflicts[..],
            Self::AcceptConflict(conflict) => std::slice::from_ref(conflict),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseTableRow {
    actions: Map<TerminalID, Action>,
    gotos: Map<NonterminalID, StateID>,
}

impl ParseTableRow {
    pub fn actions(&self) -> impl Iterator<Item = (TerminalID, Action)> + '_ {
        self.actions.iter().map(|(t, action)| (*t, *action))
    }

    pub fn gotos(&self) -> impl Iterator<Item = (NonterminalID, StateID)> + '_ {
        self.gotos.iter().map(|(n, target)| (*n, *target))
    }
}

/// The compiled ACTION/GOTO tables.
///
/// Immutable after construction; it can be shared by any number of parsers.
#[derive(Debug)]
pub struct ParseTable {
    rows: Map<StateID, ParseTableRow>,
    // left-hand side and right-hand length of each production.
    reduces: Map<ProductionID, (NonterminalID, usize)>,
}

impl ParseTable {
    pub fn generate(grammar: &Grammar, automaton: &Automaton) -> Result<Self, TableError> {
        Self::generate_with_config(grammar, automaton, &Config::new())
    }

    pub fn generate_with_config(
        grammar: &Grammar,
        automaton: &Automaton,
        config: &Config,
    ) -> Result<Self, TableError> {
        let span = tracing::debug_span!("parse_table");
        let _entered = span.enter();

        let mut rows = Map::default();
        let mut conflicts = vec![];

        for (id, state) in automaton.states() {
            let mut pending_actions: Map<TerminalID, Vec<Action>> = Map::default();
            let mut gotos = Map::default();

            // shift, goto
            for (symbol, target) in state.transitions() {
                match symbol {
                    SymbolID::T(t) => pending_actions.entry(t).or_default().push(Action::Shift(target)),
                    SymbolID::N(n) => {
                        gotos.insert(n, target);
                    }
                }
            }

            // reduce, accept
            for item in state.items() {
                if !item.is_complete(grammar) {
                    continue;
                }
                let action = if item.production == ProductionID::ACCEPT {
                    Action::Accept
                } else {
                    Action::Reduce(item.production)
                };
                let candidates = pending_actions.entry(item.lookahead).or_default();
                if !candidates.contains(&action) {
                    candidates.push(action);
                }
            }

            let mut actions = Map::default();
            for (terminal, candidates) in pending_actions {
                match &candidates[..] {
                    [action] => {
                        actions.insert(terminal, *action);
                    }
                    _ => {
                        let conflict = Conflict {
                            state: id,
                            terminal,
                            terminal_name: grammar.terminals[&terminal].name().to_owned(),
                            actions: candidates,
                        };
                        if conflict.involves_accept() {
                            return Err(TableError::AcceptConflict(conflict));
                        }
                        match config.conflict_policy {
                            ConflictPolicy::Error => conflicts.push(conflict),
                            ConflictPolicy::PreferShift => {
                                let resolved = prefer_shift(&conflict.actions);
                                tracing::warn!("{}; resolved as {}", conflict, resolved);
                                actions.insert(terminal, resolved);
                            }
                        }
                    }
                }
            }

            rows.insert(id, ParseTableRow { actions, gotos });
        }

        if !conflicts.is_empty() {
            for conflict in &conflicts {
                tracing::debug!("{}", conflict);
            }
            return Err(TableError::Conflicts(conflicts));
        }

        let reduces = grammar
            .productions
            .values()
            .map(|p| (p.id(), (p.left(), p.right().len())))
            .collect();

        Ok(Self { rows, reduces })
    }

    pub fn rows(&self) -> impl Iterator<Item = (StateID, &ParseTableRow)> + '_ {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row(&self, id: StateID) -> Option<&ParseTableRow> {
        self.rows.get(&id)
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.rows.get(&state)?.actions.get(&lookahead).copied()
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.rows.get(&state)?.gotos.get(&symbol).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, row)) in self.rows().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## actions")?;
                for (terminal, action) in row.actions() {
                    let terminal = &g.terminals[&terminal];
                    match action {
                        Action::Reduce(p) => {
                            writeln!(f, "- {} => reduce({})", terminal, g.production(p).display(g))?
                        }
                        action => writeln!(f, "- {} => {}", terminal, action)?,
                    }
                }
                writeln!(f, "## gotos")?;
                for (symbol, target) in row.gotos() {
                    writeln!(f, "- {} => goto({:02})", g.nonterminals[&symbol], target)?;
                }
            }
            Ok(())
        })
    }

    /// Render the tables as CSV.
    ///
    /// The header is `State`, the terminals (the end marker last) and the
    /// nonterminals other than the augmented start symbol. No state has a
    /// goto on the augmented start symbol, so its column would always be empty.
    pub fn display_csv<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let terminals: Vec<_> = g
                .terminals
                .values()
                .filter(|t| t.id() != TerminalID::EOI)
                .chain(g.terminals.get(&TerminalID::EOI))
                .collect();
            let nonterminals: Vec<_> = g
                .nonterminals
                .values()
                .filter(|n| n.id() != NonterminalID::START)
                .collect();

            f.write_str("State")?;
            for terminal in &terminals {
                write!(f, ",{}", csv_field(terminal.name()))?;
            }
            for nonterminal in &nonterminals {
                write!(f, ",{}", csv_field(nonterminal.name()))?;
            }
            f.write_str("\n")?;

            for (id, row) in self.rows() {
                write!(f, "{}", id)?;
                for terminal in &terminals {
                    f.write_str(",")?;
                    match row.actions.get(&terminal.id()) {
                        Some(Action::Shift(n)) => write!(f, "s{}", n)?,
                        Some(Action::Reduce(p)) => write!(f, "r{}", p)?,
                        Some(Action::Accept) => f.write_str("acc")?,
                        None => (),
                    }
                }
                for nonterminal in &nonterminals {
                    f.write_str(",")?;
                    if let Some(target) = row.gotos.get(&nonterminal.id()) {
                        write!(f, "{}", target)?;
                    }
                }
                f.write_str("\n")?;
            }
            Ok(())
        })
    }
}

fn prefer_shift(candidates: &[Action]) -> Action {
    let mut resolved = candidates[0];
    for &action in &candidates[1..] {
        resolved = match (resolved, action) {
            (Action::Shift(..), _) => resolved,
            (_, Action::Shift(..)) => action,
            (Action::Reduce(p1), Action::Reduce(p2)) => Action::Reduce(p1.min(p2)),
            _ => resolved,
        };
    }
    resolved
}

fn csv_field(name: &str) -> std::borrow::Cow<'_, str> {
    if name.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", name.replace('"', "\"\"")).into()
    } else {
        name.into()
    }
}

impl canonlr_runtime::definition::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Reduce = ProductionID;

    fn initial_state(&self) -> Self::State {
        StateID::START
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
        let lookahead = lookahead.unwrap_or(TerminalID::EOI);
        match ParseTable::action(self, current, lookahead)? {
            Action::Shift(next) => Some(ParseAction::Shift(next)),
            Action::Reduce(reduce) => {
                let (left, n) = *self.reduces.get(&reduce)?;
                Some(ParseAction::Reduce { reduce, left, n })
            }
            Action::Accept => Some(ParseAction::Accept),
        }
    }

    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
        ParseTable::goto(self, current, symbol)
    }
}

impl Token<TerminalID> for TerminalID {
    fn as_symbol(&self) -> TerminalID {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str, config: &Config) -> Result<(Grammar, ParseTable), TableError> {
        let grammar = Grammar::from_str(source).unwrap();
        let automaton = Automaton::build(&grammar);
        let table = ParseTable::generate_with_config(&grammar, &automaton, config)?;
        Ok((grammar, table))
    }

    #[test]
    fn dragon_book_cc() {
        let (grammar, table) =
            compile("S' -> S\nS -> C C\nC -> c C | d\n", &Config::new()).unwrap();
        eprintln!("{}", table.display(&grammar));
        assert_eq!(table.rows().count(), 10);

        let c = grammar.terminal_id("c").unwrap();
        let d = grammar.terminal_id("d").unwrap();
        let s = grammar.nonterminal_id("S").unwrap();
        assert_eq!(table.action(StateID::START, c), Some(Action::Shift(StateID::from_raw(1))));
        assert_eq!(table.action(StateID::START, d), Some(Action::Shift(StateID::from_raw(2))));
        assert_eq!(table.action(StateID::START, TerminalID::EOI), None);
        assert_eq!(table.goto(StateID::START, s), Some(StateID::from_raw(3)));
        assert_eq!(table.action(StateID::from_raw(3), TerminalID::EOI), Some(Action::Accept));

        // [C -> d ., c/d]
        let c_to_d = grammar
            .productions
            .values()
            .find(|p| p.display(&grammar).to_string() == "C -> d")
            .unwrap()
            .id();
        assert_eq!(c_to_d.into_raw(), 3);
        let i2 = StateID::from_raw(2);
        assert_eq!(table.action(i2, c), Some(Action::Reduce(c_to_d)));
        assert_eq!(table.action(i2, d), Some(Action::Reduce(c_to_d)));
        assert_eq!(table.action(i2, TerminalID::EOI), None);
    }

    #[test]
    fn ambiguous_grammar_conflicts() {
        let source = "E -> E + E | n\n";
        let err = compile(source, &Config::new()).unwrap_err();
        let conflicts = match err {
            TableError::Conflicts(conflicts) => conflicts,
            err => panic!("unexpected error: {}", err),
        };
        assert!(!conflicts.is_empty());
        assert!(conflicts.iter().all(|c| c.is_shift_reduce()));
        assert!(conflicts.iter().all(|c| c.terminal_name == "+"));
        let message = conflicts[0].to_string();
        assert!(message.starts_with("shift/reduce conflict in state"), "{}", message);

        let (grammar, table) = compile(source, Config::new().prefer_shift()).unwrap();
        let plus = grammar.terminal_id("+").unwrap();
        for conflict in &conflicts {
            assert!(matches!(
                table.action(conflict.state, plus),
                Some(Action::Shift(..))
            ));
        }
    }

    #[test]
    fn reduce_reduce_prefers_lower_production() {
        let source = "S -> A | B\nA -> x\nB -> x\n";
        let err = compile(source, &Config::new()).unwrap_err();
        assert!(err.conflicts().iter().all(|c| !c.is_shift_reduce()));

        let (grammar, table) = compile(source, Config::new().prefer_shift()).unwrap();
        let a = grammar.nonterminal_id("A").unwrap();
        let a_to_x = grammar.productions_of(a).next().unwrap().id();
        let x = grammar.terminal_id("x").unwrap();
        let after_x = table.action(StateID::START, x);
        let Some(Action::Shift(after_x)) = after_x else {
            panic!("expected shift on x");
        };
        assert_eq!(
            table.action(after_x, TerminalID::EOI),
            Some(Action::Reduce(a_to_x))
        );
    }

    #[test]
    fn accept_conflicts_are_fatal() {
        let source = "S -> S | a\n";
        let err = compile(source, Config::new().prefer_shift()).unwrap_err();
        assert!(matches!(err, TableError::AcceptConflict(..)));
    }

    #[test]
    fn csv_export() {
        let (grammar, table) =
            compile("S' -> S\nS -> C C\nC -> c C | d\n", &Config::new()).unwrap();
        let csv = table.display_csv(&grammar).to_string();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "State,c,d,$,S,C");
        assert_eq!(lines[1], "0,s1,s2,,3,4");
        assert_eq!(lines[2], "1,s1,s2,,,5");
        assert_eq!(lines[3], "2,r3,r3,,,");
        assert_eq!(lines[4], "3,,,acc,,");
    }

    #[test]
    fn csv_quotes_special_names() {
        let (grammar, table) = compile("S -> , \"\n", &Config::new()).unwrap();
        let csv = table.display_csv(&grammar).to_string();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, "State,\",\",\"\"\"\",$,S");
    }
}

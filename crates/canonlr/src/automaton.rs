//! The canonical collection of LR(1) item sets.

use crate::{
    grammar::{Grammar, ProductionID, SymbolID, TerminalID},
    item::{ItemSet, ItemSetBuilder, LRItem},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u64,
}

impl StateID {
    pub const START: Self = Self::new(0);

    const fn new(raw: u64) -> Self {
        assert!(raw <= u64::MAX / 2, "too big state id");
        Self { raw }
    }

    fn from_index(index: usize) -> Self {
        Self::new(index as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self::new(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.raw
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A state of the automaton: a closed item set and its outgoing transitions.
#[derive(Debug)]
pub struct State {
    items: ItemSet,
    transitions: Map<SymbolID, StateID>,
}

impl State {
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    /// Outgoing transitions, in the order of the grammar's alphabet.
    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, target)| (*symbol, *target))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }
}

/// The canonical LR(1) automaton of a grammar.
#[derive(Debug)]
pub struct Automaton {
    states: Map<StateID, State>,
}

impl Automaton {
    /// Enumerate all reachable states, starting from the closure of
    /// `[S' -> . S, $]`.
    ///
    /// States are numbered in the order they are discovered: a FIFO worklist
    /// over the states, visiting the terminals and then the nonterminals of
    /// each in declaration order.
    pub fn build(grammar: &Grammar) -> Self {
        let span = tracing::debug_span!("automaton");
        let _entered = span.enter();

        let builder = ItemSetBuilder::new(grammar);

        // 登録済みのアイテム集合 (index = StateID)
        let mut item_sets: Set<ItemSet> = Set::default();
        let mut transitions: Vec<Map<SymbolID, StateID>> = vec![];

        let start = builder.closure(
            Some(LRItem::new(ProductionID::ACCEPT, 0, TerminalID::EOI))
                .into_iter()
                .collect(),
        );
        item_sets.insert(start);

        let mut pending = VecDeque::new();
        pending.push_back(StateID::START);

        // 新規に状態が生成されなくなるまで繰り返す
        while let Some(current) = pending.pop_front() {
            debug_assert_eq!(transitions.len() as u64, current.into_raw());
            let Some(items) = item_sets.get_index(transitions.len()) else {
                break;
            };
            let mut kernels = builder.kernels(items);

            let mut edges = Map::default();
            for symbol in grammar.symbols() {
                let Some(kernel) = kernels.swap_remove(&symbol) else {
                    continue;
                };
                let (index, inserted) = item_sets.insert_full(builder.closure(kernel));
                let target = StateID::from_index(index);
                if inserted {
                    tracing::trace!(
                        "new state {} = goto({}, {})",
                        target,
                        current,
                        grammar.symbol_name(symbol)
                    );
                    pending.push_back(target);
                }
                edges.insert(symbol, target);
            }
            debug_assert!(kernels.is_empty());

            transitions.push(edges);
        }

        let states: Map<StateID, State> = item_sets
            .into_iter()
            .zip(transitions)
            .enumerate()
            .map(|(index, (items, transitions))| {
                (StateID::from_index(index), State { items, transitions })
            })
            .collect();
        tracing::debug!("the automaton has {} states", states.len());

        Self { states }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[&id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## items")?;
                write!(f, "{}", state.items.display(g))?;

                writeln!(f, "## transitions")?;
                for (symbol, target) in state.transitions() {
                    writeln!(f, "- {} => {:02}", g.symbol_name(symbol), target)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    #[test]
    fn dragon_book_cc() {
        let grammar = Grammar::from_str("S' -> S\nS -> C C\nC -> c C | d\n").unwrap();
        let automaton = Automaton::build(&grammar);
        eprintln!("{}", automaton.display(&grammar));
        assert_eq!(automaton.len(), 10);

        let c = grammar.terminal_id("c").unwrap();
        let d = grammar.terminal_id("d").unwrap();
        let s = grammar.nonterminal_id("S").unwrap();
        let cc = grammar.nonterminal_id("C").unwrap();

        // terminals first, then nonterminals.
        let start = automaton.state(StateID::START);
        let labels: Vec<_> = start.transitions().map(|(symbol, _)| symbol).collect();
        assert_eq!(labels, [T(c), T(d), N(s), N(cc)]);
        let targets: Vec<_> = start.transitions().map(|(_, t)| t.into_raw()).collect();
        assert_eq!(targets, [1, 2, 3, 4]);

        // goto(I0, c) and goto(goto(I0, C), c) share the core but differ in
        // their lookaheads, so they are distinct states.
        let i4 = automaton.state(StateID::from_raw(4));
        assert_ne!(i4.transition(T(c)), start.transition(T(c)));
    }

    #[test]
    fn states_are_unique_and_numbered_deterministically() {
        let source = "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id\n";
        let g1 = Grammar::from_str(source).unwrap();
        let g2 = Grammar::from_str(source).unwrap();
        let a1 = Automaton::build(&g1);
        let a2 = Automaton::build(&g2);
        assert_eq!(a1.len(), a2.len());

        for ((id1, s1), (id2, s2)) in a1.states().zip(a2.states()) {
            assert_eq!(id1, id2);
            assert_eq!(s1.items(), s2.items());
            assert_eq!(
                s1.transitions().collect::<Vec<_>>(),
                s2.transitions().collect::<Vec<_>>()
            );
        }

        let distinct: Set<&ItemSet> = a1.states().map(|(_, s)| s.items()).collect();
        assert_eq!(distinct.len(), a1.len());
    }

    #[test]
    fn transitions_agree_with_goto() {
        let grammar = Grammar::from_str("S -> A b\nA -> a | ε\n").unwrap();
        let automaton = Automaton::build(&grammar);
        let builder = ItemSetBuilder::new(&grammar);

        for (_, state) in automaton.states() {
            for symbol in grammar.symbols() {
                let goto = builder.goto(state.items(), symbol);
                match state.transition(symbol) {
                    Some(target) => assert_eq!(automaton.state(target).items(), &goto),
                    None => assert!(goto.is_empty()),
                }
            }
        }
    }
}

//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::TerminalSet,
};
use bit_vec::BitVec;

/// `First(X)`: the terminals that can begin a derivation of `X`, plus
/// whether `X` derives the empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    pub terminals: TerminalSet,
    pub epsilon: bool,
}

/// The first sets of all symbols in a grammar.
///
/// The values are computed once when constructed and owned by the
/// compilation that created them.
#[derive(Debug)]
pub struct FirstSets {
    nulls: BitVec,
    // indexed by the raw nonterminal ID.
    first_sets: Vec<TerminalSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let nulls = nulls_set(grammar);
        let first_sets = first_sets(grammar, &nulls);
        Self { nulls, first_sets }
    }

    pub fn is_nullable(&self, symbol: NonterminalID) -> bool {
        self.nulls.get(index(symbol)).unwrap_or(false)
    }

    fn is_nullable_symbol(&self, symbol: SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.is_nullable(n))
    }

    fn terminals(&self, symbol: SymbolID) -> TerminalSet {
        match symbol {
            SymbolID::T(t) => Some(t).into_iter().collect(),
            SymbolID::N(n) => self.first_sets.get(index(n)).cloned().unwrap_or_default(),
        }
    }

    /// `First(X)`
    pub fn first(&self, symbol: SymbolID) -> FirstSet {
        FirstSet {
            terminals: self.terminals(symbol),
            epsilon: self.is_nullable_symbol(symbol),
        }
    }

    /// `First(X1 X2 ... Xn)`
    pub fn first_of_sequence(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut res = FirstSet::default();
        for symbol in symbols {
            res.terminals.union_with(&self.terminals(*symbol));
            if !self.is_nullable_symbol(*symbol) {
                return res;
            }
        }
        res.epsilon = true;
        res
    }

    /// `First(beta a)`, where `a` is a terminal symbol.
    pub fn lookaheads(&self, beta: &[SymbolID], lookahead: TerminalID) -> TerminalSet {
        let FirstSet {
            mut terminals,
            epsilon,
        } = self.first_of_sequence(beta);
        if epsilon {
            terminals.insert(lookahead);
        }
        terminals
    }
}

fn index(symbol: NonterminalID) -> usize {
    symbol.into_raw().into()
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> BitVec {
    let mut nulls = BitVec::from_elem(grammar.nonterminals.len(), false);

    // 値が更新されなくなるまで繰り返す
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions.values() {
            if nulls.get(index(production.left())).unwrap_or(false) {
                continue;
            }
            // 右辺のsymbolsがすべてnullableかどうか
            let is_rhs_nullable = production
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.get(index(*n)).unwrap_or(false)));
            if is_rhs_nullable {
                changed = true;
                nulls.set(index(production.left()), true);
            }
        }
    }

    nulls
}

fn first_sets(grammar: &Grammar, nulls: &BitVec) -> Vec<TerminalSet> {
    let mut sets = vec![TerminalSet::default(); grammar.nonterminals.len()];

    // 制約条件の抽出
    // X -> Y1 Y2 ... Yn という構文規則に対し、
    //  1. Y1,Y2,...と検索していき、最初に来る非nullableな記号を Yk とする
    //  2. Yi (i=1,2,..,k) それぞれに対し First(X) \supseteq First(Yi) という制約を追加する
    // 終端記号 Yi については First(Yi) = {Yi} なので直接追加する
    #[derive(Debug)]
    struct Constraint {
        sup: usize,
        sub: usize,
    }
    let mut constraints = vec![];
    for production in grammar.productions.values() {
        let sup = index(production.left());
        for symbol in production.right() {
            match symbol {
                SymbolID::T(t) => {
                    sets[sup].insert(*t);
                    break;
                }
                SymbolID::N(n) => {
                    if *n != production.left() {
                        constraints.push(Constraint {
                            sup,
                            sub: index(*n),
                        });
                    }
                    if !nulls.get(index(*n)).unwrap_or(false) {
                        break;
                    }
                }
            }
        }
    }

    // 制約条件の解消
    // First(sub) \subseteq First(sup) が満たされるよう要素を追加する。
    // これを集合が変化しなくなるまですべての制約条件に対して繰り返す
    let mut changed = true;
    while changed {
        changed = false;
        for Constraint { sup, sub } in &constraints {
            let subset = sets[*sub].clone();
            changed |= sets[*sup].union_with(&subset);
        }
    }

    sets
}

//! LR(1) items and the closure/goto operations over item sets.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::Map,
    util::display_fn,
};
use std::{
    collections::{btree_set, BTreeSet, VecDeque},
    fmt,
};

/// LR(1) item.
///
/// `X -> Y1 Y2 ... Yn` という構文規則にマーカ位置と先読み記号を付与したもの
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    // grammar内におけるproductionの識別子
    pub production: ProductionID,
    // marker位置
    pub marker: usize,
    pub lookahead: TerminalID,
}

impl LRItem {
    pub const fn new(production: ProductionID, marker: usize, lookahead: TerminalID) -> Self {
        Self {
            production,
            marker,
            lookahead,
        }
    }

    /// The symbol immediately after the marker.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production).right().get(self.marker).copied()
    }

    /// Whether the marker has reached the end of the production.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.marker == g.production(self.production).right().len()
    }

    fn advance(&self, g: &Grammar) -> Self {
        debug_assert!(self.marker < g.production(self.production).right().len());
        Self {
            marker: self.marker + 1,
            ..*self
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = g.production(self.production);
            write!(f, "[{} ->", g.nonterminals[&production.left()])?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == production.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ", {}]", g.terminals[&self.lookahead])
        })
    }
}

/// A set of LR(1) items.
///
/// The items are kept sorted by `(production, marker, lookahead)`, so that
/// equality and hashing depend only on the contents of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: BTreeSet<LRItem>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: LRItem) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &LRItem) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, LRItem> {
        self.items.iter()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for item in self {
                writeln!(f, "- {}", item.display(g))?;
            }
            Ok(())
        })
    }
}

impl FromIterator<LRItem> for ItemSet {
    fn from_iter<I: IntoIterator<Item = LRItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a LRItem;
    type IntoIter = btree_set::Iter<'a, LRItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Computes closures and goto transitions of item sets in a grammar.
#[derive(Debug)]
pub struct ItemSetBuilder<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
    productions: Map<NonterminalID, Vec<ProductionID>>,
}

impl<'g> ItemSetBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let mut productions: Map<NonterminalID, Vec<ProductionID>> = Map::default();
        for production in grammar.productions.values() {
            productions
                .entry(production.left())
                .or_default()
                .push(production.id());
        }
        Self {
            grammar,
            first_sets: FirstSets::new(grammar),
            productions,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first_sets
    }

    /// クロージャ展開
    ///
    /// For each item `[X -> ... . Y beta, a]` add `[Y -> . gamma, b]` for
    /// every production of `Y` and every `b` in `First(beta a)`, until no
    /// more items are added.
    pub fn closure(&self, mut items: ItemSet) -> ItemSet {
        let mut pending: VecDeque<LRItem> = items.iter().copied().collect();
        while let Some(item) = pending.pop_front() {
            let production = self.grammar.production(item.production);

            // [X -> ... @ Y beta]
            //  Y: one nonterminal symbol
            let (y_symbol, beta) = match &production.right()[item.marker..] {
                [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                _ => continue,
            };

            let lookaheads = self.first_sets.lookaheads(beta, item.lookahead);
            let Some(y_productions) = self.productions.get(&y_symbol) else {
                continue;
            };
            for &y_production in y_productions {
                for lookahead in lookaheads.iter() {
                    let new_item = LRItem::new(y_production, 0, lookahead);
                    if items.insert(new_item) {
                        pending.push_back(new_item);
                    }
                }
            }
        }
        items
    }

    /// `Goto(I, X)`: the closure of the items of `I` with the marker moved
    /// over `X`, or an empty set if no item of `I` expects `X`.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let kernel: ItemSet = items
            .iter()
            .filter(|item| item.next_symbol(self.grammar) == Some(symbol))
            .map(|item| item.advance(self.grammar))
            .collect();
        if kernel.is_empty() {
            return kernel;
        }
        self.closure(kernel)
    }

    /// 指定したLRアイテム集合から遷移先のLRアイテム集合（未展開）とラベルを抽出する
    pub fn kernels(&self, items: &ItemSet) -> Map<SymbolID, ItemSet> {
        let mut kernels: Map<SymbolID, ItemSet> = Map::default();
        for item in items {
            // markerが終わりまで到達していれば無視する
            if let Some(label) = item.next_symbol(self.grammar) {
                kernels
                    .entry(label)
                    .or_default()
                    .insert(item.advance(self.grammar));
            }
        }
        kernels
    }
}

//! Grammar types.

use crate::{syntax, types::Map, util::display_fn};
use std::{borrow::Cow, fmt, fs, io, marker::PhantomData, path::Path};

/// The name reserved for the end-of-input marker.
pub const END_MARKER: &str = "$";

/// The name reserved for the empty sequence.
pub const EPSILON: &str = "ε";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index <= u16::MAX as usize);
        Self::new(index as u16)
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The left-hand side of the augmented start production.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented start production `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return write!(f, " {}", EPSILON);
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(f, "{}: {}", production.id(), production.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Load a grammar file, failing on the first malformed line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    /// Parse a grammar source, failing on the first malformed line.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let rules = syntax::parse(source)
            .collect::<Result<Vec<_>, _>>()
            .map_err(GrammarDefError::Syntax)?;
        Grammar::define(|g| syntax::define_grammar(g, rules))
    }

    /// Parse a grammar source, skipping malformed lines with a warning.
    pub fn from_str_lenient(source: &str) -> Result<Grammar, GrammarDefError> {
        let mut rules = vec![];
        for rule in syntax::parse(source) {
            match rule {
                Ok(rule) => rules.push(rule),
                Err(err) => tracing::warn!("skipping malformed grammar line: {}", err),
            }
        }
        Grammar::define(|g| syntax::define_grammar(g, rules))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            augmented_name: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_production_id: ProductionID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: Cow::Borrowed(END_MARKER),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// The productions whose left-hand side is `symbol`, in index order.
    pub fn productions_of(&self, symbol: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.productions
            .values()
            .filter(move |production| production.left() == symbol)
    }

    /// Look up a declared terminal by name. The end marker is not nameable.
    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.id() != TerminalID::EOI && t.name() == name)
            .map(|t| t.id())
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// The full alphabet: terminals in declaration order (end marker first),
    /// followed by nonterminals in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self.terminals.keys().map(|t| SymbolID::T(*t));
        let nonterminals = self.nonterminals.keys().map(|n| SymbolID::N(*n));
        terminals.chain(nonterminals)
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    augmented_name: Option<String>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or("too many terminal symbols")?;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: Cow::Owned(name.to_owned()),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_new_name(name)?;

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or("too many nonterminal symbols")?;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        if !self.nonterminals.contains_key(&left) {
            return Err("the left-hand side is not a declared nonterminal".into());
        }
        for symbol in &right {
            let declared = match symbol {
                SymbolID::T(t) => self.terminals.contains_key(t) && *t != TerminalID::EOI,
                SymbolID::N(n) => self.nonterminals.contains_key(n),
            };
            if !declared {
                return Err("the right-hand side contains an undeclared symbol".into());
            }
        }
        for production in self.productions.values() {
            if production.left == left && production.right == right {
                return Err(GrammarDefError::DuplicateProduction {
                    production: format!(
                        "{} -> {}",
                        self.nonterminals[&left],
                        right
                            .iter()
                            .map(|s| self.symbol_name(*s))
                            .collect::<Vec<_>>()
                            .join(" ")
                    ),
                });
            }
        }

        let id = ProductionID::new(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or("too many productions")?;
        self.productions.insert(id, Production { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        self.start.replace(symbol);
        Ok(())
    }

    /// Specify the name of the left-hand side of the augmented start production.
    ///
    /// By default the name is the one of the start symbol followed by `'`.
    pub fn augmented_name(&mut self, name: &str) -> Result<(), GrammarDefError> {
        self.verify_new_name(name)?;
        self.augmented_name.replace(name.to_owned());
        Ok(())
    }

    fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    fn is_used_name(&self, name: &str) -> bool {
        self.terminals.values().any(|t| t.name() == name)
            || self.nonterminals.values().any(|n| n.name() == name)
            || matches!(&self.augmented_name, Some(augmented) if augmented == name)
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_name(name) {
            return Err(GrammarDefError::InvalidName {
                name: name.to_owned(),
            });
        }
        if self.is_used_name(name) {
            return Err(GrammarDefError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // 指定されていない場合は最初に登録されたnonterminal symbolを用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or(GrammarDefError::Empty)?,
        };

        let augmented_name = match self.augmented_name.take() {
            Some(name) => name,
            None => {
                let mut name = format!("{}'", self.nonterminals[&start]);
                while self.is_used_name(&name) {
                    name.push('\'');
                }
                name
            }
        };

        let mut nonterminals = Map::default();
        nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: augmented_name,
            },
        );
        nonterminals.extend(self.nonterminals);

        let mut productions = Map::default();
        productions.insert(
            ProductionID::ACCEPT,
            Production {
                id: ProductionID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        productions.extend(self.productions);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals,
            productions,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(syntax::SyntaxError),

    #[error("invalid symbol name: `{}'", name)]
    InvalidName { name: String },

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateName { name: String },

    #[error("duplicate production rule: `{}'", production)]
    DuplicateProduction { production: String },

    #[error("the grammar has no nonterminal symbols")]
    Empty,

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_name(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s == END_MARKER || s == EPSILON {
        // Reserved symbols.
        return false;
    }
    !s.chars().any(char::is_whitespace)
}

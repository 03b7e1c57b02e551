//! Parser.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

/// The parser driven based on the generated parse table.
///
/// A `Parser` owns its state and symbol stacks, so any number of parsers
/// may share one parse table (through `&T`, `Rc<T>` or `Arc<T>`).
#[derive(Debug)]
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TTok, TDef::Nonterminal>>,
    parser_state: ParserState,
    // `Some(None)` means the token stream has been exhausted.
    peeked_token: Option<Option<TTok>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ParserState {
    Running,
    Accepted,
    Rejected,
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            item_stack: vec![],
            parser_state: ParserState::Running,
            peeked_token: None,
        }
    }

    /// The state stack, bottom first.
    pub fn state_stack(&self) -> &[TDef::State] {
        &self.state_stack[..]
    }

    /// The symbol stack, bottom first. The implicit end marker at the
    /// bottom is not stored.
    pub fn item_stack(&self) -> &[ParseItem<TTok, TDef::Nonterminal>] {
        &self.item_stack[..]
    }

    pub fn is_finished(&self) -> bool {
        self.parser_state != ParserState::Running
    }

    /// Return the current lookahead token, reading one from `tokens` if
    /// necessary. `None` means the end of input.
    pub fn peek<I, E>(&mut self, tokens: &mut I) -> Result<Option<&TTok>, ParseError<E>>
    where
        I: Iterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        if self.peeked_token.is_none() {
            let token = tokens.next().transpose().map_err(ParseError::Lexer)?;
            self.peeked_token = Some(token);
        }
        Ok(self.peeked_token.as_ref().and_then(|t| t.as_ref()))
    }

    /// Drive the automaton by exactly one step.
    pub fn next_event<I, E>(&mut self, tokens: &mut I) -> Result<ParseEvent<TDef>, ParseError<E>>
    where
        I: Iterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        if self.is_finished() {
            return Err(ParseError::Finished);
        }

        let current = *self
            .state_stack
            .last()
            .ok_or_else(|| ParseError::EmptyNodeStack)?;
        let lookahead = self.peek(tokens)?.map(|t| t.as_symbol());

        let action = match self.definition.action(current, lookahead) {
            Some(action) => action,
            None => {
                self.parser_state = ParserState::Rejected;
                return Ok(ParseEvent::Reject(Rejection::NoAction {
                    state: current,
                    lookahead,
                }));
            }
        };

        match action {
            ParseAction::Shift(next) => {
                let token = self
                    .peeked_token
                    .take()
                    .flatten()
                    .ok_or_else(|| ParseError::UnexpectedEOI)?;
                self.item_stack.push(ParseItem::T(token));
                self.state_stack.push(next);
                Ok(ParseEvent::Shift(next))
            }

            ParseAction::Reduce { reduce, left, n } => {
                if self.item_stack.len() < n {
                    return Err(ParseError::EmptyItemStack);
                }
                if self.state_stack.len() <= n {
                    return Err(ParseError::EmptyNodeStack);
                }
                self.item_stack.truncate(self.item_stack.len() - n);
                self.state_stack.truncate(self.state_stack.len() - n);

                let top = *self
                    .state_stack
                    .last()
                    .ok_or_else(|| ParseError::EmptyNodeStack)?;
                self.item_stack.push(ParseItem::N(left));

                match self.definition.goto(top, left) {
                    Some(next) => {
                        self.state_stack.push(next);
                        Ok(ParseEvent::Reduce(reduce))
                    }
                    None => {
                        self.parser_state = ParserState::Rejected;
                        Ok(ParseEvent::Reject(Rejection::NoGoto {
                            state: top,
                            symbol: left,
                        }))
                    }
                }
            }

            ParseAction::Accept => {
                self.parser_state = ParserState::Accepted;
                Ok(ParseEvent::Accept)
            }
        }
    }

    /// Drive the automaton until the input is accepted or rejected.
    pub fn run<I, E>(&mut self, tokens: I) -> Result<ParseOutcome<TDef>, ParseError<E>>
    where
        I: IntoIterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        let mut tokens = tokens.into_iter();
        loop {
            match self.next_event(&mut tokens)? {
                ParseEvent::Shift(..) | ParseEvent::Reduce(..) => continue,
                ParseEvent::Accept => return Ok(ParseOutcome::Accepted),
                ParseEvent::Reject(rejection) => return Ok(ParseOutcome::Rejected(rejection)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseItem<TTok, TSym> {
    T(TTok),
    N(TSym),
}

#[derive(Debug)]
pub enum ParseEvent<TDef>
where
    TDef: ParseTable,
{
    /// The lookahead was shifted and the automaton moved to the state.
    Shift(TDef::State),

    /// A production was reduced and the goto state was pushed.
    Reduce(TDef::Reduce),

    Accept,

    /// The input was rejected. The parser cannot be resumed after this.
    Reject(Rejection<TDef::State, TDef::Terminal, TDef::Nonterminal>),
}

#[derive(Debug)]
pub enum ParseOutcome<TDef>
where
    TDef: ParseTable,
{
    Accepted,
    Rejected(Rejection<TDef::State, TDef::Terminal, TDef::Nonterminal>),
}

impl<TDef> ParseOutcome<TDef>
where
    TDef: ParseTable,
{
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// The reason why the input was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rejection<TState, TTerminal, TNonterminal> {
    /// There is no action for the lookahead in the state.
    /// A `None` lookahead means the end of input.
    NoAction {
        state: TState,
        lookahead: Option<TTerminal>,
    },

    /// There is no goto entry for the reduced nonterminal in the state.
    NoGoto { state: TState, symbol: TNonterminal },
}

impl<TState, TTerminal, TNonterminal> Rejection<TState, TTerminal, TNonterminal>
where
    TState: Copy,
{
    pub fn state(&self) -> TState {
        match self {
            Self::NoAction { state, .. } | Self::NoGoto { state, .. } => *state,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<L: fmt::Display> {
    #[error("from lexer: {}", _0)]
    Lexer(L),

    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("the parser has already finished")]
    Finished,

    #[error("empty node stack")]
    EmptyNodeStack,

    #[error("empty item stack")]
    EmptyItemStack,
}

//! Parser definition.

/// The trait for abstracting the generated LR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR(1) automaton.
    type State: Copy;

    /// The number to identify the terminal symbols.
    type Terminal: Copy;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy;

    /// The context value corresponding to the matched production rule.
    type Reduce: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol, or `None` if the combination is an error.
    ///
    /// If there is no lookahead symbol, a `None` is passsed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>>;

    /// Return the state reached from `current` after reducing to `symbol`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

macro_rules! forward_parse_table {
    ($($ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Reduce = T::Reduce;

            #[inline]
            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            #[inline]
            fn action(
                &self,
                current: Self::State,
                lookahead: Option<Self::Terminal>,
            ) -> Option<ParseAction<Self::State, Self::Nonterminal, Self::Reduce>> {
                (**self).action(current, lookahead)
            }

            #[inline]
            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }
        }
    )*};
}

forward_parse_table!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

/// The action taken by the automaton for a (state, lookahead) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TSymbol, TReduce> {
    /// Consume the lookahead and move to the state.
    Shift(TState),

    /// Pop `n` entries and push the left-hand side symbol.
    Reduce {
        reduce: TReduce,
        left: TSymbol,
        n: usize,
    },

    Accept,
}

//! End-to-end parsing with generated tables.

use canonlr::{
    automaton::{Automaton, StateID},
    driver::{self, DriverError},
    grammar::Grammar,
    table::{Config, ParseTable},
};
use canonlr_runtime::parser::{ParseOutcome, Parser, Rejection};
use std::{convert::Infallible, sync::Arc, thread};

fn compile(source: &str) -> (Grammar, ParseTable) {
    let grammar = Grammar::from_str(source).unwrap();
    let automaton = Automaton::build(&grammar);
    let table = ParseTable::generate(&grammar, &automaton).unwrap();
    (grammar, table)
}

fn accepts(grammar: &Grammar, table: &ParseTable, input: &str) -> bool {
    driver::parse(grammar, table, input.split_whitespace(), false)
        .unwrap()
        .is_accepted()
}

const CC: &str = "S' -> S\nS -> C C\nC -> c C | d\n";

#[test]
fn cc_language() {
    let (grammar, table) = compile(CC);
    assert_eq!(table.rows().count(), 10);

    for input in ["c c d d", "d d", "d c d", "c d c c d", "c c c d d"] {
        assert!(accepts(&grammar, &table, input), "input = {:?}", input);
    }
    for input in ["", "c d", "c c d", "d", "d d d", "d c", "c"] {
        assert!(!accepts(&grammar, &table, input), "input = {:?}", input);
    }
}

#[test]
fn rejection_of_trailing_token() {
    let (grammar, table) = compile(CC);
    let report = driver::parse(&grammar, &table, ["d", "d", "d"], false).unwrap();
    let d = grammar.terminal_id("d").unwrap();
    match report.rejection {
        Some(Rejection::NoAction { lookahead, .. }) => assert_eq!(lookahead, Some(d)),
        rejection => panic!("unexpected result: {:?}", rejection),
    }
}

#[test]
fn epsilon_production() {
    let (grammar, table) = compile("S -> A b\nA -> a | ε\n");
    assert!(accepts(&grammar, &table, "b"));
    assert!(accepts(&grammar, &table, "a b"));
    assert!(!accepts(&grammar, &table, "a"));
    assert!(!accepts(&grammar, &table, "a a b"));
    assert!(!accepts(&grammar, &table, ""));
}

#[test]
fn arithmetic_expressions() {
    let (grammar, table) = compile(
        "E -> E + T | E - T | T\n\
         T -> T * F | T / F | F\n\
         F -> ( E ) | num | id\n",
    );
    for input in ["num", "id + num * ( id - num )", "( ( id ) ) / num"] {
        assert!(accepts(&grammar, &table, input), "input = {:?}", input);
    }
    for input in ["num +", "( id", "id num", "* id"] {
        assert!(!accepts(&grammar, &table, input), "input = {:?}", input);
    }
}

#[test]
fn nullable_start_symbol() {
    let (grammar, table) = compile("L -> L x | ε\n");
    assert!(accepts(&grammar, &table, ""));
    assert!(accepts(&grammar, &table, "x x x"));
}

#[test]
fn prefer_shift_on_ambiguous_grammar() {
    let grammar = Grammar::from_str("E -> E + E | n\n").unwrap();
    let automaton = Automaton::build(&grammar);
    assert!(ParseTable::generate(&grammar, &automaton).is_err());

    let table =
        ParseTable::generate_with_config(&grammar, &automaton, Config::new().prefer_shift())
            .unwrap();
    assert!(accepts(&grammar, &table, "n + n + n"));
    assert!(!accepts(&grammar, &table, "n + + n"));
}

#[test]
fn unknown_names_are_not_fed_to_the_parser() {
    let (grammar, table) = compile(CC);
    let err = driver::parse(&grammar, &table, ["c", "?", "d"], true).unwrap_err();
    assert!(matches!(err, DriverError::UnknownTerminal { position: 1, .. }));
}

#[test]
fn shared_table_across_threads() {
    let (grammar, table) = compile(CC);
    let c = grammar.terminal_id("c").unwrap();
    let d = grammar.terminal_id("d").unwrap();
    let table = Arc::new(table);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let mut tokens = vec![c; i];
                tokens.extend([d, c, d]);
                let mut parser = Parser::new(table);
                parser.run(tokens.into_iter().map(Ok::<_, Infallible>)).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert!(matches!(outcome, ParseOutcome::Accepted));
    }

    // the table is still usable from this thread.
    let mut parser = Parser::new(&*table);
    let outcome = parser.run([c, d].map(Ok::<_, Infallible>)).unwrap();
    assert!(matches!(
        outcome,
        ParseOutcome::Rejected(Rejection::NoAction { lookahead: None, state }) if state != StateID::START
    ));
}

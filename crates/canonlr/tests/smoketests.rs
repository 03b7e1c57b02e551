use canonlr::{
    automaton::Automaton,
    grammar::Grammar,
    table::{Config, ParseTable, TableError},
};
use std::{env, path::PathBuf};
use tracing_subscriber::EnvFilter;

fn load(name: &str) -> Grammar {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    Grammar::from_file(
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join(format!("tests/{}.grammar", name)),
    )
    .unwrap()
}

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name));
            eprintln!("grammar:\n{}", grammar);
            let automaton = Automaton::build(&grammar);
            eprintln!("automaton:\n---\n{}", automaton.display(&grammar));
            let table = ParseTable::generate(&grammar, &automaton).unwrap();
            eprintln!("table:\n---\n{}", table.display_csv(&grammar));
            assert_eq!(table.rows().count(), automaton.len());
        }
    )*};
}

define_tests! {
    cc,
    epsilon,
    arithmetic,
    statements,
}

#[test]
fn ambiguous() {
    let grammar = load("ambiguous");
    let automaton = Automaton::build(&grammar);

    let err = ParseTable::generate(&grammar, &automaton).unwrap_err();
    let conflicts = match &err {
        TableError::Conflicts(conflicts) => conflicts,
        err => panic!("unexpected error: {}", err),
    };
    for conflict in conflicts {
        eprintln!("{}", conflict);
        assert!(conflict.is_shift_reduce());
    }
    let mut terminals: Vec<_> = conflicts.iter().map(|c| c.terminal_name.as_str()).collect();
    terminals.sort();
    terminals.dedup();
    assert_eq!(terminals, ["*", "+"]);

    ParseTable::generate_with_config(&grammar, &automaton, Config::new().prefer_shift()).unwrap();
}

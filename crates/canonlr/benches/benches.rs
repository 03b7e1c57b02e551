use canonlr::{automaton::Automaton, grammar::Grammar, table::ParseTable};
use criterion::{criterion_group, criterion_main, Criterion};
use std::{env, path::PathBuf};

criterion_main!(benches);
criterion_group!(benches, bench_table_gen);

fn bench_table_gen(c: &mut Criterion) {
    bench_grammar(c, "cc");
    bench_grammar(c, "arithmetic");
    bench_grammar(c, "statements");
}

fn bench_grammar(c: &mut Criterion, grammar_name: &str) {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    let grammar =
        Grammar::from_file(project_root.join(format!("tests/{}.grammar", grammar_name))).unwrap();

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("automaton", |b| {
        b.iter(|| Automaton::build(&grammar));
    });
    group.bench_function("table", |b| {
        b.iter(|| {
            let automaton = Automaton::build(&grammar);
            ParseTable::generate(&grammar, &automaton)
        });
    });
    group.finish();
}

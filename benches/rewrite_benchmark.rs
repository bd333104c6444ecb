//! Benchmark measuring how long the built-in plan takes on dumps of growing
//! size.
//!
//! Each dump holds one `match_games` statement with `rows` rows, a
//! `match_lineups` statement and a few unrelated statements; the plan
//! rewrites the first, renames a column in the second and scans past the rest.

use std::fmt::Write;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sqldump_fixup::{Engine, Plan};

const MATCH_GAMES_COLUMNS: &str = "\"id\", \"match_id\", \"game_number\", \"home_player_id\", \
    \"away_player_id\", \"winner_team_id\", \"winner_player_id\", \"home_action\", \
    \"away_action\", \"break_and_run\", \"golden_break\", \"confirmed_by_home\", \
    \"confirmed_by_away\", \"confirmed_at\", \"is_tiebreaker\", \"created_at\", \"updated_at\"";

fn dump(rows: usize) -> String {
    let mut dump = String::from(
        "--\n-- Data for Name: members; Type: TABLE DATA; Schema: public\n--\n\n\
         INSERT INTO \"public\".\"members\" (\"id\", \"name\") VALUES\n\
         \t('m-1', 'O''Brien'),\n\t('m-2', 'Ng');\n\n",
    );
    dump.push_str(&format!(
        "INSERT INTO \"public\".\"match_games\" ({MATCH_GAMES_COLUMNS}) VALUES"
    ));
    for row in 0..rows {
        let terminator = if row + 1 == rows { ';' } else { ',' };
        write!(
            dump,
            "\n\t('g-{row}', 'match-{}', {}, 'p-1', 'p-2', 't-1', 'p-1', 'break, run', 'safety', \
             {}, false, true, false, NULL, false, '2025-01-01 10:00:00+00', \
             '2025-01-01 10:00:00+00'){terminator}",
            row / 9,
            row % 9 + 1,
            row % 2 == 0,
        )
        .unwrap();
    }
    dump.push_str(
        "\n\nINSERT INTO \"public\".\"match_lineups\" (\"id\", \"team_handicap\") VALUES\n\
         \t('l-1', 2);\n",
    );
    dump
}

fn bench_builtin_plan(c: &mut Criterion) {
    let steps = Plan::builtin().unwrap().resolve().unwrap();
    let engine = Engine::new(steps);

    let mut group = c.benchmark_group("builtin_plan");
    for rows in [100, 1_000, 10_000] {
        let input = dump(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| engine.run(black_box(input.clone())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_builtin_plan);
criterion_main!(benches);

use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use cs2_terminal::aggregate::aggregate;
use cs2_terminal::analytics_fetch::parse_matches_json;
use cs2_terminal::state::MatchRecord;

const MAPS: &[&str] = &[
    "de_mirage",
    "de_inferno",
    "de_nuke",
    "de_ancient",
    "de_overpass",
    "de_vertigo",
    "de_anubis",
    "de_dust2",
    "de_train",
    "de_cache",
];

fn synthetic_matches_json(rows: usize) -> String {
    let mut out = String::from("[");
    for i in 0..rows {
        if i > 0 {
            out.push(',');
        }
        let map = MAPS[i % MAPS.len()];
        let result = ["win", "loss", "draw"][i % 3];
        let _ = write!(
            out,
            r#"{{"date":{},"map":"{map}","kills":{},"deaths":{},"teamScore":13,"opponentScore":{},"result":"{result}"}}"#,
            1_700_000_000 + i as i64 * 3600,
            (i % 30) + 5,
            (i % 22) + 3,
            i % 13,
        );
    }
    out.push(']');
    out
}

fn synthetic_records(rows: usize) -> Vec<MatchRecord> {
    (0..rows)
        .map(|i| MatchRecord {
            finished_at: Some(1_700_000_000 + i as i64 * 3600),
            map: Some(MAPS[i % MAPS.len()].to_string()),
            kills: Some(((i % 30) + 5) as f64),
            deaths: Some(((i % 22) + 3) as f64),
            team_score: Some(13),
            opponent_score: Some((i % 13) as i64),
            result: Some(["win", "loss", "draw"][i % 3].to_string()),
            won: None,
            url: None,
        })
        .collect()
}

fn bench_parse_matches(c: &mut Criterion) {
    let raw = synthetic_matches_json(1000);
    c.bench_function("parse_matches_1000", |b| {
        b.iter(|| {
            let rows = parse_matches_json(black_box(&raw));
            black_box(rows.len());
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let records = synthetic_records(5000);
    c.bench_function("aggregate_5000", |b| {
        b.iter(|| {
            let summary = aggregate(black_box(&records));
            black_box(summary.total);
        })
    });
}

criterion_group!(benches, bench_parse_matches, bench_aggregate);
criterion_main!(benches);

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::state::{MapWinRate, MatchAggregate, MatchRecord, Resolved};

/// How many distinct maps the per-map breakdown reports. Caps chart width,
/// not a statistical sample: the first 8 maps seen in input order win.
const PER_MAP_LIMIT: usize = 8;
const RECENT_LIMIT: usize = 5;

pub const UNKNOWN_MAP: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVerdict {
    Win,
    Loss,
    Tie,
    Unknown,
}

/// Exactly one verdict per match. The first applicable indicator wins: a
/// result string, if present, is interpreted and the boolean flag ignored,
/// even when the string is unrecognized.
pub fn classify_result(record: &MatchRecord) -> MatchVerdict {
    if let Some(raw) = record.result.as_deref() {
        return match raw.trim().to_ascii_lowercase().as_str() {
            "win" | "won" | "victory" | "w" => MatchVerdict::Win,
            "loss" | "lost" | "lose" | "defeat" | "l" => MatchVerdict::Loss,
            "tie" | "tied" | "draw" | "d" => MatchVerdict::Tie,
            _ => MatchVerdict::Unknown,
        };
    }
    match record.won {
        Some(true) => MatchVerdict::Win,
        Some(false) => MatchVerdict::Loss,
        None => MatchVerdict::Unknown,
    }
}

/// K/D for a single match row. Deaths of zero with kills is reported as the
/// kill count; a 0/0 match has no meaningful ratio and stays unknown.
pub fn per_match_kd(record: &MatchRecord) -> Resolved {
    let (Some(kills), Some(deaths)) = (record.kills, record.deaths) else {
        return Resolved::Unknown;
    };
    if deaths == 0.0 {
        if kills > 0.0 {
            return Resolved::Value(round2(kills));
        }
        return Resolved::Unknown;
    }
    Resolved::Value(round2(kills / deaths))
}

pub fn aggregate(matches: &[MatchRecord]) -> MatchAggregate {
    MatchAggregate {
        total: matches.len(),
        win_rate_pct: overall_win_rate(matches),
        kd: aggregate_kd(matches),
        per_map: per_map_win_rates(matches),
        recent: recent_matches(matches),
    }
}

fn overall_win_rate(matches: &[MatchRecord]) -> f64 {
    if matches.is_empty() {
        // Zero matches is a meaningful zero, not an unknown.
        return 0.0;
    }
    let mut wins = 0.0f64;
    for record in matches {
        match classify_result(record) {
            MatchVerdict::Win => wins += 1.0,
            MatchVerdict::Tie => wins += 0.5,
            MatchVerdict::Loss | MatchVerdict::Unknown => {}
        }
    }
    round1(wins / matches.len() as f64 * 100.0)
}

fn aggregate_kd(matches: &[MatchRecord]) -> Resolved {
    let mut kills = 0.0f64;
    let mut deaths = 0.0f64;
    for record in matches {
        if let (Some(k), Some(d)) = (record.kills, record.deaths) {
            kills += k;
            deaths += d;
        }
    }
    if deaths == 0.0 {
        // No kills-only fallback: a division by zero stays unknown.
        return Resolved::Unknown;
    }
    Resolved::Value(kills / deaths)
}

fn per_map_win_rates(matches: &[MatchRecord]) -> Vec<MapWinRate> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (usize, usize)> = HashMap::new();

    for record in matches {
        let map = record
            .map
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_MAP)
            .to_string();
        if !groups.contains_key(&map) {
            if order.len() >= PER_MAP_LIMIT {
                continue;
            }
            order.push(map.clone());
        }
        let entry = groups.entry(map).or_insert((0, 0));
        entry.0 += 1;
        if classify_result(record) == MatchVerdict::Win {
            entry.1 += 1;
        }
    }

    order
        .into_iter()
        .map(|map| {
            let (played, wins) = groups[&map];
            let win_rate_pct = (wins as f64 / played as f64 * 100.0).round() as u32;
            MapWinRate {
                map,
                played,
                wins,
                win_rate_pct,
            }
        })
        .collect()
}

fn recent_matches(matches: &[MatchRecord]) -> Vec<MatchRecord> {
    let mut recent = matches.to_vec();
    // Stable sort; records without a comparable finish time express no
    // preference and keep their original relative position.
    recent.sort_by(|a, b| match (a.finished_at, b.finished_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    });
    recent.truncate(RECENT_LIMIT);
    recent
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

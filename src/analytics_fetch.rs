use std::env;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::http_client::{apply_proxy, fetch_json, http_client};
use crate::state::{AnalyticsProfile, MatchRecord, Settings, SourceFailure, SourceResult, WeaponStat};

const DEFAULT_API_BASE: &str = "https://api.cstracker.io/v1";

/// Field-name synonyms seen across provider versions. Normalization happens
/// here, once; downstream code only ever sees the canonical names.
const NAME_KEYS: &[&str] = &["name", "displayName", "username", "nick"];
const AVATAR_KEYS: &[&str] = &["avatar", "avatarUrl"];
const KD_KEYS: &[&str] = &["kd", "kdRatio", "killDeathRatio"];
const WIN_RATE_KEYS: &[&str] = &["winRate", "winPct", "wlPercentage"];
const HEADSHOT_KEYS: &[&str] = &["headshotPct", "hsPercent", "headshotPercentage"];
const HOURS_KEYS: &[&str] = &["hours", "hoursPlayed", "timePlayedHours"];
const DATE_KEYS: &[&str] = &["finishedAt", "playedAt", "date", "timestamp"];
const KILLS_KEYS: &[&str] = &["kills", "k"];
const DEATHS_KEYS: &[&str] = &["deaths", "d"];
const MAP_KEYS: &[&str] = &["map", "mapName"];
const TEAM_SCORE_KEYS: &[&str] = &["teamScore", "roundsWon", "scoreFor"];
const OPPONENT_SCORE_KEYS: &[&str] = &["opponentScore", "roundsLost", "scoreAgainst"];
const RESULT_KEYS: &[&str] = &["result", "outcome"];
const WON_KEYS: &[&str] = &["won", "win", "victory"];
const URL_KEYS: &[&str] = &["url", "matchUrl", "link"];

/// Fetch the analytics profile and match history. The profile call decides
/// presence; a failed or misshapen match-list call leaves an empty history,
/// which is a valid state distinct from "profile unavailable".
pub fn fetch_analytics_profile(settings: &Settings) -> SourceResult<AnalyticsProfile> {
    let Some(id) = settings.analytics_id_trimmed() else {
        return Err(SourceFailure::MissingCredentials);
    };
    let client = http_client().map_err(|err| SourceFailure::Http(format!("{err:#}")))?;
    let base = api_base();

    let url = format!("{base}/players/{id}");
    let body = fetch_json(client, &apply_proxy(&url, settings.use_proxy))
        .map_err(|err| SourceFailure::Http(format!("{err:#}")))?;
    let mut profile =
        parse_profile_json(&body).map_err(|err| SourceFailure::Decode(format!("{err:#}")))?;

    let url = format!("{base}/players/{id}/matches");
    if let Ok(body) = fetch_json(client, &apply_proxy(&url, settings.use_proxy)) {
        profile.matches = parse_matches_json(&body);
    }

    Ok(profile)
}

pub fn parse_profile_json(raw: &str) -> Result<AnalyticsProfile> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        anyhow::bail!("empty profile response");
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid profile json")?;
    if let Some(msg) = root.get("error").and_then(|v| v.as_str()) {
        anyhow::bail!("provider error: {msg}");
    }
    let node = match root.get("data") {
        Some(data) if data.is_object() => data,
        _ => &root,
    };
    if !node.is_object() {
        anyhow::bail!("profile payload is not an object");
    }
    let stats = match node.get("stats") {
        Some(stats) if stats.is_object() => stats,
        _ => node,
    };

    let profile = AnalyticsProfile {
        display_name: pick_string(node, NAME_KEYS),
        avatar_url: pick_string(node, AVATAR_KEYS),
        kd: pick_f64(stats, KD_KEYS),
        win_rate: pick_f64(stats, WIN_RATE_KEYS),
        headshot_pct: pick_f64(stats, HEADSHOT_KEYS),
        hours: pick_f64(stats, HOURS_KEYS),
        weapons: parse_weapons(node),
        matches: Vec::new(),
    };

    if profile.display_name.is_none()
        && profile.kd.is_none()
        && profile.win_rate.is_none()
        && profile.headshot_pct.is_none()
        && profile.hours.is_none()
        && profile.weapons.is_empty()
    {
        anyhow::bail!("profile payload had no recognized fields");
    }
    Ok(profile)
}

/// The match-list endpoint answers with either a bare array or an object
/// wrapping one under a conventional key. Anything else is an empty history.
pub fn parse_matches_json(raw: &str) -> Vec<MatchRecord> {
    let Ok(root) = serde_json::from_str::<Value>(raw.trim()) else {
        return Vec::new();
    };
    let rows = match &root {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(_) => {
            let wrapped = root
                .get("matches")
                .or_else(|| root.get("data"))
                .and_then(|v| v.as_array());
            match wrapped {
                Some(rows) => rows.as_slice(),
                None => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };
    rows.iter().filter_map(normalize_match).collect()
}

fn normalize_match(row: &Value) -> Option<MatchRecord> {
    if !row.is_object() {
        return None;
    }
    Some(MatchRecord {
        finished_at: pick_timestamp(row, DATE_KEYS),
        map: pick_string(row, MAP_KEYS),
        kills: pick_f64(row, KILLS_KEYS),
        deaths: pick_f64(row, DEATHS_KEYS),
        team_score: pick_i64(row, TEAM_SCORE_KEYS),
        opponent_score: pick_i64(row, OPPONENT_SCORE_KEYS),
        result: pick_string(row, RESULT_KEYS).map(|s| s.to_ascii_lowercase()),
        won: pick_bool(row, WON_KEYS),
        url: pick_string(row, URL_KEYS),
    })
}

fn parse_weapons(node: &Value) -> Vec<WeaponStat> {
    let Some(rows) = node
        .get("weapons")
        .or_else(|| node.get("weaponStats"))
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let name = pick_string(row, &["name", "weaponName"])?;
            Some(WeaponStat {
                name,
                kills: pick_i64(row, KILLS_KEYS),
                headshot_pct: pick_f64(row, HEADSHOT_KEYS),
            })
        })
        .collect()
}

fn api_base() -> String {
    env::var("ANALYTICS_API_BASE")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(*key).and_then(|v| v.as_str()) {
            let s = s.trim();
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let Some(v) = value.get(*key) else { continue };
        if let Some(num) = v.as_f64() {
            if num.is_finite() {
                return Some(num);
            }
        }
        if let Some(num) = v.as_str().and_then(|s| s.trim().parse::<f64>().ok()) {
            if num.is_finite() {
                return Some(num);
            }
        }
    }
    None
}

fn pick_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        let Some(v) = value.get(*key) else { continue };
        if let Some(num) = v.as_i64() {
            return Some(num);
        }
        if let Some(num) = v.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
            return Some(num);
        }
    }
    None
}

fn pick_bool(value: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        if let Some(b) = value.get(*key).and_then(|v| v.as_bool()) {
            return Some(b);
        }
    }
    None
}

/// Finish times arrive as epoch seconds, epoch millis, or a handful of
/// ISO-ish strings. Everything normalizes to epoch seconds.
fn pick_timestamp(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        let Some(v) = value.get(*key) else { continue };
        if let Some(n) = v.as_i64() {
            return Some(normalize_epoch(n));
        }
        if let Some(f) = v.as_f64() {
            if f.is_finite() {
                return Some(normalize_epoch(f as i64));
            }
        }
        if let Some(ts) = v.as_str().and_then(parse_timestamp_str) {
            return Some(ts);
        }
    }
    None
}

fn normalize_epoch(n: i64) -> i64 {
    // Thirteen-digit values are epoch millis.
    if n.abs() >= 100_000_000_000 { n / 1000 } else { n }
}

fn parse_timestamp_str(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(normalize_epoch(n));
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    None
}

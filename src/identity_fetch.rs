use anyhow::{Context, Result};
use serde_json::Value;

use crate::http_client::{apply_proxy, fetch_json, http_client};
use crate::state::{IdentityProfile, Settings, SourceFailure, SourceResult};

const PLAYER_SUMMARY_URL: &str =
    "https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v0002/";
const OWNED_GAMES_URL: &str = "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";
const CS_APP_ID: u64 = 730;
const MINUTES_PER_HOUR: f64 = 60.0;

/// Fetch the Steam identity profile. Failures of any kind are folded into a
/// tagged absence; nothing propagates. Without both key and id the call is
/// skipped outright, there is no round trip that could succeed.
pub fn fetch_identity_profile(settings: &Settings) -> SourceResult<IdentityProfile> {
    if !settings.has_identity_credentials() {
        return Err(SourceFailure::MissingCredentials);
    }
    let client = http_client().map_err(|err| SourceFailure::Http(format!("{err:#}")))?;

    let key = settings.identity_key.trim();
    let id = settings.identity_id.trim();
    let url = format!("{PLAYER_SUMMARY_URL}?key={key}&steamids={id}");
    let body = fetch_json(client, &apply_proxy(&url, settings.use_proxy))
        .map_err(|err| SourceFailure::Http(format!("{err:#}")))?;
    let mut profile = parse_player_summary_json(&body)
        .map_err(|err| SourceFailure::Decode(format!("{err:#}")))?;

    // Dependent playtime call. Losing it only loses the hours field, the
    // profile itself still counts as present.
    let url = format!("{OWNED_GAMES_URL}?key={key}&steamid={id}&include_played_free_games=1");
    if let Ok(body) = fetch_json(client, &apply_proxy(&url, settings.use_proxy)) {
        if let Ok(hours) = parse_owned_games_json(&body) {
            profile.playtime_hours = hours;
        }
    }

    Ok(profile)
}

pub fn parse_player_summary_json(raw: &str) -> Result<IdentityProfile> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        anyhow::bail!("empty player summary response");
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid player summary json")?;
    let player = root
        .get("response")
        .and_then(|v| v.get("players"))
        .and_then(|v| v.as_array())
        .and_then(|players| players.first())
        .context("no player in summary response")?;

    Ok(IdentityProfile {
        display_name: pick_string(player, &["personaname"]),
        country_code: pick_string(player, &["loccountrycode"]),
        avatar_url: pick_string(player, &["avatarfull", "avatarmedium", "avatar"]),
        playtime_hours: None,
    })
}

/// Extract the CS playtime from an owned-games response. A library without
/// the game (or a private library) is `None`, not an error.
pub fn parse_owned_games_json(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid owned games json")?;
    let Some(games) = root
        .get("response")
        .and_then(|v| v.get("games"))
        .and_then(|v| v.as_array())
    else {
        return Ok(None);
    };

    for game in games {
        if game.get("appid").and_then(|v| v.as_u64()) != Some(CS_APP_ID) {
            continue;
        }
        let minutes = game
            .get("playtime_forever")
            .and_then(|v| v.as_f64())
            .filter(|m| m.is_finite() && *m >= 0.0);
        return Ok(minutes.map(|m| m / MINUTES_PER_HOUR));
    }
    Ok(None)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_skip_the_network() {
        let settings = Settings {
            identity_key: String::new(),
            identity_id: "7656".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            fetch_identity_profile(&settings),
            Err(SourceFailure::MissingCredentials)
        );
        let settings = Settings {
            identity_key: "KEY".to_string(),
            identity_id: "   ".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            fetch_identity_profile(&settings),
            Err(SourceFailure::MissingCredentials)
        );
    }

    #[test]
    fn empty_summary_body_is_an_error() {
        assert!(parse_player_summary_json("").is_err());
        assert!(parse_player_summary_json("null").is_err());
        assert!(parse_player_summary_json(r#"{"response":{"players":[]}}"#).is_err());
    }

    #[test]
    fn owned_games_without_cs_is_none() {
        let raw = r#"{"response":{"games":[{"appid":10,"playtime_forever":500}]}}"#;
        assert_eq!(parse_owned_games_json(raw).unwrap(), None);
        assert_eq!(parse_owned_games_json("null").unwrap(), None);
        assert_eq!(parse_owned_games_json(r#"{"response":{}}"#).unwrap(), None);
    }

    #[test]
    fn owned_games_playtime_converts_to_hours() {
        let raw = r#"{"response":{"games":[{"appid":730,"playtime_forever":90}]}}"#;
        assert_eq!(parse_owned_games_json(raw).unwrap(), Some(1.5));
    }
}

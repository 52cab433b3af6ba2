use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROXY_PREFIX: &str = "https://corsproxy.io/?url=";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// One-shot GET returning the body. Non-success statuses become errors so
/// the adapters can fold them into a tagged absence. No response caching:
/// every refresh recomputes from fresh provider responses.
pub fn fetch_json(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()
        .context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, truncate(&body, 200)));
    }
    Ok(body)
}

/// Route the outgoing URL through the relay prefix when the user asked for
/// it. Response parsing is unaffected.
pub fn apply_proxy(url: &str, use_proxy: bool) -> String {
    if !use_proxy {
        return url.to_string();
    }
    format!("{}{}", proxy_prefix(), url)
}

fn proxy_prefix() -> String {
    env::var("PROXY_PREFIX")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROXY_PREFIX.to_string())
}

fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_disabled_leaves_url_untouched() {
        let url = "https://api.example/players/1";
        assert_eq!(apply_proxy(url, false), url);
    }

    #[test]
    fn proxy_enabled_prefixes_url() {
        let url = "https://api.example/players/1";
        let proxied = apply_proxy(url, true);
        assert!(proxied.ends_with(url));
        assert!(proxied.len() > url.len());
    }
}

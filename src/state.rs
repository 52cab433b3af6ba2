use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub identity_key: String,
    pub identity_id: String,
    pub analytics_id: String,
    pub use_proxy: bool,
}

impl Settings {
    pub fn has_identity_credentials(&self) -> bool {
        !self.identity_key.trim().is_empty() && !self.identity_id.trim().is_empty()
    }

    pub fn has_analytics_id(&self) -> bool {
        !self.analytics_id.trim().is_empty()
    }

    pub fn analytics_id_trimmed(&self) -> Option<&str> {
        let id = self.analytics_id.trim();
        if id.is_empty() { None } else { Some(id) }
    }
}

/// Normalized output of the identity provider (Steam). Presence of every
/// field varies per account and privacy settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityProfile {
    pub display_name: Option<String>,
    pub country_code: Option<String>,
    pub avatar_url: Option<String>,
    pub playtime_hours: Option<f64>,
}

/// Normalized output of the analytics provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsProfile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub kd: Option<f64>,
    pub win_rate: Option<f64>,
    pub headshot_pct: Option<f64>,
    pub hours: Option<f64>,
    pub weapons: Vec<WeaponStat>,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeaponStat {
    pub name: String,
    pub kills: Option<i64>,
    pub headshot_pct: Option<f64>,
}

/// Canonical match record. Only the adapters construct these: every synonym
/// field name and timestamp encoding a provider uses is mapped here before
/// the record reaches reconcile/aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchRecord {
    /// Epoch seconds of the match finish time, when the provider sent one.
    pub finished_at: Option<i64>,
    pub map: Option<String>,
    pub kills: Option<f64>,
    pub deaths: Option<f64>,
    pub team_score: Option<i64>,
    pub opponent_score: Option<i64>,
    /// Raw result string, lowercased ("win", "loss", "draw", ...).
    pub result: Option<String>,
    /// Boolean victory flag, for providers that encode the result that way.
    pub won: Option<bool>,
    pub url: Option<String>,
}

/// A numeric dashboard field: either a value some source supplied, or the
/// explicit unknown sentinel. Zero is a valid value and never means absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    Value(f64),
    Unknown,
}

impl Resolved {
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) => Resolved::Value(v),
            None => Resolved::Unknown,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Resolved::Value(v) => Some(v),
            Resolved::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Resolved::Unknown)
    }
}

/// The single reconciled, render-ready profile. Rebuilt from scratch on
/// every connect; the strings are always resolved to something displayable,
/// the numerics carry the unknown sentinel through to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerViewModel {
    pub display_name: String,
    pub avatar_url: String,
    pub sub_label: String,
    pub kd: Resolved,
    pub win_rate: Resolved,
    pub headshot_pct: Resolved,
    pub hours: Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapWinRate {
    pub map: String,
    pub played: usize,
    pub wins: usize,
    pub win_rate_pct: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchAggregate {
    pub total: usize,
    /// Ties count as half a win. 0.0 for an empty history, one decimal.
    pub win_rate_pct: f64,
    pub kd: Resolved,
    pub per_map: Vec<MapWinRate>,
    pub recent: Vec<MatchRecord>,
}

/// Why a source produced no profile. Returned by the adapters instead of a
/// thrown error so callers and tests can assert on the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    MissingCredentials,
    Http(String),
    Decode(String),
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::MissingCredentials => write!(f, "credentials not provided"),
            SourceFailure::Http(reason) => write!(f, "request failed: {reason}"),
            SourceFailure::Decode(reason) => write!(f, "unexpected response: {reason}"),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceFailure>;

/// Everything one connect produces. The raw match and weapon lists ride
/// along because the renderer reads fields the aggregate does not project.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub view: PlayerViewModel,
    pub summary: MatchAggregate,
    pub matches: Vec<MatchRecord>,
    pub weapons: Vec<WeaponStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Setup,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    IdentityKey,
    IdentityId,
    AnalyticsId,
    UseProxy,
}

impl SetupField {
    pub fn next(self) -> Self {
        match self {
            SetupField::IdentityKey => SetupField::IdentityId,
            SetupField::IdentityId => SetupField::AnalyticsId,
            SetupField::AnalyticsId => SetupField::UseProxy,
            SetupField::UseProxy => SetupField::IdentityKey,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SetupField::IdentityKey => SetupField::UseProxy,
            SetupField::IdentityId => SetupField::IdentityKey,
            SetupField::AnalyticsId => SetupField::IdentityId,
            SetupField::UseProxy => SetupField::AnalyticsId,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    DashboardLoaded(Box<DashboardData>),
    ConnectFailed {
        identity: SourceFailure,
        analytics: SourceFailure,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Connect(Settings),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub settings: Settings,
    pub setup_focus: SetupField,
    pub connecting: bool,
    pub dashboard: Option<DashboardData>,
    pub connect_error: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Setup,
            settings: Settings::default(),
            setup_focus: SetupField::IdentityKey,
            connecting: false,
            dashboard: None,
            connect_error: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn begin_connect(&mut self) {
        self.connecting = true;
        self.connect_error = None;
    }

    pub fn setup_field_mut(&mut self) -> Option<&mut String> {
        match self.setup_focus {
            SetupField::IdentityKey => Some(&mut self.settings.identity_key),
            SetupField::IdentityId => Some(&mut self.settings.identity_id),
            SetupField::AnalyticsId => Some(&mut self.settings.analytics_id),
            SetupField::UseProxy => None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::DashboardLoaded(data) => {
            state.push_log(format!(
                "[INFO] Loaded {} matches for {}",
                data.summary.total, data.view.display_name
            ));
            state.dashboard = Some(*data);
            state.connecting = false;
            state.connect_error = None;
            state.screen = Screen::Dashboard;
        }
        Delta::ConnectFailed {
            identity,
            analytics,
        } => {
            state.connecting = false;
            state.connect_error = Some(format!(
                "both sources failed (identity: {identity}; analytics: {analytics})"
            ));
            state.push_log(format!("[WARN] Identity source: {identity}"));
            state.push_log(format!("[WARN] Analytics source: {analytics}"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

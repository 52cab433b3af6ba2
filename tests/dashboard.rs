use cs2_terminal::feed::connect_outcome;
use cs2_terminal::state::{
    AnalyticsProfile, Delta, IdentityProfile, MatchRecord, Resolved, Settings, SourceFailure,
};

fn settings_with_analytics_id(id: &str) -> Settings {
    Settings {
        analytics_id: id.to_string(),
        ..Settings::default()
    }
}

fn match_record(kills: f64, deaths: f64, result: &str) -> MatchRecord {
    MatchRecord {
        kills: Some(kills),
        deaths: Some(deaths),
        result: Some(result.to_string()),
        ..MatchRecord::default()
    }
}

#[test]
fn partial_sources_still_build_a_full_dashboard() {
    let identity = IdentityProfile {
        display_name: Some("Alice".to_string()),
        avatar_url: Some("a.png".to_string()),
        ..IdentityProfile::default()
    };
    let analytics = AnalyticsProfile {
        kd: Some(1.5),
        win_rate: None,
        matches: vec![
            match_record(10.0, 5.0, "win"),
            match_record(4.0, 8.0, "loss"),
        ],
        ..AnalyticsProfile::default()
    };

    let delta = connect_outcome(
        Ok(identity),
        Ok(analytics),
        &settings_with_analytics_id("al1ce"),
    );
    let Delta::DashboardLoaded(data) = delta else {
        panic!("expected a loaded dashboard");
    };

    assert_eq!(data.view.display_name, "Alice");
    assert_eq!(data.view.avatar_url, "a.png");
    assert_eq!(data.view.kd, Resolved::Value(1.5));
    assert!(data.view.win_rate.is_unknown());

    assert_eq!(data.summary.total, 2);
    assert_eq!(data.summary.win_rate_pct, 50.0);
    let kd = data.summary.kd.value().expect("aggregate kd should resolve");
    assert!((kd - 14.0 / 13.0).abs() < 1e-9);
    assert_eq!(data.matches.len(), 2);
}

#[test]
fn analytics_only_connect_synthesizes_the_name() {
    let analytics = AnalyticsProfile {
        matches: vec![match_record(7.0, 7.0, "win")],
        kd: Some(0.9),
        ..AnalyticsProfile::default()
    };
    let delta = connect_outcome(
        Err(SourceFailure::MissingCredentials),
        Ok(analytics),
        &settings_with_analytics_id("al1ce"),
    );
    let Delta::DashboardLoaded(data) = delta else {
        panic!("expected a loaded dashboard");
    };
    assert_eq!(data.view.display_name, "Player al1ce");
    assert_eq!(data.view.sub_label, "Profile");
    assert_eq!(data.summary.total, 1);
}

#[test]
fn identity_only_connect_keeps_an_empty_history() {
    let identity = IdentityProfile {
        display_name: Some("Bob".to_string()),
        playtime_hours: Some(120.0),
        ..IdentityProfile::default()
    };
    let delta = connect_outcome(
        Ok(identity),
        Err(SourceFailure::Http("http 503".to_string())),
        &Settings::default(),
    );
    let Delta::DashboardLoaded(data) = delta else {
        panic!("expected a loaded dashboard");
    };
    assert_eq!(data.view.display_name, "Bob");
    assert_eq!(data.view.hours, Resolved::Value(120.0));
    assert!(data.view.kd.is_unknown());
    assert_eq!(data.summary.total, 0);
    assert_eq!(data.summary.win_rate_pct, 0.0);
    assert!(data.summary.kd.is_unknown());
    assert!(data.matches.is_empty());
}

#[test]
fn both_sources_failing_is_a_distinct_outcome() {
    let delta = connect_outcome(
        Err(SourceFailure::MissingCredentials),
        Err(SourceFailure::Http("http 500".to_string())),
        &Settings::default(),
    );
    let Delta::ConnectFailed {
        identity,
        analytics,
    } = delta
    else {
        panic!("expected a total failure");
    };
    assert_eq!(identity, SourceFailure::MissingCredentials);
    assert_eq!(analytics, SourceFailure::Http("http 500".to_string()));
}

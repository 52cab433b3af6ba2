use crate::state::{AnalyticsProfile, IdentityProfile, PlayerViewModel, Resolved};

pub const UNKNOWN_LABEL: &str = "unknown";
pub const PLACEHOLDER_AVATAR_URL: &str =
    "https://placehold.co/128x128?text=CS";
const GENERIC_SUB_LABEL: &str = "Profile";

/// Merge the settled adapter outputs into one view model. Pure and
/// deterministic; every field falls back across sources independently and
/// lands on the unknown sentinel when no source supplied it. No formatting
/// happens here, the renderer owns that.
pub fn reconcile(
    identity: Option<&IdentityProfile>,
    analytics: Option<&AnalyticsProfile>,
    analytics_id: Option<&str>,
) -> PlayerViewModel {
    let display_name = first_name(identity, analytics)
        .or_else(|| synthesized_name(analytics_id))
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    let avatar_url = identity
        .and_then(|p| clean(p.avatar_url.as_deref()))
        .or_else(|| analytics.and_then(|p| clean(p.avatar_url.as_deref())))
        .unwrap_or_else(|| PLACEHOLDER_AVATAR_URL.to_string());

    let sub_label = identity
        .and_then(|p| clean(p.country_code.as_deref()))
        .map(|code| format!("Steam • {}", code.to_uppercase()))
        .unwrap_or_else(|| GENERIC_SUB_LABEL.to_string());

    let analytics_stat = |pick: fn(&AnalyticsProfile) -> Option<f64>| {
        analytics.and_then(pick)
    };

    // Hours fall back to the identity owned-games playtime; the other
    // numerics only ever come from the analytics source.
    let hours = analytics_stat(|p| p.hours)
        .or_else(|| identity.and_then(|p| p.playtime_hours))
        .and_then(non_negative);

    PlayerViewModel {
        display_name,
        avatar_url,
        sub_label,
        kd: Resolved::from_option(analytics_stat(|p| p.kd).and_then(non_negative)),
        win_rate: Resolved::from_option(analytics_stat(|p| p.win_rate).and_then(percentage)),
        headshot_pct: Resolved::from_option(
            analytics_stat(|p| p.headshot_pct).and_then(percentage),
        ),
        hours: Resolved::from_option(hours),
    }
}

fn first_name(
    identity: Option<&IdentityProfile>,
    analytics: Option<&AnalyticsProfile>,
) -> Option<String> {
    identity
        .and_then(|p| clean(p.display_name.as_deref()))
        .or_else(|| analytics.and_then(|p| clean(p.display_name.as_deref())))
}

fn synthesized_name(analytics_id: Option<&str>) -> Option<String> {
    let id = analytics_id?.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!("Player {id}"))
}

fn clean(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn non_negative(v: f64) -> Option<f64> {
    if v.is_finite() && v >= 0.0 { Some(v) } else { None }
}

fn percentage(v: f64) -> Option<f64> {
    if v.is_finite() && (0.0..=100.0).contains(&v) {
        Some(v)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> IdentityProfile {
        IdentityProfile {
            display_name: Some(name.to_string()),
            ..IdentityProfile::default()
        }
    }

    fn analytics(name: &str) -> AnalyticsProfile {
        AnalyticsProfile {
            display_name: Some(name.to_string()),
            ..AnalyticsProfile::default()
        }
    }

    #[test]
    fn both_absent_yields_all_unknowns() {
        let view = reconcile(None, None, Some("76561198000000000"));
        assert_eq!(view.display_name, "Player 76561198000000000");
        assert_eq!(view.avatar_url, PLACEHOLDER_AVATAR_URL);
        assert_eq!(view.sub_label, "Profile");
        assert!(view.kd.is_unknown());
        assert!(view.win_rate.is_unknown());
        assert!(view.headshot_pct.is_unknown());
        assert!(view.hours.is_unknown());
    }

    #[test]
    fn both_absent_without_id_names_unknown() {
        let view = reconcile(None, None, None);
        assert_eq!(view.display_name, UNKNOWN_LABEL);
        let view = reconcile(None, None, Some("   "));
        assert_eq!(view.display_name, UNKNOWN_LABEL);
    }

    #[test]
    fn identity_name_wins_over_analytics() {
        let view = reconcile(Some(&identity("A")), Some(&analytics("B")), None);
        assert_eq!(view.display_name, "A");
    }

    #[test]
    fn analytics_name_used_when_identity_absent() {
        let view = reconcile(None, Some(&analytics("B")), None);
        assert_eq!(view.display_name, "B");
    }

    #[test]
    fn blank_identity_name_falls_through() {
        let view = reconcile(Some(&identity("   ")), Some(&analytics("B")), None);
        assert_eq!(view.display_name, "B");
    }

    #[test]
    fn country_code_formats_sub_label() {
        let profile = IdentityProfile {
            country_code: Some("de".to_string()),
            ..IdentityProfile::default()
        };
        let view = reconcile(Some(&profile), None, None);
        assert_eq!(view.sub_label, "Steam • DE");
    }

    #[test]
    fn null_analytics_stat_is_unknown_not_zero() {
        let profile = AnalyticsProfile {
            kd: Some(1.5),
            win_rate: None,
            ..AnalyticsProfile::default()
        };
        let view = reconcile(None, Some(&profile), None);
        assert_eq!(view.kd, Resolved::Value(1.5));
        assert!(view.win_rate.is_unknown());
    }

    #[test]
    fn zero_is_a_valid_stat_value() {
        let profile = AnalyticsProfile {
            kd: Some(0.0),
            win_rate: Some(0.0),
            ..AnalyticsProfile::default()
        };
        let view = reconcile(None, Some(&profile), None);
        assert_eq!(view.kd, Resolved::Value(0.0));
        assert_eq!(view.win_rate, Resolved::Value(0.0));
    }

    #[test]
    fn out_of_range_stats_are_discarded() {
        let profile = AnalyticsProfile {
            kd: Some(-1.0),
            win_rate: Some(140.0),
            headshot_pct: Some(f64::NAN),
            ..AnalyticsProfile::default()
        };
        let view = reconcile(None, Some(&profile), None);
        assert!(view.kd.is_unknown());
        assert!(view.win_rate.is_unknown());
        assert!(view.headshot_pct.is_unknown());
    }

    #[test]
    fn hours_fall_back_to_identity_playtime() {
        let identity = IdentityProfile {
            playtime_hours: Some(812.0),
            ..IdentityProfile::default()
        };
        let analytics = AnalyticsProfile::default();
        let view = reconcile(Some(&identity), Some(&analytics), None);
        assert_eq!(view.hours, Resolved::Value(812.0));

        let analytics = AnalyticsProfile {
            hours: Some(400.0),
            ..AnalyticsProfile::default()
        };
        let view = reconcile(Some(&identity), Some(&analytics), None);
        assert_eq!(view.hours, Resolved::Value(400.0));
    }

    #[test]
    fn avatar_prefers_identity_then_analytics() {
        let identity = IdentityProfile {
            avatar_url: Some("https://id.example/a.png".to_string()),
            ..IdentityProfile::default()
        };
        let analytics = AnalyticsProfile {
            avatar_url: Some("https://an.example/b.png".to_string()),
            ..AnalyticsProfile::default()
        };
        let view = reconcile(Some(&identity), Some(&analytics), None);
        assert_eq!(view.avatar_url, "https://id.example/a.png");
        let view = reconcile(None, Some(&analytics), None);
        assert_eq!(view.avatar_url, "https://an.example/b.png");
    }
}

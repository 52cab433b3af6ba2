use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::aggregate;
use crate::analytics_fetch;
use crate::identity_fetch;
use crate::reconcile;
use crate::state::{
    AnalyticsProfile, DashboardData, Delta, IdentityProfile, ProviderCommand, Settings,
    SourceFailure, SourceResult,
};

pub fn spawn_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Connect(settings) => {
                    // Connects are not tokenized against each other: when two
                    // overlap, each runs to completion and the last delta to
                    // arrive wins the dashboard state.
                    let tx = tx.clone();
                    thread::spawn(move || run_connect(settings, &tx));
                }
            }
        }
    });
}

/// One connect cycle. Both adapters run concurrently and are joined; a fast
/// failure on one side never short-circuits the other.
fn run_connect(settings: Settings, tx: &Sender<Delta>) {
    let identity_handle = {
        let settings = settings.clone();
        thread::spawn(move || identity_fetch::fetch_identity_profile(&settings))
    };
    let analytics = analytics_fetch::fetch_analytics_profile(&settings);
    let identity = identity_handle.join().unwrap_or_else(|_| {
        Err(SourceFailure::Decode("identity worker panicked".to_string()))
    });

    let total_failure = identity.is_err() && analytics.is_err();
    if !total_failure {
        if let Err(failure) = &identity {
            let _ = tx.send(Delta::Log(format!("[WARN] Identity source: {failure}")));
        }
        if let Err(failure) = &analytics {
            let _ = tx.send(Delta::Log(format!("[WARN] Analytics source: {failure}")));
        }
    }

    let _ = tx.send(connect_outcome(identity, analytics, &settings));
}

/// Classify the joined adapter results. Both sources absent is a distinct
/// condition; anything else builds a full dashboard from whatever settled.
pub fn connect_outcome(
    identity: SourceResult<IdentityProfile>,
    analytics: SourceResult<AnalyticsProfile>,
    settings: &Settings,
) -> Delta {
    match (identity, analytics) {
        (Err(identity), Err(analytics)) => Delta::ConnectFailed {
            identity,
            analytics,
        },
        (identity, analytics) => {
            let identity = identity.ok();
            let analytics = analytics.ok();
            let view = reconcile::reconcile(
                identity.as_ref(),
                analytics.as_ref(),
                settings.analytics_id_trimmed(),
            );
            let (matches, weapons) = analytics
                .map(|profile| (profile.matches, profile.weapons))
                .unwrap_or_default();
            let summary = aggregate::aggregate(&matches);
            Delta::DashboardLoaded(Box::new(DashboardData {
                view,
                summary,
                matches,
                weapons,
            }))
        }
    }
}

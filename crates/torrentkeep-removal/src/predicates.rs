//! Condition-mode predicate evaluation.

use regex::Regex;
use torrentkeep_config::{ConditionPredicates, PredicateConnector};
use torrentkeep_core::TorrentView;

/// Evaluate a single torrent against the enabled predicates, combined by
/// `connector`. A predicate that is not configured does not participate;
/// with zero enabled predicates the result is the connector's identity.
pub fn evaluate(view: &TorrentView, connector: PredicateConnector, predicates: &ConditionPredicates) -> bool {
    let checks = enabled_checks(view, predicates);
    match connector {
        PredicateConnector::And => checks.iter().all(|check| *check),
        PredicateConnector::Or => checks.iter().any(|check| *check),
    }
}

fn enabled_checks(view: &TorrentView, predicates: &ConditionPredicates) -> Vec<bool> {
    let mut checks = Vec::new();

    if let Some(min_ratio) = predicates.min_ratio {
        checks.push(view.ratio >= min_ratio);
    }
    if let Some(min_seconds) = predicates.min_seeding_seconds {
        checks.push(view.seeding_time > min_seconds);
    }
    if let Some((min_gib, max_gib)) = predicates.size_range_gib {
        #[allow(clippy::cast_precision_loss)]
        let size_gib = view.size as f64 / (1_u64 << 30) as f64;
        checks.push(if (min_gib - max_gib).abs() > f64::EPSILON {
            size_gib >= min_gib && size_gib <= max_gib
        } else {
            size_gib >= min_gib
        });
    }
    if let Some(min_upspeed) = predicates.min_upspeed_kib {
        checks.push(view.upspeed >= min_upspeed);
    }
    if !predicates.categories.is_empty() {
        checks.push(predicates.categories.iter().any(|category| category == &view.category));
    }
    if !predicates.tags.is_empty() {
        checks.push(predicates.tags.iter().any(|tag| view.tags.contains(tag)));
    }
    if !predicates.sites.is_empty() {
        checks.push(predicates.sites.iter().any(|site| site == &view.site));
    }
    if predicates.require_complete {
        checks.push(view.is_complete());
    }
    if predicates.require_paused {
        checks.push(view.state == torrentkeep_core::TorrentState::Paused);
    }
    if let Some(pattern) = predicates.path_pattern.as_deref() {
        checks.push(matches_case_insensitive(pattern, &view.save_path));
    }
    if let Some(pattern) = predicates.tracker_pattern.as_deref() {
        checks.push(
            view.trackers
                .iter()
                .any(|tracker| matches_case_insensitive(pattern, tracker)),
        );
    }
    if let Some(pattern) = predicates.error_pattern.as_deref() {
        checks.push(matches_case_insensitive(pattern, &view.error));
    }
    if !predicates.states.is_empty() {
        checks.push(predicates.states.iter().any(|state| state == state_label(view)));
    }

    checks
}

fn matches_case_insensitive(pattern: &str, haystack: &str) -> bool {
    Regex::new(&format!("(?i){pattern}"))
        .map(|regex| regex.is_match(haystack))
        .unwrap_or(false)
}

fn state_label(view: &TorrentView) -> &'static str {
    match view.state {
        torrentkeep_core::TorrentState::Downloading => "downloading",
        torrentkeep_core::TorrentState::Seeding => "seeding",
        torrentkeep_core::TorrentState::Paused => "paused",
        torrentkeep_core::TorrentState::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use torrentkeep_core::{BackendKind, TorrentState};

    use super::*;

    fn sample() -> TorrentView {
        TorrentView {
            id: "abc".into(),
            backend: BackendKind::QBittorrent,
            name: "Example.Movie.2024".into(),
            size: 10 * (1_u64 << 30),
            progress: 1.0,
            ratio: 2.5,
            upspeed: 0.0,
            downspeed: 0.0,
            date_added: Utc::now(),
            date_done: Utc::now(),
            seeding_time: 7200,
            trackers: vec!["https://tracker.example.com/announce".into()],
            site: "example.com".into(),
            category: "movies".into(),
            tags: vec!["keep".into()],
            save_path: "/data/movies/Example".into(),
            state: TorrentState::Seeding,
            error: String::new(),
        }
    }

    #[test]
    fn zero_predicates_reduce_to_connector_identity() {
        let empty = ConditionPredicates::default();
        assert!(evaluate(&sample(), PredicateConnector::And, &empty));
        assert!(!evaluate(&sample(), PredicateConnector::Or, &empty));
    }

    #[test]
    fn and_connector_requires_every_enabled_predicate() {
        let predicates = ConditionPredicates {
            min_ratio: Some(2.0),
            min_upspeed_kib: Some(0.0),
            ..ConditionPredicates::default()
        };
        assert!(evaluate(&sample(), PredicateConnector::And, &predicates));

        let predicates = ConditionPredicates {
            min_ratio: Some(10.0),
            ..ConditionPredicates::default()
        };
        assert!(!evaluate(&sample(), PredicateConnector::And, &predicates));
    }

    #[test]
    fn path_pattern_matches_case_insensitively() {
        let predicates = ConditionPredicates {
            path_pattern: Some("example".into()),
            ..ConditionPredicates::default()
        };
        assert!(evaluate(&sample(), PredicateConnector::And, &predicates));
    }

    #[test]
    fn tracker_pattern_checks_every_tracker() {
        let predicates = ConditionPredicates {
            tracker_pattern: Some("nomatch".into()),
            ..ConditionPredicates::default()
        };
        assert!(!evaluate(&sample(), PredicateConnector::And, &predicates));
    }
}

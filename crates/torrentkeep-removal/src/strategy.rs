//! Strategy-mode ranking and walk execution.

use std::cmp::Ordering;
use std::collections::HashSet;

use torrentkeep_config::{StrategyAction, StrategyPolicy};
use torrentkeep_core::TorrentView;

use crate::predicates;

const GIB: f64 = (1_u64 << 30) as f64;

/// Sort torrents by the chosen ranking key, ascending in walk order (the
/// first entries are the first candidates for removal).
pub fn sort_by_action(mut views: Vec<TorrentView>, action: StrategyAction) -> Vec<TorrentView> {
    match action {
        StrategyAction::OldSeeds => {
            views.sort_by(|a, b| b.seeding_time.cmp(&a.seeding_time));
        }
        StrategyAction::SmallSeeds => {
            views.sort_by(|a, b| a.size.cmp(&b.size));
        }
        StrategyAction::InactiveSeeds => {
            views.sort_by(|a, b| {
                a.upspeed
                    .partial_cmp(&b.upspeed)
                    .unwrap_or(Ordering::Equal)
            });
        }
    }
    views
}

fn passes_pre_filter(view: &TorrentView, policy: &StrategyPolicy) -> bool {
    if !policy.pre_filter_by_condition {
        return true;
    }
    let Some((connector, predicate_set)) = &policy.condition else {
        return true;
    };
    predicates::evaluate(view, *connector, predicate_set)
}

fn passes_complete_only(view: &TorrentView, policy: &StrategyPolicy) -> bool {
    let Some((_, predicate_set)) = &policy.condition else {
        return true;
    };
    !predicate_set.require_complete || view.is_complete()
}

/// Estimate bytes still owed by in-progress, condition-passing torrents, used
/// to bias the `freespace` strategy's effective-free-space calculation.
fn pre_release_offset_bytes(views: &[TorrentView], policy: &StrategyPolicy) -> f64 {
    let Some((connector, predicate_set)) = &policy.condition else {
        return 0.0;
    };
    let mut in_progress: Vec<&TorrentView> = views.iter().filter(|view| view.progress < 1.0).collect();
    in_progress.sort_by(|a, b| a.progress.partial_cmp(&b.progress).unwrap_or(Ordering::Equal));
    in_progress
        .into_iter()
        .filter(|view| predicates::evaluate(view, *connector, predicate_set))
        .map(|view| {
            #[allow(clippy::cast_precision_loss)]
            let size = view.size as f64;
            size * (1.0 - view.progress)
        })
        .sum()
}

/// Walk torrents already sorted by `old_seeds`, removing from the front
/// while `free_bytes` (after any `pre_release` offset) falls short of
/// `target_gib`.
pub fn select_by_freespace(
    sorted: &[TorrentView],
    policy: &StrategyPolicy,
    free_bytes: u64,
    cross_seed: bool,
) -> HashSet<String> {
    let target_gib = policy.freespace_gib.unwrap_or(0.0);
    #[allow(clippy::cast_precision_loss)]
    let mut free_gib = free_bytes as f64 / GIB;
    if policy.pre_release {
        free_gib -= pre_release_offset_bytes(sorted, policy) / GIB;
    }
    if free_gib >= target_gib {
        return HashSet::new();
    }
    let mut need = target_gib - free_gib;
    let mut selected = HashSet::new();
    for view in sorted {
        #[allow(clippy::cast_precision_loss)]
        let size_gib = view.size as f64 / GIB;
        let candidate = need > 0.0 && passes_pre_filter(view, policy) && passes_complete_only(view, policy);
        need -= size_gib;
        if candidate {
            selected.insert(view.id.clone());
        }
        if need <= 0.0 && !cross_seed {
            break;
        }
    }
    selected
}

/// Remove the oldest `len - target` torrents, keeping the newest `target`.
pub fn select_by_maximum_count(sorted: &[TorrentView], policy: &StrategyPolicy, cross_seed: bool) -> HashSet<String> {
    let Some(target) = policy.maximum_count_seeds else {
        return HashSet::new();
    };
    #[allow(clippy::cast_possible_truncation)]
    let len = sorted.len() as u64;
    if len <= target {
        return HashSet::new();
    }
    let remove_count = len - target;
    let mut selected = HashSet::new();
    for (index, view) in sorted.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let candidate = (index as u64) < remove_count
            && passes_pre_filter(view, policy)
            && passes_complete_only(view, policy);
        if candidate {
            selected.insert(view.id.clone());
        }
        #[allow(clippy::cast_possible_truncation)]
        if (index as u64) >= remove_count && !cross_seed {
            break;
        }
    }
    selected
}

/// Walk torrents removing from the front until total size no longer exceeds
/// `maximum_size_seeds_gib`.
pub fn select_by_maximum_size(sorted: &[TorrentView], policy: &StrategyPolicy, cross_seed: bool) -> HashSet<String> {
    let Some(target_gib) = policy.maximum_size_seeds_gib else {
        return HashSet::new();
    };
    #[allow(clippy::cast_precision_loss)]
    let total_gib: f64 = sorted.iter().map(|view| view.size as f64).sum::<f64>() / GIB;
    if total_gib <= target_gib {
        return HashSet::new();
    }
    let mut need_gib = total_gib - target_gib;
    let mut selected = HashSet::new();
    for view in sorted {
        #[allow(clippy::cast_precision_loss)]
        let size_gib = view.size as f64 / GIB;
        let candidate = need_gib >= size_gib && passes_pre_filter(view, policy) && passes_complete_only(view, policy);
        need_gib -= size_gib;
        if candidate {
            selected.insert(view.id.clone());
        }
        if need_gib <= 0.0 && !cross_seed {
            break;
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use torrentkeep_core::{BackendKind, TorrentState};

    use super::*;

    fn view(id: &str, size_gib: u64, seeding_time: i64, upspeed: f64) -> TorrentView {
        TorrentView {
            id: id.into(),
            backend: BackendKind::QBittorrent,
            name: id.into(),
            size: size_gib * (1_u64 << 30),
            progress: 1.0,
            ratio: 1.0,
            upspeed,
            downspeed: 0.0,
            date_added: Utc::now(),
            date_done: Utc::now(),
            seeding_time,
            trackers: vec![],
            site: String::new(),
            category: String::new(),
            tags: vec![],
            save_path: String::new(),
            state: TorrentState::Seeding,
            error: String::new(),
        }
    }

    fn base_policy() -> StrategyPolicy {
        StrategyPolicy {
            strategy_action: StrategyAction::OldSeeds,
            freespace_gib: None,
            freespace_path: None,
            maximum_count_seeds: None,
            maximum_size_seeds_gib: None,
            pre_filter_by_condition: false,
            pre_release: false,
            condition: None,
        }
    }

    #[test]
    fn sort_by_old_seeds_is_descending_seeding_time() {
        let views = vec![view("a", 1, 10, 0.0), view("b", 1, 100, 0.0)];
        let sorted = sort_by_action(views, StrategyAction::OldSeeds);
        assert_eq!(sorted[0].id, "b");
    }

    #[test]
    fn freespace_returns_empty_when_already_satisfied() {
        let policy = StrategyPolicy {
            freespace_gib: Some(10.0),
            ..base_policy()
        };
        let sorted = vec![view("a", 5, 10, 0.0)];
        let selected = select_by_freespace(&sorted, &policy, 20 * (1_u64 << 30), false);
        assert!(selected.is_empty());
    }

    #[test]
    fn freespace_selects_until_need_satisfied() {
        let policy = StrategyPolicy {
            freespace_gib: Some(10.0),
            ..base_policy()
        };
        let sorted = vec![view("a", 3, 100, 0.0), view("b", 3, 50, 0.0), view("c", 3, 10, 0.0)];
        let selected = select_by_freespace(&sorted, &policy, 4 * (1_u64 << 30), false);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("a"));
        assert!(selected.contains("b"));
        assert!(!selected.contains("c"));
    }

    #[test]
    fn maximum_count_seeds_keeps_target_newest() {
        let policy = StrategyPolicy {
            maximum_count_seeds: Some(1),
            ..base_policy()
        };
        let sorted = vec![view("a", 1, 100, 0.0), view("b", 1, 50, 0.0), view("c", 1, 10, 0.0)];
        let selected = select_by_maximum_count(&sorted, &policy, false);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("a"));
        assert!(selected.contains("b"));
    }

    #[test]
    fn maximum_size_seeds_removes_until_within_budget() {
        let policy = StrategyPolicy {
            maximum_size_seeds_gib: Some(5.0),
            ..base_policy()
        };
        let sorted = vec![view("a", 3, 100, 0.0), view("b", 3, 50, 0.0), view("c", 3, 10, 0.0)];
        let selected = select_by_maximum_size(&sorted, &policy, false);
        assert_eq!(selected.len(), 2);
    }
}

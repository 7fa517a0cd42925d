//! Validation helpers for configuration documents.

use regex::Regex;

use crate::error::ConfigError;
use crate::model::{ConditionPredicates, GcFilterKind, MaterializerConfig, RemovalConfig, RemovalMode};

fn valid_regex(
    pattern: &Option<String>,
    section: &'static str,
    field: &'static str,
) -> Result<(), ConfigError> {
    let Some(pattern) = pattern else {
        return Ok(());
    };
    Regex::new(pattern).map_err(|err| ConfigError::InvalidField {
        section,
        field,
        message: format!("invalid regex: {err}"),
    })?;
    Ok(())
}

fn validate_predicates(predicates: &ConditionPredicates) -> Result<(), ConfigError> {
    if let Some(range) = &predicates.size_range_gib {
        if range.0 > range.1 {
            return Err(ConfigError::InvalidField {
                section: "removal",
                field: "predicates.size_range_gib",
                message: "minimum must not exceed maximum".to_string(),
            });
        }
    }
    if let Some(ratio) = predicates.min_ratio {
        non_negative(ratio, "removal", "predicates.min_ratio")?;
    }
    if let Some(upspeed) = predicates.min_upspeed_kib {
        non_negative(upspeed, "removal", "predicates.min_upspeed_kib")?;
    }
    valid_regex(&predicates.path_pattern, "removal", "predicates.path_pattern")?;
    valid_regex(
        &predicates.tracker_pattern,
        "removal",
        "predicates.tracker_pattern",
    )?;
    valid_regex(
        &predicates.error_pattern,
        "removal",
        "predicates.error_pattern",
    )?;
    Ok(())
}

pub(crate) fn non_empty(
    value: &str,
    section: &'static str,
    field: &'static str,
) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section,
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn non_negative(
    value: f64,
    section: &'static str,
    field: &'static str,
) -> Result<(), ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::InvalidField {
            section,
            field,
            message: "must be non-negative".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn unit_range(
    value: f64,
    section: &'static str,
    field: &'static str,
) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidField {
            section,
            field,
            message: "must be between 0.0 and 1.0".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn positive(
    value: u64,
    section: &'static str,
    field: &'static str,
) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            section,
            field,
            message: "must be positive".to_string(),
        });
    }
    Ok(())
}

/// Validate a removal-engine configuration document.
///
/// # Errors
///
/// Returns an error describing the first field that fails validation.
pub fn validate_removal_config(config: &RemovalConfig) -> Result<(), ConfigError> {
    if config.backends.is_empty() {
        return Err(ConfigError::InvalidField {
            section: "removal",
            field: "backends",
            message: "at least one backend must be configured".to_string(),
        });
    }
    for backend in &config.backends {
        non_empty(&backend.name, "removal", "backends[].name")?;
        non_empty(&backend.base_url, "removal", "backends[].base_url")?;
    }

    match &config.mode {
        RemovalMode::Condition { predicates, .. } => {
            validate_predicates(predicates)?;
        }
        RemovalMode::Strategy(strategy) => {
            if let Some(threshold) = strategy.freespace_gib {
                non_negative(threshold, "removal", "strategy.freespace_gib")?;
            }
            if let Some(count) = strategy.maximum_count_seeds {
                positive(count, "removal", "strategy.maximum_count_seeds")?;
            }
            if let Some(size) = strategy.maximum_size_seeds_gib {
                non_negative(size, "removal", "strategy.maximum_size_seeds_gib")?;
            }
            if (strategy.pre_filter_by_condition || strategy.pre_release)
                && strategy.condition.is_none()
            {
                return Err(ConfigError::InvalidField {
                    section: "removal",
                    field: "strategy.condition",
                    message: "required when pre_filter_by_condition or pre_release is set"
                        .to_string(),
                });
            }
            if let Some((_, predicates)) = &strategy.condition {
                validate_predicates(predicates)?;
            }
        }
    }

    Ok(())
}

/// Validate a materializer configuration document.
///
/// # Errors
///
/// Returns an error describing the first field that fails validation.
pub fn validate_materializer_config(config: &MaterializerConfig) -> Result<(), ConfigError> {
    non_empty(&config.base_url, "materializer", "base_url")?;
    non_empty(&config.target_dir, "materializer", "target_dir")?;
    non_empty(&config.source_dir, "materializer", "source_dir")?;
    if config.roots.is_empty() {
        return Err(ConfigError::InvalidField {
            section: "materializer",
            field: "roots",
            message: "at least one root must be configured".to_string(),
        });
    }
    positive(
        config.max_list_workers as u64,
        "materializer",
        "max_list_workers",
    )?;
    positive(
        config.max_download_workers as u64,
        "materializer",
        "max_download_workers",
    )?;
    if config.media_suffixes.is_empty() {
        return Err(ConfigError::InvalidField {
            section: "materializer",
            field: "media_suffixes",
            message: "at least one media suffix must be configured".to_string(),
        });
    }
    if let Some(gc) = &config.gc {
        if matches!(gc.filter, GcFilterKind::Bloom) {
            unit_range(gc.bloom_error_rate, "materializer", "gc.bloom_error_rate")?;
            positive(
                gc.bloom_initial_capacity as u64,
                "materializer",
                "gc.bloom_initial_capacity",
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendConfig, ConditionPredicates, RemovalMode};

    fn sample_removal_config() -> RemovalConfig {
        RemovalConfig {
            backends: vec![BackendConfig {
                name: "qbittorrent".into(),
                base_url: "http://localhost:8080".into(),
                username: None,
                password: None,
            }],
            mode: RemovalMode::Condition {
                connector: crate::model::PredicateConnector::And,
                predicates: ConditionPredicates::default(),
            },
            cross_seed: false,
            action: crate::model::RemovalAction::Delete,
            onlyonce: false,
        }
    }

    #[test]
    fn rejects_empty_backends() {
        let mut config = sample_removal_config();
        config.backends.clear();
        assert!(validate_removal_config(&config).is_err());
    }

    #[test]
    fn accepts_sample_config() {
        assert!(validate_removal_config(&sample_removal_config()).is_ok());
    }
}

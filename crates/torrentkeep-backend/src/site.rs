//! Tracker sanitization and second-level domain derivation.

const PSEUDO_TRACKERS: [&str; 3] = ["** [LSD] **", "** [PeX] **", "** [DHT] **"];

/// Drop DHT/PeX/LSD pseudo-tracker placeholder entries, preserving order.
pub(crate) fn sanitize_trackers(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    urls.into_iter()
        .filter(|url| !PSEUDO_TRACKERS.contains(&url.as_str()))
        .collect()
}

/// Second-level domain of a tracker announce URL (e.g. `tracker.example.com`
/// -> `example.com`), or an empty string when the URL has no host or too few
/// labels to have one.
pub(crate) fn second_level_domain(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split(['/', ':'])
        .next()
        .unwrap_or("");
    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    if labels.len() < 2 {
        return String::new();
    }
    labels[labels.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trackers_drops_pseudo_entries() {
        let urls = vec![
            "https://tracker.example.com/announce".to_string(),
            "** [DHT] **".to_string(),
            "** [PeX] **".to_string(),
            "** [LSD] **".to_string(),
        ];
        assert_eq!(
            sanitize_trackers(urls),
            vec!["https://tracker.example.com/announce".to_string()]
        );
    }

    #[test]
    fn second_level_domain_strips_scheme_and_subdomain() {
        assert_eq!(
            second_level_domain("https://tracker.example.com:6969/announce"),
            "example.com"
        );
        assert_eq!(second_level_domain("not a url"), String::new());
    }
}

//! Deterministic remote-path to local-path transform.

use std::path::{Path, PathBuf};

/// Pure, memoizable transform from a remote path to its local shortcut path.
///
/// `remote_path` is rewritten by replacing the first occurrence of
/// `source_dir` with `path_replace`, leading slashes are stripped, the result
/// is joined onto `target_dir`, and if the path's suffix is one of
/// `media_suffixes` it is rewritten to `.strm`.
#[must_use]
pub fn target_path(
    remote_path: &str,
    source_dir: &str,
    path_replace: &str,
    target_dir: &str,
    media_suffixes: &[String],
) -> PathBuf {
    let rewritten = if source_dir.is_empty() {
        remote_path.to_string()
    } else {
        remote_path.replacen(source_dir, path_replace, 1)
    };
    let relative = rewritten.trim_start_matches('/');
    let mut path = Path::new(target_dir).join(relative);

    if let Some(suffix) = current_suffix(&path) {
        if media_suffixes
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(&suffix))
        {
            path.set_extension("strm");
        }
    }

    path
}

fn current_suffix(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
}

/// Whether a remote entry's name carries one of the configured subtitle
/// suffixes, meaning its bytes should be downloaded verbatim.
#[must_use]
pub fn is_subtitle(name: &str, subtitle_suffixes: &[String]) -> bool {
    let Some(suffix) = Path::new(name).extension() else {
        return false;
    };
    let suffix = suffix.to_string_lossy();
    subtitle_suffixes
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&suffix))
}

/// Whether a remote entry's name carries one of the configured media
/// suffixes, meaning it is materialized as a `.strm` shortcut.
#[must_use]
pub fn is_media(name: &str, media_suffixes: &[String]) -> bool {
    let Some(suffix) = Path::new(name).extension() else {
        return false;
    };
    let suffix = suffix.to_string_lossy();
    media_suffixes
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_media_suffix_to_strm() {
        let path = target_path(
            "/mnt/remote/movies/a.mkv",
            "/mnt/remote",
            "",
            "/data/local",
            &["mkv".to_string()],
        );
        assert_eq!(path, Path::new("/data/local/movies/a.strm"));
    }

    #[test]
    fn leaves_non_media_suffix_untouched() {
        let path = target_path(
            "/mnt/remote/movies/a.srt",
            "/mnt/remote",
            "",
            "/data/local",
            &["mkv".to_string()],
        );
        assert_eq!(path, Path::new("/data/local/movies/a.srt"));
    }

    #[test]
    fn applies_path_replace_prefix() {
        let path = target_path(
            "/mnt/remote/movies/a.mkv",
            "/mnt/remote",
            "/alt",
            "/data/local",
            &["mkv".to_string()],
        );
        assert_eq!(path, Path::new("/data/local/alt/movies/a.strm"));
    }

    #[test]
    fn is_media_and_is_subtitle_are_case_insensitive() {
        let media = vec!["mkv".to_string()];
        let subs = vec!["srt".to_string()];
        assert!(is_media("Movie.MKV", &media));
        assert!(is_subtitle("Movie.SRT", &subs));
        assert!(!is_media("Movie.srt", &media));
    }
}

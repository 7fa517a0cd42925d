//! Remote tree listing client.

use std::error::Error as StdError;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::MaterializerError;

/// A single entry returned by a remote directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    /// Entry name relative to its parent directory.
    pub name: String,
    /// Whether the entry is itself a directory.
    pub is_dir: bool,
    /// Per-entry signed-URL token, appended to the download URL as
    /// `?sign=...` when present.
    #[serde(default)]
    pub sign: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    path: &'a str,
    password: &'a str,
    page: u32,
    per_page: u32,
    refresh: bool,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    code: i32,
    data: Option<ListData>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    content: Vec<RemoteEntry>,
}

/// Thin client over the remote tree's `POST /api/fs/list` endpoint.
pub struct ListingClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ListingClient {
    /// Construct a client targeting the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client,
        }
    }

    /// The `<base>/d` prefix every download URL starts with.
    #[must_use]
    pub fn download_prefix(&self) -> String {
        format!("{}/d", self.base_url.trim_end_matches('/'))
    }

    /// Build the direct download URL for a remote path, appending the
    /// entry's signed-URL token as `?sign=...` when present.
    #[must_use]
    pub fn download_url(&self, remote_path: &str, sign: Option<&str>) -> String {
        let base = format!("{}{}", self.download_prefix(), remote_path);
        match sign {
            Some(sign) => format!("{base}?sign={sign}"),
            None => base,
        }
    }

    /// List the immediate children of `path`. A non-200 HTTP response, a
    /// non-success response envelope, or a transport failure all surface as
    /// [`MaterializerError::ListingFailure`] — the caller prunes the subtree
    /// and continues traversal elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializerError::ListingFailure`] if the request cannot
    /// be sent, the response status is not successful, or the response
    /// envelope reports a non-200 `code`.
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, MaterializerError> {
        let url = format!("{}/api/fs/list", self.base_url.trim_end_matches('/'));
        let request = ListRequest {
            path,
            password: "",
            page: 1,
            per_page: 0,
            refresh: false,
        };

        let mut builder = self.client.post(url).json(&request);
        if let Some(token) = self.token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| listing_failure(path, err))?;
        if !response.status().is_success() {
            return Err(MaterializerError::ListingFailure {
                path: path.to_string(),
                source: format!("listing returned status {}", response.status()).into(),
            });
        }
        let envelope: ListEnvelope = response
            .json()
            .await
            .map_err(|err| listing_failure(path, err))?;
        if envelope.code != 200 {
            return Err(MaterializerError::ListingFailure {
                path: path.to_string(),
                source: format!("listing envelope reported code {}", envelope.code).into(),
            });
        }
        Ok(envelope.data.map(|data| data.content).unwrap_or_default())
    }
}

fn listing_failure(path: &str, source: impl StdError + Send + Sync + 'static) -> MaterializerError {
    MaterializerError::ListingFailure {
        path: path.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_joins_base_and_remote_path() {
        let client = ListingClient::new("https://remote.example", None, Client::new());
        assert_eq!(
            client.download_url("/movies/a.mkv", None),
            "https://remote.example/d/movies/a.mkv"
        );
    }

    #[test]
    fn download_url_appends_sign_when_present() {
        let client = ListingClient::new("https://remote.example", None, Client::new());
        assert_eq!(
            client.download_url("/movies/a.mkv", Some("abc123")),
            "https://remote.example/d/movies/a.mkv?sign=abc123"
        );
    }
}

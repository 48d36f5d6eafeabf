//! `SearchApi` over a JSON HTTP endpoint
//!
//! One structured log record per call attempt; retrying is the engine's job,
//! this layer only classifies failures. URLs are stripped from error
//! messages so API endpoints never leak into logs.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use paragon_core::api::{ApiError, SearchApi, View};
use paragon_core::profile::{AuthorId, AuthorProfile, SourceId};

use crate::http::{block_on, http_client, CALL_TIMEOUT};

const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// Compound boolean-OR query over source IDs, in the upstream grammar.
pub fn source_query(source_ids: &[SourceId]) -> String {
    source_ids
        .iter()
        .map(|id| format!("SOURCE-ID({id})"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub struct HttpSearchApi {
    base_url: String,
    api_key: String,
    timeout: Duration,
    /// Calls left this quota window, from the last response header seen.
    /// Negative until the first response arrives.
    quota_remaining: AtomicI64,
}

#[derive(Deserialize)]
struct AuthorSearchResponse {
    authors: Vec<AuthorId>,
}

#[derive(Deserialize)]
struct CitationResponse {
    count: u64,
}

fn from_reqwest(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        return ApiError::Timeout;
    }
    let status = e.status().map(|s| s.as_u16());
    ApiError::Transport {
        status,
        message: e.without_url().to_string(),
    }
}

impl HttpSearchApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: CALL_TIMEOUT,
            quota_remaining: AtomicI64::new(-1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Calls left in the quota window, if the server has told us yet.
    pub fn quota_remaining(&self) -> Option<u64> {
        let v = self.quota_remaining.load(Ordering::Relaxed);
        u64::try_from(v).ok()
    }

    fn record_quota(&self, headers: &reqwest::header::HeaderMap) {
        if let Some(remaining) = headers
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
        {
            self.quota_remaining.store(remaining, Ordering::Relaxed);
            if remaining <= 0 {
                log::warn!("API quota window exhausted");
            }
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        // The request timeout covers the body read too; a server stalling
        // mid-body must not hang the run.
        let request = http_client()
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .timeout(self.timeout)
            .query(query);

        let response = match block_on(async { tokio::time::timeout(self.timeout, request.send()).await })
        {
            Err(_elapsed) => return Err(ApiError::Timeout),
            Ok(Err(e)) => return Err(from_reqwest(e)),
            Ok(Ok(response)) => response,
        };

        self.record_quota(response.headers());
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS && self.quota_remaining() == Some(0) {
            return Err(ApiError::QuotaExceeded);
        }
        if !status.is_success() {
            return Err(ApiError::Transport {
                status: Some(status.as_u16()),
                message: format!("HTTP {status} from {path}"),
            });
        }
        block_on(response.json::<T>()).map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Malformed(e.without_url().to_string())
            }
        })
    }
}

impl SearchApi for HttpSearchApi {
    fn search_author(&self, id: AuthorId, view: View) -> Result<AuthorProfile, ApiError> {
        log::debug!("GET author {id} view={}", view.as_str());
        let profile: AuthorProfile = self.get_json(
            &format!("/authors/{id}"),
            &[("view", view.as_str().to_string())],
        )?;
        log::debug!("author {id}: {} publications", profile.publications.len());
        Ok(profile)
    }

    fn search_source_year(
        &self,
        source_ids: &[SourceId],
        year: u16,
    ) -> Result<FxHashSet<AuthorId>, ApiError> {
        let query = source_query(source_ids);
        log::debug!("GET author search, {} sources, year {year}", source_ids.len());
        let response: AuthorSearchResponse = self.get_json(
            "/search/authors",
            &[("query", query), ("year", year.to_string())],
        )?;
        log::debug!("year {year}: {} authors", response.authors.len());
        Ok(response.authors.into_iter().collect())
    }

    fn citation_count(
        &self,
        author_id: AuthorId,
        up_to_year: u16,
        excluded_authors: &[AuthorId],
    ) -> Result<u64, ApiError> {
        let exclude = excluded_authors
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        log::debug!("GET citations for {author_id} up to {up_to_year}");
        let response: CitationResponse = self.get_json(
            &format!("/authors/{author_id}/citations"),
            &[("up_to", up_to_year.to_string()), ("exclude", exclude)],
        )?;
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn source_query_grammar() {
        assert_eq!(source_query(&[7]), "SOURCE-ID(7)");
        assert_eq!(
            source_query(&[7, 21100, 3]),
            "SOURCE-ID(7) OR SOURCE-ID(21100) OR SOURCE-ID(3)"
        );
    }

    #[test]
    fn quota_header_is_tracked() {
        let api = HttpSearchApi::new("https://example.invalid", "key");
        assert_eq!(api.quota_remaining(), None);

        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_HEADER, HeaderValue::from_static("41"));
        api.record_quota(&headers);
        assert_eq!(api.quota_remaining(), Some(41));

        headers.insert(RATE_LIMIT_HEADER, HeaderValue::from_static("0"));
        api.record_quota(&headers);
        assert_eq!(api.quota_remaining(), Some(0));
    }

    #[test]
    fn stalled_body_times_out() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Send headers and a sliver of body, then go quiet.
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 4096\r\n\r\n{\"co",
            );
            let _ = stream.flush();
            std::thread::sleep(Duration::from_millis(800));
        });

        let api = HttpSearchApi::new(format!("http://{addr}"), "key")
            .with_timeout(Duration::from_millis(200));
        let err = api.citation_count(7, 2015, &[]).unwrap_err();
        assert!(matches!(err, ApiError::Timeout), "got: {err}");
        server.join().unwrap();
    }

    #[test]
    fn garbage_quota_header_is_ignored() {
        let api = HttpSearchApi::new("https://example.invalid/", "key");
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_HEADER, HeaderValue::from_static("soon"));
        api.record_quota(&headers);
        assert_eq!(api.quota_remaining(), None);
    }
}

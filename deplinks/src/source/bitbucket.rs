//! Bitbucket Server code search source.
//!
//! Queries `POST /rest/search/latest/search` for `project:<KEY> <suffix>`,
//! pages through the code results, and looks up each file's last commit via
//! `GET /rest/api/1.0/projects/<KEY>/repos/<slug>/commits`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::protocols::{Authenticator, SearchSource, Session};
use crate::config::{BitbucketConfig, ScanConfig};
use crate::errors::{DeplinksError, Result};
use crate::models::SearchResultRecord;

/// Format used for the last commit column.
pub const COMMIT_TIME_FORMAT: &str = "%d %b %Y %H:%M";

/// Secondary (per-file hit) limit sent with every search request.
const SECONDARY_LIMIT: usize = 10;

/// Code search over a Bitbucket Server instance.
pub struct BitbucketSource {
    client: Client,
    config: BitbucketConfig,
    scan: ScanConfig,
    authenticator: Arc<dyn Authenticator>,
    session: OnceCell<Session>,
}

impl std::fmt::Debug for BitbucketSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketSource")
            .field("base_url", &self.config.base_url)
            .field("authenticated", &self.session.initialized())
            .finish_non_exhaustive()
    }
}

impl BitbucketSource {
    /// Creates a source for the configured instance.
    pub fn new(scan: &ScanConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let config = scan.bitbucket.clone();
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            config,
            scan: scan.clone(),
            authenticator,
            session: OnceCell::new(),
        })
    }

    /// Authenticates once and reuses the session for every request.
    async fn session(&self) -> Result<&Session> {
        self.session
            .get_or_try_init(|| async {
                let session = self.authenticator.authenticate().await?;
                info!(user = ?session.user(), base_url = %self.config.base_url, "Authenticated");
                Ok::<_, DeplinksError>(session)
            })
            .await
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> Result<RequestBuilder> {
        let mut headers = HeaderMap::new();
        if let Some(value) = session.authorization() {
            let value = HeaderValue::from_str(value)
                .map_err(|e| DeplinksError::Authentication(format!("invalid header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(request.headers(headers))
    }

    async fn search_page(
        &self,
        session: &Session,
        project_key: &str,
        query: &str,
        start: usize,
    ) -> Result<CodePage> {
        let url = format!("{}/rest/search/latest/search", self.config.api_root());
        let body = serde_json::json!({
            "query": query,
            "entities": {"code": {"start": start, "limit": self.config.page_size}},
            "limits": {"primary": self.config.page_size, "secondary": SECONDARY_LIMIT},
        });

        let response = self
            .authorized(self.client.post(&url), session)?
            .json(&body)
            .send()
            .await
            .map_err(|e| DeplinksError::source_unavailable(project_key, e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(DeplinksError::Authentication(format!(
                    "search returned {}",
                    response.status()
                )));
            }
            status if !status.is_success() => {
                return Err(DeplinksError::source_unavailable(
                    project_key,
                    format!("search returned {status}"),
                ));
            }
            _ => {}
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.code.unwrap_or_default())
    }

    async fn last_commit_time(&self, session: &Session, hit: &CodeHit) -> Result<String> {
        let url = format!(
            "{}/rest/api/1.0/projects/{}/repos/{}/commits",
            self.config.api_root(),
            hit.repository.project.key,
            hit.repository.slug
        );
        let page: CommitPage = self
            .authorized(self.client.get(&url), session)?
            .query(&[("path", hit.file.as_str()), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        page.values
            .first()
            .and_then(|c| format_commit_time(c.author_timestamp))
            .ok_or_else(|| DeplinksError::missing_field("authorTimestamp", hit.file.clone()))
    }
}

#[async_trait]
impl SearchSource for BitbucketSource {
    fn name(&self) -> &str {
        "bitbucket"
    }

    async fn fetch_search_results(&self, project_key: &str) -> Result<Vec<SearchResultRecord>> {
        let session = self.session().await?;
        let query = self.scan.search_query(project_key);
        let mut records = Vec::new();
        let mut start = 0;

        loop {
            let page = self.search_page(session, project_key, &query, start).await?;
            debug!(project = %project_key, start, hits = page.values.len(), "Fetched search page");

            for hit in &page.values {
                let last_commit = if self.config.lookup_commit_times {
                    self.last_commit_time(session, hit).await.unwrap_or_else(|e| {
                        debug!(error = %e, file = %hit.file, "Commit time lookup failed");
                        String::new()
                    })
                } else {
                    String::new()
                };
                records.push(hit_to_record(hit, last_commit));
            }

            match page.next_start {
                Some(next) if !page.is_last_page && next > start => start = next,
                _ => break,
            }
        }

        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    code: Option<CodePage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodePage {
    #[serde(default)]
    values: Vec<CodeHit>,
    #[serde(default = "default_last_page")]
    is_last_page: bool,
    next_start: Option<usize>,
}

impl Default for CodePage {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            is_last_page: true,
            next_start: None,
        }
    }
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeHit {
    repository: RepositoryRef,
    file: String,
    #[serde(default)]
    hit_contexts: Vec<Vec<HitLine>>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    slug: String,
    name: String,
    project: ProjectRef,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct HitLine {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CommitPage {
    #[serde(default)]
    values: Vec<CommitRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitRef {
    author_timestamp: i64,
}

fn hit_to_record(hit: &CodeHit, last_commit_time: String) -> SearchResultRecord {
    let (filepath, filename) = split_file_path(&hit.file);
    let raw_snippet = if hit.hit_contexts.is_empty() {
        None
    } else {
        Some(
            hit.hit_contexts
                .iter()
                .flatten()
                .map(|line| clean_hit_text(&line.text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    };

    SearchResultRecord {
        project: hit.repository.project.key.clone(),
        repo: hit.repository.name.clone(),
        filepath: filepath.to_string(),
        filename: filename.to_string(),
        last_commit_time,
        raw_snippet,
    }
}

/// Splits `dir/sub/file.yml` into `("dir/sub/", "file.yml")`.
#[must_use]
pub fn split_file_path(file: &str) -> (&str, &str) {
    file.rfind('/')
        .map_or(("", file), |i| (&file[..=i], &file[i + 1..]))
}

/// Strips search highlight markup and unescapes HTML entities.
#[must_use]
pub fn clean_hit_text(text: &str) -> String {
    text.replace("<em>", "")
        .replace("</em>", "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

/// Formats a millisecond epoch timestamp for the last commit column.
#[must_use]
pub fn format_commit_time(epoch_millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_millis)
        .map(|t| t.format(COMMIT_TIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::AnonymousAuthenticator;

    const SAMPLE: &str = r#"{
        "scope": {"type": "GLOBAL"},
        "code": {
            "category": "primary",
            "isLastPage": false,
            "count": 3,
            "start": 0,
            "nextStart": 2,
            "values": [
                {
                    "repository": {"slug": "realize-web", "name": "realize web", "project": {"key": "REAL"}},
                    "file": "src/main/resources/application.properties",
                    "hitContexts": [[
                        {"line": 3, "text": "rumba.url=<em>https</em>://rumba.savvas.com/sso"},
                        {"line": 4, "text": "&lt;value&gt;https://config.savvas.com/v1&lt;/value&gt;"}
                    ]],
                    "pathMatches": [],
                    "hitCount": 2
                },
                {
                    "repository": {"slug": "tools", "name": "tools", "project": {"key": "REAL"}},
                    "file": "pom.xml",
                    "pathMatches": [],
                    "hitCount": 0
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_search_response() {
        let parsed: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let page = parsed.code.unwrap();
        assert!(!page.is_last_page);
        assert_eq!(page.next_start, Some(2));
        assert_eq!(page.values.len(), 2);
    }

    #[test]
    fn test_hit_to_record() {
        let parsed: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let page = parsed.code.unwrap();

        let record = hit_to_record(&page.values[0], "01 Feb 2020 10:00".to_string());
        assert_eq!(record.project, "REAL");
        assert_eq!(record.repo, "realize web");
        assert_eq!(record.filepath, "src/main/resources/");
        assert_eq!(record.filename, "application.properties");
        assert_eq!(
            record.raw_snippet.as_deref(),
            Some("rumba.url=https://rumba.savvas.com/sso\n<value>https://config.savvas.com/v1</value>")
        );

        let bare = hit_to_record(&page.values[1], String::new());
        assert_eq!(bare.filepath, "");
        assert_eq!(bare.filename, "pom.xml");
        assert!(bare.raw_snippet.is_none());
    }

    #[test]
    fn test_missing_code_section_defaults_to_last_page() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"scope": {}}"#).unwrap();
        let page = parsed.code.unwrap_or_default();
        assert!(page.is_last_page);
        assert!(page.values.is_empty());
    }

    #[test]
    fn test_split_file_path() {
        assert_eq!(split_file_path("a/b/c.yml"), ("a/b/", "c.yml"));
        assert_eq!(split_file_path("c.yml"), ("", "c.yml"));
        assert_eq!(split_file_path("dir/"), ("dir/", ""));
    }

    #[test]
    fn test_clean_hit_text() {
        assert_eq!(
            clean_hit_text("<em>https</em>://a.com/?x=1&amp;y=2 &quot;q&quot;"),
            "https://a.com/?x=1&y=2 \"q\""
        );
        assert_eq!(clean_hit_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_format_commit_time() {
        assert_eq!(
            format_commit_time(1_580_551_200_000).as_deref(),
            Some("01 Feb 2020 10:00")
        );
    }

    #[test]
    fn test_new_source_is_unauthenticated() {
        let scan = ScanConfig::default();
        let source = BitbucketSource::new(&scan, Arc::new(AnonymousAuthenticator)).unwrap();
        assert_eq!(source.name(), "bitbucket");
        assert!(format!("{source:?}").contains("authenticated: false"));
    }
}

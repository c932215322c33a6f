//! URL classification: keyword tagging, decomposition and service inference.

use tracing::debug;

use crate::config::ScanConfig;
use crate::errors::DeplinksError;
use crate::extract::LinkMatch;
use crate::models::LinkClassification;

/// Scheme every extracted link is normalized to.
pub const NORMALIZED_SCHEME: &str = "https";

/// First path segments produced by markup leaking into a match
/// (`<url>https://host/</url>`, `<string>https://host</string>`).
const MARKUP_ARTIFACTS: [&str; 2] = ["<", "string>"];

/// Path fragment identifying gateway-style URLs whose first segment is not a
/// service name.
const GATEWAY_MARKER: &str = "sapi";

/// Classifies extracted links against a keyword vocabulary.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    keywords: Vec<String>,
    image_markers: Vec<String>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl UrlClassifier {
    /// Creates a classifier. Duplicate keywords are dropped, keeping the first.
    #[must_use]
    pub fn new<I, S>(keywords: I, image_markers: Vec<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.into();
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }
        Self {
            keywords: unique,
            image_markers,
        }
    }

    /// Creates a classifier from the scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.keywords.iter().cloned(), config.image_markers.clone())
    }

    /// The keyword vocabulary, in matching order.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Classifies a link found by the extractor.
    #[must_use]
    pub fn classify(&self, link: &LinkMatch<'_>) -> LinkClassification {
        self.classify_parts(link.as_str(), link.with_scheme(NORMALIZED_SCHEME))
    }

    /// Classifies the text following a `://` separator.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> LinkClassification {
        self.classify_parts(text, format!("{NORMALIZED_SCHEME}://{text}"))
    }

    fn classify_parts(&self, text: &str, link: String) -> LinkClassification {
        let mut keywords = self.keyword_hits(text);
        let (netloc, path) = decompose(&link);
        let service = infer_service(&netloc, &path);

        if self.is_image(&path) {
            debug!(link = %link, "Image link, clearing keywords");
            keywords.clear();
        }

        LinkClassification {
            link,
            netloc,
            path,
            service,
            keywords,
        }
    }

    fn keyword_hits(&self, text: &str) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .cloned()
            .collect()
    }

    fn is_image(&self, path: &str) -> bool {
        self.image_markers.iter().any(|m| path.contains(m.as_str()))
    }
}

/// Splits a URL into `(netloc, path)` without normalizing either part.
///
/// The netloc runs from after `://` to the first `/`, `?` or `#`; the path
/// runs on to the first `?` or `#`, minus any `;params` on its last segment.
/// Case, ports, dot segments and leaked markup are kept as written. An
/// unbalanced IPv6 bracket in the netloc degrades to empty strings.
#[must_use]
pub fn decompose(link: &str) -> (String, String) {
    let rest = link.split_once("://").map_or(link, |(_, rest)| rest);
    let netloc_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (netloc, rest) = rest.split_at(netloc_end);

    if netloc.contains('[') != netloc.contains(']') {
        let failure = DeplinksError::parse_failure(link, "invalid IPv6 netloc");
        debug!(error = %failure, "Degrading to empty netloc and path");
        return (String::new(), String::new());
    }

    let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = strip_params(&rest[..path_end]);
    (netloc.to_string(), path.to_string())
}

fn strip_params(path: &str) -> &str {
    let last_segment = path.rfind('/').unwrap_or(0);
    path[last_segment..]
        .find(';')
        .map_or(path, |i| &path[..last_segment + i])
}

/// Infers the service a link points at.
///
/// The first path segment names the service unless it is empty, a markup
/// artifact, or the path is a gateway path; then the first host label does.
#[must_use]
pub fn infer_service(netloc: &str, path: &str) -> String {
    let candidate = path.split('/').nth(1).unwrap_or_default();
    let use_host = candidate.is_empty()
        || is_markup_artifact(candidate)
        || path.is_empty()
        || path == "/"
        || path.contains(GATEWAY_MARKER);

    if use_host {
        netloc.split('.').next().unwrap_or_default().to_string()
    } else {
        candidate.to_string()
    }
}

fn is_markup_artifact(segment: &str) -> bool {
    MARKUP_ARTIFACTS.contains(&segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_links;

    fn classify(text: &str) -> LinkClassification {
        UrlClassifier::default().classify_text(text)
    }

    #[test]
    fn test_classify_internal_link() {
        let c = classify("rumba.savvasdev.com/api/config/v1");
        assert_eq!(c.link, "https://rumba.savvasdev.com/api/config/v1");
        assert_eq!(c.netloc, "rumba.savvasdev.com");
        assert_eq!(c.path, "/api/config/v1");
        assert_eq!(c.service, "api");
        assert_eq!(c.keywords, vec!["rumba", "savvas", "config"]);
    }

    #[test]
    fn test_classify_external_link() {
        let c = classify("github.com/foo/bar");
        assert_eq!(c.service, "foo");
        assert!(c.keywords.is_empty());
    }

    #[test]
    fn test_classify_from_extractor() {
        let classifier = UrlClassifier::default();
        let found: Vec<_> = extract_links("a http://realize.pearson.com/x b")
            .map(|m| classifier.classify(&m))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].link, "https://realize.pearson.com/x");
        assert_eq!(found[0].keywords, vec!["pearson", "realize"]);
    }

    #[test]
    fn test_service_falls_back_to_host_for_root_path() {
        let c = classify("telemetry.savvas.com");
        assert_eq!(c.path, "");
        assert_eq!(c.service, "telemetry");

        let c = classify("telemetry.savvas.com/");
        assert_eq!(c.service, "telemetry");
    }

    #[test]
    fn test_service_falls_back_for_gateway_path() {
        let c = classify("gateway.savvas.com/sapi/v2/users");
        assert_eq!(c.service, "gateway");
    }

    #[test]
    fn test_service_falls_back_for_empty_segment() {
        let c = classify("easybridge.savvas.com//double");
        assert_eq!(c.service, "easybridge");
    }

    #[test]
    fn test_service_falls_back_for_markup_leakage() {
        let c = classify("goldengate.savvas.com/</url>");
        assert_eq!(c.netloc, "goldengate.savvas.com");
        assert_eq!(c.service, "goldengate");

        let c = classify("rumba.savvas.com</string>");
        assert_eq!(c.link, "https://rumba.savvas.com</string>");
        assert_eq!(c.netloc, "rumba.savvas.com<");
        assert_eq!(c.path, "/string>");
        assert_eq!(c.service, "rumba");
    }

    #[test]
    fn test_infer_service_sentinels() {
        assert_eq!(infer_service("a.b.com", "/<"), "a");
        assert_eq!(infer_service("a.b.com", "/string>"), "a");
        assert_eq!(infer_service("a.b.com", ""), "a");
        assert_eq!(infer_service("a.b.com", "/"), "a");
        assert_eq!(infer_service("a.b.com", "/x/sapi"), "a");
        assert_eq!(infer_service("a.b.com", "/svc/x"), "svc");
        assert_eq!(infer_service("", ""), "");
    }

    #[test]
    fn test_image_links_lose_keywords() {
        let c = classify("cdn.savvas.com/images/logo.png");
        assert!(c.keywords.is_empty());
        assert_eq!(c.service, "images");
        assert_eq!(c.link, "https://cdn.savvas.com/images/logo.png");

        let c = classify("realize.savvas.com/img/photo.jpg");
        assert!(c.keywords.is_empty());
    }

    #[test]
    fn test_image_marker_only_checked_in_path() {
        let c = classify("png.savvas.com/api");
        assert_eq!(c.keywords, vec!["savvas"]);
    }

    #[test]
    fn test_keywords_case_sensitive() {
        let c = classify("Rumba.Savvas.com/api");
        assert!(c.keywords.is_empty());
        assert_eq!(c.netloc, "Rumba.Savvas.com");
    }

    #[test]
    fn test_parse_failure_degrades() {
        let c = classify("[broken/path");
        assert_eq!(c.link, "https://[broken/path");
        assert!(c.netloc.is_empty());
        assert!(c.path.is_empty());
        assert!(c.service.is_empty());
    }

    #[test]
    fn test_netloc_keeps_userinfo_and_port() {
        let c = classify("svc:secret@config.savvas.com:8443/v1");
        assert_eq!(c.netloc, "svc:secret@config.savvas.com:8443");
        assert_eq!(c.service, "v1");
    }

    #[test]
    fn test_duplicate_keywords_deduplicated() {
        let classifier = UrlClassifier::new(["rumba", "rumba", "config"], vec![]);
        assert_eq!(classifier.keywords(), &["rumba".to_string(), "config".to_string()]);
    }

    #[test]
    fn test_custom_vocabulary() {
        let classifier = UrlClassifier::new(["internal"], vec!["svg".to_string()]);
        let c = classifier.classify_text("internal.corp/a.svg");
        assert!(c.keywords.is_empty());
        let c = classifier.classify_text("internal.corp/a.png");
        assert_eq!(c.keywords, vec!["internal"]);
    }

    #[test]
    fn test_templated_port_falls_back_to_host() {
        let c = classify("config.savvas.com:$");
        assert_eq!(c.netloc, "config.savvas.com:$");
        assert_eq!(c.path, "");
        assert_eq!(c.service, "config");
        assert_eq!(c.keywords, vec!["savvas", "config"]);
    }

    #[test]
    fn test_out_of_range_port_kept() {
        let c = classify("rumba.savvas.com:99999/x");
        assert_eq!(c.netloc, "rumba.savvas.com:99999");
        assert_eq!(c.path, "/x");
        assert_eq!(c.service, "x");
    }

    #[test]
    fn test_path_markup_kept_verbatim() {
        let c = classify("rumba.savvas.com/api</url>");
        assert_eq!(c.path, "/api</url>");
        assert_eq!(c.service, "api<");
    }

    #[test]
    fn test_dot_segments_not_resolved() {
        let c = classify("realize.savvas.com/a/../b");
        assert_eq!(c.path, "/a/../b");
        assert_eq!(c.service, "a");
    }

    #[test]
    fn test_default_port_kept_in_netloc() {
        let c = classify("rumba.savvas.com:443/api");
        assert_eq!(c.netloc, "rumba.savvas.com:443");
    }

    #[test]
    fn test_decompose_stops_at_query_and_params() {
        assert_eq!(
            decompose("https://a.com/x/y;v=1?q=2"),
            ("a.com".to_string(), "/x/y".to_string())
        );
        assert_eq!(
            decompose("https://a.com?q=/x"),
            ("a.com".to_string(), String::new())
        );
        assert_eq!(
            decompose("https://a.com/p;x/q"),
            ("a.com".to_string(), "/p;x/q".to_string())
        );
    }
}

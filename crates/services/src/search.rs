//! Web search backends used to ground answers about current events.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use shared::search_types::SearchResult;
use shared::settings::SearchSettings;
use std::env;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent("Mozilla/5.0 (compatible; FolioAssistant/1.0)")
        .build()
        .unwrap_or_default()
});

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const DDG_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

/// Build the configured backend. `None` when search is disabled or the
/// chosen backend has no credentials.
pub fn from_settings(settings: &SearchSettings) -> Option<Arc<dyn SearchProvider>> {
    if !settings.enabled {
        return None;
    }
    match settings.provider.as_str() {
        "duckduckgo" | "ddg" => Some(Arc::new(DuckDuckGoSearch::new())),
        "tavily" => {
            let key = settings
                .tavily_api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .or_else(|| env::var("TAVILY_API_KEY").ok())?;
            Some(Arc::new(TavilySearch::new(key)))
        }
        other => {
            tracing::warn!(provider = %other, "unknown search provider, search disabled");
            None
        }
    }
}

// ── Tavily ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

pub struct TavilySearch {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            api_key,
            endpoint: TAVILY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn parse_tavily(body: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let parsed: TavilyResponse = serde_json::from_str(body)?;
    Ok(parsed
        .results
        .into_iter()
        .filter(|h| !h.title.trim().is_empty() || !h.content.trim().is_empty())
        .take(max_results)
        .map(|h| SearchResult {
            title: h.title.trim().to_string(),
            snippet: h.content.trim().to_string(),
            url: h.url,
        })
        .collect())
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let req = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results,
        };
        let resp = self.http.post(&self.endpoint).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("tavily error: {}", status));
        }
        let body = resp.text().await?;
        parse_tavily(&body, max_results)
    }
}

// ── DuckDuckGo ───────────────────────────────────────────────────────

pub struct DuckDuckGoSearch {
    http: Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self {
            http: SHARED_HTTP.clone(),
        }
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = format!("{}?q={}", DDG_ENDPOINT, urlencoding::encode(query));
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("duckduckgo error: {}", status));
        }
        let html = resp.text().await?;
        let mut results = parse_ddg_results(&html);
        results.truncate(max_results);
        Ok(results)
    }
}

/// Pull title, url and snippet out of each `.result` block of the HTML page.
fn parse_ddg_results(html: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = collapse(link.text());
            if title.is_empty() {
                return None;
            }
            let href = link.value().attr("href")?;
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| collapse(s.text()))
                .unwrap_or_default();
            Some(SearchResult {
                title,
                snippet,
                url: resolve_redirect(href),
            })
        })
        .collect()
}

/// Result links go through a redirect carrying the target in `uddg`.
fn resolve_redirect(href: &str) -> String {
    match href.split("uddg=").nth(1) {
        Some(target) => {
            let target = target.split('&').next().unwrap_or(target);
            urlencoding::decode(target)
                .map(|u| u.into_owned())
                .unwrap_or_else(|_| href.to_string())
        }
        None => href.to_string(),
    }
}

fn collapse<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r##"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fsolana.com%2Fnews&amp;rut=abc">Solana &amp; friends</a>
          <a class="result__snippet" href="#">Latest &quot;news&quot; from the network</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://example.org/direct">Direct link</a>
        </div>
    "##;

    #[test]
    fn test_ddg_parsing_decodes_redirects_and_entities() {
        let results = parse_ddg_results(DDG_PAGE);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Solana & friends");
        assert_eq!(results[0].url, "https://solana.com/news");
        assert_eq!(results[0].snippet, "Latest \"news\" from the network");
        assert_eq!(results[1].url, "https://example.org/direct");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_tavily_parsing_caps_results() {
        let body = r#"{"query":"q","results":[
            {"title":"A","content":"first","url":"https://a"},
            {"title":"","content":"","url":"https://empty"},
            {"title":"B","content":"second","url":"https://b"},
            {"title":"C","content":"third","url":"https://c"}
        ]}"#;
        let results = parse_tavily(body, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "B");
        assert_eq!(results[1].snippet, "second");

        assert!(parse_tavily("not json", 3).is_err());
    }

    #[test]
    fn test_factory_respects_settings() {
        let disabled = SearchSettings {
            enabled: false,
            ..Default::default()
        };
        assert!(from_settings(&disabled).is_none());

        let ddg = SearchSettings {
            provider: "duckduckgo".into(),
            ..Default::default()
        };
        assert_eq!(from_settings(&ddg).map(|p| p.name()), Some("duckduckgo"));

        let tavily = SearchSettings {
            tavily_api_key: Some("tvly-test".into()),
            ..Default::default()
        };
        assert_eq!(from_settings(&tavily).map(|p| p.name()), Some("tavily"));
    }
}

//! Network tools, built on a shared `reqwest` client with bounded response
//! sizes and timeouts well below the dispatcher's own budget.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional, optional_usize, required};
use crate::registry::{ToolHandler, ToolRegistry};

const DEFAULT_MAX_BYTES: usize = 50_000;

pub fn register(registry: &ToolRegistry) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("warden-agent/0.3")
        .build()
        .unwrap_or_default();

    registry.register(
        ToolDescriptor::new(
            "fetch_url",
            "Fetch a URL with GET and return the response body as text",
            ToolCategory::Network,
            RiskLevel::Low,
        )
        .param("url", ParamSpec::string("The URL to fetch"))
        .param(
            "max_bytes",
            ParamSpec::integer("Maximum response size in bytes (default: 50000)").optional(),
        ),
        Arc::new(FetchUrl {
            client: client.clone(),
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "web_search",
            "Search the web and return result titles with URLs",
            ToolCategory::Network,
            RiskLevel::Low,
        )
        .param("query", ParamSpec::string("The search query"))
        .param(
            "count",
            ParamSpec::integer("Number of results to return (default: 5)").optional(),
        ),
        Arc::new(WebSearch {
            client: client.clone(),
        }),
    );
    registry.register(
        ToolDescriptor::new(
            "http_request",
            "Issue an HTTP request with a chosen method, optional headers \
             (JSON object), and optional body",
            ToolCategory::Network,
            RiskLevel::Medium,
        )
        .param("url", ParamSpec::string("The URL to request"))
        .param(
            "method",
            ParamSpec::string("HTTP method")
                .one_of(&["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"]),
        )
        .param(
            "headers",
            ParamSpec::string("Request headers as a JSON object").optional(),
        )
        .param("body", ParamSpec::string("Request body").optional()),
        Arc::new(HttpRequest { client }),
    );
}

struct FetchUrl {
    client: reqwest::Client,
}

#[async_trait]
impl ToolHandler for FetchUrl {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let url = required(args, "url", "fetch_url")?;
        let max_bytes = optional_usize(args, "max_bytes", DEFAULT_MAX_BYTES);

        info!(url, "fetching URL");
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(format!("Error: fetching {url}: {e}")),
        };
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let truncated: String = body.chars().take(max_bytes).collect();
        if status.is_success() {
            Ok(truncated)
        } else {
            Ok(format!("Error: HTTP {status}\n{truncated}"))
        }
    }
}

struct WebSearch {
    client: reqwest::Client,
}

#[async_trait]
impl ToolHandler for WebSearch {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let query = required(args, "query", "web_search")?;
        let count = optional_usize(args, "count", 5);

        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencode(query)
        );
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(format!("Error: search failed: {e}")),
        };
        let body = resp.text().await.unwrap_or_default();

        let results = parse_duckduckgo_results(&body, count);
        if results.is_empty() {
            Ok(format!("No results for '{query}'"))
        } else {
            Ok(results.join("\n"))
        }
    }
}

struct HttpRequest {
    client: reqwest::Client,
}

#[async_trait]
impl ToolHandler for HttpRequest {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let url = required(args, "url", "http_request")?;
        let method = optional(args, "method").unwrap_or("GET").to_uppercase();

        let method = match method.parse::<reqwest::Method>() {
            Ok(m) => m,
            Err(_) => return Ok(format!("Error: unsupported method '{method}'")),
        };
        let mut req = self.client.request(method, url);

        if let Some(headers) = optional(args, "headers") {
            match serde_json::from_str::<BTreeMap<String, String>>(headers) {
                Ok(map) => {
                    for (k, v) in map {
                        req = req.header(k, v);
                    }
                }
                Err(e) => return Ok(format!("Error: headers must be a JSON object: {e}")),
            }
        }
        if let Some(body) = optional(args, "body") {
            req = req.body(body.to_string());
        }

        info!(url, "http request");
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return Ok(format!("Error: request to {url} failed: {e}")),
        };
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let truncated: String = body.chars().take(DEFAULT_MAX_BYTES).collect();
        Ok(format!("HTTP {status}\n\n{truncated}"))
    }
}

fn urlencode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// Pull `result__a` anchors out of the DuckDuckGo HTML endpoint. Crude but
/// dependency-free; the endpoint's markup has been stable for years.
fn parse_duckduckgo_results(html: &str, count: usize) -> Vec<String> {
    let mut results = Vec::new();
    let mut rest = html;
    while results.len() < count {
        let Some(anchor) = rest.find("result__a") else {
            break;
        };
        let after = &rest[anchor..];
        let href = after
            .find("href=\"")
            .map(|i| &after[i + 6..])
            .and_then(|s| s.split('"').next())
            .unwrap_or("");
        let title = after
            .find('>')
            .map(|i| &after[i + 1..])
            .and_then(|s| s.split('<').next())
            .unwrap_or("")
            .trim()
            .to_string();
        if !title.is_empty() && !href.is_empty() {
            results.push(format!("{title} — {href}"));
        }
        rest = &after[9..];
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_reserved() {
        assert_eq!(urlencode("rust async book"), "rust+async+book");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn parse_results_extracts_title_and_href() {
        let html = r#"<a class="result__a" href="https://example.com/x">Example Site</a>
                      <a class="result__a" href="https://other.org">Other</a>"#;
        let results = parse_duckduckgo_results(html, 5);
        assert_eq!(results.len(), 2);
        assert!(results[0].contains("Example Site"));
        assert!(results[0].contains("https://example.com/x"));
    }
}

//! "Watch online" links and the small page that plays them.

use anyhow::{Context, Result};
use axum::{extract::Query, response::Html, routing::get, Router};
use serde::Deserialize;
use tracing::info;

// Embedded at compile time, placeholders are filled per request.
const PLAYER_HTML: &str = include_str!("../player/player.html");

/// Builds player URLs from the configured page address.
#[derive(Debug, Clone)]
pub struct PlayerLink {
    base_url: String,
}

impl PlayerLink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, direct_link: &str, title: &str) -> String {
        match reqwest::Url::parse(&self.base_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("url", direct_link)
                    .append_pair("title", title);
                url.to_string()
            }
            // Not a parseable URL, fall back to plain concatenation.
            Err(_) => format!("{}?url={}&title={}", self.base_url, direct_link, title),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayerParams {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render(params: &PlayerParams) -> String {
    let url = if params.url.starts_with("http://") || params.url.starts_with("https://") {
        params.url.as_str()
    } else {
        ""
    };
    let title = if params.title.is_empty() {
        "Player"
    } else {
        params.title.as_str()
    };

    PLAYER_HTML
        .replace("{{URL}}", &escape_html(url))
        .replace("{{TITLE}}", &escape_html(title))
}

async fn player_page(Query(params): Query<PlayerParams>) -> Html<String> {
    Html(render(&params))
}

async fn health() -> &'static str {
    "ok"
}

pub fn router() -> Router {
    Router::new()
        .route("/player.html", get(player_page))
        .route("/health", get(health))
}

/// Serve the player page until the process exits.
pub async fn serve(bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind player server to {bind_address}"))?;

    info!("Player page available at http://{}/player.html", bind_address);

    axum::serve(listener, router())
        .await
        .context("Player server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_encodes_query() {
        let link = PlayerLink::new("http://localhost:8000/player.html");
        assert_eq!(
            link.url_for("https://cdn/x.mp4?a=1&b=2", "My Movie.mp4"),
            "http://localhost:8000/player.html?url=https%3A%2F%2Fcdn%2Fx.mp4%3Fa%3D1%26b%3D2&title=My+Movie.mp4"
        );
    }

    #[test]
    fn test_url_for_unparseable_base() {
        let link = PlayerLink::new("player.html");
        assert_eq!(
            link.url_for("https://cdn/x.mp4", "Movie.mp4"),
            "player.html?url=https://cdn/x.mp4&title=Movie.mp4"
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let html = render(&PlayerParams {
            url: "https://cdn/x.mp4?a=1&b=\"2\"".to_string(),
            title: "<script>alert(1)</script>".to_string(),
        });
        assert!(html.contains("src=\"https://cdn/x.mp4?a=1&amp;b=&quot;2&quot;\""));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_drops_non_http_urls() {
        let html = render(&PlayerParams {
            url: "javascript:alert(1)".to_string(),
            title: String::new(),
        });
        assert!(!html.contains("javascript"));
        assert!(html.contains("<title>Player</title>"));
    }

    #[tokio::test]
    async fn test_player_page_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });

        let page_url = PlayerLink::new(format!("http://{addr}/player.html"))
            .url_for("https://cdn/x.mp4", "Movie.mp4");
        let body = reqwest::get(&page_url).await.unwrap().text().await.unwrap();
        assert!(body.contains("src=\"https://cdn/x.mp4\""));
        assert!(body.contains("<h1>Movie.mp4</h1>"));

        let health = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(health, "ok");
    }
}

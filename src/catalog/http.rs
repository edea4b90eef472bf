use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::catalog::{CatalogError, CatalogProvider, MovieRecord};
use crate::config::CatalogConfig;

/// JSON client for the catalog service.
///
/// Endpoints:
/// - `GET {api_url}/categories/{category}` → `[MovieRecord]`
/// - `GET {api_url}/categories/{category}/random` → `MovieRecord`
/// - `GET {api_url}/search?q={query}` → `[MovieRecord]`
pub struct HttpCatalog {
    client: reqwest::Client,
    api_url: String,
    detail_base_url: String,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            detail_base_url: detail_prefix(&config.detail_base_url),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.api_url, path);

        debug!("Sending request to catalog: {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Unavailable(format!(
                "catalog API error ({}): {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("failed to parse catalog response: {}", e)))
    }
}

/// Detail URLs are built as `prefix + id + ".html"`, so the prefix ends with a slash
fn detail_prefix(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalog {
    async fn fetch_category(&self, category: &str) -> Result<Vec<MovieRecord>, CatalogError> {
        self.get_json(&format!("/categories/{}", category), &[]).await
    }

    async fn fetch_random(&self, category: &str) -> Result<MovieRecord, CatalogError> {
        self.get_json(&format!("/categories/{}/random", category), &[])
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>, CatalogError> {
        self.get_json("/search", &[("q", query)]).await
    }

    fn base_detail_url(&self) -> &str {
        &self.detail_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with a canned response; the task yields the request line
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn config(api_url: &str, detail_base_url: &str) -> CatalogConfig {
        CatalogConfig {
            api_url: api_url.to_string(),
            detail_base_url: detail_base_url.to_string(),
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn test_detail_prefix_gets_trailing_slash() {
        let catalog = HttpCatalog::new(&config("http://c", "https://films.example/film"));
        assert_eq!(catalog.base_detail_url(), "https://films.example/film/");

        let catalog = HttpCatalog::new(&config("http://c", "https://films.example/film/"));
        assert_eq!(catalog.base_detail_url(), "https://films.example/film/");
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let catalog = HttpCatalog::new(&config("http://catalog:9000/", "https://f/"));
        assert_eq!(catalog.api_url, "http://catalog:9000");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let catalog = HttpCatalog::new(&config("http://127.0.0.1:9", "https://f/"));
        let err = catalog.fetch_category("top_netflix").await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_category_parsed_in_order() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"id": 1, "title": "Movie A", "rating": 7.5}, {"id": "2", "title": "Movie B"}]"#,
        )
        .await;
        let catalog = HttpCatalog::new(&config(&url, "https://f/"));

        let movies = catalog.fetch_category("top_netflix").await.unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].id, "1");
        assert_eq!(movies[0].rating.as_deref(), Some("7.5"));
        assert_eq!(movies[1].title, "Movie B");
        assert_eq!(
            server.await.unwrap(),
            "GET /categories/top_netflix HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_not_found_status_maps_to_not_found() {
        let (url, server) = serve_once("404 Not Found", r#"{"error": "no such category"}"#).await;
        let catalog = HttpCatalog::new(&config(&url, "https://f/"));

        let err = catalog.fetch_random("nowhere").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)), "{:?}", err);
        assert_eq!(
            server.await.unwrap(),
            "GET /categories/nowhere/random HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_server_error_maps_to_unavailable() {
        let (url, _server) = serve_once("500 Internal Server Error", "boom").await;
        let catalog = HttpCatalog::new(&config(&url, "https://f/"));

        match catalog.fetch_category("premieres").await.unwrap_err() {
            CatalogError::Unavailable(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_maps_to_unavailable() {
        let (url, _server) = serve_once("200 OK", "<html>not json</html>").await;
        let catalog = HttpCatalog::new(&config(&url, "https://f/"));

        let err = catalog.fetch_category("top_hbo").await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_search_query_is_encoded() {
        let (url, server) = serve_once("200 OK", "[]").await;
        let catalog = HttpCatalog::new(&config(&url, "https://f/"));

        let movies = catalog.search("the matrix & co").await.unwrap();
        assert!(movies.is_empty());
        assert_eq!(
            server.await.unwrap(),
            "GET /search?q=the+matrix+%26+co HTTP/1.1"
        );
    }
}

use anyhow::{anyhow, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::classifier::LabelClassifier;
use crate::environment::AppConfig;
use crate::labels::all_labels;
use crate::rss::{parse_feeds, Article, FeedSettings};
use crate::TARGET_WEB_REQUEST;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<LabelClassifier>,
    pub feed_urls: Arc<Vec<String>>,
    pub feed_settings: FeedSettings,
}

impl AppState {
    pub fn new(config: &AppConfig, classifier: Arc<LabelClassifier>) -> Self {
        Self {
            classifier,
            feed_urls: Arc::new(config.feed_urls.clone()),
            feed_settings: config.feed_settings.clone(),
        }
    }
}

#[derive(Serialize)]
struct NewsResponse {
    success: bool,
    articles: Vec<Article>,
    total: usize,
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: &'static [&'static str],
}

/// Failure at the route boundary, reported as a 500 JSON body.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(target: TARGET_WEB_REQUEST, "Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/news", get(get_news))
        .route("/api/categories", get(get_categories))
        .with_state(state)
}

/// Bind the configured address and serve the API until Ctrl-C.
pub async fn app_api_loop(config: &AppConfig, classifier: Arc<LabelClassifier>) -> Result<()> {
    let app = router(AppState::new(config, classifier));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_err() {
                error!("Failed to listen for ctrl-c");
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Fetch every configured feed and label its articles.
async fn get_news(State(state): State<AppState>) -> Result<Json<NewsResponse>, ApiError> {
    let articles = parse_feeds(&state.feed_urls, &state.feed_settings).await;
    info!(target: TARGET_WEB_REQUEST, "Classifying {} articles", articles.len());

    // Inference is CPU bound; keep it off the async workers.
    let classifier = Arc::clone(&state.classifier);
    let articles = tokio::task::spawn_blocking(move || label_articles(&classifier, articles))
        .await
        .map_err(|e| anyhow!("classification task failed: {}", e))?;

    Ok(Json(NewsResponse {
        success: true,
        total: articles.len(),
        articles,
    }))
}

async fn get_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: all_labels(),
    })
}

/// Attach predicted labels to each article, one at a time.
pub fn label_articles(classifier: &LabelClassifier, mut articles: Vec<Article>) -> Vec<Article> {
    let mut failures = 0;
    for article in &mut articles {
        let outcome = classifier.classify(&article.title, &article.description, classifier.threshold());
        if outcome.is_failed() {
            failures += 1;
        }
        article.predicted_labels = outcome.into_labels();
    }
    if failures > 0 {
        warn!(target: TARGET_WEB_REQUEST, "{} of {} articles could not be classified", failures, articles.len());
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::service::tests::{logits_for, BrokenScorer, FixedScorer};
    use crate::rss::test_support::{mount_feed, rss_with_items, UNREACHABLE_FEED};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::MockServer;

    fn state_with(classifier: LabelClassifier, feed_urls: Vec<String>) -> AppState {
        AppState {
            classifier: Arc::new(classifier),
            feed_urls: Arc::new(feed_urls),
            feed_settings: FeedSettings::default(),
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_categories_are_stable() {
        let app = router(state_with(
            LabelClassifier::from_scorer(Arc::new(FixedScorer(logits_for(&[0])))),
            Vec::new(),
        ));

        let (status, first) = get(app.clone(), "/api/categories").await;
        let (_, second) = get(app, "/api/categories").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);

        let json: Value = serde_json::from_slice(&first).unwrap();
        let categories: Vec<&str> = json["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_str().unwrap())
            .collect();
        assert_eq!(categories, all_labels());
    }

    #[tokio::test]
    async fn test_news_caps_feeds_and_survives_failures() {
        let server = MockServer::start().await;
        mount_feed(&server, "/a.xml", rss_with_items("Feed A", 15)).await;

        let app = router(state_with(
            LabelClassifier::from_scorer(Arc::new(FixedScorer(logits_for(&[3, 7])))),
            vec![format!("{}/a.xml", server.uri()), UNREACHABLE_FEED.to_string()],
        ));

        let (status, body) = get(app, "/api/news").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 10);

        let articles = json["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 10);
        for article in articles {
            assert_eq!(article["source"], "Feed A");
            assert_eq!(
                article["predicted_labels"],
                json!(["Economics & Finance", "Technology & Science"])
            );
            for field in ["title", "description", "link", "published"] {
                assert!(article[field].is_string(), "missing {}", field);
            }
        }
    }

    #[tokio::test]
    async fn test_news_with_failing_classifier_returns_empty_labels() {
        let server = MockServer::start().await;
        mount_feed(&server, "/a.xml", rss_with_items("Feed A", 2)).await;

        let app = router(state_with(
            LabelClassifier::from_scorer(Arc::new(BrokenScorer)),
            vec![format!("{}/a.xml", server.uri())],
        ));

        let (status, body) = get(app, "/api/news").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 2);
        assert_eq!(json["articles"][0]["predicted_labels"], json!([]));
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let app = router(state_with(
            LabelClassifier::from_scorer(Arc::new(FixedScorer(logits_for(&[0])))),
            Vec::new(),
        ));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_api_error_is_json_500() {
        let response = ApiError(anyhow!("feeds exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"success": false, "error": "feeds exploded"}));
    }

    #[test]
    fn test_label_articles_attaches_labels() {
        let classifier = LabelClassifier::from_scorer(Arc::new(FixedScorer(logits_for(&[9]))));
        let article = Article {
            title: "Floods".to_string(),
            description: "River bursts banks".to_string(),
            link: "#".to_string(),
            published: "2024-01-01 00:00".to_string(),
            source: "Test".to_string(),
            predicted_labels: Vec::new(),
        };

        let labelled = label_articles(&classifier, vec![article]);
        assert_eq!(labelled[0].predicted_labels, vec!["Environment"]);
    }
}

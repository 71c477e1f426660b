use std::{env, sync::Arc};

pub mod core;
pub mod error_handler;
mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    routes::{
        chat::get_response_route::get_response_route,
        health::health_check_route::health_check_route,
        persona::get_user_route::get_user_route,
    },
};

/// Builds the chat context from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").map_err(|_| AppError::MissingEnv("API_ADDRESS"))?;

    let state = Arc::new(AppState::from_env()?);
    let app = router(state);

    // Bind to address
    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "persona chat API listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/get_response", post(get_response_route))
        .route("/get_user", get(get_user_route))
        .route("/health_check", get(health_check_route))
        .with_state(state)
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        // Without a handler the server keeps running until killed.
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    use ai_llm_service::HealthStatus;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use contextor::{
        ChatContext, DocumentStore, GenerationError, GenerationRequest, MessageRecord, Persona,
        PersonaPrompt, ResponseGenerator, WindowConfig, generator::GenerationFuture,
        generator::HealthFuture,
    };
    use rag_store::{RagError, RetrievalHit, RetrieverFuture, VectorRetriever};
    use serde_json::Value;
    use tower::ServiceExt;

    struct FakeRetriever {
        fail: bool,
    }

    impl VectorRetriever for FakeRetriever {
        fn retrieve<'a>(&'a self, _q: &'a str) -> RetrieverFuture<'a, Vec<RetrievalHit>> {
            Box::pin(async move {
                if self.fail {
                    return Err(RagError::Qdrant("connection refused".into()));
                }
                Ok(vec![RetrievalHit {
                    sequence_index: 2,
                    score: 0.9,
                    text: "t2".into(),
                }])
            })
        }

        fn health(&self) -> RetrieverFuture<'_, ()> {
            Box::pin(async move {
                if self.fail {
                    Err(RagError::Qdrant("connection refused".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    struct FakeGenerator {
        fail: bool,
    }

    impl ResponseGenerator for FakeGenerator {
        fn generate<'a>(&'a self, req: &'a GenerationRequest) -> GenerationFuture<'a> {
            Box::pin(async move {
                if self.fail {
                    Err(GenerationError::Backend("rate limited".into()))
                } else {
                    Ok(format!("answer to {}", req.question))
                }
            })
        }

        fn health(&self) -> HealthFuture<'_> {
            Box::pin(async {
                vec![HealthStatus {
                    provider: "Ollama".into(),
                    endpoint: "http://localhost:11434".into(),
                    model: Some("llama3".into()),
                    ok: true,
                    latency_ms: 3,
                    message: "ok".into(),
                }]
            })
        }
    }

    fn app(retriever_fails: bool, generator_fails: bool) -> Router {
        let records = ["A", "B", "A", "B", "A"]
            .iter()
            .enumerate()
            .map(|(i, s)| MessageRecord {
                sequence_index: i as u64,
                speaker: (*s).to_string(),
                text: format!("t{i}"),
            })
            .collect();
        let store = DocumentStore::from_records(records).unwrap();

        let chat = ChatContext::new(
            Arc::new(store),
            Arc::new(FakeRetriever {
                fail: retriever_fails,
            }),
            Arc::new(FakeGenerator {
                fail: generator_fails,
            }),
            Persona {
                bot_name: "B".into(),
                primary: "A".into(),
            },
            PersonaPrompt::default(),
            WindowConfig::default(),
        );

        router(Arc::new(AppState {
            chat,
            corpus_id: "wc_user".into(),
        }))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_response_returns_blocks_and_reply() {
        let resp = app(false, false)
            .oneshot(post_json("/get_response", r#"{"question":"hi?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json_body(resp).await;
        assert_eq!(v["retrieved_docs"], serde_json::json!(["t1\nt3"]));
        assert_eq!(v["response"], "answer to hi?");
    }

    #[tokio::test]
    async fn generation_failure_is_still_200() {
        let resp = app(false, true)
            .oneshot(post_json("/get_response", r#"{"question":"hi?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json_body(resp).await;
        assert_eq!(v["retrieved_docs"], serde_json::json!(["t1\nt3"]));
        assert!(
            v["response"]
                .as_str()
                .unwrap()
                .starts_with("Exception occurred: ")
        );
    }

    #[tokio::test]
    async fn retrieval_failure_is_500_with_detail() {
        let resp = app(true, false)
            .oneshot(post_json("/get_response", r#"{"question":"hi?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let v = json_body(resp).await;
        assert_eq!(v["error"], "CHAT_FAILED");
        assert!(v["detail"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn blank_or_malformed_questions_are_400() {
        for body in [r#"{"question":"   "}"#, r#"{"q":1}"#, "not json"] {
            let resp = app(false, false)
                .oneshot(post_json("/get_response", body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json_body(resp).await["error"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn get_user_reports_persona_and_corpus() {
        let resp = app(false, false).oneshot(get("/get_user")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json_body(resp).await;
        assert_eq!(v["user"], "B");
        assert_eq!(v["user_file"], "wc_user");
    }

    #[tokio::test]
    async fn shallow_health_does_not_probe() {
        let resp = app(true, false)
            .oneshot(get("/health_check"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "healthy");
    }

    #[tokio::test]
    async fn deep_health_reports_failing_probe_as_503() {
        let resp = app(false, false)
            .oneshot(get("/health_check?deep=true"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["generator"]["probes"][0]["model"], "llama3");

        let resp = app(true, false)
            .oneshot(get("/health_check?deep=true"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let v = json_body(resp).await;
        assert_eq!(v["status"], "unhealthy");
        assert_eq!(v["retriever"]["ok"], false);
        assert_eq!(v["generator"]["ok"], true);
    }
}

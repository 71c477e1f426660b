//! One question → retrieve → expand → prompt → generate cycle.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::context::ChatContext;
use crate::error::ChatError;
use crate::generator::GenerationRequest;
use crate::window::expand_hits;

/// Prefix of the reply text when generation fails.
pub const GENERATION_FAILURE_PREFIX: &str = "Exception occurred: ";

/// Result of one chat cycle. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub retrieved_context: Vec<String>,
    pub response: String,
}

pub struct ChatSession;

impl ChatSession {
    /// Answers `question` in the persona's voice.
    ///
    /// Retrieval and formatting failures abort the cycle. A generation failure
    /// does not: the reply becomes `"Exception occurred: <error>"` and the
    /// retrieved context is still returned.
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn respond(ctx: &ChatContext, question: &str) -> Result<ChatTurn, ChatError> {
        let started = Instant::now();

        let hits = ctx.retriever.retrieve(question).await?;
        let context = expand_hits(&hits, &ctx.store, &ctx.window, &ctx.persona.primary)?;

        let req = GenerationRequest {
            prompt: ctx.prompt.render(&ctx.persona, question, &context),
            context,
            question: question.to_string(),
        };

        let response = match ctx.generator.generate(&req).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generation failed; returning failure text");
                format!("{GENERATION_FAILURE_PREFIX}{e}")
            }
        };

        info!(
            hits = hits.len(),
            blocks = req.context.len(),
            latency_ms = started.elapsed().as_millis(),
            "chat turn completed"
        );

        Ok(ChatTurn {
            question: req.question,
            retrieved_context: req.context,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use rag_store::{RagError, RetrievalHit, RetrieverFuture, VectorRetriever};

    use crate::corpus::{DocumentStore, MessageRecord};
    use crate::error::{FormatError, GenerationError};
    use crate::generator::{GenerationFuture, ResponseGenerator};
    use crate::persona::Persona;
    use crate::prompt::PersonaPrompt;
    use crate::window::WindowConfig;

    struct FakeRetriever {
        hits: Vec<u64>,
        fail: bool,
    }

    impl VectorRetriever for FakeRetriever {
        fn retrieve<'a>(&'a self, _q: &'a str) -> RetrieverFuture<'a, Vec<RetrievalHit>> {
            Box::pin(async move {
                if self.fail {
                    return Err(RagError::Qdrant("connection refused".into()));
                }
                Ok(self
                    .hits
                    .iter()
                    .map(|&i| RetrievalHit {
                        sequence_index: i,
                        score: 0.5,
                        text: String::new(),
                    })
                    .collect())
            })
        }
    }

    /// Echoes the number of context blocks, or fails; records the last request.
    struct FakeGenerator {
        fail: bool,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl ResponseGenerator for FakeGenerator {
        fn generate<'a>(&'a self, req: &'a GenerationRequest) -> GenerationFuture<'a> {
            Box::pin(async move {
                if let Ok(mut seen) = self.seen.lock() {
                    *seen = Some(req.clone());
                }
                if self.fail {
                    Err(GenerationError::Backend("rate limited".into()))
                } else {
                    Ok(format!("{} blocks", req.context.len()))
                }
            })
        }
    }

    fn ctx(
        speakers: &[&str],
        retriever: FakeRetriever,
        generator: Arc<FakeGenerator>,
    ) -> ChatContext {
        let records = speakers
            .iter()
            .enumerate()
            .map(|(i, s)| MessageRecord {
                sequence_index: i as u64,
                speaker: (*s).to_string(),
                text: format!("t{i}"),
            })
            .collect();
        ChatContext::new(
            Arc::new(DocumentStore::from_records(records).unwrap()),
            Arc::new(retriever),
            generator,
            Persona {
                bot_name: "B".into(),
                primary: "A".into(),
            },
            PersonaPrompt::default(),
            WindowConfig {
                radius: 1,
                span_multiplier: 1,
            },
        )
    }

    fn generator(fail: bool) -> Arc<FakeGenerator> {
        Arc::new(FakeGenerator {
            fail,
            seen: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn happy_path_returns_blocks_and_reply() {
        let generator = generator(false);
        let c = ctx(
            &["A", "B", "A", "B", "A"],
            FakeRetriever {
                hits: vec![2, 0],
                fail: false,
            },
            generator.clone(),
        );
        let turn = ChatSession::respond(&c, "hi?").await.unwrap();
        assert_eq!(turn.question, "hi?");
        assert_eq!(turn.retrieved_context, vec!["t1\nt3".to_string(), "t1".to_string()]);
        assert_eq!(turn.response, "2 blocks");

        let seen = generator.seen.lock().unwrap().clone().unwrap();
        assert!(seen.prompt.contains("A: hi?"));
        assert!(seen.prompt.contains(r#"["t1\nt3","t1"]"#));
        assert_eq!(seen.context, turn.retrieved_context);
    }

    #[tokio::test]
    async fn generation_failure_is_downgraded() {
        let c = ctx(
            &["A", "B", "A"],
            FakeRetriever {
                hits: vec![1],
                fail: false,
            },
            generator(true),
        );
        let turn = ChatSession::respond(&c, "hello").await.unwrap();
        assert_eq!(turn.response, "Exception occurred: rate limited");
        assert!(turn.response.starts_with(GENERATION_FAILURE_PREFIX));
        assert_eq!(turn.retrieved_context, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn retrieval_failure_propagates() {
        let c = ctx(
            &["A", "B"],
            FakeRetriever {
                hits: vec![],
                fail: true,
            },
            generator(false),
        );
        let err = ChatSession::respond(&c, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Retrieval(_)));
    }

    #[tokio::test]
    async fn empty_store_propagates_format_error() {
        let mut c = ctx(
            &["A"],
            FakeRetriever {
                hits: vec![0],
                fail: false,
            },
            generator(false),
        );
        c.store = Arc::new(DocumentStore::default());
        let err = ChatSession::respond(&c, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Format(FormatError::EmptyStore)));
    }

    #[tokio::test]
    async fn no_hits_still_calls_generator() {
        let generator = generator(false);
        let c = ctx(
            &["A", "B"],
            FakeRetriever {
                hits: vec![],
                fail: false,
            },
            generator.clone(),
        );
        let turn = ChatSession::respond(&c, "anyone?").await.unwrap();
        assert!(turn.retrieved_context.is_empty());
        assert_eq!(turn.response, "0 blocks");
        assert!(generator.seen.lock().unwrap().is_some());
    }
}

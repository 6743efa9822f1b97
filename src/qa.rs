use async_trait::async_trait;

use crate::error::PipelineError;
use crate::format::CorpusPair;

/// Maximum accepted query length, matching the chat front end's cap.
pub const MAX_QUERY_LEN: usize = 200;

/// Contract the pipeline needs from the QA engine: ingest a corpus, answer a
/// query against it. The engine itself (embeddings, vector store, LLM) is an
/// external collaborator.
#[async_trait]
pub trait QaEngine {
    type Handle: Send + Sync;

    async fn ingest(&self, corpus: &str) -> anyhow::Result<Self::Handle>;
    async fn answer(&self, handle: &Self::Handle, query: &str) -> anyhow::Result<String>;
}

/// Index handles for the two corpora, kept separate so business facts and
/// review opinions can be queried independently.
pub struct CorpusHandles<H> {
    pub business_info: H,
    pub reviews: H,
}

/// Hand both corpora to the engine for indexing.
pub async fn ingest_corpora<E>(
    engine: &E,
    corpus: &CorpusPair,
) -> anyhow::Result<CorpusHandles<E::Handle>>
where
    E: QaEngine + Sync,
{
    Ok(CorpusHandles {
        business_info: engine.ingest(&corpus.business_info).await?,
        reviews: engine.ingest(&corpus.reviews).await?,
    })
}

/// Length-guard a user query before it reaches the engine.
pub fn validate_query(query: &str) -> Result<(), PipelineError> {
    let len = query.chars().count();
    if len > MAX_QUERY_LEN {
        return Err(PipelineError::QueryTooLong(len));
    }
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingEngine {
        ingested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QaEngine for RecordingEngine {
        type Handle = usize;

        async fn ingest(&self, corpus: &str) -> anyhow::Result<usize> {
            let mut seen = self.ingested.lock().unwrap();
            seen.push(corpus.to_string());
            Ok(seen.len() - 1)
        }

        async fn answer(&self, handle: &usize, _query: &str) -> anyhow::Result<String> {
            Ok(format!("answer from corpus {handle}"))
        }
    }

    #[tokio::test]
    async fn ingests_both_corpora_separately() {
        let engine = RecordingEngine {
            ingested: Mutex::new(Vec::new()),
        };
        let corpus = CorpusPair {
            business_info: "facts".into(),
            reviews: "opinions".into(),
        };

        let handles = ingest_corpora(&engine, &corpus).await.unwrap();
        assert_eq!(handles.business_info, 0);
        assert_eq!(handles.reviews, 1);
        assert_eq!(
            *engine.ingested.lock().unwrap(),
            vec!["facts".to_string(), "opinions".to_string()]
        );

        let reply = engine.answer(&handles.reviews, "any good?").await.unwrap();
        assert_eq!(reply, "answer from corpus 1");
    }

    #[test]
    fn query_length_guard() {
        assert!(validate_query(&"q".repeat(MAX_QUERY_LEN)).is_ok());
        assert!(matches!(
            validate_query(&"q".repeat(MAX_QUERY_LEN + 1)),
            Err(PipelineError::QueryTooLong(201))
        ));
    }
}

//! Answer packaging: canned answers, generator failures, citations, sessions.

mod common;

use std::sync::Arc;

use analyst_rag::{
    AnalystConfig, AnalystSession, AnswerOutcome, DocumentUpload, EntityVocabulary,
    FinancialAnalyst, HashingEmbeddingProvider, InMemoryIndex, NO_RELEVANT_INFORMATION, RagError,
};
use common::{FakeGenerator, ScriptedIndex, UnbuiltIndex, chunk};

fn analyst(
    index: Arc<dyn analyst_rag::EmbeddingIndex>,
    generator: Arc<FakeGenerator>,
) -> FinancialAnalyst {
    FinancialAnalyst::builder().index(index).generator(generator).build().unwrap()
}

#[tokio::test]
async fn empty_retrieval_returns_canned_answer_without_generation() {
    let generator = Arc::new(FakeGenerator::replying("unused"));
    let analyst = analyst(Arc::new(ScriptedIndex::new()), generator.clone());

    let answer = analyst.analyze("anything?", None).await.unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::NoRelevantInformation);
    assert_eq!(answer.answer, NO_RELEVANT_INFORMATION);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn balanced_retrieval_with_no_matching_company_is_also_empty() {
    let generator = Arc::new(FakeGenerator::replying("unused"));
    let index = ScriptedIndex::new().default_results(vec![chunk("text", "Orbit", 0)]);
    let analyst = analyst(Arc::new(index), generator.clone());

    let names = vec!["Acme".to_string(), "Zenith".to_string()];
    let answer = analyst.analyze("compare", Some(&names)).await.unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::NoRelevantInformation);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn uninitialized_index_propagates_and_skips_generation() {
    let generator = Arc::new(FakeGenerator::replying("unused"));
    let analyst = analyst(Arc::new(UnbuiltIndex), generator.clone());

    let err = analyst.analyze("q", None).await.unwrap_err();
    assert!(matches!(err, RagError::NotInitialized));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn generator_failure_becomes_answer_text() {
    let generator = Arc::new(FakeGenerator::failing("provider timed out"));
    let index = ScriptedIndex::new().default_results(vec![chunk("Revenue rose.", "Acme", 0)]);
    let analyst = analyst(Arc::new(index), generator.clone());

    let answer = analyst.analyze("How did Acme do?", None).await.unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::GeneratorFailed);
    assert_eq!(answer.answer, "Error: Generator error (fake): provider timed out");
    assert!(answer.sources.is_empty());
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn generated_answer_carries_prompt_context_and_capped_citations() {
    let question = "compare Tesla vs Nvidia vs Apple growth";
    let mut index = ScriptedIndex::new();
    let variants = [question, "Tesla growth", "Nvidia growth", "Apple growth"];
    for (v, query) in variants.into_iter().enumerate() {
        let padding = "x".repeat(400);
        index = index.script(
            query,
            (0..5)
                .map(|i| chunk(&format!("variant {v} text {i} {padding}"), "Tesla", i))
                .collect(),
        );
    }
    let generator = Arc::new(FakeGenerator::replying("Tesla grew faster."));
    let analyst = analyst(Arc::new(index), generator.clone());

    let answer = analyst.analyze(question, None).await.unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::Generated);
    assert_eq!(answer.answer, "Tesla grew faster.");
    assert_eq!(answer.sources.len(), 10);
    assert!(answer.sources[0].content.starts_with("variant 0 text 0"));
    assert_eq!(answer.sources[0].content.chars().count(), 303);

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("[Document 1 - Tesla - 10-K]:\nvariant 0 text 0"));
    assert!(prompt.contains("[Document 15 - Tesla - 10-K]"));
    assert!(!prompt.contains("[Document 16"));
    assert!(prompt.contains(&format!("QUESTION: {question}")));
}

#[tokio::test]
async fn session_flow_with_in_memory_index() {
    let config = AnalystConfig::builder().queries_per_window(2).build().unwrap();
    let mut session = AnalystSession::new(config.clone(), EntityVocabulary::default());
    session
        .ingest(
            DocumentUpload::new("10-K ACME.pdf", "Acme revenue grew to 4 billion dollars.")
                .with_company("Acme"),
        )
        .unwrap();
    session
        .ingest(DocumentUpload::new("zenith_2024.pdf", "Zenith revenue declined on weak demand."))
        .unwrap();

    let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbeddingProvider::new(256).unwrap())));
    assert_eq!(session.rebuild_index(&index).await.unwrap(), 2);

    let generator = Arc::new(FakeGenerator::replying("Acme up, Zenith down."));
    let analyst = FinancialAnalyst::builder()
        .config(config)
        .index(index.clone())
        .generator(generator.clone())
        .build()
        .unwrap();

    let answer = session.compare(&analyst, "Acme", "Zenith", "Revenue").await.unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::Generated);
    let companies: Vec<&str> =
        answer.sources.iter().map(|s| s.metadata.company.as_str()).collect();
    assert_eq!(companies, ["Acme", "Zenith"]);
    assert!(
        generator
            .last_prompt()
            .unwrap()
            .contains("Compare Acme and Zenith in terms of Revenue. Be specific.")
    );

    session.ask(&analyst, "What about Acme?", None).await.unwrap();
    let err = session.ask(&analyst, "One more?", None).await.unwrap_err();
    assert!(matches!(err, RagError::RateLimited { limit: 2, .. }));

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.queries_asked(), 2);
    let report = session.render_report(chrono::Utc::now());
    assert!(report.contains("Total Questions: 2"));
    assert!(report.contains("A: Acme up, Zenith down."));

    // Reset unbuilds the shared index.
    session.reset(&index).await;
    let err = session.ask(&analyst, "What about Acme?", None).await.unwrap_err();
    assert!(matches!(err, RagError::NotInitialized));
    assert!(session.history().is_empty());
}

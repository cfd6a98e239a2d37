use std::collections::HashMap;
use std::sync::Arc;

use pagerag_core::{CharWindowChunker, Embedder, EvalItem, EvalSample, EvalScore, Generator, PageText};
use pagerag_embed::FakeEmbedder;
use pagerag_eval::report::{METRICS_REPORT, RETRIEVAL_REPORT, SAMPLES_FILE};
use pagerag_eval::{
    recall_at_k, run_all, semantic_match, write_reports, EndToEndEvaluator, EndToEndStatus, MetricsReport, MetricsScorer,
    RetrievalEvaluator, SampleMetrics, DEFAULT_SIMILARITY_THRESHOLD,
};
use pagerag_rag::{Ingestor, RagPipeline};
use pagerag_vector::MemoryIndex;

/// Fixed vectors per text; unknown texts map to the zero vector.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    fn new(entries: &[(&str, [f32; 2])]) -> Self {
        Self { table: entries.iter().map(|(k, v)| (k.to_string(), v.to_vec())).collect() }
    }
}

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0])).collect())
    }
}

struct PanickingEmbedder;

impl Embedder for PanickingEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { panic!("embedder must not be called") }
}

struct EchoGenerator;

impl Generator for EchoGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> { Ok("Paris".to_string()) }
}

struct FixedScorer;

impl MetricsScorer for FixedScorer {
    fn score(&self, samples: &[EvalSample]) -> anyhow::Result<MetricsReport> {
        Ok(MetricsReport {
            rows: samples
                .iter()
                .map(|s| SampleMetrics { question: s.question.clone(), faithfulness: Some(1.0), ..SampleMetrics::default() })
                .collect(),
        })
    }
}

struct BrokenScorer;

impl MetricsScorer for BrokenScorer {
    fn score(&self, _samples: &[EvalSample]) -> anyhow::Result<MetricsReport> { Err(anyhow::anyhow!("scorer offline")) }
}

fn strings(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

#[test]
fn empty_chunks_score_zero_without_embedding() {
    assert_eq!(semantic_match(&PanickingEmbedder, &[], "Paris", DEFAULT_SIMILARITY_THRESHOLD).unwrap(), 0);
}

#[test]
fn expected_text_among_chunks_scores_one() {
    let embedder = FakeEmbedder::new(384);
    let chunks = strings(&["Bananas are yellow.", "Paris"]);
    assert_eq!(semantic_match(&embedder, &chunks, "Paris", DEFAULT_SIMILARITY_THRESHOLD).unwrap(), 1);
}

#[test]
fn threshold_decides_the_match() {
    let embedder = TableEmbedder::new(&[("near", [0.5, 0.866_025_4]), ("far", [0.4, 0.916_515_1]), ("answer", [1.0, 0.0]), ("ortho", [0.0, 1.0])]);
    assert_eq!(semantic_match(&embedder, &strings(&["near"]), "answer", 0.45).unwrap(), 1);
    assert_eq!(semantic_match(&embedder, &strings(&["far"]), "answer", 0.45).unwrap(), 0);
    assert_eq!(semantic_match(&embedder, &strings(&["ortho"]), "answer", 0.45).unwrap(), 0);
    // best of several chunks counts
    assert_eq!(semantic_match(&embedder, &strings(&["ortho", "far", "near"]), "answer", 0.45).unwrap(), 1);
}

#[test]
fn recall_is_mean_of_scores() {
    let scores = vec![
        EvalScore { question: "a".to_string(), score: 1 },
        EvalScore { question: "b".to_string(), score: 0 },
        EvalScore { question: "c".to_string(), score: 1 },
        EvalScore { question: "d".to_string(), score: 1 },
    ];
    assert!((recall_at_k(&scores) - 0.75).abs() < 1e-9);
    assert_eq!(recall_at_k(&[]), 0.0);
}

fn indexed_corpus() -> (Arc<dyn Embedder>, MemoryIndex) {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(384));
    let index = MemoryIndex::new();
    let pages = vec![
        PageText::new(1, "The capital of France is Paris", "geo.pdf"),
        PageText::new(2, "Bananas are yellow and grow in bunches", "geo.pdf"),
    ];
    let chunker = Box::new(CharWindowChunker::new(1000, 100).unwrap());
    Ingestor::new(chunker, embedder.clone(), &index, 16).ingest(&pages).unwrap();
    (embedder, index)
}

fn items() -> Vec<EvalItem> {
    vec![
        EvalItem { question: "What is the capital of France?".to_string(), expected: "The capital of France is Paris".to_string() },
        EvalItem { question: "Who wrote Hamlet?".to_string(), expected: "William Shakespeare".to_string() },
    ]
}

#[test]
fn retrieval_evaluator_scores_each_question() {
    let (embedder, index) = indexed_corpus();
    let evaluator = RetrievalEvaluator::new(embedder.as_ref(), &index).with_k(1);
    let scores = evaluator.run(&items()).unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].score, 1);
    assert_eq!(scores[1].score, 0);
}

#[test]
fn retrieval_evaluator_rejects_zero_k() {
    let (embedder, index) = indexed_corpus();
    let err = RetrievalEvaluator::new(embedder.as_ref(), &index).with_k(0).run(&items()).unwrap_err();
    assert!(matches!(err.downcast_ref::<pagerag_core::Error>(), Some(pagerag_core::Error::InvalidConfig(_))));
}

#[test]
fn end_to_end_collects_samples_with_ground_truth() {
    let (embedder, index) = indexed_corpus();
    let pipeline = RagPipeline::new(embedder, &index, EchoGenerator);
    let samples = EndToEndEvaluator::new(&pipeline).collect(&items()).unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].answer, "Paris");
    assert_eq!(samples[0].ground_truth, "The capital of France is Paris");
    assert_eq!(samples[0].contexts.len(), 2);
}

#[test]
fn scorer_failure_keeps_retrieval_results() {
    let (embedder, index) = indexed_corpus();
    let pipeline = RagPipeline::new(embedder.clone(), &index, EchoGenerator);
    let retrieval = RetrievalEvaluator::new(embedder.as_ref(), &index);
    let e2e = EndToEndEvaluator::new(&pipeline);
    let scorer: &dyn MetricsScorer = &BrokenScorer;

    let run = run_all(&retrieval, Some(&e2e), Some(scorer), &items()).unwrap();
    assert_eq!(run.retrieval.len(), 2);
    assert!(matches!(&run.end_to_end, EndToEndStatus::Failed(msg) if msg.contains("scorer offline")));

    let dir = tempfile::tempdir().unwrap();
    let written = write_reports(&run, dir.path()).unwrap();
    assert_eq!(written, vec![dir.path().join(RETRIEVAL_REPORT)]);
    let report = std::fs::read_to_string(dir.path().join(RETRIEVAL_REPORT)).unwrap();
    assert!(report.contains("### Q: What is the capital of France?"));
    assert!(report.contains("Recall@5: 1"));
    assert!(report.contains("End-to-end evaluation failed"));
}

#[test]
fn scored_run_writes_metrics_table() {
    let (embedder, index) = indexed_corpus();
    let pipeline = RagPipeline::new(embedder.clone(), &index, EchoGenerator);
    let retrieval = RetrievalEvaluator::new(embedder.as_ref(), &index);
    let e2e = EndToEndEvaluator::new(&pipeline);
    let scorer: &dyn MetricsScorer = &FixedScorer;

    let run = run_all(&retrieval, Some(&e2e), Some(scorer), &items()).unwrap();
    assert!(matches!(run.end_to_end, EndToEndStatus::Scored { .. }));

    let dir = tempfile::tempdir().unwrap();
    write_reports(&run, dir.path()).unwrap();
    let table = std::fs::read_to_string(dir.path().join(METRICS_REPORT)).unwrap();
    assert!(table.contains("| question | context_precision | context_recall | faithfulness | answer_relevancy |"));
    assert!(table.contains("| **mean** | - | - | 1.0000 | - |"));
}

#[test]
fn unscored_run_saves_samples_for_later() {
    let (embedder, index) = indexed_corpus();
    let pipeline = RagPipeline::new(embedder.clone(), &index, EchoGenerator);
    let retrieval = RetrievalEvaluator::new(embedder.as_ref(), &index);
    let e2e = EndToEndEvaluator::new(&pipeline);

    let run = run_all(&retrieval, Some(&e2e), None, &items()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    write_reports(&run, dir.path()).unwrap();
    let raw = std::fs::read_to_string(dir.path().join(SAMPLES_FILE)).unwrap();
    let samples: Vec<EvalSample> = serde_json::from_str(&raw).unwrap();
    assert_eq!(samples.len(), 2);
}

#[test]
fn skipped_end_to_end_only_writes_retrieval_report() {
    let (embedder, index) = indexed_corpus();
    let retrieval = RetrievalEvaluator::new(embedder.as_ref(), &index);
    let run = run_all::<&MemoryIndex, EchoGenerator>(&retrieval, None, None, &items()).unwrap();
    assert_eq!(run.end_to_end, EndToEndStatus::Skipped);
}

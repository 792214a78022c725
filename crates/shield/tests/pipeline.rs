use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use perplexity::{BigramModel, ByteEncoder, LanguageModel, ModelError, PerplexityScorer};
use shield::{AnalysisError, AnalysisRequest, Detector, Language, Thresholds, Verdict};
use translate::{TranslateError, Translator};

const SAMPLE: &str = "Large language models generate fluent text. Fluent text is easy to read, \
and easy text is what large language models generate.";

fn scorer() -> PerplexityScorer {
    PerplexityScorer::new(ByteEncoder, BigramModel::seeded(ByteEncoder::VOCAB, 42))
}

struct Unreachable(Arc<AtomicUsize>);

impl Translator for Unreachable {
    fn translate(&self, _: &str, _: Language, _: Language) -> Result<String, TranslateError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(TranslateError::Status { status: 503 })
    }
}

struct Shout;

impl Translator for Shout {
    fn translate(&self, text: &str, _: Language, _: Language) -> Result<String, TranslateError> {
        Ok(format!("{text} shout shout"))
    }
}

struct Slow(BigramModel, Arc<AtomicUsize>);

impl Slow {
    fn scorer(calls: &Arc<AtomicUsize>) -> PerplexityScorer {
        let model = Slow(BigramModel::uniform(ByteEncoder::VOCAB), Arc::clone(calls));
        PerplexityScorer::new(ByteEncoder, model)
    }
}

impl LanguageModel for Slow {
    fn vocab_size(&self) -> usize {
        self.0.vocab_size()
    }
    fn max_context(&self) -> usize {
        self.0.max_context()
    }
    fn logits(&self, tokens: &[u32]) -> Result<Vec<Vec<f32>>, ModelError> {
        self.1.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(500));
        self.0.logits(tokens)
    }
}

#[test]
fn analysis_is_idempotent() {
    let detector = Detector::new(scorer());
    let request = AnalysisRequest::new(SAMPLE, Language::En);
    let first = detector.analyze(&request).unwrap();
    let second = detector.analyze(&request).unwrap();
    assert_eq!(first.perplexity, second.perplexity);
    assert_eq!(first.burstiness, second.burstiness);
    assert_eq!(first.top_words, second.top_words);
    assert_eq!(first.verdict, second.verdict);
}

#[test]
fn translation_failure_analyzes_the_original_text() {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = Detector::new(scorer()).with_translator(Unreachable(Arc::clone(&calls)));
    let report = detector.analyze(&AnalysisRequest::new(SAMPLE, Language::Es)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.analyzed_text, SAMPLE);
    assert!(!report.translated);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Translation error"));

    let direct = Detector::new(scorer()).analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap();
    assert_eq!(report.perplexity, direct.perplexity);
    assert_eq!(report.burstiness, direct.burstiness);
}

#[test]
fn english_input_is_not_sent_for_translation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = Detector::new(scorer()).with_translator(Unreachable(Arc::clone(&calls)));
    let report = detector.analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(report.warnings.is_empty());
}

#[test]
fn metrics_are_computed_on_translated_text() {
    let detector = Detector::new(scorer()).with_translator(Shout);
    let report = detector.analyze(&AnalysisRequest::new("hola mundo", Language::Es)).unwrap();
    assert!(report.translated);
    assert_eq!(report.input, "hola mundo");
    assert_eq!(report.analyzed_text, "hola mundo shout shout");
    assert_eq!(report.top_words[0].word, "shout");
    assert_eq!(report.top_words[0].count, 2);
}

#[test]
fn empty_input_is_an_error() {
    let detector = Detector::new(scorer());
    assert!(matches!(
        detector.analyze(&AnalysisRequest::new("", Language::Auto)),
        Err(AnalysisError::EmptyInput)
    ));
}

#[test]
fn single_token_never_flags() {
    let lenient = Thresholds { max_perplexity: f64::MAX, min_burstiness: -1.0 };
    let detector = Detector::new(scorer()).with_thresholds(lenient);
    let report = detector.analyze(&AnalysisRequest::new("x", Language::En)).unwrap();
    assert_eq!(report.perplexity.value, f64::INFINITY);
    assert_eq!(report.verdict, Verdict::LikelyHuman);
}

#[test]
fn verdict_matches_the_rule() {
    let thresholds = Thresholds::default();
    let detector = Detector::new(scorer()).with_thresholds(thresholds);
    let report = detector.analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap();
    assert_eq!(
        report.verdict,
        Verdict::decide(report.perplexity.value, report.burstiness, &thresholds)
    );
}

#[test]
fn truncation_is_reported() {
    let detector = Detector::new(scorer().with_context_limit(16));
    let report = detector.analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap();
    assert!(report.perplexity.truncated);
    assert_eq!(report.perplexity.tokens_scored, 16);
    assert!(report.warnings.iter().any(|w| w.contains("first 16 tokens")));
}

#[test]
fn slow_inference_times_out_with_a_warning() {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector =
        Detector::new(Slow::scorer(&calls)).with_inference_timeout(Some(Duration::from_millis(50)));
    let report = detector.analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap();
    assert!(!report.perplexity.is_defined());
    assert_eq!(report.verdict, Verdict::LikelyHuman);
    assert!(report.warnings.iter().any(|w| w.contains("timed out")));
}

#[test]
fn abandoned_workers_count_against_the_cap() {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = Detector::new(Slow::scorer(&calls))
        .with_inference_timeout(Some(Duration::from_millis(20)))
        .with_scoring_workers(1);
    let request = AnalysisRequest::new(SAMPLE, Language::En);

    let first = detector.analyze(&request).unwrap();
    assert!(first.warnings.iter().any(|w| w.contains("timed out")));

    // the first worker is still sleeping inside the model
    let second = detector.analyze(&request).unwrap();
    assert!(!second.perplexity.is_defined());
    assert!(second.warnings.iter().any(|w| w.contains("capacity exhausted")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // once it finishes the slot is free again
    thread::sleep(Duration::from_millis(700));
    let third = detector.analyze(&request).unwrap();
    assert!(third.warnings.iter().any(|w| w.contains("timed out")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn fast_inference_within_timeout_is_unchanged() {
    let bounded = Detector::new(scorer()).with_inference_timeout(Some(Duration::from_secs(30)));
    let unbounded = Detector::new(scorer());
    let request = AnalysisRequest::new(SAMPLE, Language::En);
    assert_eq!(
        bounded.analyze(&request).unwrap().perplexity,
        unbounded.analyze(&request).unwrap().perplexity
    );
}

#[test]
fn detector_is_shared_across_threads() {
    let detector = Arc::new(Detector::new(scorer()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let detector = Arc::clone(&detector);
            thread::spawn(move || {
                detector.analyze(&AnalysisRequest::new(SAMPLE, Language::En)).unwrap().perplexity
            })
        })
        .collect();
    let scores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] == w[1]));
}

//! Plain-text rendering of a report for terminals.

use std::fmt::Write;

use crate::detector::{AnalysisReport, RankedWord};

/// Widest bar in the repeated-words chart, in cells.
pub const BAR_WIDTH: usize = 30;

/// Perplexity as shown to users; the undefined sentinel prints as text.
pub fn format_perplexity(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "undefined (too few tokens)".to_string()
    }
}

/// Horizontal bars scaled to the most frequent word.
pub fn word_chart(words: &[RankedWord]) -> String {
    let max = words.iter().map(|w| w.count).max().unwrap_or(0).max(1);
    let width = words.iter().map(|w| w.word.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for w in words {
        let cells = (w.count * BAR_WIDTH).div_ceil(max);
        let _ = writeln!(out, "{:<width$}  {} {}", w.word, "█".repeat(cells), w.count);
    }
    out
}

/// Full report: input, scores, verdict, chart, warnings and disclaimer.
pub fn report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Your Input Text");
    let _ = writeln!(out, "  {}", report.input.trim());
    if report.translated {
        let _ = writeln!(out, "Translated Text");
        let _ = writeln!(out, "  {}", report.analyzed_text.trim());
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Detection Score");
    let _ = writeln!(out, "  Perplexity:       {}", format_perplexity(report.perplexity.value));
    let _ = writeln!(out, "  Burstiness Score: {:.2}", report.burstiness);
    let _ = writeln!(out, "  Text Analysis Result: {}", report.verdict);
    let _ = writeln!(out);
    if !report.top_words.is_empty() {
        let _ = writeln!(out, "Top {} Most Repeated Words", report.top_words.len());
        out.push_str(&word_chart(&report.top_words));
        let _ = writeln!(out);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    let _ = writeln!(out, "{}", report.disclaimer);
    out
}

// Report rendering: verdict, confidence, filtered per-chunk breakdown
use serde::Serialize;
use std::fmt::Write;

use crate::types::{ChunkResult, Detection, Verdict};

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub max_chunks: usize,
    pub show_text: bool,
    pub search: Option<String>,
}

/// The chunks that survive the filter and the display cap.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkWindow<'a> {
    /// (1-based chunk number in the document, result)
    pub shown: Vec<(usize, &'a ChunkResult)>,
    pub total_matches: usize,
}

impl ChunkWindow<'_> {
    pub fn truncated(&self) -> bool {
        self.total_matches > self.shown.len()
    }
}

/// Keep chunks whose text or label contains `query`, case-insensitively.
/// A blank query keeps everything; otherwise the query is matched as typed,
/// surrounding spaces included.
pub fn filter_chunks<'a>(
    chunks: &'a [ChunkResult],
    query: Option<&str>,
) -> Vec<(usize, &'a ChunkResult)> {
    let query = active_query(query).map(str::to_lowercase);
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c))
        .filter(|(_, c)| match &query {
            Some(q) => c.chunk.to_lowercase().contains(q) || c.label.to_lowercase().contains(q),
            None => true,
        })
        .collect()
}

fn active_query(query: Option<&str>) -> Option<&str> {
    query.filter(|q| !q.trim().is_empty())
}

/// Filter first, then cap.
pub fn window<'a>(chunks: &'a [ChunkResult], options: &DisplayOptions) -> ChunkWindow<'a> {
    let mut matches = filter_chunks(chunks, options.search.as_deref());
    let total_matches = matches.len();
    matches.truncate(options.max_chunks);
    ChunkWindow {
        shown: matches,
        total_matches,
    }
}

pub fn percent(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

fn bar(score: f32) -> String {
    let filled = ((score.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_text(model: &str, detection: &Detection, options: &DisplayOptions) -> String {
    let mut out = String::new();
    let Verdict { label, score } = &detection.verdict;

    let _ = writeln!(out, "Model:      {model}");
    let _ = writeln!(out, "Verdict:    {label}");
    let _ = writeln!(out, "Confidence: {} {}", percent(*score), bar(*score));
    let _ = writeln!(out, "Chunks:     {}", detection.chunks.len());

    if detection.chunks.is_empty() {
        return out;
    }

    let window = window(&detection.chunks, options);
    let _ = writeln!(out);
    let _ = writeln!(out, "Per-chunk results (first {} shown)", options.max_chunks);
    if let Some(q) = active_query(options.search.as_deref()) {
        let _ = writeln!(out, "Filter: \"{q}\"");
    }

    if window.shown.is_empty() {
        let _ = writeln!(out, "  no chunks match");
        return out;
    }

    for (number, chunk) in &window.shown {
        let _ = writeln!(
            out,
            "  {:>4}  {:<16} {:>8} {}",
            format!("#{number}"),
            chunk.label,
            percent(chunk.score),
            bar(chunk.score)
        );
        if options.show_text {
            for line in chunk.chunk.lines() {
                let _ = writeln!(out, "        | {line}");
            }
        }
    }

    if window.truncated() {
        let _ = writeln!(
            out,
            "  ... {} matching chunks in total, showing the first {}.",
            window.total_matches,
            window.shown.len()
        );
    }

    out
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub model: &'a str,
    pub label: &'a str,
    pub score: f32,
    pub total_chunks: usize,
    pub failed_chunks: usize,
    pub total_matches: usize,
    pub truncated: bool,
    pub chunks: Vec<JsonChunk<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonChunk<'a> {
    pub index: usize,
    pub label: &'a str,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

pub fn render_json(
    model: &str,
    detection: &Detection,
    options: &DisplayOptions,
) -> serde_json::Result<String> {
    let window = window(&detection.chunks, options);
    let report = JsonReport {
        model,
        label: &detection.verdict.label,
        score: detection.verdict.score,
        total_chunks: detection.chunks.len(),
        failed_chunks: detection.failed_chunks(),
        total_matches: window.total_matches,
        truncated: window.truncated(),
        chunks: window
            .shown
            .iter()
            .map(|(index, c)| JsonChunk {
                index: *index,
                label: &c.label,
                score: c.score,
                text: options.show_text.then_some(c.chunk.as_str()),
                error: c.error.as_deref(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}

// Chunk-and-aggregate: apply a short-context classifier to long text
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classifier::TextClassifier;
use crate::types::{ChunkResult, DetectorError, Detection, Verdict};

/// Split `text` into consecutive spans of at most `chunk_size` characters.
/// Concatenating the spans gives back `text` exactly.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

fn classify_chunk(classifier: &dyn TextClassifier, index: usize, chunk: &str) -> ChunkResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(chunk)));
    let reason = match outcome {
        Ok(Ok(c)) if c.score.is_finite() => {
            return ChunkResult::classified(chunk, c.label, c.score);
        }
        Ok(Ok(c)) => format!("non-finite score {} for label {}", c.score, c.label),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("classifier panicked: {}", panic_message(payload.as_ref())),
    };
    tracing::warn!(chunk = index + 1, error = %reason, "chunk classification failed");
    ChunkResult::failed(chunk, reason)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Mean score per label, winner by highest mean. Labels keep the order they
/// were first seen in, and a later label must beat the current best strictly,
/// so ties go to the label encountered first.
pub fn aggregate(results: &[ChunkResult]) -> Verdict {
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();
    for result in results {
        match groups.iter_mut().find(|(label, _, _)| *label == result.label) {
            Some((_, sum, count)) => {
                *sum += f64::from(result.score);
                *count += 1;
            }
            None => groups.push((result.label.as_str(), f64::from(result.score), 1)),
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (label, sum, count) in groups {
        let mean = sum / count as f64;
        if best.map_or(true, |(_, top)| mean > top) {
            best = Some((label, mean));
        }
    }

    match best {
        Some((label, mean)) => Verdict {
            label: label.to_string(),
            score: mean as f32,
        },
        None => Verdict::unknown(),
    }
}

/// Classify `text` chunk by chunk and aggregate the results. A failing chunk
/// becomes an `ERROR` result and never aborts the batch.
pub fn detect(text: &str, classifier: &dyn TextClassifier, chunk_size: usize) -> Detection {
    if text.trim().is_empty() {
        return Detection::empty();
    }

    let chunks = chunk_text(text, chunk_size);
    tracing::debug!(chunks = chunks.len(), chunk_size, "classifying chunks");

    let results: Vec<ChunkResult> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| classify_chunk(classifier, i, chunk))
        .collect();

    finish(results)
}

/// Same outcome as [`detect`], with up to `workers` chunks classified at once
/// on the blocking pool.
pub async fn detect_concurrent(
    text: &str,
    classifier: Arc<dyn TextClassifier>,
    chunk_size: usize,
    workers: usize,
) -> Result<Detection, DetectorError> {
    if text.trim().is_empty() {
        return Ok(Detection::empty());
    }

    let chunks: Vec<String> = chunk_text(text, chunk_size)
        .into_iter()
        .map(str::to_owned)
        .collect();
    let total = chunks.len();
    tracing::debug!(chunks = total, chunk_size, workers, "classifying chunks concurrently");

    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| DetectorError::Task(e.to_string()))?;
        let classifier = Arc::clone(&classifier);
        let chunk = chunk.clone();
        tasks.spawn_blocking(move || {
            let result = classify_chunk(classifier.as_ref(), index, &chunk);
            drop(permit);
            (index, result)
        });
    }

    let mut slots: Vec<Option<ChunkResult>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::warn!(error = %e, "classification task did not complete"),
        }
    }

    // A chunk whose task never reported back still gets its sentinel.
    let results = slots
        .into_iter()
        .zip(chunks)
        .map(|(slot, chunk)| {
            slot.unwrap_or_else(|| {
                ChunkResult::failed(chunk, "classification task did not complete")
            })
        })
        .collect();

    Ok(finish(results))
}

fn finish(results: Vec<ChunkResult>) -> Detection {
    let verdict = aggregate(&results);
    let failed = results.iter().filter(|r| r.is_error()).count();
    tracing::info!(
        label = %verdict.label,
        score = verdict.score,
        chunks = results.len(),
        failed,
        "detection complete"
    );
    Detection {
        verdict,
        chunks: results,
    }
}

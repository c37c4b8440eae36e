//! Answer assembly
//!
//! Builds the grounding prompt from the winning source set and issues one
//! generation call. Timeout and generation errors become a fixed fallback
//! string; the structured sources are returned by the caller either way.

use scholargraph_common::errors::AppError;
use scholargraph_common::generation::{GenerationOptions, Generator};
use scholargraph_common::vector::IndexedDocument;

/// User-facing text when generation fails or times out.
pub const FALLBACK_ANSWER: &str = "Answer generation timed out. The sources below were still \
retrieved; please retry, or try a simpler question.";

/// Deterministic grounding prompt: numbered sources, optional graph
/// narrative, the question, and an explicit refusal instruction. Whether the
/// model honors the refusal policy cannot be verified locally.
pub fn build_prompt(
    query: &str,
    documents: &[IndexedDocument],
    graph_narrative: Option<&str>,
) -> String {
    let mut prompt = String::from(
        "You are a research assistant. Answer the question using only the \
         numbered sources below, citing them as [1], [2], and so on. If no \
         source supports an answer, say the dataset does not cover the topic \
         instead of guessing.\n\nSOURCES:\n",
    );

    for (i, document) in documents.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n\n", i + 1, document.text_block));
    }

    if let Some(narrative) = graph_narrative {
        prompt.push_str(&format!("RELATIONSHIP CONTEXT:\n{}\n\n", narrative));
    }

    prompt.push_str(&format!(
        "QUESTION: {}\n\nProvide a clear, concise answer (2-3 paragraphs at most).\nANSWER:",
        query
    ));
    prompt
}

/// One generation call; failures collapse into the fixed fallback text.
pub async fn respond(
    generator: &dyn Generator,
    prompt: &str,
    options: &GenerationOptions,
) -> String {
    match generator.invoke(prompt, options).await {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            let timed_out = matches!(e, AppError::GenerationTimeout { .. });
            scholargraph_common::metrics::record_generation_failure(timed_out);
            tracing::warn!(error = %e, timed_out, "Generation failed, returning fallback answer");
            FALLBACK_ANSWER.to_string()
        }
    }
}

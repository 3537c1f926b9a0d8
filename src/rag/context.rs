//! Grounding context assembly for answer generation.

use crate::ranking::RankedChunk;

/// Format ranked chunks for the grounding prompt.
///
/// Chunk texts are concatenated in ranked order, joined by blank lines, exactly
/// as they went into the store.
pub fn format_context_for_prompt(chunks: &[RankedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(text: &str, score: f32) -> RankedChunk {
        RankedChunk {
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn test_format_context_joins_with_blank_lines() {
        let chunks = vec![ranked("First chunk.", 0.9), ranked("Second chunk.", 0.8)];
        assert_eq!(
            format_context_for_prompt(&chunks),
            "First chunk.\n\nSecond chunk."
        );
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context_for_prompt(&[]), "");
    }
}

//! Document chunking for splitting raw text into storable pieces.
//!
//! Documents are split into overlapping character windows before embedding.
//! Window boundaries prefer sentence endings so chunks stay readable on their own.

/// Configuration for text splitting.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Splits document text into overlapping chunks.
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// Create a new splitter with the given configuration.
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Split text into chunks.
    ///
    /// Empty and whitespace-only pieces are discarded, so the output is safe to
    /// hand directly to the chunk store.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chunk_size = self.config.chunk_size.max(1);
        let step = chunk_size.saturating_sub(self.config.chunk_overlap).max(1);

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + chunk_size).min(total);
            let window: String = chars[start..end].iter().collect();

            // Break at a sentence boundary unless this is the final window.
            let piece = if end < total {
                cut_at_sentence_boundary(&window)
            } else {
                window
            };

            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            start += step;
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

/// Cut the window at the last sentence ending in its final 20%, if one exists.
fn cut_at_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let search_start = text
        .char_indices()
        .nth(text.chars().count() * 80 / 100)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return text[..cut].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("The capital of France is Paris.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "The capital of France is Paris.");
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\t  ").is_empty());
    }

    #[test]
    fn test_long_text_is_split_with_overlap() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        });

        let text = "This is a sentence about nothing in particular. ".repeat(20);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 20,
            chunk_overlap: 0,
        });

        // The period sits inside the final 20% of the first 20-char window.
        let text = "abcdefghij klmnop. qrstuvwxyz and some more text";
        let chunks = splitter.split(text);

        assert_eq!(chunks[0], "abcdefghij klmnop.");
    }
}

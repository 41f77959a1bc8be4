use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::config::ProcessingConfig;
use crate::db::models::document::{Document, DocumentChunk, DocumentMetadata, DocumentStatus};
use crate::db::store::ProcessingUpdate;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\w\s.,!?;:\-()\[\]{}"']+"#).expect("character filter pattern is valid")
});
static TITLE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-]+").expect("separator pattern is valid"));

const GENERIC_TITLES: &[&str] = &["document", "file", "text"];
const MAX_TITLE_LEN: usize = 100;
const TITLE_SCAN_CHARS: usize = 500;
const TITLE_SCAN_LINES: usize = 5;

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '\n'];
/// How far back from a window's end to look for a sentence boundary.
const BOUNDARY_WINDOW: usize = 100;

const SUMMARY_SENTENCES: usize = 3;
const MAX_SUMMARY_LEN: usize = 500;
const WORDS_PER_MINUTE: usize = 200;

const ENGLISH_MARKERS: &[&str] = &["the", "and", "is", "in", "to", "of", "a", "that", "it", "with"];
const ITALIAN_MARKERS: &[&str] = &["il", "di", "che", "e", "la", "per", "in", "un", "è", "con"];

/// Turns extracted text into a stored [`Document`]: cleaning, title and
/// metadata derivation, chunking and a lead-sentence summary.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_size: usize,
}

impl DocumentProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self::with_chunking(config.chunk_size, config.chunk_overlap, config.min_chunk_size)
    }

    pub fn with_chunking(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            min_chunk_size,
        }
    }

    pub fn process_document(
        &self,
        text: &str,
        filename: &str,
        file_type: &str,
        file_size: u64,
        user_id: Option<String>,
    ) -> Document {
        tracing::info!("Processing document: {filename}");

        let content = self.clean_text(text);
        let title = self.extract_title(filename, &content);
        let metadata = self.create_metadata(&content, file_type, file_size);
        let chunks = self.create_chunks(&content);
        let summary = self.generate_summary(&content);

        tracing::info!("Document processed successfully: {} chunks created", chunks.len());

        Document {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            summary: Some(summary),
            chunks,
            user_id,
            uploaded_at: Utc::now(),
            processed_at: Some(Utc::now()),
            metadata,
            status: DocumentStatus::Completed,
        }
    }

    /// Re-chunks and re-summarises the stored content of `document`.
    pub fn reprocess(&self, document: &Document) -> ProcessingUpdate {
        tracing::info!("Reprocessing document: {}", document.id);

        let content = self.clean_text(&document.content);
        ProcessingUpdate {
            chunks: self.create_chunks(&content),
            summary: Some(self.generate_summary(&content)),
            processed_at: Utc::now(),
            status: DocumentStatus::Completed,
        }
    }

    /// Drops characters outside word characters, whitespace and common
    /// punctuation, then collapses whitespace runs to a single space.
    pub fn clean_text(&self, text: &str) -> String {
        let filtered = DISALLOWED.replace_all(text, "");
        WHITESPACE.replace_all(&filtered, " ").trim().to_string()
    }

    pub fn extract_title(&self, filename: &str, text: &str) -> String {
        let stem = filename
            .rsplit_once('.')
            .map_or(filename, |(stem, _)| stem);
        let mut title = title_case(&TITLE_SEPARATORS.replace_all(stem, " "));

        let generic = GENERIC_TITLES.contains(&title.to_lowercase().as_str());
        if title.chars().count() < 3 || generic {
            let head: String = text.chars().take(TITLE_SCAN_CHARS).collect();
            let candidate = head
                .split('\n')
                .take(TITLE_SCAN_LINES)
                .map(str::trim)
                .find(|line| {
                    let len = line.chars().count();
                    len > 5 && len < MAX_TITLE_LEN && line.chars().next().is_some_and(char::is_uppercase)
                });
            if let Some(line) = candidate {
                title = line.to_string();
            }
        }

        title.chars().take(MAX_TITLE_LEN).collect()
    }

    pub fn create_metadata(&self, text: &str, file_type: &str, file_size: u64) -> DocumentMetadata {
        let word_count = text.split_whitespace().count();

        DocumentMetadata {
            author: None,
            pages: None,
            language: Some(detect_language(text).to_string()),
            file_type: file_type.to_string(),
            file_size,
            word_count: Some(word_count),
            character_count: Some(text.chars().count()),
            estimated_reading_time: Some((word_count / WORDS_PER_MINUTE).max(1)),
        }
    }

    /// Splits `text` into windows of `chunk_size` characters that overlap by
    /// `chunk_overlap`, preferring to end each window on a sentence boundary.
    pub fn create_chunks(&self, text: &str) -> Vec<DocumentChunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        if len == 0 {
            return Vec::new();
        }

        if len <= self.chunk_size {
            return vec![make_chunk(0, text.to_string(), 0, len)];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                let search_start = end.saturating_sub(BOUNDARY_WINDOW).max(start);
                let boundary = chars[search_start..end]
                    .iter()
                    .rposition(|c| SENTENCE_ENDINGS.contains(c));
                if let Some(pos) = boundary.filter(|&pos| pos > 0) {
                    end = search_start + pos + 1;
                }
            }

            let window: String = chars[start..end].iter().collect();
            let content = window.trim();
            if content.chars().count() >= self.min_chunk_size {
                chunks.push(make_chunk(chunks.len(), content.to_string(), start, end));
            }

            if end >= len {
                break;
            }

            start = (start + 1).max(end.saturating_sub(self.chunk_overlap));
        }

        tracing::info!("Created {} chunks from text of {len} characters", chunks.len());
        chunks
    }

    pub fn generate_summary(&self, text: &str) -> String {
        let summary = text
            .split(". ")
            .take(SUMMARY_SENTENCES)
            .collect::<Vec<_>>()
            .join(". ");

        if summary.chars().count() > MAX_SUMMARY_LEN {
            let truncated: String = summary.chars().take(MAX_SUMMARY_LEN).collect();
            format!("{truncated}...")
        } else {
            summary
        }
    }
}

fn make_chunk(index: usize, content: String, start: usize, end: usize) -> DocumentChunk {
    DocumentChunk {
        index,
        word_count: content.split_whitespace().count(),
        character_count: content.chars().count(),
        content,
        start_position: start,
        end_position: end,
    }
}

/// Uppercases the first letter of every run of letters, lowercases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}

/// Stop-word vote between English and Italian; ties are `unknown`.
pub fn detect_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let count = |markers: &[&str]| {
        markers
            .iter()
            .filter(|word| lower.contains(&format!(" {word} ")))
            .count()
    };

    let english = count(ENGLISH_MARKERS);
    let italian = count(ITALIAN_MARKERS);

    match english.cmp(&italian) {
        std::cmp::Ordering::Greater => "en",
        std::cmp::Ordering::Less => "it",
        std::cmp::Ordering::Equal => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TEXT: &str = "Artificial Intelligence and Machine Learning

Artificial Intelligence (AI) is a field of computer science that aims to create
intelligent machines that can perform tasks that typically require human intelligence.

Machine Learning (ML) is a subset of AI that focuses on the development of algorithms
that can learn and improve from experience without being explicitly programmed.

Deep Learning is a subset of machine learning that uses neural networks with multiple
layers to analyze and learn from large amounts of data.

Key applications of AI include:
1. Natural Language Processing
2. Computer Vision
3. Speech Recognition

The future of AI looks promising with continued advancements in technology.";

    fn processor() -> DocumentProcessor {
        DocumentProcessor::with_chunking(1000, 100, 100)
    }

    #[test]
    fn test_process_document_builds_completed_document() {
        let doc = processor().process_document(
            SAMPLE_TEXT,
            "test_ai_guide.txt",
            "text/plain",
            1024,
            Some("test_user_123".into()),
        );

        assert_eq!(doc.title, "Test Ai Guide");
        assert_ne!(doc.content, SAMPLE_TEXT);
        assert_eq!(doc.user_id.as_deref(), Some("test_user_123"));
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert!(doc.processed_at.is_some());
        assert!(!doc.chunks.is_empty());
        assert!(doc.summary.is_some());
        assert_eq!(doc.metadata.file_type, "text/plain");
        assert_eq!(doc.metadata.file_size, 1024);
        assert_eq!(doc.metadata.language.as_deref(), Some("en"));
        assert!(Uuid::parse_str(&doc.id).is_ok());
    }

    #[test]
    fn test_clean_text_normalizes_whitespace() {
        let cleaned = processor().clean_text("  Multiple   spaces\n\n\nMultiple  \t\t newlines  ");
        assert!(!cleaned.contains("  "));
        assert!(!cleaned.contains('\n'));
        assert_eq!(cleaned.trim(), cleaned);
        assert_eq!(cleaned, "Multiple spaces Multiple newlines");
    }

    #[test]
    fn test_clean_text_keeps_punctuation_and_drops_symbols() {
        let cleaned = processor().clean_text("Hello, world! How are you? I'm fine. (Really) @#$ ~ done");
        for c in [',', '!', '?', '.', '(', ')', '\''] {
            assert!(cleaned.contains(c), "missing {c:?}");
        }
        assert!(!cleaned.contains('@'));
        assert!(!cleaned.contains("  "));
        assert!(cleaned.ends_with("(Really) done"));
    }

    #[test]
    fn test_extract_title_from_filename() {
        let p = processor();
        assert_eq!(
            p.extract_title("artificial_intelligence_guide.pdf", SAMPLE_TEXT),
            "Artificial Intelligence Guide"
        );
        assert_eq!(p.extract_title("ML-basics-2024.txt", SAMPLE_TEXT), "Ml Basics 2024");
    }

    #[test]
    fn test_extract_title_falls_back_to_content() {
        let p = processor();
        assert_eq!(
            p.extract_title("document.pdf", "Machine Learning Fundamentals\n\nThis chapter covers..."),
            "Machine Learning Fundamentals"
        );
        assert_eq!(
            p.extract_title("file", SAMPLE_TEXT),
            "Artificial Intelligence and Machine Learning"
        );
        // nothing usable in the text keeps the filename-derived title
        assert_eq!(p.extract_title("text.md", "tiny"), "Text");
    }

    #[test]
    fn test_extract_title_is_capped() {
        let title = processor().extract_title(&format!("{}.txt", "a".repeat(150)), "");
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_create_metadata_counts() {
        let text = "This is a test document with exactly ten words here.";
        let metadata = processor().create_metadata(text, "text/plain", 1024);

        assert_eq!(metadata.file_type, "text/plain");
        assert_eq!(metadata.file_size, 1024);
        assert_eq!(metadata.word_count, Some(10));
        assert_eq!(metadata.character_count, Some(text.chars().count()));
        assert_eq!(metadata.estimated_reading_time, Some(1));
        assert_eq!(metadata.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("The quick brown fox jumps over the lazy dog"), "en");
        assert_eq!(detect_language("Il cane marrone salta sopra il gatto pigro"), "it");
        assert_eq!(detect_language("Lorem ipsum dolor sit amet consectetur"), "unknown");
    }

    #[test]
    fn test_single_chunk_for_short_text() {
        let text = "This is a short text that fits in a single chunk.";
        let chunks = processor().create_chunks(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].start_position, 0);
        assert_eq!(chunks[0].end_position, text.chars().count());
        assert!(processor().create_chunks("").is_empty());
    }

    #[test]
    fn test_multiple_overlapping_chunks_for_long_text() {
        let p = DocumentProcessor::with_chunking(500, 50, 100);
        let chunks = p.create_chunks(&"A".repeat(2000));

        let spans: Vec<_> = chunks
            .iter()
            .map(|c| (c.start_position, c.end_position))
            .collect();
        assert_eq!(spans, vec![(0, 500), (450, 950), (900, 1400), (1350, 1850), (1800, 2000)]);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.character_count >= 100);
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].end_position > pair[1].start_position);
        }
    }

    #[test]
    fn test_chunks_prefer_sentence_boundaries() {
        let p = DocumentProcessor::with_chunking(200, 100, 100);
        let text = format!("{}Last sentence.", "First sentence. ".repeat(100));
        let chunks = p.create_chunks(&text);

        assert!(chunks.len() > 1);
        let ending_on_sentence = chunks
            .iter()
            .filter(|c| c.content.ends_with(['.', '!', '?']))
            .count();
        assert!(ending_on_sentence >= chunks.len() / 2);
    }

    #[test]
    fn test_chunks_use_character_offsets() {
        let p = DocumentProcessor::with_chunking(100, 10, 10);
        let text = "é".repeat(250);
        let chunks = p.create_chunks(&text);

        assert_eq!(chunks.last().map(|c| c.end_position), Some(250));
        assert!(chunks.iter().all(|c| c.character_count <= 100));
    }

    #[test]
    fn test_generate_summary() {
        let p = processor();
        let summary = p.generate_summary(&p.clean_text(SAMPLE_TEXT));
        assert!(!summary.is_empty());
        assert!(summary.chars().count() <= MAX_SUMMARY_LEN + 3);
        assert!(summary.starts_with("Artificial Intelligence"));

        let long = p.generate_summary(&"word ".repeat(300));
        assert!(long.ends_with("..."));
        assert_eq!(long.chars().count(), MAX_SUMMARY_LEN + 3);
    }

    #[test]
    fn test_reprocess_rebuilds_chunks_and_summary() {
        let p = DocumentProcessor::with_chunking(200, 20, 50);
        let mut doc = processor().process_document(SAMPLE_TEXT, "notes.txt", "text/plain", 10, None);
        doc.chunks.clear();
        doc.summary = None;

        let update = p.reprocess(&doc);
        assert!(update.chunks.len() > 1);
        assert!(update.summary.is_some());
        assert_eq!(update.status, DocumentStatus::Completed);
    }
}

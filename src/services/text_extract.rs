use std::io::{Cursor, Read};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

pub const PDF: &str = "application/pdf";
pub const EPUB: &str = "application/epub+zip";
pub const PLAIN_TEXT: &str = "text/plain";
pub const MARKDOWN: &str = "text/markdown";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME types the extractor knows how to read.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[PDF, EPUB, PLAIN_TEXT, MARKDOWN, DOCX];

const EXTRACTION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("No text content found in file")]
    Empty,

    #[error("Text extraction timed out after {0}s")]
    TimedOut(u64),

    #[error("{0:#}")]
    Failed(#[from] anyhow::Error),
}

/// Text pulled out of an upload plus whatever metadata the format exposes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub pages: Option<u32>,
    pub author: Option<String>,
}

impl ExtractedText {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

pub fn supported_types() -> &'static [&'static str] {
    SUPPORTED_MIME_TYPES
}

pub fn is_supported_type(content_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&content_type)
}

/// Extract text from file bytes, routing on the declared content type.
///
/// PDF, EPUB and DOCX are parsed on the blocking pool via `spawn_blocking`
/// so they don't stall the async runtime.
pub async fn extract_text(
    bytes: &[u8],
    filename: &str,
    content_type: &str,
) -> Result<ExtractedText, ExtractError> {
    tracing::info!("Extracting text from {filename} (type: {content_type})");

    if !is_supported_type(content_type) {
        return Err(ExtractError::Unsupported(content_type.to_string()));
    }

    let extracted = if matches!(content_type, PDF | EPUB | DOCX) {
        let bytes = bytes.to_vec();
        let ct = content_type.to_string();
        let handle = tokio::task::spawn_blocking(move || extract_text_sync(&bytes, &ct));

        match tokio::time::timeout(Duration::from_secs(EXTRACTION_TIMEOUT_SECS), handle).await {
            Ok(join_result) => join_result.context("Text extraction task panicked")??,
            Err(_) => return Err(ExtractError::TimedOut(EXTRACTION_TIMEOUT_SECS)),
        }
    } else {
        extract_text_sync(bytes, content_type)?
    };

    if extracted.text.trim().is_empty() {
        tracing::warn!("No text content found in {filename}");
        return Err(ExtractError::Empty);
    }

    tracing::info!(
        "Successfully extracted {} characters from {filename}",
        extracted.text.chars().count()
    );
    Ok(extracted)
}

fn extract_text_sync(bytes: &[u8], content_type: &str) -> Result<ExtractedText> {
    match content_type {
        PDF => extract_pdf(bytes).context("Failed to extract PDF text"),
        EPUB => extract_epub(bytes).context("Failed to extract EPUB text"),
        DOCX => extract_docx(bytes).context("Failed to extract DOCX text"),
        PLAIN_TEXT | MARKDOWN => decode_plaintext(bytes).map(ExtractedText::text),
        other => Err(anyhow!("Unsupported file type: {other}")),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedText> {
    let doc = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
    let pages = doc.get_pages();

    let mut page_texts = Vec::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => page_texts.push(text),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to extract text from page {page_number}: {e}"),
        }
    }

    let text = if page_texts.is_empty() {
        tracing::info!("No text found page by page, falling back to pdf_extract");
        pdf_extract::extract_text_from_mem(bytes).context("No readable text found in PDF")?
    } else {
        page_texts.join("\n\n")
    };

    Ok(ExtractedText {
        text,
        pages: Some(pages.len() as u32),
        author: pdf_author(&doc),
    })
}

fn pdf_author(doc: &lopdf::Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        lopdf::Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let raw = info.get(b"Author").ok()?.as_str().ok()?;
    let author = decode_pdf_string(raw);
    let author = author.trim();
    (!author.is_empty()).then(|| author.to_string())
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding,
/// which is close enough to Latin-1 for metadata.
fn decode_pdf_string(raw: &[u8]) -> String {
    match raw.strip_prefix(b"\xFE\xFF") {
        Some(body) => {
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => raw.iter().map(|&b| b as char).collect(),
    }
}

fn extract_epub(bytes: &[u8]) -> Result<ExtractedText> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Failed to open EPUB archive")?;

    let mut sections = Vec::new();
    let mut author = None;
    let mut content_files = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("Failed to read EPUB entry {index}"))?;
        let name = entry.name().to_string();
        let lower = name.to_lowercase();

        let is_content =
            lower.ends_with(".html") || lower.ends_with(".xhtml") || lower.ends_with(".htm");
        let is_package = lower.ends_with(".opf");
        if !is_content && !is_package {
            continue;
        }

        let mut raw = String::new();
        if let Err(e) = entry.read_to_string(&mut raw) {
            tracing::warn!("Failed to extract from {name}: {e}");
            continue;
        }

        if is_package {
            author = author.or_else(|| opf_creator(&raw));
            continue;
        }

        content_files += 1;
        let text = html_to_text(&raw);
        if !text.is_empty() {
            sections.push(text);
        }
    }

    if content_files == 0 {
        bail!("No readable content files found in EPUB");
    }
    if sections.is_empty() {
        bail!("No readable text found in EPUB");
    }

    Ok(ExtractedText {
        text: sections.join("\n\n"),
        pages: None,
        author,
    })
}

/// Visible text of an HTML/XHTML document with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style"));
        if !hidden {
            parts.push(&**text);
        }
    }

    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn opf_creator(opf: &str) -> Option<String> {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let mut reader = Reader::from_str(opf);
    let mut in_creator = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"creator" => in_creator = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"creator" => in_creator = false,
            Ok(Event::Text(e)) if in_creator => {
                let value = e.unescape().ok()?;
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn extract_docx(bytes: &[u8]) -> Result<ExtractedText> {
    use docx_rs::{DocumentChild, TableCellContent, TableChild, TableRowChild};

    let doc = docx_rs::read_docx(bytes).map_err(|e| anyhow!("Failed to read DOCX: {e}"))?;

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();

    for child in &doc.document.children {
        match child {
            DocumentChild::Paragraph(p) => push_non_blank(&mut paragraphs, paragraph_text(p)),
            DocumentChild::Table(table) => {
                for row in &table.rows {
                    let TableChild::TableRow(tr) = row;
                    for cell in &tr.cells {
                        let TableRowChild::TableCell(tc) = cell;
                        let text = tc
                            .children
                            .iter()
                            .filter_map(|content| match content {
                                TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                                _ => None,
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        push_non_blank(&mut cells, text);
                    }
                }
            }
            _ => {}
        }
    }

    paragraphs.extend(cells);
    if paragraphs.is_empty() {
        bail!("No readable text found in DOCX");
    }

    Ok(ExtractedText::text(paragraphs.join("\n\n")))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let docx_rs::RunChild::Text(t) = rc {
                    out.push_str(&t.text);
                }
            }
        }
    }
    out
}

fn push_non_blank(out: &mut Vec<String>, text: String) {
    if !text.trim().is_empty() {
        out.push(text);
    }
}

/// UTF-8 first, then UTF-16 when a byte order mark says so, else Latin-1,
/// which accepts any byte sequence.
fn decode_plaintext(bytes: &[u8]) -> Result<String> {
    if let Some(body) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return String::from_utf8(body.to_vec()).context("File is not valid UTF-8 text");
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let utf16 = match bytes {
        [0xFF, 0xFE, body @ ..] => Some((body, u16::from_le_bytes as fn([u8; 2]) -> u16)),
        [0xFE, 0xFF, body @ ..] => Some((body, u16::from_be_bytes as fn([u8; 2]) -> u16)),
        _ => None,
    };
    if let Some((body, decode_unit)) = utf16 {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| decode_unit([pair[0], pair[1]]))
            .collect();
        if let Ok(text) = String::from_utf16(&units) {
            return Ok(text);
        }
    }

    tracing::debug!("Falling back to Latin-1 decoding");
    Ok(bytes.iter().map(|&b| b as char).collect())
}

//! Text extraction for supported file formats

use crate::error::{Error, Result};
use crate::types::SourceFormat;

/// Text pulled out of an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    /// Detected format
    pub format: SourceFormat,
    /// Extracted text
    pub content: String,
}

/// Extract text based on the filename's extension
pub fn extract(filename: &str, data: &[u8]) -> Result<ExtractedText> {
    let format = SourceFormat::from_filename(filename).ok_or_else(|| {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        Error::UnsupportedFileType(format!("'{}' ({})", extension, filename))
    })?;

    let content = match format {
        SourceFormat::Txt => String::from_utf8_lossy(data).into_owned(),
        SourceFormat::Pdf => extract_pdf(filename, data)?,
        SourceFormat::Docx => extract_docx(filename, data)?,
        SourceFormat::Html => extract_html(filename, data)?,
    };

    tracing::debug!("Extracted {} chars from {} ({})", content.len(), filename, format);
    Ok(ExtractedText { format, content })
}

/// PDF text via pdf-extract, falling back to lopdf page extraction
fn extract_pdf(filename: &str, data: &[u8]) -> Result<String> {
    // pdf-extract can panic on unusual fonts
    let primary = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data));

    let text = match primary {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!("pdf-extract failed for {}: {}, trying fallback", filename, e);
            extract_pdf_fallback(filename, data)?
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked for {}, trying fallback", filename);
            extract_pdf_fallback(filename, data)?
        }
    };

    Ok(text
        .replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn extract_pdf_fallback(filename: &str, data: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;

    let mut all_text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => {
                all_text.push_str(&text);
                all_text.push('\n');
            }
            Err(e) => tracing::debug!("Could not extract page {} of {}: {}", page_num, filename, e),
        }
    }

    if all_text.trim().is_empty() {
        return Err(Error::extraction(
            filename,
            "PDF has no extractable text (image-based or encrypted)",
        ));
    }
    Ok(all_text)
}

fn extract_docx(filename: &str, data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data).map_err(|e| Error::extraction(filename, e.to_string()))?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }
    Ok(content)
}

fn extract_html(filename: &str, data: &[u8]) -> Result<String> {
    let html = String::from_utf8_lossy(data);
    let document = scraper::Html::parse_document(&html);
    let body_selector = scraper::Selector::parse("body")
        .map_err(|e| Error::extraction(filename, format!("Bad selector: {:?}", e)))?;

    let mut content = String::new();
    if let Some(body) = document.select(&body_selector).next() {
        for text in body.text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !content.is_empty() {
                    content.push(' ');
                }
                content.push_str(trimmed);
            }
        }
    }
    Ok(content)
}

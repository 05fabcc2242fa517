//! Upload normalization: turns an arbitrary file into an [`Attachment`] —
//! base64 for images, extracted plain text for everything else.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use sarah_types::models::{Attachment, AttachmentKind};
use thiserror::Error;
use tracing::warn;

/// Hard size ceiling, checked before any decoding starts.
pub const MAX_FILE_SIZE: usize = 4 * 1024 * 1024;

const IMAGE_MIMES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// One error per user-visible failure case. Decoder diagnostics are
/// logged, never carried in the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("file size exceeds the 4 MiB limit")]
    TooLarge,
    #[error("unsupported file format")]
    UnsupportedFormat,
    #[error("failed to read file content")]
    DecodeFailed,
    #[error("could not extract content from the file")]
    EmptyContent,
}

/// Normalize an uploaded file into an [`Attachment`].
///
/// Media type decides the route for images, PDF and plain text; `.docx`
/// and `.xlsx` are matched on the filename extension. An attachment with
/// empty content is never produced.
pub fn process_file(filename: &str, mime: &str, data: &[u8]) -> Result<Attachment, ExtractError> {
    if data.len() > MAX_FILE_SIZE {
        return Err(ExtractError::TooLarge);
    }

    if IMAGE_MIMES.contains(&mime) {
        let encoded = B64.encode(data);
        return Ok(Attachment {
            name: filename.to_string(),
            kind: AttachmentKind::Image,
            preview_url: Some(format!("data:{mime};base64,{encoded}")),
            content: encoded,
        });
    }

    let content = if mime == "application/pdf" {
        extract_pdf(data)?
    } else if filename.ends_with(".docx") {
        extract_docx(data)?
    } else if filename.ends_with(".xlsx") {
        extract_xlsx(data)?
    } else if mime == "text/plain" {
        String::from_utf8_lossy(data).into_owned()
    } else {
        return Err(ExtractError::UnsupportedFormat);
    };

    if content.is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    Ok(Attachment {
        name: filename.to_string(),
        kind: AttachmentKind::Document,
        preview_url: None,
        content,
    })
}

fn extract_pdf(data: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(data).map_err(|e| {
        warn!("PDF extraction failed: {}", e);
        ExtractError::DecodeFailed
    })
}

fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(data).map_err(|e| {
        warn!("DOCX extraction failed: {:?}", e);
        ExtractError::DecodeFailed
    })?;

    let mut text = String::new();
    for child in docx.document.children {
        let docx_rs::DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };
        for child in paragraph.children {
            let docx_rs::ParagraphChild::Run(run) = child else {
                continue;
            };
            for child in run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
        text.push('\n');
    }
    Ok(text)
}

fn extract_xlsx(data: &[u8]) -> Result<String, ExtractError> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(data.to_vec());
    let mut workbook = calamine::Xlsx::new(cursor).map_err(|e| {
        warn!("XLSX extraction failed: {}", e);
        ExtractError::DecodeFailed
    })?;

    let mut text = String::new();
    for name in workbook.sheet_names().to_owned() {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            warn!("XLSX sheet '{}' unreadable: {}", name, e);
            ExtractError::DecodeFailed
        })?;
        text.push_str(&format!("\n--- Sheet: {name} ---\n"));
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        text.push_str(&sheet_to_markdown(&rows));
    }
    Ok(text)
}

/// Renders sheet rows as a markdown table: first row as the header, the
/// rest as the body. Empty sheets render nothing.
fn sheet_to_markdown(rows: &[Vec<String>]) -> String {
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };

    let mut out = String::new();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!(
        "| {} |\n",
        header.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));
    for row in body {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_file_is_rejected_before_any_decode() {
        let data = vec![0u8; MAX_FILE_SIZE + 1];
        // An accepted media type must still fail on size alone.
        assert_eq!(
            process_file("big.png", "image/png", &data),
            Err(ExtractError::TooLarge)
        );
        assert_eq!(
            process_file("big.pdf", "application/pdf", &data),
            Err(ExtractError::TooLarge)
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert_eq!(
            process_file("notes.rtf", "application/rtf", b"{\\rtf1}"),
            Err(ExtractError::UnsupportedFormat)
        );
    }

    #[test]
    fn image_keeps_preview_url_and_bare_payload() {
        let data = b"not-really-a-png";
        let attachment = process_file("photo.png", "image/png", data).expect("attachment");

        assert_eq!(attachment.kind, AttachmentKind::Image);
        let encoded = B64.encode(data);
        assert_eq!(attachment.content, encoded);
        assert_eq!(
            attachment.preview_url.as_deref(),
            Some(format!("data:image/png;base64,{encoded}").as_str())
        );
    }

    #[test]
    fn plain_text_is_read_verbatim() {
        let attachment =
            process_file("notes.txt", "text/plain", "exercice 3, page 12".as_bytes())
                .expect("attachment");
        assert_eq!(attachment.kind, AttachmentKind::Document);
        assert_eq!(attachment.preview_url, None);
        assert_eq!(attachment.content, "exercice 3, page 12");
    }

    #[test]
    fn empty_extraction_is_an_error() {
        assert_eq!(
            process_file("vide.txt", "text/plain", b""),
            Err(ExtractError::EmptyContent)
        );
    }

    #[test]
    fn corrupt_docx_reports_a_single_decode_error() {
        assert_eq!(
            process_file("corrompu.docx", "application/octet-stream", b"not a zip archive"),
            Err(ExtractError::DecodeFailed)
        );
    }

    #[test]
    fn sheet_rows_render_as_a_markdown_table() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string(), "2".to_string()],
        ];
        assert_eq!(sheet_to_markdown(&rows), "| a | b |\n| --- | --- |\n| 1 | 2 |\n");
    }

    #[test]
    fn empty_sheet_renders_nothing() {
        assert_eq!(sheet_to_markdown(&[]), "");
    }
}

//! DOCX decoder: raw text from `word/document.xml` inside the zip container.
//!
//! Paragraphs end with a blank line, `<w:tab/>` becomes a tab and
//! `<w:br/>`/`<w:cr/>` a line break. Formatting, images and fields are ignored.

use std::io::{Cursor, Read};

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::extraction::normalize::normalize;
use crate::extraction::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Decodes a DOCX buffer into normalized text.
pub async fn decode_docx(bytes: Bytes) -> Result<String, ExtractionError> {
    let raw = tokio::task::spawn_blocking(move || docx_raw_text(&bytes)).await??;
    Ok(normalize(&raw))
}

/// Extracts the unnormalized text of the main document part.
pub fn docx_raw_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(ZipError::FileNotFound) => {
            return Err(ExtractionError::Docx(format!("missing {DOCUMENT_PART}")));
        }
        Err(e) => return Err(e.into()),
    }

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

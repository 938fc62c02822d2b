//! Word (`.docx`) text extraction.
//!
//! Reads the header parts, `word/document.xml` and the footer parts out of the OOXML archive, in
//! that order, and concatenates their `w:t` runs. Each paragraph is separated by a blank line,
//! `w:tab` becomes a tab and `w:br`/`w:cr` become line breaks. The result is trimmed.

use super::{DocumentFormat, ExtractionError};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(parse_error)?;

    let headers = parts_named(&archive, "header");
    let footers = parts_named(&archive, "footer");

    let mut text = String::new();
    for name in &headers {
        text.push_str(&collect_text(&read_part(&mut archive, name)?)?);
    }
    text.push_str(&collect_text(&read_part(&mut archive, DOCUMENT_PART)?)?);
    for name in &footers {
        text.push_str(&collect_text(&read_part(&mut archive, name)?)?);
    }

    Ok(text.trim().to_string())
}

/// `word/<kind>N.xml` parts, sorted by name.
fn parts_named<R: Read + Seek>(archive: &ZipArchive<R>, kind: &str) -> Vec<String> {
    let prefix = format!("word/{kind}");
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| {
            name.strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".xml"))
                .is_some_and(|number| number.chars().all(|c| c.is_ascii_digit()))
        })
        .map(ToString::to_string)
        .collect();
    names.sort();
    names
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, ExtractionError> {
    let mut part = archive.by_name(name).map_err(parse_error)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(parse_error)?;
    Ok(xml)
}

fn collect_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event().map_err(parse_error)? {
            Event::Start(element) => match element.name().as_ref() {
                b"w:t" => in_run_text = true,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::End(element) if element.name().as_ref() == b"w:t" => in_run_text = false,
            Event::Empty(element) => match element.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(content) if in_run_text => {
                text.push_str(&content.unescape().map_err(parse_error)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn parse_error(error: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Parse {
        format: DocumentFormat::Docx,
        detail: error.to_string(),
    }
}

use std::io::{Cursor, Read};

use anyhow::anyhow;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::{prompts::JSON_ONLY_SYSTEM, LlmClient};
use crate::resumes::prompts::extract_prompt;

/// Plain text of a resume file, chosen by its extension (with dot, lower-case).
pub async fn extract_text(data: Bytes, ext: &str) -> Result<String, AppError> {
    let text = match ext {
        ".pdf" => tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await
            .map_err(|e| AppError::UnprocessableEntity(format!("PDF could not be read: {e}")))?
            .map_err(|e| AppError::UnprocessableEntity(format!("PDF could not be read: {e}")))?,
        ".txt" => String::from_utf8_lossy(&data).into_owned(),
        ".rtf" => rtf_to_text(&String::from_utf8_lossy(&data)),
        ".docx" => docx_to_text(&data)?,
        ".doc" => {
            return Err(AppError::UnprocessableEntity(
                "Text extraction is not supported for .doc files".to_string(),
            ))
        }
        other => {
            return Err(AppError::Validation(format!("Unsupported file type: {other}")));
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the file".to_string(),
        ));
    }
    Ok(text)
}

/// Runs LLM extraction over resume text and stamps the upload source.
pub async fn parse_resume(llm: &LlmClient, text: &str) -> Result<Value, AppError> {
    info!("Starting resume processing ({} chars)", text.len());
    let parsed: Value = llm.call_json(&extract_prompt(text), JSON_ONLY_SYSTEM).await?;
    let parsed = stamp_source(parsed, Utc::now())?;
    info!("Resume processed successfully");
    Ok(parsed)
}

/// Sets `metadata.source = {type: "upload", uploaded_at}`, keeping other metadata.
pub fn stamp_source(parsed: Value, now: DateTime<Utc>) -> Result<Value, AppError> {
    let Value::Object(mut root) = parsed else {
        return Err(AppError::Llm("Resume extraction did not return an object".to_string()));
    };
    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(meta) = metadata {
        meta.insert(
            "source".to_string(),
            json!({"type": "upload", "uploaded_at": now.to_rfc3339()}),
        );
    }
    Ok(Value::Object(root))
}

/// Paragraph text of `word/document.xml`.
fn docx_to_text(data: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| AppError::UnprocessableEntity(format!("DOCX could not be opened: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::UnprocessableEntity(format!("DOCX has no document body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Internal(anyhow!("Failed to read DOCX body: {e}")))?;
    Ok(word_xml_to_text(&xml))
}

fn word_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    for chunk in xml.split('<').skip(1) {
        let (tag, rest) = chunk.split_once('>').unwrap_or((chunk, ""));
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");
        match name {
            "w:t" => in_text = !tag.ends_with('/'),
            "/w:t" => in_text = false,
            "/w:p" => out.push('\n'),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            _ => {}
        }
        if in_text && !rest.is_empty() {
            out.push_str(&unescape_xml(rest));
        }
    }
    debug!("Extracted {} chars from DOCX", out.len());
    out
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Drops RTF control words, header tables and braces; keeps paragraph breaks.
fn rtf_to_text(rtf: &str) -> String {
    const SKIP_DESTINATIONS: [&str; 5] = ["fonttbl", "colortbl", "stylesheet", "info", "pict"];

    let mut out = String::new();
    let mut chars = rtf.chars().peekable();
    let mut depth: usize = 0;
    // Depth at which an ignored group started.
    let mut skip_from: Option<usize> = None;

    while let Some(c) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                if skip_from == Some(depth) {
                    skip_from = None;
                }
                depth = depth.saturating_sub(1);
            }
            '\\' => {
                let Some(&next) = chars.peek() else { break };
                if next.is_ascii_alphabetic() {
                    let mut word = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_alphabetic() {
                            word.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_digit() || ch == '-' {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }
                    if skip_from.is_none() && SKIP_DESTINATIONS.contains(&word.as_str()) {
                        skip_from = Some(depth);
                    }
                    if skip_from.is_none() {
                        match word.as_str() {
                            "par" | "line" => out.push('\n'),
                            "tab" => out.push('\t'),
                            _ => {}
                        }
                    }
                } else {
                    chars.next();
                    match next {
                        '*' if skip_from.is_none() => skip_from = Some(depth),
                        '\'' => {
                            let hex: String = chars.by_ref().take(2).collect();
                            if skip_from.is_none() {
                                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                                    out.push(char::from(byte));
                                }
                            }
                        }
                        '\\' | '{' | '}' if skip_from.is_none() => out.push(next),
                        _ => {}
                    }
                }
            }
            '\r' | '\n' => {}
            _ if skip_from.is_none() => out.push(c),
            _ => {}
        }
    }
    out
}

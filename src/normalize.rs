//! Flattens an analysis payload into display lists.
//!
//! The payload comes from the analysis service and any part of it may be
//! missing or of the wrong shape. Every list falls back to empty; nothing here
//! fails.

use crate::i18n::{Locale, Strings};
use crate::types::{
    DisplayLists, ExternalImageItem, ExternalInfoItem, Recommendation, SimilarCase,
};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_RECORD_URL: &str = "/lightning/r/Case/{id}/view";
pub const DESCRIPTION_LIMIT: usize = 50;

#[derive(Clone, Debug)]
pub struct ResponseNormalizer<'a> {
    case_id: &'a str,
    locale: Locale,
    record_url: &'a str,
}

impl<'a> ResponseNormalizer<'a> {
    pub fn new(case_id: &'a str) -> Self {
        Self {
            case_id,
            locale: Locale::default(),
            record_url: DEFAULT_RECORD_URL,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// `template` must contain `{id}`.
    pub fn with_record_url(mut self, template: &'a str) -> Self {
        self.record_url = template;
        self
    }

    pub fn normalize(&self, payload: &Value) -> DisplayLists {
        DisplayLists {
            similar_cases: self.similar_cases(payload),
            external_info: self.external_info(payload),
            external_images: self.external_images(payload),
            recommendations: recommendations(payload),
        }
    }

    fn similar_cases(&self, payload: &Value) -> Vec<SimilarCase> {
        let Some(entries) = array_at(payload, "/case_analysis/similar_cases") else {
            debug!("no similar_cases in analysis payload");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(Value::as_object)
            .filter(|entry| {
                entry.get("Id").and_then(scalar_id).as_deref() != Some(self.case_id)
            })
            .map(|entry| {
                let mut fields = entry.clone();
                let id = fields.remove("Id").as_ref().and_then(scalar_id);
                let similarity = fields
                    .remove("similarity")
                    .as_ref()
                    .and_then(Value::as_f64)
                    .map(|raw| (raw * 100.0).round() as i64)
                    .unwrap_or(0);
                let url = match &id {
                    Some(id) => self.record_url.replace("{id}", id),
                    None => "#".to_string(),
                };
                SimilarCase {
                    id,
                    url,
                    similarity,
                    fields,
                }
            })
            .collect()
    }

    fn external_info(&self, payload: &Value) -> Vec<ExternalInfoItem> {
        let Some(results) = array_at(payload, "/external_info/results/results") else {
            return Vec::new();
        };
        let strings = self.locale.strings();

        results
            .iter()
            .map(|info| ExternalInfoItem {
                title: non_empty_str(info, "title")
                    .unwrap_or(strings.untitled)
                    .to_string(),
                url: non_empty_str(info, "url").unwrap_or("#").to_string(),
                similarity: info
                    .get("score")
                    .and_then(Value::as_f64)
                    .map(|score| (score * 100.0).floor() as i64)
                    .unwrap_or(0),
            })
            .collect()
    }

    fn external_images(&self, payload: &Value) -> Vec<ExternalImageItem> {
        let Some(images) = array_at(payload, "/external_info/results/images") else {
            return Vec::new();
        };
        let strings = self.locale.strings();

        images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let number = index + 1;
                let description = non_empty_str(image, "description");
                ExternalImageItem {
                    id: index.to_string(),
                    src: image.get("url").and_then(Value::as_str).map(str::to_string),
                    header: Strings::numbered(strings.image_header, number),
                    description: truncate_text(
                        description.unwrap_or(strings.image_description),
                        DESCRIPTION_LIMIT,
                    ),
                    alternative_text: description
                        .map(str::to_string)
                        .unwrap_or_else(|| Strings::numbered(strings.image_alt, number)),
                }
            })
            .collect()
    }
}

fn recommendations(payload: &Value) -> Vec<Recommendation> {
    let Some(entries) = array_at(payload, "/recommendations") else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let message = non_empty_str(entry, "message")?;
            Some(Recommendation {
                kind: non_empty_str(entry, "type").unwrap_or("info").to_string(),
                message: message.to_string(),
            })
        })
        .collect()
}

/// Shorthand for `ResponseNormalizer::new(case_id).normalize(payload)`.
pub fn normalize_response(payload: &Value, case_id: &str) -> DisplayLists {
    ResponseNormalizer::new(case_id).normalize(payload)
}

/// The assistant's reply carried by a payload, if any.
pub fn assistant_reply(payload: &Value) -> Option<&str> {
    non_empty_str(payload, "ai_response")
}

/// Keeps the first `max_chars` characters and appends `...` when the text is
/// longer than that.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Record ids may arrive as numbers; compare and link them by their text.
fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn array_at<'v>(payload: &'v Value, pointer: &str) -> Option<&'v Vec<Value>> {
    payload.pointer(pointer).and_then(Value::as_array)
}

fn non_empty_str<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

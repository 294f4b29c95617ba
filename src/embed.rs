//! Embed rendering
//!
//! Turns a `NotificationRecord` into the message payload the platform's
//! REST API accepts, enforcing its embed size limits.

use crate::sink::ImageRef;
use crate::types::NotificationRecord;
use serde::Serialize;

/// Maximum characters in an embed title
pub const MAX_TITLE_LEN: usize = 256;
/// Maximum characters in a field name
pub const MAX_FIELD_NAME_LEN: usize = 256;
/// Maximum characters in a field value
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
/// Maximum number of fields per embed
pub const MAX_FIELDS: usize = 25;

/// Message body with one embed and its attachment metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    pub embeds: Vec<Embed>,
    pub attachments: Vec<AttachmentMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub thumbnail: EmbedImage,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Describes the uploaded file at multipart index `id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentMeta {
    pub id: u32,
    pub filename: String,
}

/// Render a record as an embed
pub fn render(record: &NotificationRecord) -> Embed {
    let mut fields: Vec<EmbedField> = record
        .fields
        .iter()
        .map(|f| EmbedField {
            name: truncate(&f.label, MAX_FIELD_NAME_LEN),
            value: truncate(&f.value, MAX_FIELD_VALUE_LEN),
            inline: false,
        })
        .collect();

    if fields.len() > MAX_FIELDS {
        let omitted = fields.len() - (MAX_FIELDS - 1);
        fields.truncate(MAX_FIELDS - 1);
        fields.push(EmbedField {
            name: "…".to_string(),
            value: format!("{} meer niet weergegeven", omitted),
            inline: false,
        });
    }

    Embed {
        title: truncate(&record.title, MAX_TITLE_LEN),
        color: record.color.rgb(),
        thumbnail: EmbedImage {
            url: record.thumbnail.attachment_url(),
        },
        fields,
    }
}

/// Full message payload referencing `image` as attachment 0
pub fn message_payload(record: &NotificationRecord, image: &ImageRef) -> MessagePayload {
    MessagePayload {
        embeds: vec![render(record)],
        attachments: vec![AttachmentMeta {
            id: 0,
            filename: image.file_name.clone(),
        }],
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `…`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

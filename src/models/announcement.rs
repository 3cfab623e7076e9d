// src/models/announcement.rs

//! Announcements shown on the updates feed.
//!
//! The body is a list of typed content blocks. The backend stores it as a
//! JSON string in `data_json`; older rows only carry plain `content` and an
//! `image_url`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::de;
use crate::models::record::{FieldValue, Record};

const NO_CONTENT: &str = "No content found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 2] = [Self::Normal, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Urgent => "Urgent",
        }
    }

    /// Read a stored priority; anything but "Urgent" is normal.
    pub fn from_stored(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("urgent") => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::validation(format!("Unknown priority '{wanted}'")))
    }
}

/// One block of an announcement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ContentBlock {
    Text(String),
    /// First row is the header
    Table(Vec<Vec<String>>),
    BulletedList(Vec<String>),
    Image(String),
    File(String),
}

/// Raw row returned by `GET /api/announcements`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementDocument {
    #[serde(deserialize_with = "de::id")]
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub data_json: Option<Value>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub priority: Option<Value>,

    #[serde(default)]
    pub scheduled_at: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub views: Option<i64>,

    #[serde(default)]
    pub interactions: Option<i64>,
}

/// Decode an announcement body.
///
/// `data_json` wins when present: an array is read block by block (unknown
/// block types are skipped), any other JSON becomes one text block, and
/// unparseable text falls back to the plain content. Without `data_json`
/// the body is the plain content followed by the image.
pub fn content_blocks(
    data_json: Option<&Value>,
    content: Option<&str>,
    image_url: Option<&str>,
) -> Vec<ContentBlock> {
    let fallback = || vec![ContentBlock::Text(content.unwrap_or(NO_CONTENT).to_string())];

    let parsed = match data_json {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Unreadable data_json: {e}");
                return fallback();
            }
        },
        Some(value) => Some(value.clone()),
    };

    match parsed {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Some(other) => vec![ContentBlock::Text(other.to_string())],
        None => {
            let mut blocks = Vec::new();
            if let Some(text) = content.filter(|c| !c.trim().is_empty()) {
                blocks.push(ContentBlock::Text(text.to_string()));
            }
            if let Some(url) = image_url.filter(|u| !u.trim().is_empty()) {
                blocks.push(ContentBlock::Image(url.to_string()));
            }
            blocks
        }
    }
}

/// An announcement as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub content: Vec<ContentBlock>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub interactions: i64,
}

impl Announcement {
    pub fn from_document(doc: AnnouncementDocument) -> Self {
        let content = content_blocks(
            doc.data_json.as_ref(),
            doc.content.as_deref(),
            doc.image_url.as_deref(),
        );
        Self {
            id: doc.id,
            title: doc.title.unwrap_or_default(),
            priority: Priority::from_stored(doc.priority.as_ref()),
            content,
            scheduled_at: doc.scheduled_at.as_deref().and_then(de::timestamp),
            created_at: doc.created_at.as_deref().and_then(de::timestamp),
            views: doc.views.unwrap_or(0),
            interactions: doc.interactions.unwrap_or(0),
        }
    }

    /// First text block, used as a one-line summary.
    pub fn summary(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Columns of the announcement feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementField {
    Title,
    Summary,
    Priority,
    ScheduledAt,
    CreatedAt,
    Views,
}

impl FromStr for AnnouncementField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "summary" | "content" => Ok(Self::Summary),
            "priority" => Ok(Self::Priority),
            "scheduled" | "scheduled_at" => Ok(Self::ScheduledAt),
            "created" | "created_at" | "posted" => Ok(Self::CreatedAt),
            "views" => Ok(Self::Views),
            other => Err(AppError::validation(format!(
                "Unknown announcement column '{other}'"
            ))),
        }
    }
}

impl Record for Announcement {
    /// Announcements are cached per priority.
    type Kind = Priority;
    type Field = AnnouncementField;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Priority {
        self.priority
    }

    fn value(&self, field: AnnouncementField) -> FieldValue<'_> {
        match field {
            AnnouncementField::Title => FieldValue::text(Some(self.title.as_str())),
            AnnouncementField::Summary => FieldValue::text(self.summary()),
            AnnouncementField::Priority => FieldValue::Text(self.priority.as_str()),
            AnnouncementField::ScheduledAt => {
                FieldValue::integer(self.scheduled_at.map(|t| t.timestamp_millis()))
            }
            AnnouncementField::CreatedAt => {
                FieldValue::integer(self.created_at.map(|t| t.timestamp_millis()))
            }
            AnnouncementField::Views => FieldValue::Integer(self.views),
        }
    }
}

/// Body of `POST /api/announcements` and `PUT /api/announcements/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnouncementUpload {
    pub title: String,
    pub data_json: Vec<ContentBlock>,
    pub priority: Priority,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// `data:<mime>;base64,...` image, uploaded by the backend
    pub image_base64: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> AnnouncementDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reads_stringified_blocks() {
        let doc = document(json!({
            "id": "a1",
            "title": "Exam Schedule",
            "priority": "Urgent",
            "data_json": "[{\"type\":\"text\",\"value\":\"Dear Students\"},{\"type\":\"table\",\"value\":[[\"Subject\",\"Date\"],[\"Maths\",\"2025-10-25\"]]},{\"type\":\"video\",\"value\":\"x\"}]",
            "created_at": "2025-06-01T10:00:00.123456+00:00",
            "views": 4
        }));

        let announcement = Announcement::from_document(doc);
        assert_eq!(announcement.priority, Priority::Urgent);
        assert_eq!(announcement.content.len(), 2);
        assert_eq!(announcement.summary(), Some("Dear Students"));
        assert_eq!(
            announcement.content[1],
            ContentBlock::Table(vec![
                vec!["Subject".into(), "Date".into()],
                vec!["Maths".into(), "2025-10-25".into()],
            ])
        );
        assert!(announcement.created_at.is_some());
        assert_eq!(announcement.interactions, 0);
    }

    #[test]
    fn legacy_rows_use_content_and_image() {
        let doc = document(json!({
            "id": 7,
            "title": "Holiday",
            "content": "Campus closed",
            "image_url": "https://cdn/x.png",
            "priority": 2
        }));

        let announcement = Announcement::from_document(doc);
        assert_eq!(announcement.id, "7");
        assert_eq!(announcement.priority, Priority::Normal);
        assert_eq!(
            announcement.content,
            vec![
                ContentBlock::Text("Campus closed".into()),
                ContentBlock::Image("https://cdn/x.png".into()),
            ]
        );
    }

    #[test]
    fn unreadable_data_json_falls_back_to_content() {
        let blocks = content_blocks(Some(&json!("{not json")), None, None);
        assert_eq!(blocks, vec![ContentBlock::Text(NO_CONTENT.into())]);

        let blocks = content_blocks(Some(&json!({"note": "hi"})), None, None);
        assert_eq!(blocks, vec![ContentBlock::Text(r#"{"note":"hi"}"#.into())]);
    }

    #[test]
    fn upload_serializes_block_tags() {
        let upload = AnnouncementUpload {
            title: "Events".into(),
            data_json: vec![ContentBlock::BulletedList(vec!["Sports Day".into()])],
            priority: Priority::Normal,
            scheduled_at: None,
            image_base64: None,
        };
        assert_eq!(
            serde_json::to_value(&upload).unwrap(),
            json!({
                "title": "Events",
                "data_json": [{"type": "bulleted-list", "value": ["Sports Day"]}],
                "priority": "Normal",
                "scheduled_at": null,
                "image_base64": null
            })
        );
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert!("high".parse::<Priority>().is_err());
    }
}

//! Entrance exam records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::de;
use crate::models::record::{FieldValue, Record};

/// Which exam collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    /// National and state level exams
    General,
    /// Institute-specific exams
    College,
}

impl ExamKind {
    pub const ALL: [ExamKind; 2] = [Self::General, Self::College];

    /// Path segment of the collection endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::General => "exams",
            Self::College => "college-exams",
        }
    }
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::General => "General",
            Self::College => "College",
        })
    }
}

impl FromStr for ExamKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" | "exams" => Ok(Self::General),
            "college" | "college-exams" | "institutional" => Ok(Self::College),
            other => Err(AppError::validation(format!("Unknown exam kind '{other}'"))),
        }
    }
}

/// Coarse level shown on the exam category cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamLevel {
    National,
    State,
    Institutional,
    Other,
}

impl ExamLevel {
    pub const ALL: [ExamLevel; 4] = [
        Self::National,
        Self::State,
        Self::Institutional,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "National Level",
            Self::State => "State Level",
            Self::Institutional => "Institutional Level",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ExamLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        let short = wanted.strip_suffix(" level").unwrap_or(&wanted);
        match short {
            "national" => Ok(Self::National),
            "state" => Ok(Self::State),
            "institutional" | "college" => Ok(Self::Institutional),
            "other" => Ok(Self::Other),
            _ => Err(AppError::validation(format!("Unknown exam level '{}'", s.trim()))),
        }
    }
}

/// Envelope of the exam list endpoints.
#[derive(Debug, Deserialize)]
pub struct ExamListResponse {
    #[serde(default)]
    pub data: Vec<ExamDocument>,
}

/// Raw exam document.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamDocument {
    #[serde(default, deserialize_with = "optional_id")]
    pub uuid: Option<String>,

    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub views: Option<i64>,
}

fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

/// An exam as shown in the management table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exam {
    pub id: String,
    pub kind: ExamKind,
    pub name: String,
    pub exam_code: Option<String>,
    pub exam_type: Option<String>,
    pub category: Option<String>,
    pub organizing_body: Option<String>,
    pub mode: Option<String>,
    pub exam_dates: Option<String>,
    pub state_region: Option<String>,
    pub website: Option<String>,
    pub views: i64,
}

impl Exam {
    /// Map a backend document into a display record.
    ///
    /// Returns `None` when the document carries neither `uuid` nor `id`.
    pub fn from_document(doc: ExamDocument, kind: ExamKind) -> Option<Self> {
        let id = doc.uuid.or(doc.id)?;
        let data = &doc.data;

        Some(Self {
            id,
            kind,
            name: de::text(data, "Name")
                .or_else(|| de::text(data, "InstituteName"))
                .unwrap_or_default(),
            exam_code: de::text(data, "Exam Code"),
            exam_type: de::text(data, "Exam Type"),
            category: de::text(data, "Category"),
            organizing_body: de::text(data, "Organizing Body"),
            mode: de::text(data, "Mode of Exam"),
            exam_dates: de::text(data, "Exam Dates"),
            state_region: de::text(data, "State/Region"),
            website: de::text(data, "Official Website").or_else(|| de::text(data, "Website")),
            views: doc.views.unwrap_or(0),
        })
    }

    pub fn level(&self) -> ExamLevel {
        if self.kind == ExamKind::College {
            return ExamLevel::Institutional;
        }
        match self.exam_type.as_deref() {
            Some(t) if t.contains("National") => ExamLevel::National,
            Some(t) if t.contains("State") => ExamLevel::State,
            _ => ExamLevel::Other,
        }
    }
}

/// Columns of the exam table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamField {
    Name,
    Code,
    Type,
    Level,
    Category,
    OrganizingBody,
    Views,
}

impl FromStr for ExamField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "code" => Ok(Self::Code),
            "type" => Ok(Self::Type),
            "level" => Ok(Self::Level),
            "category" => Ok(Self::Category),
            "body" | "organizer" => Ok(Self::OrganizingBody),
            "views" => Ok(Self::Views),
            other => Err(AppError::validation(format!("Unknown exam column '{other}'"))),
        }
    }
}

impl Record for Exam {
    type Kind = ExamKind;
    type Field = ExamField;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ExamKind {
        self.kind
    }

    fn value(&self, field: ExamField) -> FieldValue<'_> {
        match field {
            ExamField::Name => FieldValue::text(Some(self.name.as_str())),
            ExamField::Code => FieldValue::text(self.exam_code.as_deref()),
            ExamField::Type => FieldValue::text(self.exam_type.as_deref()),
            ExamField::Level => FieldValue::Text(self.level().as_str()),
            ExamField::Category => FieldValue::text(self.category.as_deref()),
            ExamField::OrganizingBody => FieldValue::text(self.organizing_body.as_deref()),
            ExamField::Views => FieldValue::Integer(self.views),
        }
    }
}

/// Payload persisted by `POST /exams`.
#[derive(Debug, Clone, Serialize)]
pub struct ExamSubmission {
    pub basic_data: Map<String, Value>,
    pub full_details: Map<String, Value>,
}

/// Payload of the AI generation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub exam_name: String,
    pub raw_content: String,
}

// src/forms.rs

//! Input validation for the create and edit forms.
//!
//! Every form collects all of its field errors before failing, so the user
//! sees everything that needs fixing at once.

use std::path::Path;
use std::sync::LazyLock;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{AppError, FieldError, Result};
use crate::models::{
    AnnouncementUpload, CollegeType, CollegeUpload, ContentBlock, ExamSubmission,
    GenerateRequest, NewUser, Priority, Role, basic_data, de,
};

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Shortest accepted first or last name, in characters.
const MIN_NAME_LEN: usize = 2;

/// Summary columns holding whole numbers.
const INTEGER_FIELDS: [&str; 4] = ["NIRF 2024", "B.Tech Seats", "Establishment", "Institute Code"];

const PROGRAMMES: &str = "B.Tech Programmes";

fn finish<T>(errors: Vec<FieldError>, value: impl FnOnce() -> T) -> Result<T> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(AppError::Form(errors))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email.trim()))
}

// --- Users ---

/// The "invite admin" form.
#[derive(Debug, Clone, Default)]
pub struct InviteUserForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

impl InviteUserForm {
    pub fn validate(&self) -> Result<NewUser> {
        let mut errors = Vec::new();

        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }
        if self.first_name.trim().chars().count() < MIN_NAME_LEN {
            errors.push(FieldError::new(
                "first_name",
                "First name must be at least 2 characters",
            ));
        }
        if self.last_name.trim().chars().count() < MIN_NAME_LEN {
            errors.push(FieldError::new(
                "last_name",
                "Last name must be at least 2 characters",
            ));
        }
        let role = match self.role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                errors.push(FieldError::new("role", "Role must be admin, moderator or user"));
                None
            }
        };

        finish(errors, || NewUser {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: role.unwrap_or_default(),
        })
    }
}

// --- Colleges ---

/// The add/edit college form: summary fields plus the full data document.
#[derive(Debug, Clone, Default)]
pub struct CollegeForm {
    pub basic: Map<String, Value>,
    pub full_data: Map<String, Value>,
}

/// A college form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCollege {
    pub kind: CollegeType,
    pub upload: CollegeUpload,
}

impl CollegeForm {
    /// Read a form from a JSON document.
    ///
    /// Accepts either `{"basic_data": {...}, "full_data": {...}}` or a bare
    /// full-data object, whose summary keys then fill the basic fields.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(AppError::validation("College document must be a JSON object"));
        };

        if object.contains_key("full_data") || object.contains_key("basic_data") {
            let full_data = take_object(&mut object, "full_data")?;
            let mut basic = basic_data(&full_data);
            basic.extend(take_object(&mut object, "basic_data")?);
            return Ok(Self { basic, full_data });
        }

        Ok(Self {
            basic: basic_data(&object),
            full_data: object,
        })
    }

    /// Set one summary field from raw text input.
    pub fn set(&mut self, key: &str, input: &str) {
        self.basic
            .insert(key.to_string(), Value::String(input.to_string()));
    }

    pub fn validate(&self) -> Result<ValidCollege> {
        let mut errors = Vec::new();
        let mut basic = self.basic.clone();

        let name = basic
            .get("Name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            errors.push(FieldError::new("Name", "College name is required"));
        }

        let kind = match basic.get("Type").and_then(Value::as_str).map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("Type", "College type is required"));
                None
            }
            Some(raw) => match raw.parse::<CollegeType>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.push(FieldError::new("Type", "Type must be IIT, IIIT, NIT or GFTI"));
                    None
                }
            },
        };

        for key in INTEGER_FIELDS {
            match basic.get(key).map(parse_integer) {
                Some(Ok(Some(n))) => {
                    basic.insert(key.to_string(), Value::from(n));
                }
                Some(Ok(None)) => {
                    basic.remove(key);
                }
                Some(Err(())) => errors.push(FieldError::new(key, "Must be a whole number")),
                None => {}
            }
        }

        if let Some(Value::String(raw)) = basic.get(PROGRAMMES) {
            let programmes: Vec<Value> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Value::from)
                .collect();
            basic.insert(PROGRAMMES.to_string(), Value::Array(programmes));
        }

        if let Some(kind) = kind {
            basic.insert("Type".to_string(), Value::from(kind.as_str()));
        }
        basic.insert("Name".to_string(), Value::from(name.clone()));

        let mut full_data = self.full_data.clone();
        for (key, value) in &basic {
            full_data.insert(key.clone(), value.clone());
        }

        finish(errors, || ValidCollege {
            kind: kind.unwrap_or(CollegeType::Iit),
            upload: CollegeUpload {
                college_name: name,
                kind,
                basic_data: basic_data(&basic),
                full_data,
            },
        })
    }
}

fn take_object(object: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::validation(format!("'{key}' must be a JSON object"))),
    }
}

/// `Ok(None)` for blank input.
fn parse_integer(value: &Value) -> std::result::Result<Option<i64>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or(()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.trim().parse::<i64>().map(Some).map_err(|_| ()),
        _ => Err(()),
    }
}

// --- Exams ---

/// The add/edit exam form.
#[derive(Debug, Clone, Default)]
pub struct ExamForm {
    pub basic_data: Map<String, Value>,
    /// Raw JSON text of the detail sections
    pub full_details: String,
}

impl ExamForm {
    pub fn validate(&self) -> Result<ExamSubmission> {
        let mut errors = Vec::new();

        let has_name = self
            .basic_data
            .get("Name")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_name {
            errors.push(FieldError::new("Name", "Exam name is required"));
        }

        let full_details = match parse_details(&self.full_details) {
            Ok(map) => map,
            Err(message) => {
                errors.push(FieldError::new("full_details", message));
                Map::new()
            }
        };

        finish(errors, || ExamSubmission {
            basic_data: self.basic_data.clone(),
            full_details,
        })
    }
}

/// Parse the details text. Blank text is an empty object.
fn parse_details(text: &str) -> std::result::Result<Map<String, Value>, String> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Details must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON: {e}")),
    }
}

/// The "generate with AI" form.
#[derive(Debug, Clone, Default)]
pub struct GenerateForm {
    pub exam_name: String,
    pub raw_content: String,
}

impl GenerateForm {
    pub fn validate(&self) -> Result<GenerateRequest> {
        let mut errors = Vec::new();
        if self.exam_name.trim().is_empty() {
            errors.push(FieldError::new("exam_name", "Please enter the exam name"));
        }
        if self.raw_content.trim().is_empty() {
            errors.push(FieldError::new("raw_content", "Please enter the raw content"));
        }

        finish(errors, || GenerateRequest {
            exam_name: self.exam_name.trim().to_string(),
            raw_content: self.raw_content.clone(),
        })
    }
}

// --- Announcements ---

/// Layout of an announcement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    /// Free text
    #[default]
    Text,
    /// One row per line, cells separated by `|`; the first row is the header
    Table,
    /// One item per line
    BulletedList,
}

impl std::str::FromStr for Template {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            "list" | "bulleted-list" | "bullets" => Ok(Self::BulletedList),
            other => Err(AppError::validation(format!("Unknown template '{other}'"))),
        }
    }
}

/// An image attached to an announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    /// MIME type from the file extension, for the image types the feed shows.
    pub fn mime(&self) -> Option<&'static str> {
        let extension = Path::new(&self.file_name)
            .extension()?
            .to_str()?
            .to_lowercase();
        match extension.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// `data:<mime>;base64,...` as the backend expects.
    pub fn data_url(&self) -> Option<String> {
        let mime = self.mime()?;
        Some(format!("data:{mime};base64,{}", STANDARD.encode(&self.bytes)))
    }
}

/// The create/edit announcement form.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementForm {
    pub title: String,
    pub template: Template,
    pub body: String,
    /// Blank means normal
    pub priority: String,
    /// Blank for immediate; RFC 3339 or `YYYY-MM-DD`
    pub scheduled_at: String,
    pub image: Option<ImageAttachment>,
}

impl AnnouncementForm {
    pub fn validate(&self) -> Result<AnnouncementUpload> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }

        let blocks = match parse_body(self.template, &self.body) {
            Ok(blocks) => blocks,
            Err(message) => {
                errors.push(FieldError::new("body", message));
                Vec::new()
            }
        };

        let priority = if self.priority.trim().is_empty() {
            Some(Priority::Normal)
        } else {
            self.priority.parse::<Priority>().ok()
        };
        if priority.is_none() {
            errors.push(FieldError::new("priority", "Priority must be Normal or Urgent"));
        }

        let scheduled_at = match parse_schedule(&self.scheduled_at) {
            Ok(at) => at,
            Err(()) => {
                errors.push(FieldError::new(
                    "scheduled_at",
                    "Schedule must be a date (YYYY-MM-DD) or an RFC 3339 timestamp",
                ));
                None
            }
        };

        let image_base64 = match &self.image {
            None => None,
            Some(image) => {
                let url = image.data_url();
                if url.is_none() {
                    errors.push(FieldError::new(
                        "image",
                        "Image must be a PNG, JPEG, GIF or WebP file",
                    ));
                }
                url
            }
        };

        finish(errors, || AnnouncementUpload {
            title: title.to_string(),
            data_json: blocks,
            priority: priority.unwrap_or_default(),
            scheduled_at,
            image_base64,
        })
    }
}

fn parse_body(template: Template, body: &str) -> std::result::Result<Vec<ContentBlock>, String> {
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err("Content is required".to_string());
    }

    let block = match template {
        Template::Text => ContentBlock::Text(body.trim().to_string()),
        Template::BulletedList => ContentBlock::BulletedList(
            lines
                .iter()
                .map(|l| {
                    l.strip_prefix("- ")
                        .or_else(|| l.strip_prefix("* "))
                        .unwrap_or(l)
                        .trim()
                        .to_string()
                })
                .collect(),
        ),
        Template::Table => {
            let rows: Vec<Vec<String>> = lines
                .iter()
                .map(|l| l.split('|').map(|c| c.trim().to_string()).collect())
                .collect();
            let columns = rows[0].len();
            if rows.iter().any(|r| r.len() != columns) {
                return Err(format!("Every table row needs {columns} cells"));
            }
            ContentBlock::Table(rows)
        }
    };
    Ok(vec![block])
}

/// `Ok(None)` for blank input. A bare date is midnight UTC.
fn parse_schedule(input: &str) -> std::result::Result<Option<DateTime<Utc>>, ()> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Some(at) = de::timestamp(input) {
        return Ok(Some(at));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Some(t.and_utc()))
        .ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_names(err: AppError) -> Vec<&'static str> {
        match err {
            AppError::Form(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected form error, got {other:?}"),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(EMAIL.is_some());
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_invite_form_collects_every_error() {
        let form = InviteUserForm {
            email: "nope".into(),
            first_name: "A".into(),
            last_name: "".into(),
            role: "owner".into(),
        };
        assert_eq!(
            field_names(form.validate().unwrap_err()),
            vec!["email", "first_name", "last_name", "role"]
        );
    }

    #[test]
    fn test_invite_form_trims_input() {
        let form = InviteUserForm {
            email: " ada@example.com ".into(),
            first_name: "Ada ".into(),
            last_name: " Lovelace".into(),
            role: "Admin".into(),
        };
        let user = form.validate().unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_college_form_requires_name_and_type() {
        let form = CollegeForm::default();
        assert_eq!(field_names(form.validate().unwrap_err()), vec!["Name", "Type"]);
    }

    #[test]
    fn test_college_form_parses_fields() {
        let mut form = CollegeForm::from_value(json!({
            "Name": "NIT Trichy",
            "Type": "nit",
            "about": {"description": "Tiruchirappalli"}
        }))
        .unwrap();
        form.set("NIRF 2024", " 9 ");
        form.set("B.Tech Seats", "");
        form.set("B.Tech Programmes", "CSE, ECE,, ME ");

        let valid = form.validate().unwrap();
        assert_eq!(valid.kind, CollegeType::Nit);
        assert_eq!(valid.upload.college_name, "NIT Trichy");
        assert_eq!(valid.upload.kind, Some(CollegeType::Nit));

        let basic = &valid.upload.basic_data;
        assert_eq!(basic["Type"], "NIT");
        assert_eq!(basic["NIRF 2024"], 9);
        assert!(!basic.contains_key("B.Tech Seats"));
        assert_eq!(basic["B.Tech Programmes"], json!(["CSE", "ECE", "ME"]));
        assert!(!basic.contains_key("about"));
        assert!(valid.upload.full_data.contains_key("about"));
        assert_eq!(valid.upload.full_data["NIRF 2024"], 9);
    }

    #[test]
    fn test_college_form_rejects_bad_integers() {
        let mut form = CollegeForm::default();
        form.set("Name", "IIT Delhi");
        form.set("Type", "IIT");
        form.set("Establishment", "nineteen sixty");
        assert_eq!(field_names(form.validate().unwrap_err()), vec!["Establishment"]);
    }

    #[test]
    fn test_college_form_from_wrapped_document() {
        let form = CollegeForm::from_value(json!({
            "basic_data": {"Name": "IIIT Delhi", "Type": "IIIT"},
            "full_data": {"Name": "Old name", "Tier": "2"}
        }))
        .unwrap();
        assert_eq!(form.basic["Name"], "IIIT Delhi");
        assert_eq!(form.basic["Tier"], "2");
        assert!(CollegeForm::from_value(json!([1, 2])).is_err());
        assert!(CollegeForm::from_value(json!({"full_data": "x"})).is_err());
    }

    #[test]
    fn test_exam_form_details() {
        let mut basic = Map::new();
        basic.insert("Name".into(), json!("JEE Main"));

        let form = ExamForm {
            basic_data: basic.clone(),
            full_details: "  ".into(),
        };
        assert!(form.validate().unwrap().full_details.is_empty());

        let form = ExamForm {
            basic_data: basic.clone(),
            full_details: r#"{"Syllabus": {"Physics": []}}"#.into(),
        };
        assert!(form.validate().unwrap().full_details.contains_key("Syllabus"));

        let form = ExamForm {
            basic_data: basic,
            full_details: "[1]".into(),
        };
        assert_eq!(field_names(form.validate().unwrap_err()), vec!["full_details"]);
    }

    #[test]
    fn test_exam_form_requires_name() {
        let form = ExamForm {
            basic_data: Map::new(),
            full_details: "{not json".into(),
        };
        assert_eq!(
            field_names(form.validate().unwrap_err()),
            vec!["Name", "full_details"]
        );
    }

    #[test]
    fn test_generate_form() {
        let form = GenerateForm {
            exam_name: " ".into(),
            raw_content: "".into(),
        };
        assert_eq!(
            field_names(form.validate().unwrap_err()),
            vec!["exam_name", "raw_content"]
        );

        let form = GenerateForm {
            exam_name: "BITSAT".into(),
            raw_content: "Exam pattern...".into(),
        };
        assert_eq!(form.validate().unwrap().exam_name, "BITSAT");
    }

    #[test]
    fn test_announcement_form_collects_every_error() {
        let form = AnnouncementForm {
            title: " ".into(),
            template: Template::Text,
            body: "\n".into(),
            priority: "high".into(),
            scheduled_at: "next week".into(),
            image: Some(ImageAttachment {
                file_name: "notes.pdf".into(),
                bytes: vec![1],
            }),
        };
        assert_eq!(
            field_names(form.validate().unwrap_err()),
            vec!["title", "body", "priority", "scheduled_at", "image"]
        );
    }

    #[test]
    fn test_announcement_table_and_schedule() {
        let form = AnnouncementForm {
            title: "Exam Schedule".into(),
            template: Template::Table,
            body: "Subject | Date\nMathematics | 2025-10-25\n\nPhysics|2025-10-27".into(),
            priority: "urgent".into(),
            scheduled_at: "2025-10-20".into(),
            image: None,
        };
        let upload = form.validate().unwrap();
        assert_eq!(upload.priority, Priority::Urgent);
        assert_eq!(
            upload.scheduled_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-10-20T00:00:00+00:00")
        );
        assert_eq!(
            upload.data_json,
            vec![ContentBlock::Table(vec![
                vec!["Subject".into(), "Date".into()],
                vec!["Mathematics".into(), "2025-10-25".into()],
                vec!["Physics".into(), "2025-10-27".into()],
            ])]
        );

        let ragged = AnnouncementForm {
            body: "A | B\nonly one".into(),
            ..form
        };
        assert_eq!(field_names(ragged.validate().unwrap_err()), vec!["body"]);
    }

    #[test]
    fn test_announcement_list_and_image() {
        let form = AnnouncementForm {
            title: "College Event Calendar".into(),
            template: "bulleted-list".parse().unwrap(),
            body: "- Sports Day\n* Cultural Fest\nParent-Teacher Meeting".into(),
            image: Some(ImageAttachment {
                file_name: "poster.PNG".into(),
                bytes: b"png".to_vec(),
            }),
            ..AnnouncementForm::default()
        };
        let upload = form.validate().unwrap();
        assert_eq!(upload.priority, Priority::Normal);
        assert_eq!(upload.scheduled_at, None);
        assert_eq!(
            upload.data_json,
            vec![ContentBlock::BulletedList(vec![
                "Sports Day".into(),
                "Cultural Fest".into(),
                "Parent-Teacher Meeting".into(),
            ])]
        );
        assert_eq!(upload.image_base64.as_deref(), Some("data:image/png;base64,cG5n"));
    }
}

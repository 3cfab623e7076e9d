// src/models/college.rs

//! College records and the institute type table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::de;
use crate::models::record::{FieldValue, Record};

/// Sort order assigned to records the backend has not ordered yet.
const UNORDERED_BASE: i64 = 9999;

/// Institute category. Each one is served from its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollegeType {
    Iit,
    Iiit,
    Nit,
    Gfti,
}

impl CollegeType {
    /// Every type, in the order the dashboard fetches them.
    pub const ALL: [CollegeType; 4] = [Self::Iit, Self::Iiit, Self::Nit, Self::Gfti];

    /// Display label, also used by the delete endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iit => "IIT",
            Self::Iiit => "IIIT",
            Self::Nit => "NIT",
            Self::Gfti => "GFTI",
        }
    }

    /// Path segment of the per-type list endpoint.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Iit => "iit",
            Self::Iiit => "iiit",
            Self::Nit => "nit",
            Self::Gfti => "gfti",
        }
    }
}

impl fmt::Display for CollegeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollegeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::validation(format!("Unknown college type '{wanted}'")))
    }
}

/// Raw document returned by `GET /api/{slug}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollegeDocument {
    #[serde(deserialize_with = "de::id")]
    pub id: String,

    #[serde(default)]
    pub sort_order: Option<i64>,

    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A college as shown in the management table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct College {
    pub id: String,
    pub kind: CollegeType,
    pub sort_order: i64,
    pub name: String,
    pub institute_name: Option<String>,
    pub institute_code: Option<i64>,
    pub tier: Option<String>,
    pub nirf_2024: Option<i64>,
    pub establishment: Option<i64>,
    pub btech_seats: Option<i64>,
    pub btech_programmes: Vec<String>,
    pub website: Option<String>,
}

impl College {
    /// Map a backend document into a display record.
    ///
    /// `index` is the document's position in the response and orders
    /// records that carry no explicit `sort_order` after ordered ones.
    pub fn from_document(doc: CollegeDocument, kind: CollegeType, index: usize) -> Self {
        let data = &doc.data;
        let name = de::text(data, "Name")
            .or_else(|| de::text(data, "InstituteName"))
            .unwrap_or_default();

        Self {
            sort_order: doc.sort_order.unwrap_or(UNORDERED_BASE + index as i64),
            name,
            institute_name: de::text(data, "InstituteName"),
            institute_code: de::integer(data, "Institute Code"),
            tier: de::text(data, "Tier"),
            nirf_2024: de::integer(data, "NIRF 2024"),
            establishment: de::integer(data, "Establishment"),
            btech_seats: de::integer(data, "B.Tech Seats"),
            btech_programmes: de::list(data, "B.Tech Programmes"),
            website: de::text(data, "Website"),
            kind,
            id: doc.id,
        }
    }

    /// Number of B.Tech programmes offered, if known.
    pub fn programme_count(&self) -> Option<i64> {
        (!self.btech_programmes.is_empty()).then_some(self.btech_programmes.len() as i64)
    }
}

/// Columns of the college table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollegeField {
    Name,
    Type,
    Tier,
    Nirf2024,
    Establishment,
    BtechSeats,
    BtechProgrammes,
    SortOrder,
}

impl FromStr for CollegeField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "type" => Ok(Self::Type),
            "tier" => Ok(Self::Tier),
            "nirf" | "nirf2024" | "nirf_2024" => Ok(Self::Nirf2024),
            "established" | "establishment" => Ok(Self::Establishment),
            "seats" => Ok(Self::BtechSeats),
            "programmes" | "programs" => Ok(Self::BtechProgrammes),
            "order" | "sort_order" => Ok(Self::SortOrder),
            other => Err(AppError::validation(format!("Unknown college column '{other}'"))),
        }
    }
}

impl Record for College {
    type Kind = CollegeType;
    type Field = CollegeField;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> CollegeType {
        self.kind
    }

    fn value(&self, field: CollegeField) -> FieldValue<'_> {
        match field {
            CollegeField::Name => FieldValue::text(Some(self.name.as_str())),
            CollegeField::Type => FieldValue::Text(self.kind.as_str()),
            CollegeField::Tier => FieldValue::text(self.tier.as_deref()),
            CollegeField::Nirf2024 => FieldValue::integer(self.nirf_2024),
            CollegeField::Establishment => FieldValue::integer(self.establishment),
            CollegeField::BtechSeats => FieldValue::integer(self.btech_seats),
            CollegeField::BtechProgrammes => FieldValue::integer(self.programme_count()),
            CollegeField::SortOrder => FieldValue::Integer(self.sort_order),
        }
    }
}

/// Position update sent when the table is reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOrderItem {
    pub id: String,
    pub sort_order: i64,
}

/// Keys copied from a college's full data into its per-type summary row.
pub const ALLOWED_FIELDS: [&str; 10] = [
    "Name",
    "Tier",
    "Type",
    "Website",
    "NIRF 2024",
    "B.Tech Seats",
    "Establishment",
    "InstituteName",
    "Institute Code",
    "B.Tech Programmes",
];

/// Keep only the summary keys of `full_data`.
pub fn basic_data(full_data: &Map<String, Value>) -> Map<String, Value> {
    full_data
        .iter()
        .filter(|(key, _)| ALLOWED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Full record returned by `GET /api/college/{id}/{slug}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollegeDetail {
    #[serde(deserialize_with = "de::id")]
    pub uuid: String,

    #[serde(default)]
    pub college_name: Option<String>,

    pub institute_type: CollegeType,

    #[serde(default)]
    pub full_data: Map<String, Value>,

    #[serde(default)]
    pub basic_data: Map<String, Value>,
}

/// Body of an add or update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollegeUpload {
    pub college_name: String,

    /// Only sent when creating
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CollegeType>,

    pub full_data: Map<String, Value>,
    pub basic_data: Map<String, Value>,
}

// src/models/mod.rs

//! Domain models for the admin console.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod announcement;
mod college;
mod config;
pub(crate) mod de;
mod exam;
mod record;
mod user;

// Re-export all public types
pub use announcement::{
    Announcement, AnnouncementDocument, AnnouncementField, AnnouncementUpload, ContentBlock,
    Priority, content_blocks,
};
pub use college::{
    ALLOWED_FIELDS, College, CollegeDetail, CollegeDocument, CollegeField, CollegeType,
    CollegeUpload, SortOrderItem, basic_data,
};
pub use config::{
    AuthorizationPolicy, BackendConfig, Config, IdentityConfig, LoggingConfig, ViewConfig,
    BACKEND_URL_ENV, IDENTITY_SECRET_ENV,
};
pub use exam::{
    Exam, ExamDocument, ExamField, ExamKind, ExamLevel, ExamListResponse, ExamSubmission,
    GenerateRequest,
};
pub use record::{FieldValue, Record};
pub use user::{Caller, NewUser, Role, User, UserField, UserStatus};

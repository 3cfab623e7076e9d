//! Service layer for the admin console.
//!
//! This module contains the backend clients for:
//! - Announcements (`AnnouncementClient`)
//! - Colleges (`CollegeClient`)
//! - Exams and the exam generator (`ExamClient`)
//! - User accounts via the identity provider (`IdentityGateway`)

pub mod announcements;
pub mod colleges;
pub mod exams;
pub mod identity;

pub use announcements::AnnouncementClient;
pub use colleges::CollegeClient;
pub use exams::ExamClient;
pub use identity::{
    Authorizer, ClerkProvider, IdentityGateway, IdentityProvider, RoleAuthorizer,
    SignedInAuthorizer, UserDirectory, UserQuery,
};

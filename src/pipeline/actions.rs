// src/pipeline/actions.rs

//! Mutations triggered from a list view.
//!
//! Each action validates its input, calls the backend, and on success
//! reloads the owning view so it reflects the server state. Every outcome,
//! good or bad, is reported as a [`Notification`]; nothing here returns an
//! error.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::forms::{AnnouncementForm, CollegeForm, ExamForm, GenerateForm, InviteUserForm};
use crate::models::{
    Announcement, Caller, College, CollegeType, Exam, ExamKind, Record, Role, User,
};
use crate::pipeline::list_view::{FetchOutcome, ListView, RecordSource};
use crate::services::colleges::renumber;
use crate::services::{AnnouncementClient, CollegeClient, ExamClient, IdentityGateway};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

/// User-visible result of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            title: title.into(),
            description: None,
        }
    }

    /// Failure carrying the error's user-facing message.
    pub fn failure(title: impl Into<String>, error: &AppError) -> Self {
        Self {
            level: Level::Error,
            title: title.into(),
            description: Some(error.user_message()),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.level == Level::Success
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.title, description),
            None => f.write_str(&self.title),
        }
    }
}

/// Reload `view` after a successful mutation.
///
/// A failed reload is recorded on the view; the mutation itself already
/// succeeded, so it does not change the notification.
pub async fn refresh<R, S>(view: &mut ListView<R>, source: &S)
where
    R: Record,
    S: RecordSource<R> + ?Sized,
{
    match view.reload(source).await {
        Ok(FetchOutcome::Busy) => log::debug!("Refresh skipped: view is loading"),
        Ok(_) => {}
        Err(e) => log::warn!("Refresh after mutation failed: {e}"),
    }
}

/// Turn a mutation result into a notification, refreshing `view` on success.
pub async fn settle<R, S, T>(
    view: &mut ListView<R>,
    source: &S,
    outcome: Result<T>,
    on_success: impl FnOnce(T) -> Notification,
    failure_title: &str,
) -> Notification
where
    R: Record,
    S: RecordSource<R> + ?Sized,
{
    match outcome {
        Ok(value) => {
            let notification = on_success(value);
            refresh(view, source).await;
            notification
        }
        Err(e) => {
            log::warn!("{failure_title}: {e}");
            Notification::failure(failure_title, &e)
        }
    }
}

// --- Users ---

pub async fn create_user(
    gateway: &IdentityGateway,
    caller: &Caller,
    view: &mut ListView<User>,
    form: &InviteUserForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(new_user) => gateway.create_user(caller, &new_user).await,
        Err(e) => Err(e),
    };
    let directory = gateway.directory(caller.clone());
    settle(
        view,
        &directory,
        outcome,
        |user| {
            Notification::success("User created successfully").describe(format!(
                "{} will receive an email to set their password.",
                user.email
            ))
        },
        "Failed to create user",
    )
    .await
}

pub async fn delete_user(
    gateway: &IdentityGateway,
    caller: &Caller,
    view: &mut ListView<User>,
    user_id: &str,
) -> Notification {
    let outcome = gateway.delete_user(caller, user_id).await;
    let directory = gateway.directory(caller.clone());
    settle(
        view,
        &directory,
        outcome,
        |()| Notification::success("User deleted successfully"),
        "Failed to delete user",
    )
    .await
}

/// Change a role and patch the cached record in place.
pub async fn update_user_role(
    gateway: &IdentityGateway,
    caller: &Caller,
    view: &mut ListView<User>,
    user_id: &str,
    role: Role,
) -> Notification {
    match gateway.update_user_role(caller, user_id, role).await {
        Ok(user) => {
            view.replace_record(user);
            Notification::success("User role updated successfully")
        }
        Err(e) => {
            log::warn!("Failed to update role of {user_id}: {e}");
            Notification::failure("Failed to update user role", &e)
        }
    }
}

// --- Colleges ---

pub async fn add_college(
    client: &CollegeClient,
    view: &mut ListView<College>,
    form: &CollegeForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(valid) => client.add(&valid.upload).await.map(|()| valid.upload.college_name),
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |name| Notification::success("College added successfully").describe(name),
        "Failed to add college",
    )
    .await
}

pub async fn update_college(
    client: &CollegeClient,
    view: &mut ListView<College>,
    id: &str,
    kind: CollegeType,
    form: &CollegeForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(mut valid) => {
            valid.upload.kind = None;
            client.update(id, kind, &valid.upload).await
        }
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("College updated successfully"),
        "Failed to update college",
    )
    .await
}

pub async fn delete_college(
    client: &CollegeClient,
    view: &mut ListView<College>,
    id: &str,
    kind: CollegeType,
) -> Notification {
    let outcome = client.delete(id, kind).await;
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("Deleted"),
        "Error deleting",
    )
    .await
}

/// Save a new order for one type: `ids` in their new display order.
pub async fn reorder_colleges(
    client: &CollegeClient,
    view: &mut ListView<College>,
    kind: CollegeType,
    ids: &[String],
) -> Notification {
    let items = renumber(ids.iter().cloned());
    let outcome = client.reorder(kind, &items).await;
    settle(
        view,
        client,
        outcome,
        |()| Notification::success(format!("Updated order for {kind}")),
        &format!("Failed to save sort order for {kind}"),
    )
    .await
}

// --- Exams ---

pub async fn delete_exam(
    client: &ExamClient,
    view: &mut ListView<Exam>,
    kind: ExamKind,
    id: &str,
) -> Notification {
    let outcome = client.delete(kind, id).await;
    let label = match kind {
        ExamKind::General => "Exam",
        ExamKind::College => "College exam",
    };
    settle(
        view,
        client,
        outcome,
        |()| Notification::success(format!("{label} deleted successfully")),
        "Failed to delete. Please try again.",
    )
    .await
}

pub async fn save_exam(
    client: &ExamClient,
    view: &mut ListView<Exam>,
    form: &ExamForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(submission) => client.save(&submission).await,
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("Exam saved successfully!"),
        "Failed to save exam",
    )
    .await
}

pub async fn update_exam(
    client: &ExamClient,
    view: &mut ListView<Exam>,
    kind: ExamKind,
    id: &str,
    form: &ExamForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(submission) => client.update(kind, id, &submission).await,
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("Exam updated successfully!"),
        "Failed to update exam. Please try again.",
    )
    .await
}

/// Draft exam details with the generator. No view changes.
pub async fn generate_exam_json(
    client: &ExamClient,
    form: &GenerateForm,
) -> (Notification, Option<Map<String, Value>>) {
    let outcome = match form.validate() {
        Ok(request) => client.generate_json(&request).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(details) => (
            Notification::success("Full details JSON generated!"),
            Some(details),
        ),
        Err(e) => {
            log::warn!("Generation failed: {e}");
            (Notification::failure("Error", &e), None)
        }
    }
}

// --- Announcements ---

pub async fn create_announcement(
    client: &AnnouncementClient,
    view: &mut ListView<Announcement>,
    form: &AnnouncementForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(upload) => client.add(&upload).await.map(|()| upload.title),
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |title| Notification::success("Announcement created successfully").describe(title),
        "Failed to create announcement",
    )
    .await
}

pub async fn update_announcement(
    client: &AnnouncementClient,
    view: &mut ListView<Announcement>,
    id: &str,
    form: &AnnouncementForm,
) -> Notification {
    let outcome = match form.validate() {
        Ok(upload) => client.update(id, &upload).await,
        Err(e) => Err(e),
    };
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("Announcement updated successfully"),
        "Failed to update announcement",
    )
    .await
}

pub async fn delete_announcement(
    client: &AnnouncementClient,
    view: &mut ListView<Announcement>,
    id: &str,
) -> Notification {
    let outcome = client.delete(id).await;
    settle(
        view,
        client,
        outcome,
        |()| Notification::success("Announcement deleted successfully"),
        "Failed to delete announcement",
    )
    .await
}

//! List-view pipeline and the actions that feed it.
//!
//! Fetched records are cached per type, then filtered, sorted and paged
//! on demand:
//! - `cache`: `TypedCache`, records grouped by type in fetch order
//! - `derive`: pure filter/sort/paginate functions
//! - `list_view`: `ListView`, the stateful view with stale-fetch protection
//! - `actions`: mutations that refresh a view and report a `Notification`

pub mod actions;
mod cache;
mod derive;
mod list_view;

pub use actions::{Level, Notification};
pub use cache::TypedCache;
pub use derive::{
    DerivedPage, Direction, SortSpec, clamp_page, derive_page, facet, filter, paginate, sort,
    total_pages,
};
pub use list_view::{
    FetchOutcome, FetchTicket, ListView, ListViewConfig, RecordSource, Selection, ViewState,
};

use crate::models::{
    Announcement, AnnouncementField, College, CollegeField, CollegeType, Config, Exam, ExamField,
    ExamKind, Priority, Role, User, UserField,
};

/// College table: one kind per institute type, kept in backend order.
pub fn college_view(config: &Config) -> ListViewConfig<College> {
    ListViewConfig::new(CollegeType::ALL)
        .search(vec![CollegeField::Name, CollegeField::Type])
        .sortable(vec![
            CollegeField::Name,
            CollegeField::Type,
            CollegeField::Tier,
            CollegeField::Nirf2024,
            CollegeField::Establishment,
            CollegeField::BtechSeats,
            CollegeField::BtechProgrammes,
        ])
        .default_sort(SortSpec::asc(CollegeField::SortOrder))
        .page_size(config.view.page_size)
        .fetch_concurrency(config.backend.fetch_concurrency)
}

/// Exam table: general and college exams, filterable by level.
pub fn exam_view(config: &Config) -> ListViewConfig<Exam> {
    ListViewConfig::new(ExamKind::ALL)
        .search(vec![ExamField::Name, ExamField::Code, ExamField::OrganizingBody])
        .sortable(vec![ExamField::Name, ExamField::Type, ExamField::Views])
        .facet(ExamField::Level)
        .page_size(config.view.page_size)
        .fetch_concurrency(config.backend.fetch_concurrency)
}

/// User table: admin accounts, newest first.
pub fn user_view(config: &Config) -> ListViewConfig<User> {
    ListViewConfig::new(vec![Role::Admin])
        .search(vec![UserField::Name, UserField::Email, UserField::Phone])
        .sortable(vec![
            UserField::Name,
            UserField::Email,
            UserField::Role,
            UserField::CreatedAt,
        ])
        .default_sort(SortSpec {
            field: UserField::CreatedAt,
            direction: Direction::Desc,
        })
        .page_size(config.view.page_size)
}

/// Announcement feed: one kind per priority, newest first.
pub fn announcement_view(config: &Config) -> ListViewConfig<Announcement> {
    ListViewConfig::new(Priority::ALL)
        .search(vec![AnnouncementField::Title, AnnouncementField::Summary])
        .sortable(vec![
            AnnouncementField::Title,
            AnnouncementField::Priority,
            AnnouncementField::ScheduledAt,
            AnnouncementField::CreatedAt,
            AnnouncementField::Views,
        ])
        .default_sort(SortSpec {
            field: AnnouncementField::CreatedAt,
            direction: Direction::Desc,
        })
        .page_size(config.view.page_size)
        .fetch_concurrency(config.backend.fetch_concurrency)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::Result;
    use crate::models::ExamLevel;

    struct Exams(Vec<Exam>);

    #[async_trait]
    impl RecordSource<Exam> for Exams {
        async fn fetch(&self, kind: ExamKind) -> Result<Vec<Exam>> {
            Ok(self.0.iter().filter(|e| e.kind == kind).cloned().collect())
        }
    }

    fn exam(id: &str, kind: ExamKind, exam_type: Option<&str>) -> Exam {
        Exam {
            id: id.to_string(),
            kind,
            name: format!("Exam {id}"),
            exam_code: None,
            exam_type: exam_type.map(str::to_string),
            category: None,
            organizing_body: None,
            mode: None,
            exam_dates: None,
            state_region: None,
            website: None,
            views: 0,
        }
    }

    #[test]
    fn presets_follow_config() {
        let mut config = Config::default();
        config.view.page_size = 25;
        config.backend.fetch_concurrency = 4;

        let colleges = college_view(&config);
        assert_eq!(colleges.kinds, CollegeType::ALL.to_vec());
        assert_eq!(colleges.page_size, 25);
        assert_eq!(colleges.fetch_concurrency, 4);
        assert!(!colleges.sort_fields.contains(&CollegeField::SortOrder));

        let users = user_view(&config);
        assert_eq!(users.kinds, vec![Role::Admin]);
        assert_eq!(users.fetch_concurrency, 1);
        assert_eq!(
            users.default_sort.map(|s| s.direction),
            Some(Direction::Desc)
        );

        let announcements = announcement_view(&config);
        assert_eq!(announcements.kinds, Priority::ALL.to_vec());
        assert_eq!(announcements.page_size, 25);

        let exams = exam_view(&config);
        assert_eq!(exams.kinds, ExamKind::ALL.to_vec());
        assert_eq!(exams.facet_field, Some(ExamField::Level));
    }

    #[tokio::test]
    async fn exam_levels_filter_the_table() {
        let source = Exams(vec![
            exam("1", ExamKind::General, Some("National Level")),
            exam("2", ExamKind::General, Some("State Level Exam")),
            exam("3", ExamKind::College, None),
            exam("4", ExamKind::General, Some("National")),
        ]);
        let mut view = ListView::new(exam_view(&Config::default()));
        view.select_type(&source, Selection::All).await.unwrap();

        let ids = |view: &ListView<Exam>| -> Vec<String> {
            view.page().rows.iter().map(|e| e.id.clone()).collect()
        };

        assert!(view.set_facet(Some(ExamLevel::National.as_str())));
        assert_eq!(ids(&view), vec!["1", "4"]);

        view.set_facet(Some(ExamLevel::State.as_str()));
        assert_eq!(ids(&view), vec!["2"]);

        view.set_facet(Some(ExamLevel::Institutional.as_str()));
        assert_eq!(ids(&view), vec!["3"]);

        view.set_facet(None);
        assert_eq!(view.filtered_count(), 4);
    }
}

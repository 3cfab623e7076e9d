// src/services/announcements.rs

//! Announcement backend client.
//!
//! The backend serves every announcement from one endpoint, newest first.
//! The feed is cached per priority, so a per-priority fetch filters the
//! full list.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{
    Announcement, AnnouncementDocument, AnnouncementUpload, BackendConfig, Priority,
};
use crate::pipeline::RecordSource;
use crate::utils::endpoint;
use crate::utils::http::{self, create_async_client};

/// HTTP client for `/api/announcements`.
#[derive(Debug, Clone)]
pub struct AnnouncementClient {
    client: Client,
    base_url: String,
}

impl AnnouncementClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self::with_client(
            create_async_client(config)?,
            config.base_url.clone(),
        ))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Every announcement, in backend order.
    pub async fn list(&self) -> Result<Vec<Announcement>> {
        let url = endpoint(&self.base_url, &["api", "announcements"])?;
        let response = self.client.get(url).send().await?;
        let documents: Vec<AnnouncementDocument> =
            http::read_json(response, "Fetch announcements").await?;

        let announcements: Vec<Announcement> = documents
            .into_iter()
            .map(Announcement::from_document)
            .collect();
        log::info!("Fetched {} announcements", announcements.len());
        Ok(announcements)
    }

    /// Announcements of one priority.
    pub async fn list_priority(&self, priority: Priority) -> Result<Vec<Announcement>> {
        Ok(by_priority(self.list().await?, priority))
    }

    pub async fn add(&self, upload: &AnnouncementUpload) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "announcements"])?;
        let response = self.client.post(url).json(upload).send().await?;
        http::check_status(response, "Create announcement").await?;
        log::info!("Created announcement '{}'", upload.title);
        Ok(())
    }

    pub async fn update(&self, id: &str, upload: &AnnouncementUpload) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "announcements", id])?;
        let response = self.client.put(url).json(upload).send().await?;
        http::check_status(response, &format!("Update announcement {id}")).await?;
        log::info!("Updated announcement {id}");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "announcements", id])?;
        let response = self.client.delete(url).send().await?;
        http::check_status(response, &format!("Delete announcement {id}")).await?;
        log::info!("Deleted announcement {id}");
        Ok(())
    }
}

fn by_priority(announcements: Vec<Announcement>, priority: Priority) -> Vec<Announcement> {
    announcements
        .into_iter()
        .filter(|a| a.priority == priority)
        .collect()
}

#[async_trait]
impl RecordSource<Announcement> for AnnouncementClient {
    async fn fetch(&self, priority: Priority) -> Result<Vec<Announcement>> {
        self.list_priority(priority).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn announcement(id: &str, priority: &str) -> Announcement {
        let doc: AnnouncementDocument = serde_json::from_value(json!({
            "id": id,
            "title": format!("Notice {id}"),
            "priority": priority
        }))
        .unwrap();
        Announcement::from_document(doc)
    }

    #[test]
    fn test_by_priority_keeps_order() {
        let all = vec![
            announcement("1", "Urgent"),
            announcement("2", "Normal"),
            announcement("3", "Urgent"),
        ];
        let ids: Vec<_> = by_priority(all, Priority::Urgent)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_client_from_config() {
        let client = AnnouncementClient::new(&BackendConfig::default()).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}

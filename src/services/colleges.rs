// src/services/colleges.rs

//! College backend client.
//!
//! Each institute type has its own list endpoint; single-record operations
//! address a college by id plus its type.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::{
    BackendConfig, College, CollegeDetail, CollegeDocument, CollegeType, CollegeUpload,
    SortOrderItem,
};
use crate::pipeline::RecordSource;
use crate::utils::endpoint;
use crate::utils::http::{self, create_async_client};

#[derive(Serialize)]
struct ReorderRequest<'a> {
    category: CollegeType,
    items: &'a [SortOrderItem],
}

/// HTTP client for the college endpoints.
#[derive(Debug, Clone)]
pub struct CollegeClient {
    client: Client,
    base_url: String,
}

impl CollegeClient {
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

    /// Every college of one type, ordered by `sort_order`.
    pub async fn list(&self, kind: CollegeType) -> Result<Vec<College>> {
        let url = endpoint(&self.base_url, &["api", kind.slug()])?;
        let response = self.client.get(url).send().await?;
        let documents: Vec<CollegeDocument> =
            http::read_json(response, &format!("Fetch {kind}")).await?;

        let mut colleges: Vec<College> = documents
            .into_iter()
            .enumerate()
            .map(|(index, doc)| College::from_document(doc, kind, index))
            .collect();
        colleges.sort_by_key(|c| c.sort_order);

        log::info!("Fetched {} {} colleges", colleges.len(), kind);
        Ok(colleges)
    }

    /// Full and summary data of one college.
    pub async fn get(&self, id: &str, kind: CollegeType) -> Result<CollegeDetail> {
        let url = endpoint(&self.base_url, &["api", "college", id, kind.slug()])?;
        let response = self.client.get(url).send().await?;
        http::read_json(response, &format!("Fetch college {id}")).await
    }

    pub async fn add(&self, upload: &CollegeUpload) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "add-college"])?;
        let response = self.client.post(url).json(upload).send().await?;
        http::check_status(response, "Add college").await?;
        log::info!("Added college '{}'", upload.college_name);
        Ok(())
    }

    pub async fn update(&self, id: &str, kind: CollegeType, upload: &CollegeUpload) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "college", id, kind.slug()])?;
        let response = self.client.put(url).json(upload).send().await?;
        http::check_status(response, &format!("Update college {id}")).await?;
        log::info!("Updated college {id} ({kind})");
        Ok(())
    }

    pub async fn delete(&self, id: &str, kind: CollegeType) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "college", id, kind.as_str()])?;
        let response = self.client.delete(url).send().await?;
        http::check_status(response, &format!("Delete college {id}")).await?;
        log::info!("Deleted college {id} ({kind})");
        Ok(())
    }

    /// Persist a new display order for one type.
    pub async fn reorder(&self, kind: CollegeType, items: &[SortOrderItem]) -> Result<()> {
        let url = endpoint(&self.base_url, &["api", "update-college-order"])?;
        let body = ReorderRequest {
            category: kind,
            items,
        };
        let response = self.client.post(url).json(&body).send().await?;
        http::check_status(response, &format!("Reorder {kind}")).await?;
        log::info!("Saved order of {} {} colleges", items.len(), kind);
        Ok(())
    }
}

#[async_trait]
impl RecordSource<College> for CollegeClient {
    async fn fetch(&self, kind: CollegeType) -> Result<Vec<College>> {
        self.list(kind).await
    }
}

/// Number `ids` 1, 2, 3... in the given order.
pub fn renumber<I, S>(ids: I) -> Vec<SortOrderItem>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter()
        .zip(1..)
        .map(|(id, sort_order)| SortOrderItem {
            id: id.into(),
            sort_order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber_starts_at_one() {
        let items = renumber(["c", "a", "b"]);
        let orders: Vec<_> = items.iter().map(|i| (i.id.as_str(), i.sort_order)).collect();
        assert_eq!(orders, vec![("c", 1), ("a", 2), ("b", 3)]);
    }

    #[test]
    fn test_reorder_body_shape() {
        let items = renumber(["x"]);
        let body = serde_json::to_value(ReorderRequest {
            category: CollegeType::Gfti,
            items: &items,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"category": "GFTI", "items": [{"id": "x", "sort_order": 1}]})
        );
    }

    #[test]
    fn test_client_from_config() {
        let client = CollegeClient::new(&BackendConfig::default()).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::connection::ValueList;
use super::{AzureConnection, ClientError, WorkItemApi, MAX_BATCH_SIZE};
use crate::models::WorkItem;

/// `POST _apis/wit/workitemsbatch`.
#[derive(Debug, Clone)]
pub struct WorkItemsClient {
    connection: Arc<AzureConnection>,
}

impl WorkItemsClient {
    pub fn new(connection: Arc<AzureConnection>) -> Self {
        Self { connection }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    ids: &'a [u64],
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [String],
    /// Unknown ids come back as `null` instead of failing the batch.
    error_policy: &'static str,
}

fn no_fields(fields: &&[String]) -> bool {
    fields.is_empty()
}

#[async_trait]
impl WorkItemApi for WorkItemsClient {
    async fn get_work_items(
        &self,
        project: &str,
        ids: &[u64],
        fields: &[String],
    ) -> Result<Vec<WorkItem>, ClientError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(ClientError::BadRequest(format!(
                "{} ids requested, at most {} per batch",
                ids.len(),
                MAX_BATCH_SIZE
            )));
        }

        let url = self
            .connection
            .api_url(project, "wit/workitemsbatch?api-version=7.1");
        let body = BatchRequest {
            ids,
            fields,
            error_policy: "omit",
        };
        let list: ValueList<Option<WorkItem>> = self.connection.post_json(&url, &body).await?;
        Ok(list.value.into_iter().flatten().collect())
    }
}

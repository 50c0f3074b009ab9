use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};

use crate::domain::model::{Page, SchemaObject};
use crate::domain::ports::SchemaStore;
use crate::utils::error::{ActionError, Result};

/// Schema registry objects in one S3 bucket.
#[derive(Debug, Clone)]
pub struct S3SchemaStore {
    client: S3Client,
    bucket: String,
}

impl S3SchemaStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Client from the default credential chain.
    pub async fn from_region(region: &str, bucket: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(S3Client::new(&config), bucket)
    }
}

#[async_trait]
impl SchemaStore for S3SchemaStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self, prefix: &str, cursor: Option<String>) -> Result<Page<SchemaObject>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(cursor)
            .send()
            .await
            .map_err(|e| {
                ActionError::upstream(
                    format!("error listing objects for bucket {:?} and prefix {:?}", self.bucket, prefix),
                    DisplayErrorContext(&e),
                )
            })?;

        let items = output
            .contents()
            .iter()
            .filter_map(|object| {
                let modified = object.last_modified()?;
                Some(SchemaObject {
                    key: object.key().unwrap_or_default().to_string(),
                    last_modified: DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos())?,
                })
            })
            .collect();

        Ok(Page {
            items,
            next: output.next_continuation_token().map(str::to_string),
        })
    }
}

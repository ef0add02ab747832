//! DynamoDB record store client.

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use vpress_models::CompressionRecord;

use crate::error::{RecordError, RecordResult};
use crate::item::{from_item, to_item, ATTR_COMPRESSED, ATTR_USERNAME};
use crate::retry::{with_retry, RetryConfig};

/// Configuration for the record store.
#[derive(Debug, Clone)]
pub struct RecordsConfig {
    /// Table name
    pub table_name: String,
    /// Region
    pub region: String,
    /// Retry policy
    pub retry: RetryConfig,
}

impl RecordsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        Ok(Self {
            table_name: std::env::var("DYNAMO_TABLE_NAME")
                .map_err(|_| RecordError::config_error("DYNAMO_TABLE_NAME not set"))?,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "ap-southeast-2".to_string()),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Typed client over the result record table.
///
/// Keyed by `(username, compressedFilename)`. Records are written once
/// per completed job and only ever deleted, never updated.
#[derive(Clone)]
pub struct RecordStore {
    client: Client,
    table: String,
    retry: RetryConfig,
}

impl RecordStore {
    /// Create a new record store from configuration.
    pub async fn new(config: RecordsConfig) -> RecordResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new(config.region.clone()))
            .load()
            .await;

        Ok(Self {
            client: Client::new(&sdk_config),
            table: config.table_name,
            retry: config.retry,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> RecordResult<Self> {
        Self::new(RecordsConfig::from_env()?).await
    }

    /// Write a result record.
    pub async fn put_record(&self, record: &CompressionRecord) -> RecordResult<()> {
        let item = to_item(record);

        with_retry(&self.retry, "put_record", || {
            let item = item.clone();
            async move {
                self.client
                    .put_item()
                    .table_name(&self.table)
                    .set_item(Some(item))
                    .send()
                    .await
                    .map_err(|e| RecordError::from_sdk_message(e.to_string()))?;
                Ok(())
            }
        })
        .await?;

        info!(
            username = %record.username,
            compressed = %record.compressed_filename,
            "Wrote compression record"
        );
        Ok(())
    }

    /// Query all records belonging to an owner. Order is unspecified;
    /// callers sort as they see fit.
    pub async fn query_by_owner(&self, username: &str) -> RecordResult<Vec<CompressionRecord>> {
        debug!("Querying records for {}", username);

        let output = with_retry(&self.retry, "query_by_owner", || async {
            self.client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#u = :u")
                .expression_attribute_names("#u", ATTR_USERNAME)
                .expression_attribute_values(":u", AttributeValue::S(username.to_string()))
                .send()
                .await
                .map_err(|e| RecordError::from_sdk_message(e.to_string()))
        })
        .await?;

        let mut records = Vec::new();
        for item in output.items() {
            records.push(from_item(item)?);
        }
        Ok(records)
    }

    /// Fetch one record, if present.
    pub async fn get_record(
        &self,
        username: &str,
        compressed_filename: &str,
    ) -> RecordResult<Option<CompressionRecord>> {
        let output = with_retry(&self.retry, "get_record", || async {
            self.client
                .get_item()
                .table_name(&self.table)
                .key(ATTR_USERNAME, AttributeValue::S(username.to_string()))
                .key(
                    ATTR_COMPRESSED,
                    AttributeValue::S(compressed_filename.to_string()),
                )
                .send()
                .await
                .map_err(|e| RecordError::from_sdk_message(e.to_string()))
        })
        .await?;

        match output.item() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Delete one record.
    pub async fn delete_record(
        &self,
        username: &str,
        compressed_filename: &str,
    ) -> RecordResult<()> {
        with_retry(&self.retry, "delete_record", || async {
            self.client
                .delete_item()
                .table_name(&self.table)
                .key(ATTR_USERNAME, AttributeValue::S(username.to_string()))
                .key(
                    ATTR_COMPRESSED,
                    AttributeValue::S(compressed_filename.to_string()),
                )
                .send()
                .await
                .map_err(|e| RecordError::from_sdk_message(e.to_string()))?;
            Ok(())
        })
        .await?;

        info!(
            username = %username,
            compressed = %compressed_filename,
            "Deleted compression record"
        );
        Ok(())
    }
}

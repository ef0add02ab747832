//! Conversion between `CompressionRecord` and DynamoDB items.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use vpress_models::CompressionRecord;

use crate::error::{RecordError, RecordResult};

/// Partition key attribute.
pub const ATTR_USERNAME: &str = "username";
/// Sort key attribute.
pub const ATTR_COMPRESSED: &str = "compressedFilename";

const ATTR_ORIGINAL: &str = "originalFilename";
const ATTR_UPLOAD_DATE: &str = "uploadDate";
const ATTR_ORIGINAL_SIZE: &str = "originalSizeBytes";
const ATTR_COMPRESSED_SIZE: &str = "compressedSizeBytes";
const ATTR_S3_KEY: &str = "s3Key";

/// Serialize a record to a DynamoDB item.
pub fn to_item(record: &CompressionRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        ATTR_USERNAME.to_string(),
        AttributeValue::S(record.username.clone()),
    );
    item.insert(
        ATTR_COMPRESSED.to_string(),
        AttributeValue::S(record.compressed_filename.clone()),
    );
    item.insert(
        ATTR_ORIGINAL.to_string(),
        AttributeValue::S(record.original_filename.clone()),
    );
    item.insert(
        ATTR_UPLOAD_DATE.to_string(),
        AttributeValue::S(record.upload_date.to_rfc3339()),
    );
    item.insert(
        ATTR_ORIGINAL_SIZE.to_string(),
        AttributeValue::N(record.original_size_bytes.to_string()),
    );
    item.insert(
        ATTR_COMPRESSED_SIZE.to_string(),
        AttributeValue::N(record.compressed_size_bytes.to_string()),
    );
    item.insert(
        ATTR_S3_KEY.to_string(),
        AttributeValue::S(record.s3_key.clone()),
    );
    item
}

/// Deserialize a DynamoDB item into a record.
pub fn from_item(item: &HashMap<String, AttributeValue>) -> RecordResult<CompressionRecord> {
    Ok(CompressionRecord {
        username: get_s(item, ATTR_USERNAME)?,
        original_filename: get_s(item, ATTR_ORIGINAL)?,
        compressed_filename: get_s(item, ATTR_COMPRESSED)?,
        upload_date: parse_date(&get_s(item, ATTR_UPLOAD_DATE)?)?,
        original_size_bytes: get_n(item, ATTR_ORIGINAL_SIZE)?,
        compressed_size_bytes: get_n(item, ATTR_COMPRESSED_SIZE)?,
        s3_key: get_s(item, ATTR_S3_KEY)?,
    })
}

fn get_s(item: &HashMap<String, AttributeValue>, attr: &str) -> RecordResult<String> {
    item.get(attr)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RecordError::malformed(format!("missing string attribute '{attr}'")))
}

fn get_n(item: &HashMap<String, AttributeValue>, attr: &str) -> RecordResult<u64> {
    item.get(attr)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RecordError::malformed(format!("missing numeric attribute '{attr}'")))
}

fn parse_date(s: &str) -> RecordResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| RecordError::malformed(format!("bad uploadDate: {e}")))
}

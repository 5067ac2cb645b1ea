use serde::Serialize;

use crate::output::to_json_bytes;

/// Serializes a value to JSON and uploads it to an S3 bucket with
/// `application/json` content type, gzip-encoded when `gzip` is set.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
    gzip: bool,
) -> anyhow::Result<()> {
    let body = to_json_bytes(value, gzip)?;

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json");
    if gzip {
        request = request.content_encoding("gzip");
    }

    request.send().await?;

    Ok(())
}

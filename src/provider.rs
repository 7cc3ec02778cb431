use crate::config::AwsConfig;
use crate::s3::{self, S3ObjOps};
use anyhow::{anyhow, Result};
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;

pub struct S3Provider {
    client: Client,
}

impl S3Provider {
    pub async fn from_config(config: &AwsConfig) -> Self {
        let client = s3::client_from_config(config).await;
        Self { client }
    }
}

impl S3ObjOps for S3Provider {
    async fn head_object(self: &Self, bucket: &str, key: &str) -> Result<HeadObjectOutput> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(head)
    }

    async fn get_object(self: &Self, bucket: &str, key: &str) -> Result<GetObjectOutput> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(object)
    }

    async fn put_object(self: &Self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await?;
        Ok(())
    }

    async fn create_multipart_upload(self: &Self, bucket: &str, key: &str) -> Result<String> {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        let upload_id = upload
            .upload_id()
            .ok_or(anyhow!("No upload id returned for s3://{}/{}", bucket, key))?;
        Ok(upload_id.to_string())
    }

    async fn upload_part(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<CompletedPart> {
        let part = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await?;
        Ok(CompletedPart::builder()
            .set_e_tag(part.e_tag().map(str::to_string))
            .part_number(part_number)
            .build())
    }

    async fn complete_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await?;
        Ok(())
    }

    async fn abort_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;
        Ok(())
    }
}

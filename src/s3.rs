//! Utility functions for creating s3 clients, and the object operations the fetcher relies on
use crate::config::AwsConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::types::CompletedPart;
use aws_sdk_s3::Client;

pub const DEFAULT_REGION: &str = "ap-southeast-2";

pub async fn client_from_config(config: &AwsConfig) -> Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(profile_name) = &config.profile {
        loader = loader.profile_name(profile_name);
    }
    if config.anonymous {
        loader = loader.no_credentials();
    }
    let base_config = loader.load().await;

    let mut s3_config =
        aws_sdk_s3::config::Builder::from(&base_config).force_path_style(config.force_path_style);
    if let Some(endpoint_url) = &config.endpoint_url {
        s3_config = s3_config.endpoint_url(endpoint_url);
    }

    Client::from_conf(s3_config.build())
}

pub trait S3ObjOps {
    async fn head_object(self: &Self, bucket: &str, key: &str) -> anyhow::Result<HeadObjectOutput>;

    async fn get_object(self: &Self, bucket: &str, key: &str) -> anyhow::Result<GetObjectOutput>;

    async fn put_object(self: &Self, bucket: &str, key: &str, body: Vec<u8>) -> anyhow::Result<()>;

    /// Returns the upload id
    async fn create_multipart_upload(self: &Self, bucket: &str, key: &str)
        -> anyhow::Result<String>;

    async fn upload_part(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> anyhow::Result<CompletedPart>;

    async fn complete_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> anyhow::Result<()>;

    async fn abort_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> anyhow::Result<()>;
}

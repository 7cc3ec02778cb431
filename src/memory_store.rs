//! In-memory object store for tests.
use crate::s3::S3ObjOps;
use crate::s3_operations::S3Object;
use anyhow::{anyhow, Result};
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::CompletedPart;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use tempdir::TempDir;

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<HashMap<String, HashMap<i32, Vec<u8>>>>,
    calls: Mutex<Vec<String>>,
    /// When set, bodies are served from disk in chunks of at most this size
    chunked: Option<(TempDir, usize)>,
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn uri(bucket: &str, key: &str) -> String {
    S3Object {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
    .to_string()
}

impl MemoryStore {
    pub fn chunked(chunk_size: usize) -> Self {
        Self {
            chunked: Some((TempDir::new("lds-store").unwrap(), chunk_size)),
            ..Self::default()
        }
    }

    pub fn insert(&self, uri: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(uri.to_string(), data.into());
    }

    pub fn insert_gzip(&self, uri: &str, data: &[u8]) {
        self.insert(uri, gzip(data));
    }

    pub fn object(&self, uri: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(uri).cloned()
    }

    /// Every call made against the store, as `"<operation> <uri>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, bucket: &str, key: &str) -> String {
        let uri = uri(bucket, key);
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", operation, uri));
        uri
    }
}

impl S3ObjOps for MemoryStore {
    async fn head_object(self: &Self, bucket: &str, key: &str) -> Result<HeadObjectOutput> {
        let uri = self.record("head", bucket, key);
        let objects = self.objects.lock().unwrap();
        let object = objects.get(&uri).ok_or(anyhow!("NotFound: {}", uri))?;
        Ok(HeadObjectOutput::builder()
            .content_length(object.len() as i64)
            .build())
    }

    async fn get_object(self: &Self, bucket: &str, key: &str) -> Result<GetObjectOutput> {
        let uri = self.record("get", bucket, key);
        let data = self
            .object(&uri)
            .ok_or(anyhow!("NoSuchKey: {}", uri))?;
        let body = match &self.chunked {
            Some((dir, chunk_size)) => {
                let path = dir.path().join(uri.replace(|c: char| c == '/' || c == ':', "_"));
                std::fs::write(&path, &data)?;
                ByteStream::read_from()
                    .path(&path)
                    .buffer_size(*chunk_size)
                    .build()
                    .await?
            }
            None => ByteStream::from(data),
        };
        Ok(GetObjectOutput::builder().body(body).build())
    }

    async fn put_object(self: &Self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let uri = self.record("put", bucket, key);
        self.insert(&uri, body);
        Ok(())
    }

    async fn create_multipart_upload(self: &Self, bucket: &str, key: &str) -> Result<String> {
        let uri = self.record("create", bucket, key);
        let upload_id = format!("upload-{}", uri);
        self.uploads
            .lock()
            .unwrap()
            .insert(upload_id.clone(), HashMap::new());
        Ok(upload_id)
    }

    async fn upload_part(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<CompletedPart> {
        self.record(&format!("part{}", part_number), bucket, key);
        let mut uploads = self.uploads.lock().unwrap();
        let parts = uploads
            .get_mut(upload_id)
            .ok_or(anyhow!("NoSuchUpload: {}", upload_id))?;
        parts.insert(part_number, body);
        Ok(CompletedPart::builder()
            .part_number(part_number)
            .e_tag(format!("etag-{}", part_number))
            .build())
    }

    async fn complete_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let uri = self.record("complete", bucket, key);
        let mut uploaded = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or(anyhow!("NoSuchUpload: {}", upload_id))?;

        let mut data = vec![];
        for part in parts {
            let part_number = part.part_number().ok_or(anyhow!("Missing part number"))?;
            let body = uploaded
                .remove(&part_number)
                .ok_or(anyhow!("InvalidPart: {}", part_number))?;
            data.extend_from_slice(&body);
        }
        self.insert(&uri, data);
        Ok(())
    }

    async fn abort_multipart_upload(
        self: &Self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.record("abort", bucket, key);
        self.uploads.lock().unwrap().remove(upload_id);
        Ok(())
    }
}

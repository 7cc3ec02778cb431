use crate::error::FetchError;
use crate::s3::S3ObjOps;
use crate::s3_operations::{ObjectPath, S3Object};
use anyhow::{anyhow, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::CompletedPart;
use flate2::write::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Size of each multipart upload part when writing to s3. S3 requires at least 5 MiB for every
/// part but the last.
pub const PART_SIZE: usize = 8 * 1024 * 1024;

/// Decompressed output is handed to the target in writes of at most this many bytes.
pub const OUTPUT_WINDOW: usize = 64 * 1024;

/// Compressed input is fed to the decoder this many bytes at a time. Deflate expands by at most
/// ~1032:1, so a single step can only add a bounded amount of pending output.
const INPUT_STEP: usize = 64;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct TransferStats {
    /// Body chunks pulled from the source
    pub chunks_read: u64,
    /// Compressed bytes read from the source
    pub bytes_read: u64,
    /// Decompressed bytes written to the target
    pub bytes_written: u64,
    /// Largest single write handed to the target
    pub largest_write: u64,
    /// Most decompressed output held before it was written
    pub peak_pending: u64,
}

/// Streams a gzipped object from s3 into `target`, decompressing on the way. Each body chunk is
/// decoded and written out before the next one is requested, so a slow target slows the read.
pub async fn stream_decompress(
    provider: &impl S3ObjOps,
    source: &S3Object,
    target: &ObjectPath,
) -> Result<TransferStats, FetchError> {
    let transfer_error = |cause: anyhow::Error| FetchError::Transfer {
        source_path: source.to_string(),
        target: target.to_string(),
        cause,
    };

    let object = provider
        .get_object(&source.bucket, &source.key)
        .await
        .map_err(transfer_error)?;

    let mut writer = TargetWriter::create(provider, target).map_err(transfer_error)?;
    match gunzip_into(object.body, &mut writer).await {
        Ok(stats) => {
            debug!(
                source = %source,
                target_path = %target,
                chunks_read = stats.chunks_read,
                bytes_read = stats.bytes_read,
                bytes_written = stats.bytes_written,
                peak_pending = stats.peak_pending,
                "Collection:Item:Written"
            );
            Ok(stats)
        }
        Err(cause) => {
            writer.abort().await;
            Err(transfer_error(cause))
        }
    }
}

/// Concatenated gzip members are decoded one after another into a single output.
async fn gunzip_into<P: S3ObjOps>(
    mut body: ByteStream,
    writer: &mut TargetWriter<'_, P>,
) -> Result<TransferStats> {
    let mut decoder = MultiGzDecoder::new(Vec::with_capacity(OUTPUT_WINDOW));
    let mut stats = TransferStats::default();

    while let Some(bytes) = body.try_next().await? {
        stats.chunks_read += 1;
        stats.bytes_read += bytes.len() as u64;

        for step in bytes.chunks(INPUT_STEP) {
            let mut input = step;
            while !input.is_empty() {
                let consumed = decoder.write(input)?;
                if consumed == 0 {
                    return Err(anyhow!("Unexpected data after the end of the gzip stream"));
                }
                input = &input[consumed..];
            }
            if decoder.get_ref().len() >= OUTPUT_WINDOW {
                drain(&mut decoder, writer, &mut stats).await?;
            }
        }
    }

    decoder.try_finish()?;
    drain(&mut decoder, writer, &mut stats).await?;
    writer.finish().await?;

    Ok(stats)
}

async fn drain<P: S3ObjOps>(
    decoder: &mut MultiGzDecoder<Vec<u8>>,
    writer: &mut TargetWriter<'_, P>,
    stats: &mut TransferStats,
) -> Result<()> {
    let pending = decoder.get_mut();
    stats.peak_pending = stats.peak_pending.max(pending.len() as u64);
    for window in pending.chunks(OUTPUT_WINDOW) {
        let written = writer.write(window).await?;
        stats.bytes_written += written;
        stats.largest_write = stats.largest_write.max(written);
    }
    pending.clear();
    Ok(())
}

enum TargetWriter<'a, P: S3ObjOps> {
    File {
        path: PathBuf,
        file: BufWriter<File>,
    },
    Upload(MultipartUpload<'a, P>),
}

impl<'a, P: S3ObjOps> TargetWriter<'a, P> {
    fn create(provider: &'a P, target: &ObjectPath) -> Result<Self> {
        match target {
            ObjectPath::Local(path) => {
                // Make parent directories as necessary
                if let Some(parent_dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent_dir)?;
                }
                let file = BufWriter::new(File::create(path)?);
                Ok(Self::File {
                    path: path.clone(),
                    file,
                })
            }
            ObjectPath::S3(object) => Ok(Self::Upload(MultipartUpload::new(provider, object))),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<u64> {
        let len = data.len() as u64;
        if len == 0 {
            return Ok(0);
        }
        match self {
            Self::File { file, .. } => file.write_all(data)?,
            Self::Upload(upload) => upload.write(data).await?,
        }
        Ok(len)
    }

    async fn finish(&mut self) -> Result<()> {
        match self {
            Self::File { file, .. } => file.flush()?,
            Self::Upload(upload) => upload.finish().await?,
        }
        Ok(())
    }

    /// Removes whatever was partially written.
    async fn abort(self) {
        match self {
            Self::File { path, file } => {
                drop(file);
                remove_partial_file(&path);
            }
            Self::Upload(upload) => upload.abort().await,
        }
    }
}

fn remove_partial_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Collection:Item:Cleanup");
    }
}

/// Buffers decompressed output into parts. Nothing is created on s3 until the first part fills;
/// output smaller than one part is sent with a single put.
struct MultipartUpload<'a, P: S3ObjOps> {
    provider: &'a P,
    object: S3Object,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
    buffer: Vec<u8>,
}

impl<'a, P: S3ObjOps> MultipartUpload<'a, P> {
    fn new(provider: &'a P, object: &S3Object) -> Self {
        Self {
            provider,
            object: object.clone(),
            upload_id: None,
            parts: vec![],
            buffer: Vec::with_capacity(PART_SIZE),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        while self.buffer.len() >= PART_SIZE {
            let rest = self.buffer.split_off(PART_SIZE);
            let part = std::mem::replace(&mut self.buffer, rest);
            self.upload_part(part).await?;
        }
        Ok(())
    }

    async fn upload_part(&mut self, body: Vec<u8>) -> Result<()> {
        let (bucket, key) = (&self.object.bucket, &self.object.key);
        let upload_id = match &self.upload_id {
            Some(id) => id.clone(),
            None => {
                let id = self.provider.create_multipart_upload(bucket, key).await?;
                self.upload_id = Some(id.clone());
                id
            }
        };

        let part_number = self.parts.len() as i32 + 1;
        debug!(
            target_path = %self.object,
            part_number,
            size = body.len(),
            "Collection:Item:Part"
        );
        let part = self
            .provider
            .upload_part(bucket, key, &upload_id, part_number, body)
            .await?;
        self.parts.push(part);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let remaining = std::mem::take(&mut self.buffer);
        if self.upload_id.is_none() {
            return self
                .provider
                .put_object(&self.object.bucket, &self.object.key, remaining)
                .await;
        }

        if !remaining.is_empty() {
            self.upload_part(remaining).await?;
        }
        if let Some(upload_id) = self.upload_id.take() {
            let parts = std::mem::take(&mut self.parts);
            self.provider
                .complete_multipart_upload(&self.object.bucket, &self.object.key, &upload_id, parts)
                .await?;
        }
        Ok(())
    }

    async fn abort(self) {
        let Some(upload_id) = self.upload_id else {
            return;
        };
        if let Err(e) = self
            .provider
            .abort_multipart_upload(&self.object.bucket, &self.object.key, &upload_id)
            .await
        {
            warn!(
                target_path = %self.object,
                upload_id = %upload_id,
                error = %e,
                "Collection:Item:Cleanup"
            );
        }
    }
}

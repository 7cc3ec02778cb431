use crate::error::FetchError;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Clone)]
pub struct S3Object {
    pub bucket: String,
    pub key: String,
}

impl S3Object {
    pub fn from_uri(uri: &str) -> Result<Self, FetchError> {
        let re = Regex::new(r"^s3://(?<bucket>[^/]+)/(?<key>.+)$")
            .expect("Regex pattern should always compile");

        let captures = re
            .captures(uri)
            .ok_or_else(|| FetchError::InvalidPath(uri.to_string()))?;

        let (_, [bucket, key]) = captures.extract();

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for S3Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Where a layer is read from or written to.
#[derive(Debug, PartialEq, Clone)]
pub enum ObjectPath {
    S3(S3Object),
    Local(PathBuf),
}

impl ObjectPath {
    /// `s3://` URIs address the object store, anything else is a local file path.
    pub fn parse(path: &str) -> Result<Self, FetchError> {
        if path.starts_with("s3://") {
            Ok(Self::S3(S3Object::from_uri(path)?))
        } else {
            Ok(Self::Local(PathBuf::from(path)))
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3(object) => object.fmt(f),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Joins a relative path onto a base location with exactly one separator between them.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

use crate::error::FetchError;
use crate::s3::S3ObjOps;
use crate::s3_operations::S3Object;
use serde::Deserialize;
use stac::Link;

const ITEM_REL: &str = "item";

/// The parts of a layer's `collection.json` the fetcher reads. Everything else in the
/// document is ignored.
#[derive(Deserialize, Debug)]
pub struct LdsCollection {
    pub title: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl LdsCollection {
    pub async fn fetch(provider: &impl S3ObjOps, source: &S3Object) -> Result<Self, FetchError> {
        let path = source.to_string();
        let not_found = |cause: anyhow::Error| FetchError::NotFound {
            path: path.clone(),
            cause,
        };

        let object = provider
            .get_object(&source.bucket, &source.key)
            .await
            .map_err(not_found)?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| not_found(e.into()))?
            .to_vec();

        Self::from_slice(&data).map_err(|source| FetchError::Parse { path, source })
    }

    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// The newest item is the last `item` link in document order, whatever its name.
    pub fn last_item(&self) -> Option<&Link> {
        self.links.iter().rev().find(|link| link.rel == ITEM_REL)
    }
}

//! Fetching a layer, by version and as the latest item of its collection.
use crate::cli::FetchLayerArgs;
use crate::config::Config;
use crate::error::FetchError;
use crate::provider::S3Provider;
use crate::s3::S3ObjOps;
use crate::s3_operations::{join, ObjectPath, S3Object};
use crate::stac_operations::LdsCollection;
use crate::transfer::stream_decompress;
use std::path::PathBuf;
use tracing::{info, warn};

pub const LDS_CACHE: &str = "s3://linz-lds-cache";

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub layer_id: String,
    pub version: Option<String>,
    pub target: Option<String>,
}

impl From<&FetchLayerArgs> for FetchRequest {
    fn from(args: &FetchLayerArgs) -> Self {
        Self {
            layer_id: args.layer_id.clone(),
            version: args.version.clone(),
            target: args.target.clone(),
        }
    }
}

/// Command handler for `lds-fetch-layer`.
pub async fn handle(config: &Config, args: &FetchLayerArgs) -> anyhow::Result<()> {
    let provider = S3Provider::from_config(&config.aws).await;
    LayerFetcher::new(&provider)
        .run(&FetchRequest::from(args))
        .await?;
    Ok(())
}

pub struct LayerFetcher<'a, P: S3ObjOps> {
    provider: &'a P,
    output_dir: PathBuf,
}

impl<'a, P: S3ObjOps> LayerFetcher<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            output_dir: PathBuf::from("."),
        }
    }

    /// Relative local targets are written below `output_dir`.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Fetches the requested version when one is given, then always the latest item.
    ///
    /// Both fetches write to `request.target` when it is set, so the latest item replaces the
    /// versioned layer.
    pub async fn run(&self, request: &FetchRequest) -> Result<(), FetchError> {
        let layer_id = request.layer_id.as_str();
        validate_numeric("LayerId", layer_id)?;
        if let Some(version) = &request.version {
            validate_numeric("LayerVersion", version)?;
        }
        info!(layer_id, layer_version = ?request.version, "Collection:Download:Start");

        if let Some(version) = &request.version {
            if let Some(target) = &request.target {
                warn!(layer_id, target_path = %target, "Collection:Target:Overwrite");
            }
            self.fetch_versioned(layer_id, version, request.target.as_deref())
                .await?;
        }

        self.fetch_latest_item(layer_id, request.target.as_deref())
            .await
    }

    pub async fn fetch_versioned(
        &self,
        layer_id: &str,
        version: &str,
        target: Option<&str>,
    ) -> Result<(), FetchError> {
        validate_numeric("LayerId", layer_id)?;
        validate_numeric("LayerVersion", version)?;

        let source_path = versioned_source(layer_id, version);
        let source = S3Object::from_uri(&source_path)?;

        // Fail fast when the layer is missing or unreadable
        self.provider
            .head_object(&source.bucket, &source.key)
            .await
            .map_err(|cause| FetchError::PermissionOrNotFound {
                path: source_path.clone(),
                cause,
            })?;

        info!(layer_id, layer_version = version, source = %source_path, "Collection:Item:Fetch");
        let target = match target {
            Some(target) => target.to_string(),
            None => versioned_target(layer_id, version),
        };
        stream_decompress(self.provider, &source, &self.resolve(&target)?).await?;
        Ok(())
    }

    pub async fn fetch_latest_item(
        &self,
        layer_id: &str,
        target: Option<&str>,
    ) -> Result<(), FetchError> {
        validate_numeric("LayerId", layer_id)?;

        let base = layer_base(layer_id);
        let collection_source = S3Object::from_uri(&join(&base, "collection.json"))?;
        let collection = LdsCollection::fetch(self.provider, &collection_source).await?;
        info!(
            layer_id,
            title = collection.title.as_deref().unwrap_or_default(),
            "Collection:Download:Done"
        );

        let last_item = collection.last_item().ok_or(FetchError::NoItemsFound)?;
        let href = last_item.href.as_str();

        let target = match target {
            Some(target) => target.to_string(),
            None => item_target(href),
        };
        let source_path = item_source(&base, href)?;
        let source = S3Object::from_uri(&source_path)?;

        info!(layer_id, last_item = href, source = %source_path, "Collection:Item:Fetch");
        stream_decompress(self.provider, &source, &self.resolve(&target)?).await?;
        Ok(())
    }

    fn resolve(&self, target: &str) -> Result<ObjectPath, FetchError> {
        Ok(match ObjectPath::parse(target)? {
            ObjectPath::Local(path) => ObjectPath::Local(self.output_dir.join(path)),
            remote => remote,
        })
    }
}

/// Accepts what a loose numeric coercion would: surrounding whitespace, a sign, fractions,
/// exponents, `Infinity` and `0x`/`0o`/`0b` literals. Blank input is rejected.
pub fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    for (prefixes, radix) in [(["0x", "0X"], 16), (["0o", "0O"], 8), (["0b", "0B"], 2)] {
        if let Some(digits) = prefixes.iter().find_map(|p| trimmed.strip_prefix(p)) {
            return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
        }
    }

    let unsigned = trimmed
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return true;
    }
    // f64 parsing also takes "inf" and "NaN", which are not numbers here
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return false;
    }
    trimmed.parse::<f64>().is_ok()
}

fn validate_numeric(name: &'static str, value: &str) -> Result<(), FetchError> {
    if is_numeric(value) {
        return Ok(());
    }
    Err(FetchError::InvalidArgument {
        name,
        value: value.to_string(),
    })
}

pub fn layer_base(layer_id: &str) -> String {
    format!("{}/{}/", LDS_CACHE, layer_id)
}

pub fn versioned_source(layer_id: &str, version: &str) -> String {
    format!("{}/{}/{}_{}.gpkg", LDS_CACHE, layer_id, layer_id, version)
}

pub fn versioned_target(layer_id: &str, version: &str) -> String {
    format!("./{}_{}.gpkg", layer_id, version)
}

/// Only the first `.json` is swapped, wherever it appears.
fn replace_json(path: &str) -> String {
    path.replacen(".json", ".gpkg", 1)
}

pub fn item_target(href: &str) -> String {
    replace_json(href)
}

/// Item hrefs must be relative (`./`) to the collection.
pub fn item_source(base: &str, href: &str) -> Result<String, FetchError> {
    let relative = href
        .strip_prefix("./")
        .ok_or_else(|| FetchError::UnsupportedPath(href.to_string()))?;
    Ok(replace_json(&join(base, relative)))
}

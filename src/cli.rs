use clap::{Args, Parser};
use std::path::PathBuf;

/// Options every command accepts.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Location of a TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Download a layer from the LDS cache and decompress it
#[derive(Parser, Debug)]
#[command(name = "lds-fetch-layer")]
pub struct FetchLayerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Layer to download
    #[arg(long)]
    pub layer_id: String,

    /// Layer version to download
    #[arg(long)]
    pub version: Option<String>,

    /// Target location to save file
    #[arg(long)]
    pub target: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let args = FetchLayerArgs::try_parse_from([
            "lds-fetch-layer",
            "--layer-id",
            "50772",
            "--version",
            "120",
            "--target",
            "s3://bucket/out.gpkg",
            "--config",
            "config.toml",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.layer_id, "50772");
        assert_eq!(args.version.as_deref(), Some("120"));
        assert_eq!(args.target.as_deref(), Some("s3://bucket/out.gpkg"));
        assert_eq!(args.common.config, Some(PathBuf::from("config.toml")));
        assert!(args.common.verbose);
    }

    #[test]
    fn test_layer_id_required() {
        assert!(FetchLayerArgs::try_parse_from(["lds-fetch-layer", "--version", "1"]).is_err());
    }

    #[test]
    fn test_optional_flags() {
        let args =
            FetchLayerArgs::try_parse_from(["lds-fetch-layer", "--layer-id", "50772"]).unwrap();
        assert_eq!(args.version, None);
        assert_eq!(args.target, None);
        assert!(!args.common.verbose);
    }
}

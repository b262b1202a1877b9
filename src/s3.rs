use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client as S3Client,
};
use tracing::debug;

use crate::config::AppConfig;

/// Builds the client for the document bucket. Static credentials and a custom
/// endpoint are used when configured, otherwise the default AWS chain applies.
pub async fn build_client(config: &AppConfig) -> Result<S3Client> {
    let region = Region::new(config.aws_region.clone());
    let region_provider = RegionProviderChain::first_try(Some(region))
        .or_default_provider()
        .or_else("us-east-1");

    #[allow(deprecated)]
    let mut loader = aws_config::from_env().region(region_provider);

    if let Some(endpoint) = &config.aws_endpoint_url {
        debug!(endpoint = %endpoint, "using custom object storage endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (
        config.aws_access_key_id.clone(),
        config.aws_secret_access_key.clone(),
    ) {
        let credentials = Credentials::new(access_key, secret_key, None, None, "kiosk-static");
        loader = loader.credentials_provider(credentials);
    }

    let shared = loader.load().await;
    let s3_config = S3ConfigBuilder::from(&shared)
        .force_path_style(config.aws_endpoint_url.is_some())
        .build();

    Ok(S3Client::from_conf(s3_config))
}

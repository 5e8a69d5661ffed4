use aws_config::{BehaviorVersion, Region, meta::region::RegionProviderChain};
use aws_sdk_kinesis::Client;

use crate::sink::KinesisSinkConfig;
use crate::{Error, Result};

pub const KINESIS_DEFAULT_REGION: &str = "us-west-2";

/// Creates a Kinesis client. The region is taken from the config when set, otherwise from the
/// default provider chain, and finally falls back to [`KINESIS_DEFAULT_REGION`].
pub async fn create_kinesis_client(config: &KinesisSinkConfig) -> Result<Client> {
    config.validate()?;

    let region_provider = match &config.region {
        Some(region) => RegionProviderChain::first_try(Region::new(region.clone()))
            .or_default_provider()
            .or_else(Region::new(KINESIS_DEFAULT_REGION)),
        None => {
            RegionProviderChain::default_provider().or_else(Region::new(KINESIS_DEFAULT_REGION))
        }
    };

    let mut config_builder =
        aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

    if let Some(endpoint_url) = &config.endpoint_url {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let shared_config = config_builder.load().await;
    tracing::info!(
        region = ?shared_config.region(),
        stream = %config.stream_name,
        "Created Kinesis client"
    );

    Ok(Client::new(&shared_config))
}

impl KinesisSinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stream_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "stream name must not be empty".to_string(),
            ));
        }
        if matches!(&self.region, Some(region) if region.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "region must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }
}

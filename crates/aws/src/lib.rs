//! AWS SDK client factory.
//!
//! Builds the DynamoDB and S3 clients once at startup from [`AwsSettings`].
//! Both clients are cheap to clone and are shared by every request.

use aws_config::{BehaviorVersion, Region};
use bookshelf_kernel::settings::AwsSettings;

/// SDK clients shared across the process.
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub s3: aws_sdk_s3::Client,
}

/// Resolve the shared SDK configuration and build both clients.
///
/// Region and endpoint come from settings when present; anything unset falls
/// back to the SDK default provider chain.
pub async fn connect(settings: &AwsSettings) -> AwsClients {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    tracing::info!(
        target: "bookshelf-aws",
        region = ?shared.region(),
        endpoint = ?settings.endpoint_url,
        force_path_style = settings.force_path_style,
        "aws clients configured"
    );

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(settings.force_path_style)
        .build();

    AwsClients {
        dynamodb: aws_sdk_dynamodb::Client::new(&shared),
        s3: aws_sdk_s3::Client::from_conf(s3_config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_region_and_endpoint_are_applied() {
        let settings = AwsSettings {
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("http://localhost:4566".to_string()),
            force_path_style: true,
        };

        let clients = connect(&settings).await;

        let s3_region = clients.s3.config().region().map(|r| r.as_ref().to_string());
        assert_eq!(s3_region.as_deref(), Some("eu-west-1"));
        let ddb_region = clients
            .dynamodb
            .config()
            .region()
            .map(|r| r.as_ref().to_string());
        assert_eq!(ddb_region.as_deref(), Some("eu-west-1"));
    }
}

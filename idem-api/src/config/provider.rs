use std::sync::Arc;

use anyhow::Result;
use idem_providers::mock::MockProvider;
use idem_providers::scaleway::ScalewayProvider;
use idem_providers::CloudProvider;

use super::ProviderSettings;

/// Build the single provider instance shared by every request.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn CloudProvider>> {
    match settings {
        ProviderSettings::Scaleway(settings) => {
            tracing::info!("Using Scaleway provider (zone {})", settings.zone);
            Ok(Arc::new(ScalewayProvider::new(settings.clone())?))
        }
        ProviderSettings::Mock { transition_polls } => {
            tracing::info!(
                "Using mock provider (transitions settle after {} poll(s))",
                transition_polls
            );
            Ok(Arc::new(MockProvider::with_demo_instances(*transition_polls)))
        }
    }
}

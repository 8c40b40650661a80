use dosbox_operator::{
    capacity::HttpCapacityProbe,
    client::KubeGameClient,
    config::ControllerConfig,
    controller,
    reconciler::Context,
    telemetry::{self, Metrics},
};
use kube::Client;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let metrics = Arc::new(Metrics::default());

    info!("Starting DOSBox Game Controller");
    let config = Arc::new(ControllerConfig::from_env()?);
    info!("Configuration loaded");
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let ctx = Arc::new(Context {
        client: Arc::new(KubeGameClient::new(client.clone())),
        probe: Arc::new(HttpCapacityProbe::new(config.probe_timeout())?),
        config,
        metrics,
    });

    controller::run(client, ctx).await;

    Ok(())
}

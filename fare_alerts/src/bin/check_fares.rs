use fare_alerts::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared_kernel::tracing::config_telemetry("check_fares");
    if let Err(err) = start().await {
        tracing::error!("[fatal] {err:?}. Exiting without sending");
    }
    shared_kernel::tracing::shutdown_global_tracer_provider();
    Ok(())
}

async fn start() -> anyhow::Result<()> {
    let settings = shared_kernel::configuration::config::<Settings>()?;
    fare_alerts::run_job(settings).await;
    Ok(())
}

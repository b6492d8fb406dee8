use subtrack::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = get_configuration()?;

    let subscriber = get_subscriber(
        "subtrack".into(),
        "info".into(),
        std::io::stdout,
        settings.telemetry.otlp_endpoint.clone(),
    );
    init_subscriber(subscriber);

    let application = Application::build(settings).await?;
    application.run_until_stopped().await?;

    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}

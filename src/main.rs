use tracing_subscriber::EnvFilter;
use yaturl::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(true);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    config.print_summary();

    server::run(config).await
}

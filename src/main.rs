#[tokio::main]
async fn main() -> line_imagen::error::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("line_imagen=info"))
        .init();
    log::info!("Starting LINE image relay");

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::warn!("A TLS crypto provider was already installed");
    }

    match line_imagen::run().await {
        Ok(()) => {
            log::info!("Relay shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Relay encountered an error: {}", e);
            Err(e)
        }
    }
}

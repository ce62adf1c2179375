use clap::Parser;
use maamul::{
    Application, Config,
    config::{Args, Command},
    maintenance, telemetry,
};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!("{:?}", args);

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => Application::new(config).await?.serve(shutdown_signal()).await,
        Command::CheckDb => {
            let latency = maintenance::check_database(&config).await?;
            println!("Database OK ({} ms)", latency.as_millis());
            Ok(())
        }
        Command::ResetPassword { email, password } => {
            match maintenance::reset_password(&config, &email, password).await? {
                Some(generated) => println!("New password for {email}: {generated}"),
                None => println!("Password updated for {email}"),
            }
            Ok(())
        }
        Command::ListModels => {
            for model in maintenance::list_models(&config).await? {
                let methods = model.supported_generation_methods.join(", ");
                match model.display_name {
                    Some(display_name) => println!("{}\t{}\t{}", model.name, display_name, methods),
                    None => println!("{}\t\t{}", model.name, methods),
                }
            }
            Ok(())
        }
    }
}

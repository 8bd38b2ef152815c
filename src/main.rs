use std::sync::Arc;

use care_session::auth::Credentials;
use care_session::client::{LogNotifier, RequestOptions};
use care_session::configuration::get_configuration;
use care_session::navigation::LogNavigator;
use care_session::startup::{storage_from_settings, Application};
use care_session::telemetry::init_telemetry;

const USAGE: &str = "usage: care-session login <email> <password> | logout | <path>";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let storage = storage_from_settings(&configuration.storage);
    let app = Application::build(
        &configuration,
        storage,
        Arc::new(LogNavigator),
        Arc::new(LogNotifier),
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["login", email, password] => {
            let credentials = Credentials::new(*email, *password);
            let user = app.session.sign_in(&credentials).await.map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, e.user_message())
            })?;
            println!("Signed in as {}", user.email);
        }
        ["logout"] => {
            app.session.logout().await;
            println!("Signed out");
        }
        [path] => {
            if !app.session.initialize().await {
                tracing::warn!("No usable session; run `care-session login` first");
            }

            let api = app.api();
            match api.get::<serde_json::Value>(path, RequestOptions::default()).await {
                Some(data) => {
                    let pretty = serde_json::to_string_pretty(&data)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                    println!("{}", pretty);
                }
                None => {
                    let message = api.error().unwrap_or_else(|| "Request failed".to_string());
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, message));
                }
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, USAGE));
        }
    }

    Ok(())
}

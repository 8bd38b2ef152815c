use std::time::Duration;

use config::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub notifications: NotificationSettings,
}

/// Scheduling backend the dashboard talks to
#[derive(serde::Deserialize, Clone, Debug)]
pub struct BackendSettings {
    pub base_url: String,
}

/// Where the session is persisted; in memory only when `path` is unset
#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct StorageSettings {
    pub path: Option<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SessionSettings {
    pub sign_in_path: String,
}

/// Toast lifetimes
#[derive(serde::Deserialize, Clone, Debug)]
pub struct NotificationSettings {
    pub success_life_ms: u64, // 3000 in the dashboard
    pub error_life_ms: u64,   // 5000 in the dashboard
}

impl NotificationSettings {
    pub fn success_life(&self) -> Duration {
        Duration::from_millis(self.success_life_ms)
    }

    pub fn error_life(&self) -> Duration {
        Duration::from_millis(self.error_life_ms)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            success_life_ms: 3000,
            error_life_ms: 5000,
        }
    }
}

impl Settings {
    /// Defaults pointed at `base_url`, in-memory storage
    pub fn for_backend(base_url: impl Into<String>) -> Self {
        Self {
            backend: BackendSettings {
                base_url: base_url.into(),
            },
            storage: StorageSettings::default(),
            session: SessionSettings {
                sign_in_path: "/signin".to_string(),
            },
            notifications: NotificationSettings::default(),
        }
    }
}

/// Read `configuration.{toml,yaml,json}` if present, then `APP__*`
/// environment variables (e.g. `APP__BACKEND__BASE_URL`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("backend.base_url", "http://127.0.0.1:8000")?
        .set_default("session.sign_in_path", "/signin")?
        .set_default("notifications.success_life_ms", 3000)?
        .set_default("notifications.error_life_ms", 5000)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let settings = get_configuration().expect("Failed to read configuration");

        assert!(!settings.backend.base_url.is_empty());
        assert_eq!(settings.session.sign_in_path, "/signin");
        assert_eq!(settings.notifications.success_life(), Duration::from_millis(3000));
        assert_eq!(settings.notifications.error_life(), Duration::from_millis(5000));
    }

    #[test]
    fn test_for_backend() {
        let settings = Settings::for_backend("http://localhost:9000");
        assert_eq!(settings.backend.base_url, "http://localhost:9000");
        assert!(settings.storage.path.is_none());
    }
}

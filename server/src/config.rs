use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use ride_share_data_management::DATABASE_PATH;

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub http_port: u16,
}

pub struct Config {
    pub addr: SocketAddr,
    pub database: PathBuf,
    pub log_dir: PathBuf,
    pub static_dir: PathBuf,
    pub tls: Option<TlsConfig>,
    /// Emails are only logged when this is unset.
    pub smtp: Option<SmtpConfig>,
    pub broadcast_capacity: usize,
    pub mail_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database: default_database(),
            log_dir: PathBuf::from("server/log"),
            static_dir: PathBuf::from("server/static"),
            tls: None,
            smtp: None,
            broadcast_capacity: 100,
            mail_queue_capacity: 256,
        }
    }
}

impl Config {
    /// Reads the environment, seeded from `.env` when present. Bad values
    /// are logged and replaced by their defaults.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!("Loaded environment from {:?}", path);
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Config::default();

        let tls = match (var("RIDE_SHARE_TLS_CERT"), var("RIDE_SHARE_TLS_KEY")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert: cert.into(),
                key: key.into(),
                http_port: try_load(&var, "RIDE_SHARE_HTTP_PORT", 80),
            }),
            _ => None,
        };

        let smtp = var("SMTP_HOST").map(|host| SmtpConfig {
            port: try_load(&var, "SMTP_PORT", 587),
            user: var("SMTP_USER"),
            password: var("SMTP_PASSWORD"),
            from: var("SMTP_FROM").unwrap_or_else(|| format!("no-reply@{host}")),
            host,
        });

        Self {
            addr: try_load(&var, "RIDE_SHARE_ADDR", defaults.addr),
            database: var("RIDE_SHARE_DATABASE").map(PathBuf::from).unwrap_or(defaults.database),
            log_dir: var("RIDE_SHARE_LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            static_dir: var("RIDE_SHARE_STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            tls,
            smtp,
            broadcast_capacity: try_load(&var, "RIDE_SHARE_BROADCAST_CAPACITY", defaults.broadcast_capacity),
            mail_queue_capacity: try_load(&var, "RIDE_SHARE_MAIL_QUEUE", defaults.mail_queue_capacity),
        }
    }
}

fn default_database() -> PathBuf {
    project_root::get_project_root()
        .map(|root| root.join(DATABASE_PATH))
        .unwrap_or_else(|_| PathBuf::from(DATABASE_PATH))
}

fn try_load<T: FromStr + Display>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        tracing::debug!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|err| {
        tracing::warn!("Invalid {key} value {raw:?}: {err}, using default: {default}");
        default
    })
}

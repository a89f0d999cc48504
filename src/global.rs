use derive_more::Display;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::time::Duration;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Runtime configuration read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: String,
    /// How long a login session lives.
    pub session_time: chrono::Duration,
    pub posts_per_page: usize,
    /// Lifetime of the cached index page post list.
    pub index_cache_ttl: Duration,
    pub media_dir: PathBuf,
    pub secret_key: Option<Vec<u8>>,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "{} cannot be parsed as an integer: {:?}", _0, _1)]
    NotAnInteger(&'static str, String),
    #[display(fmt = "{} is out of range: {}", _0, _1)]
    OutOfRange(&'static str, i64),
    #[display(fmt = "SECRET_KEY must be at least 64 bytes long")]
    ShortSecretKey,
}

impl std::error::Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
            session_time: chrono::Duration::minutes(1440),
            posts_per_page: 10,
            index_cache_ttl: Duration::from_secs(20),
            media_dir: PathBuf::from("./media"),
            secret_key: None,
        }
    }
}

impl Settings {
    /// Reads settings through a lookup function, falling back to defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            settings.bind_addr = addr;
        }

        if let Some(minutes) = parse_int(&lookup, "SESSION_TIME")? {
            if minutes < 0 {
                return Err(ConfigError::OutOfRange("SESSION_TIME", minutes));
            }
            settings.session_time = chrono::Duration::minutes(minutes);
        }

        if let Some(per_page) = parse_int(&lookup, "POSTS_PER_PAGE")? {
            if per_page < 1 {
                return Err(ConfigError::OutOfRange("POSTS_PER_PAGE", per_page));
            }
            settings.posts_per_page = per_page as usize;
        }

        if let Some(seconds) = parse_int(&lookup, "INDEX_CACHE_TTL")? {
            if seconds < 0 {
                return Err(ConfigError::OutOfRange("INDEX_CACHE_TTL", seconds));
            }
            settings.index_cache_ttl = Duration::from_secs(seconds as u64);
        }

        if let Some(dir) = lookup("MEDIA_DIR") {
            settings.media_dir = PathBuf::from(dir);
        }

        if let Some(key) = lookup("SECRET_KEY") {
            if key.len() < 64 {
                return Err(ConfigError::ShortSecretKey);
            }
            settings.secret_key = Some(key.into_bytes());
        }

        Ok(settings)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_int<F>(lookup: &F, key: &'static str) -> Result<Option<i64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::NotAnInteger(key, value)),
        None => Ok(None),
    }
}

/// Returns the process settings.
/// Falls back to defaults when `init` was never called, which is the case in tests.
#[inline(always)]
pub fn get_settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::default)
}

#[inline(always)]
pub fn get_session_time() -> &'static chrono::Duration {
    &get_settings().session_time
}

#[inline(always)]
pub fn get_posts_per_page() -> usize {
    get_settings().posts_per_page
}

/// Panics on malformed configuration.
pub fn init() {
    let settings = Settings::from_env().unwrap_or_else(|e| panic!("Bad configuration: {}", e));
    log::info!("Settings loaded: {:?}", settings.clone().redacted());
    SETTINGS
        .set(settings)
        .expect("global::init() was called twice");
}

impl Settings {
    fn redacted(mut self) -> Self {
        self.secret_key = self.secret_key.map(|_| b"[redacted]".to_vec());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.posts_per_page, 10);
        assert_eq!(settings.index_cache_ttl, Duration::from_secs(20));
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert!(settings.secret_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("POSTS_PER_PAGE", "3"),
            ("INDEX_CACHE_TTL", "5"),
            ("SESSION_TIME", "60"),
            ("MEDIA_DIR", "/tmp/media"),
        ]))
        .unwrap();
        assert_eq!(settings.posts_per_page, 3);
        assert_eq!(settings.index_cache_ttl, Duration::from_secs(5));
        assert_eq!(settings.session_time, chrono::Duration::minutes(60));
        assert_eq!(settings.media_dir, PathBuf::from("/tmp/media"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            Settings::from_lookup(lookup_from(&[("POSTS_PER_PAGE", "ten")])).unwrap_err(),
            ConfigError::NotAnInteger("POSTS_PER_PAGE", "ten".to_owned())
        );
        assert_eq!(
            Settings::from_lookup(lookup_from(&[("POSTS_PER_PAGE", "0")])).unwrap_err(),
            ConfigError::OutOfRange("POSTS_PER_PAGE", 0)
        );
        assert_eq!(
            Settings::from_lookup(lookup_from(&[("SESSION_TIME", "-1")])).unwrap_err(),
            ConfigError::OutOfRange("SESSION_TIME", -1)
        );
        assert_eq!(
            Settings::from_lookup(lookup_from(&[("SECRET_KEY", "short")])).unwrap_err(),
            ConfigError::ShortSecretKey
        );
    }
}

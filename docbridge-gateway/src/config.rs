use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::http::HeaderValue;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackendKind,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub storage_bucket: String,
    pub file_url_base: String,
    pub upstream_timeout_ms: u64,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_keys: usize,
    pub max_upload_bytes: usize,
    pub cookie_secure: bool,
    pub cors_origins: Vec<HeaderValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackendKind {
    Memory,
    MongoDb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

impl GatewayConfig {
    pub fn load() -> Result<Self, StartupError> {
        let mut merged = HashMap::new();

        if let Ok(config_path) = std::env::var("DOCBRIDGE_CONFIG_PATH") {
            let config_path = config_path.trim();
            if !config_path.is_empty() {
                let file_kv = parse_env_file(config_path)?;
                merged.extend(file_kv);
            }
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let bind_addr = parse_socket_addr(
            kv.get("DOCBRIDGE_BIND_ADDR"),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            "DOCBRIDGE_BIND_ADDR",
        )?;

        let store_backend = parse_store_backend(kv.get("DOCBRIDGE_STORE_BACKEND"))?;
        let mongodb_uri = match store_backend {
            StoreBackendKind::MongoDb => Some(require_nonempty(kv, "DOCBRIDGE_MONGODB_URI")?),
            StoreBackendKind::Memory => None,
        };
        let mongodb_database = parse_string(
            kv.get("DOCBRIDGE_MONGODB_DATABASE"),
            "docbridge",
        );

        let storage_bucket = parse_string(kv.get("DOCBRIDGE_STORAGE_BUCKET"), "docbridge.local");
        if storage_bucket.contains('/') {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_STORAGE_BUCKET must not contain '/'".to_string(),
            });
        }

        let file_url_base = parse_string(
            kv.get("DOCBRIDGE_FILE_URL_BASE"),
            "https://firebasestorage.googleapis.com",
        )
        .trim_end_matches('/')
        .to_string();
        if !file_url_base.starts_with("http://") && !file_url_base.starts_with("https://") {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_FILE_URL_BASE must be an http(s) URL".to_string(),
            });
        }

        let upstream_timeout_ms = parse_u64(
            kv.get("DOCBRIDGE_UPSTREAM_TIMEOUT_MS"),
            10_000,
            "DOCBRIDGE_UPSTREAM_TIMEOUT_MS",
        )?;
        if upstream_timeout_ms == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_UPSTREAM_TIMEOUT_MS must be >= 1".to_string(),
            });
        }

        let rate_limit_max = parse_u32(
            kv.get("DOCBRIDGE_RATE_LIMIT_MAX"),
            100,
            "DOCBRIDGE_RATE_LIMIT_MAX",
        )?;
        let rate_limit_window_secs = parse_u64(
            kv.get("DOCBRIDGE_RATE_LIMIT_WINDOW_SECS"),
            900,
            "DOCBRIDGE_RATE_LIMIT_WINDOW_SECS",
        )?;
        if rate_limit_window_secs == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_RATE_LIMIT_WINDOW_SECS must be >= 1".to_string(),
            });
        }
        let rate_limit_max_keys = parse_usize(
            kv.get("DOCBRIDGE_RATE_LIMIT_MAX_KEYS"),
            10_000,
            "DOCBRIDGE_RATE_LIMIT_MAX_KEYS",
        )?;

        let max_upload_bytes = parse_usize(
            kv.get("DOCBRIDGE_MAX_UPLOAD_BYTES"),
            10 * 1024 * 1024,
            "DOCBRIDGE_MAX_UPLOAD_BYTES",
        )?;
        if max_upload_bytes == 0 {
            return Err(StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_MAX_UPLOAD_BYTES must be >= 1".to_string(),
            });
        }

        let cookie_secure = match kv.get("DOCBRIDGE_COOKIE_SECURE") {
            None => false,
            Some(v) if v.trim().is_empty() => false,
            Some(v) => parse_bool(Some(v)).ok_or_else(|| StartupError {
                code: "ERR_INVALID_CONFIG",
                message: "DOCBRIDGE_COOKIE_SECURE must be a boolean".to_string(),
            })?,
        };

        let cors_origins = parse_origins(kv.get("DOCBRIDGE_CORS_ORIGINS"))?;

        Ok(Self {
            bind_addr,
            store_backend,
            mongodb_uri,
            mongodb_database,
            storage_bucket,
            file_url_base,
            upstream_timeout_ms,
            rate_limit_max,
            rate_limit_window_secs,
            rate_limit_max_keys,
            max_upload_bytes,
            cookie_secure,
            cors_origins,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            store_backend: StoreBackendKind::Memory,
            mongodb_uri: None,
            mongodb_database: "docbridge".to_string(),
            storage_bucket: "docbridge.local".to_string(),
            file_url_base: "https://firebasestorage.googleapis.com".to_string(),
            upstream_timeout_ms: 10_000,
            rate_limit_max: 100,
            rate_limit_window_secs: 900,
            rate_limit_max_keys: 10_000,
            max_upload_bytes: 10 * 1024 * 1024,
            cookie_secure: false,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_env_file(path: &str) -> Result<HashMap<String, String>, StartupError> {
    let contents = std::fs::read_to_string(path).map_err(|_| StartupError {
        code: "ERR_CONFIG_FILE_READ",
        message: format!("failed to read config file at {}", path),
    })?;

    parse_env_lines(&contents)
}

fn parse_env_lines(contents: &str) -> Result<HashMap<String, String>, StartupError> {
    let mut kv = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| StartupError {
            code: "ERR_CONFIG_FILE_PARSE",
            message: format!("invalid config line {} (expected KEY=VALUE)", idx + 1),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(StartupError {
                code: "ERR_CONFIG_FILE_PARSE",
                message: format!("invalid config line {} (empty key)", idx + 1),
            });
        }

        kv.insert(key.to_string(), strip_quotes(value.trim()));
    }

    Ok(kv)
}

fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..bytes.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn require_nonempty(
    kv: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, StartupError> {
    let value = kv.get(key).map(|v| v.trim()).unwrap_or_default();
    if value.is_empty() {
        return Err(StartupError {
            code: "ERR_MISSING_CONFIG",
            message: format!("missing required config key {}", key),
        });
    }

    Ok(value.to_string())
}

fn parse_string(value: Option<&String>, default: &str) -> String {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_socket_addr(
    value: Option<&String>,
    default: SocketAddr,
    key: &'static str,
) -> Result<SocketAddr, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<SocketAddr>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be a valid host:port socket address", key),
        }),
    }
}

fn parse_usize(
    value: Option<&String>,
    default: usize,
    key: &'static str,
) -> Result<usize, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<usize>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_u64(value: Option<&String>, default: u64, key: &'static str) -> Result<u64, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<u64>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_u32(value: Option<&String>, default: u32, key: &'static str) -> Result<u32, StartupError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse::<u32>().map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: format!("{} must be an integer", key),
        }),
    }
}

fn parse_bool(value: Option<&String>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_store_backend(value: Option<&String>) -> Result<StoreBackendKind, StartupError> {
    let backend = value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("memory");

    match backend {
        "memory" => Ok(StoreBackendKind::Memory),
        "mongodb" => Ok(StoreBackendKind::MongoDb),
        _ => Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "DOCBRIDGE_STORE_BACKEND must be memory or mongodb".to_string(),
        }),
    }
}

fn parse_origins(value: Option<&String>) -> Result<Vec<HeaderValue>, StartupError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|_| StartupError {
                code: "ERR_INVALID_CONFIG",
                message: format!("DOCBRIDGE_CORS_ORIGINS contains an invalid origin {:?}", origin),
            })
        })
        .collect()
}

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub magic_box: MagicBoxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 前端来源白名单，为空表示不限制
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicBoxConfig {
    /// 前端装饰网格格子数
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    /// 开盒 / 安慰优惠发放的折扣券有效天数
    #[serde(default = "default_coupon_valid_days")]
    pub coupon_valid_days: i64,
    /// 限量奖品并发扣减失败后的最大重抽次数
    #[serde(default = "default_max_draw_attempts")]
    pub max_draw_attempts: u32,
    /// 过期活动清理间隔（秒）
    #[serde(default = "default_campaign_sweep_interval_secs")]
    pub campaign_sweep_interval_secs: u64,
}

fn default_grid_size() -> usize {
    100
}

fn default_coupon_valid_days() -> i64 {
    30
}

fn default_max_draw_attempts() -> u32 {
    5
}

fn default_campaign_sweep_interval_secs() -> u64 {
    3600
}

impl Default for MagicBoxConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            coupon_valid_days: default_coupon_valid_days(),
            max_draw_attempts: default_max_draw_attempts(),
            campaign_sweep_interval_secs: default_campaign_sweep_interval_secs(),
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::from_toml_str(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        cors_allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    magic_box: MagicBoxConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();

        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(Ok(p)) = get_env("SERVER_PORT").map(|v| v.parse()) {
            self.server.port = p;
        }
        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(Ok(mc)) = get_env("DB_MAX_CONNECTIONS").map(|v| v.parse()) {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(Ok(n)) = get_env("JWT_ACCESS_EXPIRES_IN").map(|v| v.parse()) {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(Ok(n)) = get_env("MAGIC_BOX_GRID_SIZE").map(|v| v.parse()) {
            self.magic_box.grid_size = n;
        }
        if let Some(Ok(n)) = get_env("MAGIC_BOX_COUPON_VALID_DAYS").map(|v| v.parse()) {
            self.magic_box.coupon_valid_days = n;
        }
        if let Some(Ok(n)) = get_env("MAGIC_BOX_MAX_DRAW_ATTEMPTS").map(|v| v.parse()) {
            self.magic_box.max_draw_attempts = n;
        }
        if let Some(Ok(n)) = get_env("MAGIC_BOX_CAMPAIGN_SWEEP_SECS").map(|v| v.parse()) {
            self.magic_box.campaign_sweep_interval_secs = n;
        }
    }
}

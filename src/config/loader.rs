use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::RobowoofyConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["robowoofy.toml", "config/robowoofy.toml"];

pub const SAFE_ENV: &str = "ROBOWOOFY_SAFE";
pub const RPC_URL_ENV: &str = "ROBOWOOFY_RPC_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("解析配置 {path} 失败: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("配置项 {field} 缺失")]
    Missing { field: &'static str },
    #[error("配置项 {field} 非法: {message}")]
    Invalid { field: &'static str, message: String },
}

/// 按路径或默认位置加载配置，随后应用环境变量覆盖；找不到文件时使用默认值。
pub fn load_config(path: Option<PathBuf>) -> Result<RobowoofyConfig, ConfigError> {
    let mut config = load_file_or_default(path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

fn load_file_or_default(path: Option<PathBuf>) -> Result<RobowoofyConfig, ConfigError> {
    let candidate_paths = match path {
        Some(p) => vec![p],
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    for candidate in candidate_paths {
        if let Some(config) = try_load_file(&candidate)? {
            debug!(target: "config", path = %candidate.display(), "已加载配置文件");
            return Ok(config);
        }
    }

    Ok(RobowoofyConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<RobowoofyConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: RobowoofyConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

pub(crate) fn apply_env_overrides<F>(config: &mut RobowoofyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    if let Some(safe) = non_empty(SAFE_ENV) {
        config.safe.address = Some(safe);
    }
    if let Some(url) = non_empty(RPC_URL_ENV) {
        config.chain.rpc_url = Some(url);
    }
}

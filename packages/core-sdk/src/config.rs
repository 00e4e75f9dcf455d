use std::path::PathBuf;
use std::time::Duration;

use crate::llm::{process_env, EnvLookup};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/**
 * \brief 运行期配置，来源于 GAMEFORGE_* 环境变量。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /** \brief 单次 Provider 请求的超时 */
    pub request_timeout: Duration,
    /** \brief 是否写入本地遥测日志 */
    pub telemetry_enabled: bool,
    /** \brief 遥测日志目录 */
    pub log_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            telemetry_enabled: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /**
     * \brief 从给定读取函数构造；非法值回落到默认值。
     */
    pub fn from_lookup(env: EnvLookup) -> Self {
        let defaults = Self::default();
        let request_timeout = env("GAMEFORGE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let telemetry_enabled = env("GAMEFORGE_TELEMETRY")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.telemetry_enabled);
        let log_dir = env("GAMEFORGE_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);
        Self {
            request_timeout,
            telemetry_enabled,
            log_dir,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = GeneratorConfig::from_lookup(|_| None);
        assert_eq!(cfg, GeneratorConfig::default());
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_reads_overrides() {
        let cfg = GeneratorConfig::from_lookup(|name| match name {
            "GAMEFORGE_TIMEOUT_SECS" => Some("30".to_string()),
            "GAMEFORGE_TELEMETRY" => Some("Yes".to_string()),
            "GAMEFORGE_LOG_DIR" => Some("/tmp/gf-logs".to_string()),
            _ => None,
        });
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert!(cfg.telemetry_enabled);
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/gf-logs"));
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        let cfg = GeneratorConfig::from_lookup(|name| match name {
            "GAMEFORGE_TIMEOUT_SECS" => Some("0".to_string()),
            "GAMEFORGE_TELEMETRY" => Some("nope".to_string()),
            _ => None,
        });
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
        assert!(!cfg.telemetry_enabled);

        let cfg = GeneratorConfig::from_lookup(|name| {
            (name == "GAMEFORGE_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
    }
}

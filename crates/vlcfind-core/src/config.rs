//! 发现流程配置（`discovery.json` + 环境变量覆盖）。
//!
//! 优先级（低 → 高）：
//! - 结构体默认值
//! - JSON 配置文件（所有字段均可省略）
//! - 环境变量 `VLCFIND_*`
//! - 命令行参数（由上层 CLI 直接修改字段）
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VersionError;
use crate::version::{Version, LIBVLC_MIN_VERSION};

/// libvlc 读取插件目录的环境变量名。
pub const PLUGIN_ENV_NAME: &str = "VLC_PLUGIN_PATH";

/// 显式指定搜索路径（等价于 `jna.library.path`）。
pub const ENV_LIBRARY_PATH: &str = "VLCFIND_LIBRARY_PATH";
pub const ENV_MIN_VERSION: &str = "VLCFIND_MIN_VERSION";
pub const ENV_SCAN_MODE: &str = "VLCFIND_SCAN_MODE";
pub const ENV_MAC_PRELOAD_CORE: &str = "VLCFIND_MAC_PRELOAD_CORE";

/// 目录扫描模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// 只检查目录本身。
    #[default]
    Flat,
    /// 目录本身不满足时，再向下检查一层子目录。
    Recursive,
}

/// 发现流程配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 最低可接受的 libvlc 版本。
    pub min_version: String,
    /// 插件目录环境变量名。
    pub plugin_env_name: String,
    /// 显式搜索路径列表（平台路径分隔符拼接），优先级最高。
    pub library_path: Option<String>,
    /// 额外的用户目录（普通优先级）。
    pub extra_directories: Vec<PathBuf>,
    pub scan_mode: ScanMode,
    /// 递归扫描时跳过条目数超过该值的子目录。
    pub max_subdirectory_entries: usize,
    /// macOS：在主库之前强制加载 libvlccore。
    pub mac_preload_core: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_version: LIBVLC_MIN_VERSION.to_string(),
            plugin_env_name: PLUGIN_ENV_NAME.to_string(),
            library_path: None,
            extra_directories: Vec::new(),
            scan_mode: ScanMode::Flat,
            max_subdirectory_entries: 16,
            mac_preload_core: true,
        }
    }
}

impl DiscoveryConfig {
    /// 读取并解析 JSON 配置文件。
    ///
    /// 异常处理：
    /// - 文件读取失败（不存在/权限/IO）返回错误
    /// - JSON 解析失败返回错误
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("读取配置失败: {}", path.display()))?;
        let config: DiscoveryConfig =
            serde_json::from_slice(&bytes).context("解析配置 JSON 失败")?;
        Ok(config)
    }

    /// 使用 `VLCFIND_*` 环境变量覆盖对应字段。
    ///
    /// 说明：
    /// - 取值非法的变量会被忽略并输出警告，不会使流程失败
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_LIBRARY_PATH).filter(|v| !v.trim().is_empty()) {
            self.library_path = Some(v);
        }
        if let Some(v) = lookup(ENV_MIN_VERSION) {
            match Version::parse(v.trim()) {
                Ok(_) => self.min_version = v.trim().to_string(),
                Err(e) => warn!("忽略非法的 {}: {}", ENV_MIN_VERSION, e),
            }
        }
        if let Some(v) = lookup(ENV_SCAN_MODE) {
            match v.trim().to_ascii_lowercase().as_str() {
                "flat" => self.scan_mode = ScanMode::Flat,
                "recursive" => self.scan_mode = ScanMode::Recursive,
                other => warn!("忽略非法的 {}: {}", ENV_SCAN_MODE, other),
            }
        }
        if let Some(v) = lookup(ENV_MAC_PRELOAD_CORE) {
            match parse_bool(&v) {
                Some(b) => self.mac_preload_core = b,
                None => warn!("忽略非法的 {}: {}", ENV_MAC_PRELOAD_CORE, v),
            }
        }
        self
    }

    /// 解析 `min_version` 字段。
    pub fn min_version(&self) -> Result<Version, VersionError> {
        Version::parse(&self.min_version)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

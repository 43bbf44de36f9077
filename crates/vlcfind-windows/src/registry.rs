//! 注册表读取（VLC 安装目录定位）。
//!
//! 主要用途：
//! - 读取 VLC 安装程序写入的 `HKLM\SOFTWARE\VideoLAN\VLC` → `InstallDir`
//! - 提供通用的字符串值读取，便于测试在 HKCU 下构造临时键
//!
//! 权限要求：
//! - 读取大多数系统键通常不需要管理员，但某些机器策略可能限制
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
use winreg::RegKey;

/// VLC 安装程序写入的注册表子键（位于 HKLM 下）。
pub const VLC_REGISTRY_KEY: &str = "SOFTWARE\\VideoLAN\\VLC";

/// 保存安装目录的值名。
pub const VLC_INSTALL_DIR_VALUE: &str = "InstallDir";

/// 注册表根键。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryHive {
    /// HKEY_LOCAL_MACHINE。
    Hklm,
    /// HKEY_CURRENT_USER。
    Hkcu,
}

/// 读取指定键下的字符串值（REG_SZ / REG_EXPAND_SZ）。
///
/// 参数：
/// - `hive`：根键
/// - `key`：子键路径（不含根键）
/// - `value_name`：值名
///
/// 异常处理：
/// - 打开键或读取值失败会返回错误（常见原因：键不存在、权限不足、类型不匹配）。
pub fn read_string_value(hive: RegistryHive, key: &str, value_name: &str) -> Result<String> {
    let root = match hive {
        RegistryHive::Hklm => RegKey::predef(HKEY_LOCAL_MACHINE),
        RegistryHive::Hkcu => RegKey::predef(HKEY_CURRENT_USER),
    };
    let sub = root
        .open_subkey(key)
        .with_context(|| format!("打开注册表键失败: {}\\{}", hive_name(hive), key))?;
    let value: String = sub
        .get_value(value_name)
        .with_context(|| format!("读取 SZ 失败: {value_name}"))?;
    Ok(value)
}

/// 读取 VLC 安装目录（`HKLM\SOFTWARE\VideoLAN\VLC` 的 `InstallDir`）。
///
/// 返回值：
/// - 成功：安装目录路径
///
/// 异常处理：
/// - 未安装 VLC 或键值为空时返回错误；调用方（目录提供者）应将其视为“无候选目录”。
pub fn read_install_dir() -> Result<PathBuf> {
    let raw = read_string_value(RegistryHive::Hklm, VLC_REGISTRY_KEY, VLC_INSTALL_DIR_VALUE)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("注册表 InstallDir 为空");
    }
    debug!("注册表 InstallDir = {}", trimmed);
    Ok(PathBuf::from(trimmed))
}

fn hive_name(h: RegistryHive) -> &'static str {
    match h {
        RegistryHive::Hklm => "HKLM",
        RegistryHive::Hkcu => "HKCU",
    }
}

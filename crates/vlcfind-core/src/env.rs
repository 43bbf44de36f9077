//! 插件目录环境变量的读写。
//!
//! 写入方式由平台规则决定：
//! - POSIX：直接修改进程环境（`setenv`）
//! - Windows：通过 C 运行库 `_putenv_s` 写入，libvlc 读取的是 CRT 的环境副本
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use anyhow::Result;
use serde::Serialize;

/// 环境变量写入机制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMechanism {
    Posix,
    CrtPutenv,
}

/// 进程环境访问接口（测试中以内存实现替换）。
pub trait PluginEnv: Send {
    /// 读取变量；未设置时返回 `None`。
    fn var(&self, name: &str) -> Option<String>;

    fn set_var(&self, name: &str, value: &str, mechanism: EnvMechanism) -> Result<()>;

    fn remove_var(&self, name: &str, mechanism: EnvMechanism) -> Result<()>;
}

/// 真实进程环境。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl PluginEnv for SystemEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_var(&self, name: &str, value: &str, mechanism: EnvMechanism) -> Result<()> {
        match mechanism {
            #[cfg(windows)]
            EnvMechanism::CrtPutenv => vlcfind_windows::crt::putenv(name, value),
            _ => {
                std::env::set_var(name, value);
                Ok(())
            }
        }
    }

    fn remove_var(&self, name: &str, mechanism: EnvMechanism) -> Result<()> {
        match mechanism {
            #[cfg(windows)]
            EnvMechanism::CrtPutenv => vlcfind_windows::crt::unputenv(name),
            _ => {
                std::env::remove_var(name);
                Ok(())
            }
        }
    }
}

//! Windows 平台能力封装（注册表、C 运行库环境变量）。
//!
//! 目标：
//! - 将 Windows 专有 API 集中封装，`vlcfind-core` 只在 Windows 目标上依赖本 crate
//! - 统一错误处理风格（以 `anyhow::Result` 形式向上返回）
//!
//! 说明：
//! - 非 Windows 目标上本 crate 为空壳，所有模块均以 `cfg(windows)` 编译
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

#[cfg(windows)]
pub mod crt;
#[cfg(windows)]
pub mod registry;

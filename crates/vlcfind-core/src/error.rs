//! 错误类型定义。
//!
//! 约定：
//! - 需要调用方按类型区分的错误使用 `thiserror` 定义（版本解析、原生绑定）
//! - 配置读取等 IO 类错误直接使用 `anyhow::Result` 并附加上下文
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::PathBuf;

use thiserror::Error;

/// 版本号解析错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("无法解析版本号: '{0}'")]
    Format(String),
    #[error("版本号分量超出 u32 范围: '{0}'")]
    Overflow(String),
}

/// 原生库绑定层错误。
///
/// 用途：
/// - 由 [`crate::binding::NativeBinding`] 的实现返回
/// - 探测阶段的任何此类错误都被编排器视为“验证失败”，触发回滚并继续搜索
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("未找到原生库 '{name}'（已尝试 {tried:?}）")]
    NotFound { name: String, tried: Vec<PathBuf> },
    #[error("加载原生库失败: {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("原生库缺少符号 '{symbol}'")]
    MissingSymbol {
        symbol: String,
        #[source]
        source: libloading::Error,
    },
    #[error("libvlc_new 返回空实例")]
    NullInstance,
    #[error("原生库未报告版本号")]
    NoVersion,
    #[error("{0}")]
    Other(String),
}

/// 验证探测失败的原因（仅用于日志与诊断记录，不会传播给 `discover()` 的调用方）。
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("原生库报告的版本无效: {0}")]
    Version(#[from] VersionError),
    #[error("版本 {found} 低于要求的 {required}")]
    TooOld { found: String, required: String },
}

//! libvlc 原生库发现与验证核心库（跨平台）。
//!
//! 功能：
//! - 按平台规则与候选目录提供者有序搜索 libvlc 安装目录
//! - 找到目录后注册绑定层搜索路径、设置插件目录环境变量
//! - 一次性加载探测并校验最低版本；失败时回滚绑定缓存并继续搜索
//! - 提供进程级、提交后只读的发现状态
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

pub mod binding;
pub mod config;
pub mod discovery;
pub mod env;
pub mod error;
pub mod paths;
pub mod provider;
pub mod rule;
pub mod scanner;
pub mod version;

pub use binding::{LibVlcBinding, NativeBinding, ProbeReport, LIBVLCCORE_NAME, LIBVLC_NAME};
pub use config::{DiscoveryConfig, ScanMode, PLUGIN_ENV_NAME};
pub use discovery::{discover, global, lock_global, DiscoveryPhase, DiscoveryReport, NativeDiscovery};
pub use env::{EnvMechanism, PluginEnv, SystemEnv};
pub use error::{BindingError, VerifyError, VersionError};
pub use provider::{DirectoryProvider, Priority, ProviderRegistry, StaticProvider};
pub use rule::PlatformRule;
pub use scanner::DirectoryScanner;
pub use version::Version;

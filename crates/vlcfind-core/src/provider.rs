//! 候选目录提供者（DirectoryProvider）及其注册表。
//!
//! 约定：
//! - 提供者在启动时按平台静态注册，注册后在一次发现流程内只读
//! - `directories()` 必须容忍来源缺失（环境变量未设置、注册表键不存在），此时返回空列表
//! - `list_applicable()` 先按 `applicable()` 过滤，再按优先级稳定排序（同优先级保持注册顺序）
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::PathBuf;

use serde::Serialize;

use crate::config::DiscoveryConfig;
use crate::paths;

/// 提供者优先级，声明顺序即排序顺序（`Overwrite` 最先）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Overwrite,
    Highest,
    High,
    Normal,
    Low,
    Lowest,
}

/// 一组候选搜索目录的来源。
pub trait DirectoryProvider: Send {
    fn name(&self) -> &str;

    fn priority(&self) -> Priority;

    /// 当前环境下是否启用。
    fn applicable(&self) -> bool;

    /// 按顺序返回候选目录；来源缺失时返回空列表，不报错。
    fn directories(&self) -> Vec<PathBuf>;
}

/// 提供者注册表。
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn DirectoryProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按平台注册内置提供者。
    ///
    /// 注册顺序：显式路径 → Windows 注册表 → Windows 安装目录 → Linux → macOS → 额外目录 → PATH。
    pub fn builtin(config: &DiscoveryConfig) -> Self {
        let mut registry = Self::new();
        registry.register(LibraryPathProvider::new(config.library_path.clone()));
        registry.register(WindowsRegistryProvider);
        registry.register(WindowsInstallProvider);
        registry.register(LinuxProvider);
        registry.register(MacProvider);
        registry.register(StaticProvider::new(
            "ExtraDirectories",
            Priority::Normal,
            config.extra_directories.clone(),
        ));
        registry.register(SystemPathProvider);
        registry
    }

    pub fn register(&mut self, provider: impl DirectoryProvider + 'static) -> &mut Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 当前启用的提供者，按优先级升序（稳定排序）。
    pub fn list_applicable(&self) -> Vec<&dyn DirectoryProvider> {
        let mut result: Vec<&dyn DirectoryProvider> = self
            .providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| p.applicable())
            .collect();
        result.sort_by_key(|p| p.priority());
        result
    }
}

/// 固定目录列表的提供者（用于配置中的额外目录，或宿主程序自行注册）。
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    priority: Priority,
    directories: Vec<PathBuf>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, priority: Priority, directories: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            priority,
            directories,
        }
    }
}

impl DirectoryProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn applicable(&self) -> bool {
        !self.directories.is_empty()
    }

    fn directories(&self) -> Vec<PathBuf> {
        self.directories.clone()
    }
}

/// 显式指定的搜索路径（配置 `library_path` 或 `VLCFIND_LIBRARY_PATH`），始终最先尝试。
#[derive(Debug, Clone)]
pub struct LibraryPathProvider {
    raw: Option<String>,
}

impl LibraryPathProvider {
    pub fn new(raw: Option<String>) -> Self {
        Self { raw }
    }
}

impl DirectoryProvider for LibraryPathProvider {
    fn name(&self) -> &str {
        "LibraryPathProvider"
    }

    fn priority(&self) -> Priority {
        Priority::Overwrite
    }

    fn applicable(&self) -> bool {
        self.raw.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    fn directories(&self) -> Vec<PathBuf> {
        self.raw
            .as_deref()
            .map(paths::split_path_list)
            .unwrap_or_default()
    }
}

/// `HKLM\SOFTWARE\VideoLAN\VLC` 中记录的安装目录。
#[derive(Debug, Clone, Copy)]
pub struct WindowsRegistryProvider;

impl DirectoryProvider for WindowsRegistryProvider {
    fn name(&self) -> &str {
        "WindowsRegistryProvider"
    }

    fn priority(&self) -> Priority {
        Priority::Highest
    }

    fn applicable(&self) -> bool {
        cfg!(windows)
    }

    #[cfg(windows)]
    fn directories(&self) -> Vec<PathBuf> {
        match vlcfind_windows::registry::read_install_dir() {
            Ok(dir) => vec![dir],
            Err(e) => {
                tracing::debug!("注册表中未找到 VLC 安装目录: {:#}", e);
                Vec::new()
            }
        }
    }

    #[cfg(not(windows))]
    fn directories(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Windows 默认安装位置（Program Files）。
#[derive(Debug, Clone, Copy)]
pub struct WindowsInstallProvider;

impl DirectoryProvider for WindowsInstallProvider {
    fn name(&self) -> &str {
        "WindowsInstallProvider"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn applicable(&self) -> bool {
        cfg!(windows)
    }

    fn directories(&self) -> Vec<PathBuf> {
        paths::program_files_vlc_dirs()
    }
}

/// 常见 Linux 发行版与 flatpak 的库目录。
#[derive(Debug, Clone, Copy)]
pub struct LinuxProvider;

const LINUX_DIRECTORIES: &[&str] = &[
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/usr/lib64",
    "/usr/local/lib64",
    "/usr/lib/i386-linux-gnu",
    "/usr/lib",
    "/usr/lib/vlc",
    "/usr/bin",
    "/usr/bin/vlc",
    "/usr/local/lib",
    "/usr/local/lib/vlc",
    "/var/lib/flatpak",
    "/var/lib/flatpak/org.videolan.VLC",
    "/var/lib/flatpak/app/org.videolan.VLC",
    "/bin",
];

impl DirectoryProvider for LinuxProvider {
    fn name(&self) -> &str {
        "LinuxProvider"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "linux")
    }

    fn directories(&self) -> Vec<PathBuf> {
        LINUX_DIRECTORIES.iter().map(PathBuf::from).collect()
    }
}

/// VLC.app 包内的库目录。
#[derive(Debug, Clone, Copy)]
pub struct MacProvider;

impl DirectoryProvider for MacProvider {
    fn name(&self) -> &str {
        "MacProvider"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "macos")
    }

    fn directories(&self) -> Vec<PathBuf> {
        vec![
            PathBuf::from("/Applications/VLC.app/Contents/Frameworks"),
            PathBuf::from("/Applications/VLC.app/Contents/MacOS/lib"),
        ]
    }
}

/// `PATH` 中的每个目录（非 Windows 平台的兜底搜索）。
#[derive(Debug, Clone, Copy)]
pub struct SystemPathProvider;

impl DirectoryProvider for SystemPathProvider {
    fn name(&self) -> &str {
        "SystemPathProvider"
    }

    fn priority(&self) -> Priority {
        Priority::Lowest
    }

    fn applicable(&self) -> bool {
        !cfg!(windows)
    }

    fn directories(&self) -> Vec<PathBuf> {
        paths::env_path_list("PATH")
    }
}

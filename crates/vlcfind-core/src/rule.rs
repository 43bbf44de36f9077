//! 平台规则（PlatformRule）：每个操作系统家族的文件名模式、插件子目录与环境变量接线方式。
//!
//! 找到候选目录后的副作用（`on_found`）按顺序执行：
//! 1) 将目录注册为 libvlc 的搜索路径
//! 2) 插件目录环境变量已存在且非空：直接视为满足，不覆盖
//! 3) 否则按声明顺序检查插件子目录，第一个存在的写入环境变量
//!
//! 没有任何插件子目录且环境变量未预设时返回 `false`，
//! 编排器据此放弃该候选目录并继续搜索（软失败）。
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::binding::{NativeBinding, LIBVLCCORE_NAME, LIBVLC_NAME};
use crate::config::DiscoveryConfig;
use crate::env::{EnvMechanism, PluginEnv};

/// 将模式编译为完整匹配（等价于 `Matcher::matches`）。
///
/// 说明：
/// - 模式均为编译期常量，编译失败属于编程错误
pub fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})$")).expect("binary pattern is a valid regex")
}

/// 平台规则。
pub trait PlatformRule: Send {
    fn name(&self) -> &str;

    /// 当前操作系统是否适用该规则。
    fn applicable(&self) -> bool;

    /// 目录中必须全部命中的文件名模式（顺序无关）。
    fn binary_patterns(&self) -> &[Regex];

    /// 相对找到目录的插件子目录候选，按顺序检查，先到先得。
    fn plugin_subpaths(&self) -> &[&'static str];

    fn env_mechanism(&self) -> EnvMechanism {
        EnvMechanism::Posix
    }

    /// 找到目录后的副作用，见模块文档。
    fn on_found(
        &self,
        path: &Path,
        binding: &mut dyn NativeBinding,
        env: &dyn PluginEnv,
        plugin_env_name: &str,
    ) -> bool {
        wire_found_directory(self, path, binding, env, plugin_env_name)
    }

    /// 写入插件目录环境变量；没有可用子目录或写入失败时返回 `false`。
    fn set_plugin_path(&self, path: &Path, env: &dyn PluginEnv, plugin_env_name: &str) -> bool {
        let Some(plugins) = self
            .plugin_subpaths()
            .iter()
            .map(|sub| absolute(&path.join(sub)))
            .find(|p| p.exists())
        else {
            debug!("'{}' 下没有可用的插件目录 {:?}", path.display(), self.plugin_subpaths());
            return false;
        };
        let value = plugins.to_string_lossy();
        match env.set_var(plugin_env_name, &value, self.env_mechanism()) {
            Ok(()) => {
                debug!("{} = '{}'", plugin_env_name, value);
                true
            }
            Err(e) => {
                warn!("写入 {} 失败: {:#}", plugin_env_name, e);
                false
            }
        }
    }
}

/// `on_found` 的默认流程：注册 libvlc 搜索路径，再按需写入插件目录环境变量。
pub fn wire_found_directory<R: PlatformRule + ?Sized>(
    rule: &R,
    path: &Path,
    binding: &mut dyn NativeBinding,
    env: &dyn PluginEnv,
    plugin_env_name: &str,
) -> bool {
    binding.register_search_path(LIBVLC_NAME, path);
    match env.var(plugin_env_name) {
        Some(existing) if !existing.is_empty() => {
            debug!("{} 已设置为 '{}'，保留现有值", plugin_env_name, existing);
            true
        }
        _ => rule.set_plugin_path(path, env, plugin_env_name),
    }
}

/// 规整为绝对路径并消去 `..`；无法规整时退回未规整的绝对路径。
fn absolute(p: &Path) -> PathBuf {
    std::fs::canonicalize(p)
        .ok()
        .map(strip_verbatim)
        .or_else(|| std::path::absolute(p).ok())
        .unwrap_or_else(|| p.to_path_buf())
}

/// Windows 下 `canonicalize` 返回 `\\?\C:\...`，libvlc 不接受该前缀。
#[cfg(windows)]
fn strip_verbatim(p: PathBuf) -> PathBuf {
    match p.to_str().and_then(|s| s.strip_prefix(r"\\?\")) {
        Some(rest) if !rest.starts_with("UNC\\") => PathBuf::from(rest),
        _ => p,
    }
}

#[cfg(not(windows))]
fn strip_verbatim(p: PathBuf) -> PathBuf {
    p
}

/// 按注册顺序返回内置规则（Linux、macOS、Windows）。
pub fn builtin_rules(config: &DiscoveryConfig) -> Vec<Box<dyn PlatformRule>> {
    vec![
        Box::new(LinuxRule::new()),
        Box::new(MacRule::new(config.mac_preload_core)),
        Box::new(WindowsRule::new()),
    ]
}

/// Linux：`libvlc.so[.N...]` + `libvlccore.so[.N...]`。
pub struct LinuxRule {
    patterns: Vec<Regex>,
}

impl LinuxRule {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                anchored(r"libvlc\.so(?:\.[0-9]+)*"),
                anchored(r"libvlccore\.so(?:\.[0-9]+)*"),
            ],
        }
    }
}

impl Default for LinuxRule {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformRule for LinuxRule {
    fn name(&self) -> &str {
        "LinuxRule"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "linux")
    }

    fn binary_patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn plugin_subpaths(&self) -> &[&'static str] {
        &["plugins", "vlc/plugins"]
    }
}

/// macOS：VLC.app 的 `Frameworks`/`lib` 目录，插件位于上一级 `plugins`。
pub struct MacRule {
    patterns: Vec<Regex>,
    preload_core: bool,
}

impl MacRule {
    /// `preload_core`：在主库之前按名称强制加载 libvlccore，规避链接期符号解析问题。
    pub fn new(preload_core: bool) -> Self {
        Self {
            patterns: vec![anchored(r"libvlc\.dylib"), anchored(r"libvlccore\.dylib")],
            preload_core,
        }
    }

    pub fn preload_core(&self) -> bool {
        self.preload_core
    }
}

impl PlatformRule for MacRule {
    fn name(&self) -> &str {
        "MacRule"
    }

    fn applicable(&self) -> bool {
        cfg!(target_os = "macos")
    }

    fn binary_patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn plugin_subpaths(&self) -> &[&'static str] {
        &["../plugins"]
    }

    fn on_found(
        &self,
        path: &Path,
        binding: &mut dyn NativeBinding,
        env: &dyn PluginEnv,
        plugin_env_name: &str,
    ) -> bool {
        if self.preload_core {
            binding.register_search_path(LIBVLCCORE_NAME, path);
            if let Err(e) = binding.preload_library(LIBVLCCORE_NAME) {
                warn!("预加载 {} 失败: {}", LIBVLCCORE_NAME, e);
                return false;
            }
        }
        wire_found_directory(self, path, binding, env, plugin_env_name)
    }
}

/// Windows：`libvlc.dll` + `libvlccore.dll`，环境变量经 C 运行库写入。
pub struct WindowsRule {
    patterns: Vec<Regex>,
}

impl WindowsRule {
    pub fn new() -> Self {
        Self {
            patterns: vec![anchored(r"libvlc\.dll"), anchored(r"libvlccore\.dll")],
        }
    }
}

impl Default for WindowsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformRule for WindowsRule {
    fn name(&self) -> &str {
        "WindowsRule"
    }

    fn applicable(&self) -> bool {
        cfg!(windows)
    }

    fn binary_patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn plugin_subpaths(&self) -> &[&'static str] {
        &["plugins", "vlc/plugins"]
    }

    fn env_mechanism(&self) -> EnvMechanism {
        EnvMechanism::CrtPutenv
    }
}

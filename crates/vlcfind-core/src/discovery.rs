//! 发现编排器：平台规则 × 目录提供者 × 候选目录的有序搜索、验证探测与失败回滚。
//!
//! 状态机：
//! - `NotStarted → Searching → {Committed, Exhausted}`
//! - `Committed` 为终态且幂等：之后的 `discover()` 直接返回 `true`，不再扫描
//! - `Exhausted` 不缓存：用户安装依赖后可再次调用 `discover()` 重新搜索
//!
//! 失败处理：
//! - 目录不可搜索、插件目录缺失、验证失败都只影响当前候选目录，搜索继续
//! - 每次放弃候选目录都会清除绑定层中 libvlc/libvlccore 的缓存，并恢复插件目录环境变量
//!
//! 并发约定：
//! - `discover()` 需要 `&mut self`；进程级实例由 [`global`] 返回的互斥锁串行化
//! - 验证探测没有超时，也不支持取消（原生库加载卡死无法恢复）
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::binding::{LibVlcBinding, NativeBinding, LIBVLCCORE_NAME, LIBVLC_NAME};
use crate::config::DiscoveryConfig;
use crate::env::{EnvMechanism, PluginEnv, SystemEnv};
use crate::error::{VerifyError, VersionError};
use crate::provider::ProviderRegistry;
use crate::rule::{builtin_rules, PlatformRule};
use crate::scanner::DirectoryScanner;
use crate::version::{libvlc_min_version, Version};

/// 发现流程所处阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPhase {
    #[default]
    NotStarted,
    Searching,
    Committed,
    Exhausted,
}

/// 已提交的发现结果（提交后只读）。
#[derive(Debug, Clone, Default)]
pub struct DiscoveryState {
    phase: DiscoveryPhase,
    active_rule: Option<usize>,
    discovered_path: Option<PathBuf>,
    native_version: Option<Version>,
}

impl DiscoveryState {
    pub fn phase(&self) -> DiscoveryPhase {
        self.phase
    }

    pub fn is_discovered(&self) -> bool {
        self.phase == DiscoveryPhase::Committed
    }

    pub fn discovered_path(&self) -> Option<&Path> {
        self.discovered_path.as_deref()
    }

    pub fn native_version(&self) -> Option<&Version> {
        self.native_version.as_ref()
    }
}

/// 单个候选目录的处理结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// `on_found` 返回 `false`（插件目录缺失或预加载失败）。
    PluginPathMissing,
    /// 验证探测失败，已回滚。
    VerifyFailed { reason: String },
    Committed { version: String },
}

/// 一次候选目录尝试的诊断记录。
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub rule: String,
    pub provider: String,
    pub directory: PathBuf,
    pub outcome: AttemptOutcome,
}

/// 面向宿主程序/CLI 的可序列化结果。
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub discovered: bool,
    pub phase: DiscoveryPhase,
    pub rule: Option<String>,
    pub path: Option<PathBuf>,
    pub native_version: Option<String>,
    pub min_version: String,
    pub attempts: Vec<Attempt>,
    pub generated_at: OffsetDateTime,
}

/// 发现编排器。
pub struct NativeDiscovery {
    rules: Vec<Box<dyn PlatformRule>>,
    providers: ProviderRegistry,
    scanner: DirectoryScanner,
    binding: Box<dyn NativeBinding>,
    env: Box<dyn PluginEnv>,
    min_version: Version,
    plugin_env_name: String,
    state: DiscoveryState,
    attempts: Vec<Attempt>,
}

impl NativeDiscovery {
    /// 由调用方显式提供规则、提供者与协作方。
    ///
    /// 说明：
    /// - 扫描器默认为平铺模式，插件目录变量默认为 `VLC_PLUGIN_PATH`
    pub fn new(
        rules: Vec<Box<dyn PlatformRule>>,
        providers: ProviderRegistry,
        binding: impl NativeBinding + 'static,
        env: impl PluginEnv + 'static,
        min_version: Version,
    ) -> Self {
        Self {
            rules,
            providers,
            scanner: DirectoryScanner::default(),
            binding: Box::new(binding),
            env: Box::new(env),
            min_version,
            plugin_env_name: crate::config::PLUGIN_ENV_NAME.to_string(),
            state: DiscoveryState::default(),
            attempts: Vec::new(),
        }
    }

    /// 按配置组装内置规则与内置提供者。
    ///
    /// 异常处理：
    /// - `config.min_version` 无法解析时返回错误
    pub fn from_config(
        config: &DiscoveryConfig,
        binding: impl NativeBinding + 'static,
        env: impl PluginEnv + 'static,
    ) -> Result<Self, VersionError> {
        let min_version = config.min_version()?;
        Ok(Self::assemble(config, min_version, binding, env))
    }

    /// 使用环境变量覆盖后的默认配置、真实 libvlc 绑定与真实进程环境。
    pub fn system() -> Self {
        let config = DiscoveryConfig::default().with_env_overrides();
        let min_version = config.min_version().unwrap_or_else(|e| {
            warn!("最低版本配置无效，使用默认值: {}", e);
            libvlc_min_version()
        });
        Self::assemble(&config, min_version, LibVlcBinding::new(), SystemEnv)
    }

    fn assemble(
        config: &DiscoveryConfig,
        min_version: Version,
        binding: impl NativeBinding + 'static,
        env: impl PluginEnv + 'static,
    ) -> Self {
        Self::new(
            builtin_rules(config),
            ProviderRegistry::builtin(config),
            binding,
            env,
            min_version,
        )
        .with_scanner(DirectoryScanner::from_config(config))
        .with_plugin_env_name(config.plugin_env_name.clone())
    }

    pub fn with_scanner(mut self, scanner: DirectoryScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_plugin_env_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_env_name = name.into();
        self
    }

    pub fn is_discovered(&self) -> bool {
        self.state.is_discovered()
    }

    pub fn phase(&self) -> DiscoveryPhase {
        self.state.phase
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    /// 提交时使用的平台规则。
    pub fn active_rule(&self) -> Option<&dyn PlatformRule> {
        self.state.active_rule.map(|i| self.rules[i].as_ref())
    }

    pub fn discovered_path(&self) -> Option<&Path> {
        self.state.discovered_path()
    }

    pub fn min_version(&self) -> &Version {
        &self.min_version
    }

    pub fn plugin_env_name(&self) -> &str {
        &self.plugin_env_name
    }

    /// 最近一次搜索的候选目录记录。
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn rules(&self) -> &[Box<dyn PlatformRule>] {
        &self.rules
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn binding(&self) -> &dyn NativeBinding {
        self.binding.as_ref()
    }

    /// 执行发现。
    ///
    /// 返回值：
    /// - `true`：已提交（本次提交或此前已提交）
    /// - `false`：所有候选目录均已尝试且无一通过验证
    pub fn discover(&mut self) -> bool {
        if self.state.phase == DiscoveryPhase::Committed {
            return true;
        }
        self.state.phase = DiscoveryPhase::Searching;
        self.attempts.clear();

        let providers = self.providers.list_applicable();
        for (rule_index, rule) in self.rules.iter().enumerate() {
            if !rule.applicable() {
                continue;
            }
            for provider in &providers {
                for directory in provider.directories() {
                    let Some(found) = self.scanner.scan(&directory, rule.binary_patterns()) else {
                        continue;
                    };

                    let previous_env = self.env.var(&self.plugin_env_name);
                    let mut attempt = Attempt {
                        rule: rule.name().to_string(),
                        provider: provider.name().to_string(),
                        directory: found.clone(),
                        outcome: AttemptOutcome::PluginPathMissing,
                    };

                    if !rule.on_found(
                        &found,
                        self.binding.as_mut(),
                        self.env.as_ref(),
                        &self.plugin_env_name,
                    ) {
                        warn!(
                            "'{}' 中缺少插件目录，跳过（{}/{}）",
                            found.display(),
                            rule.name(),
                            provider.name()
                        );
                        rollback(
                            self.binding.as_mut(),
                            self.env.as_ref(),
                            &self.plugin_env_name,
                            rule.env_mechanism(),
                            previous_env.as_deref(),
                        );
                        self.attempts.push(attempt);
                        continue;
                    }

                    match verify(self.binding.as_mut(), &self.min_version) {
                        Ok(version) => {
                            info!(
                                "在 '{}' 找到 VLC {}，使用 '{}/{}'",
                                found.display(),
                                version,
                                rule.name(),
                                provider.name()
                            );
                            attempt.outcome = AttemptOutcome::Committed {
                                version: version.to_string(),
                            };
                            self.attempts.push(attempt);
                            self.state = DiscoveryState {
                                phase: DiscoveryPhase::Committed,
                                active_rule: Some(rule_index),
                                discovered_path: Some(found),
                                native_version: Some(version),
                            };
                            return true;
                        }
                        Err(e) => {
                            error!(
                                "在 '{}' 加载 VLC 失败（{}/{}）: {}，清理绑定缓存后继续搜索",
                                found.display(),
                                rule.name(),
                                provider.name(),
                                e
                            );
                            rollback(
                                self.binding.as_mut(),
                                self.env.as_ref(),
                                &self.plugin_env_name,
                                rule.env_mechanism(),
                                previous_env.as_deref(),
                            );
                            attempt.outcome = AttemptOutcome::VerifyFailed {
                                reason: e.to_string(),
                            };
                            self.attempts.push(attempt);
                        }
                    }
                }
            }
        }

        warn!("未找到可用的 VLC（共尝试 {} 个候选目录）", self.attempts.len());
        self.state.phase = DiscoveryPhase::Exhausted;
        false
    }

    /// 生成可序列化的结果摘要。
    pub fn report(&self) -> DiscoveryReport {
        DiscoveryReport {
            discovered: self.is_discovered(),
            phase: self.state.phase,
            rule: self.active_rule().map(|r| r.name().to_string()),
            path: self.state.discovered_path.clone(),
            native_version: self.state.native_version.as_ref().map(|v| v.to_string()),
            min_version: self.min_version.to_string(),
            attempts: self.attempts.clone(),
            generated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// 一次性探测并比较版本。
fn verify(binding: &mut dyn NativeBinding, min_version: &Version) -> Result<Version, VerifyError> {
    let report = binding.load_and_probe()?;
    let version = Version::parse(report.reported_version.trim())?;
    if !version.at_least(min_version) {
        return Err(VerifyError::TooOld {
            found: version.to_string(),
            required: min_version.to_string(),
        });
    }
    Ok(version)
}

/// 放弃候选目录：清除绑定缓存，并把插件目录变量恢复为 `on_found` 之前的值。
///
/// 可重复执行；`on_found` 只完成一部分时同样安全。
fn rollback(
    binding: &mut dyn NativeBinding,
    env: &dyn PluginEnv,
    plugin_env_name: &str,
    mechanism: EnvMechanism,
    previous: Option<&str>,
) {
    binding.clear_cached_binding(LIBVLC_NAME);
    binding.clear_cached_binding(LIBVLCCORE_NAME);

    if env.var(plugin_env_name).as_deref() == previous {
        return;
    }
    let restored = match previous {
        Some(value) => env.set_var(plugin_env_name, value, mechanism),
        None => env.remove_var(plugin_env_name, mechanism),
    };
    if let Err(e) = restored {
        warn!("恢复 {} 失败: {:#}", plugin_env_name, e);
    }
}

static GLOBAL: Lazy<Mutex<NativeDiscovery>> = Lazy::new(|| Mutex::new(NativeDiscovery::system()));

/// 进程级发现实例（首次访问时按环境变量与默认配置构建）。
///
/// 说明：
/// - 互斥锁保证同一时刻只有一个发现流程在运行
pub fn global() -> &'static Mutex<NativeDiscovery> {
    &GLOBAL
}

/// 锁定进程级实例；锁中毒时继续使用内部状态（发现状态只在提交时整体写入）。
pub fn lock_global() -> MutexGuard<'static, NativeDiscovery> {
    global().lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在进程级实例上执行发现。
pub fn discover() -> bool {
    lock_global().discover()
}

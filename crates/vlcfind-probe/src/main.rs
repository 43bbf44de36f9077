//! libvlc 发现诊断工具（vlcfind-probe）。
//!
//! 职责：
//! - `detect`：在真实进程环境中执行一次完整发现（含验证探测）并输出结果
//! - `scan`：只用平台规则的文件名模式检查单个目录，不产生任何副作用
//! - `providers`：列出当前平台启用的候选目录提供者及其目录
//! - `doctor`：输出平台、库名、插件目录变量等环境信息
//!
//! 输出约定：
//! - 结果写到 stdout（`key = value` 或 JSON），日志写到 stderr
//! - `detect` 未找到可用 VLC 时以非零状态退出
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use vlcfind_core::rule::builtin_rules;
use vlcfind_core::{
    DirectoryScanner, DiscoveryConfig, LibVlcBinding, NativeDiscovery, ProviderRegistry, ScanMode,
    SystemEnv, LIBVLCCORE_NAME, LIBVLC_NAME,
};

/// 命令行参数。
///
/// 说明：
/// - 参数优先级高于 `--config` 文件与 `VLCFIND_*` 环境变量
#[derive(Debug, Parser)]
#[command(name = "vlcfind-probe", version)]
struct Cli {
    /// JSON 配置文件（字段均可省略）。
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    min_version: Option<String>,

    /// 显式搜索路径（平台路径分隔符拼接），最先尝试。
    #[arg(long)]
    library_path: Option<String>,

    /// 目录本身不满足时再检查一层子目录。
    #[arg(long, default_value_t = false)]
    recursive: bool,

    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 执行发现并验证（会加载原生库、写入插件目录变量）。
    Detect {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// 只检查一个目录是否包含平台二进制文件。
    Scan {
        dir: PathBuf,
        /// 同时输出其他平台的规则。
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// 按优先级列出启用的提供者。
    Providers,
    /// 环境自检。
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.parse().context("无效的日志级别")?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Detect { json } => detect(&config, *json),
        Commands::Scan { dir, all } => scan(&config, dir, *all),
        Commands::Providers => providers(&config),
        Commands::Doctor => doctor(&config),
    }
}

/// 合并配置：默认值 → 配置文件 → 环境变量 → 命令行参数。
fn load_config(cli: &Cli) -> Result<DiscoveryConfig> {
    let mut config = match &cli.config {
        Some(path) => DiscoveryConfig::load(path)?,
        None => DiscoveryConfig::default(),
    }
    .with_env_overrides();

    if let Some(v) = &cli.min_version {
        config.min_version = v.clone();
    }
    if let Some(v) = &cli.library_path {
        config.library_path = Some(v.clone());
    }
    if cli.recursive {
        config.scan_mode = ScanMode::Recursive;
    }
    // 尽早暴露非法的最低版本
    config
        .min_version()
        .with_context(|| format!("最低版本无效: {}", config.min_version))?;
    Ok(config)
}

fn detect(config: &DiscoveryConfig, json: bool) -> Result<()> {
    let mut nd = NativeDiscovery::from_config(config, LibVlcBinding::new(), SystemEnv)?;
    let found = nd.discover();
    let report = nd.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("discovered = {}", report.discovered);
        println!("rule = {}", report.rule.as_deref().unwrap_or("none"));
        println!(
            "path = {}",
            report
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        println!(
            "version = {}",
            report.native_version.as_deref().unwrap_or("none")
        );
        println!("min_version = {}", report.min_version);
        println!("attempts = {}", report.attempts.len());
    }

    if !found {
        bail!("未找到可用的 VLC（最低版本 {}）", report.min_version);
    }
    Ok(())
}

fn scan(config: &DiscoveryConfig, dir: &Path, all: bool) -> Result<()> {
    let scanner = DirectoryScanner::from_config(config);
    for rule in builtin_rules(config) {
        if !all && !rule.applicable() {
            continue;
        }
        let matched = scanner.scan(dir, rule.binary_patterns());
        println!(
            "{} = {}",
            rule.name(),
            matched
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }
    Ok(())
}

fn providers(config: &DiscoveryConfig) -> Result<()> {
    let registry = ProviderRegistry::builtin(config);
    for provider in registry.list_applicable() {
        println!("{} [{:?}]", provider.name(), provider.priority());
        for dir in provider.directories() {
            println!("  {}", dir.display());
        }
    }
    Ok(())
}

fn doctor(config: &DiscoveryConfig) -> Result<()> {
    println!("platform = {}/{}", std::env::consts::OS, std::env::consts::ARCH);
    println!("libvlc = {}", LIBVLC_NAME);
    println!("libvlccore = {}", LIBVLCCORE_NAME);
    println!("min_version = {}", config.min_version);
    println!("scan_mode = {:?}", config.scan_mode);
    println!(
        "{} = {}",
        config.plugin_env_name,
        std::env::var(&config.plugin_env_name).unwrap_or_else(|_| "<unset>".to_string())
    );
    #[cfg(windows)]
    match vlcfind_windows::registry::read_install_dir() {
        Ok(dir) => println!("registry_install_dir = {}", dir.display()),
        Err(e) => println!("registry_install_dir = none ({:#})", e),
    }
    info!("自检完成");
    Ok(())
}

//! 目录扫描：判断某目录是否包含平台规则要求的全部二进制文件。
//!
//! 匹配规则：
//! - 只看目录下的直接文件，子目录在平铺扫描中被跳过
//! - 每个模式至少被一个文件命中即可；按模式下标去重，而不是计数
//! - 目录不可列出时返回 `None` 并以 debug 级别输出诊断，不会报错
//!
//! 递归模式（`ScanMode::Recursive`）在平铺扫描失败后再向下检查一层子目录，
//! 条目数超过上限的子目录直接跳过。
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::config::{DiscoveryConfig, ScanMode};
use crate::paths::{self, DirectoryDiagnostics};

#[derive(Debug, Clone, Copy)]
pub struct DirectoryScanner {
    mode: ScanMode,
    max_subdirectory_entries: usize,
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self::new(ScanMode::Flat, 16)
    }
}

impl DirectoryScanner {
    pub fn new(mode: ScanMode, max_subdirectory_entries: usize) -> Self {
        Self {
            mode,
            max_subdirectory_entries,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.scan_mode, config.max_subdirectory_entries)
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// 扫描 `directory`。
    ///
    /// 返回值：
    /// - 平铺扫描命中：原样返回 `directory`
    /// - 递归模式下子目录命中：返回该子目录的绝对路径
    /// - 未命中或目录不可列出：`None`
    pub fn scan(&self, directory: &Path, patterns: &[Regex]) -> Option<PathBuf> {
        let root = paths::resolve_symlink(directory);
        let entries = match list_entries(&root) {
            Some(entries) => entries,
            None => {
                debug!(
                    "无法搜索目录 '{}', {}",
                    directory.display(),
                    DirectoryDiagnostics::collect(directory)
                );
                return None;
            }
        };

        info!("搜索目录 '{}'", directory.display());
        if all_patterns_matched(&entries, patterns) {
            return Some(directory.to_path_buf());
        }

        if self.mode == ScanMode::Recursive {
            return self.scan_subdirectories(&entries, patterns);
        }
        None
    }

    fn scan_subdirectories(&self, entries: &[Entry], patterns: &[Regex]) -> Option<PathBuf> {
        for entry in entries.iter().filter(|e| e.is_dir) {
            let sub = paths::resolve_symlink(&entry.path);
            let Some(children) = list_entries(&sub) else {
                continue;
            };
            if children.len() > self.max_subdirectory_entries {
                debug!(
                    "跳过子目录 '{}'，条目数超过 {}",
                    sub.display(),
                    self.max_subdirectory_entries
                );
                continue;
            }
            info!("搜索子目录 '{}'", sub.display());
            if all_patterns_matched(&children, patterns) {
                return Some(std::path::absolute(&sub).unwrap_or(sub));
            }
        }
        None
    }
}

struct Entry {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

fn list_entries(dir: &Path) -> Option<Vec<Entry>> {
    let read = std::fs::read_dir(dir).ok()?;
    let entries = read
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            // metadata 跟随符号链接，指向目录的链接也按目录处理
            let is_dir = path.is_dir();
            Entry {
                name: e.file_name().to_string_lossy().into_owned(),
                path,
                is_dir,
            }
        })
        .collect();
    Some(entries)
}

fn all_patterns_matched(entries: &[Entry], patterns: &[Regex]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let mut matched: HashSet<usize> = HashSet::with_capacity(patterns.len());
    for entry in entries.iter().filter(|e| !e.is_dir) {
        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.is_match(&entry.name) {
                matched.insert(i);
                if matched.len() == patterns.len() {
                    return true;
                }
            }
        }
    }
    false
}

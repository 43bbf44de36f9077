//! 路径工具：符号链接解析、路径列表拆分、Program Files 目录约定与目录诊断。
//!
//! 目标：
//! - 将“路径从哪里来、如何规整”集中管理，目录提供者与扫描器只关心结果
//! - 所有函数都不会因来源缺失而报错（缺失即返回空/原值）
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// Windows 下 VLC 默认安装的相对目录。
pub const VIDEOLAN_SUBDIR: &str = "VideoLAN\\VLC";

/// 解析一层符号链接。
///
/// 返回值：
/// - `path` 是符号链接且可读取：返回链接目标（相对目标按链接所在目录拼接）
/// - 其他情况（非链接、读取失败）：原样返回 `path`
pub fn resolve_symlink(path: &Path) -> PathBuf {
    let is_link = std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return path.to_path_buf();
    }
    match std::fs::read_link(path) {
        Ok(target) => {
            let target = if target.is_absolute() {
                target
            } else {
                path.parent().map(|p| p.join(&target)).unwrap_or(target)
            };
            if target.is_dir() {
                debug!("路径 '{}' 是指向目录 '{}' 的符号链接", path.display(), target.display());
            } else {
                debug!("路径 '{}' 是指向文件 '{}' 的符号链接", path.display(), target.display());
            }
            target
        }
        Err(_) => path.to_path_buf(),
    }
}

/// 按当前平台的路径分隔符拆分路径列表（`PATH` 风格），忽略空段。
pub fn split_path_list(raw: &str) -> Vec<PathBuf> {
    std::env::split_paths(raw)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// 读取路径列表型环境变量；变量不存在时返回空列表。
pub fn env_path_list(name: &str) -> Vec<PathBuf> {
    match std::env::var(name) {
        Ok(raw) => split_path_list(&raw),
        Err(_) => Vec::new(),
    }
}

/// Windows 下候选的 VLC 安装目录。
///
/// 返回值：
/// - `%ProgramFiles%\VideoLAN\VLC`、`%ProgramFiles(x86)%\VideoLAN\VLC`（存在对应环境变量时）
/// - 两者都缺失时回退为 `C:\Program Files\VideoLAN\VLC`
pub fn program_files_vlc_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
        .map(|v| PathBuf::from(v).join(VIDEOLAN_SUBDIR))
        .collect();
    dirs.dedup();
    if dirs.is_empty() {
        dirs.push(PathBuf::from("C:\\Program Files").join(VIDEOLAN_SUBDIR));
    }
    dirs
}

/// 目录不可搜索时输出的诊断信息。
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryDiagnostics {
    pub path: PathBuf,
    pub exists: bool,
    pub directory: bool,
    pub readable: bool,
    pub executable: bool,
    pub hidden: bool,
}

impl DirectoryDiagnostics {
    /// 采集目录的存在性与权限信息；任何查询失败都按 `false` 记录。
    pub fn collect(path: &Path) -> Self {
        let meta = std::fs::metadata(path).ok();
        let exists = meta.is_some();
        let directory = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        let (readable, executable) = match &meta {
            Some(m) => permission_bits(m),
            None => (false, false),
        };
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false);
        Self {
            path: path.to_path_buf(),
            exists,
            directory,
            readable,
            executable,
            hidden,
        }
    }
}

impl fmt::Display for DirectoryDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DirectoryDiagnostics{{path='{}', exists={}, directory={}, readable={}, executable={}, hidden={}}}",
            self.path.display(),
            self.exists,
            self.directory,
            self.readable,
            self.executable,
            self.hidden
        )
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> (bool, bool) {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    (mode & 0o444 != 0, mode & 0o111 != 0)
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> (bool, bool) {
    (true, meta.is_dir())
}

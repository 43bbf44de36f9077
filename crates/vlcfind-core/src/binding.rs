//! 原生绑定层契约与基于 libloading 的 libvlc 实现。
//!
//! 编排器只依赖 [`NativeBinding`] 的四个操作：
//! - `register_search_path`：为某个库名追加搜索目录
//! - `clear_cached_binding`：清除某个库名的搜索目录与已加载句柄（幂等），
//!   保证下一次 `load_and_probe` 重新搜索，而不是复用失败的结果
//! - `preload_library`：按库名提前加载伴随库（macOS 下的 libvlccore）
//! - `load_and_probe`：一次性创建并释放 libvlc 实例，返回原生库报告的版本
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::debug;

use crate::error::BindingError;

/// libvlc 主库名（不含平台前后缀的部分由 libloading 补全）。
pub const LIBVLC_NAME: &str = if cfg!(windows) { "libvlc" } else { "vlc" };

/// libvlccore 伴随库名。
pub const LIBVLCCORE_NAME: &str = if cfg!(windows) { "libvlccore" } else { "vlccore" };

/// 一次探测的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// 原生库通过 `libvlc_get_version` 报告的版本字符串。
    pub reported_version: String,
}

/// 绑定层接口。
pub trait NativeBinding: Send {
    fn register_search_path(&mut self, name: &str, path: &Path);

    fn clear_cached_binding(&mut self, name: &str);

    fn preload_library(&mut self, name: &str) -> Result<(), BindingError>;

    fn load_and_probe(&mut self) -> Result<ProbeReport, BindingError>;
}

type LibvlcNew = unsafe extern "C" fn(c_int, *const *const c_char) -> *mut c_void;
type LibvlcRelease = unsafe extern "C" fn(*mut c_void);
type LibvlcGetVersion = unsafe extern "C" fn() -> *const c_char;

/// 真实的 libvlc 绑定：按库名维护搜索目录与已加载的 [`Library`] 句柄。
#[derive(Default)]
pub struct LibVlcBinding {
    search_paths: HashMap<String, Vec<PathBuf>>,
    libraries: HashMap<String, Library>,
}

impl LibVlcBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已为 `name` 注册的搜索目录。
    pub fn search_paths(&self, name: &str) -> &[PathBuf] {
        self.search_paths.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 已加载的库句柄（发现成功后宿主程序可继续使用）。
    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.get(name)
    }

    /// 读取已加载 libvlc 的版本字符串。
    pub fn native_version(&mut self) -> Result<String, BindingError> {
        let lib = self.resolve(LIBVLC_NAME)?;
        unsafe { read_version(lib) }
    }

    fn resolve(&mut self, name: &str) -> Result<&Library, BindingError> {
        if !self.libraries.contains_key(name) {
            let lib = self.open_by_name(name)?;
            self.libraries.insert(name.to_string(), lib);
        }
        Ok(&self.libraries[name])
    }

    fn open_by_name(&self, name: &str) -> Result<Library, BindingError> {
        let dirs = self.search_paths(name);
        if dirs.is_empty() {
            let file = libloading::library_filename(name);
            debug!("未注册搜索目录，交由系统加载器查找 {:?}", file);
            return open_library(Path::new(&file)).map_err(|source| BindingError::Load {
                path: PathBuf::from(file),
                source,
            });
        }

        let mut tried = Vec::new();
        let mut last_error = None;
        for dir in dirs {
            for candidate in candidate_files(dir, name) {
                if !candidate.is_file() {
                    continue;
                }
                tried.push(candidate.clone());
                match open_library(&candidate) {
                    Ok(lib) => {
                        debug!("已加载原生库 '{}'", candidate.display());
                        return Ok(lib);
                    }
                    Err(source) => {
                        debug!("加载 '{}' 失败: {}", candidate.display(), source);
                        last_error = Some(BindingError::Load {
                            path: candidate,
                            source,
                        });
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| BindingError::NotFound {
            name: name.to_string(),
            tried,
        }))
    }
}

impl NativeBinding for LibVlcBinding {
    fn register_search_path(&mut self, name: &str, path: &Path) {
        let paths = self.search_paths.entry(name.to_string()).or_default();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    fn clear_cached_binding(&mut self, name: &str) {
        self.search_paths.remove(name);
        self.libraries.remove(name);
    }

    fn preload_library(&mut self, name: &str) -> Result<(), BindingError> {
        self.resolve(name).map(|_| ())
    }

    fn load_and_probe(&mut self) -> Result<ProbeReport, BindingError> {
        let lib = self.resolve(LIBVLC_NAME)?;
        unsafe {
            let new: Symbol<LibvlcNew> = symbol(lib, "libvlc_new")?;
            let release: Symbol<LibvlcRelease> = symbol(lib, "libvlc_release")?;
            let instance = new(0, std::ptr::null());
            if instance.is_null() {
                return Err(BindingError::NullInstance);
            }
            release(instance);
            let reported_version = read_version(lib)?;
            Ok(ProbeReport { reported_version })
        }
    }
}

/// 目录下 `name` 对应的候选文件：平台标准文件名，Linux 下再追加 `.so.N` 版本化文件。
fn candidate_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut files = vec![dir.join(libloading::library_filename(name))];
    if cfg!(target_os = "linux") {
        let prefix = format!("lib{name}.so.");
        if let Ok(entries) = std::fs::read_dir(dir) {
            let mut versioned: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
                .map(|e| e.path())
                .collect();
            versioned.sort();
            files.extend(versioned);
        }
    }
    files
}

#[cfg(windows)]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::windows::{Library as WinLibrary, LOAD_WITH_ALTERED_SEARCH_PATH};
    // libvlc.dll 依赖同目录下的 libvlccore.dll
    unsafe { WinLibrary::load_with_flags(path, LOAD_WITH_ALTERED_SEARCH_PATH) }.map(Library::from)
}

#[cfg(not(windows))]
fn open_library(path: &Path) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

unsafe fn symbol<'lib, T>(lib: &'lib Library, name: &str) -> Result<Symbol<'lib, T>, BindingError> {
    let mut bytes = name.as_bytes().to_vec();
    bytes.push(0);
    lib.get(&bytes).map_err(|source| BindingError::MissingSymbol {
        symbol: name.to_string(),
        source,
    })
}

unsafe fn read_version(lib: &Library) -> Result<String, BindingError> {
    let get_version: Symbol<LibvlcGetVersion> = symbol(lib, "libvlc_get_version")?;
    let ptr = get_version();
    if ptr.is_null() {
        return Err(BindingError::NoVersion);
    }
    Ok(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

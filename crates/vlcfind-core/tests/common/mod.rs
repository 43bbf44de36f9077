#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use regex::Regex;
use uuid::Uuid;

use vlcfind_core::env::{EnvMechanism, PluginEnv};
use vlcfind_core::provider::{DirectoryProvider, Priority};
use vlcfind_core::rule::{anchored, PlatformRule};
use vlcfind_core::{BindingError, NativeBinding, ProbeReport, LIBVLC_NAME};

/// 测试用临时目录树，离开作用域时删除。
pub struct TempTree(pub PathBuf);

impl TempTree {
    pub fn new(prefix: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        Self(dir)
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let p = self.0.join(rel);
        std::fs::create_dir_all(&p).expect("create dir");
        p
    }

    pub fn touch(&self, rel: &str) -> PathBuf {
        let p = self.0.join(rel);
        std::fs::create_dir_all(p.parent().expect("parent")).expect("create parent");
        std::fs::write(&p, b"").unwrap_or_else(|e| panic!("write {} failed: {e}", p.display()));
        p
    }

    /// 创建一个含两个二进制文件与 `plugins/` 的完整安装目录。
    pub fn install(&self, rel: &str) -> PathBuf {
        self.touch(&format!("{rel}/libfake.so"));
        self.touch(&format!("{rel}/libfakecore.so"));
        self.dir(&format!("{rel}/plugins"));
        self.0.join(rel)
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// 插件目录写入环境变量时的取值形式（绝对、已规整）。
pub fn plugin_value(dir: &Path) -> String {
    let canonical = std::fs::canonicalize(dir).expect("canonicalize");
    let text = canonical.to_string_lossy().into_owned();
    match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC\\") => rest.to_string(),
        _ => text,
    }
}

/// 绑定层调用记录与脚本化的探测结果（按首个注册目录决定）。
#[derive(Default)]
pub struct FakeState {
    pub versions: HashMap<PathBuf, Result<String, String>>,
    pub search_paths: HashMap<String, Vec<PathBuf>>,
    pub probes: Vec<PathBuf>,
    pub cleared: Vec<String>,
    pub preloaded: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeBinding(pub Arc<Mutex<FakeState>>);

impl FakeBinding {
    pub fn script(&self, dir: &Path, result: Result<&str, &str>) {
        self.0.lock().unwrap().versions.insert(
            dir.to_path_buf(),
            result.map(str::to_string).map_err(str::to_string),
        );
    }

    pub fn probes(&self) -> Vec<PathBuf> {
        self.0.lock().unwrap().probes.clone()
    }

    pub fn preloaded(&self) -> Vec<String> {
        self.0.lock().unwrap().preloaded.clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.0.lock().unwrap().cleared.clone()
    }

    pub fn search_paths(&self, name: &str) -> Vec<PathBuf> {
        self.0
            .lock()
            .unwrap()
            .search_paths
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl NativeBinding for FakeBinding {
    fn register_search_path(&mut self, name: &str, path: &Path) {
        let mut st = self.0.lock().unwrap();
        let paths = st.search_paths.entry(name.to_string()).or_default();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    fn clear_cached_binding(&mut self, name: &str) {
        let mut st = self.0.lock().unwrap();
        st.search_paths.remove(name);
        st.cleared.push(name.to_string());
    }

    fn preload_library(&mut self, name: &str) -> Result<(), BindingError> {
        self.0.lock().unwrap().preloaded.push(name.to_string());
        Ok(())
    }

    fn load_and_probe(&mut self) -> Result<ProbeReport, BindingError> {
        let mut st = self.0.lock().unwrap();
        let Some(dir) = st
            .search_paths
            .get(LIBVLC_NAME)
            .and_then(|p| p.first())
            .cloned()
        else {
            return Err(BindingError::NotFound {
                name: LIBVLC_NAME.to_string(),
                tried: Vec::new(),
            });
        };
        st.probes.push(dir.clone());
        match st.versions.get(&dir) {
            Some(Ok(v)) => Ok(ProbeReport {
                reported_version: v.clone(),
            }),
            Some(Err(msg)) => Err(BindingError::Other(msg.clone())),
            None => Err(BindingError::NotFound {
                name: LIBVLC_NAME.to_string(),
                tried: vec![dir],
            }),
        }
    }
}

/// 内存环境变量表，统计 `set_var` 调用次数。
#[derive(Clone, Default)]
pub struct MemoryEnv {
    vars: Arc<Mutex<HashMap<String, String>>>,
    set_calls: Arc<AtomicUsize>,
}

impl MemoryEnv {
    pub fn with(name: &str, value: &str) -> Self {
        let env = Self::default();
        env.vars.lock().unwrap().insert(name.to_string(), value.to_string());
        env
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.lock().unwrap().get(name).cloned()
    }
}

impl PluginEnv for MemoryEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name)
    }

    fn set_var(&self, name: &str, value: &str, _mechanism: EnvMechanism) -> anyhow::Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.vars.lock().unwrap().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_var(&self, name: &str, _mechanism: EnvMechanism) -> anyhow::Result<()> {
        self.vars.lock().unwrap().remove(name);
        Ok(())
    }
}

/// 匹配 `libfake.so` + `libfakecore.so` 的规则，插件目录写入走默认实现。
pub struct FakeRule {
    pub name: &'static str,
    pub applicable: bool,
    patterns: Vec<Regex>,
}

impl FakeRule {
    pub fn new() -> Self {
        Self {
            name: "FakeRule",
            applicable: true,
            patterns: vec![anchored(r"libfake\.so"), anchored(r"libfakecore\.so")],
        }
    }

    pub fn inapplicable(name: &'static str) -> Self {
        Self {
            name,
            applicable: false,
            ..Self::new()
        }
    }
}

impl PlatformRule for FakeRule {
    fn name(&self) -> &str {
        self.name
    }

    fn applicable(&self) -> bool {
        self.applicable
    }

    fn binary_patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn plugin_subpaths(&self) -> &[&'static str] {
        &["plugins", "vlc/plugins"]
    }
}

/// 统计 `directories()` 调用次数的提供者。
pub struct CountingProvider {
    pub name: &'static str,
    pub priority: Priority,
    pub directories: Vec<PathBuf>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new(name: &'static str, priority: Priority, directories: Vec<PathBuf>) -> Self {
        Self {
            name,
            priority,
            directories,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DirectoryProvider for CountingProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn applicable(&self) -> bool {
        true
    }

    fn directories(&self) -> Vec<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.directories.clone()
    }
}

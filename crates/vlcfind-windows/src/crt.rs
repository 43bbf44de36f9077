//! C 运行库（UCRT）级别的环境变量写入。
//!
//! libvlc 在加载时读取的是 C 运行库维护的环境副本，而不是进程环境块；
//! 因此插件目录变量必须通过 `_putenv_s` 写入，`SetEnvironmentVariableW` 不可见。
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

use anyhow::{anyhow, Context, Result};

extern "C" {
    fn _putenv_s(name: *const c_char, value: *const c_char) -> c_int;
}

/// 通过 `_putenv_s` 设置环境变量。
///
/// 参数：
/// - `name`：变量名（不能包含 `=` 或 NUL）
/// - `value`：变量值（不能包含 NUL）
///
/// 异常处理：
/// - 参数含 NUL 或 `_putenv_s` 返回非零错误码时返回错误。
pub fn putenv(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || name.contains('=') {
        return Err(anyhow!("非法环境变量名: {name:?}"));
    }
    let c_name = CString::new(name).context("环境变量名包含 NUL")?;
    let c_value = CString::new(value).context("环境变量值包含 NUL")?;
    let rc = unsafe { _putenv_s(c_name.as_ptr(), c_value.as_ptr()) };
    if rc != 0 {
        return Err(anyhow!("_putenv_s({name}) 失败，错误码 {rc}"));
    }
    Ok(())
}

/// 删除环境变量（`_putenv_s(name, "")` 即为删除）。
pub fn unputenv(name: &str) -> Result<()> {
    putenv(name, "")
}

//! 点分版本号（`major.minor.revision[+extra]`）的解析与比较。
//!
//! 比较规则：
//! - 依次比较 major、minor、revision，遇到第一个不同即返回
//! - `extra` 仅作展示，不参与比较（包括相等性）
//!
//! 作者：vlcfind 项目组
//! 创建时间：2026-10-15
//! 修改时间：2026-10-15

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;

/// 运行所需的最低 libvlc 版本。
pub const LIBVLC_MIN_VERSION: &str = "3.0.0";

/// [`LIBVLC_MIN_VERSION`] 的解析结果。
pub fn libvlc_min_version() -> Version {
    Version::parse(LIBVLC_MIN_VERSION).expect("LIBVLC_MIN_VERSION is a valid version")
}

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)[-_\s]?(.*)$").expect("version pattern is valid")
});

/// 不可变的版本号值。
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    major: u32,
    minor: u32,
    revision: u32,
    extra: Option<String>,
}

impl Version {
    /// 从字符串解析版本号。
    ///
    /// 异常处理：
    /// - 不符合 `[0-9]+\.[0-9]+\.[0-9]+[-_\s]?.*`（仅 ASCII 数字）时返回 [`VersionError::Format`]
    /// - 数字分量超出 `u32` 时返回 [`VersionError::Overflow`]
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let caps = VERSION_PATTERN
            .captures(s)
            .ok_or_else(|| VersionError::Format(s.to_string()))?;
        let num = |i: usize| -> Result<u32, VersionError> {
            caps[i]
                .parse::<u32>()
                .map_err(|_| VersionError::Overflow(s.to_string()))
        };
        let extra = caps
            .get(4)
            .map(|m| m.as_str())
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        Ok(Self {
            raw: s.to_string(),
            major: num(1)?,
            minor: num(2)?,
            revision: num(3)?,
            extra,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// 版本号尾部的附加信息（例如 `Vetinari`），可能为空。
    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// 三段数字比较，`extra` 不参与。
    pub fn compare(&self, other: &Version) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.revision.cmp(&other.revision))
    }

    /// 当前版本是否不低于 `required`。
    pub fn at_least(&self, required: &Version) -> bool {
        self.compare(required) != Ordering::Less
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

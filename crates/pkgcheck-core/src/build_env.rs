//! Build environment: the platform, tags and search paths that decide which
//! files belong to a package and where imports are found.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Operating systems recognised in file-name constraints (`foo_linux.mini`).
pub const KNOWN_OS: &[&str] = &[
    "android", "freebsd", "ios", "linux", "macos", "netbsd", "openbsd", "wasi", "windows",
];

/// Architectures recognised in file-name constraints (`foo_aarch64.mini`).
pub const KNOWN_ARCH: &[&str] = &["aarch64", "arm", "riscv64", "wasm32", "x86", "x86_64"];

/// Tag satisfied whenever interop files are enabled.
pub const INTEROP_TAG: &str = "interop";

/// Opaque identity of a build environment, used to scope cached imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(String);

impl EnvId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough for logs
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEnv {
    /// Target operating system (default: host)
    #[serde(default = "default_os")]
    pub os: String,

    /// Target architecture (default: host)
    #[serde(default = "default_arch")]
    pub arch: String,

    /// Extra build tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Roots searched, in order, when resolving an import path
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Whether interop files (importing "C") take part in builds (default: true)
    #[serde(default = "default_true")]
    pub interop: bool,
}

fn default_os() -> String {
    std::env::consts::OS.to_string()
}

fn default_arch() -> String {
    std::env::consts::ARCH.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self {
            os: default_os(),
            arch: default_arch(),
            tags: Vec::new(),
            search_paths: Vec::new(),
            interop: true,
        }
    }
}

impl BuildEnv {
    /// Stable identity derived from the environment's contents.
    pub fn identity(&self) -> EnvId {
        let mut hasher = blake3::Hasher::new();
        hash_field(&mut hasher, self.os.as_bytes());
        hash_field(&mut hasher, self.arch.as_bytes());
        hasher.update(&(self.tags.len() as u64).to_le_bytes());
        for tag in &self.tags {
            hash_field(&mut hasher, tag.as_bytes());
        }
        hasher.update(&(self.search_paths.len() as u64).to_le_bytes());
        for root in &self.search_paths {
            // raw bytes: roots need not be valid UTF-8
            hash_field(&mut hasher, root.as_os_str().as_encoded_bytes());
        }
        hasher.update(&[u8::from(self.interop)]);
        EnvId(hasher.finalize().to_hex().to_string())
    }

    /// Whether a single build tag is satisfied.
    pub fn matches_tag(&self, tag: &str) -> bool {
        tag == self.os
            || tag == self.arch
            || (self.interop && tag == INTEROP_TAG)
            || self.tags.iter().any(|t| t == tag)
    }

    /// Evaluate one `//+build` line body: space separated alternatives,
    /// each a comma separated conjunction of (optionally negated) tags.
    pub fn matches_constraint(&self, line: &str) -> bool {
        line.split_whitespace().any(|alternative| {
            alternative.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !tag.is_empty() && !self.matches_tag(tag),
                None => !term.is_empty() && self.matches_tag(term),
            })
        })
    }

    /// Whether a file name's `_OS`, `_ARCH` or `_OS_ARCH` suffix allows it.
    ///
    /// `file_stem` is the name without extension. A trailing `_test` is
    /// ignored, and a bare `linux` (no prefix) is not a constraint.
    pub fn matches_file_name(&self, file_stem: &str) -> bool {
        let stem = file_stem.strip_suffix("_test").unwrap_or(file_stem);

        for arch in KNOWN_ARCH {
            let Some(rest) = strip_component(stem, arch) else {
                continue;
            };
            for os in KNOWN_OS {
                if let Some(prefix) = strip_component(rest, os) {
                    if !prefix.is_empty() {
                        return *os == self.os && *arch == self.arch;
                    }
                }
            }
            if rest.is_empty() {
                return true;
            }
            return *arch == self.arch;
        }

        for os in KNOWN_OS {
            if let Some(rest) = strip_component(stem, os) {
                if rest.is_empty() {
                    return true;
                }
                return *os == self.os;
            }
        }

        true
    }
}

/// Strip `_component` from the end of `stem`, returning what precedes it.
fn strip_component<'a>(stem: &'a str, component: &str) -> Option<&'a str> {
    if stem == component {
        return Some("");
    }
    stem.strip_suffix(component)?.strip_suffix('_')
}

/// Length-prefixed so adjacent fields cannot run into each other.
fn hash_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

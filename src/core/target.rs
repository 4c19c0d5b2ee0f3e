//! Target fragments - the axes a configuration is built for.
//!
//! A [`Target`] is one value per axis: platform, development environment,
//! optimization, blob mode, and build system. Flag axes are bitflags so
//! several targets can be OR-merged into one value per axis, which is how
//! unity names describe the set of configurations sharing a unity.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Target platform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Platform: u64 {
        const WIN32 = 1 << 0;
        const WIN64 = 1 << 1;
        const LINUX = 1 << 2;
        const MAC = 1 << 3;
        const IOS = 1 << 4;
        const ANDROID = 1 << 5;
    }
}

bitflags! {
    /// Development environment (toolchain generation).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct DevEnv: u64 {
        const VS2017 = 1 << 0;
        const VS2019 = 1 << 1;
        const VS2022 = 1 << 2;
        const XCODE = 1 << 3;
        const MAKE = 1 << 4;
    }
}

bitflags! {
    /// Optimization level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Optimization: u64 {
        const DEBUG = 1 << 0;
        const RELEASE = 1 << 1;
        const RETAIL = 1 << 2;
    }
}

bitflags! {
    /// Blob mode of the target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Blob: u64 {
        const NO_BLOB = 1 << 0;
        const BLOB = 1 << 1;
        const FAST_BUILD_UNITYS = 1 << 2;
    }
}

const PLATFORM_NAMES: &[(Platform, &str)] = &[
    (Platform::WIN32, "win32"),
    (Platform::WIN64, "win64"),
    (Platform::LINUX, "linux"),
    (Platform::MAC, "mac"),
    (Platform::IOS, "ios"),
    (Platform::ANDROID, "android"),
];

const DEV_ENV_NAMES: &[(DevEnv, &str)] = &[
    (DevEnv::VS2017, "vs2017"),
    (DevEnv::VS2019, "vs2019"),
    (DevEnv::VS2022, "vs2022"),
    (DevEnv::XCODE, "xcode"),
    (DevEnv::MAKE, "make"),
];

const OPTIMIZATION_NAMES: &[(Optimization, &str)] = &[
    (Optimization::DEBUG, "Debug"),
    (Optimization::RELEASE, "Release"),
    (Optimization::RETAIL, "Retail"),
];

const BLOB_NAMES: &[(Blob, &str)] = &[
    (Blob::NO_BLOB, "NoBlob"),
    (Blob::BLOB, "Blob"),
    (Blob::FAST_BUILD_UNITYS, "FastBuildUnitys"),
];

/// Build system the configuration is generated for. Not a flag axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum BuildSystem {
    #[default]
    FastBuild,
    MSBuild,
}

impl BuildSystem {
    const ALL: [BuildSystem; 2] = [BuildSystem::FastBuild, BuildSystem::MSBuild];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystem::FastBuild => "FastBuild",
            BuildSystem::MSBuild => "MSBuild",
        }
    }

    fn bits(self) -> u64 {
        self as u64
    }
}

fn lookup<T: Copy + PartialEq>(table: &[(T, &'static str)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(v, _)| *v)
}

fn single_name<T: Copy + PartialEq>(table: &[(T, &'static str)], value: T) -> &'static str {
    table
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, n)| *n)
        .unwrap_or("unknown")
}

/// Error parsing a fragment value from its name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {axis} `{value}`")]
pub struct ParseFragmentError {
    pub axis: &'static str,
    pub value: String,
}

macro_rules! named_fragment {
    ($ty:ty, $table:ident, $axis:literal) => {
        impl $ty {
            /// Name of a single-bit value.
            pub fn name(&self) -> &'static str {
                single_name($table, *self)
            }
        }

        impl FromStr for $ty {
            type Err = ParseFragmentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                lookup($table, s).ok_or_else(|| ParseFragmentError {
                    axis: $axis,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.name())
            }
        }
    };
}

named_fragment!(Platform, PLATFORM_NAMES, "platform");
named_fragment!(DevEnv, DEV_ENV_NAMES, "dev_env");
named_fragment!(Optimization, OPTIMIZATION_NAMES, "optimization");
named_fragment!(Blob, BLOB_NAMES, "blob");

impl FromStr for BuildSystem {
    type Err = ParseFragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildSystem::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFragmentError {
                axis: "build_system",
                value: s.to_string(),
            })
    }
}

/// A fully specified target: one value per fragment axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub platform: Platform,
    pub dev_env: DevEnv,
    pub optimization: Optimization,
    pub blob: Blob,
    pub build_system: BuildSystem,
}

impl Default for Target {
    fn default() -> Self {
        Target {
            platform: Platform::WIN64,
            dev_env: DevEnv::VS2019,
            optimization: Optimization::DEBUG,
            blob: Blob::NO_BLOB,
            build_system: BuildSystem::FastBuild,
        }
    }
}

/// Number of fragment axes in a [`Target`].
pub const FRAGMENT_COUNT: usize = 5;

/// One raw value per axis, in [`FRAGMENT_AXES`] order.
pub type FragmentValues = [u64; FRAGMENT_COUNT];

impl Target {
    /// Raw per-axis values, suitable for OR-merging.
    pub fn fragment_values(&self) -> FragmentValues {
        [
            self.platform.bits(),
            self.dev_env.bits(),
            self.optimization.bits(),
            self.blob.bits(),
            self.build_system.bits(),
        ]
    }
}

/// OR-merge fragment values axis by axis.
pub fn merge_fragments<'a>(values: impl IntoIterator<Item = &'a FragmentValues>) -> FragmentValues {
    values.into_iter().fold([0; FRAGMENT_COUNT], |mut acc, v| {
        for (a, b) in acc.iter_mut().zip(v) {
            *a |= b;
        }
        acc
    })
}

/// Static description of one fragment axis.
pub struct FragmentAxis {
    pub name: &'static str,
    pub is_flags: bool,
    render: fn(u64) -> String,
}

impl FragmentAxis {
    /// Render a (possibly OR-merged) value of this axis.
    pub fn render(&self, value: u64) -> String {
        (self.render)(value)
    }
}

impl fmt::Debug for FragmentAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentAxis")
            .field("name", &self.name)
            .field("is_flags", &self.is_flags)
            .finish()
    }
}

/// Every set bit by its name, `separator`-joined. Unknown bits render numerically.
fn render_flags<T>(
    table: &[(T, &'static str)],
    bits: fn(&T) -> u64,
    value: u64,
    sep: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut remaining = value;
    for (flag, name) in table {
        let b = bits(flag);
        if value & b == b {
            parts.push((*name).to_string());
            remaining &= !b;
        }
    }
    if remaining != 0 || parts.is_empty() {
        parts.push(remaining.to_string());
    }
    parts.join(sep)
}

fn render_platform(value: u64) -> String {
    render_flags(PLATFORM_NAMES, Platform::bits, value, "_")
}

fn render_dev_env(value: u64) -> String {
    render_flags(DEV_ENV_NAMES, DevEnv::bits, value, ", ")
}

fn render_optimization(value: u64) -> String {
    render_flags(OPTIMIZATION_NAMES, Optimization::bits, value, ", ")
}

fn render_blob(value: u64) -> String {
    render_flags(BLOB_NAMES, Blob::bits, value, ", ")
}

fn render_build_system(value: u64) -> String {
    BuildSystem::ALL
        .into_iter()
        .find(|b| b.bits() == value)
        .map(|b| b.as_str().to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Registry of fragment axes, indexed like [`FragmentValues`].
pub static FRAGMENT_AXES: [FragmentAxis; FRAGMENT_COUNT] = [
    FragmentAxis {
        name: "platform",
        is_flags: true,
        render: render_platform,
    },
    FragmentAxis {
        name: "dev_env",
        is_flags: true,
        render: render_dev_env,
    },
    FragmentAxis {
        name: "optimization",
        is_flags: true,
        render: render_optimization,
    },
    FragmentAxis {
        name: "blob",
        is_flags: true,
        render: render_blob,
    },
    FragmentAxis {
        name: "build_system",
        is_flags: false,
        render: render_build_system,
    },
];

//! Platform capability interface.
//!
//! Generation asks each platform a fixed set of questions: does it support
//! FASTBuild at all, resource files, Swift; which guard define it uses; how
//! artifacts are named; which compiler flags select a language or exception
//! model; and which compiler sections the global settings file declares.

use std::fmt;

use crate::core::configuration::{ExceptionMode, Languages, OutputType};
use crate::core::target::{DevEnv, Platform};

/// Toolchain locations handed to [`PlatformBff::compiler_settings`].
#[derive(Debug, Clone, Copy)]
pub struct ToolchainInfo<'a> {
    pub windows_sdk_version: &'a str,
    pub windows_sdk_dir: Option<&'a str>,
    pub visual_studio_dir: Option<&'a str>,
}

/// One `Compiler(...)` section of the global settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    pub name: String,
    pub family: &'static str,
    pub root_path: String,
    pub executable: String,
    pub extra_files: Vec<String>,
    pub configurations: Vec<CompilerConfiguration>,
}

/// One configuration struct bound to a compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfiguration {
    /// Struct name without the leading dot
    pub name: String,
    pub compiler: String,
    pub librarian: String,
    pub linker: String,
    /// Options shared by every compile through this struct
    pub base_options: String,
    pub include_paths: Vec<String>,
    pub lib_paths: Vec<String>,
}

/// Capabilities and naming rules of one platform.
pub trait PlatformBff: Send + Sync + fmt::Debug {
    fn platform(&self) -> Platform;

    fn supports_fastbuild(&self) -> bool {
        true
    }

    fn supports_resource_files(&self) -> bool {
        false
    }

    fn supports_swift(&self) -> bool {
        false
    }

    fn is_clang(&self) -> bool;

    fn is_apple(&self) -> bool {
        false
    }

    /// Preprocessor symbol guarding this platform's nodes.
    fn bff_define(&self) -> &'static str;

    fn simple_name(&self) -> &'static str {
        self.platform().name()
    }

    /// Toolchain-facing platform string (`x64`, `Win32`, ...).
    fn full_platform_string(&self) -> &'static str;

    /// Configuration struct used to compile C++ files.
    fn cpp_config_name(&self, dev_env: DevEnv) -> String {
        format!(".{}_{}Config", self.simple_name(), dev_env)
    }

    /// Configuration struct used to compile C files.
    fn c_config_name(&self, dev_env: DevEnv) -> String {
        format!(".{}_{}ConfigC", self.simple_name(), dev_env)
    }

    fn static_lib_extension(&self) -> &'static str;

    fn shared_lib_extension(&self) -> &'static str;

    fn executable_extension(&self) -> &'static str;

    fn add_lib_prefix(&self, _output: OutputType) -> bool {
        false
    }

    /// Final artifact file name for `stem`.
    fn output_filename(&self, output: OutputType, stem: &str) -> String {
        let ext = match output {
            OutputType::Lib => self.static_lib_extension(),
            OutputType::Dll => self.shared_lib_extension(),
            OutputType::Exe => self.executable_extension(),
            OutputType::Utility | OutputType::None => "",
        };
        let prefix = if self.add_lib_prefix(output) { "lib" } else { "" };
        format!("{}{}{}", prefix, stem, ext)
    }

    /// Options compiling `%1` into `%2`.
    fn compile_options(&self) -> &'static str;

    /// Flag forcing a language, if the compiler needs one.
    fn language_flag(&self, languages: Languages) -> Option<&'static str>;

    fn exception_flag(&self, mode: ExceptionMode) -> &'static str;

    fn clr_flag(&self) -> Option<&'static str> {
        None
    }

    fn winrt_flag(&self) -> Option<&'static str> {
        None
    }

    /// Options using a precompiled header built from `header` into `pch_output`.
    fn pch_options(&self, header: &str, pch_output: &str) -> String;

    /// Options creating the precompiled header.
    fn pch_create_options(&self, header: &str, pch_output: &str) -> String;

    fn compiler_settings(&self, dev_env: DevEnv, toolchain: &ToolchainInfo<'_>) -> CompilerSettings;
}

/// Windows platforms compiled with MSVC.
#[derive(Debug)]
pub struct WindowsPlatform {
    platform: Platform,
    define: &'static str,
    full_name: &'static str,
    arch: &'static str,
}

fn vs_year(dev_env: DevEnv) -> &'static str {
    if dev_env == DevEnv::VS2017 {
        "2017"
    } else if dev_env == DevEnv::VS2022 {
        "2022"
    } else {
        "2019"
    }
}

impl PlatformBff for WindowsPlatform {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn supports_resource_files(&self) -> bool {
        true
    }

    fn is_clang(&self) -> bool {
        false
    }

    fn bff_define(&self) -> &'static str {
        self.define
    }

    fn full_platform_string(&self) -> &'static str {
        self.full_name
    }

    fn static_lib_extension(&self) -> &'static str {
        ".lib"
    }

    fn shared_lib_extension(&self) -> &'static str {
        ".dll"
    }

    fn executable_extension(&self) -> &'static str {
        ".exe"
    }

    fn compile_options(&self) -> &'static str {
        "\"%1\" /nologo /c /Fo\"%2\""
    }

    fn language_flag(&self, languages: Languages) -> Option<&'static str> {
        if languages.contains(Languages::C) {
            Some("/TC")
        } else if languages.contains(Languages::CPP) {
            Some("/TP")
        } else {
            None
        }
    }

    fn exception_flag(&self, mode: ExceptionMode) -> &'static str {
        match mode {
            ExceptionMode::Disable => "",
            ExceptionMode::Enable => "/EHsc",
            ExceptionMode::EnableWithExternC => "/EHs",
            ExceptionMode::EnableWithSeh => "/EHa",
        }
    }

    fn clr_flag(&self) -> Option<&'static str> {
        Some("/clr")
    }

    fn winrt_flag(&self) -> Option<&'static str> {
        Some("/ZW")
    }

    fn pch_options(&self, header: &str, pch_output: &str) -> String {
        format!("/Yu\"{}\" /Fp\"{}\"", header, pch_output)
    }

    fn pch_create_options(&self, header: &str, _pch_output: &str) -> String {
        format!("\"%1\" /nologo /c /Yc\"{}\" /Fp\"%2\" /Fo\"%3\"", header)
    }

    fn compiler_settings(&self, dev_env: DevEnv, toolchain: &ToolchainInfo<'_>) -> CompilerSettings {
        let vs_root = toolchain.visual_studio_dir.map(str::to_string).unwrap_or_else(|| {
            format!(
                "C:/Program Files/Microsoft Visual Studio/{}/Professional",
                vs_year(dev_env)
            )
        });
        let sdk_dir = toolchain
            .windows_sdk_dir
            .unwrap_or("C:/Program Files (x86)/Windows Kits/10");
        let sdk = toolchain.windows_sdk_version;

        let name = format!("Compiler-{}-{}", self.simple_name(), dev_env);
        let root = format!("{}/VC/Tools/MSVC/bin/Hostx64/{}", vs_root, self.arch);

        let include_paths = vec![
            format!("{}/VC/Tools/MSVC/include", vs_root),
            format!("{}/Include/{}/ucrt", sdk_dir, sdk),
            format!("{}/Include/{}/um", sdk_dir, sdk),
            format!("{}/Include/{}/shared", sdk_dir, sdk),
        ];
        let lib_paths = vec![
            format!("{}/VC/Tools/MSVC/lib/{}", vs_root, self.arch),
            format!("{}/Lib/{}/ucrt/{}", sdk_dir, sdk, self.arch),
            format!("{}/Lib/{}/um/{}", sdk_dir, sdk, self.arch),
        ];

        let configurations = [self.cpp_config_name(dev_env), self.c_config_name(dev_env)]
            .into_iter()
            .map(|config| CompilerConfiguration {
                name: config.trim_start_matches('.').to_string(),
                compiler: name.clone(),
                librarian: "$Root$/lib.exe".to_string(),
                linker: "$Root$/link.exe".to_string(),
                base_options: String::new(),
                include_paths: include_paths.clone(),
                lib_paths: lib_paths.clone(),
            })
            .collect();

        CompilerSettings {
            name,
            family: "msvc",
            root_path: root,
            executable: "$Root$/cl.exe".to_string(),
            extra_files: ["c1.dll", "c1xx.dll", "c2.dll", "mspdbcore.dll", "msobj140.dll"]
                .iter()
                .map(|f| format!("$Root$/{}", f))
                .collect(),
            configurations,
        }
    }
}

/// Platforms compiled with clang.
#[derive(Debug)]
pub struct ClangPlatform {
    platform: Platform,
    define: &'static str,
    full_name: &'static str,
    apple: bool,
    swift: bool,
    fastbuild: bool,
    target_triple: &'static str,
}

impl PlatformBff for ClangPlatform {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn supports_fastbuild(&self) -> bool {
        self.fastbuild
    }

    fn supports_swift(&self) -> bool {
        self.swift
    }

    fn is_clang(&self) -> bool {
        true
    }

    fn is_apple(&self) -> bool {
        self.apple
    }

    fn bff_define(&self) -> &'static str {
        self.define
    }

    fn full_platform_string(&self) -> &'static str {
        self.full_name
    }

    fn static_lib_extension(&self) -> &'static str {
        ".a"
    }

    fn shared_lib_extension(&self) -> &'static str {
        if self.apple {
            ".dylib"
        } else {
            ".so"
        }
    }

    fn executable_extension(&self) -> &'static str {
        ""
    }

    fn add_lib_prefix(&self, output: OutputType) -> bool {
        matches!(output, OutputType::Lib | OutputType::Dll)
    }

    fn compile_options(&self) -> &'static str {
        "-c \"%1\" -o \"%2\""
    }

    fn language_flag(&self, languages: Languages) -> Option<&'static str> {
        if languages.contains(Languages::C) {
            Some("-x c")
        } else if languages.contains(Languages::OBJC) {
            Some("-x objective-c")
        } else if languages.contains(Languages::OBJCPP) {
            Some("-x objective-c++")
        } else if languages.contains(Languages::CPP) {
            Some("-x c++")
        } else {
            None
        }
    }

    fn exception_flag(&self, mode: ExceptionMode) -> &'static str {
        match mode {
            ExceptionMode::Disable => "-fno-exceptions",
            _ => "-fexceptions",
        }
    }

    fn pch_options(&self, _header: &str, pch_output: &str) -> String {
        format!("-include-pch \"{}\"", pch_output)
    }

    fn pch_create_options(&self, header: &str, _pch_output: &str) -> String {
        format!("-x c++-header \"{}\" -o \"%2\"", header)
    }

    fn compiler_settings(&self, dev_env: DevEnv, _toolchain: &ToolchainInfo<'_>) -> CompilerSettings {
        let name = format!("Compiler-{}-clang", self.simple_name());
        let configurations = [self.cpp_config_name(dev_env), self.c_config_name(dev_env)]
            .into_iter()
            .map(|config| CompilerConfiguration {
                name: config.trim_start_matches('.').to_string(),
                compiler: name.clone(),
                librarian: "$Root$/llvm-ar".to_string(),
                linker: "$Root$/clang++".to_string(),
                base_options: format!("--target={}", self.target_triple),
                include_paths: Vec::new(),
                lib_paths: Vec::new(),
            })
            .collect();

        CompilerSettings {
            name,
            family: "clang",
            root_path: "/usr/bin".to_string(),
            executable: "$Root$/clang++".to_string(),
            extra_files: Vec::new(),
            configurations,
        }
    }
}

static WIN32: WindowsPlatform = WindowsPlatform {
    platform: Platform::WIN32,
    define: "WIN32",
    full_name: "Win32",
    arch: "x86",
};

static WIN64: WindowsPlatform = WindowsPlatform {
    platform: Platform::WIN64,
    define: "WIN64",
    full_name: "x64",
    arch: "x64",
};

static LINUX: ClangPlatform = ClangPlatform {
    platform: Platform::LINUX,
    define: "LINUX",
    full_name: "Linux",
    apple: false,
    swift: false,
    fastbuild: true,
    target_triple: "x86_64-unknown-linux-gnu",
};

static MAC: ClangPlatform = ClangPlatform {
    platform: Platform::MAC,
    define: "APPLE_OSX",
    full_name: "Mac",
    apple: true,
    swift: true,
    fastbuild: true,
    target_triple: "x86_64-apple-macosx",
};

static ANDROID: ClangPlatform = ClangPlatform {
    platform: Platform::ANDROID,
    define: "ANDROID_ARM64",
    full_name: "ARM64",
    apple: false,
    swift: false,
    fastbuild: true,
    target_triple: "aarch64-linux-android",
};

/// Look up the adapter of a single platform.
///
/// Returns `None` for platforms without an adapter (iOS) and for flag
/// combinations that are not a single platform.
pub fn platform_bff(platform: Platform) -> Option<&'static dyn PlatformBff> {
    let adapter: &'static dyn PlatformBff = if platform == Platform::WIN32 {
        &WIN32
    } else if platform == Platform::WIN64 {
        &WIN64
    } else if platform == Platform::LINUX {
        &LINUX
    } else if platform == Platform::MAC {
        &MAC
    } else if platform == Platform::ANDROID {
        &ANDROID
    } else {
        return None;
    };
    Some(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert!(platform_bff(Platform::WIN64).is_some());
        assert!(platform_bff(Platform::IOS).is_none());
        assert!(platform_bff(Platform::WIN32 | Platform::WIN64).is_none());
    }

    #[test]
    fn test_output_filenames() {
        let win = platform_bff(Platform::WIN64).unwrap();
        assert_eq!(win.output_filename(OutputType::Exe, "App"), "App.exe");
        assert_eq!(win.output_filename(OutputType::Lib, "Core"), "Core.lib");

        let linux = platform_bff(Platform::LINUX).unwrap();
        assert_eq!(linux.output_filename(OutputType::Lib, "Core"), "libCore.a");
        assert_eq!(linux.output_filename(OutputType::Exe, "App"), "App");

        let mac = platform_bff(Platform::MAC).unwrap();
        assert_eq!(mac.output_filename(OutputType::Dll, "Ui"), "libUi.dylib");
    }

    #[test]
    fn test_capabilities() {
        let win = platform_bff(Platform::WIN64).unwrap();
        assert!(win.supports_resource_files());
        assert!(!win.is_clang());
        assert_eq!(win.bff_define(), "WIN64");
        assert_eq!(win.language_flag(Languages::C), Some("/TC"));
        assert_eq!(win.exception_flag(ExceptionMode::EnableWithSeh), "/EHa");

        let mac = platform_bff(Platform::MAC).unwrap();
        assert!(mac.is_apple());
        assert!(mac.supports_swift());
        assert_eq!(mac.language_flag(Languages::OBJCPP), Some("-x objective-c++"));
    }

    #[test]
    fn test_compiler_settings_use_sdk_version() {
        let win = platform_bff(Platform::WIN64).unwrap();
        let toolchain = ToolchainInfo {
            windows_sdk_version: "10.0.18362.0",
            windows_sdk_dir: Some("D:/Kits"),
            visual_studio_dir: None,
        };
        let settings = win.compiler_settings(DevEnv::VS2017, &toolchain);

        assert_eq!(settings.name, "Compiler-win64-vs2017");
        assert_eq!(settings.configurations.len(), 2);
        assert_eq!(settings.configurations[0].name, "win64_vs2017Config");
        assert!(settings.configurations[0]
            .include_paths
            .iter()
            .any(|p| p == "D:/Kits/Include/10.0.18362.0/ucrt"));
        assert!(settings.root_path.contains("2017"));
    }
}

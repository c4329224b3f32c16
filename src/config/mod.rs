//! Run configuration: built-in defaults overridable from a TOML file.
//!
//! Every section is optional in the file; missing keys keep the defaults
//! below, which provision the ARM GNU toolchain, the Raspberry Pi Pico SDK
//! and VS Code on a Debian-family host.
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::json;

use crate::error::ConfigError;

/// Placeholder substituted with the toolchain version in URL templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cross-compilation toolchain archive.
    pub toolchain: ToolchainConfig,
    /// Embedded SDK repository.
    pub sdk: SdkConfig,
    /// Editor, extensions and settings.
    pub editor: EditorConfig,
    /// Batch of OS packages.
    pub tools: ToolsConfig,
    /// Environment publishing.
    pub env: EnvConfig,
    /// Interactive identity setup.
    pub identity: IdentityConfig,
    /// Optional project repository to clone and build.
    pub target: TargetConfig,
}

/// Cross-toolchain download and install location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Vendor version string, e.g. `13.2.Rel1`.
    pub version: String,
    /// Archive URL; `{version}` is replaced with [`version`](Self::version).
    pub url: String,
    /// Directory the archive is extracted into.
    pub install_dir: PathBuf,
    /// Compiler binary under `<install_dir>/bin` used as the install marker.
    pub compiler: String,
    /// Expected SHA-256 of the archive, lower-case hex.
    pub sha256: Option<String>,
    /// Variable published with the install directory.
    pub env_var: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            version: "13.2.Rel1".to_string(),
            url: "https://developer.arm.com/-/media/Files/downloads/gnu/{version}/binrel/\
                  arm-gnu-toolchain-{version}-x86_64-arm-none-eabi.tar.xz"
                .to_string(),
            install_dir: PathBuf::from("/opt/arm-gnu-toolchain"),
            compiler: "arm-none-eabi-gcc".to_string(),
            sha256: None,
            env_var: "PICO_TOOLCHAIN_PATH".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// Download URL with the version substituted.
    #[must_use]
    pub fn archive_url(&self) -> String {
        self.url.replace(VERSION_PLACEHOLDER, &self.version)
    }

    /// Path of the compiler binary used to detect an existing install.
    #[must_use]
    pub fn compiler_path(&self) -> PathBuf {
        self.install_dir.join("bin").join(&self.compiler)
    }
}

/// SDK repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdkConfig {
    /// Clone URL.
    pub url: String,
    /// Clone location; a leading `~` expands to the home directory.
    pub path: String,
    /// Branch to clone.
    pub branch: String,
    /// Variable published with the clone location.
    pub env_var: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/raspberrypi/pico-sdk.git".to_string(),
            path: "~/pico-sdk".to_string(),
            branch: "master".to_string(),
            env_var: "PICO_SDK_PATH".to_string(),
        }
    }
}

/// Editor package source, extensions and settings payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// CLI entry point checked on `PATH`.
    pub command: String,
    /// OS package providing the editor.
    pub package: String,
    /// Vendor signing key URL (ASCII-armored).
    pub key_url: String,
    /// Where the dearmored key is installed.
    pub keyring: PathBuf,
    /// Apt source list file.
    pub source_list: PathBuf,
    /// Line written to [`source_list`](Self::source_list).
    pub source_line: String,
    /// Extension identifiers, installed in order.
    pub extensions: Vec<String>,
    /// Settings document written to the editor's `settings.json`.
    /// `None` leaves the file alone.
    pub settings: Option<serde_json::Value>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: "code".to_string(),
            package: "code".to_string(),
            key_url: "https://packages.microsoft.com/keys/microsoft.asc".to_string(),
            keyring: PathBuf::from("/etc/apt/keyrings/packages.microsoft.gpg"),
            source_list: PathBuf::from("/etc/apt/sources.list.d/vscode.list"),
            source_line: "deb [arch=amd64,arm64,armhf \
                          signed-by=/etc/apt/keyrings/packages.microsoft.gpg] \
                          https://packages.microsoft.com/repos/code stable main"
                .to_string(),
            extensions: [
                "ms-vscode.cpptools",
                "ms-vscode.cmake-tools",
                "marus25.cortex-debug",
                "raspberry-pi.raspberry-pi-pico",
            ]
            .map(String::from)
            .to_vec(),
            settings: Some(default_settings()),
        }
    }
}

fn default_settings() -> serde_json::Value {
    json!({
        "cmake.configureOnOpen": true,
        "cmake.generator": "Ninja",
        "C_Cpp.default.compilerPath": "${env:PICO_TOOLCHAIN_PATH}/bin/arm-none-eabi-gcc",
        "cortex-debug.gdbPath": "gdb-multiarch",
        "files.trimTrailingWhitespace": true,
    })
}

/// OS packages installed in one batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Package names.
    pub packages: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            packages: [
                "build-essential",
                "cmake",
                "ninja-build",
                "git",
                "curl",
                "python3",
                "pkg-config",
                "libusb-1.0-0-dev",
                "gdb-multiarch",
                "minicom",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Environment publishing targets and extra bindings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvConfig {
    /// Shell-init file receiving `export` lines.
    pub shell_init: String,
    /// Additional `NAME = "VALUE"` bindings, published in name order.
    pub extra: BTreeMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            shell_init: "~/.bashrc".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Interactive Git/SSH identity setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Git host the key is registered with and verified against.
    pub host: String,
    /// Default private key location offered to the operator.
    pub key_path: String,
    /// Word the operator types once the key is registered.
    pub confirm_token: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            host: "github.com".to_string(),
            key_path: "~/.ssh/id_ed25519".to_string(),
            confirm_token: "done".to_string(),
        }
    }
}

/// Project repository cloned and built after provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Clone URL; nothing is cloned when unset.
    pub repo: Option<String>,
    /// Clone location; defaults to the repository name under the home directory.
    pub dir: Option<String>,
    /// Shell commands run inside the clone, in order.
    pub build: Vec<String>,
}

impl Config {
    /// Load from `path`, or built-in defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// an unusable value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = match path {
            Some(p) => toml_loader::load_config(p)?,
            None => Self::default(),
        };
        validation::validate(&config)?;
        Ok(config)
    }
}

/// Expand a leading `~` in `raw` against `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

//! Per-platform connection guide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Windows,
    Macos,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Ios,
        Platform::Android,
        Platform::Windows,
        Platform::Macos,
        Platform::Linux,
    ];

    /// Platform of the running binary, if it is one we have a guide for.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::Macos),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Android => "Android",
            Self::Windows => "Windows",
            Self::Macos => "macOS",
            Self::Linux => "Linux",
        }
    }

    fn client_app(self) -> (&'static str, &'static str) {
        match self {
            Self::Ios => ("V2Box", "https://apps.apple.com/app/id6446814690"),
            Self::Android => (
                "v2rayNG",
                "https://play.google.com/store/apps/details?id=com.v2ray.ang",
            ),
            Self::Windows | Self::Macos | Self::Linux => (
                "Hiddify",
                "https://github.com/hiddify/hiddify-app/releases/latest",
            ),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform `{0}` (expected ios, android, windows, macos or linux)")]
pub struct UnknownPlatform(String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" | "iphone" | "ipad" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "windows" | "win" => Ok(Self::Windows),
            "macos" | "mac" | "osx" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStep {
    pub title: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Ordered steps to get `platform` connected with `vpn_key`.
pub fn steps(platform: Platform, vpn_key: &str) -> Vec<SetupStep> {
    let (app, store_link) = platform.client_app();
    vec![
        SetupStep {
            title: format!("Install {app}"),
            details: format!("Download {app} for {platform}."),
            link: Some(store_link.to_string()),
        },
        SetupStep {
            title: "Import your key".to_string(),
            details: format!(
                "Copy the key below, open {app} and add it from the clipboard:\n{vpn_key}"
            ),
            link: None,
        },
        SetupStep {
            title: "Connect".to_string(),
            details: format!("Select the imported profile in {app} and tap Connect."),
            link: None,
        },
    ]
}

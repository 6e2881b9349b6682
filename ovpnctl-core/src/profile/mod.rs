//! OpenVPN profile model
//!
//! A [`ParsedProfile`] is the structured form of one imported `.ovpn`
//! file. It is immutable once built; re-import to change it.

pub mod parser;

pub use parser::parse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunnel transport protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    #[default]
    Udp,
    Tcp,
}

impl std::fmt::Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Proto::Udp => write!(f, "udp"),
            Proto::Tcp => write!(f, "tcp"),
        }
    }
}

/// Virtual network device kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Tun,
    Tap,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Tun => write!(f, "tun"),
            DeviceType::Tap => write!(f, "tap"),
        }
    }
}

/// A parsed OpenVPN client profile
///
/// `raw_content` keeps the original text verbatim for re-export and
/// debugging; the structured fields drive the engine hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedProfile {
    /// Import name, usually the source file name
    pub name: String,
    /// Full original profile text
    pub raw_content: String,
    pub server_address: String,
    pub port: u16,
    pub protocol: Proto,
    pub device_type: DeviceType,
    /// Inline CA certificate (PEM), if embedded
    pub ca: Option<String>,
    /// Inline client certificate (PEM), if embedded
    pub cert: Option<String>,
    /// Inline client key (PEM), if embedded
    pub key: Option<String>,
    /// Inline tls-auth/tls-crypt key, if embedded
    pub tls_auth: Option<String>,
    pub cipher: Option<String>,
    /// HMAC digest from the `auth` directive
    pub auth_digest: Option<String>,
    pub key_direction: Option<u8>,
    /// True when the profile carries `auth-user-pass`
    pub requires_auth: bool,
    pub imported_at: DateTime<Utc>,
}

impl ParsedProfile {
    /// User-facing label: the import name without a trailing `.ovpn`
    pub fn display_name(&self) -> &str {
        self.name.strip_suffix(".ovpn").unwrap_or(&self.name)
    }

    /// Render a normalized profile text from the structured fields
    ///
    /// For engines that consume file-shaped configs. `raw_content` stays
    /// the source of truth for what the user actually imported.
    pub fn to_ovpn(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("client".to_string());
        lines.push(format!("dev {}", self.device_type));
        lines.push(format!("proto {}", self.protocol));
        lines.push(format!("remote {} {}", self.server_address, self.port));
        lines.push("resolv-retry infinite".to_string());
        lines.push("nobind".to_string());
        lines.push("persist-key".to_string());
        lines.push("persist-tun".to_string());

        if let Some(cipher) = &self.cipher {
            lines.push(format!("cipher {}", cipher));
        }
        if let Some(digest) = &self.auth_digest {
            lines.push(format!("auth {}", digest));
        }
        if self.requires_auth {
            lines.push("auth-user-pass".to_string());
        }
        if let Some(direction) = self.key_direction {
            lines.push(format!("key-direction {}", direction));
        }

        for (tag, content) in [
            ("ca", &self.ca),
            ("cert", &self.cert),
            ("key", &self.key),
            ("tls-auth", &self.tls_auth),
        ] {
            if let Some(content) = content {
                lines.push(format!("<{}>", tag));
                lines.push(content.clone());
                lines.push(format!("</{}>", tag));
            }
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

//! `.ovpn` profile text parsing
//!
//! Pure text to [`ParsedProfile`]: no I/O, and the same input always
//! yields the same fields (modulo the import timestamp) or the same
//! error kind.

use crate::error::ParseError;
use crate::profile::{DeviceType, ParsedProfile, Proto};
use chrono::Utc;
use regex::Regex;

/// Parse `.ovpn` profile text into a [`ParsedProfile`]
///
/// `name` is the import label, usually the source file name. Unknown
/// directives and unknown inline blocks are ignored for forward
/// compatibility; their evidence survives in `raw_content`.
pub fn parse(name: &str, text: &str) -> Result<ParsedProfile, ParseError> {
    // Matches "<tag>" and "</tag>" lines delimiting inline blocks
    let tag_pattern = Regex::new(r"^<(/?)([A-Za-z0-9-]+)>$").expect("Failed to compile tag pattern");

    let mut server_address: Option<String> = None;
    let mut port: Option<u16> = None;
    let mut proto: Option<Proto> = None;
    // A port/proto supplied on the remote line overrides the standalone
    // directives regardless of where they appear in the file.
    let mut remote_port: Option<u16> = None;
    let mut remote_proto: Option<Proto> = None;
    let mut device_type = DeviceType::default();
    let mut ca: Option<String> = None;
    let mut cert: Option<String> = None;
    let mut key: Option<String> = None;
    let mut tls_auth: Option<String> = None;
    let mut cipher: Option<String> = None;
    let mut auth_digest: Option<String> = None;
    let mut key_direction: Option<u8> = None;
    let mut requires_auth = false;

    let mut open_block: Option<String> = None;
    let mut block_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        // Inside a block every line is content, verbatim, until the
        // matching close tag.
        if let Some(tag) = &open_block {
            if let Some(caps) = tag_pattern.captures(trimmed) {
                if &caps[1] == "/" && &caps[2] == tag.as_str() {
                    let content = block_lines.join("\n");
                    match tag.as_str() {
                        "ca" => ca = Some(content),
                        "cert" => cert = Some(content),
                        "key" => key = Some(content),
                        // tls-crypt carries its key the same way
                        "tls-auth" | "tls-crypt" => tls_auth = Some(content),
                        _ => {}
                    }
                    open_block = None;
                    block_lines.clear();
                    continue;
                }
            }
            block_lines.push(line);
            continue;
        }

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(caps) = tag_pattern.captures(trimmed) {
            let tag = caps[2].to_string();
            if &caps[1] == "/" {
                return Err(ParseError::UnbalancedBlock { tag });
            }
            open_block = Some(tag);
            block_lines.clear();
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let directive = match parts.next() {
            Some(directive) => directive,
            None => continue,
        };
        let values: Vec<&str> = parts.collect();

        match directive {
            "remote" => {
                let host = values.first().ok_or_else(|| ParseError::Malformed {
                    reason: "remote directive without a host".to_string(),
                })?;
                server_address = Some((*host).to_string());
                if let Some(value) = values.get(1) {
                    remote_port = Some(parse_port(value)?);
                }
                if let Some(value) = values.get(2) {
                    remote_proto = Some(parse_proto(value)?);
                }
            }
            "port" => {
                if let Some(value) = values.first() {
                    port = Some(parse_port(value)?);
                }
            }
            "proto" => {
                if let Some(value) = values.first() {
                    proto = Some(parse_proto(value)?);
                }
            }
            "dev" => {
                if let Some(value) = values.first() {
                    // "tun0"/"tap1" style device names map by prefix;
                    // anything else keeps the tun default
                    if value.starts_with("tun") {
                        device_type = DeviceType::Tun;
                    } else if value.starts_with("tap") {
                        device_type = DeviceType::Tap;
                    }
                }
            }
            "cipher" => {
                if let Some(value) = values.first() {
                    cipher = Some((*value).to_string());
                }
            }
            "auth" => {
                if let Some(value) = values.first() {
                    auth_digest = Some((*value).to_string());
                }
            }
            "key-direction" => {
                key_direction = values.first().and_then(|value| value.parse().ok());
            }
            "auth-user-pass" => {
                requires_auth = true;
            }
            // Unknown directives are forward-compatible no-ops
            _ => {}
        }
    }

    if let Some(tag) = open_block {
        return Err(ParseError::UnbalancedBlock { tag });
    }

    let server_address = server_address.ok_or(ParseError::MissingRemote)?;

    // A client cert without its key (or vice versa) cannot authenticate
    if cert.is_some() != key.is_some() {
        return Err(ParseError::Malformed {
            reason: "client certificate and key must be supplied together".to_string(),
        });
    }

    Ok(ParsedProfile {
        name: name.to_string(),
        raw_content: text.to_string(),
        server_address,
        port: remote_port.or(port).unwrap_or(1194),
        protocol: remote_proto.or(proto).unwrap_or_default(),
        device_type,
        ca,
        cert,
        key,
        tls_auth,
        cipher,
        auth_digest,
        key_direction,
        requires_auth,
        imported_at: Utc::now(),
    })
}

fn parse_port(value: &str) -> Result<u16, ParseError> {
    match value.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(ParseError::InvalidPort {
            value: value.to_string(),
        }),
    }
}

fn parse_proto(value: &str) -> Result<Proto, ParseError> {
    // OpenVPN accepts suffixed forms like udp4, tcp6 and tcp-client
    let lowered = value.to_ascii_lowercase();
    if lowered.starts_with("udp") {
        Ok(Proto::Udp)
    } else if lowered.starts_with("tcp") {
        Ok(Proto::Tcp)
    } else {
        Err(ParseError::Malformed {
            reason: format!("unrecognized proto: {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_profile_gets_defaults() {
        let profile = parse("min.ovpn", "remote vpn.example.com\n").unwrap();
        assert_eq!(profile.server_address, "vpn.example.com");
        assert_eq!(profile.port, 1194);
        assert_eq!(profile.protocol, Proto::Udp);
        assert_eq!(profile.device_type, DeviceType::Tun);
        assert!(!profile.requires_auth);
    }

    #[test]
    fn test_last_scalar_directive_wins() {
        let text = "remote a.example.com\ncipher AES-128-GCM\ncipher AES-256-GCM\n";
        let profile = parse("p", text).unwrap();
        assert_eq!(profile.cipher.as_deref(), Some("AES-256-GCM"));
    }

    #[test]
    fn test_missing_remote() {
        assert_eq!(
            parse("p", "proto tcp\nport 443\n").unwrap_err(),
            ParseError::MissingRemote
        );
    }

    #[test]
    fn test_stray_close_tag_is_unbalanced() {
        let err = parse("p", "remote a\n</ca>\n").unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedBlock { tag } if tag == "ca"));
    }

    #[test]
    fn test_comment_styles_are_skipped() {
        let text = "# comment\n; other comment\nremote vpn.example.com 443 tcp\n";
        let profile = parse("p", text).unwrap();
        assert_eq!(profile.port, 443);
        assert_eq!(profile.protocol, Proto::Tcp);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame processing

use crate::constants::sampling;
use serde::{Deserialize, Serialize};

/// Centred sub-area of a camera frame searched for a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for RegionOfInterest {
    fn default() -> Self {
        Self {
            width: sampling::DEFAULT_ROI_SIZE,
            height: sampling::DEFAULT_ROI_SIZE,
        }
    }
}

impl RegionOfInterest {
    /// Pixel rectangle `(x, y, width, height)` of the region within a frame
    ///
    /// The region is centred and clamped to the frame, so a region larger
    /// than the frame covers the whole frame.
    pub fn crop_rect(&self, frame_width: u32, frame_height: u32) -> (u32, u32, u32, u32) {
        let width = self.width.min(frame_width);
        let height = self.height.min(frame_height);
        let x = (frame_width - width) / 2;
        let y = (frame_height - height) / 2;
        (x, y, width, height)
    }
}

/// Action type derived from QR code content
///
/// QR codes carry various kinds of payload; the terminal UI shows the kind
/// and offers to open links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrAction {
    /// URL that can be opened in a browser
    Url(String),
    /// WiFi network credentials
    Wifi {
        ssid: String,
        security: Option<String>,
        hidden: bool,
    },
    /// Phone number (tel: URI)
    Phone(String),
    /// Email address (mailto: URI)
    Email(String),
    /// Anything else
    Text(String),
}

impl QrAction {
    /// Classify decoded QR content
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        if let Some(rest) = trimmed.strip_prefix("WIFI:") {
            return Self::parse_wifi(rest);
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }

        if let Some(number) = strip_prefix_ignore_case(trimmed, "tel:") {
            return Self::Phone(number.to_string());
        }

        if let Some(rest) = strip_prefix_ignore_case(trimmed, "mailto:") {
            let address = rest.split('?').next().unwrap_or_default();
            return Self::Email(address.to_string());
        }

        Self::Text(content.to_string())
    }

    /// Parse the body of a `WIFI:S:<ssid>;T:<security>;P:<password>;H:<hidden>;;` payload
    fn parse_wifi(body: &str) -> Self {
        let mut ssid = String::new();
        let mut security = None;
        let mut hidden = false;

        for field in split_unescaped(body, ';') {
            if let Some(value) = field.strip_prefix("S:") {
                ssid = unescape(value);
            } else if let Some(value) = field.strip_prefix("T:") {
                if !value.is_empty() && !value.eq_ignore_ascii_case("nopass") {
                    security = Some(value.to_string());
                }
            } else if let Some(value) = field.strip_prefix("H:") {
                hidden = value.eq_ignore_ascii_case("true");
            }
        }

        Self::Wifi {
            ssid,
            security,
            hidden,
        }
    }

    /// Short label for the kind of content
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "Link",
            Self::Wifi { .. } => "Wi-Fi network",
            Self::Phone(_) => "Phone number",
            Self::Email(_) => "Email address",
            Self::Text(_) => "Text",
        }
    }

    /// URL to hand to the system opener, if the content has one
    pub fn openable_uri(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url.clone()),
            Self::Phone(number) => Some(format!("tel:{}", number)),
            Self::Email(address) => Some(format!("mailto:{}", address)),
            Self::Wifi { .. } | Self::Text(_) => None,
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Split on a separator, honouring backslash escapes
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_is_centred() {
        let roi = RegionOfInterest::default();
        assert_eq!(roi.crop_rect(640, 480), (195, 115, 250, 250));
    }

    #[test]
    fn test_roi_clamps_to_small_frames() {
        let roi = RegionOfInterest {
            width: 250,
            height: 250,
        };
        assert_eq!(roi.crop_rect(200, 100), (0, 0, 200, 100));
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            QrAction::parse("https://example.com/a?b=c"),
            QrAction::Url("https://example.com/a?b=c".to_string())
        );
        assert_eq!(
            QrAction::parse("  HTTP://EXAMPLE.COM "),
            QrAction::Url("HTTP://EXAMPLE.COM".to_string())
        );
    }

    #[test]
    fn test_parse_wifi_with_escapes() {
        let action = QrAction::parse(r"WIFI:S:My\;Net;T:WPA;P:secret;H:true;;");
        assert_eq!(
            action,
            QrAction::Wifi {
                ssid: "My;Net".to_string(),
                security: Some("WPA".to_string()),
                hidden: true,
            }
        );
    }

    #[test]
    fn test_parse_open_wifi() {
        let action = QrAction::parse("WIFI:S:Cafe;T:nopass;;");
        assert_eq!(
            action,
            QrAction::Wifi {
                ssid: "Cafe".to_string(),
                security: None,
                hidden: false,
            }
        );
        assert_eq!(action.openable_uri(), None);
    }

    #[test]
    fn test_parse_uri_schemes() {
        assert_eq!(QrAction::parse("tel:+123"), QrAction::Phone("+123".to_string()));
        assert_eq!(
            QrAction::parse("MAILTO:a@b.org?subject=hi"),
            QrAction::Email("a@b.org".to_string())
        );
        assert_eq!(
            QrAction::parse("mailto:a@b.org").openable_uri(),
            Some("mailto:a@b.org".to_string())
        );
    }

    #[test]
    fn test_plain_text_is_kept_verbatim() {
        assert_eq!(QrAction::parse("HELLO"), QrAction::Text("HELLO".to_string()));
        assert_eq!(QrAction::parse("HELLO").kind(), "Text");
    }
}

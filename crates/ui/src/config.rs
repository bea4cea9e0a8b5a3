//! Client configuration
//!
//! Every field has a default, so partial files and query strings work.

use std::time::Duration;

use remote_ui_protocol::{FontConfig, FontProperties, Rect, ScreenConfig};
use serde::{Deserialize, Serialize};

use crate::transport::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub send_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            multiplier: 2.0,
            send_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontDefaults {
    pub family: String,
    pub size: i64,
    pub supported: Vec<String>,
}

impl Default for FontDefaults {
    fn default() -> Self {
        Self {
            family: "Segoe UI".to_string(),
            size: 14,
            supported: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenDefaults {
    pub width: i64,
    pub height: i64,
    pub scaling: f64,
}

impl Default for ScreenDefaults {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            scaling: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the host endpoint
    pub host: String,
    pub retry: RetryConfig,
    pub font: FontDefaults,
    pub screen: ScreenDefaults,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:8888".to_string(),
            retry: RetryConfig::default(),
            font: FontDefaults::default(),
            screen: ScreenDefaults::default(),
        }
    }
}

impl ClientConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
            send_attempts: self.retry.send_attempts.max(1),
        }
    }

    pub fn font_config(&self) -> FontConfig {
        let default_font = FontProperties {
            font_family: self.font.family.clone(),
            size: self.font.size,
            antialias: true,
            ..FontProperties::default()
        };
        let mut supported = self.font.supported.clone();
        if !supported.contains(&self.font.family) {
            supported.insert(0, self.font.family.clone());
        }
        FontConfig {
            default_font,
            supported_fonts: Some(supported),
        }
    }

    pub fn screen_config(&self) -> ScreenConfig {
        let bounds = Rect::new(0, 0, self.screen.width, self.screen.height);
        ScreenConfig {
            bounds,
            client_bounds: bounds,
            scaling_x: self.screen.scaling,
            scaling_y: self.screen.scaling,
        }
    }

    /// Override from `key=value` pairs such as a page's query string;
    /// unknown keys and unparsable values are skipped
    pub fn apply_query_pairs<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (key, value) in pairs {
            match key {
                "host" if !value.is_empty() => self.host = value.to_string(),
                "font" if !value.is_empty() => self.font.family = value.to_string(),
                "fontSize" => {
                    if let Ok(size) = value.parse() {
                        self.font.size = size;
                    }
                }
                "sendAttempts" => {
                    if let Ok(attempts) = value.parse() {
                        self.retry.send_attempts = attempts;
                    }
                }
                _ => tracing::debug!(key, "ignoring query parameter"),
            }
        }
    }
}

//! HTTP long-polling channel
//!
//! `POST {base}/connect` returns the session endpoints; polls and sends are
//! `POST`s to those endpoints, resolved against the base URL.

use std::time::Duration;

use async_trait::async_trait;
use remote_ui_protocol::SessionEndpoints;
use serde_json::Value as Json;

use crate::transport::{Channel, ChannelError};

pub struct HttpChannel {
    client: reqwest::Client,
    base: String,
}

impl HttpChannel {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn post(&self, path: &str, body: Option<&Json>) -> Result<reqwest::Response, ChannelError> {
        let url = resolve(&self.base, path);
        let request = self.client.post(&url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait(?Send)]
impl Channel for HttpChannel {
    async fn connect(&self) -> Result<SessionEndpoints, ChannelError> {
        self.post("connect", None)
            .await?
            .json::<SessionEndpoints>()
            .await
            .map_err(|e| ChannelError::Body(e.to_string()))
    }

    async fn poll(&self, endpoints: &SessionEndpoints) -> Result<Json, ChannelError> {
        self.post(&endpoints.request, None)
            .await?
            .json::<Json>()
            .await
            .map_err(|e| ChannelError::Body(e.to_string()))
    }

    async fn send(&self, endpoints: &SessionEndpoints, body: &Json) -> Result<(), ChannelError> {
        self.post(&endpoints.response, Some(body)).await.map(drop)
    }

    async fn sleep(&self, delay: Duration) {
        sleep(delay).await;
    }
}

/// Join `path` onto `base` unless it is already absolute
pub fn resolve(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(delay: Duration) {
    tokio::time::sleep(delay).await;
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep(delay: Duration) {
    use wasm_bindgen::JsCast;

    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(win) = web_sys::window() {
            let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
                resolve.unchecked_ref(),
                millis,
            );
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_the_base() {
        assert_eq!(resolve("http://host:8888/", "/poll/1"), "http://host:8888/poll/1");
        assert_eq!(resolve("http://host:8888", "send"), "http://host:8888/send");
    }

    #[test]
    fn absolute_paths_win() {
        assert_eq!(
            resolve("http://host:8888", "https://other/poll"),
            "https://other/poll"
        );
    }
}

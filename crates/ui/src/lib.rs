//! Browser side of a remote native UI
//!
//! The host owns the widgets and streams render commands over HTTP polling;
//! this crate keeps a shadow of the host's DOM, resolves element and image
//! references and projects the result onto a [`surface::Surface`].

pub mod config;
pub mod error;
pub mod handler;
pub mod images;
pub mod input;
pub mod measure;
pub mod network;
pub mod projector;
pub mod registry;
pub mod shadow;
pub mod style;
pub mod surface;
pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod logging;

pub use config::ClientConfig;
pub use error::{Classify, ErrorKind};
pub use handler::{FrameRejected, KeyState, RemoteSession, SessionError, WindowChange, WindowSink};
pub use network::HttpChannel;
pub use projector::{ProjectionStats, Projector};
pub use surface::{RecordingSurface, Surface};
pub use transport::{
    Channel, ClientHandle, RequestHandler, RetryPolicy, RunStats, StopHandle, TransportClient,
    TransportError,
};

#[cfg(target_arch = "wasm32")]
pub use entry::main_js;

#[cfg(target_arch = "wasm32")]
mod entry {
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{window, Document, HtmlElement, UrlSearchParams, Window};

    use remote_ui_protocol::{BrowserEvent, Protocol};

    use crate::config::ClientConfig;
    use crate::dom::DomSurface;
    use crate::handler::{RemoteSession, WindowChange};
    use crate::measure::CanvasMeasurer;
    use crate::network::HttpChannel;
    use crate::transport::TransportClient;

    /// Query parameters that may override the defaults
    const QUERY_KEYS: [&str; 4] = ["host", "font", "fontSize", "sendAttempts"];

    fn read_config(window: &Window) -> ClientConfig {
        let mut config = ClientConfig::default();
        let params = window
            .location()
            .search()
            .ok()
            .and_then(|search| UrlSearchParams::new_with_str(&search).ok());
        if let Some(params) = params {
            let pairs: Vec<(&str, String)> = QUERY_KEYS
                .iter()
                .filter_map(|key| params.get(key).map(|value| (*key, value)))
                .collect();
            config.apply_query_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }
        if let (Some(width), Some(height)) = (
            window.inner_width().ok().and_then(|w| w.as_f64()),
            window.inner_height().ok().and_then(|h| h.as_f64()),
        ) {
            config.screen.width = width as i64;
            config.screen.height = height as i64;
        }
        config.screen.scaling = window.device_pixel_ratio();
        config
    }

    fn mount(document: &Document) -> Result<HtmlElement, JsValue> {
        let body = document.body().ok_or("document has no body")?;
        let container: HtmlElement = document.create_element("div")?.dyn_into()?;
        container.set_id("remote-ui");
        container.set_tab_index(0);
        let style = container.style();
        style.set_property("position", "fixed")?;
        style.set_property("inset", "0")?;
        style.set_property("outline", "none")?;
        body.append_child(&container)?;
        Ok(container)
    }

    #[wasm_bindgen(start)]
    pub fn main_js() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        crate::logging::init();

        let window = window().ok_or("no global `window` exists")?;
        let document = window.document().ok_or("window has no document")?;
        let config = read_config(&window);
        tracing::info!(host = %config.host, "starting remote ui");

        let container = mount(&document)?;
        let surface = DomSurface::new(&document, &container)?;

        let protocol = Rc::new(Protocol::standard());
        let mut client = TransportClient::new(
            HttpChannel::new(config.host.clone()),
            protocol,
            config.retry_policy(),
        );

        let title_document = document.clone();
        let mut session = RemoteSession::new(surface)
            .with_measurer(Box::new(CanvasMeasurer::new()))
            .with_font_config(config.font_config())
            .with_screen_config(config.screen_config())
            .with_stop_handle(client.stop_handle())
            .with_window_sink(Box::new(move |change: &WindowChange| {
                if let WindowChange::Title(title) = change {
                    title_document.set_title(title);
                }
            }));

        let handle = client.handle();
        crate::input::attach(&container, &handle, session.keys())?;
        let _ = container.focus();

        spawn_local(async move {
            if let Err(e) = client.connect().await {
                tracing::error!(error = %e, "could not open session");
                return;
            }
            handle.send_event(&BrowserEvent::ControllerConnect);
            match client.run(&mut session).await {
                Ok(stats) => tracing::info!(?stats, "session ended"),
                Err(e) => tracing::error!(error = %e, "session failed"),
            }
        });

        Ok(())
    }
}

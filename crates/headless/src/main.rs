//! remote-ui-headless: drive a remote UI session without a browser
//!
//! Connects to a host, answers its requests against an in-memory surface and
//! prints what would have been drawn.

mod config;

use std::path::PathBuf;
use std::rc::Rc;

use remote_ui_protocol::{BrowserEvent, Protocol, WireValue};
use remote_ui_web::surface::Primitive;
use remote_ui_web::{
    HttpChannel, RecordingSurface, RemoteSession, RequestHandler, SessionError, StopHandle,
    TransportClient,
};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stops the transport once the session has rendered enough frames
struct FrameLimit {
    session: RemoteSession<RecordingSurface>,
    limit: Option<u64>,
    stop: StopHandle,
}

impl RequestHandler for FrameLimit {
    type Error = SessionError;

    fn handle_request(
        &mut self,
        name: &str,
        arguments: &WireValue,
    ) -> Result<Option<WireValue>, SessionError> {
        let result = self.session.handle_request(name, arguments);
        if self
            .limit
            .is_some_and(|limit| self.session.stats().frames >= limit)
        {
            tracing::info!(frames = self.session.stats().frames, "frame limit reached");
            self.stop.stop();
        }
        result
    }

    fn handle_event(&mut self, name: &str, arguments: &WireValue) {
        self.session.handle_event(name, arguments);
    }
}

struct Options {
    url: Option<String>,
    frames: Option<u64>,
    config: Option<PathBuf>,
    dump: bool,
}

fn print_help() {
    println!("remote-ui-headless - remote UI client without a browser");
    println!();
    println!("USAGE:");
    println!("    remote-ui-headless [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --url URL          Host endpoint (overrides config)");
    println!("    --frames N         Stop after N rendered frames");
    println!("    --config FILE      Read configuration from FILE");
    println!("    --dump             Print the primitive tree on exit");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version");
    println!();
    println!("CONFIG:");
    println!("    ~/.config/remote-ui/config.toml");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG           Log filter (default: info)");
}

fn parse_options(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut options = Options {
        url: None,
        frames: None,
        config: None,
        dump: false,
    };
    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("remote-ui-headless {VERSION}");
                return Ok(None);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--url" => {
                let url = args.next().ok_or_else(|| anyhow::anyhow!("--url needs a value"))?;
                options.url = Some(url.clone());
            }
            "--frames" => {
                let frames = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--frames needs a value"))?;
                options.frames = Some(frames.parse()?);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a value"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--dump" => options.dump = true,
            other => anyhow::bail!("unknown argument: {other} (see --help)"),
        }
    }
    Ok(Some(options))
}

fn dump(surface: &RecordingSurface, parent: Option<i64>, depth: usize) {
    for &node in surface.children(parent) {
        if let Some(Primitive {
            geometry, paint, ..
        }) = surface.primitive(node)
        {
            let p = geometry.position;
            println!(
                "{:indent$}#{node} ({}, {}) {}x{} {paint:?}",
                "",
                p.x1,
                p.y1,
                p.width(),
                p.height(),
                indent = depth * 2
            );
        }
        dump(surface, Some(node), depth + 1);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(options) = parse_options(&args)? else {
        return Ok(());
    };

    let mut client_config = match &options.config {
        Some(path) => config::load_from_path(path)
            .ok_or_else(|| anyhow::anyhow!("could not read {}", path.display()))?,
        None => config::load(),
    };
    if let Some(url) = options.url {
        client_config.host = url;
    }
    tracing::info!(host = %client_config.host, version = VERSION, "starting headless client");

    let mut client = TransportClient::new(
        HttpChannel::new(client_config.host.clone()),
        Rc::new(Protocol::standard()),
        client_config.retry_policy(),
    );
    let stop = client.stop_handle();
    let session = RemoteSession::new(RecordingSurface::new())
        .with_font_config(client_config.font_config())
        .with_screen_config(client_config.screen_config())
        .with_stop_handle(stop.clone());
    let mut handler = FrameLimit {
        session,
        limit: options.frames,
        stop,
    };

    client.connect().await?;
    client.handle().send_event(&BrowserEvent::ControllerConnect);

    let outcome = tokio::select! {
        result = client.run(&mut handler) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    match outcome {
        Some(Ok(stats)) => tracing::info!(?stats, "transport finished"),
        Some(Err(e)) => return Err(e.into()),
        None => tracing::warn!("interrupted"),
    }

    let session = &handler.session;
    let stats = session.stats();
    println!(
        "frames: {}, rejected: {}, primitives: {}, elements: {}, images: {}",
        stats.frames,
        stats.rejected_frames,
        session.surface().len(),
        session.elements().len(),
        session.images().len()
    );
    if options.dump {
        dump(session.surface(), None, 0);
    }
    Ok(())
}

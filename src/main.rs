use std::sync::Arc;

use remote_media::{api, config, session::TransportSession};
use tokio_util::sync::CancellationToken;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("remote_media", log::LevelFilter::Debug)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    remote_media::init()?;
    let config = config::config();
    let addr = config.api_addr()?;

    let session = Arc::new(TransportSession::new(&config.session_name)?);
    session.play()?;
    for stream in &config.streams {
        if let Err(e) = session.add_remote_stream(stream).await {
            log::error!("Error adding remote stream: {:#}", e);
        }
    }

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    api::start_api_server(addr, Arc::clone(&session), cancel_clone);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            },
        }
    }

    session.stop()?;
    Ok(())
}

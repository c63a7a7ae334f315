use anyhow::Context;

pub mod api;
pub mod config;
pub mod media;
pub mod session;

/// Initializes GStreamer. Safe to call more than once.
pub fn init() -> anyhow::Result<()> {
    gstreamer::init().context("init gstreamer")
}

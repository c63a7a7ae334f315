use std::{collections::BTreeMap, sync::Arc};

use anyhow::Context;
use gst::prelude::*;
use gstreamer as gst;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    config::StreamConfig,
    media::{
        remote_source::{BranchNames, RemoteMediaSource},
        source::MediaSource,
        types::{CodecType, MediaType},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamKey {
    pub media_type: MediaType,
    pub stream_id: u32,
}

/// A pipeline holding one transport bin, together with the remote sources
/// built inside that bin.
pub struct TransportSession {
    pipeline: gst::Pipeline,
    bin: gst::Bin,
    sources: RwLock<BTreeMap<StreamKey, Arc<RemoteMediaSource>>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub media_type: MediaType,
    pub codec: CodecType,
    pub stream_id: u32,
    pub tee: Option<String>,
    pub consumers: usize,
    pub discard_link_failures: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct GraphSnapshot {
    pub name: String,
    pub state: String,
    pub pads: Vec<PadInfo>,
    pub elements: Vec<ElementInfo>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ElementInfo {
    pub name: String,
    pub factory: Option<String>,
    pub state: String,
    pub pads: Vec<PadInfo>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PadInfo {
    pub name: String,
    pub peer: Option<String>,
}

impl TransportSession {
    /// Builds an empty transport bin named `name` inside a fresh pipeline.
    /// GStreamer must be initialized, see [`crate::init`].
    pub fn new(name: &str) -> anyhow::Result<Self> {
        let pipeline = gst::Pipeline::with_name(&format!("{}-pipeline", name));
        let bin = gst::Bin::with_name(name);
        pipeline
            .add(&bin)
            .with_context(|| format!("add transport bin {}", name))?;
        Ok(Self {
            pipeline,
            bin,
            sources: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn bin(&self) -> &gst::Bin {
        &self.bin
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    pub fn play(&self) -> anyhow::Result<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .with_context(|| format!("play session {}", self.bin.name()))?;
        log::info!("session {}: playing", self.bin.name());
        Ok(())
    }

    pub fn stop(&self) -> anyhow::Result<()> {
        self.pipeline
            .set_state(gst::State::Null)
            .with_context(|| format!("stop session {}", self.bin.name()))?;
        log::info!("session {}: stopped", self.bin.name());
        Ok(())
    }

    /// Exposes the per-stream output pad the transport provides for a remote
    /// stream. Returns false if the pad already exists.
    pub fn expose_stream_pad(&self, stream: &StreamConfig) -> anyhow::Result<bool> {
        stream.validate()?;
        let names = BranchNames::new(stream.media_type, stream.codec, stream.stream_id);
        if self.bin.static_pad(&names.upstream_pad).is_some() {
            return Ok(false);
        }
        let pad = gst::GhostPad::builder(gst::PadDirection::Src)
            .name(names.upstream_pad.as_str())
            .build();
        self.bin
            .add_pad(&pad)
            .with_context(|| format!("expose {}", names.upstream_pad))?;
        Ok(true)
    }

    /// Exposes the stream's pad and builds a remote source on it.
    pub async fn add_remote_stream(
        &self,
        stream: &StreamConfig,
    ) -> anyhow::Result<Arc<RemoteMediaSource>> {
        stream.validate()?;
        let key = StreamKey {
            media_type: stream.media_type,
            stream_id: stream.stream_id,
        };
        let mut sources = self.sources.write().await;
        if sources.contains_key(&key) {
            anyhow::bail!(
                "{} stream {} already exists",
                stream.media_type,
                stream.stream_id
            );
        }

        let exposed = self.expose_stream_pad(stream)?;
        let source = match RemoteMediaSource::new(
            stream.media_type,
            stream.stream_id,
            stream.codec,
            &self.bin,
        ) {
            Ok(source) => Arc::new(source),
            Err(e) => {
                if exposed {
                    let names =
                        BranchNames::new(stream.media_type, stream.codec, stream.stream_id);
                    self.remove_stream_pad(&names.upstream_pad);
                }
                return Err(e).context(format!(
                    "create remote {} stream {}",
                    stream.media_type, stream.stream_id
                ));
            }
        };
        sources.insert(key, Arc::clone(&source));
        Ok(source)
    }

    /// Tears down the branch of a remote stream and removes its pad.
    pub async fn remove_remote_stream(
        &self,
        media_type: MediaType,
        stream_id: u32,
    ) -> anyhow::Result<()> {
        let key = StreamKey {
            media_type,
            stream_id,
        };
        let source = self
            .sources
            .write()
            .await
            .remove(&key)
            .with_context(|| format!("{} stream {} not found", media_type, stream_id))?;

        source.teardown();
        self.remove_stream_pad(&source.branch_names().upstream_pad);
        log::info!(
            "session {}: removed {} stream {}",
            self.bin.name(),
            media_type,
            stream_id
        );
        Ok(())
    }

    fn remove_stream_pad(&self, pad_name: &str) {
        let Some(pad) = self.bin.static_pad(pad_name) else {
            log::warn!("session {}: no pad {} to remove", self.bin.name(), pad_name);
            return;
        };
        if let Err(e) = self.bin.remove_pad(&pad) {
            log::warn!(
                "session {}: failed to remove pad {}: {}",
                self.bin.name(),
                pad_name,
                e
            );
        }
    }

    pub async fn get(&self, media_type: MediaType, stream_id: u32) -> Option<Arc<RemoteMediaSource>> {
        self.sources
            .read()
            .await
            .get(&StreamKey {
                media_type,
                stream_id,
            })
            .cloned()
    }

    pub async fn sources(&self) -> Vec<SourceInfo> {
        self.sources
            .read()
            .await
            .values()
            .map(|source| SourceInfo {
                name: source.name().to_string(),
                media_type: source.media_type(),
                codec: source.codec_type(),
                stream_id: source.stream_id(),
                tee: source.source_tee().map(|t| t.name().to_string()),
                consumers: source.consumer_count(),
                discard_link_failures: source.discard_link_failures(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            name: self.bin.name().to_string(),
            state: state_name(self.bin.current_state()),
            pads: pad_infos(self.bin.upcast_ref()),
            elements: self.bin.children().iter().map(element_info).collect(),
        }
    }
}

fn state_name(state: gst::State) -> String {
    format!("{:?}", state).to_lowercase()
}

fn element_info(element: &gst::Element) -> ElementInfo {
    ElementInfo {
        name: element.name().to_string(),
        factory: element.factory().map(|f| f.name().to_string()),
        state: state_name(element.current_state()),
        pads: pad_infos(element),
    }
}

fn pad_infos(element: &gst::Element) -> Vec<PadInfo> {
    element
        .pads()
        .iter()
        .map(|pad| PadInfo {
            name: pad.name().to_string(),
            peer: pad.peer().map(|peer| {
                let owner = peer
                    .parent_element()
                    .map(|e| e.name().to_string())
                    .unwrap_or_default();
                format!("{}:{}", owner, peer.name())
            }),
        })
        .collect()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use gst::prelude::*;
use gstreamer as gst;

use crate::media::{
    source::{MediaSource, MediaSourceBase, SourceError},
    types::{CodecType, MediaType},
};

/// Names of the pads and elements making up one remote stream branch.
///
/// The upstream pad name is shared with the transport bin, which exposes one
/// source pad per remote stream under exactly this name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchNames {
    pub upstream_pad: String,
    pub tee: String,
    pub queue: String,
    pub fakesink: String,
}

impl BranchNames {
    /// # Panics
    ///
    /// Panics if `media_type` is [`MediaType::Unknown`].
    pub fn new(media_type: MediaType, codec_type: CodecType, stream_id: u32) -> Self {
        let codec = codec_type.as_u32();
        match media_type {
            MediaType::Video => Self {
                upstream_pad: format!("video_src_{}_{}", codec, stream_id),
                tee: format!("video-src-tee-{}-{}", codec, stream_id),
                queue: format!("video-src-tee-fakesink-queue-{}-{}", codec, stream_id),
                fakesink: format!("video-src-tee-fakesink-{}-{}", codec, stream_id),
            },
            MediaType::Audio => Self {
                upstream_pad: format!("audio_raw_src_{}", stream_id),
                tee: format!("audio-src-tee-{}-{}", codec, stream_id),
                queue: format!("audio-src-tee-fakesink-queue-{}-{}", codec, stream_id),
                fakesink: format!("audio-src-tee-fakesink-{}-{}", codec, stream_id),
            },
            MediaType::Unknown => {
                unreachable!("media type must be audio or video, got {:?}", media_type)
            }
        }
    }
}

/// Creates the elements of a branch. Tests swap in makers that hand out
/// misbehaving elements.
pub trait ElementMaker {
    fn make(&self, factory_name: &str, name: &str) -> Result<gst::Element, gst::glib::BoolError>;
}

/// Creates elements from the registered GStreamer factories.
#[derive(Clone, Copy, Debug, Default)]
pub struct FactoryMaker;

impl ElementMaker for FactoryMaker {
    fn make(&self, factory_name: &str, name: &str) -> Result<gst::Element, gst::glib::BoolError> {
        gst::ElementFactory::make(factory_name).name(name).build()
    }
}

/// A media source fed by one stream of a transport bin.
#[derive(Debug)]
pub struct RemoteMediaSource {
    base: MediaSourceBase,
    stream_id: u32,
    discard_link_failures: usize,
}

impl RemoteMediaSource {
    /// Builds the tee → queue → fakesink branch for a remote stream inside
    /// `transport_bin` and links the bin's per-stream pad into the tee.
    ///
    /// # Panics
    ///
    /// Panics if `media_type` is [`MediaType::Unknown`]. The bin is not touched
    /// in that case.
    pub fn new(
        media_type: MediaType,
        stream_id: u32,
        codec_type: CodecType,
        transport_bin: &gst::Bin,
    ) -> Result<Self, SourceError> {
        Self::with_maker(
            media_type,
            stream_id,
            codec_type,
            transport_bin,
            &FactoryMaker,
        )
    }

    /// Same as [`RemoteMediaSource::new`], creating elements through `maker`.
    pub fn with_maker(
        media_type: MediaType,
        stream_id: u32,
        codec_type: CodecType,
        transport_bin: &gst::Bin,
        maker: &dyn ElementMaker,
    ) -> Result<Self, SourceError> {
        let names = BranchNames::new(media_type, codec_type, stream_id);

        let label = format!("Remote {} stream", media_type.nick());
        let mut base = MediaSourceBase::new(label, media_type);
        base.set_source_bin(transport_bin.clone());
        base.set_codec(codec_type);

        let tee = maker.make("tee", &names.tee)?;
        let fakesink = maker.make("fakesink", &names.fakesink)?;
        fakesink.set_property("async", false);
        let queue = maker.make("queue", &names.queue)?;

        let branch = [tee.clone(), queue.clone(), fakesink.clone()];
        let discard_link_failures =
            match wire_branch(transport_bin, &names, &tee, &queue, &fakesink) {
                Ok(failures) => failures,
                Err(e) => {
                    discard_branch(transport_bin, &branch);
                    return Err(e);
                }
            };
        base.set_source_tee(tee);

        log::info!(
            "{}: created branch {} for stream {} ({})",
            base.name(),
            names.tee,
            stream_id,
            codec_type
        );
        Ok(Self {
            base,
            stream_id,
            discard_link_failures,
        })
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// How many links of the queue/fakesink branch failed during construction.
    pub fn discard_link_failures(&self) -> usize {
        self.discard_link_failures
    }

    pub fn branch_names(&self) -> BranchNames {
        BranchNames::new(self.media_type(), self.codec_type(), self.stream_id)
    }

    /// Tee outputs linked to something other than the internal discard queue.
    pub fn consumer_count(&self) -> usize {
        let Some(tee) = self.source_tee() else {
            return 0;
        };
        let queue = self.branch_names().queue;
        tee.src_pads()
            .iter()
            .filter_map(|pad| pad.peer())
            .filter(|peer| {
                peer.parent_element()
                    .is_none_or(|owner| owner.name().as_str() != queue)
            })
            .count()
    }

    /// Removes this source's branch from the transport bin. Consumers still
    /// linked to the tee are unlinked.
    pub fn teardown(&self) {
        let Some(bin) = self.source_bin() else {
            return;
        };
        let names = self.branch_names();
        let branch: Vec<gst::Element> = [&names.tee, &names.queue, &names.fakesink]
            .into_iter()
            .filter_map(|name| bin.by_name(name))
            .collect();
        discard_branch(bin, &branch);
        log::info!("{}: removed branch {}", self.name(), names.tee);
    }

    /// Drops the reference held on the transport bin.
    pub fn release(&mut self) -> Option<gst::Bin> {
        self.base.release()
    }
}

impl MediaSource for RemoteMediaSource {
    fn base(&self) -> &MediaSourceBase {
        &self.base
    }
}

impl Drop for RemoteMediaSource {
    fn drop(&mut self) {
        self.base.release();
    }
}

/// Adds and links the branch. Failures inside the discard chain are logged and
/// counted; failures reaching the upstream pad are returned.
fn wire_branch(
    bin: &gst::Bin,
    names: &BranchNames,
    tee: &gst::Element,
    queue: &gst::Element,
    fakesink: &gst::Element,
) -> Result<usize, SourceError> {
    bin.add_many([tee, queue, fakesink])?;
    tee.sync_state_with_parent()?;
    queue.sync_state_with_parent()?;
    fakesink.sync_state_with_parent()?;

    let mut failures = 0;
    for (src, dest) in [(tee, queue), (queue, fakesink)] {
        if let Err(e) = src.link(dest) {
            log::error!("Failed to link {} -> {}: {}", src.name(), dest.name(), e);
            failures += 1;
        }
    }

    let upstream =
        bin.static_pad(&names.upstream_pad)
            .ok_or_else(|| SourceError::UpstreamPadNotFound {
                bin: bin.name().to_string(),
                pad: names.upstream_pad.clone(),
            })?;
    let tee_sink = tee
        .static_pad("sink")
        .ok_or_else(|| SourceError::PadNotFound {
            element: tee.name().to_string(),
            pad: "sink".to_string(),
        })?;
    // the upstream pad belongs to the bin that holds the tee, so the usual
    // sibling hierarchy check does not apply
    upstream
        .link_full(&tee_sink, gst::PadLinkCheck::TEMPLATE_CAPS)
        .map_err(|e| SourceError::LinkFailed {
            from: format!("{}:{}", bin.name(), upstream.name()),
            to: format!("{}:sink", tee.name()),
            source: e,
        })?;

    Ok(failures)
}

fn discard_branch(bin: &gst::Bin, branch: &[gst::Element]) {
    for element in branch {
        if !element.has_as_parent(bin) {
            continue;
        }
        if let Err(e) = bin.remove(element) {
            log::warn!("{}: failed to remove {}: {}", bin.name(), element.name(), e);
            continue;
        }
        if let Err(e) = element.set_state(gst::State::Null) {
            log::warn!("{}: failed to stop {}: {}", bin.name(), element.name(), e);
        }
    }
}

#[cfg(test)]
#[path = "remote_source_test.rs"]
mod remote_source_test;

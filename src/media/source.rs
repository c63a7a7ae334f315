use gst::prelude::*;
use gstreamer as gst;
use thiserror::Error;

use crate::media::types::{CodecType, MediaType};

const TEE_SRC_TEMPLATE: &str = "src_%u";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("media source '{0}' has no source tee")]
    NoSourceTee(String),
    #[error("element '{element}' has no pad named '{pad}'")]
    PadNotFound { element: String, pad: String },
    #[error("element '{element}' refused a '{template}' request pad")]
    RequestPadFailed { element: String, template: String },
    #[error("upstream pad '{pad}' not found on '{bin}'")]
    UpstreamPadNotFound { bin: String, pad: String },
    #[error("failed to link {from} -> {to}: {source}")]
    LinkFailed {
        from: String,
        to: String,
        #[source]
        source: gst::PadLinkError,
    },
    #[error(transparent)]
    Element(#[from] gst::glib::BoolError),
}

/// State shared by every media source: identity, codec, and the bin and tee
/// the source hands out data from.
#[derive(Debug)]
pub struct MediaSourceBase {
    name: String,
    media_type: MediaType,
    codec_type: CodecType,
    source_bin: Option<gst::Bin>,
    source_tee: Option<gst::Element>,
}

impl MediaSourceBase {
    pub fn new(name: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            name: name.into(),
            media_type,
            codec_type: CodecType::None,
            source_bin: None,
            source_tee: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn codec_type(&self) -> CodecType {
        self.codec_type
    }

    pub fn source_bin(&self) -> Option<&gst::Bin> {
        self.source_bin.as_ref()
    }

    pub fn source_tee(&self) -> Option<&gst::Element> {
        self.source_tee.as_ref()
    }

    pub(crate) fn set_codec(&mut self, codec_type: CodecType) {
        self.codec_type = codec_type;
    }

    /// Holds a reference on `bin` until [`MediaSourceBase::release`] or drop.
    pub(crate) fn set_source_bin(&mut self, bin: gst::Bin) {
        self.source_bin = Some(bin);
    }

    pub(crate) fn set_source_tee(&mut self, tee: gst::Element) {
        self.source_tee = Some(tee);
    }

    /// Drops the held bin and tee references and returns the bin, if any.
    pub fn release(&mut self) -> Option<gst::Bin> {
        self.source_tee = None;
        let bin = self.source_bin.take();
        if let Some(bin) = &bin {
            log::debug!("{}: released source bin {}", self.name, bin.name());
        }
        bin
    }
}

/// Capabilities of anything that hands out media through a tee.
pub trait MediaSource {
    fn base(&self) -> &MediaSourceBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn media_type(&self) -> MediaType {
        self.base().media_type()
    }

    fn codec_type(&self) -> CodecType {
        self.base().codec_type()
    }

    fn source_bin(&self) -> Option<&gst::Bin> {
        self.base().source_bin()
    }

    fn source_tee(&self) -> Option<&gst::Element> {
        self.base().source_tee()
    }

    /// Requests a new output pad on the source tee.
    fn request_source_pad(&self) -> Result<gst::Pad, SourceError> {
        let tee = self
            .source_tee()
            .ok_or_else(|| SourceError::NoSourceTee(self.name().to_string()))?;
        tee.request_pad_simple(TEE_SRC_TEMPLATE)
            .ok_or_else(|| SourceError::RequestPadFailed {
                element: tee.name().to_string(),
                template: TEE_SRC_TEMPLATE.to_string(),
            })
    }

    /// Attaches `consumer`'s `sink` pad to a fresh tee pad and returns that tee pad.
    fn link_consumer(&self, consumer: &gst::Element) -> Result<gst::Pad, SourceError> {
        let sink = consumer
            .static_pad("sink")
            .ok_or_else(|| SourceError::PadNotFound {
                element: consumer.name().to_string(),
                pad: "sink".to_string(),
            })?;
        let tee_pad = self.request_source_pad()?;
        if let Err(e) = tee_pad.link(&sink) {
            self.unlink_consumer(&tee_pad)?;
            return Err(SourceError::LinkFailed {
                from: tee_pad.name().to_string(),
                to: consumer.name().to_string(),
                source: e,
            });
        }
        log::debug!(
            "{}: linked consumer {} on {}",
            self.name(),
            consumer.name(),
            tee_pad.name()
        );
        Ok(tee_pad)
    }

    /// Detaches whatever is linked to `tee_pad` and releases the pad.
    fn unlink_consumer(&self, tee_pad: &gst::Pad) -> Result<(), SourceError> {
        let tee = self
            .source_tee()
            .ok_or_else(|| SourceError::NoSourceTee(self.name().to_string()))?;
        if let Some(peer) = tee_pad.peer() {
            tee_pad.unlink(&peer)?;
        }
        tee.release_request_pad(tee_pad);
        Ok(())
    }
}

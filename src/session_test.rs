use gst::prelude::*;
use gstreamer as gst;

use super::TransportSession;
use crate::{
    config::StreamConfig,
    media::{
        source::MediaSource,
        types::{CodecType, MediaType},
    },
};

fn session() -> TransportSession {
    crate::init().unwrap();
    TransportSession::new("call").unwrap()
}

fn video(stream_id: u32) -> StreamConfig {
    StreamConfig::new(MediaType::Video, CodecType::H264, stream_id)
}

fn audio(stream_id: u32) -> StreamConfig {
    StreamConfig::new(MediaType::Audio, CodecType::Opus, stream_id)
}

#[tokio::test]
async fn test_add_remote_streams() -> anyhow::Result<()> {
    let session = session();
    session.play()?;

    let v = session.add_remote_stream(&video(1)).await?;
    let a = session.add_remote_stream(&audio(1)).await?;
    assert_eq!(v.stream_id(), 1);
    assert_eq!(a.media_type(), MediaType::Audio);
    assert_eq!(session.bin().children().len(), 6);
    assert!(session.bin().static_pad("video_src_4_1").unwrap().is_linked());
    assert!(session.bin().static_pad("audio_raw_src_1").unwrap().is_linked());

    let infos = session.sources().await;
    assert_eq!(infos.len(), 2);
    // ordered by media type, audio first
    assert_eq!(infos[0].tee.as_deref(), Some("audio-src-tee-3-1"));
    assert_eq!(infos[1].tee.as_deref(), Some("video-src-tee-4-1"));
    assert!(infos.iter().all(|i| i.consumers == 0));
    session.stop()?;
    Ok(())
}

#[tokio::test]
async fn test_duplicate_stream_rejected() -> anyhow::Result<()> {
    let session = session();
    session.add_remote_stream(&video(3)).await?;

    let err = session.add_remote_stream(&video(3)).await.unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(session.bin().children().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_invalid_stream_rejected() {
    let session = session();
    let stream = StreamConfig::new(MediaType::Unknown, CodecType::None, 1);
    assert!(session.add_remote_stream(&stream).await.is_err());
    assert!(session.bin().children().is_empty());
    assert!(session.bin().pads().is_empty());
}

#[tokio::test]
async fn test_failed_source_removes_exposed_pad() {
    let session = session();
    // occupies the tee's name so the branch cannot be added
    let squatter = gst::ElementFactory::make("identity")
        .name("video-src-tee-4-1")
        .build()
        .unwrap();
    session.bin().add(&squatter).unwrap();

    let err = session.add_remote_stream(&video(1)).await.unwrap_err();
    assert!(
        format!("{:#}", err).contains("create remote video stream 1"),
        "{:#}",
        err
    );
    assert!(session.bin().static_pad("video_src_4_1").is_none());
    assert!(session.sources().await.is_empty());
    assert_eq!(session.bin().children(), vec![squatter]);
}

#[tokio::test]
async fn test_remove_remote_stream() -> anyhow::Result<()> {
    let session = session();
    session.add_remote_stream(&audio(2)).await?;
    session.add_remote_stream(&audio(3)).await?;

    session.remove_remote_stream(MediaType::Audio, 2).await?;
    assert!(session.get(MediaType::Audio, 2).await.is_none());
    assert!(session.get(MediaType::Audio, 3).await.is_some());
    assert!(session.bin().static_pad("audio_raw_src_2").is_none());
    assert_eq!(session.bin().children().len(), 3);

    assert!(session.remove_remote_stream(MediaType::Audio, 2).await.is_err());
    // the stream can come back after removal
    session.add_remote_stream(&audio(2)).await?;
    Ok(())
}

#[tokio::test]
async fn test_consumer_is_reported() -> anyhow::Result<()> {
    let session = session();
    let source = session.add_remote_stream(&video(5)).await?;

    let consumer = gst::ElementFactory::make("fakesink")
        .name("renderer")
        .build()?;
    session.bin().add(&consumer)?;
    consumer.sync_state_with_parent()?;
    let tee_pad = source.link_consumer(&consumer)?;

    let infos = session.sources().await;
    assert_eq!(infos[0].consumers, 1);
    assert_eq!(infos[0].discard_link_failures, 0);

    source.unlink_consumer(&tee_pad)?;
    assert_eq!(session.sources().await[0].consumers, 0);
    Ok(())
}

#[tokio::test]
async fn test_snapshot() -> anyhow::Result<()> {
    let session = session();
    session.play()?;
    session.add_remote_stream(&video(1)).await?;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.name, "call");
    assert_eq!(snapshot.state, "playing");
    assert_eq!(snapshot.pads.len(), 1);
    assert_eq!(snapshot.pads[0].name, "video_src_4_1");
    assert_eq!(
        snapshot.pads[0].peer.as_deref(),
        Some("video-src-tee-4-1:sink")
    );

    let fakesink = snapshot
        .elements
        .iter()
        .find(|e| e.factory.as_deref() == Some("fakesink"))
        .unwrap();
    assert_eq!(fakesink.name, "video-src-tee-fakesink-4-1");
    assert_eq!(fakesink.state, "playing");

    let json = serde_json::to_value(&snapshot)?;
    assert_eq!(json["elements"].as_array().map(|a| a.len()), Some(3));
    session.stop()?;
    Ok(())
}

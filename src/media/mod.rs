//! Media sources fed by a transport bin.
//!
//! ```text
//!  transport bin
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │ [video_src_<codec>_<stream>] ──► tee ──► queue ──► fakesink        │
//!  │                                   │                               │
//!  │                                   └──► src_%u ──► consumers       │
//!  └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queue/fakesink branch keeps the tee flowing while no consumer is
//! attached. Consumers request further tee pads through [`source::MediaSource`].

pub mod remote_source;
pub mod source;
pub mod types;

//! RTSP protocol client
//!
//! Speaks just enough RTSP/1.0 to tell whether a path exists, whether it wants
//! credentials, and whether a stream can actually be set up and played.

pub mod auth;
pub mod message;
pub mod sdp;
mod client;

pub use auth::{basic_authorization, Authorizer, DigestChallenge};
pub use client::{
    classify, PlaybackCheck, ProtocolCheck, RtspClient, DEFAULT_RESPONSE_BUDGET, DEFAULT_RTSP_TIMEOUT,
};
pub use message::{Request, Response};
pub use sdp::parse_sdp;

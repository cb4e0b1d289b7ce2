//! Channel enumeration over the manufacturer path catalog.

mod catalog;
mod enumerator;

pub use catalog::{instantiate, Catalog};
pub use enumerator::{
    channel_candidates, ChannelEnumerator, ChannelProbe, CredentialProbe, DiscoveryMode, PlannedPath,
    ProtocolTarget, DEFAULT_MAX_CHANNEL,
};

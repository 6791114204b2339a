//! Node descriptor wire protocol
//!
//! Components travel as a one-byte component type followed by a sequence of
//! length-prefixed elements. A relay can decode a node in forwarding mode,
//! which keeps the body as opaque bytes and re-emits it unchanged.

pub mod codec;
pub mod error;
pub mod protocol;

pub use codec::{ElementSink, ElementSource};
pub use error::IpcError;
pub use protocol::{
    decode_component, encode_component, ComponentType, DecodeMode, NodeComponent,
    NodeDescriptor, NodeForwarder, WireComponent,
};

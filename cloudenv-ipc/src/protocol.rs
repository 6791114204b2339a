//! Node component variants and their wire layout

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::{ElementSink, ElementSource};
use crate::error::IpcError;

/// Type identifier written ahead of every component body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComponentType {
    Node = 0x01,
}

impl ComponentType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ComponentType {
    type Error = IpcError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(ComponentType::Node),
            other => Err(IpcError::UnknownComponent(other)),
        }
    }
}

/// A component body that can be written to and read from an element stream
pub trait WireComponent: Sized {
    const COMPONENT_TYPE: ComponentType;

    fn serialize(&self, sink: &mut ElementSink) -> Result<(), IpcError>;

    fn deserialize(source: &mut ElementSource) -> Result<Self, IpcError>;
}

/// Fully typed description of a node to launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Identifies the node towards the requester
    pub tag: String,
    pub package: String,
    pub executable: String,
    /// Address the node uses inside the environment
    pub name: String,
}

impl NodeDescriptor {
    pub fn new(
        tag: impl Into<String>,
        package: impl Into<String>,
        executable: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            package: package.into(),
            executable: executable.into(),
            name: name.into(),
        }
    }
}

impl WireComponent for NodeDescriptor {
    const COMPONENT_TYPE: ComponentType = ComponentType::Node;

    fn serialize(&self, sink: &mut ElementSink) -> Result<(), IpcError> {
        sink.put_element(&self.tag)?;
        sink.put_element(&self.package)?;
        sink.put_element(&self.executable)?;
        sink.put_element(&self.name)
    }

    fn deserialize(source: &mut ElementSource) -> Result<Self, IpcError> {
        Ok(Self {
            tag: source.get_element()?,
            package: source.get_element()?,
            executable: source.get_element()?,
            name: source.get_element()?,
        })
    }
}

/// Node body captured as opaque bytes by a relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeForwarder {
    buf: Bytes,
}

impl NodeForwarder {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }

    /// Decode the captured body into a descriptor
    pub fn materialize(&self) -> Result<NodeDescriptor, IpcError> {
        <NodeDescriptor as WireComponent>::deserialize(&mut ElementSource::new(self.buf.clone()))
    }
}

impl WireComponent for NodeForwarder {
    const COMPONENT_TYPE: ComponentType = ComponentType::Node;

    fn serialize(&self, sink: &mut ElementSink) -> Result<(), IpcError> {
        sink.put_raw(&self.buf);
        Ok(())
    }

    fn deserialize(source: &mut ElementSource) -> Result<Self, IpcError> {
        Ok(Self::new(source.take_remaining()))
    }
}

/// How a decoder treats a node body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Decode every field
    Materialize,
    /// Keep the body as opaque bytes for re-emission
    Forward,
}

/// Either form of a node component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeComponent {
    Descriptor(NodeDescriptor),
    Forwarder(NodeForwarder),
}

impl NodeComponent {
    pub fn component_type(&self) -> ComponentType {
        ComponentType::Node
    }

    pub fn serialize(&self, sink: &mut ElementSink) -> Result<(), IpcError> {
        match self {
            NodeComponent::Descriptor(descriptor) => WireComponent::serialize(descriptor, sink),
            NodeComponent::Forwarder(forwarder) => forwarder.serialize(sink),
        }
    }

    pub fn decode(source: &mut ElementSource, mode: DecodeMode) -> Result<Self, IpcError> {
        match mode {
            DecodeMode::Materialize => <NodeDescriptor as WireComponent>::deserialize(source).map(Self::Descriptor),
            DecodeMode::Forward => NodeForwarder::deserialize(source).map(Self::Forwarder),
        }
    }

    /// Typed view of the component, decoding a forwarded body on demand
    pub fn descriptor(&self) -> Result<NodeDescriptor, IpcError> {
        match self {
            NodeComponent::Descriptor(descriptor) => Ok(descriptor.clone()),
            NodeComponent::Forwarder(forwarder) => forwarder.materialize(),
        }
    }
}

impl From<NodeDescriptor> for NodeComponent {
    fn from(descriptor: NodeDescriptor) -> Self {
        NodeComponent::Descriptor(descriptor)
    }
}

/// Write the component type followed by the body
pub fn encode_component(component: &NodeComponent) -> Result<Bytes, IpcError> {
    let mut sink = ElementSink::new();
    sink.put_u8(component.component_type().code());
    component.serialize(&mut sink)?;
    Ok(sink.freeze())
}

/// Read a framed node component, checking its type identifier
pub fn decode_component(buf: impl Into<Bytes>, mode: DecodeMode) -> Result<NodeComponent, IpcError> {
    let mut source = ElementSource::new(buf);
    let code = source.get_u8()?;
    let component_type = ComponentType::try_from(code)?;
    if component_type != ComponentType::Node {
        return Err(IpcError::UnexpectedComponent {
            expected: ComponentType::Node.code(),
            actual: code,
        });
    }
    NodeComponent::decode(&mut source, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeDescriptor {
        NodeDescriptor::new("nav-1", "navigation", "planner", "/robot/planner")
    }

    #[test]
    fn test_descriptor_field_order() {
        let mut sink = ElementSink::new();
        WireComponent::serialize(&sample(), &mut sink).unwrap();

        let mut source = ElementSource::new(sink.freeze());
        assert_eq!(source.get_element().unwrap(), "nav-1");
        assert_eq!(source.get_element().unwrap(), "navigation");
        assert_eq!(source.get_element().unwrap(), "planner");
        assert_eq!(source.get_element().unwrap(), "/robot/planner");
        assert!(source.is_empty());
    }

    #[test]
    fn test_forward_mode_keeps_body_opaque() {
        let encoded = encode_component(&sample().into()).unwrap();

        let forwarded = decode_component(encoded.clone(), DecodeMode::Forward).unwrap();
        let NodeComponent::Forwarder(forwarder) = &forwarded else {
            panic!("expected forwarder, got {:?}", forwarded);
        };
        assert_eq!(forwarder.as_bytes(), &encoded.slice(1..));

        // Re-encoding a forwarder is byte-identical to the original frame
        assert_eq!(encode_component(&forwarded).unwrap(), encoded);
        assert_eq!(forwarded.descriptor().unwrap(), sample());
    }

    #[test]
    fn test_materialize_mode() {
        let encoded = encode_component(&sample().into()).unwrap();
        let decoded = decode_component(encoded, DecodeMode::Materialize).unwrap();
        assert_eq!(decoded, NodeComponent::Descriptor(sample()));
    }

    #[test]
    fn test_unknown_component_type() {
        let err = decode_component(vec![0x7fu8], DecodeMode::Materialize).unwrap_err();
        assert_eq!(err, IpcError::UnknownComponent(0x7f));
    }

    #[test]
    fn test_empty_frame() {
        let err = decode_component(Bytes::new(), DecodeMode::Forward).unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_truncated_descriptor() {
        let encoded = encode_component(&sample().into()).unwrap();
        let cut = encoded.slice(..encoded.len() - 3);
        let err = decode_component(cut, DecodeMode::Materialize).unwrap_err();
        assert!(err.is_incomplete());
    }
}

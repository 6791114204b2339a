//! Collaborator interfaces for the environment manager
//!
//! The environment manager drives several independently synchronized
//! collaborators: a process supervisor, a namespaced parameter registry,
//! a schema registry, a message converter and the transport that actually
//! invokes interfaces. This crate defines their contracts so the manager
//! can be exercised against real implementations or test doubles alike.

pub mod converter;
pub mod error;
pub mod invoker;
pub mod parameters;
pub mod schema;
pub mod supervisor;

pub use converter::{Converter, EncodedMessage, FileBundle, NativeMessage};
pub use error::{ConvertError, InvokeError, RegistryError, SchemaError, SupervisorError};
pub use invoker::InterfaceInvoker;
pub use parameters::{parameter_key, ParameterRegistry, ParameterValue};
pub use schema::{
    InterfaceDefinition, InterfaceKind, NodeDefinition, ParameterKind, ParameterSpec,
    SchemaRegistry,
};
pub use supervisor::{LaunchRequest, ProcessLiveness, ProcessSupervisor};

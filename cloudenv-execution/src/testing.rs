//! In-memory collaborators
//!
//! Lightweight implementations of the collaborator traits for tests and
//! local experiments. None of them touch the network or start processes.

use async_trait::async_trait;
use cloudenv_interfaces::{
    ConvertError, Converter, EncodedMessage, FileBundle, InterfaceDefinition, InterfaceInvoker,
    InvokeError, LaunchRequest, NativeMessage, NodeDefinition, ParameterRegistry,
    ParameterValue, ProcessLiveness, ProcessSupervisor, RegistryError, SchemaError,
    SchemaRegistry, SupervisorError,
};
use parking_lot::Mutex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::manager::Collaborators;

/// Supervisor that records launches instead of starting processes
#[derive(Debug, Default)]
pub struct InMemorySupervisor {
    processes: Mutex<HashMap<String, ProcessLiveness>>,
    launched: Mutex<Vec<LaunchRequest>>,
    terminated: Mutex<Vec<String>>,
    failing_package: Mutex<Option<String>>,
}

impl InMemorySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every launch of `package` fail
    pub fn fail_launches_of(&self, package: impl Into<String>) {
        *self.failing_package.lock() = Some(package.into());
    }

    pub fn set_liveness(&self, node_id: &str, liveness: ProcessLiveness) {
        self.processes.lock().insert(node_id.to_string(), liveness);
    }

    /// Drop all knowledge of a process, as if the supervisor restarted
    pub fn forget(&self, node_id: &str) {
        self.processes.lock().remove(node_id);
    }

    pub fn launched(&self) -> Vec<LaunchRequest> {
        self.launched.lock().clone()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.terminated.lock().clone()
    }
}

#[async_trait]
impl ProcessSupervisor for InMemorySupervisor {
    async fn launch(&self, request: LaunchRequest) -> Result<(), SupervisorError> {
        if self.failing_package.lock().as_deref() == Some(request.package.as_str()) {
            return Err(SupervisorError::LaunchFailed {
                package: request.package,
                executable: request.executable,
                reason: "launch refused".to_string(),
            });
        }

        self.processes
            .lock()
            .insert(request.node_id.clone(), ProcessLiveness::Alive);
        self.launched.lock().push(request);
        Ok(())
    }

    async fn liveness(&self, node_id: &str) -> ProcessLiveness {
        self.processes
            .lock()
            .get(node_id)
            .copied()
            .unwrap_or(ProcessLiveness::Unknown)
    }

    async fn terminate(&self, node_id: &str) -> Result<(), SupervisorError> {
        if self.processes.lock().remove(node_id).is_none() {
            return Err(SupervisorError::UnknownProcess(node_id.to_string()));
        }
        self.terminated.lock().push(node_id.to_string());
        Ok(())
    }
}

/// Parameter registry backed by an ordered map
#[derive(Debug, Default)]
pub struct InMemoryParameterRegistry {
    values: Mutex<BTreeMap<String, ParameterValue>>,
    flat: bool,
}

impl InMemoryParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that ignores namespaces, so equal parameter names collide
    /// across nodes
    pub fn flat() -> Self {
        Self {
            flat: true,
            ..Self::default()
        }
    }

    fn storage_key<'a>(&self, key: &'a str) -> &'a str {
        if self.flat {
            key.rsplit('/').next().unwrap_or(key)
        } else {
            key
        }
    }

    pub fn get(&self, key: &str) -> Option<ParameterValue> {
        self.values.lock().get(self.storage_key(key)).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

#[async_trait]
impl ParameterRegistry for InMemoryParameterRegistry {
    async fn insert_new(&self, key: &str, value: ParameterValue) -> Result<(), RegistryError> {
        let mut values = self.values.lock();
        let storage_key = self.storage_key(key);
        if values.contains_key(storage_key) {
            return Err(RegistryError::AlreadyExists(key.to_string()));
        }
        values.insert(storage_key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RegistryError> {
        self.values.lock().remove(self.storage_key(key));
        Ok(())
    }

    async fn remove_namespace(&self, namespace: &str) -> Result<(), RegistryError> {
        let prefix = format!("{}/", namespace);
        self.values.lock().retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}

/// Schema registry with a fixed set of definitions
#[derive(Debug, Default)]
pub struct StaticSchemaRegistry {
    nodes: HashMap<String, NodeDefinition>,
    interfaces: HashMap<String, InterfaceDefinition>,
}

impl StaticSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: impl Into<String>, definition: NodeDefinition) -> Self {
        self.nodes.insert(name.into(), definition);
        self
    }

    pub fn with_interface(
        mut self,
        name: impl Into<String>,
        definition: InterfaceDefinition,
    ) -> Self {
        self.interfaces.insert(name.into(), definition);
        self
    }
}

#[async_trait]
impl SchemaRegistry for StaticSchemaRegistry {
    async fn node_definition(&self, name: &str) -> Result<NodeDefinition, SchemaError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownNode(name.to_string()))
    }

    async fn interface_definition(&self, name: &str) -> Result<InterfaceDefinition, SchemaError> {
        self.interfaces
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownInterface(name.to_string()))
    }
}

/// Converter for JSON object messages.
///
/// Attachment references are strings of the form `ref:<key>`. On encode,
/// a top-level `files` object of string contents is split out into the
/// file bundle and replaced by references.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonConverter;

impl JsonConverter {
    pub const REFERENCE_PREFIX: &'static str = "ref:";

    pub fn reference(key: &str) -> String {
        format!("{}{}", Self::REFERENCE_PREFIX, key)
    }
}

impl Converter for JsonConverter {
    fn decode(
        &self,
        message_class: &str,
        data: &JsonValue,
        files: &FileBundle,
    ) -> Result<NativeMessage, ConvertError> {
        let JsonValue::Object(fields) = data else {
            return Err(ConvertError::InvalidValue(format!(
                "{} expects an object",
                message_class
            )));
        };

        let mut body = JsonMap::new();
        for (name, value) in fields {
            let value = match self.resolve_reference(value) {
                Some(key) => {
                    let content = files.get(&key).ok_or_else(|| {
                        ConvertError::Serialization(format!("missing attachment {}", key))
                    })?;
                    JsonValue::String(String::from_utf8_lossy(content).into_owned())
                }
                None => value.clone(),
            };
            body.insert(name.clone(), value);
        }
        Ok(NativeMessage::new(message_class, JsonValue::Object(body)))
    }

    fn encode(&self, message: &NativeMessage) -> Result<EncodedMessage, ConvertError> {
        let JsonValue::Object(fields) = &message.body else {
            return Err(ConvertError::Serialization(format!(
                "{} body is not an object",
                message.message_class
            )));
        };

        let mut data = fields.clone();
        let mut files = FileBundle::new();
        if let Some(JsonValue::Object(contents)) = data.remove("files") {
            let mut references = JsonMap::new();
            for (key, content) in contents {
                let JsonValue::String(content) = content else {
                    return Err(ConvertError::InvalidValue(format!(
                        "file {} is not a string",
                        key
                    )));
                };
                references.insert(key.clone(), JsonValue::String(Self::reference(&key)));
                files.insert(key, content.into_bytes());
            }
            data.insert("files".to_string(), JsonValue::Object(references));
        }

        Ok(EncodedMessage {
            data: JsonValue::Object(data),
            files,
        })
    }

    fn resolve_reference(&self, value: &JsonValue) -> Option<String> {
        value
            .as_str()
            .and_then(|s| s.strip_prefix(Self::REFERENCE_PREFIX))
            .map(str::to_string)
    }
}

/// Invoker that answers calls with a fixed response and records publishes.
///
/// A gated invoker holds every call until [`RecordingInvoker::release_calls`]
/// lets it through.
#[derive(Debug)]
pub struct RecordingInvoker {
    response: Mutex<Result<JsonValue, String>>,
    published: Mutex<Vec<(String, NativeMessage)>>,
    calls: Mutex<Vec<(String, NativeMessage)>>,
    publish_failure: Mutex<Option<String>>,
    gate: Option<Semaphore>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self {
            response: Mutex::new(Ok(JsonValue::Object(JsonMap::new()))),
            published: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            publish_failure: Mutex::new(None),
            gate: None,
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn respond_with(&self, body: JsonValue) {
        *self.response.lock() = Ok(body);
    }

    pub fn fail_calls(&self, reason: impl Into<String>) {
        *self.response.lock() = Err(reason.into());
    }

    pub fn fail_publishes(&self, reason: impl Into<String>) {
        *self.publish_failure.lock() = Some(reason.into());
    }

    /// Let `count` held calls complete
    pub fn release_calls(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn published(&self) -> Vec<(String, NativeMessage)> {
        self.published.lock().clone()
    }

    pub fn calls(&self) -> Vec<(String, NativeMessage)> {
        self.calls.lock().clone()
    }
}

impl Default for RecordingInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterfaceInvoker for RecordingInvoker {
    async fn call(
        &self,
        interface: &InterfaceDefinition,
        request: NativeMessage,
    ) -> Result<NativeMessage, InvokeError> {
        self.calls
            .lock()
            .push((interface.interface_name.clone(), request));

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| InvokeError::Unavailable(interface.interface_name.clone()))?
                .forget();
        }

        let response = self.response.lock().clone();
        let response_class = interface
            .definition
            .first()
            .cloned()
            .unwrap_or_else(|| format!("{}Response", interface.message_class));
        response
            .map(|body| NativeMessage::new(response_class, body))
            .map_err(|reason| InvokeError::Failed {
                interface: interface.interface_name.clone(),
                reason,
            })
    }

    async fn publish(
        &self,
        interface: &InterfaceDefinition,
        message: NativeMessage,
    ) -> Result<(), InvokeError> {
        if let Some(reason) = self.publish_failure.lock().clone() {
            return Err(InvokeError::Failed {
                interface: interface.interface_name.clone(),
                reason,
            });
        }
        self.published
            .lock()
            .push((interface.interface_name.clone(), message));
        Ok(())
    }
}

/// Handles to the in-memory collaborators behind a [`Collaborators`] set
pub struct InMemoryCollaborators {
    pub supervisor: Arc<InMemorySupervisor>,
    pub parameters: Arc<InMemoryParameterRegistry>,
    pub schemas: Arc<StaticSchemaRegistry>,
    pub invoker: Arc<RecordingInvoker>,
}

impl InMemoryCollaborators {
    pub fn new(
        schemas: StaticSchemaRegistry,
        parameters: InMemoryParameterRegistry,
        invoker: RecordingInvoker,
    ) -> Self {
        Self {
            supervisor: Arc::new(InMemorySupervisor::new()),
            parameters: Arc::new(parameters),
            schemas: Arc::new(schemas),
            invoker: Arc::new(invoker),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            supervisor: self.supervisor.clone(),
            parameters: self.parameters.clone(),
            schemas: self.schemas.clone(),
            converter: Arc::new(JsonConverter),
            invoker: self.invoker.clone(),
        }
    }
}

//! Transport-side invocation of environment interfaces

use async_trait::async_trait;

use crate::converter::NativeMessage;
use crate::error::InvokeError;
use crate::schema::InterfaceDefinition;

/// Performs the actual call or publish against a node interface
#[async_trait]
pub trait InterfaceInvoker: Send + Sync {
    /// Invoke a request/response interface and wait for its response.
    ///
    /// May block for an arbitrary duration; no timeout is applied here.
    async fn call(
        &self,
        interface: &InterfaceDefinition,
        request: NativeMessage,
    ) -> Result<NativeMessage, InvokeError>;

    /// Publish a message on a fire-and-forget interface
    async fn publish(
        &self,
        interface: &InterfaceDefinition,
        message: NativeMessage,
    ) -> Result<(), InvokeError>;
}

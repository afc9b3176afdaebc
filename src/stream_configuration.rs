//! Configuration types for bridge operations

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::error::{StreamError, StreamResult};
use crate::terminal::UndeliverablePolicy;

/// Default capacity of the Push→Pull channel
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Configuration shared by both bridge directions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bound of the channel between a push source and its pull consumer
    pub buffer_capacity: usize,
    /// Where errors go when their subscriber is already gone
    #[serde(skip)]
    pub undeliverable: UndeliverablePolicy,
    /// Runtime that hosts bridging tasks; the ambient runtime when `None`
    #[serde(skip)]
    pub runtime: Option<Handle>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            undeliverable: UndeliverablePolicy::default(),
            runtime: None,
        }
    }
}

impl BridgeConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_undeliverable(mut self, policy: UndeliverablePolicy) -> Self {
        self.undeliverable = policy;
        self
    }

    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Parse the serialisable part of the configuration
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The runtime bridging tasks are spawned on
    pub(crate) fn runtime_handle(&self) -> StreamResult<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|err| StreamError::Runtime(err.to_string())),
        }
    }
}

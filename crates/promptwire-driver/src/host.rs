//! The narrow remote-execution capability into the target page.
//!
//! Only the broker and the components it hands a host to may run script in
//! the page; nothing else talks to the page directly. Keeping the surface to
//! a single `evaluate` (plus the mutation feed the detector subscribes to)
//! makes every page interaction substitutable in tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use promptwire_protocols::TargetContext;

use crate::cdp::{CdpClient, CdpError, PageSession};

/// Evaluate-in-page capability.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Evaluate a JavaScript expression and return its value.
    async fn evaluate(&self, expression: &str) -> Result<Value, CdpError>;

    /// Take the page's DOM-change feed as unit pulses, if this host has one.
    /// Single-consumer: returns `None` once taken.
    fn take_mutation_pulses(&self) -> Option<mpsc::UnboundedReceiver<()>> {
        None
    }
}

#[async_trait]
impl ScriptHost for PageSession {
    async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        PageSession::evaluate(self, expression).await
    }

    fn take_mutation_pulses(&self) -> Option<mpsc::UnboundedReceiver<()>> {
        PageSession::take_mutation_pulses(self)
    }
}

/// Attaches a script host to a located page target.
#[async_trait]
pub trait PageAttacher: Send + Sync {
    async fn attach(&self, target: &TargetContext) -> Result<Arc<dyn ScriptHost>, CdpError>;
}

/// The production attacher: a CDP session per request.
pub struct CdpPageAttacher {
    client: Arc<CdpClient>,
}

impl CdpPageAttacher {
    pub fn new(client: Arc<CdpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageAttacher for CdpPageAttacher {
    async fn attach(&self, target: &TargetContext) -> Result<Arc<dyn ScriptHost>, CdpError> {
        let session = self.client.attach_page(&target.target_id).await?;
        Ok(Arc::new(session))
    }
}

use async_trait::async_trait;
use octofhir_credentials::audit::{AuditEvent, AuditLogger};
use tokio::sync::RwLock;

/// Keeps every audit event in memory, in emission order.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Names of the recorded events.
    pub async fn names(&self) -> Vec<&'static str> {
        self.events.read().await.iter().map(AuditEvent::name).collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn log(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }
}

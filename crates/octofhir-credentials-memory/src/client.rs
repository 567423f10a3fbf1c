use async_trait::async_trait;
use dashmap::DashMap;
use octofhir_credentials::AuthResult;
use octofhir_credentials::storage::ClientRepository;
use octofhir_credentials::types::{Client, ClientValidationError};

/// Client registrations keyed by public `client_id`.
#[derive(Debug, Default)]
pub struct InMemoryClientRepository {
    clients: DashMap<String, Client>,
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a client after checking its registration.
    pub fn insert(&self, client: Client) -> Result<(), ClientValidationError> {
        client.validate()?;
        self.clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Removes a client, returning it if present.
    pub fn remove(&self, client_id: &str) -> Option<Client> {
        self.clients.remove(client_id).map(|(_, client)| client)
    }

    /// Marks a client inactive. Returns `false` if it is unknown.
    pub fn deactivate(&self, client_id: &str) -> bool {
        match self.clients.get_mut(client_id) {
            Some(mut client) => {
                client.active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_public_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|entry| entry.value().clone()))
    }
}

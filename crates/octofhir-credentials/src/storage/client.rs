//! Client repository trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Read access to OAuth 2.0 client registrations.
///
/// # Example
///
/// ```ignore
/// use octofhir_credentials::storage::ClientRepository;
///
/// async fn example(clients: &impl ClientRepository) -> octofhir_credentials::AuthResult<()> {
///     if let Some(client) = clients.find_by_public_id("my-app").await? {
///         println!("Found client: {}", client.name);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Finds a client by its public `client_id`.
    ///
    /// Returns `None` if the client doesn't exist or is not active.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_public_id(&self, client_id: &str) -> AuthResult<Option<Client>>;
}

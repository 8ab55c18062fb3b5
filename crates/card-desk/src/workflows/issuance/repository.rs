use super::domain::{
    Application, ApplicationId, Batch, BatchId, Card, CardId, Client, ClientId,
};

/// Storage abstraction so the service facade can be exercised in isolation.
/// Implementations serialize concurrent writers; the service re-validates
/// preconditions against freshly fetched state before every write.
///
/// The trait has no transaction. Multi-entity operations validate fully, then
/// issue their writes as individual calls, so a store must not fail between
/// accepted writes of one operation; a store that can must reconcile the
/// partial sequence itself. The in-memory implementations never fail
/// mid-sequence.
pub trait IssuanceStore: Send + Sync {
    fn insert_client(&self, client: Client) -> Result<Client, RepositoryError>;
    fn update_client(&self, client: Client) -> Result<(), RepositoryError>;
    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    fn list_clients(&self) -> Result<Vec<Client>, RepositoryError>;

    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError>;

    fn insert_batch(&self, batch: Batch) -> Result<Batch, RepositoryError>;
    fn update_batch(&self, batch: Batch) -> Result<(), RepositoryError>;
    fn fetch_batch(&self, id: &BatchId) -> Result<Option<Batch>, RepositoryError>;
    fn list_batches(&self) -> Result<Vec<Batch>, RepositoryError>;

    fn insert_card(&self, card: Card) -> Result<Card, RepositoryError>;
    fn update_card(&self, card: Card) -> Result<(), RepositoryError>;
    fn fetch_card(&self, id: &CardId) -> Result<Option<Card>, RepositoryError>;
    fn list_cards(&self) -> Result<Vec<Card>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

//! [`MessageStore`]: persistence seam used by the request handlers.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::Collection;
use thiserror::Error;
use tracing::debug;

use super::factory::DatabaseHandle;
use super::message::{DocumentError, Message};

/// Errors produced while persisting a message.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The driver reported a failure (network, authentication, write error).
    #[error("database operation failed: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// The insert succeeded but returned an identifier of an unexpected type.
    #[error("unexpected inserted id: {0}")]
    UnexpectedId(String),

    /// The persisted document does not map back to a [`Message`].
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The database did not answer within the allotted time.
    #[error("database call timed out after {0:?}")]
    TimedOut(Duration),
}

/// Storage for [`Message`] records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert `message` as a new document and return it with its assigned id.
    async fn insert(&self, message: Message) -> Result<Message, PersistError>;

    /// Check that the backing database answers.
    async fn ping(&self) -> Result<(), PersistError>;
}

/// [`MessageStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoMessageStore {
    handle: DatabaseHandle,
    collection: Collection<Document>,
}

impl MongoMessageStore {
    pub fn new(handle: DatabaseHandle, collection: &str) -> Self {
        let collection = handle.collection(collection);
        Self { handle, collection }
    }
}

#[async_trait]
impl MessageStore for MongoMessageStore {
    async fn insert(&self, message: Message) -> Result<Message, PersistError> {
        let mut doc = message.to_document();
        let result = self.collection.insert_one(&doc).await?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| PersistError::UnexpectedId(result.inserted_id.to_string()))?;
        doc.insert("_id", id);
        debug!(collection = self.collection.name(), %id, "message inserted");

        Ok(Message::from_document(&doc)?)
    }

    async fn ping(&self) -> Result<(), PersistError> {
        self.handle.ping().await?;
        Ok(())
    }
}

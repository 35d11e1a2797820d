//! The [`Message`] record and its mapping to the stored document shape
//! `{ _id: ObjectId, msg: string }`.

use mongodb::bson::{oid::ObjectId, Bson, Document};
use thiserror::Error;

/// Text written by every `GET /api` request.
pub const MESSAGE_TEXT: &str = "helloworld";

/// Default collection that messages are written to.
pub const DEFAULT_COLLECTION: &str = "messages";

/// Errors produced when a stored document does not have the message shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document is missing field `{0}`")]
    MissingField(&'static str),

    #[error("document field `{0}` has the wrong type")]
    WrongType(&'static str),
}

/// A message record.
///
/// `id` is `None` until the storage layer has accepted the insert; it then
/// holds the identifier the database assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: Option<ObjectId>,
    msg: String,
}

impl Message {
    /// A new, not yet persisted message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            id: None,
            msg: msg.into(),
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// Map to the stored document. `_id` is omitted while unassigned so the
    /// database generates one.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert("_id", id);
        }
        doc.insert("msg", self.msg.as_str());
        doc
    }

    /// Map a stored document back to a [`Message`].
    ///
    /// `_id` may be an `ObjectId` or its 24-character hex string form.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if `msg` is missing or either field has the
    /// wrong type.
    pub fn from_document(doc: &Document) -> Result<Self, DocumentError> {
        let msg = match doc.get("msg") {
            Some(Bson::String(s)) => s.clone(),
            Some(_) => return Err(DocumentError::WrongType("msg")),
            None => return Err(DocumentError::MissingField("msg")),
        };

        let id = match doc.get("_id") {
            None => None,
            Some(Bson::ObjectId(oid)) => Some(*oid),
            Some(Bson::String(s)) => {
                Some(ObjectId::parse_str(s).map_err(|_| DocumentError::WrongType("_id"))?)
            }
            Some(_) => return Err(DocumentError::WrongType("_id")),
        };

        Ok(Self { id, msg })
    }
}

use mongodb::bson::{doc, ser::Error as BsonSerError, to_bson, Document};
use serde::{Deserialize, Serialize};

use crate::model::{common::Identity, mongodb::Id};

/// An identity following an election event.
///
/// Membership is a set: subscribing twice leaves one row, unsubscribing an
/// absent row is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: Id,
    pub owner: Identity,
    pub event_id: Id,
    /// Opt-in to notifications when the event changes or passes.
    #[serde(default = "default_notify")]
    pub notify_on_update: bool,
}

fn default_notify() -> bool {
    true
}

impl Subscription {
    /// Build the update document for a subscribe upsert.
    ///
    /// Only the notify flag is mutable; the identity and event key appear
    /// only in `$setOnInsert`, so subscribing twice leaves the one existing
    /// row in place.
    pub fn subscribe_doc(
        owner: &Identity,
        event_id: Id,
        notify: bool,
    ) -> Result<Document, BsonSerError> {
        Ok(doc! {
            "$set": { "notify_on_update": notify },
            "$setOnInsert": {
                "_id": Id::new(),
                "owner": to_bson(owner)?,
                "event_id": event_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_doc_only_notify_is_mutable() {
        let owner = Identity::Visitor("v1".to_string());
        let update = Subscription::subscribe_doc(&owner, Id::new(), false).unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("notify_on_update"));

        // Re-subscribing therefore only updates the flag: the row's
        // identity and event key are written once, on insert.
        let on_insert = update.get_document("$setOnInsert").unwrap();
        for field in ["_id", "owner", "event_id"] {
            assert!(on_insert.contains_key(field), "missing {field}");
            assert!(!set.contains_key(field), "unexpected {field}");
        }
    }

    #[test]
    fn notify_defaults_to_true() {
        let doc = mongodb::bson::doc! {
            "_id": *Id::new(),
            "owner": { "kind": "visitor", "id": "v1" },
            "event_id": *Id::new(),
        };
        let subscription: Subscription = mongodb::bson::from_document(doc).unwrap();
        assert!(subscription.notify_on_update);
    }
}

use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    card::VoterCard,
    decision::DecisionSet,
    event::{ElectionEvent, NewElectionEvent},
    subscription::Subscription,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Event collections
const EVENTS: &str = "events";
impl MongoCollection for ElectionEvent {
    const NAME: &'static str = EVENTS;
}
impl MongoCollection for NewElectionEvent {
    const NAME: &'static str = EVENTS;
}

// Decision ledger collection
const DECISIONS: &str = "decisions";
impl MongoCollection for DecisionSet {
    const NAME: &'static str = DECISIONS;
}

// Voter card collection
const CARDS: &str = "cards";
impl MongoCollection for VoterCard {
    const NAME: &'static str = CARDS;
}

// Subscription collection
const SUBSCRIPTIONS: &str = "subscriptions";
impl MongoCollection for Subscription {
    const NAME: &'static str = SUBSCRIPTIONS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Decision ledger: one snapshot per identity per ballot.
    let decision_index = IndexModel::builder()
        .keys(doc! {"owner.kind": 1, "owner.id": 1, "ballot_id": 1})
        .options(unique.clone())
        .build();
    Coll::<DecisionSet>::from_db(db)
        .create_index(decision_index, None)
        .await?;

    // Voter cards: at most one card per identity per event.
    // This index is what makes concurrent finalize calls converge to one row.
    let card_index = IndexModel::builder()
        .keys(doc! {"owner.kind": 1, "owner.id": 1, "event_id": 1})
        .options(unique.clone())
        .build();
    Coll::<VoterCard>::from_db(db)
        .create_index(card_index, None)
        .await?;

    // Subscriptions: set membership per identity per event.
    let subscription_index = IndexModel::builder()
        .keys(doc! {"owner.kind": 1, "owner.id": 1, "event_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Subscription>::from_db(db)
        .create_index(subscription_index, None)
        .await?;

    // Events: support the per-state public listing.
    let event_index = IndexModel::builder()
        .keys(doc! {"state": 1, "visibility": 1, "archived": 1})
        .build();
    Coll::<ElectionEvent>::from_db(db)
        .create_index(event_index, None)
        .await?;

    Ok(())
}

use mongodb::bson::{doc, Document};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
    State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::auth::user_id_from_cookie;

/// Header carrying the client-generated anonymous visitor ID.
pub const VISITOR_ID_HEADER: &str = "Visitor-Id";

/// The effective identity of the caller: either an anonymous visitor
/// (client-generated, persisted client-side) or an authenticated user.
///
/// This is the key space for all per-voter records. The two variants are
/// deliberately disjoint: a card created anonymously and one created
/// post-login for the same event are separate records, never unified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Identity {
    Visitor(String),
    User(String),
}

impl Identity {
    /// A filter matching records owned by this identity, assuming the owner
    /// is stored under the field `owner`.
    pub fn as_owner_filter(&self) -> Document {
        let (kind, id) = match self {
            Self::Visitor(id) => ("visitor", id),
            Self::User(id) => ("user", id),
        };
        doc! { "owner.kind": kind, "owner.id": id }
    }
}

/// Resolve the effective identity of a request.
///
/// A valid `auth_token` cookie wins; otherwise the `Visitor-Id` header is
/// used. Requests carrying neither cannot touch per-voter records.
fn resolve(req: &Request<'_>, config: &Config) -> Option<Identity> {
    if let Some(cookie) = req.cookies().get(crate::model::auth::AUTH_TOKEN_COOKIE) {
        if let Ok(user_id) = user_id_from_cookie(cookie, config) {
            return Some(Identity::User(user_id));
        }
    }
    req.headers()
        .get_one(VISITOR_ID_HEADER)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(|v| Identity::Visitor(v.to_string()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        match resolve(req, config) {
            Some(identity) => Outcome::Success(identity),
            None => Outcome::Failure((
                Status::BadRequest,
                Error::Validation(format!(
                    "No identity: supply an auth token or a {} header",
                    VISITOR_ID_HEADER
                )),
            )),
        }
    }
}

/// An optional identity, for endpoints that serve anonymous callers too.
pub struct MaybeIdentity(pub Option<Identity>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MaybeIdentity {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap();
        Outcome::Success(MaybeIdentity(resolve(req, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::bson::to_document;

    #[test]
    fn identity_serialises_as_tagged_document() {
        let visitor = Identity::Visitor("abc123".to_string());
        let doc = to_document(&visitor).unwrap();
        assert_eq!(doc, doc! { "kind": "visitor", "id": "abc123" });

        let user = Identity::User("u-42".to_string());
        let doc = to_document(&user).unwrap();
        assert_eq!(doc, doc! { "kind": "user", "id": "u-42" });
    }

    #[test]
    fn visitor_and_user_filters_are_disjoint() {
        // Same raw ID, different variants: must never match each other's records.
        let visitor = Identity::Visitor("same".to_string());
        let user = Identity::User("same".to_string());
        assert_ne!(visitor.as_owner_filter(), user.as_owner_filter());
    }

    #[test]
    fn owner_filter_targets_owner_fields() {
        let identity = Identity::Visitor("v1".to_string());
        assert_eq!(
            identity.as_owner_filter(),
            doc! { "owner.kind": "visitor", "owner.id": "v1" }
        );
    }
}

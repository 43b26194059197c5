//! Token decoding for authenticated callers.
//!
//! This backend never issues user tokens: authentication is an external
//! concern whose only output we consume is a signed JWT carrying a stable
//! user ID. Admin tokens are the same shape with an elevated-rights claim.

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use rocket::{
    http::{Cookie, Status},
    request::{FromRequest, Outcome, Request},
    State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Claims carried by an auth token cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user ID.
    pub sub: String,
    /// Elevated rights flag; set only on administrative tokens.
    #[serde(default)]
    pub adm: bool,
    /// Expiry.
    #[serde(rename = "exp", with = "ts_seconds")]
    pub expire_at: DateTime<Utc>,
}

/// Decode and validate the claims in an auth token cookie.
fn claims_from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Claims, Error> {
    let token: TokenData<Claims> = jsonwebtoken::decode(
        cookie.value(),
        &DecodingKey::from_secret(config.jwt_secret()),
        &Validation::default(),
    )?;
    Ok(token.claims)
}

/// Extract the authenticated user ID from an auth token cookie.
pub fn user_id_from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<String, Error> {
    Ok(claims_from_cookie(cookie, config)?.sub)
}

/// Request guard proving the caller holds an administrative token.
#[derive(Debug)]
pub struct AdminToken {
    pub user_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Forbidden("Administrative token required".to_string()),
                ));
            }
        };

        let claims = match claims_from_cookie(cookie, config) {
            Ok(claims) => claims,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        if claims.adm {
            Outcome::Success(AdminToken {
                user_id: claims.sub,
            })
        } else {
            Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden("Token does not carry administrative rights".to_string()),
            ))
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use jsonwebtoken::{EncodingKey, Header};

    /// Encode a token the way the external auth service would.
    pub fn encode_token(sub: &str, adm: bool, secret: &[u8]) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            adm,
            expire_at: Utc::now() + chrono::Duration::hours(1),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn claims_round_trip() {
        let secret = b"test-secret";
        let token = encode_token("user-1", false, secret);
        let decoded: TokenData<Claims> = jsonwebtoken::decode(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "user-1");
        assert!(!decoded.claims.adm);
    }

    #[test]
    fn adm_claim_defaults_to_false() {
        // Tokens minted before the admin flag existed must still decode.
        use rocket::serde::json::serde_json;

        let secret = b"test-secret";
        let claims = serde_json::json!({
            "sub": "user-2",
            "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
        });
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        let decoded: TokenData<Claims> = jsonwebtoken::decode(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .unwrap();
        assert!(!decoded.claims.adm);
    }
}

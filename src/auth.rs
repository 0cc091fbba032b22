use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::settings::BotSettings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// `"<platformUserId>:<name>"`
    pub sub: String,
    pub exp: usize,
    pub roles: Vec<Role>,
    /// Chat-platform role ids the caller holds in the guild.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guild_roles: Vec<String>,
}

impl Claims {
    /// Platform account id of the caller (the part of `sub` before the colon).
    pub fn platform_id(&self) -> &str {
        self.sub.split_once(':').map(|(id, _)| id).unwrap_or(&self.sub)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Admin role, the configured admin guild role, or listed in the bot
    /// settings' admin users.
    pub fn is_admin(&self, settings: &BotSettings) -> bool {
        self.has_role(&Role::Admin)
            || settings.is_admin_role(&self.guild_roles)
            || settings.is_admin_user(self.platform_id())
    }

    pub fn is_staff(&self, settings: &BotSettings) -> bool {
        self.has_role(&Role::Staff) || self.is_admin(settings)
    }
}

fn jwt_secret() -> Result<String, jsonwebtoken::errors::Error> {
    env::var("JWT_SECRET").map_err(|_| ErrorKind::InvalidKeyFormat.into())
}

/// Validate a JWT and return its claims.
fn decode_jwt(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = jwt_secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        if let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() {
            match decode_jwt(bearer.token()) {
                Ok(claims) => return ready(Ok(Auth(claims))),
                Err(e) => {
                    log::debug!("rejected bearer token: {e}");
                    return ready(Err(ApiError::Unauthorized.into()));
                }
            }
        }
        ready(Err(ApiError::Unauthorized.into()))
    }
}

/// Role guard for handlers that do not consult the bot settings.
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $role:pat) => {
        if !$auth.0.roles.iter().any(|r| matches!(r, $role)) {
            return Err($crate::error::ApiError::Forbidden);
        }
    };
}

/// Issue a 24h token for a platform user.
pub fn create_jwt(
    platform_id: &str,
    username: &str,
    roles: Vec<Role>,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_member_jwt(platform_id, username, roles, Vec::new())
}

/// Like [`create_jwt`], also carrying the caller's guild role ids.
pub fn create_member_jwt(
    platform_id: &str,
    username: &str,
    roles: Vec<Role>,
    guild_roles: Vec<String>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let secret = jwt_secret()?;
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: format!("{}:{}", platform_id, username),
        exp: expiration,
        roles,
        guild_roles,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

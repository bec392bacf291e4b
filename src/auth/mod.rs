use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Role names as they appear in the `roles` token claim. Unknown names are
/// ignored; only these two drive routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrative,
    Clinician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrative => "administrative",
            Role::Clinician => "clinician",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrative" => Ok(Role::Administrative),
            "clinician" => Ok(Role::Clinician),
            _ => Err(()),
        }
    }
}

/// JWT payload. The upstream token issuer emits the tenant id as a string
/// claim, so `site` stays stringly typed here and is parsed by
/// [`CallerIdentity::try_from`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: String, user_id: Uuid, site: i64, roles: &[Role]) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub,
            user_id,
            site: Some(site.to_string()),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// The caller's role set, reduced to the two roles routing cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
    pub administrative: bool,
    pub clinician: bool,
}

impl RoleSet {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut set = RoleSet::default();
        for name in names {
            match name.as_ref().parse() {
                Ok(Role::Administrative) => set.administrative = true,
                Ok(Role::Clinician) => set.clinician = true,
                Err(()) => {}
            }
        }
        set
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token carries no site claim")]
    MissingTenant,

    #[error("site claim '{0}' is not an integer")]
    MalformedTenant(String),
}

/// Authenticated caller resolved from validated claims: the tenant whose
/// partition they operate on, plus the roles that pick the federated path.
/// Resolution fails closed on a missing or unparseable tenant claim.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user: String,
    pub user_id: Uuid,
    pub tenant_id: i64,
    pub roles: RoleSet,
}

impl TryFrom<Claims> for CallerIdentity {
    type Error = IdentityError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let raw = claims.site.ok_or(IdentityError::MissingTenant)?;
        let tenant_id = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| IdentityError::MalformedTenant(raw.clone()))?;

        Ok(Self {
            user: claims.sub,
            user_id: claims.user_id,
            tenant_id,
            roles: RoleSet::from_names(&claims.roles),
        })
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

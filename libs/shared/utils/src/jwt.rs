use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, Role, User};

type HmacSha256 = Hmac<Sha256>;

/// Reads the claims segment of a token without checking its signature.
pub fn decode_claims(token: &str) -> Result<JwtClaims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(parts[1])
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })
}

/// Checks the HMAC-SHA256 signature of a token against `jwt_secret`.
pub fn verify_signature(token: &str, jwt_secret: &str) -> Result<(), String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let signature = URL_SAFE_NO_PAD.decode(parts[2]).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());

    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        "Invalid token signature".to_string()
    })
}

/// Decodes a session token into a [`User`], resolving its role once.
///
/// The signature is only checked when a secret is supplied; expiry is
/// always enforced.
pub fn decode_session(token: &str, jwt_secret: Option<&str>) -> Result<User, String> {
    if let Some(secret) = jwt_secret {
        verify_signature(token, secret)?;
    }

    let claims = decode_claims(token)?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let role: Role = claims
        .role
        .as_deref()
        .ok_or_else(|| "Token carries no role".to_string())?
        .parse()?;

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
        role,
        created_at,
    };

    debug!("Session decoded for user {} with role {}", user.id, user.role);
    Ok(user)
}

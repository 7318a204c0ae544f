// File: auth.rs

use std::collections::HashMap;

use actix_web::{http::header, web, HttpRequest};
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Resolves the logical identity behind a websocket handshake.
///
/// Browsers cannot attach headers to a websocket upgrade, so the token
/// normally arrives as a `token` query parameter; an `Authorization: Bearer`
/// header is accepted too. `None` means no valid token was presented; the
/// caller keeps the connection open but unregistered.
pub fn resolve_identity(req: &HttpRequest, secret: &str) -> Option<String> {
    let token = bearer_token(req).or_else(|| query_token(req))?;
    match validate_jwt(&token, secret) {
        Ok(claims) => Some(claims.sub),
        Err(e) => {
            warn!("Token rejected on websocket handshake: {}", e);
            None
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let auth_str = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn query_token(req: &HttpRequest) -> Option<String> {
    let query = web::Query::<HashMap<String, String>>::from_query(req.query_string()).ok()?;
    query.get("token").cloned()
}

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use serde_json::Value;

use crate::error::SyncError;
use crate::state::AppState;

#[derive(Debug, Eq, PartialEq)]
pub(crate) struct SyncPayload {
    pub username: String,
    /// The `state` object re-serialized compactly, keys in the order sent.
    pub state_json: String,
}

/// `POST /sync`: replace the caller's stored state with the posted one.
pub(crate) async fn sync_state(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, SyncError> {
    let payload = parse_payload(&body)?;
    let store = state.store.clone();

    let username = payload.username.clone();
    tokio::task::spawn_blocking(move || {
        store.upsert_user_state(&payload.username, &payload.state_json)
    })
    .await
    .map_err(|error| SyncError::Internal(format!("store task failed: {error}")))?
    .map_err(|error| {
        tracing::warn!(
            username = %username,
            kind = ?error.kind,
            message = %error.message,
            "failed to persist synced state"
        );
        SyncError::Storage(error)
    })?;

    tracing::debug!(username = %username, "synced state");
    Ok("ok")
}

/// Any method other than POST/OPTIONS on `/sync`.
pub(crate) async fn unsupported_method(method: Method) -> SyncError {
    tracing::debug!(method = %method, "rejected unsupported method on /sync");
    SyncError::UnsupportedMethod
}

/// Any path other than `/sync`.
pub(crate) async fn fallback(method: Method) -> SyncError {
    if method == Method::POST {
        SyncError::NotFound
    } else {
        SyncError::UnsupportedMethod
    }
}

pub(crate) fn parse_payload(body: &[u8]) -> Result<SyncPayload, SyncError> {
    let body = if body.is_empty() { b"{}".as_slice() } else { body };
    let payload: Value = serde_json::from_slice(body).map_err(|_| SyncError::InvalidJson)?;

    let username = payload
        .get("username")
        .and_then(Value::as_str)
        .filter(|username| !username.is_empty())
        .ok_or(SyncError::MissingUsername)?;

    let state = payload
        .get("state")
        .filter(|state| state.is_object())
        .ok_or(SyncError::MissingState)?;

    let state_json = serde_json::to_string(state)
        .map_err(|error| SyncError::Internal(format!("failed to encode state: {error}")))?;

    Ok(SyncPayload {
        username: username.to_string(),
        state_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_treated_as_empty_object() {
        assert!(matches!(parse_payload(b""), Err(SyncError::MissingUsername)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(parse_payload(b"{not json"), Err(SyncError::InvalidJson)));
        assert!(matches!(
            parse_payload(&[0xff, 0xfe]),
            Err(SyncError::InvalidJson)
        ));
    }

    #[test]
    fn username_must_be_a_non_empty_string() {
        for body in [
            r#"{"state":{}}"#,
            r#"{"username":"","state":{}}"#,
            r#"{"username":42,"state":{}}"#,
            r#"["alice"]"#,
        ] {
            assert!(
                matches!(parse_payload(body.as_bytes()), Err(SyncError::MissingUsername)),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn state_must_be_an_object() {
        for body in [
            r#"{"username":"alice"}"#,
            r#"{"username":"alice","state":null}"#,
            r#"{"username":"alice","state":[1,2]}"#,
            r#"{"username":"alice","state":"{}"}"#,
        ] {
            assert!(
                matches!(parse_payload(body.as_bytes()), Err(SyncError::MissingState)),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn state_is_reencoded_compactly_preserving_key_order_and_unicode() {
        let payload = parse_payload(
            r#"{ "username": "alice", "state": { "zeta": 1, "alpha": "完成", "rows": [ 1, 2 ] } }"#
                .as_bytes(),
        )
        .expect("valid payload");

        assert_eq!(payload.username, "alice");
        assert_eq!(payload.state_json, r#"{"zeta":1,"alpha":"完成","rows":[1,2]}"#);
    }
}

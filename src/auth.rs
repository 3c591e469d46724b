//! Sign-in.
//!
//! The login screen collects [`Credentials`] and hands them to an
//! [`Authenticator`] on a worker thread.  [`IdentityToolkit`] talks to the
//! Firebase Identity Toolkit REST API; anything else that can turn
//! credentials into a [`Session`] can stand in for it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter email and password")]
    MissingCredentials,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Google sign-in is not configured")]
    GoogleNotConfigured,
    #[error("sign-in service answered HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed sign-in response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { email: String, password: String },
    Google { id_token: String },
}

impl Credentials {
    /// Email/password credentials.  The email is trimmed; both fields must be
    /// non-empty.
    pub fn password(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    pub fn google(id_token: Option<&str>) -> Result<Self, AuthError> {
        match id_token.map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Credentials::Google {
                id_token: token.to_string(),
            }),
            _ => Err(AuthError::GoogleNotConfigured),
        }
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Credentials::Google { .. } => f.debug_struct("Google").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub user_id: String,
    pub id_token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait Authenticator: Send + Sync {
    fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;
}

pub struct IdentityToolkit {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    email: String,
    local_id: String,
    #[serde(default)]
    expires_in: Option<String>,
}

impl IdentityToolkit {
    pub fn new(endpoint: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn post<T: Serialize>(&self, method: &str, body: &T) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:{method}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            // Wrong password, unknown user, and disabled accounts all land here.
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            warn!(%status, method, "sign-in request failed");
            return Err(AuthError::Status(status.as_u16()));
        }

        let parsed: SignInResponse = serde_json::from_slice(&response.bytes()?)?;
        let lifetime = parsed
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(3600);

        Ok(Session {
            email: parsed.email,
            user_id: parsed.local_id,
            id_token: parsed.id_token,
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
        })
    }
}

impl Authenticator for IdentityToolkit {
    fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let session = match credentials {
            Credentials::Password { email, password } => self.post(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )?,
            Credentials::Google { id_token } => self.post(
                "signInWithIdp",
                &IdpRequest {
                    post_body: format!("id_token={id_token}&providerId=google.com"),
                    request_uri: "http://localhost",
                    return_idp_credential: true,
                    return_secure_token: true,
                },
            )?,
        };
        info!(user = %session.user_id, "signed in");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn toolkit(server: &MockServer) -> IdentityToolkit {
        IdentityToolkit::new(&server.base_url(), "test-key", Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn password_credentials_trim_email() {
        let creds = Credentials::password("  you@example.com ", "secret").unwrap();
        assert_eq!(
            creds,
            Credentials::Password {
                email: "you@example.com".into(),
                password: "secret".into()
            }
        );
    }

    #[test]
    fn empty_fields_are_rejected_before_any_request() {
        assert!(matches!(
            Credentials::password("   ", "secret"),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            Credentials::password("you@example.com", ""),
            Err(AuthError::MissingCredentials)
        ));
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "Please enter email and password"
        );
    }

    #[test]
    fn google_needs_a_token() {
        assert!(matches!(Credentials::google(None), Err(AuthError::GoogleNotConfigured)));
        assert!(matches!(Credentials::google(Some(" ")), Err(AuthError::GoogleNotConfigured)));
        assert!(Credentials::google(Some("tok")).is_ok());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::password("you@example.com", "hunter2").unwrap();
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn password_sign_in_returns_session() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/accounts:signInWithPassword")
                .query_param("key", "test-key")
                .json_body(json!({
                    "email": "you@example.com",
                    "password": "secret",
                    "returnSecureToken": true
                }));
            then.status(200).json_body(json!({
                "idToken": "id-token",
                "email": "you@example.com",
                "refreshToken": "refresh",
                "expiresIn": "3600",
                "localId": "user-1"
            }));
        });

        let creds = Credentials::password("you@example.com", "secret").unwrap();
        let session = toolkit(&server).sign_in(&creds).unwrap();

        mock.assert();
        assert_eq!(session.email, "you@example.com");
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.id_token, "id-token");
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn rejected_password_maps_to_invalid_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/accounts:signInWithPassword");
            then.status(400)
                .json_body(json!({ "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" } }));
        });

        let creds = Credentials::password("you@example.com", "wrong").unwrap();
        let err = toolkit(&server).sign_in(&creds).unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[test]
    fn google_sign_in_posts_id_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/accounts:signInWithIdp")
                .body_contains("id_token=google-token&providerId=google.com");
            then.status(200).json_body(json!({
                "idToken": "firebase-token",
                "email": "you@gmail.com",
                "localId": "user-2",
                "expiresIn": "3600"
            }));
        });

        let creds = Credentials::google(Some("google-token")).unwrap();
        let session = toolkit(&server).sign_in(&creds).unwrap();

        mock.assert();
        assert_eq!(session.user_id, "user-2");
    }

    #[test]
    fn server_error_is_reported_as_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/accounts:signInWithPassword");
            then.status(500);
        });

        let creds = Credentials::password("a@b.c", "pw").unwrap();
        assert!(matches!(
            toolkit(&server).sign_in(&creds),
            Err(AuthError::Status(500))
        ));
    }
}

//! Account registration and bearer-token sessions.
//!
//! Passwords are stored as bcrypt hashes. Sessions are process-local:
//! logging in issues a random token valid for seven days, and restarting
//! the server logs everyone out.

use crate::storage::{Storage, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

const SESSION_TTL_DAYS: i64 = 7;
const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug)]
pub enum AuthError {
    /// Rejected input; the message is shown to the user.
    Validation(String),
    InvalidCredentials,
    InvalidToken,
    Storage(StorageError),
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::InvalidCredentials => write!(f, "Email veya şifre hatalı"),
            Self::InvalidToken => write!(f, "Geçersiz veya süresi dolmuş token"),
            Self::Storage(err) => write!(f, "{}", err),
            Self::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// The authenticated identity attached to a verified token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

/// A successful login: the bearer token plus the user it identifies.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
}

struct SessionEntry {
    user: AuthUser,
    expires_at: DateTime<Utc>,
}

pub struct SessionAuthenticator {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new() -> Self {
        Self::with_ttl(Duration::days(SESSION_TTL_DAYS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), ttl }
    }

    /// Validate and create an account. Returns the new user id.
    pub fn register(
        &self,
        storage: &Storage,
        email: Option<&str>,
        password: Option<&str>,
        age: Option<i64>,
        city_id: Option<i64>,
    ) -> Result<i64, AuthError> {
        let (Some(email), Some(password)) = (nonblank(email), nonblank(password)) else {
            return Err(AuthError::Validation("Email ve şifre gerekli".into()));
        };

        let age = match age {
            Some(age) if (1..=120).contains(&age) => age as u32,
            _ => {
                return Err(AuthError::Validation(
                    "Geçerli bir yaş giriniz (1-120)".into(),
                ))
            }
        };

        let Some(city_id) = city_id else {
            return Err(AuthError::Validation("Lütfen yaşadığınız ili seçiniz".into()));
        };
        if !storage.city_exists(city_id)? {
            return Err(AuthError::Validation("Geçersiz şehir seçimi".into()));
        }

        if !is_plausible_email(email) {
            return Err(AuthError::Validation(
                "Geçerli bir email adresi giriniz".into(),
            ));
        }
        if !email.to_lowercase().ends_with("@gmail.com") {
            return Err(AuthError::Validation(
                "Sadece @gmail.com uzantılı email adresleri kabul edilmektedir".into(),
            ));
        }

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::Validation(
                "Şifre en az 6 karakter olmalıdır".into(),
            ));
        }

        if storage.user_by_email(email)?.is_some() {
            return Err(AuthError::Validation("Bu email adresi zaten kayıtlı".into()));
        }

        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(storage.insert_user(email, &hash, age, city_id)?)
    }

    /// Check credentials and open a session.
    pub fn login(
        &self,
        storage: &Storage,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Session, AuthError> {
        let (Some(email), Some(password)) = (nonblank(email), nonblank(password)) else {
            return Err(AuthError::Validation("Email ve şifre gerekli".into()));
        };

        let user = storage
            .user_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;
        let matches = bcrypt::verify(password, &user.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let auth_user = AuthUser { id: user.id, email: user.email };
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions().insert(
            token.clone(),
            SessionEntry {
                user: auth_user.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );

        Ok(Session { token, user: auth_user })
    }

    /// Resolve a bearer token to its user. Expired tokens are evicted.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut sessions = self.sessions();
        let expired = match sessions.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => return Ok(entry.user.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(token);
        }
        Err(AuthError::InvalidToken)
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SessionAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

fn nonblank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Shape check only: one `@`, no whitespace, a dot somewhere in the
/// domain with text on both sides.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_city() -> (Storage, i64) {
        let storage = Storage::open_in_memory().unwrap();
        let city = storage.insert_city("Yalova");
        (storage, city)
    }

    fn register_ok(auth: &SessionAuthenticator, storage: &Storage, city: i64) -> i64 {
        auth.register(
            storage,
            Some("gezgin@gmail.com"),
            Some("parola1"),
            Some(30),
            Some(city),
        )
        .unwrap()
    }

    fn validation_message(err: AuthError) -> String {
        match err {
            AuthError::Validation(msg) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_register_requires_email_and_password() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let err = auth
            .register(&storage, None, Some("parola1"), Some(30), Some(city))
            .unwrap_err();
        assert_eq!(validation_message(err), "Email ve şifre gerekli");
    }

    #[test]
    fn test_register_age_bounds() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        for age in [None, Some(0), Some(121)] {
            let err = auth
                .register(&storage, Some("a@gmail.com"), Some("parola1"), age, Some(city))
                .unwrap_err();
            assert_eq!(validation_message(err), "Geçerli bir yaş giriniz (1-120)");
        }
    }

    #[test]
    fn test_register_unknown_city() {
        let (storage, _) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let err = auth
            .register(&storage, Some("a@gmail.com"), Some("parola1"), Some(30), Some(999))
            .unwrap_err();
        assert_eq!(validation_message(err), "Geçersiz şehir seçimi");
    }

    #[test]
    fn test_register_email_shape() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        for email in ["gezgin", "gezgin@", "@gmail.com", "gezgin@gmailcom"] {
            let err = auth
                .register(&storage, Some(email), Some("parola1"), Some(30), Some(city))
                .unwrap_err();
            assert_eq!(validation_message(err), "Geçerli bir email adresi giriniz");
        }
    }

    #[test]
    fn test_register_gmail_only() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let err = auth
            .register(&storage, Some("a@example.com"), Some("parola1"), Some(30), Some(city))
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "Sadece @gmail.com uzantılı email adresleri kabul edilmektedir"
        );
    }

    #[test]
    fn test_register_short_password() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let err = auth
            .register(&storage, Some("a@gmail.com"), Some("kısa"), Some(30), Some(city))
            .unwrap_err();
        assert_eq!(validation_message(err), "Şifre en az 6 karakter olmalıdır");
    }

    #[test]
    fn test_register_duplicate_email() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        register_ok(&auth, &storage, city);
        let err = auth
            .register(&storage, Some("gezgin@gmail.com"), Some("parola2"), Some(25), Some(city))
            .unwrap_err();
        assert_eq!(validation_message(err), "Bu email adresi zaten kayıtlı");
    }

    #[test]
    fn test_register_hashes_password() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        register_ok(&auth, &storage, city);
        let user = storage.user_by_email("gezgin@gmail.com").unwrap().unwrap();
        assert_ne!(user.password, "parola1");
    }

    #[test]
    fn test_login_then_verify() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let id = register_ok(&auth, &storage, city);

        let session = auth
            .login(&storage, Some("gezgin@gmail.com"), Some("parola1"))
            .unwrap();
        assert_eq!(session.user.id, id);

        let user = auth.verify(&session.token).unwrap();
        assert_eq!(user, session.user);
    }

    #[test]
    fn test_login_wrong_password() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::new();
        register_ok(&auth, &storage, city);

        let err = auth
            .login(&storage, Some("gezgin@gmail.com"), Some("yanlış!"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_login_unknown_user_same_error() {
        let (storage, _) = storage_with_city();
        let auth = SessionAuthenticator::new();
        let err = auth
            .login(&storage, Some("kimse@gmail.com"), Some("parola1"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_verify_unknown_token() {
        let auth = SessionAuthenticator::new();
        assert!(matches!(auth.verify("yok"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_verify_expired_token() {
        let (storage, city) = storage_with_city();
        let auth = SessionAuthenticator::with_ttl(Duration::seconds(-1));
        register_ok(&auth, &storage, city);

        let session = auth
            .login(&storage, Some("gezgin@gmail.com"), Some("parola1"))
            .unwrap();
        assert!(matches!(auth.verify(&session.token), Err(AuthError::InvalidToken)));
        // Expired sessions are dropped on first sight.
        assert!(auth.sessions().is_empty());
    }

    #[test]
    fn test_email_shape_helper() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
        assert!(!is_plausible_email("a@b@c.co"));
        assert!(!is_plausible_email("a@.co"));
    }
}

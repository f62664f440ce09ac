//! Business logic for authentication.
//!
//! Password hashing, JWT issuing/validation and the account flows
//! (register, login, refresh, logout) live here; handlers stay thin.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{pbkdf2_hmac, Params, Pbkdf2};
use rusqlite::Connection;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::AuthError;
use super::models::{
    redirect_for, AuthResponse, Claims, LoginRequest, RegisterRequest, TokenPair, TokenType,
};
use crate::config::AuthConfig;
use crate::database::models::{Role, User};
use crate::database::{queries, Database};
use crate::errors::{AppError, AppResult};
use crate::services::staff::sync_staff_profile;
use crate::utils::{is_valid_email, split_full_name};

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
/// Prefix of hashes imported from the previous Django deployment.
const DJANGO_SCHEME: &str = "pbkdf2_sha256";

/// Hashes a password with PBKDF2-SHA256 into a PHC string
/// (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).
pub fn hash_password(password: &str, iterations: u32) -> AppResult<String> {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("password salt: {}", e)))?;
    let params = Params {
        rounds: iterations.max(1),
        output_length: KEY_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| AppError::Internal(format!("password hashing: {}", e)))?;
    Ok(hash.to_string())
}

/// Checks a password against a PHC string or a Django
/// `pbkdf2_sha256$<iterations>$<salt>$<base64 hash>` string. Anything else
/// never matches.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    if encoded.starts_with(DJANGO_SCHEME) {
        return verify_django(password, encoded);
    }
    match PasswordHash::new(encoded) {
        Ok(parsed) => Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn verify_django(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != DJANGO_SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(expected)) = (iterations.parse::<u32>(), BASE64.decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.is_empty() {
        return false;
    }
    let mut derived = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut derived);
    derived.as_slice().ct_eq(expected.as_slice()).into()
}

/// [`hash_password`] on the blocking pool so request workers stay free.
pub async fn hash_password_blocking(password: String, iterations: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task: {}", e)))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, encoded: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| AppError::Internal(format!("password check task: {}", e)))
}

/// Issues and validates HS256 access and refresh tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue(&self, user: &User, token_type: TokenType) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            is_superuser: user.is_superuser,
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Issue(e.to_string()))?;
        Ok((token, claims))
    }

    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        if data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType(expected.as_str()));
        }
        Ok(data.claims)
    }
}

/// Issues an access/refresh pair and records the refresh token.
pub fn issue_pair(conn: &Connection, tokens: &TokenService, user: &User) -> AppResult<TokenPair> {
    let (access_token, _) = tokens.issue(user, TokenType::Access)?;
    let (refresh_token, refresh) = tokens.issue(user, TokenType::Refresh)?;
    queries::insert_refresh_token(conn, &refresh.jti, &user.id, refresh.exp)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.access_ttl_secs(),
    })
}

/// Fields for creating any kind of account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
}

/// Lowercased first name; `{name}_{user_count}` when that is taken.
fn unique_username(conn: &Connection, first_name: &str, email: &str) -> AppResult<String> {
    let base = match first_name.trim() {
        "" => email.split('@').next().unwrap_or_default(),
        name => name,
    }
    .to_lowercase();
    if !queries::username_exists(conn, &base)? {
        return Ok(base);
    }
    let mut n = queries::count_users(conn)?;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !queries::username_exists(conn, &candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Creates a user and keeps the staff profile in step with the role.
/// `password_hash` comes from [`hash_password`], computed before the
/// database lock is taken.
pub fn create_account(conn: &Connection, account: &NewAccount, password_hash: &str) -> AppResult<User> {
    let email = account.email.trim();
    validate_account(account)?;
    if queries::get_user_by_email(conn, email)?.is_some() {
        return Err(AppError::conflict("Email already exists"));
    }

    let username = unique_username(conn, &account.first_name, email)?;
    let user = queries::insert_user(
        conn,
        &queries::NewUser {
            username,
            email: email.to_string(),
            first_name: account.first_name.trim().to_string(),
            last_name: account.last_name.trim().to_string(),
            phone: account.phone.clone(),
            role: account.role,
            is_superuser: account.is_superuser,
            password_hash: password_hash.to_string(),
        },
    )
    .map_err(|e| {
        if queries::is_constraint_violation(&e) {
            AppError::conflict("Email already exists")
        } else {
            e.into()
        }
    })?;
    sync_staff_profile(conn, &user)?;
    info!("Created {} account {}", user.role, user.email);
    Ok(user)
}

/// Field checks that need no database access.
pub fn validate_account(account: &NewAccount) -> AppResult<()> {
    if !is_valid_email(account.email.trim()) {
        return Err(AppError::validation("Enter a valid email address."));
    }
    if account.password.is_empty() {
        return Err(AppError::validation("Password is required."));
    }
    Ok(())
}

/// Validates, hashes off the request worker, then inserts in one transaction.
pub async fn create_account_hashed(db: &Database, iterations: u32, account: &NewAccount) -> AppResult<User> {
    validate_account(account)?;
    let password_hash = hash_password_blocking(account.password.clone(), iterations).await?;
    db.with_tx(|tx| create_account(tx, account, &password_hash))
}

pub async fn register(
    db: &Database,
    tokens: &TokenService,
    iterations: u32,
    req: &RegisterRequest,
) -> AppResult<AuthResponse> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::validation("Full name is required."));
    }
    if req.password != req.confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }
    let (first_name, last_name) = split_full_name(&req.full_name);
    let account = NewAccount {
        email: req.email.clone(),
        password: req.password.clone(),
        first_name,
        last_name,
        phone: None,
        role: Role::Customer,
        is_superuser: false,
    };
    validate_account(&account)?;
    let password_hash = hash_password_blocking(account.password.clone(), iterations).await?;

    db.with_tx(|tx| {
        let user = create_account(tx, &account, &password_hash)?;
        queries::touch_last_login(tx, &user.id)?;
        let pair = issue_pair(tx, tokens, &user)?;
        Ok(AuthResponse {
            tokens: pair,
            redirect: redirect_for(&user).to_string(),
            user,
        })
    })
}

/// The user row is read and the lock released before the password is checked.
pub async fn login(db: &Database, tokens: &TokenService, req: &LoginRequest) -> AppResult<AuthResponse> {
    let user = db
        .with_conn(|conn| Ok(queries::get_user_by_email(conn, req.email.trim())?))?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password_blocking(req.password.clone(), user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active {
        warn!("Login refused for inactive account {}", user.email);
        return Err(AuthError::Inactive.into());
    }

    db.with_tx(|tx| {
        queries::touch_last_login(tx, &user.id)?;
        let pair = issue_pair(tx, tokens, &user)?;
        let user = queries::get_user(tx, &user.id)?.ok_or(AuthError::UnknownUser)?;
        debug!("User {} logged in", user.email);
        Ok(AuthResponse {
            tokens: pair,
            redirect: redirect_for(&user).to_string(),
            user,
        })
    })
}

/// Rotates a refresh token: the presented one is revoked and a new pair issued.
pub fn refresh(db: &Database, tokens: &TokenService, refresh_token: &str) -> AppResult<TokenPair> {
    let claims = tokens.decode(refresh_token, TokenType::Refresh)?;
    db.with_tx(|tx| {
        let record = queries::get_refresh_token(tx, &claims.jti)?.ok_or(AuthError::Revoked)?;
        if record.revoked || !queries::revoke_refresh_token(tx, &record.jti)? {
            warn!("Reuse of revoked refresh token for user {}", record.user_id);
            return Err(AuthError::Revoked.into());
        }
        let user = queries::get_user(tx, &record.user_id)?.ok_or(AuthError::UnknownUser)?;
        if !user.is_active {
            return Err(AuthError::Inactive.into());
        }
        issue_pair(tx, tokens, &user)
    })
}

/// Revokes a refresh token. Revoking twice is not an error.
pub fn logout(db: &Database, tokens: &TokenService, refresh_token: &str) -> AppResult<()> {
    let claims = tokens.decode(refresh_token, TokenType::Refresh)?;
    db.with_conn(|conn| {
        queries::revoke_refresh_token(conn, &claims.jti)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERATIONS: u32 = 10;

    fn setup() -> (Database, TokenService) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        (db, TokenService::new(&AuthConfig::default()))
    }

    async fn register_jane(db: &Database, tokens: &TokenService) -> AuthResponse {
        register(
            db,
            tokens,
            ITERATIONS,
            &RegisterRequest {
                full_name: "Jane Mary Doe".into(),
                email: "jane@example.com".into(),
                password: "s3cret!".into(),
                confirm_password: "s3cret!".into(),
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_password_hash_round_trip() {
        let encoded = hash_password("hunter2", ITERATIONS).unwrap();
        assert!(encoded.starts_with("$pbkdf2-sha256$"));
        assert!(encoded.contains("i=10"));
        assert!(verify_password("hunter2", &encoded));
        assert!(!verify_password("hunter3", &encoded));
        assert_ne!(encoded, hash_password("hunter2", ITERATIONS).unwrap());
    }

    #[test]
    fn test_unknown_hash_schemes_never_match() {
        assert!(!verify_password("hunter2", "plain"));
        assert!(!verify_password("hunter2", ""));
        assert!(!verify_password("hunter2", "sha256$10$00ff$abcd"));
        assert!(!verify_password("hunter2", "$argon2id$v=19$m=16,t=2,p=1$c2FsdHNhbHQ$aGFzaA"));
        assert!(!verify_password("hunter2", "pbkdf2_sha256$0$salt$aGFzaA=="));
        assert!(!verify_password("hunter2", "pbkdf2_sha256$10$salt"));
    }

    #[test]
    fn test_django_pbkdf2_hashes_verify() {
        let mut derived = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(b"hunter2", b"pepper", 3, &mut derived);
        let encoded = format!("pbkdf2_sha256$3$pepper${}", BASE64.encode(derived));
        assert!(verify_password("hunter2", &encoded));
        assert!(!verify_password("hunter3", &encoded));
    }

    #[tokio::test]
    async fn test_blocking_helpers_agree() {
        let encoded = hash_password_blocking("hunter2".into(), ITERATIONS).await.unwrap();
        assert!(verify_password_blocking("hunter2".into(), encoded.clone()).await.unwrap());
        assert!(!verify_password_blocking("nope".into(), encoded).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_splits_name_and_logs_in() {
        let (db, tokens) = setup();
        let resp = register_jane(&db, &tokens).await;
        assert_eq!(resp.user.first_name, "Jane");
        assert_eq!(resp.user.last_name, "Mary Doe");
        assert_eq!(resp.user.username, "jane");
        assert_eq!(resp.user.role, Role::Customer);
        assert_eq!(resp.redirect, "/dashboard/");
        let claims = tokens.decode(&resp.tokens.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, resp.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_mismatch_and_duplicates() {
        let (db, tokens) = setup();
        let err = register(
            &db,
            &tokens,
            ITERATIONS,
            &RegisterRequest {
                full_name: "Jane".into(),
                email: "jane@example.com".into(),
                password: "a".into(),
                confirm_password: "b".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");

        register_jane(&db, &tokens).await;
        let err = register(
            &db,
            &tokens,
            ITERATIONS,
            &RegisterRequest {
                full_name: "Jane Other".into(),
                email: "jane@example.com".into(),
                password: "x".into(),
                confirm_password: "x".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_taken_username_gets_user_count_suffix() {
        let (db, tokens) = setup();
        register_jane(&db, &tokens).await;
        let resp = register(
            &db,
            &tokens,
            ITERATIONS,
            &RegisterRequest {
                full_name: "Jane Roe".into(),
                email: "roe@example.com".into(),
                password: "x".into(),
                confirm_password: "x".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.user.username, "jane_1");
    }

    #[tokio::test]
    async fn test_login_checks_password_and_active_flag() {
        let (db, tokens) = setup();
        let jane = register_jane(&db, &tokens).await.user;

        let bad = LoginRequest {
            email: "jane@example.com".into(),
            password: "wrong".into(),
        };
        assert!(matches!(
            login(&db, &tokens, &bad).await,
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));

        let good = LoginRequest {
            email: "jane@example.com".into(),
            password: "s3cret!".into(),
        };
        let resp = login(&db, &tokens, &good).await.unwrap();
        assert!(resp.user.last_login.is_some());

        db.with_conn(|conn| Ok(queries::update_user_access(conn, &jane.id, Role::Customer, false)?))
            .unwrap();
        assert!(matches!(
            login(&db, &tokens, &good).await,
            Err(AppError::Auth(AuthError::Inactive))
        ));
    }

    #[tokio::test]
    async fn test_panel_users_redirect_to_admin_panel() {
        let (db, tokens) = setup();
        create_account_hashed(
            &db,
            ITERATIONS,
            &NewAccount {
                email: "staff@example.com".into(),
                password: "pw".into(),
                first_name: "Sita".into(),
                last_name: String::new(),
                phone: None,
                role: Role::Staff,
                is_superuser: false,
            },
        )
        .await
        .unwrap();
        let resp = login(
            &db,
            &tokens,
            &LoginRequest {
                email: "staff@example.com".into(),
                password: "pw".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.redirect, "/adminpanel/dashboard/");
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_logout_revokes() {
        let (db, tokens) = setup();
        let first = register_jane(&db, &tokens).await.tokens;

        let second = refresh(&db, &tokens, &first.refresh_token).unwrap();
        assert!(matches!(
            refresh(&db, &tokens, &first.refresh_token),
            Err(AppError::Auth(AuthError::Revoked))
        ));

        logout(&db, &tokens, &second.refresh_token).unwrap();
        logout(&db, &tokens, &second.refresh_token).unwrap();
        assert!(matches!(
            refresh(&db, &tokens, &second.refresh_token),
            Err(AppError::Auth(AuthError::Revoked))
        ));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let (db, tokens) = setup();
        let pair = register_jane(&db, &tokens).await.tokens;
        assert!(matches!(
            refresh(&db, &tokens, &pair.access_token),
            Err(AppError::Auth(AuthError::WrongTokenType("refresh")))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(&AuthConfig::default());
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".into(),
            email: "jane@example.com".into(),
            role: Role::Customer,
            is_superuser: false,
            token_type: TokenType::Access,
            jti: "j1".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(AuthConfig::default().jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            tokens.decode(&token, TokenType::Access),
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            tokens.decode("not-a-jwt", TokenType::Access),
            Err(AuthError::InvalidToken(_))
        ));
    }
}

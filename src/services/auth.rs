use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::{Claims, RefreshClaims},
    user::{Account, Language, LoginResponse, RefreshToken, User, UserProfile},
};

const USER_COLUMNS: &str = "id, account_id, email, name, password_hash, language, created_at";

pub struct AuthService;

impl AuthService {
    /// Create a household account plus its first user. Fails when the email
    /// is already registered.
    pub async fn register(
        pool: &PgPool,
        email: &str,
        password: &str,
        name: &str,
        language: Language,
    ) -> anyhow::Result<UserProfile> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        if exists {
            anyhow::bail!("User already exists");
        }

        let password_hash = bcrypt::hash(password, 12)?;

        let account: Account = sqlx::query_as(
            "INSERT INTO accounts (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(format!("{name}'s Family"))
        .fetch_one(pool)
        .await?;

        let user: User = sqlx::query_as(&format!(
            "INSERT INTO users (account_id, email, name, password_hash, language)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(account.id)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(language.to_string())
        .fetch_one(pool)
        .await?;

        Ok(user.into())
    }

    /// Validate credentials and return a fresh token pair.
    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        refresh_secret: &str,
        access_ttl: u64,
        refresh_ttl_days: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Invalid credentials"))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid credentials"))?;
        if !valid {
            anyhow::bail!("Invalid credentials");
        }

        Self::issue_token_pair(pool, &user, jwt_secret, refresh_secret, access_ttl, refresh_ttl_days)
            .await
    }

    async fn issue_token_pair(
        pool: &PgPool,
        user: &User,
        jwt_secret: &str,
        refresh_secret: &str,
        access_ttl: u64,
        refresh_ttl_days: u64,
    ) -> anyhow::Result<LoginResponse> {
        let access_token = Self::generate_access_token(user, jwt_secret, access_ttl)?;
        let (refresh_token_str, refresh_id) =
            Self::generate_refresh_token(&user.id, refresh_secret, refresh_ttl_days)?;

        let hash = bcrypt::hash(&refresh_token_str, 8)?;
        let expires_at = Utc::now() + chrono::Duration::days(refresh_ttl_days as i64);
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(refresh_id)
        .bind(user.id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(LoginResponse {
            access_token,
            refresh_token: refresh_token_str,
            user: user.clone().into(),
        })
    }

    pub fn generate_access_token(
        user: &User,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            account: user.account_id.to_string(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn generate_refresh_token(
        user_id: &Uuid,
        secret: &str,
        ttl_days: u64,
    ) -> anyhow::Result<(String, Uuid)> {
        let now = Utc::now().timestamp() as usize;
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: jti.to_string(),
            iat: now,
            exp: now + (ttl_days * 86400) as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok((token, jti))
    }

    /// Rotate refresh token: revoke old, issue new pair.
    pub async fn refresh(
        pool: &PgPool,
        refresh_token_str: &str,
        jwt_secret: &str,
        refresh_secret: &str,
        access_ttl: u64,
        refresh_ttl_days: u64,
    ) -> anyhow::Result<LoginResponse> {
        let key = DecodingKey::from_secret(refresh_secret.as_bytes());
        let data = decode::<RefreshClaims>(
            refresh_token_str,
            &key,
            &Validation::new(Algorithm::HS256),
        )?;
        let rc = data.claims;
        let jti: Uuid = rc.jti.parse()?;
        let user_id: Uuid = rc.sub.parse()?;

        let stored: RefreshToken = sqlx::query_as(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at
             FROM refresh_tokens WHERE id = $1 AND revoked = FALSE",
        )
        .bind(jti)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Refresh token not found or revoked"))?;

        if stored.expires_at < Utc::now() {
            anyhow::bail!("Refresh token expired");
        }
        if !bcrypt::verify(refresh_token_str, &stored.token_hash)? {
            anyhow::bail!("Refresh token invalid");
        }

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(jti)
            .execute(pool)
            .await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Self::issue_token_pair(pool, &user, jwt_secret, refresh_secret, access_ttl, refresh_ttl_days)
            .await
    }

    /// Revoke the presented refresh token (logout).
    pub async fn logout(
        pool: &PgPool,
        refresh_token_str: &str,
        refresh_secret: &str,
    ) -> anyhow::Result<()> {
        let key = DecodingKey::from_secret(refresh_secret.as_bytes());
        let data =
            decode::<RefreshClaims>(refresh_token_str, &key, &Validation::new(Algorithm::HS256));

        if let Ok(data) = data {
            let jti: Uuid = data.claims.jti.parse()?;
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
                .bind(jti)
                .execute(pool)
                .await?;
        }

        Ok(())
    }

    pub async fn profile(pool: &PgPool, user_id: Uuid) -> anyhow::Result<UserProfile> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found"))?;
        Ok(user.into())
    }
}

// src/services/identity.rs

//! Identity gateway.
//!
//! User accounts live in an external identity provider. The gateway checks
//! the caller against an [`Authorizer`] before every operation and applies
//! the console's own rules (admins only, no duplicate emails, no deleting
//! yourself) on top of the raw provider calls.
//!
//! ```text
//! Caller ──▶ IdentityGateway ──▶ Authorizer
//!                  │
//!                  └──▶ dyn IdentityProvider ──▶ ClerkProvider (HTTP)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AppError, Result};
use crate::models::{
    AuthorizationPolicy, BackendConfig, Caller, Config, IdentityConfig, NewUser, Role, User,
    UserStatus,
};
use crate::pipeline::RecordSource;
use crate::utils::endpoint;
use crate::utils::http::{create_async_client, error_message};

/// Shown when the caller fails the authorizer.
const ADMIN_REQUIRED: &str = "Admin access required";

/// Returned by [`IdentityGateway::resend_invitation`].
pub const RESEND_GUIDANCE: &str =
    "User should use \"Forgot Password\" on the sign-in page to reset their password.";

// --- Ports ---

/// Filter for a provider user listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub limit: Option<usize>,
    pub email: Option<String>,
    /// Provider ordering, e.g. `-created_at`
    pub order_by: Option<String>,
}

impl UserQuery {
    /// Newest accounts first.
    pub fn newest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            email: None,
            order_by: Some("-created_at".to_string()),
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

/// Raw user-directory operations of an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>>;

    /// Create an account. The provider emails the password setup link.
    async fn create_user(&self, new_user: &NewUser) -> Result<User>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Store `role` in the account's public metadata.
    async fn update_role(&self, user_id: &str, role: Role) -> Result<User>;
}

/// Decides whether a caller may manage users.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, caller: &Caller) -> bool;
}

/// Caller must be signed in and hold `role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAuthorizer {
    role: Role,
}

impl RoleAuthorizer {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }
}

impl Authorizer for RoleAuthorizer {
    fn authorize(&self, caller: &Caller) -> bool {
        caller.is_signed_in() && caller.role == Some(self.role)
    }
}

/// Any signed-in caller is trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignedInAuthorizer;

impl Authorizer for SignedInAuthorizer {
    fn authorize(&self, caller: &Caller) -> bool {
        caller.is_signed_in()
    }
}

/// Build the authorizer selected in config.
pub fn authorizer_for(policy: AuthorizationPolicy) -> Arc<dyn Authorizer> {
    match policy {
        AuthorizationPolicy::AdminRole => Arc::new(RoleAuthorizer::admin()),
        AuthorizationPolicy::SignedIn => {
            log::warn!("Authorization policy 'signed_in' trusts every signed-in caller");
            Arc::new(SignedInAuthorizer)
        }
    }
}

// --- Gateway ---

/// Role-gated user management on top of an [`IdentityProvider`].
#[derive(Clone)]
pub struct IdentityGateway {
    provider: Arc<dyn IdentityProvider>,
    authorizer: Arc<dyn Authorizer>,
    list_limit: usize,
    default_role: Role,
}

impl IdentityGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            provider,
            authorizer,
            list_limit: 100,
            default_role: Role::Admin,
        }
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit.max(1);
        self
    }

    pub fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = role;
        self
    }

    /// Gateway backed by Clerk, as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = ClerkProvider::new(&config.identity, &config.backend)?;
        Ok(Self::new(Arc::new(provider), authorizer_for(config.identity.policy))
            .with_list_limit(config.identity.list_limit)
            .with_default_role(config.identity.default_role))
    }

    /// Role given to invited users who were not assigned one.
    pub fn default_role(&self) -> Role {
        self.default_role
    }

    pub fn is_current_user_admin(&self, caller: &Caller) -> bool {
        self.authorizer.authorize(caller)
    }

    fn require_admin(&self, caller: &Caller, operation: &str) -> Result<()> {
        if self.authorizer.authorize(caller) {
            return Ok(());
        }
        log::warn!(
            "Denied {operation} for {}",
            caller.user_id.as_deref().unwrap_or("anonymous caller")
        );
        Err(AppError::unauthorized(ADMIN_REQUIRED))
    }

    /// Admin accounts, newest first.
    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<User>> {
        self.require_admin(caller, "list users")?;

        let mut users = self
            .provider
            .list_users(&UserQuery::newest(self.list_limit))
            .await?;
        users.retain(|u| u.role == Role::Admin);
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Create an account unless the email is already registered.
    pub async fn create_user(&self, caller: &Caller, new_user: &NewUser) -> Result<User> {
        self.require_admin(caller, "create user")?;

        let existing = self
            .provider
            .list_users(&UserQuery::by_email(&new_user.email))
            .await?;
        if !existing.is_empty() {
            return Err(AppError::DuplicateEmail(new_user.email.clone()));
        }

        let user = self.provider.create_user(new_user).await?;
        log::info!("Created {} account {}", user.role, user.id);
        Ok(user)
    }

    pub async fn delete_user(&self, caller: &Caller, user_id: &str) -> Result<()> {
        self.require_admin(caller, "delete user")?;

        if caller.user_id.as_deref() == Some(user_id) {
            return Err(AppError::SelfDeletion);
        }

        self.provider.delete_user(user_id).await?;
        log::info!("Deleted account {user_id}");
        Ok(())
    }

    pub async fn update_user_role(&self, caller: &Caller, user_id: &str, role: Role) -> Result<User> {
        self.require_admin(caller, "update role")?;

        let user = self.provider.update_role(user_id, role).await?;
        log::info!("Account {user_id} is now {role}");
        Ok(user)
    }

    /// Password setup is only sent on creation; afterwards users reset it
    /// themselves.
    pub async fn resend_invitation(&self, caller: &Caller, email: &str) -> Result<&'static str> {
        self.require_admin(caller, "resend invitation")?;
        log::debug!("Resend requested for {email}");
        Ok(RESEND_GUIDANCE)
    }

    /// A record source listing users on behalf of `caller`.
    pub fn directory(&self, caller: Caller) -> UserDirectory {
        UserDirectory {
            gateway: self.clone(),
            caller,
        }
    }
}

/// Feeds a user list view through the gateway.
#[derive(Clone)]
pub struct UserDirectory {
    gateway: IdentityGateway,
    caller: Caller,
}

impl UserDirectory {
    pub fn gateway(&self) -> &IdentityGateway {
        &self.gateway
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }
}

#[async_trait]
impl RecordSource<User> for UserDirectory {
    async fn fetch(&self, role: Role) -> Result<Vec<User>> {
        let mut users = self.gateway.list_users(&self.caller).await?;
        users.retain(|u| u.role == role);
        Ok(users)
    }
}

// --- Clerk adapter ---

#[derive(Debug, Deserialize)]
struct ClerkEmail {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ClerkPhone {
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<ClerkEmail>,
    #[serde(default)]
    phone_numbers: Vec<ClerkPhone>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    public_metadata: Map<String, Value>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    last_sign_in_at: Option<i64>,
    #[serde(default)]
    image_url: Option<String>,
}

impl ClerkUser {
    fn into_user(self) -> User {
        let first_name = self.first_name.unwrap_or_default();
        let last_name = self.last_name.unwrap_or_default();
        let role = Role::from_metadata(self.public_metadata.get("role").and_then(Value::as_str));

        User {
            email: self
                .email_addresses
                .into_iter()
                .next()
                .map(|e| e.email_address)
                .unwrap_or_default(),
            phone: self.phone_numbers.into_iter().next().map(|p| p.phone_number),
            full_name: User::compose_full_name(&first_name, &last_name),
            first_name,
            last_name,
            role,
            created_at: from_millis(self.created_at),
            last_sign_in_at: self.last_sign_in_at.map(from_millis),
            image_url: self.image_url,
            status: UserStatus::Active,
            id: self.id,
        }
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email_address: [&'a str; 1],
    first_name: &'a str,
    last_name: &'a str,
    public_metadata: Value,
    skip_password_requirement: bool,
    skip_password_checks: bool,
}

/// Clerk Backend API adapter.
#[derive(Debug, Clone)]
pub struct ClerkProvider {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl ClerkProvider {
    pub fn new(identity: &IdentityConfig, backend: &BackendConfig) -> Result<Self> {
        let secret_key = identity
            .secret_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::config("identity.secret_key is not set"))?;

        Ok(Self {
            client: create_async_client(backend)?,
            api_url: identity.api_url.clone(),
            secret_key,
        })
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("{context} failed with status {}", status.as_u16()));
        log::warn!("Identity provider: {context} returned {status}");
        Err(AppError::provider(message))
    }

    async fn read_user(response: Response) -> Result<User> {
        let bytes = response.bytes().await?;
        let user: ClerkUser = serde_json::from_slice(&bytes)?;
        Ok(user.into_user())
    }
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>> {
        let mut url = endpoint(&self.api_url, &["users"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(order_by) = &query.order_by {
                pairs.append_pair("order_by", order_by);
            }
            if let Some(email) = &query.email {
                pairs.append_pair("email_address", email);
            }
        }

        let response = self.send(self.client.get(url), "List users").await?;
        let bytes = response.bytes().await?;
        let users: Vec<ClerkUser> = serde_json::from_slice(&bytes)?;
        Ok(users.into_iter().map(ClerkUser::into_user).collect())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let url = endpoint(&self.api_url, &["users"])?;
        let body = CreateUserBody {
            email_address: [new_user.email.as_str()],
            first_name: &new_user.first_name,
            last_name: &new_user.last_name,
            public_metadata: json!({ "role": new_user.role }),
            skip_password_requirement: true,
            skip_password_checks: true,
        };
        let response = self
            .send(self.client.post(url).json(&body), "Create user")
            .await?;
        Self::read_user(response).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let url = endpoint(&self.api_url, &["users", user_id])?;
        self.send(self.client.delete(url), "Delete user").await?;
        Ok(())
    }

    async fn update_role(&self, user_id: &str, role: Role) -> Result<User> {
        let url = endpoint(&self.api_url, &["users", user_id, "metadata"])?;
        let body = json!({ "public_metadata": { "role": role } });
        let response = self
            .send(self.client.patch(url).json(&body), "Update user role")
            .await?;
        Self::read_user(response).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    pub fn user(id: &str, email: &str, role: Role, created_secs: i64) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            first_name: id.to_string(),
            last_name: String::new(),
            full_name: id.to_string(),
            role,
            phone: None,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            last_sign_in_at: None,
            image_url: None,
            status: UserStatus::Active,
        }
    }

    /// Identity provider backed by a vector.
    #[derive(Default)]
    pub struct MemoryProvider {
        pub users: Mutex<Vec<User>>,
    }

    impl MemoryProvider {
        pub fn with(users: Vec<User>) -> Arc<Self> {
            Arc::new(Self {
                users: Mutex::new(users),
            })
        }

        pub fn ids(&self) -> Vec<String> {
            self.users.lock().unwrap().iter().map(|u| u.id.clone()).collect()
        }
    }

    #[async_trait]
    impl IdentityProvider for MemoryProvider {
        async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>> {
            let users = self.users.lock().unwrap();
            let matched = users
                .iter()
                .filter(|u| query.email.as_deref().is_none_or(|e| u.email == e))
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            Ok(matched)
        }

        async fn create_user(&self, new_user: &NewUser) -> Result<User> {
            let mut users = self.users.lock().unwrap();
            let mut created = user(
                &format!("user_{}", users.len() + 1),
                &new_user.email,
                new_user.role,
                1_700_000_000 + users.len() as i64,
            );
            created.full_name = User::compose_full_name(&new_user.first_name, &new_user.last_name);
            users.push(created.clone());
            Ok(created)
        }

        async fn delete_user(&self, user_id: &str) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            let before = users.len();
            users.retain(|u| u.id != user_id);
            if users.len() == before {
                return Err(AppError::provider("User not found"));
            }
            Ok(())
        }

        async fn update_role(&self, user_id: &str, role: Role) -> Result<User> {
            let mut users = self.users.lock().unwrap();
            let target = users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or_else(|| AppError::provider("User not found"))?;
            target.role = role;
            Ok(target.clone())
        }
    }

    pub fn admin() -> Caller {
        Caller::signed_in("user_admin", Role::Admin)
    }

    fn gateway(provider: Arc<MemoryProvider>) -> IdentityGateway {
        IdentityGateway::new(provider, Arc::new(RoleAuthorizer::admin()))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_role_authorizer() {
        let auth = RoleAuthorizer::admin();
        assert!(auth.authorize(&admin()));
        assert!(!auth.authorize(&Caller::signed_in("u", Role::Moderator)));
        assert!(!auth.authorize(&Caller::anonymous()));
        assert!(!auth.authorize(&Caller {
            user_id: None,
            role: Some(Role::Admin),
        }));
    }

    #[test]
    fn test_signed_in_authorizer() {
        assert!(SignedInAuthorizer.authorize(&Caller::signed_in("u", Role::User)));
        assert!(!SignedInAuthorizer.authorize(&Caller::anonymous()));
    }

    #[tokio::test]
    async fn test_list_users_admins_newest_first() {
        let provider = MemoryProvider::with(vec![
            user("old", "old@x.com", Role::Admin, 100),
            user("mod", "mod@x.com", Role::Moderator, 300),
            user("new", "new@x.com", Role::Admin, 200),
        ]);
        let users = gateway(provider).list_users(&admin()).await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let provider = MemoryProvider::with(vec![user("a", "a@x.com", Role::Admin, 1)]);
        let gateway = gateway(provider.clone());

        let err = gateway
            .create_user(&admin(), &new_user("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(ref e) if e == "a@x.com"));
        assert_eq!(provider.ids(), vec!["a"]);

        let created = gateway
            .create_user(&admin(), &new_user("b@x.com"))
            .await
            .unwrap();
        assert_eq!(created.full_name, "Grace Hopper");
        assert_eq!(provider.ids().len(), 2);
    }

    #[tokio::test]
    async fn test_self_deletion_is_rejected() {
        let provider = MemoryProvider::with(vec![
            user("user_admin", "me@x.com", Role::Admin, 1),
            user("other", "o@x.com", Role::Admin, 2),
        ]);
        let gateway = gateway(provider.clone());

        let err = gateway.delete_user(&admin(), "user_admin").await.unwrap_err();
        assert!(matches!(err, AppError::SelfDeletion));
        assert_eq!(provider.ids(), vec!["user_admin", "other"]);

        gateway.delete_user(&admin(), "other").await.unwrap();
        assert_eq!(provider.ids(), vec!["user_admin"]);
    }

    #[tokio::test]
    async fn test_denied_caller_is_unauthorized() {
        let provider = MemoryProvider::with(vec![user("a", "a@x.com", Role::Admin, 1)]);
        let gateway = gateway(provider.clone());
        let caller = Caller::signed_in("u", Role::User);

        assert!(!gateway.is_current_user_admin(&caller));
        assert!(matches!(
            gateway.list_users(&caller).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            gateway.delete_user(&caller, "a").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            gateway.update_user_role(&caller, "a", Role::User).await,
            Err(AppError::Unauthorized(_))
        ));
        assert_eq!(provider.ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_update_role_and_resend() {
        let provider = MemoryProvider::with(vec![user("a", "a@x.com", Role::Admin, 1)]);
        let gateway = gateway(provider);

        let updated = gateway
            .update_user_role(&admin(), "a", Role::Moderator)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Moderator);
        assert!(gateway.list_users(&admin()).await.unwrap().is_empty());

        let message = gateway.resend_invitation(&admin(), "a@x.com").await.unwrap();
        assert_eq!(message, RESEND_GUIDANCE);
    }

    #[test]
    fn test_clerk_user_mapping() {
        let raw: ClerkUser = serde_json::from_value(json!({
            "id": "user_2a",
            "email_addresses": [{"id": "idn_1", "email_address": "ada@x.com"}],
            "phone_numbers": [],
            "first_name": "Ada",
            "last_name": null,
            "public_metadata": {"role": "moderator"},
            "created_at": 1_700_000_000_000_i64,
            "last_sign_in_at": null,
            "image_url": "https://img.example.com/a.png"
        }))
        .unwrap();

        let user = raw.into_user();
        assert_eq!(user.email, "ada@x.com");
        assert_eq!(user.full_name, "Ada");
        assert_eq!(user.role, Role::Moderator);
        assert_eq!(user.created_at.timestamp(), 1_700_000_000);
        assert!(user.last_sign_in_at.is_none());
        assert!(user.phone.is_none());
    }

    #[test]
    fn test_clerk_user_without_metadata_is_plain_user() {
        let raw: ClerkUser = serde_json::from_value(json!({"id": "user_3"})).unwrap();
        let user = raw.into_user();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.full_name, "N/A");
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_clerk_provider_requires_secret() {
        let identity = IdentityConfig::default();
        assert!(matches!(
            ClerkProvider::new(&identity, &BackendConfig::default()),
            Err(AppError::Config(_))
        ));

        let identity = IdentityConfig {
            secret_key: Some("sk_test_123".into()),
            ..IdentityConfig::default()
        };
        assert!(ClerkProvider::new(&identity, &BackendConfig::default()).is_ok());
    }

    #[test]
    fn test_create_body_shape() {
        let body = serde_json::to_value(CreateUserBody {
            email_address: ["a@x.com"],
            first_name: "A",
            last_name: "B",
            public_metadata: json!({"role": Role::Admin}),
            skip_password_requirement: true,
            skip_password_checks: true,
        })
        .unwrap();
        assert_eq!(body["email_address"], json!(["a@x.com"]));
        assert_eq!(body["public_metadata"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_directory_feeds_list_view() {
        let provider = MemoryProvider::with(vec![user("a", "a@x.com", Role::Admin, 1)]);
        let directory = gateway(provider).directory(admin());
        let users = directory.fetch(Role::Admin).await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(directory.fetch(Role::User).await.unwrap().is_empty());
    }
}

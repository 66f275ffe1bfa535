// 🛡️ Authentication & Seller Accounts
//
// Three ways in: admin by PIN, seller by name + password, buyer by name only
// (buyers get no list access without a search term, see view.rs). Successful
// logins persist the session through the injected SessionStore.
//
// Passwords are stored as SHA-256 digests. The system this replaces kept
// them in plaintext; that was a defect, not a contract.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::items::ADMIN_PIN;
use crate::session::{Role, Session, SessionStore};
use crate::store::SellerStore;

// ============================================================================
// SELLER ACCOUNT
// ============================================================================

/// Seller account document. The id is derived from the display name so the
/// same shop name always maps to the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerAccount {
    /// Normalized display name (see seller_id_from_name)
    pub id: String,
    pub display_name: String,
    /// SHA-256 hex digest of the password
    pub password_digest: String,
    /// Role tag, always "seller" for accounts created here
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Deterministic account id: trim, lowercase, non-[a-z0-9_] → underscore.
///
/// "Kath's Shop" → "kath_s_shop"
pub fn seller_id_from_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// SHA-256 hex digest of a password
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// AUTH ERRORS
// ============================================================================

/// User-facing authentication failures. Account-not-found is deliberately
/// distinct from wrong-password so the UI can point the user at the admin
/// instead of a password reset.
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    IncorrectPin,
    IncorrectPassword,
    AccountNotFound,
    DuplicateAccount(String),
    Store(anyhow::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Please enter name and password"),
            AuthError::IncorrectPin => write!(f, "Incorrect Admin PIN"),
            AuthError::IncorrectPassword => write!(f, "Incorrect password"),
            AuthError::AccountNotFound => write!(
                f,
                "Account not found. Please ask Admin to create your account."
            ),
            AuthError::DuplicateAccount(name) => {
                write!(f, "A seller with this name (or similar) already exists: {}", name)
            }
            AuthError::Store(err) => write!(f, "Store error: {}", err),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Store(err)
    }
}

// ============================================================================
// AUTH SERVICE
// ============================================================================

/// Login and account management over injected collaborators
pub struct AuthService<'a> {
    sellers: &'a dyn SellerStore,
    sessions: &'a dyn SessionStore,
    admin_pin: String,
}

impl<'a> AuthService<'a> {
    pub fn new(sellers: &'a dyn SellerStore, sessions: &'a dyn SessionStore) -> Self {
        AuthService {
            sellers,
            sessions,
            admin_pin: ADMIN_PIN.to_string(),
        }
    }

    /// Override the PIN (tests, alternate deployments)
    pub fn with_pin(mut self, pin: &str) -> Self {
        self.admin_pin = pin.to_string();
        self
    }

    // ------------------------------------------------------------------------
    // LOGIN
    // ------------------------------------------------------------------------

    pub fn login_admin(&self, pin: &str) -> Result<Session, AuthError> {
        if pin != self.admin_pin {
            return Err(AuthError::IncorrectPin);
        }
        self.complete_login(Role::Admin, "Administrator")
    }

    pub fn login_seller(&self, name: &str, password: &str) -> Result<Session, AuthError> {
        if name.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let id = seller_id_from_name(name);
        let account = self
            .sellers
            .get_seller(&id)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::AccountNotFound)?;

        if account.password_digest != hash_password(password) {
            return Err(AuthError::IncorrectPassword);
        }

        self.complete_login(Role::Seller, &account.display_name)
    }

    /// Buyers only need a name; list access is gated by search in the view
    pub fn login_buyer(&self, name: &str) -> Result<Session, AuthError> {
        if name.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        self.complete_login(Role::Buyer, name.trim())
    }

    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()
    }

    fn complete_login(&self, role: Role, name: &str) -> Result<Session, AuthError> {
        let session = Session::new(role, name);
        self.sessions.save(&session).map_err(AuthError::Store)?;
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // ACCOUNT MANAGEMENT (admin)
    // ------------------------------------------------------------------------

    /// Create a seller account; rejects a colliding normalized id
    pub fn create_seller(&self, name: &str, password: &str) -> Result<SellerAccount, AuthError> {
        if name.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let id = seller_id_from_name(name);
        if self.sellers.get_seller(&id).map_err(AuthError::Store)?.is_some() {
            return Err(AuthError::DuplicateAccount(name.trim().to_string()));
        }

        let account = SellerAccount {
            id,
            display_name: name.trim().to_string(),
            password_digest: hash_password(password),
            role: "seller".to_string(),
            created_at: Utc::now(),
        };
        self.sellers
            .create_seller(&account)
            .map_err(AuthError::Store)?;
        Ok(account)
    }

    pub fn reset_password(&self, seller_id: &str, new_password: &str) -> Result<(), AuthError> {
        if new_password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        self.sellers
            .update_password(seller_id, &hash_password(new_password))
            .map_err(AuthError::Store)
    }

    /// PIN-gated destructive action: remove a seller account
    pub fn delete_seller(&self, seller_id: &str, pin: &str) -> Result<(), AuthError> {
        if pin != self.admin_pin {
            return Err(AuthError::IncorrectPin);
        }
        self.sellers
            .delete_seller(seller_id)
            .map_err(AuthError::Store)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use crate::store::SqliteStore;

    #[test]
    fn test_seller_id_normalization() {
        assert_eq!(seller_id_from_name("Kath's Shop"), "kath_s_shop");
        assert_eq!(seller_id_from_name("  Shop 24  "), "shop_24");
        assert_eq!(seller_id_from_name("already_safe_1"), "already_safe_1");
    }

    #[test]
    fn test_admin_login_pin_gate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        assert!(matches!(
            auth.login_admin("000000"),
            Err(AuthError::IncorrectPin)
        ));

        let session = auth.login_admin(ADMIN_PIN).unwrap();
        assert_eq!(session.role, Role::Admin);
        // Session was persisted
        assert_eq!(sessions.load().unwrap(), Some(session));
    }

    #[test]
    fn test_seller_login_not_found_vs_wrong_password() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.create_seller("Kath Shop", "secret").unwrap();

        assert!(matches!(
            auth.login_seller("Ghost Shop", "whatever"),
            Err(AuthError::AccountNotFound)
        ));
        assert!(matches!(
            auth.login_seller("Kath Shop", "wrong"),
            Err(AuthError::IncorrectPassword)
        ));

        let session = auth.login_seller("Kath Shop", "secret").unwrap();
        assert_eq!(session.role, Role::Seller);
        assert_eq!(session.display_name, "Kath Shop");
    }

    #[test]
    fn test_create_seller_rejects_duplicate_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.create_seller("Kath Shop", "secret").unwrap();
        // Different display string, same normalized id
        assert!(matches!(
            auth.create_seller("kath shop", "other"),
            Err(AuthError::DuplicateAccount(_))
        ));
    }

    #[test]
    fn test_passwords_stored_as_digests() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.create_seller("Kath Shop", "secret").unwrap();
        let account = store.get_seller("kath_shop").unwrap().unwrap();
        assert_ne!(account.password_digest, "secret");
        assert_eq!(account.password_digest, hash_password("secret"));
    }

    #[test]
    fn test_reset_password_and_login() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.create_seller("Kath Shop", "secret").unwrap();
        auth.reset_password("kath_shop", "newpass").unwrap();

        assert!(matches!(
            auth.login_seller("Kath Shop", "secret"),
            Err(AuthError::IncorrectPassword)
        ));
        assert!(auth.login_seller("Kath Shop", "newpass").is_ok());
    }

    #[test]
    fn test_delete_seller_requires_pin() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.create_seller("Kath Shop", "secret").unwrap();

        assert!(matches!(
            auth.delete_seller("kath_shop", "badpin"),
            Err(AuthError::IncorrectPin)
        ));
        assert!(store.get_seller("kath_shop").unwrap().is_some());

        auth.delete_seller("kath_shop", ADMIN_PIN).unwrap();
        assert!(store.get_seller("kath_shop").unwrap().is_none());
    }

    #[test]
    fn test_buyer_login_needs_a_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        assert!(matches!(
            auth.login_buyer("   "),
            Err(AuthError::MissingCredentials)
        ));

        let session = auth.login_buyer("Maria Cruz").unwrap();
        assert_eq!(session.role, Role::Buyer);
        assert_eq!(session.display_name, "Maria Cruz");
    }

    #[test]
    fn test_logout_clears_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sessions = MemorySessionStore::new();
        let auth = AuthService::new(&store, &sessions);

        auth.login_admin(ADMIN_PIN).unwrap();
        auth.logout().unwrap();
        assert!(sessions.load().unwrap().is_none());
    }
}

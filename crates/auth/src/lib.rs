//! fluesterpost-auth – Registrierung, Login und Session-Verwaltung
//!
//! Bei der Registrierung wird neben dem Argon2id-Passwort-Hash das
//! RSA-Schluesselpaar des Benutzers ausgestellt. Schlaegt die
//! Schluessel-Erzeugung fehl, entsteht kein Konto – ein Benutzer ohne
//! gueltiges Schluesselpaar kann keine Umschlaege empfangen.

pub mod error;
pub mod password;
pub mod service;
pub mod session;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use service::AuthService;
pub use session::{Session, SessionStore};

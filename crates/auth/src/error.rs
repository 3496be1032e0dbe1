//! Fehlertypen fuer den Auth-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Service
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Passwort ---
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),

    // --- Authentifizierung ---
    #[error("Benutzername oder Passwort falsch")]
    UngueltigeAnmeldedaten,

    #[error("Benutzer gesperrt")]
    BenutzerGesperrt,

    // --- Session ---
    #[error("Session nicht gefunden oder abgelaufen")]
    SessionUngueltig,

    #[error("Session abgelaufen")]
    SessionAbgelaufen,

    // --- Benutzerverwaltung ---
    #[error("Benutzername bereits vergeben: {0}")]
    BenutzernameVergeben(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    // --- Schluessel ---
    /// Fatal: ohne Schluesselpaar darf kein Konto entstehen
    #[error("Schluesselpaar-Erzeugung fehlgeschlagen: {0}")]
    SchluesselErzeugung(#[from] fluesterpost_crypto::KryptoError),

    // --- Speicher ---
    #[error("Speicherfehler: {0}")]
    Speicher(#[from] fluesterpost_store::SpeicherError),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

impl From<AuthError> for fluesterpost_core::FluesterpostError {
    fn from(e: AuthError) -> Self {
        use fluesterpost_core::FluesterpostError as F;
        match e {
            AuthError::UngueltigeAnmeldedaten
            | AuthError::SessionUngueltig
            | AuthError::SessionAbgelaufen => F::Authentifizierung(e.to_string()),
            AuthError::BenutzerGesperrt => F::ZugriffVerweigert(e.to_string()),
            AuthError::BenutzernameVergeben(_) => F::UngueltigeNachricht(e.to_string()),
            AuthError::BenutzerNichtGefunden(name) => F::BenutzerNichtGefunden(name),
            AuthError::SchluesselErzeugung(k) => F::Krypto(k.to_string()),
            AuthError::Speicher(s) => F::Speicher(s.to_string()),
            AuthError::PasswortHashing(m) | AuthError::Intern(m) => F::Intern(m),
        }
    }
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;

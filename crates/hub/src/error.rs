//! Fehlertypen des Hubs

use fluesterpost_crypto::KryptoError;
use fluesterpost_store::SpeicherError;
use thiserror::Error;

/// Fehler bei Hub-Operationen
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Sitzung nicht gefunden: {0}")]
    SitzungNichtGefunden(String),

    #[error("Benutzer {benutzer} ist kein aktiver Teilnehmer der Sitzung {sitzung}")]
    NichtTeilnehmer { sitzung: String, benutzer: String },

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Verbindung ist dem Hub nicht bekannt")]
    NichtVerbunden,

    #[error("Hub wurde bereits abgebaut")]
    HubGeschlossen,

    #[error("Kryptografie-Fehler: {0}")]
    Krypto(#[from] KryptoError),

    #[error("Speicherfehler: {0}")]
    Speicher(#[from] SpeicherError),

    #[error("Interner Hub-Fehler: {0}")]
    Intern(String),
}

impl From<HubError> for fluesterpost_core::FluesterpostError {
    fn from(e: HubError) -> Self {
        use fluesterpost_core::FluesterpostError as F;
        match e {
            HubError::SitzungNichtGefunden(id) => F::SitzungNichtGefunden(id),
            HubError::NichtTeilnehmer { .. } => F::ZugriffVerweigert(e.to_string()),
            HubError::BenutzerNichtGefunden(name) => F::BenutzerNichtGefunden(name),
            HubError::NichtVerbunden | HubError::HubGeschlossen => F::Getrennt(e.to_string()),
            HubError::Krypto(k) => F::Krypto(k.to_string()),
            HubError::Speicher(s) => F::Speicher(s.to_string()),
            HubError::Intern(m) => F::Intern(m),
        }
    }
}

/// Result-Typ fuer Hub-Operationen
pub type HubResult<T> = Result<T, HubError>;

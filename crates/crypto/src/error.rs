//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum KryptoError {
    /// Entropie-/Erzeugungsfehler – fatal, niemals still wiederholen
    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),

    /// Oeffentlicher oder privater Schluessel nicht parsebar
    #[error("Ungueltiger Schluessel fuer '{identitaet}': {grund}")]
    UngueltigerSchluessel { identitaet: String, grund: String },

    /// Empfaenger war nicht Teil der urspruenglichen Verschluesselung
    #[error("Kein eingepackter Schluessel fuer '{0}' im Umschlag")]
    SchluesselNichtGefunden(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    /// Nachricht fuer diese Identitaet nicht wiederherstellbar
    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    /// Leere Empfaengermenge – ein Umschlag ohne Empfaenger ist sinnlos
    #[error("Empfaengermenge darf nicht leer sein")]
    KeineEmpfaenger,

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type KryptoResult<T> = Result<T, KryptoError>;

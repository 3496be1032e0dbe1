//! Fehlertypen fuer die Sitzungsverwaltung

use fluesterpost_store::SpeicherError;
use thiserror::Error;

/// Fehler bei Sitzungs- und Historien-Operationen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Sitzung nicht gefunden: {0}")]
    SitzungNichtGefunden(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Benutzer {benutzer} ist kein aktiver Teilnehmer der Sitzung {sitzung}")]
    KeinTeilnehmer { sitzung: String, benutzer: String },

    #[error("Eine Sitzung braucht neben dem Ersteller mindestens einen Teilnehmer")]
    KeineTeilnehmer,

    #[error("Speicherfehler: {0}")]
    Speicher(#[from] SpeicherError),

    #[error("Interner Chat-Fehler: {0}")]
    Intern(String),
}

impl From<ChatError> for fluesterpost_core::FluesterpostError {
    fn from(e: ChatError) -> Self {
        use fluesterpost_core::FluesterpostError as F;
        match e {
            ChatError::SitzungNichtGefunden(id) => F::SitzungNichtGefunden(id),
            ChatError::BenutzerNichtGefunden(name) => F::BenutzerNichtGefunden(name),
            ChatError::KeinTeilnehmer { .. } => F::ZugriffVerweigert(e.to_string()),
            ChatError::KeineTeilnehmer => F::UngueltigeNachricht(e.to_string()),
            ChatError::Speicher(s) => F::Speicher(s.to_string()),
            ChatError::Intern(m) => F::Intern(m),
        }
    }
}

/// Result-Typ fuer Chat-Operationen
pub type ChatResult<T> = Result<T, ChatError>;

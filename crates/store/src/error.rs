//! Fehlertypen fuer das Speicher-Crate

use thiserror::Error;

/// Speicher-Fehlertypen
#[derive(Debug, Error)]
pub enum SpeicherError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Interner Speicher-Fehler: {0}")]
    Intern(String),
}

impl SpeicherError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

pub type SpeicherResult<T> = Result<T, SpeicherError>;

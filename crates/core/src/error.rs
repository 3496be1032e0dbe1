//! Fehlertypen fuer Fluesterpost
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Fluesterpost
pub type Result<T> = std::result::Result<T, FluesterpostError>;

/// Alle moeglichen Fehler im Fluesterpost-System
#[derive(Debug, Error)]
pub enum FluesterpostError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Authentifizierung & Autorisierung ---
    #[error("Authentifizierung fehlgeschlagen: {0}")]
    Authentifizierung(String),

    #[error("Zugriff verweigert: {0}")]
    ZugriffVerweigert(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Ressourcen ---
    #[error("Sitzung nicht gefunden: {0}")]
    SitzungNichtGefunden(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    // --- Kryptografie ---
    #[error("Kryptografie-Fehler: {0}")]
    Krypto(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Speicher ---
    #[error("Speicherfehler: {0}")]
    Speicher(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FluesterpostError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = FluesterpostError::Authentifizierung("Token abgelaufen".into());
        assert_eq!(
            e.to_string(),
            "Authentifizierung fehlgeschlagen: Token abgelaufen"
        );
    }

    #[test]
    fn intern_hilfsfunktion() {
        let e = FluesterpostError::intern("kaputt");
        assert!(matches!(e, FluesterpostError::Intern(_)));
    }
}

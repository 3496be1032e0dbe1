//! Speichermodelle fuer Fluesterpost
//!
//! Diese Typen repraesentieren Datensaetze aus dem Speicher.
//! Sie sind von den Domain-Typen getrennt und dienen als reine
//! Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use fluesterpost_core::types::{NachrichtId, SitzungsId, UserId};
use fluesterpost_crypto::Umschlag;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    /// Oeffentlicher Schluessel (SPKI-PEM), bei Registrierung ausgestellt
    pub public_key: String,
    /// Privater Schluessel (PKCS#8-PEM), serverseitig mitgefuehrt
    ///
    /// Kompatibilitaets-Altlast: Bestandsclients erwarten den privaten
    /// Schluessel in der Registrierungs-/Login-Antwort. Echte Ende-zu-Ende-
    /// Vertraulichkeit erfordert, dass dieses Feld leer bleibt und der
    /// Schluessel das Client-Geraet nie verlaesst.
    pub private_key: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub public_key: &'a str,
    pub private_key: &'a str,
}

// ---------------------------------------------------------------------------
// Chat-Sitzungen
// ---------------------------------------------------------------------------

/// Chat-Sitzungs-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitzungsRecord {
    pub id: SitzungsId,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Teilnehmer-Datensatz
///
/// Pro (Sitzung, Benutzer) existiert hoechstens ein Datensatz.
/// `is_active = false` bedeutet weich entfernt: bereits ausgestellte
/// Schluesselkopien bleiben in der Historie sichtbar, aber der Benutzer
/// erhaelt keine neuen Umschlaege mehr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeilnehmerRecord {
    pub sitzungs_id: SitzungsId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Aktiver Teilnehmer mit oeffentlichem Schluessel
///
/// Die Sicht, die der Hub fuer die Empfaengermenge eines Umschlags braucht.
#[derive(Debug, Clone)]
pub struct AktiverTeilnehmer {
    pub user_id: UserId,
    pub username: String,
    pub public_key: String,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Datensatz
///
/// Unveraenderlich nach dem Anlegen – Nachrichten werden nur angehaengt,
/// nie aktualisiert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: NachrichtId,
    pub sitzungs_id: SitzungsId,
    pub sender_id: UserId,
    pub umschlag: Umschlag,
    pub timestamp: DateTime<Utc>,
}

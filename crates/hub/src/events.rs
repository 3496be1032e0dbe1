//! Draht-Events – das JSON-Format auf der Leitung
//!
//! Alle Events tragen ein `type`-Feld. Das `message`-Event ist pro
//! Verbindung redigiert: `encryption_key` enthaelt genau die
//! Schluesselkopie des Empfaengers, dem das Event zugestellt wird.

use chrono::{DateTime, Utc};
use fluesterpost_core::types::NachrichtId;
use serde::{Deserialize, Serialize};

/// Ereignis auf der Leitung, JSON-serialisiert mit `type`-Tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrahtEvent {
    /// Eine neue Chat-Nachricht, redigiert fuer genau einen Empfaenger
    Message {
        message_id: NachrichtId,
        sender_username: String,
        /// AES-Chiffrat, Base64-kodiert
        content: String,
        /// RSA-umhuellte Schluesselkopie des Empfaengers, Base64-kodiert
        encryption_key: String,
        /// Initialisierungsvektor, Base64-kodiert
        iv: String,
        timestamp: DateTime<Utc>,
    },

    /// Tipp-Statusaenderung eines Teilnehmers
    Typing { username: String, is_typing: bool },

    /// Ein Teilnehmer hat die Live-Sitzung betreten
    UserJoin { username: String },

    /// Ein Teilnehmer hat die Live-Sitzung verlassen
    UserLeave { username: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Client-Protokoll – JSON-Zeilen ueber TCP
//!
//! Jede Zeile ist ein JSON-Objekt mit `type`-Feld. Eingehend sind es
//! `ClientBefehl`e, ausgehend `ServerAntwort`en oder – nach dem Join –
//! direkt die `DrahtEvent`s des Hubs.

use chrono::{DateTime, Utc};
use fluesterpost_chat::NachrichtAnsicht;
use fluesterpost_core::types::{NachrichtId, SitzungsId, UserId};
use serde::{Deserialize, Serialize};

/// Eingehender Befehl eines Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientBefehl {
    /// Neues Konto anlegen
    Register { username: String, password: String },

    /// Anmelden mit Benutzername und Passwort
    Login { username: String, password: String },

    /// Bestehende Session per Token fortsetzen
    Auth { token: String },

    /// Abmelden und Session invalidieren
    Logout,

    /// Neue Chat-Sitzung anlegen, der Ersteller ist immer dabei
    SessionCreate { participants: Vec<String> },

    /// Eigene Sitzungen auflisten
    SessionList,

    /// Nachrichtenhistorie einer Sitzung abrufen
    SessionHistory { session_id: SitzungsId },

    /// Teilnehmer zu einer Sitzung einladen
    ParticipantAdd {
        session_id: SitzungsId,
        username: String,
    },

    /// Teilnehmer weich aus einer Sitzung entfernen
    ParticipantRemove {
        session_id: SitzungsId,
        username: String,
    },

    /// Live-Sitzung betreten
    Join { session_id: SitzungsId },

    /// Nachricht in die aktuelle Live-Sitzung senden (Klartext,
    /// Verschluesselung passiert serverseitig pro Empfaenger)
    Message { content: String },

    /// Tipp-Status in der aktuellen Live-Sitzung melden
    Typing { is_typing: bool },
}

/// Eintrag in der Sitzungsliste
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitzungsEintrag {
    pub session_id: SitzungsId,
    pub created_at: DateTime<Utc>,
}

/// Ausgehende Antwort des Servers
///
/// `private_key` in den Auth-Antworten ist eine Kompatibilitaets-Altlast,
/// siehe `BenutzerRecord` im Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerAntwort {
    Willkommen {
        server_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        nachricht: Option<String>,
    },
    Registered {
        user_id: UserId,
        username: String,
        public_key: String,
        private_key: String,
    },
    LoggedIn {
        token: String,
        user_id: UserId,
        username: String,
        public_key: String,
        private_key: String,
    },
    Authenticated {
        user_id: UserId,
        username: String,
    },
    LoggedOut,
    SessionCreated {
        session_id: SitzungsId,
    },
    Sessions {
        sessions: Vec<SitzungsEintrag>,
    },
    History {
        session_id: SitzungsId,
        messages: Vec<NachrichtAnsicht>,
    },
    ParticipantAdded {
        session_id: SitzungsId,
        username: String,
    },
    ParticipantRemoved {
        session_id: SitzungsId,
        username: String,
        removed: bool,
    },
    Joined {
        session_id: SitzungsId,
        username: String,
    },
    MessageSent {
        message_id: NachrichtId,
    },
    Error {
        message: String,
    },
}

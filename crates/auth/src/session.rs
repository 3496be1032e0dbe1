//! Session-Management
//!
//! Kurzlebige Session-Tokens fuer eingeloggte Benutzer, im Speicher
//! gehalten (HashMap mit TTL). Ein Hintergrund-Task bereinigt
//! abgelaufene Sessions automatisch.

use std::{collections::HashMap, sync::Arc, time::Duration};

use base64::prelude::*;
use chrono::{DateTime, Utc};
use fluesterpost_core::types::UserId;
use rand::RngCore;
use tokio::sync::RwLock;

use crate::error::{AuthError, AuthResult};

/// Standard-Session-Lebensdauer: 24 Stunden
const SESSION_TTL_SEKUNDEN: i64 = 24 * 60 * 60;

/// Intervall fuer den automatischen Cleanup-Task: 15 Minuten
const CLEANUP_INTERVALL: Duration = Duration::from_secs(15 * 60);

/// Ein aktives Session-Token
#[derive(Debug, Clone)]
pub struct Session {
    /// Der Token-String (URL-sicheres Base64)
    pub token: String,
    /// ID des Benutzers dem diese Session gehoert
    pub user_id: UserId,
    /// Zeitpunkt der Session-Erstellung
    pub erstellt_am: DateTime<Utc>,
    /// Zeitpunkt des Session-Ablaufs
    pub laeuft_ab_am: DateTime<Utc>,
}

impl Session {
    /// Gibt `true` zurueck wenn die Session noch gueltig ist
    pub fn ist_gueltig(&self) -> bool {
        Utc::now() < self.laeuft_ab_am
    }
}

/// In-Memory Session-Store mit TTL-Unterstuetzung
#[derive(Debug, Default)]
pub struct SessionStore {
    /// token -> Session
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Erstellt einen neuen leeren Session-Store
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Startet den Cleanup-Task fuer den uebergebenen Store
    pub fn mit_cleanup(store: Arc<Self>) -> Arc<Self> {
        let store_klon = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVALL).await;
                let entfernt = store_klon.cleanup_abgelaufene().await;
                if entfernt > 0 {
                    tracing::debug!(anzahl = entfernt, "Abgelaufene Sessions bereinigt");
                }
            }
        });
        store
    }

    /// Erstellt eine neue Session fuer den angegebenen Benutzer
    pub async fn erstellen(&self, user_id: UserId) -> AuthResult<Session> {
        let token = token_generieren();
        let jetzt = Utc::now();
        let session = Session {
            token: token.clone(),
            user_id,
            erstellt_am: jetzt,
            laeuft_ab_am: jetzt + chrono::Duration::seconds(SESSION_TTL_SEKUNDEN),
        };

        self.sessions.write().await.insert(token, session.clone());
        tracing::debug!(user_id = %user_id, "Neue Session erstellt");
        Ok(session)
    }

    /// Validiert einen Session-Token und gibt die Session zurueck
    pub async fn validieren(&self, token: &str) -> AuthResult<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            None => Err(AuthError::SessionUngueltig),
            Some(session) if !session.ist_gueltig() => Err(AuthError::SessionAbgelaufen),
            Some(session) => Ok(session.clone()),
        }
    }

    /// Invalidiert eine Session (Abmeldung)
    ///
    /// Idempotent – ein unbekannter Token ist kein Fehler.
    pub async fn invalidieren(&self, token: &str) -> AuthResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    /// Entfernt alle abgelaufenen Sessions und gibt deren Anzahl zurueck
    pub async fn cleanup_abgelaufene(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, s| s.ist_gueltig());
        vorher - sessions.len()
    }

    /// Gibt die Anzahl der aktiven Sessions zurueck
    pub async fn anzahl(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generiert einen 32-Byte-Zufallstoken als URL-sicheres Base64
fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_lebenszyklus() {
        let store = SessionStore::neu();
        let uid = UserId::new();

        let session = store.erstellen(uid).await.unwrap();
        assert!(session.ist_gueltig());

        let validiert = store.validieren(&session.token).await.unwrap();
        assert_eq!(validiert.user_id, uid);

        store.invalidieren(&session.token).await.unwrap();
        let ergebnis = store.validieren(&session.token).await;
        assert!(matches!(ergebnis, Err(AuthError::SessionUngueltig)));
    }

    #[tokio::test]
    async fn unbekannter_token_wird_abgelehnt() {
        let store = SessionStore::neu();
        let ergebnis = store.validieren("gibt-es-nicht").await;
        assert!(matches!(ergebnis, Err(AuthError::SessionUngueltig)));
    }

    #[tokio::test]
    async fn invalidieren_ist_idempotent() {
        let store = SessionStore::neu();
        store.invalidieren("gibt-es-nicht").await.unwrap();
        store.invalidieren("gibt-es-nicht").await.unwrap();
    }

    #[test]
    fn tokens_sind_eindeutig() {
        let a = token_generieren();
        let b = token_generieren();
        assert_ne!(a, b);
        assert!(a.len() >= 40, "32 Bytes Base64 ohne Padding");
    }
}

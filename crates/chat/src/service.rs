//! Sitzungs-Service – Anlegen, Teilnehmerpflege, Historie
//!
//! Arbeitet ausschliesslich ueber die Repository-Traits. Nachrichten
//! werden hier nie entschluesselt: die Historie liefert Base64-Chiffrate
//! plus genau die Schluesselkopie, die fuer den anfragenden Benutzer
//! ausgestellt wurde.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::{DateTime, Utc};
use fluesterpost_core::types::{NachrichtId, SitzungsId, UserId};
use fluesterpost_store::{
    BenutzerRecord, BenutzerRepository, NachrichtenRepository, SitzungsRecord, SitzungsRepository,
};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};

/// Eine Nachricht aus Sicht eines bestimmten Empfaengers
///
/// `encryption_key` enthaelt ausschliesslich die Schluesselkopie des
/// anfragenden Benutzers. Die vollstaendige Empfaengertabelle verlaesst
/// den Speicher nie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtAnsicht {
    pub message_id: NachrichtId,
    pub sender_username: String,
    /// AES-Chiffrat, Base64-kodiert
    pub content: String,
    /// RSA-umhuellte Schluesselkopie des Anfragenden, Base64-kodiert
    pub encryption_key: String,
    /// Initialisierungsvektor, Base64-kodiert
    pub iv: String,
    pub timestamp: DateTime<Utc>,
}

/// Sitzungs-Service ueber den Repository-Traits
pub struct SitzungsService<S> {
    speicher: Arc<S>,
}

impl<S> SitzungsService<S>
where
    S: BenutzerRepository + SitzungsRepository + NachrichtenRepository,
{
    /// Erstellt einen neuen SitzungsService
    pub fn neu(speicher: Arc<S>) -> Self {
        Self { speicher }
    }

    /// Legt eine neue Chat-Sitzung an
    ///
    /// Der Ersteller ist immer Teilnehmer, unabhaengig davon ob er in
    /// `teilnehmer_namen` auftaucht. Eine leere Teilnehmerliste und
    /// unbekannte Benutzernamen brechen das Anlegen ab bevor die Sitzung
    /// entsteht.
    pub async fn sitzung_erstellen(
        &self,
        ersteller: UserId,
        teilnehmer_namen: &[String],
    ) -> ChatResult<SitzungsRecord> {
        if teilnehmer_namen.is_empty() {
            return Err(ChatError::KeineTeilnehmer);
        }

        // Alle Namen vorab aufloesen, damit keine halb angelegte Sitzung entsteht
        let mut weitere: Vec<BenutzerRecord> = Vec::with_capacity(teilnehmer_namen.len());
        for name in teilnehmer_namen {
            let benutzer = self
                .speicher
                .benutzer_nach_name(name)
                .await?
                .ok_or_else(|| ChatError::BenutzerNichtGefunden(name.clone()))?;
            weitere.push(benutzer);
        }

        let sitzung = self.speicher.sitzung_erstellen().await?;

        self.speicher
            .teilnehmer_hinzufuegen(sitzung.id, ersteller)
            .await?;
        for benutzer in &weitere {
            if benutzer.id != ersteller {
                self.speicher
                    .teilnehmer_hinzufuegen(sitzung.id, benutzer.id)
                    .await?;
            }
        }

        tracing::info!(
            sitzungs_id = %sitzung.id,
            ersteller = %ersteller,
            teilnehmer = weitere.len() + 1,
            "Neue Chat-Sitzung angelegt"
        );

        Ok(sitzung)
    }

    /// Fuegt einen Teilnehmer zu einer bestehenden Sitzung hinzu
    ///
    /// Nur aktive Teilnehmer duerfen weitere Benutzer einladen. Ein
    /// frueher weich entfernter Teilnehmer wird reaktiviert.
    pub async fn teilnehmer_hinzufuegen(
        &self,
        sitzungs_id: SitzungsId,
        ausfuehrender: UserId,
        username: &str,
    ) -> ChatResult<()> {
        self.teilnahme_pruefen(sitzungs_id, ausfuehrender).await?;

        let benutzer = self
            .speicher
            .benutzer_nach_name(username)
            .await?
            .ok_or_else(|| ChatError::BenutzerNichtGefunden(username.to_string()))?;

        self.speicher
            .teilnehmer_hinzufuegen(sitzungs_id, benutzer.id)
            .await?;

        tracing::info!(
            sitzungs_id = %sitzungs_id,
            username = %username,
            "Teilnehmer hinzugefuegt"
        );

        Ok(())
    }

    /// Entfernt einen Teilnehmer weich aus der Sitzung
    ///
    /// Der Datensatz bleibt bestehen (`is_active = false`): bereits
    /// ausgestellte Schluesselkopien halten die Historie lesbar, neue
    /// Umschlaege erhaelt der Benutzer nicht mehr.
    pub async fn teilnehmer_entfernen(
        &self,
        sitzungs_id: SitzungsId,
        ausfuehrender: UserId,
        username: &str,
    ) -> ChatResult<bool> {
        self.teilnahme_pruefen(sitzungs_id, ausfuehrender).await?;

        let benutzer = self
            .speicher
            .benutzer_nach_name(username)
            .await?
            .ok_or_else(|| ChatError::BenutzerNichtGefunden(username.to_string()))?;

        let entfernt = self
            .speicher
            .teilnehmer_entfernen(sitzungs_id, benutzer.id)
            .await?;

        if entfernt {
            tracing::info!(
                sitzungs_id = %sitzungs_id,
                username = %username,
                "Teilnehmer entfernt"
            );
        }

        Ok(entfernt)
    }

    /// Alle Sitzungen in denen der Benutzer aktiver Teilnehmer ist
    pub async fn sitzungen_fuer_benutzer(
        &self,
        user_id: UserId,
    ) -> ChatResult<Vec<SitzungsRecord>> {
        Ok(self.speicher.sitzungen_fuer_benutzer(user_id).await?)
    }

    /// Laedt die Nachrichtenhistorie einer Sitzung aus Sicht eines Benutzers
    ///
    /// Nachrichten ohne Schluesselkopie fuer den Anfragenden (vor seinem
    /// Beitritt gesendet) werden uebersprungen – er koennte sie ohnehin
    /// nicht oeffnen.
    pub async fn nachrichten_laden(
        &self,
        sitzungs_id: SitzungsId,
        anfragender: UserId,
    ) -> ChatResult<Vec<NachrichtAnsicht>> {
        self.teilnahme_pruefen(sitzungs_id, anfragender).await?;

        let anfragender_record = self
            .speicher
            .benutzer_laden(anfragender)
            .await?
            .ok_or_else(|| ChatError::BenutzerNichtGefunden(anfragender.to_string()))?;

        let nachrichten = self.speicher.nachrichten_fuer_sitzung(sitzungs_id).await?;

        let mut sender_namen: HashMap<UserId, String> = HashMap::new();
        let mut ansichten = Vec::with_capacity(nachrichten.len());

        for nachricht in nachrichten {
            let schluessel = match nachricht.umschlag.schluessel_fuer(&anfragender_record.username)
            {
                Some(s) => s.to_string(),
                None => continue,
            };

            let sender_name = match sender_namen.get(&nachricht.sender_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .speicher
                        .benutzer_laden(nachricht.sender_id)
                        .await?
                        .map(|b| b.username)
                        .unwrap_or_else(|| nachricht.sender_id.to_string());
                    sender_namen.insert(nachricht.sender_id, name.clone());
                    name
                }
            };

            ansichten.push(NachrichtAnsicht {
                message_id: nachricht.id,
                sender_username: sender_name,
                content: BASE64_STANDARD.encode(&nachricht.umschlag.ciphertext),
                encryption_key: schluessel,
                iv: BASE64_STANDARD.encode(nachricht.umschlag.iv),
                timestamp: nachricht.timestamp,
            });
        }

        Ok(ansichten)
    }

    /// Prueft aktive Teilnahme, unterscheidet unbekannte Sitzung von
    /// fehlender Mitgliedschaft
    async fn teilnahme_pruefen(
        &self,
        sitzungs_id: SitzungsId,
        user_id: UserId,
    ) -> ChatResult<()> {
        if self.speicher.sitzung_laden(sitzungs_id).await?.is_none() {
            return Err(ChatError::SitzungNichtGefunden(sitzungs_id.to_string()));
        }

        let aktiv = self
            .speicher
            .ist_aktiver_teilnehmer(sitzungs_id, user_id)
            .await?;
        if !aktiv {
            return Err(ChatError::KeinTeilnehmer {
                sitzung: sitzungs_id.to_string(),
                benutzer: user_id.to_string(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fluesterpost_crypto::fuer_empfaenger_verschluesseln;
    use fluesterpost_store::{MemorySpeicher, NeuerBenutzer};
    use std::collections::BTreeMap;

    async fn benutzer_anlegen(speicher: &MemorySpeicher, name: &str) -> BenutzerRecord {
        let paar = fluesterpost_crypto::schluesselpaar_erzeugen().unwrap();
        speicher
            .benutzer_erstellen(NeuerBenutzer {
                username: name,
                password_hash: "$argon2id$dummy",
                public_key: &paar.public_key_pem,
                private_key: &paar.private_key_pem,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ersteller_ist_immer_teilnehmer() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;
        let bob = benutzer_anlegen(&speicher, "bob").await;

        let sitzung = service
            .sitzung_erstellen(alice.id, &["bob".to_string()])
            .await
            .unwrap();

        assert!(speicher
            .ist_aktiver_teilnehmer(sitzung.id, alice.id)
            .await
            .unwrap());
        assert!(speicher
            .ist_aktiver_teilnehmer(sitzung.id, bob.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unbekannter_teilnehmer_bricht_anlegen_ab() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;

        let ergebnis = service
            .sitzung_erstellen(alice.id, &["niemand".to_string()])
            .await;
        assert!(matches!(ergebnis, Err(ChatError::BenutzerNichtGefunden(_))));

        // Keine halb angelegte Sitzung
        assert!(service
            .sitzungen_fuer_benutzer(alice.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nur_teilnehmer_duerfen_einladen() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;
        let _bob = benutzer_anlegen(&speicher, "bob").await;
        let carol = benutzer_anlegen(&speicher, "carol").await;
        let _dave = benutzer_anlegen(&speicher, "dave").await;

        let sitzung = service
            .sitzung_erstellen(alice.id, &["dave".to_string()])
            .await
            .unwrap();

        let ergebnis = service
            .teilnehmer_hinzufuegen(sitzung.id, carol.id, "bob")
            .await;
        assert!(matches!(ergebnis, Err(ChatError::KeinTeilnehmer { .. })));
    }

    #[tokio::test]
    async fn leere_teilnehmerliste_wird_abgelehnt() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;

        let ergebnis = service.sitzung_erstellen(alice.id, &[]).await;
        assert!(matches!(ergebnis, Err(ChatError::KeineTeilnehmer)));

        // Keine halb angelegte Sitzung
        assert!(service
            .sitzungen_fuer_benutzer(alice.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn entfernter_teilnehmer_verliert_zugang() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;
        let bob = benutzer_anlegen(&speicher, "bob").await;

        let sitzung = service
            .sitzung_erstellen(alice.id, &["bob".to_string()])
            .await
            .unwrap();

        let entfernt = service
            .teilnehmer_entfernen(sitzung.id, alice.id, "bob")
            .await
            .unwrap();
        assert!(entfernt);

        let ergebnis = service.nachrichten_laden(sitzung.id, bob.id).await;
        assert!(matches!(ergebnis, Err(ChatError::KeinTeilnehmer { .. })));
    }

    #[tokio::test]
    async fn historie_liefert_nur_eigene_schluesselkopie() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;
        let bob = benutzer_anlegen(&speicher, "bob").await;

        let sitzung = service
            .sitzung_erstellen(alice.id, &["bob".to_string()])
            .await
            .unwrap();

        let mut empfaenger = BTreeMap::new();
        empfaenger.insert("alice".to_string(), alice.public_key.clone());
        empfaenger.insert("bob".to_string(), bob.public_key.clone());
        let umschlag = fuer_empfaenger_verschluesseln(b"hallo", &empfaenger).unwrap();

        speicher
            .nachricht_erstellen(sitzung.id, alice.id, umschlag)
            .await
            .unwrap();

        let historie = service.nachrichten_laden(sitzung.id, bob.id).await.unwrap();
        assert_eq!(historie.len(), 1);
        assert_eq!(historie[0].sender_username, "alice");

        // Bobs Kopie laesst sich mit Bobs privatem Schluessel oeffnen
        let gespeichert = &speicher
            .nachrichten_fuer_sitzung(sitzung.id)
            .await
            .unwrap()[0];
        assert_eq!(
            historie[0].encryption_key,
            gespeichert.umschlag.schluessel_fuer("bob").unwrap()
        );
        let klartext = fluesterpost_crypto::fuer_empfaenger_entschluesseln(
            &gespeichert.umschlag,
            &bob.private_key,
            "bob",
        )
        .unwrap();
        assert_eq!(klartext, b"hallo");
    }

    #[tokio::test]
    async fn spaeter_beigetretene_sehen_alte_nachrichten_nicht() {
        let speicher = Arc::new(MemorySpeicher::neu());
        let service = SitzungsService::neu(Arc::clone(&speicher));

        let alice = benutzer_anlegen(&speicher, "alice").await;
        let bob = benutzer_anlegen(&speicher, "bob").await;
        let carol = benutzer_anlegen(&speicher, "carol").await;

        let sitzung = service
            .sitzung_erstellen(alice.id, &["bob".to_string()])
            .await
            .unwrap();

        // Nachricht vor Carols Beitritt: nur alice und bob als Empfaenger
        let mut empfaenger = BTreeMap::new();
        empfaenger.insert("alice".to_string(), alice.public_key.clone());
        empfaenger.insert("bob".to_string(), bob.public_key.clone());
        let umschlag = fuer_empfaenger_verschluesseln(b"vor carol", &empfaenger).unwrap();
        speicher
            .nachricht_erstellen(sitzung.id, alice.id, umschlag)
            .await
            .unwrap();

        service
            .teilnehmer_hinzufuegen(sitzung.id, alice.id, "carol")
            .await
            .unwrap();

        // Nachricht nach dem Beitritt: alle drei
        let mut empfaenger = BTreeMap::new();
        empfaenger.insert("alice".to_string(), alice.public_key.clone());
        empfaenger.insert("bob".to_string(), bob.public_key.clone());
        empfaenger.insert("carol".to_string(), carol.public_key.clone());
        let umschlag = fuer_empfaenger_verschluesseln(b"mit carol", &empfaenger).unwrap();
        speicher
            .nachricht_erstellen(sitzung.id, bob.id, umschlag)
            .await
            .unwrap();

        let fuer_carol = service
            .nachrichten_laden(sitzung.id, carol.id)
            .await
            .unwrap();
        assert_eq!(fuer_carol.len(), 1);
        assert_eq!(fuer_carol[0].sender_username, "bob");

        let fuer_bob = service.nachrichten_laden(sitzung.id, bob.id).await.unwrap();
        assert_eq!(fuer_bob.len(), 2);
    }
}

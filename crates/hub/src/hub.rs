//! Sitzungs-Hub – eine Task pro lebendiger Sitzung
//!
//! Der Hub besitzt die Live-Verbindungen seiner Sitzung und arbeitet
//! Befehle strikt der Reihe nach ab. Alle Speicher- und Krypto-Aufrufe
//! einer Nachricht passieren innerhalb dieser Abarbeitung, deshalb ist
//! die Reihenfolge der verteilten Events fuer alle Verbindungen gleich.
//!
//! Sobald die letzte Verbindung weg ist beendet sich die Task und meldet
//! sich beim Register ab.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use fluesterpost_core::types::{NachrichtId, SitzungsId, UserId};
use fluesterpost_crypto::fuer_empfaenger_verschluesseln;
use fluesterpost_store::{BenutzerRepository, NachrichtenRepository, SitzungsRepository};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{HubError, HubResult};
use crate::events::DrahtEvent;

/// Groesse der Event-Queue pro Verbindung
const EVENT_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// Befehle
// ---------------------------------------------------------------------------

/// Antwort auf einen erfolgreichen Beitritt
pub(crate) struct BeitrittsDaten {
    pub verbindungs_id: Uuid,
    pub username: String,
    pub events: mpsc::Receiver<DrahtEvent>,
}

/// Befehle an die Hub-Task
///
/// `Verlassen` und `Tippen` kommen ohne Antwortkanal aus: Verlassen muss
/// auch aus einem `Drop` heraus funktionieren, Tipp-Status ist fire-and-forget.
pub(crate) enum HubBefehl {
    Beitreten {
        user_id: UserId,
        antwort: oneshot::Sender<HubResult<BeitrittsDaten>>,
    },
    Verlassen {
        verbindungs_id: Uuid,
    },
    NachrichtSenden {
        verbindungs_id: Uuid,
        klartext: String,
        antwort: oneshot::Sender<HubResult<NachrichtId>>,
    },
    Tippen {
        verbindungs_id: Uuid,
        is_typing: bool,
    },
}

// ---------------------------------------------------------------------------
// Hub-Task
// ---------------------------------------------------------------------------

/// Eine Live-Verbindung aus Sicht des Hubs
struct LiveVerbindung {
    user_id: UserId,
    username: String,
    tx: mpsc::Sender<DrahtEvent>,
}

/// Zustand der Hub-Task einer Sitzung
struct SitzungsHub<S> {
    sitzungs_id: SitzungsId,
    speicher: Arc<S>,
    verbindungen: HashMap<Uuid, LiveVerbindung>,
}

/// Startet die Hub-Task einer Sitzung
///
/// `abbau` wird genau einmal aufgerufen wenn die Task endet, damit das
/// Register den Eintrag entfernen kann.
pub(crate) fn hub_starten<S>(
    sitzungs_id: SitzungsId,
    speicher: Arc<S>,
    abbau: impl FnOnce() + Send + 'static,
) -> mpsc::UnboundedSender<HubBefehl>
where
    S: BenutzerRepository + SitzungsRepository + NachrichtenRepository + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut hub = SitzungsHub {
            sitzungs_id,
            speicher,
            verbindungen: HashMap::new(),
        };

        tracing::debug!(sitzungs_id = %sitzungs_id, "Hub-Task gestartet");

        while let Some(befehl) = rx.recv().await {
            hub.befehl_verarbeiten(befehl).await;
            if hub.verbindungen.is_empty() {
                break;
            }
        }

        tracing::debug!(sitzungs_id = %sitzungs_id, "Hub-Task beendet (Sitzung leer)");
        abbau();
    });

    tx
}

impl<S> SitzungsHub<S>
where
    S: BenutzerRepository + SitzungsRepository + NachrichtenRepository,
{
    async fn befehl_verarbeiten(&mut self, befehl: HubBefehl) {
        match befehl {
            HubBefehl::Beitreten { user_id, antwort } => {
                let ergebnis = self.beitreten(user_id).await;
                let _ = antwort.send(ergebnis);
            }
            HubBefehl::Verlassen { verbindungs_id } => {
                self.verlassen(verbindungs_id);
            }
            HubBefehl::NachrichtSenden {
                verbindungs_id,
                klartext,
                antwort,
            } => {
                let ergebnis = self.nachricht_senden(verbindungs_id, &klartext).await;
                let _ = antwort.send(ergebnis);
            }
            HubBefehl::Tippen {
                verbindungs_id,
                is_typing,
            } => {
                self.tippen(verbindungs_id, is_typing);
            }
        }
    }

    /// Nimmt eine neue Verbindung in die Sitzung auf
    async fn beitreten(&mut self, user_id: UserId) -> HubResult<BeitrittsDaten> {
        let aktiv = self
            .speicher
            .ist_aktiver_teilnehmer(self.sitzungs_id, user_id)
            .await?;
        if !aktiv {
            return Err(HubError::NichtTeilnehmer {
                sitzung: self.sitzungs_id.to_string(),
                benutzer: user_id.to_string(),
            });
        }

        let benutzer = self
            .speicher
            .benutzer_laden(user_id)
            .await?
            .ok_or_else(|| HubError::BenutzerNichtGefunden(user_id.to_string()))?;

        // Erst an die Bestandsverbindungen melden, dann aufnehmen – die
        // neue Verbindung sieht ihren eigenen Beitritt nicht.
        self.verteilen(DrahtEvent::UserJoin {
            username: benutzer.username.clone(),
        });

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_GROESSE);
        let verbindungs_id = Uuid::new_v4();
        self.verbindungen.insert(
            verbindungs_id,
            LiveVerbindung {
                user_id,
                username: benutzer.username.clone(),
                tx,
            },
        );

        tracing::info!(
            sitzungs_id = %self.sitzungs_id,
            username = %benutzer.username,
            verbindungen = self.verbindungen.len(),
            "Verbindung beigetreten"
        );

        Ok(BeitrittsDaten {
            verbindungs_id,
            username: benutzer.username,
            events: rx,
        })
    }

    /// Entfernt eine Verbindung aus der Sitzung
    ///
    /// Idempotent: eine bereits entfernte Verbindung ist kein Fehler.
    fn verlassen(&mut self, verbindungs_id: Uuid) {
        if let Some(verbindung) = self.verbindungen.remove(&verbindungs_id) {
            tracing::info!(
                sitzungs_id = %self.sitzungs_id,
                username = %verbindung.username,
                verbindungen = self.verbindungen.len(),
                "Verbindung verlassen"
            );
            self.verteilen(DrahtEvent::UserLeave {
                username: verbindung.username,
            });
        }
    }

    /// Verschluesselt, persistiert und verteilt eine Nachricht
    ///
    /// Persistierung strikt vor der Verteilung: schlaegt Speicher oder
    /// Kryptografie fehl, sieht keine Verbindung ein Event und nur der
    /// Absender erhaelt den Fehler.
    async fn nachricht_senden(
        &mut self,
        verbindungs_id: Uuid,
        klartext: &str,
    ) -> HubResult<NachrichtId> {
        let (sender_id, sender_name) = match self.verbindungen.get(&verbindungs_id) {
            Some(v) => (v.user_id, v.username.clone()),
            None => return Err(HubError::NichtVerbunden),
        };

        // Mitgliedschaft kann sich seit dem Join geaendert haben
        let aktiv = self
            .speicher
            .ist_aktiver_teilnehmer(self.sitzungs_id, sender_id)
            .await?;
        if !aktiv {
            return Err(HubError::NichtTeilnehmer {
                sitzung: self.sitzungs_id.to_string(),
                benutzer: sender_id.to_string(),
            });
        }

        let teilnehmer = self.speicher.aktive_teilnehmer(self.sitzungs_id).await?;
        let empfaenger: BTreeMap<String, String> = teilnehmer
            .into_iter()
            .map(|t| (t.username, t.public_key))
            .collect();

        let umschlag = fuer_empfaenger_verschluesseln(klartext.as_bytes(), &empfaenger)?;

        let record = self
            .speicher
            .nachricht_erstellen(self.sitzungs_id, sender_id, umschlag)
            .await?;

        // Redigierte Verteilung: jede Verbindung nur mit der eigenen Kopie
        let content = BASE64_STANDARD.encode(&record.umschlag.ciphertext);
        let iv = BASE64_STANDARD.encode(record.umschlag.iv);

        for verbindung in self.verbindungen.values() {
            let schluessel = match record.umschlag.schluessel_fuer(&verbindung.username) {
                Some(s) => s.to_string(),
                None => {
                    // Verbunden, aber kein Empfaenger mehr (weich entfernt)
                    tracing::debug!(
                        sitzungs_id = %self.sitzungs_id,
                        username = %verbindung.username,
                        "Keine Schluesselkopie – Nachricht nicht zugestellt"
                    );
                    continue;
                }
            };

            event_einreihen(
                verbindung,
                DrahtEvent::Message {
                    message_id: record.id,
                    sender_username: sender_name.clone(),
                    content: content.clone(),
                    encryption_key: schluessel,
                    iv: iv.clone(),
                    timestamp: record.timestamp,
                },
            );
        }

        tracing::debug!(
            sitzungs_id = %self.sitzungs_id,
            nachricht_id = %record.id,
            empfaenger = record.umschlag.empfaenger_anzahl(),
            "Nachricht persistiert und verteilt"
        );

        Ok(record.id)
    }

    /// Verteilt eine Tipp-Statusaenderung an alle anderen Verbindungen
    fn tippen(&self, verbindungs_id: Uuid, is_typing: bool) {
        let username = match self.verbindungen.get(&verbindungs_id) {
            Some(v) => v.username.clone(),
            None => return,
        };
        let event = DrahtEvent::Typing { username, is_typing };
        for (id, verbindung) in &self.verbindungen {
            if *id != verbindungs_id {
                event_einreihen(verbindung, event.clone());
            }
        }
    }

    /// Reiht ein Event bei allen Verbindungen der Sitzung ein
    fn verteilen(&self, event: DrahtEvent) {
        for verbindung in self.verbindungen.values() {
            event_einreihen(verbindung, event.clone());
        }
    }
}

/// Reiht ein Event nicht-blockierend bei einer Verbindung ein
///
/// Volle oder geschlossene Queues verwerfen das Event, damit langsame
/// Clients die Sitzung nie aufhalten.
fn event_einreihen(verbindung: &LiveVerbindung, event: DrahtEvent) {
    match verbindung.tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(
                username = %verbindung.username,
                "Event-Queue voll – Event verworfen"
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(
                username = %verbindung.username,
                "Event-Queue geschlossen (Client getrennt)"
            );
        }
    }
}

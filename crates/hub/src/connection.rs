//! Verbindungs-Handle – die Client-Seite einer Hub-Mitgliedschaft
//!
//! Das Handle kapselt Befehlskanal und Event-Queue einer Verbindung.
//! Ein Drop-Waechter stellt sicher, dass das Verlassen den Hub auch
//! dann erreicht, wenn die Verbindungs-Task abbricht statt sauber zu
//! enden – der Verlassen-Befehl geht ueber den unbegrenzten Kanal und
//! ist damit in `Drop` sendbar.

use fluesterpost_core::types::{NachrichtId, SitzungsId, UserId};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{HubError, HubResult};
use crate::events::DrahtEvent;
use crate::hub::HubBefehl;

/// Drop-Waechter: meldet die Verbindung beim Hub ab
struct VerlassenWache {
    verbindungs_id: Uuid,
    befehle: mpsc::UnboundedSender<HubBefehl>,
}

impl Drop for VerlassenWache {
    fn drop(&mut self) {
        // Fehlschlag heisst: Hub-Task ist bereits weg, nichts zu tun
        let _ = self.befehle.send(HubBefehl::Verlassen {
            verbindungs_id: self.verbindungs_id,
        });
    }
}

/// Eine aktive Verbindung zu einer Sitzung
///
/// Beim Drop verlaesst die Verbindung die Sitzung automatisch.
pub struct Verbindung {
    verbindungs_id: Uuid,
    sitzungs_id: SitzungsId,
    user_id: UserId,
    username: String,
    befehle: mpsc::UnboundedSender<HubBefehl>,
    events: mpsc::Receiver<DrahtEvent>,
    _wache: VerlassenWache,
}

impl Verbindung {
    pub(crate) fn neu(
        verbindungs_id: Uuid,
        sitzungs_id: SitzungsId,
        user_id: UserId,
        username: String,
        befehle: mpsc::UnboundedSender<HubBefehl>,
        events: mpsc::Receiver<DrahtEvent>,
    ) -> Self {
        let wache = VerlassenWache {
            verbindungs_id,
            befehle: befehle.clone(),
        };
        Self {
            verbindungs_id,
            sitzungs_id,
            user_id,
            username,
            befehle,
            events,
            _wache: wache,
        }
    }

    pub fn sitzungs_id(&self) -> SitzungsId {
        self.sitzungs_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sendet eine Nachricht in die Sitzung
    ///
    /// Wartet auf die Verarbeitung durch den Hub und gibt die Id der
    /// persistierten Nachricht zurueck.
    pub async fn nachricht_senden(&self, klartext: &str) -> HubResult<NachrichtId> {
        let (tx, rx) = oneshot::channel();
        self.befehle
            .send(HubBefehl::NachrichtSenden {
                verbindungs_id: self.verbindungs_id,
                klartext: klartext.to_string(),
                antwort: tx,
            })
            .map_err(|_| HubError::HubGeschlossen)?;
        rx.await.map_err(|_| HubError::HubGeschlossen)?
    }

    /// Meldet eine Tipp-Statusaenderung (fire-and-forget)
    pub fn tippen(&self, is_typing: bool) {
        let _ = self.befehle.send(HubBefehl::Tippen {
            verbindungs_id: self.verbindungs_id,
            is_typing,
        });
    }

    /// Empfaengt das naechste Event der Sitzung
    ///
    /// `None` wenn der Hub die Verbindung aufgegeben hat.
    pub async fn naechstes_event(&mut self) -> Option<DrahtEvent> {
        self.events.recv().await
    }

    /// Nicht-blockierender Event-Abruf
    pub fn event_abrufen(&mut self) -> Option<DrahtEvent> {
        self.events.try_recv().ok()
    }
}

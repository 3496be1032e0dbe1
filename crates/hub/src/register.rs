//! Hub-Register – ein Hub pro lebendiger Sitzung
//!
//! Das Register legt Hub-Tasks faul beim ersten Beitritt an und raeumt
//! die Eintraege auf, sobald eine Hub-Task sich beendet. Ein
//! Generationsstempel pro Eintrag verhindert, dass der Abbau eines
//! alten Hubs einen frisch gestarteten Nachfolger mitreisst.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fluesterpost_core::types::{SitzungsId, UserId};
use fluesterpost_store::{BenutzerRepository, NachrichtenRepository, SitzungsRepository};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::connection::Verbindung;
use crate::error::{HubError, HubResult};
use crate::hub::{hub_starten, HubBefehl};

/// Handle auf die Befehlsqueue einer Hub-Task
#[derive(Clone)]
struct HubGriff {
    generation: Uuid,
    befehle: mpsc::UnboundedSender<HubBefehl>,
}

/// Register aller lebendigen Sitzungs-Hubs
pub struct HubRegister<S> {
    speicher: Arc<S>,
    hubs: Arc<DashMap<SitzungsId, HubGriff>>,
}

impl<S> Clone for HubRegister<S> {
    fn clone(&self) -> Self {
        Self {
            speicher: Arc::clone(&self.speicher),
            hubs: Arc::clone(&self.hubs),
        }
    }
}

impl<S> HubRegister<S>
where
    S: BenutzerRepository + SitzungsRepository + NachrichtenRepository + 'static,
{
    /// Erstellt ein neues Hub-Register
    pub fn neu(speicher: Arc<S>) -> Self {
        Self {
            speicher,
            hubs: Arc::new(DashMap::new()),
        }
    }

    /// Tritt der Live-Sitzung bei und gibt ein Verbindungs-Handle zurueck
    ///
    /// Existiert noch kein Hub fuer die Sitzung, wird er gestartet.
    /// Nur aktive Teilnehmer der Sitzung werden aufgenommen.
    pub async fn beitreten(
        &self,
        sitzungs_id: SitzungsId,
        user_id: UserId,
    ) -> HubResult<Verbindung> {
        if self.speicher.sitzung_laden(sitzungs_id).await?.is_none() {
            return Err(HubError::SitzungNichtGefunden(sitzungs_id.to_string()));
        }

        // Ein sterbender Hub kann den Beitritt verpassen – dann mit
        // frischem Hub erneut versuchen
        loop {
            let griff = self.griff_holen(sitzungs_id);

            let (tx, rx) = oneshot::channel();
            if griff
                .befehle
                .send(HubBefehl::Beitreten {
                    user_id,
                    antwort: tx,
                })
                .is_err()
            {
                self.eintrag_entfernen(sitzungs_id, griff.generation);
                continue;
            }

            match rx.await {
                Ok(Ok(daten)) => {
                    return Ok(Verbindung::neu(
                        daten.verbindungs_id,
                        sitzungs_id,
                        user_id,
                        daten.username,
                        griff.befehle.clone(),
                        daten.events,
                    ));
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    self.eintrag_entfernen(sitzungs_id, griff.generation);
                    continue;
                }
            }
        }
    }

    /// Anzahl der aktuell lebendigen Hubs
    pub fn aktive_hubs(&self) -> usize {
        self.hubs.len()
    }

    /// Holt den Hub-Griff der Sitzung, startet die Task bei Bedarf
    fn griff_holen(&self, sitzungs_id: SitzungsId) -> HubGriff {
        match self.hubs.entry(sitzungs_id) {
            Entry::Occupied(eintrag) => eintrag.get().clone(),
            Entry::Vacant(eintrag) => {
                let generation = Uuid::new_v4();
                let hubs = Arc::clone(&self.hubs);
                let befehle =
                    hub_starten(sitzungs_id, Arc::clone(&self.speicher), move || {
                        hubs.remove_if(&sitzungs_id, |_, g| g.generation == generation);
                    });
                let griff = HubGriff {
                    generation,
                    befehle,
                };
                eintrag.insert(griff.clone());
                tracing::debug!(sitzungs_id = %sitzungs_id, "Hub angelegt");
                griff
            }
        }
    }

    /// Entfernt einen veralteten Eintrag, ohne einen Nachfolger zu treffen
    fn eintrag_entfernen(&self, sitzungs_id: SitzungsId, generation: Uuid) {
        self.hubs
            .remove_if(&sitzungs_id, |_, g| g.generation == generation);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

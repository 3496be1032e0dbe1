//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Geschaeftslogik vom konkreten
//! Speicher. Die Methoden geben `impl Future + Send` zurueck statt
//! `async fn`: der Hub verschiebt die Futures in eigene Tasks und
//! braucht dafuer die Send-Garantie. Implementierungen schreiben
//! weiterhin gewoehnliche `async fn`.

use std::future::Future;

use fluesterpost_core::types::{SitzungsId, UserId};
use fluesterpost_crypto::Umschlag;

use crate::error::SpeicherResult;
use crate::models::{
    AktiverTeilnehmer, BenutzerRecord, NachrichtRecord, NeuerBenutzer, SitzungsRecord,
    TeilnehmerRecord,
};

/// Repository fuer Benutzer-Datenzugriffe
pub trait BenutzerRepository: Send + Sync {
    /// Einen neuen Benutzer anlegen
    ///
    /// Schlaegt mit `Eindeutigkeit` fehl wenn der Benutzername vergeben ist.
    fn benutzer_erstellen(&self, neu: NeuerBenutzer<'_>) -> impl Future<Output = SpeicherResult<BenutzerRecord>> + Send;

    /// Einen Benutzer anhand seiner ID laden
    fn benutzer_laden(&self, id: UserId) -> impl Future<Output = SpeicherResult<Option<BenutzerRecord>>> + Send;

    /// Einen Benutzer anhand seines Namens laden
    fn benutzer_nach_name(&self, name: &str) -> impl Future<Output = SpeicherResult<Option<BenutzerRecord>>> + Send;
}

/// Repository fuer Chat-Sitzungen und Teilnehmer
pub trait SitzungsRepository: Send + Sync {
    /// Eine neue Chat-Sitzung anlegen
    fn sitzung_erstellen(&self) -> impl Future<Output = SpeicherResult<SitzungsRecord>> + Send;

    /// Eine Sitzung anhand ihrer ID laden
    fn sitzung_laden(&self, id: SitzungsId) -> impl Future<Output = SpeicherResult<Option<SitzungsRecord>>> + Send;

    /// Alle Sitzungen in denen der Benutzer aktiver Teilnehmer ist
    fn sitzungen_fuer_benutzer(&self, user_id: UserId)
        -> impl Future<Output = SpeicherResult<Vec<SitzungsRecord>>> + Send;

    /// Einen Teilnehmer hinzufuegen
    ///
    /// Existiert bereits ein (weich entfernter) Datensatz fuer das Paar
    /// (Sitzung, Benutzer), wird er reaktiviert statt dupliziert.
    fn teilnehmer_hinzufuegen(
        &self,
        sitzungs_id: SitzungsId,
        user_id: UserId,
    ) -> impl Future<Output = SpeicherResult<TeilnehmerRecord>> + Send;

    /// Einen Teilnehmer weich entfernen (`is_active = false`)
    ///
    /// Gibt `false` zurueck wenn kein Datensatz existiert.
    fn teilnehmer_entfernen(
        &self,
        sitzungs_id: SitzungsId,
        user_id: UserId,
    ) -> impl Future<Output = SpeicherResult<bool>> + Send;

    /// Alle aktiven Teilnehmer einer Sitzung mit oeffentlichen Schluesseln
    fn aktive_teilnehmer(
        &self,
        sitzungs_id: SitzungsId,
    ) -> impl Future<Output = SpeicherResult<Vec<AktiverTeilnehmer>>> + Send;

    /// Prueft ob der Benutzer aktiver Teilnehmer der Sitzung ist
    fn ist_aktiver_teilnehmer(
        &self,
        sitzungs_id: SitzungsId,
        user_id: UserId,
    ) -> impl Future<Output = SpeicherResult<bool>> + Send;
}

/// Repository fuer Nachrichten (append-only)
pub trait NachrichtenRepository: Send + Sync {
    /// Eine Nachricht mit ihrem Umschlag persistieren
    fn nachricht_erstellen(
        &self,
        sitzungs_id: SitzungsId,
        sender_id: UserId,
        umschlag: Umschlag,
    ) -> impl Future<Output = SpeicherResult<NachrichtRecord>> + Send;

    /// Alle Nachrichten einer Sitzung in Zeitreihenfolge
    fn nachrichten_fuer_sitzung(
        &self,
        sitzungs_id: SitzungsId,
    ) -> impl Future<Output = SpeicherResult<Vec<NachrichtRecord>>> + Send;
}

//! Fluesterpost Hub – Echtzeit-Verteiler fuer Chat-Sitzungen
//!
//! Pro lebendiger Sitzung laeuft genau eine Hub-Task, die alle
//! Live-Verbindungen der Sitzung besitzt. Befehle (Beitreten, Verlassen,
//! Nachricht, Tippen) laufen ueber eine unbegrenzte Befehlsqueue und
//! werden strikt der Reihe nach abgearbeitet – dadurch sehen alle
//! Verbindungen einer Sitzung dieselbe Ereignisreihenfolge.
//!
//! ## Ablauf einer Nachricht
//! 1. Teilnahme pruefen (Mitgliedschaft kann sich seit dem Join geaendert haben)
//! 2. Empfaengermenge samt oeffentlicher Schluessel aus dem Speicher laden
//! 3. Umschlag verschluesseln und persistieren – erst danach wird verteilt
//! 4. Pro Verbindung redigiert zustellen: jede Verbindung sieht nur die
//!    eigene Schluesselkopie, nie die volle Empfaengertabelle
//!
//! Die Auslieferung pro Verbindung ist eine begrenzte Queue mit `try_send`:
//! langsame Clients verlieren Events, blockieren aber nie die Sitzung.

pub mod connection;
pub mod error;
pub mod events;
pub mod hub;
pub mod register;

pub use connection::Verbindung;
pub use error::{HubError, HubResult};
pub use events::DrahtEvent;
pub use register::HubRegister;

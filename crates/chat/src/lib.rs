//! Fluesterpost Chat – Sitzungsverwaltung und Nachrichtenhistorie
//!
//! Dieses Crate buendelt alles rund um Chat-Sitzungen: Anlegen von
//! Sitzungen, Teilnehmerpflege (hinzufuegen, weich entfernen) und das
//! Ausliefern der verschluesselten Nachrichtenhistorie. Entschluesselt
//! wird ausschliesslich beim Client – der Service gibt pro Anfrage nur
//! die Schluesselkopie des anfragenden Benutzers heraus.

pub mod error;
pub mod service;

pub use error::{ChatError, ChatResult};
pub use service::{NachrichtAnsicht, SitzungsService};

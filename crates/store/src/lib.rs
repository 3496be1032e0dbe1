//! fluesterpost-store – Speicher-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit, das den konkreten
//! Speicher hinter einer einheitlichen Schnittstelle abstrahiert. Der Hub
//! und die Services konsumieren ausschliesslich die Traits; ein
//! SQL-Backend wuerde an derselben Grenze andocken. Mitgeliefert wird
//! `MemorySpeicher`, die In-Memory-Implementierung fuer Betrieb ohne
//! externe Datenbank und fuer Tests.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

// Bequeme Re-Exporte
pub use error::{SpeicherError, SpeicherResult};
pub use memory::MemorySpeicher;
pub use models::{
    AktiverTeilnehmer, BenutzerRecord, NachrichtRecord, NeuerBenutzer, SitzungsRecord,
    TeilnehmerRecord,
};
pub use repository::{BenutzerRepository, NachrichtenRepository, SitzungsRepository};

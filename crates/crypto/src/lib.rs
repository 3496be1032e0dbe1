//! # fluesterpost-crypto
//!
//! Hybride Umschlag-Verschluesselung fuer Fluesterpost.
//!
//! Eine Nachricht wird genau einmal symmetrisch verschluesselt (AES-256-CBC)
//! und der dabei verwendete Einmal-Schluessel pro Empfaenger asymmetrisch
//! eingepackt (RSA-2048 mit OAEP/SHA-256). So kann ein Umschlag von N
//! Empfaengern mit N verschiedenen Schluesselpaaren unabhaengig geoeffnet
//! werden.
//!
//! ## Module
//! - `schluesselpaar` - RSA-Schluesselpaar-Erzeugung (PEM)
//! - `umschlag` - Verschluesseln/Entschluesseln von Umschlaegen
//! - `types` - Gemeinsame Typen (SchluesselPaar, Umschlag, GeheimSchluessel)
//! - `error` - Fehlertypen
//!
//! Dieses Crate ist rein: kein I/O, kein gehaltener Zustand.

pub mod error;
pub mod schluesselpaar;
pub mod types;
pub mod umschlag;

// Bequeme Re-Exports
pub use error::{KryptoError, KryptoResult};
pub use schluesselpaar::schluesselpaar_erzeugen;
pub use types::{GeheimSchluessel, SchluesselPaar, Umschlag};
pub use umschlag::{fuer_empfaenger_entschluesseln, fuer_empfaenger_verschluesseln};

//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ein RSA-Schluesselpaar in PEM-Form
///
/// Wird einmalig bei der Konto-Erstellung erzeugt und danach nie rotiert.
/// Der private Teil gehoert eigentlich ausschliesslich auf das Geraet des
/// Benutzers – zur Kompatibilitaet mit Bestandsclients wird er derzeit
/// serverseitig mitgefuehrt (siehe `fluesterpost-auth`).
#[derive(Debug, Clone)]
pub struct SchluesselPaar {
    /// Oeffentlicher Schluessel (SPKI, PEM)
    pub public_key_pem: String,
    /// Privater Schluessel (PKCS#8, PEM)
    pub private_key_pem: String,
}

/// Sicherer Container fuer den symmetrischen Einmal-Schluessel
///
/// Wird beim Drop genullt. Existiert nur innerhalb eines
/// Verschluesselungs-/Entschluesselungsvorgangs – nur die eingepackten
/// Kopien ueberleben den Aufruf.
#[derive(Clone)]
pub struct GeheimSchluessel(Vec<u8>);

impl Drop for GeheimSchluessel {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for GeheimSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeheimSchluessel([REDACTED] {} bytes)", self.0.len())
    }
}

impl GeheimSchluessel {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Das Ergebnis eines Verschluesselungsvorgangs
///
/// Ein Umschlag enthaelt genau einen Ciphertext und pro Empfaenger eine
/// eingepackte Kopie desselben symmetrischen Schluessels. Jede Kopie,
/// mit dem passenden privaten Schluessel geoeffnet und zusammen mit `iv`
/// auf `ciphertext` angewendet, ergibt denselben Klartext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Umschlag {
    /// AES-256-CBC-Ausgabe ueber den gepolsterten Klartext
    pub ciphertext: Vec<u8>,
    /// Initialisierungsvektor, einmalig pro Umschlag
    pub iv: [u8; 16],
    /// Identitaet -> Base64 der RSA-OAEP-eingepackten Schluesselkopie
    pub wrapped_keys: BTreeMap<String, String>,
}

impl Umschlag {
    /// Anzahl der Empfaenger zum Zeitpunkt der Verschluesselung
    pub fn empfaenger_anzahl(&self) -> usize {
        self.wrapped_keys.len()
    }

    /// Gibt die eingepackte Schluesselkopie einer Identitaet zurueck
    pub fn schluessel_fuer(&self, identitaet: &str) -> Option<&str> {
        self.wrapped_keys.get(identitaet).map(String::as_str)
    }
}

//! Umschlag-Verschluesselung – einmal verschluesseln, N-fach entschluesselbar
//!
//! ## Ablauf (Verschluesseln)
//! 1. Frischen 256-Bit-AES-Schluessel und 16-Byte-IV ziehen
//! 2. Klartext mit AES-256-CBC verschluesseln (Polsterung siehe unten)
//! 3. Den Base64-String des AES-Schluessels pro Empfaenger mit dessen
//!    oeffentlichem RSA-Schluessel (OAEP/SHA-256) einpacken
//!
//! ## Polsterung
//! Polster-Laenge ist `16 - (len % 16)` und wird auch bei `len % 16 == 0`
//! angewendet (voller Extra-Block). Beim Entschluesseln wird das letzte
//! Klartext-Byte als Polster-Laenge uebernommen und ohne weitere Pruefung
//! abgeschnitten. Beide Punkte sind Teil des Draht-Formats und muessen fuer
//! die Interoperabilitaet mit Bestandsclients bit-exakt erhalten bleiben.
//!
//! Kein MAC, kein authentifizierter Modus: Manipulation am Ciphertext ist
//! hier nicht erkennbar. Ein Wechsel auf AES-GCM steht aus, erfordert aber
//! eine koordinierte Client-Migration.

use std::collections::BTreeMap;

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::prelude::*;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{KryptoError, KryptoResult};
use crate::types::{GeheimSchluessel, Umschlag};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-Blockgroesse in Bytes
const BLOCK: usize = 16;

/// Verschluesselt einen Klartext fuer eine Menge von Empfaengern
///
/// `empfaenger` bildet Identitaet auf oeffentlichen Schluessel (SPKI-PEM) ab
/// und darf nicht leer sein. Alles-oder-nichts: laesst sich auch nur ein
/// oeffentlicher Schluessel nicht parsen, wird der gesamte Vorgang
/// abgebrochen und kein Umschlag erzeugt.
///
/// Pro Aufruf werden Schluessel und IV frisch gezogen – zwei Aufrufe mit
/// identischem Klartext und identischen Empfaengern erzeugen nie denselben
/// Ciphertext.
pub fn fuer_empfaenger_verschluesseln(
    klartext: &[u8],
    empfaenger: &BTreeMap<String, String>,
) -> KryptoResult<Umschlag> {
    if empfaenger.is_empty() {
        return Err(KryptoError::KeineEmpfaenger);
    }

    // Erst alle oeffentlichen Schluessel parsen, dann verschluesseln –
    // entweder bekommt jeder Empfaenger eine Kopie oder keiner.
    let mut geparst: Vec<(&str, RsaPublicKey)> = Vec::with_capacity(empfaenger.len());
    for (identitaet, pem) in empfaenger {
        let key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| {
            KryptoError::UngueltigerSchluessel {
                identitaet: identitaet.clone(),
                grund: e.to_string(),
            }
        })?;
        geparst.push((identitaet, key));
    }

    let mut rng = rand::rngs::OsRng;

    let mut schluessel_bytes = vec![0u8; 32];
    rng.fill_bytes(&mut schluessel_bytes);
    let schluessel = GeheimSchluessel::new(schluessel_bytes);

    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut iv);

    let ciphertext = aes_cbc_verschluesseln(klartext, &schluessel, &iv)?;

    // Der AES-Schluessel wandert als Base64-String durch RSA-OAEP – so
    // erwartet es das bestehende Client-Format.
    let schluessel_b64 = BASE64_STANDARD.encode(schluessel.as_bytes());
    let mut wrapped_keys = BTreeMap::new();
    for (identitaet, key) in &geparst {
        let eingepackt = key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), schluessel_b64.as_bytes())
            .map_err(|e| KryptoError::Verschluesselung(e.to_string()))?;
        wrapped_keys.insert(identitaet.to_string(), BASE64_STANDARD.encode(eingepackt));
    }

    Ok(Umschlag {
        ciphertext,
        iv,
        wrapped_keys,
    })
}

/// Entschluesselt einen Umschlag fuer eine einzelne Identitaet
///
/// Schlaegt mit `SchluesselNichtGefunden` fehl wenn die Identitaet nicht
/// Teil der urspruenglichen Empfaengermenge war, und mit `Entschluesselung`
/// bei jedem Cipher-Fehler – es werden nie Teil- oder Muellbytes geliefert.
pub fn fuer_empfaenger_entschluesseln(
    umschlag: &Umschlag,
    private_key_pem: &str,
    identitaet: &str,
) -> KryptoResult<Vec<u8>> {
    let eingepackt_b64 = umschlag
        .schluessel_fuer(identitaet)
        .ok_or_else(|| KryptoError::SchluesselNichtGefunden(identitaet.to_string()))?;

    let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem).map_err(|e| {
        KryptoError::UngueltigerSchluessel {
            identitaet: identitaet.to_string(),
            grund: e.to_string(),
        }
    })?;

    let eingepackt = BASE64_STANDARD.decode(eingepackt_b64)?;
    let schluessel_b64 = private_key
        .decrypt(Oaep::new::<Sha256>(), &eingepackt)
        .map_err(|e| KryptoError::Entschluesselung(e.to_string()))?;
    let schluessel_b64 = String::from_utf8(schluessel_b64)
        .map_err(|e| KryptoError::Entschluesselung(e.to_string()))?;

    let schluessel = GeheimSchluessel::new(BASE64_STANDARD.decode(&schluessel_b64)?);
    if schluessel.len() != 32 {
        return Err(KryptoError::Entschluesselung(format!(
            "Symmetrischer Schluessel hat {} Bytes statt 32",
            schluessel.len()
        )));
    }

    aes_cbc_entschluesseln(&umschlag.ciphertext, &schluessel, &umschlag.iv)
}

/// AES-256-CBC mit manueller Polsterung auf die Blockgrenze
fn aes_cbc_verschluesseln(
    klartext: &[u8],
    schluessel: &GeheimSchluessel,
    iv: &[u8; 16],
) -> KryptoResult<Vec<u8>> {
    // Immer polstern, auch bei len % 16 == 0 (voller Extra-Block)
    let polster = BLOCK - (klartext.len() % BLOCK);
    let mut gepolstert = Vec::with_capacity(klartext.len() + polster);
    gepolstert.extend_from_slice(klartext);
    gepolstert.extend(std::iter::repeat(polster as u8).take(polster));

    let cipher = Aes256CbcEnc::new_from_slices(schluessel.as_bytes(), iv)
        .map_err(|e| KryptoError::Verschluesselung(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(&gepolstert))
}

/// AES-256-CBC-Entschluesselung mit Polster-Entfernung
///
/// Das letzte Byte wird als Polster-Laenge uebernommen und abgeschnitten,
/// ohne Pruefung gegen die Blockgroesse – Draht-Format, siehe Modul-Doku.
fn aes_cbc_entschluesseln(
    ciphertext: &[u8],
    schluessel: &GeheimSchluessel,
    iv: &[u8; 16],
) -> KryptoResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK != 0 {
        return Err(KryptoError::Entschluesselung(format!(
            "Ciphertext-Laenge {} ist kein Vielfaches der Blockgroesse",
            ciphertext.len()
        )));
    }

    let cipher = Aes256CbcDec::new_from_slices(schluessel.as_bytes(), iv)
        .map_err(|e| KryptoError::Entschluesselung(e.to_string()))?;
    let mut klartext = cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|e| KryptoError::Entschluesselung(e.to_string()))?;

    let polster = *klartext.last().unwrap_or(&0) as usize;
    let ziel = klartext.len().saturating_sub(polster);
    klartext.truncate(ziel);
    Ok(klartext)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schluesselpaar::schluesselpaar_erzeugen;
    use crate::types::SchluesselPaar;
    use std::sync::OnceLock;

    // RSA-2048-Erzeugung ist teuer – ein geteilter Satz Testschluessel
    // reicht, die Einmal-Schluessel pro Umschlag bleiben trotzdem frisch.
    fn test_paare() -> &'static [(String, SchluesselPaar); 3] {
        static PAARE: OnceLock<[(String, SchluesselPaar); 3]> = OnceLock::new();
        PAARE.get_or_init(|| {
            [
                ("alice".to_string(), schluesselpaar_erzeugen().unwrap()),
                ("bob".to_string(), schluesselpaar_erzeugen().unwrap()),
                ("carol".to_string(), schluesselpaar_erzeugen().unwrap()),
            ]
        })
    }

    fn empfaenger_von(paare: &[(String, SchluesselPaar)]) -> BTreeMap<String, String> {
        paare
            .iter()
            .map(|(name, paar)| (name.clone(), paar.public_key_pem.clone()))
            .collect()
    }

    #[test]
    fn rundreise_fuer_alle_empfaenger() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(paare);
        let klartext = "Hallo zusammen, streng geheim!".as_bytes();

        let umschlag = fuer_empfaenger_verschluesseln(klartext, &empfaenger).unwrap();
        assert_eq!(umschlag.empfaenger_anzahl(), 3);

        for (name, paar) in paare {
            let entschluesselt =
                fuer_empfaenger_entschluesseln(&umschlag, &paar.private_key_pem, name).unwrap();
            assert_eq!(entschluesselt, klartext, "Rundreise fuer {name}");
        }
    }

    #[test]
    fn fremde_identitaet_findet_keinen_schluessel() {
        let paare = test_paare();
        let empfaenger: BTreeMap<_, _> = empfaenger_von(&paare[..2]);

        let umschlag = fuer_empfaenger_verschluesseln(b"geheim", &empfaenger).unwrap();

        // carol war nicht Teil der Empfaengermenge
        let ergebnis =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[2].1.private_key_pem, "carol");
        assert!(matches!(
            ergebnis,
            Err(KryptoError::SchluesselNichtGefunden(_))
        ));
    }

    #[test]
    fn falscher_privater_schluessel_schlaegt_fehl() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);

        let umschlag = fuer_empfaenger_verschluesseln(b"geheim", &empfaenger).unwrap();

        // bobs privater Schluessel gegen alices Kopie
        let ergebnis =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[1].1.private_key_pem, "alice");
        assert!(matches!(ergebnis, Err(KryptoError::Entschluesselung(_))));
    }

    #[test]
    fn zwei_umschlaege_sind_nie_gleich() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);
        let klartext = b"identischer Klartext";

        let a = fuer_empfaenger_verschluesseln(klartext, &empfaenger).unwrap();
        let b = fuer_empfaenger_verschluesseln(klartext, &empfaenger).unwrap();

        assert_ne!(a.iv, b.iv, "IV muss pro Umschlag frisch sein");
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(
            a.schluessel_fuer("alice"),
            b.schluessel_fuer("alice"),
            "Einmal-Schluessel muss pro Umschlag frisch sein"
        );
    }

    #[test]
    fn leere_empfaengermenge_wird_abgelehnt() {
        let leer = BTreeMap::new();
        let ergebnis = fuer_empfaenger_verschluesseln(b"hallo", &leer);
        assert!(matches!(ergebnis, Err(KryptoError::KeineEmpfaenger)));
    }

    #[test]
    fn kaputter_schluessel_bricht_alles_ab() {
        let paare = test_paare();
        let mut empfaenger = empfaenger_von(&paare[..1]);
        empfaenger.insert("mallory".to_string(), "kein PEM".to_string());

        let ergebnis = fuer_empfaenger_verschluesseln(b"hallo", &empfaenger);
        assert!(matches!(
            ergebnis,
            Err(KryptoError::UngueltigerSchluessel { ref identitaet, .. }) if identitaet.as_str() == "mallory"
        ));
    }

    #[test]
    fn blockgrenze_bekommt_vollen_extrablock() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);

        // 32 Bytes Klartext -> 48 Bytes Ciphertext (16 Bytes Polsterung)
        let klartext = [0x41u8; 32];
        let umschlag = fuer_empfaenger_verschluesseln(&klartext, &empfaenger).unwrap();
        assert_eq!(umschlag.ciphertext.len(), 48);

        let zurueck =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[0].1.private_key_pem, "alice")
                .unwrap();
        assert_eq!(zurueck, klartext);
    }

    #[test]
    fn leerer_klartext_rundreise() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);

        let umschlag = fuer_empfaenger_verschluesseln(b"", &empfaenger).unwrap();
        assert_eq!(umschlag.ciphertext.len(), 16);

        let zurueck =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[0].1.private_key_pem, "alice")
                .unwrap();
        assert!(zurueck.is_empty());
    }

    #[test]
    fn utf8_klartext_rundreise() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);
        let klartext = "Grüße aus München – 秘密のメッセージ".as_bytes();

        let umschlag = fuer_empfaenger_verschluesseln(klartext, &empfaenger).unwrap();
        let zurueck =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[0].1.private_key_pem, "alice")
                .unwrap();
        assert_eq!(zurueck, klartext);
    }

    #[test]
    fn gestutzter_ciphertext_wird_abgelehnt() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(&paare[..1]);

        let mut umschlag = fuer_empfaenger_verschluesseln(b"hallo welt", &empfaenger).unwrap();
        umschlag.ciphertext.truncate(umschlag.ciphertext.len() - 3);

        let ergebnis =
            fuer_empfaenger_entschluesseln(&umschlag, &paare[0].1.private_key_pem, "alice");
        assert!(matches!(ergebnis, Err(KryptoError::Entschluesselung(_))));
    }

    #[test]
    fn alle_kopien_oeffnen_denselben_schluessel() {
        let paare = test_paare();
        let empfaenger = empfaenger_von(paare);
        let klartext = b"ein Schluessel, drei Kopien";

        let umschlag = fuer_empfaenger_verschluesseln(klartext, &empfaenger).unwrap();

        // Die eingepackten Kopien unterscheiden sich (OAEP ist randomisiert),
        // oeffnen aber alle denselben Klartext.
        let kopien: Vec<_> = umschlag.wrapped_keys.values().collect();
        assert_ne!(kopien[0], kopien[1]);
        for (name, paar) in paare {
            let zurueck =
                fuer_empfaenger_entschluesseln(&umschlag, &paar.private_key_pem, name).unwrap();
            assert_eq!(zurueck, klartext);
        }
    }
}

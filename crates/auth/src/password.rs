//! Passwort-Hashing mit Argon2id
//!
//! Argon2id ist der empfohlene Algorithmus gemaess OWASP-Richtlinien.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

use crate::error::AuthError;

/// Argon2id-Parameter gemaess OWASP-Empfehlung: 64 MiB, 3 Iterationen, 1 Thread
fn argon2_instanz() -> Argon2<'static> {
    // Die Parameter sind Konstanten und immer gueltig, der Fallback auf
    // die Bibliotheks-Defaults ist nur fuer den Typ-Checker.
    let params = Params::new(64 * 1024, 3, 1, None).unwrap_or(Params::DEFAULT);
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
}

/// Hasht ein Passwort mit Argon2id und einem zufaelligen Salt
///
/// Gibt den PHC-String zurueck (inkl. Algorithmus, Parameter und Salt).
pub fn passwort_hashen(passwort: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2_instanz()
        .hash_password(passwort.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswortHashing(e.to_string()))
}

/// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
pub fn passwort_verifizieren(passwort: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

    match argon2_instanz().verify_password(passwort.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_und_verifikation() {
        let hash = passwort_hashen("streng-geheim").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(passwort_verifizieren("streng-geheim", &hash).unwrap());
        assert!(!passwort_verifizieren("falsch", &hash).unwrap());
    }

    #[test]
    fn gleiche_passwoerter_verschiedene_hashes() {
        let a = passwort_hashen("gleich").unwrap();
        let b = passwort_hashen("gleich").unwrap();
        assert_ne!(a, b, "Salt muss pro Hash frisch sein");
    }
}

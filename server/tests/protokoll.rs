//! End-to-End-Tests ueber das TCP-Protokoll
//!
//! Startet den Transport auf einem freien Port und spricht das
//! JSON-Zeilen-Protokoll wie ein echter Client.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

use fluesterpost_auth::{AuthService, SessionStore};
use fluesterpost_chat::SitzungsService;
use fluesterpost_hub::HubRegister;
use fluesterpost_server::config::ServerConfig;
use fluesterpost_server::transport::{Dienste, TransportServer};
use fluesterpost_store::MemorySpeicher;

async fn server_starten() -> (SocketAddr, watch::Sender<bool>) {
    let speicher = Arc::new(MemorySpeicher::neu());
    let dienste = Arc::new(Dienste {
        auth: AuthService::neu(Arc::clone(&speicher), SessionStore::neu()),
        chat: SitzungsService::neu(Arc::clone(&speicher)),
        hub: HubRegister::neu(Arc::clone(&speicher)),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = TransportServer::neu(Arc::new(ServerConfig::default()), dienste);
    tokio::spawn(server.starten_mit(listener, shutdown_rx));

    (addr, shutdown_tx)
}

struct TestClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TestClient {
    /// Verbindet und konsumiert die Willkommensnachricht
    async fn verbinden(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(256 * 1024)),
        };
        let willkommen = client.empfangen().await;
        assert_eq!(willkommen["type"], "willkommen");
        client
    }

    async fn senden(&mut self, befehl: Value) {
        self.framed.send(befehl.to_string()).await.unwrap();
    }

    async fn empfangen(&mut self) -> Value {
        let zeile = timeout(Duration::from_secs(10), self.framed.next())
            .await
            .expect("Timeout beim Warten auf Antwort")
            .expect("Verbindung geschlossen")
            .expect("Frame-Fehler");
        serde_json::from_str(&zeile).expect("Antwort ist kein JSON")
    }

    /// Ueberspringt Zeilen bis zum gesuchten `type`
    async fn empfangen_bis(&mut self, typ: &str) -> Value {
        loop {
            let antwort = self.empfangen().await;
            if antwort["type"] == typ {
                return antwort;
            }
        }
    }

    /// Registriert und meldet an, gibt die Registered-Antwort zurueck
    async fn konto_anlegen(&mut self, username: &str) -> Value {
        self.senden(json!({"type": "register", "username": username, "password": "geheim123"}))
            .await;
        let registered = self.empfangen().await;
        assert_eq!(registered["type"], "registered", "{registered}");

        self.senden(json!({"type": "login", "username": username, "password": "geheim123"}))
            .await;
        let logged_in = self.empfangen().await;
        assert_eq!(logged_in["type"], "logged_in", "{logged_in}");

        registered
    }
}

#[tokio::test]
async fn kompletter_nachrichtenfluss() {
    let (addr, _shutdown) = server_starten().await;

    let mut alice = TestClient::verbinden(addr).await;
    let mut bob = TestClient::verbinden(addr).await;

    alice.konto_anlegen("alice").await;
    let bob_registriert = bob.konto_anlegen("bob").await;
    let bob_private_key = bob_registriert["private_key"].as_str().unwrap().to_string();

    // Alice legt eine Sitzung mit Bob an
    alice
        .senden(json!({"type": "session_create", "participants": ["bob"]}))
        .await;
    let erstellt = alice.empfangen().await;
    assert_eq!(erstellt["type"], "session_created", "{erstellt}");
    let session_id = erstellt["session_id"].clone();

    // Beide betreten die Live-Sitzung
    alice
        .senden(json!({"type": "join", "session_id": session_id}))
        .await;
    alice.empfangen_bis("joined").await;
    bob.senden(json!({"type": "join", "session_id": session_id}))
        .await;
    bob.empfangen_bis("joined").await;

    // Alice sendet, Bob empfaengt redigiert und kann entschluesseln
    alice
        .senden(json!({"type": "message", "content": "hallo bob"}))
        .await;
    alice.empfangen_bis("message_sent").await;

    let event = bob.empfangen_bis("message").await;
    assert_eq!(event["sender_username"], "alice");

    let mut wrapped = BTreeMap::new();
    wrapped.insert(
        "bob".to_string(),
        event["encryption_key"].as_str().unwrap().to_string(),
    );
    let umschlag = fluesterpost_crypto::Umschlag {
        ciphertext: BASE64_STANDARD
            .decode(event["content"].as_str().unwrap())
            .unwrap(),
        iv: BASE64_STANDARD
            .decode(event["iv"].as_str().unwrap())
            .unwrap()
            .try_into()
            .unwrap(),
        wrapped_keys: wrapped,
    };
    let klartext =
        fluesterpost_crypto::fuer_empfaenger_entschluesseln(&umschlag, &bob_private_key, "bob")
            .unwrap();
    assert_eq!(klartext, b"hallo bob");

    // Historie liefert Bobs Schluesselkopie erneut
    bob.senden(json!({"type": "session_history", "session_id": session_id}))
        .await;
    let historie = bob.empfangen_bis("history").await;
    let messages = historie["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0]["encryption_key"].as_str().unwrap(),
        umschlag.schluessel_fuer("bob").unwrap()
    );
}

#[tokio::test]
async fn join_ohne_teilnahme_trennt_die_verbindung() {
    let (addr, _shutdown) = server_starten().await;

    let mut alice = TestClient::verbinden(addr).await;
    let mut mallory = TestClient::verbinden(addr).await;

    alice.konto_anlegen("alice").await;
    mallory.konto_anlegen("mallory").await;

    // Die Sitzung gehoert nur alice – der Ersteller wird dedupliziert
    alice
        .senden(json!({"type": "session_create", "participants": ["alice"]}))
        .await;
    let erstellt = alice.empfangen().await;
    let session_id = erstellt["session_id"].clone();

    mallory
        .senden(json!({"type": "join", "session_id": session_id}))
        .await;
    let fehler = mallory.empfangen().await;
    assert_eq!(fehler["type"], "error", "{fehler}");

    // Danach ist die Verbindung zu
    let naechste = timeout(Duration::from_secs(5), mallory.framed.next())
        .await
        .expect("Timeout beim Warten auf Verbindungsende");
    assert!(naechste.is_none(), "Server muss die Verbindung schliessen");
}

#[tokio::test]
async fn befehle_vor_anmeldung_werden_abgelehnt() {
    let (addr, _shutdown) = server_starten().await;

    let mut client = TestClient::verbinden(addr).await;
    client.senden(json!({"type": "session_list"})).await;
    let antwort = client.empfangen().await;
    assert_eq!(antwort["type"], "error");
}

#[tokio::test]
async fn session_token_kann_verbindung_fortsetzen() {
    let (addr, _shutdown) = server_starten().await;

    let mut erste = TestClient::verbinden(addr).await;
    erste.konto_anlegen("alice").await;

    // konto_anlegen hat die Login-Antwort konsumiert, neu anmelden fuer den Token
    erste
        .senden(json!({"type": "login", "username": "alice", "password": "geheim123"}))
        .await;
    let logged_in = erste.empfangen().await;
    let token = logged_in["token"].as_str().unwrap().to_string();

    let mut zweite = TestClient::verbinden(addr).await;
    zweite.senden(json!({"type": "auth", "token": token})).await;
    let auth = zweite.empfangen().await;
    assert_eq!(auth["type"], "authenticated", "{auth}");
    assert_eq!(auth["username"], "alice");
}

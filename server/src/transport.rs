//! TCP-Transport – Listener und Verbindungs-Tasks
//!
//! Der Listener akzeptiert Verbindungen und startet pro Client eine
//! eigene tokio-Task. Gerahmt wird mit JSON-Zeilen (`LinesCodec`).
//!
//! ## State Machine pro Verbindung
//! ```text
//! Verbunden -> Angemeldet -> InSitzung
//!     ^            |
//!     +-- Trennen -+
//! ```
//! Register/Login/Auth sind vor der Anmeldung erlaubt, alles andere
//! erst danach. Ein fehlgeschlagener Join trennt die Verbindung;
//! Nachricht- und Tipp-Fehler beantworten nur den Absender.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::{Framed, LinesCodec};

use fluesterpost_auth::AuthService;
use fluesterpost_chat::SitzungsService;
use fluesterpost_core::FluesterpostError;
use fluesterpost_hub::{HubRegister, Verbindung};
use fluesterpost_store::{BenutzerRecord, MemorySpeicher};

use crate::config::ServerConfig;
use crate::protocol::{ClientBefehl, ServerAntwort, SitzungsEintrag};

/// Gebuendelte Dienste fuer die Verbindungs-Tasks
pub struct Dienste {
    pub auth: AuthService<MemorySpeicher>,
    pub chat: SitzungsService<MemorySpeicher>,
    pub hub: HubRegister<MemorySpeicher>,
}

/// TCP-Server fuer das Client-Protokoll
pub struct TransportServer {
    config: Arc<ServerConfig>,
    dienste: Arc<Dienste>,
    verbindungen: Arc<AtomicUsize>,
}

impl TransportServer {
    pub fn neu(config: Arc<ServerConfig>, dienste: Arc<Dienste>) -> Self {
        Self {
            config,
            dienste,
            verbindungen: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Startet den Listener und akzeptiert Verbindungen bis zum Shutdown
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.tcp_bind_adresse()).await?;
        self.starten_mit(listener, shutdown_rx).await
    }

    /// Wie `starten`, aber mit bereits gebundenem Listener (fuer Tests)
    pub async fn starten_mit(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;

        tracing::info!(adresse = %lokale_addr, "TCP-Listener gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let aktiv = self.verbindungen.load(Ordering::Relaxed);
                            if aktiv >= self.config.server.max_verbindungen as usize {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.config.server.max_verbindungen,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            self.verbindungen.fetch_add(1, Ordering::Relaxed);

                            let task = KlientVerbindung::neu(
                                Arc::clone(&self.config),
                                Arc::clone(&self.dienste),
                                peer_addr,
                            );
                            let zaehler = Arc::clone(&self.verbindungen);
                            let shutdown = shutdown_rx.clone();
                            tokio::spawn(async move {
                                task.verarbeiten(stream, shutdown).await;
                                zaehler.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Transport: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP-Listener gestoppt");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verbindungs-Task
// ---------------------------------------------------------------------------

/// Ergebnis eines verarbeiteten Befehls
enum Ablauf {
    Weiter,
    Trennen,
}

/// Zustand einer einzelnen Client-Verbindung
struct KlientVerbindung {
    config: Arc<ServerConfig>,
    dienste: Arc<Dienste>,
    peer_addr: SocketAddr,
    angemeldet: Option<BenutzerRecord>,
    session_token: Option<String>,
    sitzung: Option<Verbindung>,
}

impl KlientVerbindung {
    fn neu(config: Arc<ServerConfig>, dienste: Arc<Dienste>, peer_addr: SocketAddr) -> Self {
        Self {
            config,
            dienste,
            peer_addr,
            angemeldet: None,
            session_token: None,
            sitzung: None,
        }
    }

    /// Haupt-Loop der Verbindung: Frames lesen, Hub-Events weiterreichen
    async fn verarbeiten(mut self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let codec = LinesCodec::new_with_max_length(self.config.netzwerk.max_zeilenlaenge);
        let mut framed = Framed::new(stream, codec);

        let begruessung = ServerAntwort::Willkommen {
            server_name: self.config.server.name.clone(),
            nachricht: self.config.server.willkommen.clone(),
        };
        if antwort_senden(&mut framed, &begruessung).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                zeile = framed.next() => {
                    match zeile {
                        Some(Ok(zeile)) => {
                            match self.zeile_verarbeiten(&mut framed, &zeile).await {
                                Ok(Ablauf::Weiter) => {}
                                Ok(Ablauf::Trennen) => break,
                                Err(_) => break,
                            }
                        }
                        Some(Err(e)) => {
                            tracing::debug!(peer = %self.peer_addr, fehler = %e, "Frame-Fehler");
                            break;
                        }
                        None => break,
                    }
                }

                event = sitzungs_event(&mut self.sitzung) => {
                    match event {
                        Some(event) => {
                            let json = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(e) => {
                                    tracing::error!(fehler = %e, "Event nicht serialisierbar");
                                    continue;
                                }
                            };
                            if framed.send(json).await.is_err() {
                                break;
                            }
                        }
                        // Hub hat die Verbindung aufgegeben
                        None => break,
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(peer = %self.peer_addr, "Verbindung beendet");
        // Drop von `sitzung` meldet das Verlassen beim Hub
    }

    /// Parst eine Zeile und fuehrt den Befehl aus
    async fn zeile_verarbeiten(
        &mut self,
        framed: &mut Framed<TcpStream, LinesCodec>,
        zeile: &str,
    ) -> Result<Ablauf, std::io::Error> {
        let befehl: ClientBefehl = match serde_json::from_str(zeile) {
            Ok(befehl) => befehl,
            Err(e) => {
                fehler_senden(framed, &format!("Ungueltiger Befehl: {e}")).await?;
                return Ok(Ablauf::Weiter);
            }
        };

        self.befehl_verarbeiten(framed, befehl).await
    }

    async fn befehl_verarbeiten(
        &mut self,
        framed: &mut Framed<TcpStream, LinesCodec>,
        befehl: ClientBefehl,
    ) -> Result<Ablauf, std::io::Error> {
        match befehl {
            ClientBefehl::Register { username, password } => {
                match self.dienste.auth.registrieren(&username, &password).await {
                    Ok(benutzer) => {
                        antwort_senden(
                            framed,
                            &ServerAntwort::Registered {
                                user_id: benutzer.id,
                                username: benutzer.username,
                                public_key: benutzer.public_key,
                                private_key: benutzer.private_key,
                            },
                        )
                        .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::Login { username, password } => {
                match self.dienste.auth.anmelden(&username, &password).await {
                    Ok((benutzer, session)) => {
                        let antwort = ServerAntwort::LoggedIn {
                            token: session.token.clone(),
                            user_id: benutzer.id,
                            username: benutzer.username.clone(),
                            public_key: benutzer.public_key.clone(),
                            private_key: benutzer.private_key.clone(),
                        };
                        self.session_token = Some(session.token);
                        self.angemeldet = Some(benutzer);
                        antwort_senden(framed, &antwort).await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::Auth { token } => {
                match self.dienste.auth.session_validieren(&token).await {
                    Ok(benutzer) => {
                        let antwort = ServerAntwort::Authenticated {
                            user_id: benutzer.id,
                            username: benutzer.username.clone(),
                        };
                        self.session_token = Some(token);
                        self.angemeldet = Some(benutzer);
                        antwort_senden(framed, &antwort).await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::Logout => {
                if let Some(token) = self.session_token.take() {
                    if let Err(e) = self.dienste.auth.abmelden(&token).await {
                        tracing::debug!(fehler = %e, "Abmelden ohne gueltige Session");
                    }
                }
                self.angemeldet = None;
                self.sitzung = None;
                antwort_senden(framed, &ServerAntwort::LoggedOut).await?;
            }

            ClientBefehl::SessionCreate { participants } => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Weiter);
                };
                match self
                    .dienste
                    .chat
                    .sitzung_erstellen(benutzer.id, &participants)
                    .await
                {
                    Ok(sitzung) => {
                        antwort_senden(
                            framed,
                            &ServerAntwort::SessionCreated {
                                session_id: sitzung.id,
                            },
                        )
                        .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::SessionList => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Weiter);
                };
                match self.dienste.chat.sitzungen_fuer_benutzer(benutzer.id).await {
                    Ok(sitzungen) => {
                        let sessions = sitzungen
                            .into_iter()
                            .map(|s| SitzungsEintrag {
                                session_id: s.id,
                                created_at: s.created_at,
                            })
                            .collect();
                        antwort_senden(framed, &ServerAntwort::Sessions { sessions }).await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::SessionHistory { session_id } => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Weiter);
                };
                match self
                    .dienste
                    .chat
                    .nachrichten_laden(session_id, benutzer.id)
                    .await
                {
                    Ok(messages) => {
                        antwort_senden(
                            framed,
                            &ServerAntwort::History {
                                session_id,
                                messages,
                            },
                        )
                        .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::ParticipantAdd {
                session_id,
                username,
            } => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Weiter);
                };
                match self
                    .dienste
                    .chat
                    .teilnehmer_hinzufuegen(session_id, benutzer.id, &username)
                    .await
                {
                    Ok(()) => {
                        antwort_senden(
                            framed,
                            &ServerAntwort::ParticipantAdded {
                                session_id,
                                username,
                            },
                        )
                        .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::ParticipantRemove {
                session_id,
                username,
            } => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Weiter);
                };
                match self
                    .dienste
                    .chat
                    .teilnehmer_entfernen(session_id, benutzer.id, &username)
                    .await
                {
                    Ok(removed) => {
                        antwort_senden(
                            framed,
                            &ServerAntwort::ParticipantRemoved {
                                session_id,
                                username,
                                removed,
                            },
                        )
                        .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::Join { session_id } => {
                let Some(benutzer) = self.angemeldet.clone() else {
                    fehler_senden(framed, "Nicht angemeldet").await?;
                    return Ok(Ablauf::Trennen);
                };
                match self.dienste.hub.beitreten(session_id, benutzer.id).await {
                    Ok(verbindung) => {
                        let antwort = ServerAntwort::Joined {
                            session_id,
                            username: verbindung.username().to_string(),
                        };
                        self.sitzung = Some(verbindung);
                        antwort_senden(framed, &antwort).await?;
                    }
                    Err(e) => {
                        // Fehlgeschlagener Join trennt die Verbindung
                        dienst_fehler_senden(framed, e).await?;
                        return Ok(Ablauf::Trennen);
                    }
                }
            }

            ClientBefehl::Message { content } => {
                let Some(verbindung) = &self.sitzung else {
                    fehler_senden(framed, "Keiner Sitzung beigetreten").await?;
                    return Ok(Ablauf::Weiter);
                };
                match verbindung.nachricht_senden(&content).await {
                    Ok(message_id) => {
                        antwort_senden(framed, &ServerAntwort::MessageSent { message_id })
                            .await?;
                    }
                    Err(e) => dienst_fehler_senden(framed, e).await?,
                }
            }

            ClientBefehl::Typing { is_typing } => {
                if let Some(verbindung) = &self.sitzung {
                    verbindung.tippen(is_typing);
                }
                // Kein Ack – fire-and-forget wie beim Hub
            }
        }

        Ok(Ablauf::Weiter)
    }
}

/// Wartet auf das naechste Hub-Event, haengt ewig ohne Sitzung
async fn sitzungs_event(sitzung: &mut Option<Verbindung>) -> Option<fluesterpost_hub::DrahtEvent> {
    match sitzung {
        Some(verbindung) => verbindung.naechstes_event().await,
        None => std::future::pending().await,
    }
}

async fn antwort_senden(
    framed: &mut Framed<TcpStream, LinesCodec>,
    antwort: &ServerAntwort,
) -> Result<(), std::io::Error> {
    let json = serde_json::to_string(antwort)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    framed
        .send(json)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
}

/// Uebersetzt einen Dienst-Fehler in die zentrale Taxonomie und meldet ihn
async fn dienst_fehler_senden(
    framed: &mut Framed<TcpStream, LinesCodec>,
    fehler: impl Into<FluesterpostError>,
) -> Result<(), std::io::Error> {
    let fehler: FluesterpostError = fehler.into();
    fehler_senden(framed, &fehler.to_string()).await
}

async fn fehler_senden(
    framed: &mut Framed<TcpStream, LinesCodec>,
    message: &str,
) -> Result<(), std::io::Error> {
    antwort_senden(
        framed,
        &ServerAntwort::Error {
            message: message.to_string(),
        },
    )
    .await
}

//! fluesterpost-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und verdrahtet die Dienste: Speicher,
//! Auth, Sitzungsverwaltung und Hub-Register teilen sich denselben
//! In-Memory-Speicher.

pub mod config;
pub mod protocol;
pub mod transport;

use std::sync::Arc;

use anyhow::Result;
use fluesterpost_auth::{AuthService, SessionStore};
use fluesterpost_chat::SitzungsService;
use fluesterpost_hub::HubRegister;
use fluesterpost_store::MemorySpeicher;

use config::ServerConfig;
use transport::{Dienste, TransportServer};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Speicher und Dienste verdrahten
    /// 2. TCP-Listener starten
    /// 3. Auf Ctrl-C warten, dann Shutdown signalisieren
    pub async fn starten(self) -> Result<()> {
        let config = Arc::new(self.config);

        tracing::info!(
            server_name = %config.server.name,
            tcp = %config.tcp_bind_adresse(),
            "Server startet"
        );

        let speicher = Arc::new(MemorySpeicher::neu());
        let sessions = SessionStore::mit_cleanup(SessionStore::neu());
        let dienste = Arc::new(Dienste {
            auth: AuthService::neu(Arc::clone(&speicher), sessions),
            chat: SitzungsService::neu(Arc::clone(&speicher)),
            hub: HubRegister::neu(Arc::clone(&speicher)),
        });

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let transport = TransportServer::neu(Arc::clone(&config), dienste);
        let transport_task = tokio::spawn(transport.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        transport_task.await??;

        Ok(())
    }
}

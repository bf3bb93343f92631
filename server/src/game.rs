//! The game loop: one task that exclusively owns the `World` and every
//! session record. All world-mutating code runs here, interleaving with
//! other tasks only at database awaits and channel operations — the
//! cooperative contract the rest of the codebase assumes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::commands;
use crate::credential::{CredentialVerifier, Sha256Verifier};
use crate::net::Outbox;
use crate::session::{Session, SessionState};
use crate::ticker::Ticker;
use crate::world::World;
use crate::SessionId;

#[derive(Debug)]
pub enum GameEvent {
    Connected { session: SessionId, outbox: Outbox, addr: String },
    Line { session: SessionId, line: String },
    Disconnected { session: SessionId },
}

pub struct GameServer {
    world: World,
    sessions: HashMap<SessionId, Session>,
    verifier: Sha256Verifier,
    events_rx: mpsc::UnboundedReceiver<GameEvent>,
    shutdown: watch::Receiver<bool>,
    tick_secs: f64,
}

impl GameServer {
    pub fn new(
        world: World,
        events_rx: mpsc::UnboundedReceiver<GameEvent>,
        shutdown: watch::Receiver<bool>,
        tick_secs: f64,
    ) -> GameServer {
        GameServer {
            world,
            sessions: HashMap::new(),
            verifier: Sha256Verifier,
            events_rx,
            shutdown,
            tick_secs,
        }
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(self.tick_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut ticker = Ticker::new();

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                _ = interval.tick() => {
                    ticker.tick(&mut self.world).await;
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.drain().await;
    }

    async fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Connected { session, outbox, addr } => {
                let record = Session::new(session, addr, outbox);
                record.greet();
                self.sessions.insert(session, record);
            }
            GameEvent::Line { session, line } => {
                self.handle_line(session, line).await;
            }
            GameEvent::Disconnected { session } => {
                if let Some(mut record) = self.sessions.remove(&session) {
                    log::info!("Session {} ({}) disconnected.", session, record.addr);
                    record.cleanup(&mut self.world).await;
                }
            }
        }
    }

    async fn handle_line(&mut self, session_id: SessionId, line: String) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            // Late line from a torn-down session; nothing to do.
            return;
        };

        let keep = if session.is_playing() {
            match session.character_id {
                Some(cn) => {
                    let keep = commands::dispatch(&mut self.world, cn, &line).await;
                    if keep {
                        session.send_prompt(&self.world);
                    }
                    keep
                }
                None => false,
            }
        } else {
            session
                .handle_login_line(&mut self.world, &self.verifier, &line)
                .await
        };

        if !keep {
            if let Some(mut record) = self.sessions.remove(&session_id) {
                record.cleanup(&mut self.world).await;
            }
        }
    }

    /// Shutdown: tell everyone, run every cleanup path, flush the world.
    async fn drain(&mut self) {
        log::info!("Draining {} session(s) for shutdown.", self.sessions.len());
        for (_, session) in self.sessions.iter() {
            if matches!(session.state, SessionState::Playing) {
                session.send("{RThe world holds its breath... the server is shutting down.{x");
            }
        }
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Some(mut record) = self.sessions.remove(&id) {
                record.cleanup(&mut self.world).await;
            }
        }
    }
}

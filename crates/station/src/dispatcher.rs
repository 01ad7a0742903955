//! Funil de ingestão – vários produtores, um consumidor.
//!
//! Todas as fontes empurram leituras para um único canal limitado; uma
//! thread dedicada consome, aplica no [`StateStore`] e republica os
//! eventos para os assinantes. `ingest` nunca roda em duas threads ao
//! mesmo tempo, e a ordem por canal é a ordem de produção.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use sensoria_core::AlarmTransition;
use sensoria_core::store::{MonitorEvent, StateStore};
use sensoria_core::types::Reading;
use tracing::{debug, info, warn};

/// Capacidade do canal de entrada (leituras).
///
/// Produtores usam send bloqueante: contrapressão em vez de perda.
const INTAKE_CAPACITY: usize = 256;

/// Capacidade do canal de cada assinante (eventos).
pub const SUBSCRIBER_CAPACITY: usize = 256;

type SubscriberList = Arc<Mutex<Vec<Sender<MonitorEvent>>>>;

/// Funil central da estação.
pub struct Dispatcher {
    intake_tx: Sender<Reading>,
    subscribers: SubscriberList,
    consumer: JoinHandle<()>,
}

impl Dispatcher {
    /// Sobe a thread consumidora sobre o estado dado.
    pub fn start(store: Arc<StateStore>) -> Self {
        let (intake_tx, intake_rx) = bounded::<Reading>(INTAKE_CAPACITY);
        let subscribers: SubscriberList = Arc::new(Mutex::new(Vec::new()));

        let consumer_subs = Arc::clone(&subscribers);
        let consumer = std::thread::Builder::new()
            .name("ingest".into())
            .spawn(move || consumer_loop(intake_rx, store, consumer_subs))
            .expect("Falha ao criar thread de ingestão");

        Self {
            intake_tx,
            subscribers,
            consumer,
        }
    }

    /// Clona o lado produtor do funil para uma fonte.
    pub fn intake(&self) -> Sender<Reading> {
        self.intake_tx.clone()
    }

    /// Registra um assinante de eventos.
    ///
    /// Assinante lento perde eventos em vez de travar a ingestão; o
    /// retrato fiel continua disponível via snapshot do estado.
    pub fn subscribe(&self) -> Receiver<MonitorEvent> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Encerra o consumidor. Chamar depois de parar as fontes.
    ///
    /// Derruba o lado produtor local; o consumidor drena o que restou
    /// no funil e devolve.
    pub fn shutdown(self) {
        drop(self.intake_tx);
        if self.consumer.join().is_err() {
            warn!("Thread de ingestão terminou em pânico");
        }
    }
}

/// Loop da thread consumidora: termina quando o último produtor cai.
fn consumer_loop(intake: Receiver<Reading>, store: Arc<StateStore>, subscribers: SubscriberList) {
    info!("Ingestão ativa ({} canais)", store.channel_count());

    for reading in intake.iter() {
        let outcome = match store.ingest(&reading) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Leitura rejeitada: {e}");
                continue;
            }
        };

        publish(
            &subscribers,
            MonitorEvent::Reading {
                channel: outcome.channel,
                value: outcome.value,
                stamp: reading.stamp.clone(),
            },
        );

        match (outcome.transition, outcome.breach) {
            (AlarmTransition::EnteredAlarm, Some(breach)) => {
                publish(
                    &subscribers,
                    MonitorEvent::AlarmRaised {
                        channel: outcome.channel,
                        value: outcome.value,
                        breach,
                    },
                );
            }
            (AlarmTransition::Recovered, _) => {
                publish(
                    &subscribers,
                    MonitorEvent::AlarmCleared {
                        channel: outcome.channel,
                        value: outcome.value,
                    },
                );
            }
            _ => {}
        }
    }

    info!("Ingestão encerrada");
}

/// Replica um evento para todos os assinantes vivos.
fn publish(subscribers: &SubscriberList, event: MonitorEvent) {
    let mut subs = subscribers.lock();
    subs.retain(|tx| match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!("Assinante cheio, evento descartado");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    });
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

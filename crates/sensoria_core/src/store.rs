//! Estado compartilhado da estação.
//!
//! Um único [`StateStore`] concentra o estado de todos os canais atrás
//! de um `RwLock`. Toda mutação passa por [`StateStore::ingest`];
//! leitores tiram um [`StoreSnapshot`] consistente, nunca uma visão
//! rasgada no meio de uma atualização.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::alarm::{self, AlarmTransition, LimitBreach, SafeRange};
use crate::config::ChannelConfig;
use crate::types::{ChannelId, Reading};

/// Quantidade de pontos de histórico retidos por canal.
pub const HISTORY_CAPACITY: usize = 20;

// ──────────────────────────────────────────────
// Estado por canal
// ──────────────────────────────────────────────

/// Um ponto de histórico (hora, valor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub stamp: String,
    pub value: f64,
}

/// Estado corrente de um canal. Mutado apenas por `ingest`.
#[derive(Debug)]
struct ChannelState {
    name: String,
    range: Option<SafeRange>,
    latest_value: f64,
    history: VecDeque<HistoryPoint>,
    alarm_active: bool,
    samples_seen: u64,
}

impl ChannelState {
    fn new(cfg: &ChannelConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            range: cfg.range(),
            latest_value: cfg.initial_value,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            alarm_active: false,
            samples_seen: 0,
        }
    }

    /// Anexa um ponto, despejando o mais antigo quando cheio.
    fn push_history(&mut self, point: HistoryPoint) {
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(point);
    }
}

// ──────────────────────────────────────────────
// Resultados e eventos
// ──────────────────────────────────────────────

/// Resultado de uma ingestão bem-sucedida.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub channel: ChannelId,
    pub value: f64,
    pub transition: AlarmTransition,
    /// Limite violado, quando o canal ficou/continua em alarme
    pub breach: Option<LimitBreach>,
    /// OR dos flags de alarme logo após esta leitura
    pub global_alarm: bool,
}

/// Erros do estado compartilhado.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Canal {channel} desconhecido (configurados: 0..{channel_count})")]
    UnknownChannel {
        channel: ChannelId,
        channel_count: usize,
    },
}

/// Eventos publicados para assinantes do pipeline.
///
/// `Reading` sai a cada ingestão; os eventos de alarme saem apenas nas
/// bordas da transição.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Uma leitura foi absorvida pelo estado
    Reading {
        channel: ChannelId,
        value: f64,
        stamp: String,
    },
    /// O canal saiu da faixa segura
    AlarmRaised {
        channel: ChannelId,
        value: f64,
        breach: LimitBreach,
    },
    /// O canal voltou para a faixa segura
    AlarmCleared { channel: ChannelId, value: f64 },
}

// ──────────────────────────────────────────────
// Snapshot
// ──────────────────────────────────────────────

/// Cópia consistente do estado de um canal.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    pub latest_value: f64,
    pub history: Vec<HistoryPoint>,
    pub alarm_active: bool,
    /// Total de leituras absorvidas; 0 = aguardando o primeiro pacote
    pub samples_seen: u64,
}

/// Cópia consistente do estado da estação inteira.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub channels: Vec<ChannelSnapshot>,
    pub global_alarm: bool,
}

impl StoreSnapshot {
    /// Quantos canais estão em alarme neste instante.
    pub fn alarmed_count(&self) -> usize {
        self.channels.iter().filter(|c| c.alarm_active).count()
    }
}

// ──────────────────────────────────────────────
// StateStore
// ──────────────────────────────────────────────

struct StoreInner {
    channels: Vec<ChannelState>,
    global_alarm: bool,
}

/// Estado compartilhado de todos os canais da estação.
///
/// Thread-safe; produtores e leitores compartilham via `Arc`.
pub struct StateStore {
    inner: RwLock<StoreInner>,
}

impl StateStore {
    /// Cria o estado a partir da tabela de canais configurados.
    ///
    /// Todos os canais nascem com o valor inicial, histórico vazio e
    /// alarme desligado.
    pub fn new(channels: &[ChannelConfig]) -> Self {
        let channels = channels.iter().map(ChannelState::new).collect();
        Self {
            inner: RwLock::new(StoreInner {
                channels,
                global_alarm: false,
            }),
        }
    }

    /// Quantidade de canais configurados.
    pub fn channel_count(&self) -> usize {
        self.inner.read().channels.len()
    }

    /// Nomes de exibição dos canais, em ordem.
    pub fn channel_names(&self) -> Vec<String> {
        self.inner
            .read()
            .channels
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Flag global de alarme (OR de todos os canais).
    pub fn global_alarm(&self) -> bool {
        self.inner.read().global_alarm
    }

    /// Absorve uma leitura: valor corrente, histórico e alarme do canal.
    ///
    /// Única via de mutação do estado. Leitura de canal desconhecido é
    /// rejeitada sem tocar canal algum.
    pub fn ingest(&self, reading: &Reading) -> Result<IngestOutcome, StoreError> {
        let mut inner = self.inner.write();
        let channel_count = inner.channels.len();

        let state = inner
            .channels
            .get_mut(reading.channel)
            .ok_or(StoreError::UnknownChannel {
                channel: reading.channel,
                channel_count,
            })?;

        state.latest_value = reading.value;
        state.push_history(HistoryPoint {
            stamp: reading.stamp.clone(),
            value: reading.value,
        });
        state.samples_seen += 1;

        let decision = alarm::evaluate(state.range.as_ref(), reading.value, state.alarm_active);
        state.alarm_active = decision.active;

        let global_alarm = inner.channels.iter().any(|c| c.alarm_active);
        inner.global_alarm = global_alarm;

        Ok(IngestOutcome {
            channel: reading.channel,
            value: reading.value,
            transition: decision.transition,
            breach: decision.breach,
            global_alarm,
        })
    }

    /// Tira uma cópia consistente do estado inteiro.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read();
        StoreSnapshot {
            channels: inner
                .channels
                .iter()
                .map(|c| ChannelSnapshot {
                    name: c.name.clone(),
                    latest_value: c.latest_value,
                    history: c.history.iter().cloned().collect(),
                    alarm_active: c.alarm_active,
                    samples_seen: c.samples_seen,
                })
                .collect(),
            global_alarm: inner.global_alarm,
        }
    }

    /// Esvazia o histórico de todos os canais.
    ///
    /// Valor corrente, flag de alarme e contadores ficam intactos.
    pub fn reset_histories(&self) {
        let mut inner = self.inner.write();
        for ch in inner.channels.iter_mut() {
            ch.history.clear();
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

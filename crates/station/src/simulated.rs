//! Fonte simulada – caminhada aleatória por canal.
//!
//! Replica uma bancada de sensores sem hardware: cada canal anda em
//! passos uniformes de ±3.0 a partir do valor inicial configurado,
//! nunca abaixo de zero, no seu próprio período. Canais não são
//! sincronizados entre si.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sensoria_core::config::ChannelConfig;
use sensoria_core::types::{ChannelId, Reading};
use tracing::debug;

use crate::source::TelemetrySource;

/// Amplitude do passo da caminhada.
const STEP_RANGE: f64 = 3.0;

/// Fonte simulada de um único canal.
pub struct SimulatedChannel {
    channel: ChannelId,
    name: String,
    start_value: f64,
    interval: Duration,
    current: f64,
    reset: Arc<AtomicBool>,
}

impl SimulatedChannel {
    pub fn new(channel: ChannelId, cfg: &ChannelConfig) -> Self {
        Self {
            channel,
            name: cfg.name.clone(),
            start_value: cfg.initial_value,
            interval: Duration::from_secs_f64(cfg.interval_secs),
            current: cfg.initial_value,
            reset: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Um passo da caminhada; aplica reinício pendente antes de andar.
    ///
    /// Leituras são grandezas físicas: o valor nunca fica negativo.
    fn advance(&mut self, rng: &mut SmallRng) -> f64 {
        if self.reset.swap(false, Ordering::Relaxed) {
            debug!("Canal {} reiniciado para {}", self.name, self.start_value);
            self.current = self.start_value;
        }
        let step = rng.gen_range(-STEP_RANGE..=STEP_RANGE);
        self.current = (self.current + step).max(0.0);
        self.current
    }
}

impl TelemetrySource for SimulatedChannel {
    fn name(&self) -> String {
        format!("sim-{}", self.channel)
    }

    fn run(&mut self, intake: Sender<Reading>, running: Arc<AtomicBool>) {
        let mut rng = SmallRng::from_entropy();

        while running.load(Ordering::Relaxed) {
            let value = self.advance(&mut rng);
            if intake.send(Reading::now(self.channel, value)).is_err() {
                // Consumidor desligou; nada mais a produzir
                break;
            }
            std::thread::sleep(self.interval);
        }
    }

    fn reset_flag(&self) -> Option<Arc<AtomicBool>> {
        Some(Arc::clone(&self.reset))
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_cfg(initial: f64) -> ChannelConfig {
        ChannelConfig {
            name: "Test".into(),
            initial_value: initial,
            interval_secs: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn walk_never_goes_negative() {
        let mut src = SimulatedChannel::new(0, &channel_cfg(0.5));
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let v = src.advance(&mut rng);
            assert!(v >= 0.0, "caminhada ficou negativa: {v}");
        }
    }

    #[test]
    fn steps_are_bounded() {
        let mut src = SimulatedChannel::new(0, &channel_cfg(40.0));
        let mut rng = SmallRng::seed_from_u64(42);
        let mut last = 40.0;
        for _ in 0..1_000 {
            let v = src.advance(&mut rng);
            assert!(
                (v - last).abs() <= STEP_RANGE + 1e-9,
                "passo maior que o permitido: {last} -> {v}"
            );
            last = v;
        }
    }

    #[test]
    fn reset_returns_to_the_start_value() {
        let mut src = SimulatedChannel::new(0, &channel_cfg(37.5));
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..200 {
            src.advance(&mut rng);
        }

        src.reset_flag().unwrap().store(true, Ordering::Relaxed);
        let v = src.advance(&mut rng);
        assert!(
            (v - 37.5).abs() <= STEP_RANGE,
            "esperava voltar para perto de 37.5, veio {v}"
        );
    }
}

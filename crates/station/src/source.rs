//! Fontes de telemetria – trait e ciclo de vida das threads produtoras.
//!
//! Cada fonte roda em thread nomeada própria e empurra leituras para o
//! funil de ingestão. A parada é cooperativa: um flag compartilhado,
//! checado a cada ciclo, seguido de join.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use sensoria_core::types::Reading;
use tracing::{info, warn};

/// Uma fonte de leituras rodando em thread própria.
///
/// O loop deve checar `running` pelo menos uma vez por ciclo e devolver
/// quando o flag cair ou quando o lado consumidor do canal fechar.
pub trait TelemetrySource: Send + 'static {
    /// Nome da thread e dos logs desta fonte.
    fn name(&self) -> String;

    /// Corpo do loop produtor.
    fn run(&mut self, intake: Sender<Reading>, running: Arc<AtomicBool>);

    /// Flag de reinício observado pelo loop, quando a fonte suporta.
    fn reset_flag(&self) -> Option<Arc<AtomicBool>> {
        None
    }
}

/// Handle de uma fonte em execução.
pub struct SourceHandle {
    name: String,
    running: Arc<AtomicBool>,
    reset: Option<Arc<AtomicBool>>,
    thread: Option<JoinHandle<()>>,
}

impl SourceHandle {
    /// Nome da fonte.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pede o reinício da fonte, aplicado no próximo ciclo do loop.
    pub fn request_reset(&self) {
        if let Some(flag) = &self.reset {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Derruba o flag e espera a thread devolver.
    ///
    /// Quando retorna, a fonte já liberou seus recursos (porta serial
    /// inclusive).
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Fonte {} terminou em pânico", self.name);
            }
        }
    }
}

/// Sobe uma fonte em thread nomeada, já ligada ao funil.
pub fn spawn_source(mut source: impl TelemetrySource, intake: Sender<Reading>) -> SourceHandle {
    let name = source.name();
    let running = Arc::new(AtomicBool::new(true));
    let reset = source.reset_flag();

    let thread_running = Arc::clone(&running);
    let thread = std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            info!("Fonte {} iniciada", source.name());
            source.run(intake, thread_running);
            info!("Fonte {} encerrada", source.name());
        })
        .expect("Falha ao criar thread de fonte");

    SourceHandle {
        name,
        running,
        reset,
        thread: Some(thread),
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    /// Fonte de mentira: conta 0, 1, 2... e reinicia do zero sob demanda.
    struct TickSource {
        reset: Arc<AtomicBool>,
    }

    impl TelemetrySource for TickSource {
        fn name(&self) -> String {
            "tick".into()
        }

        fn run(&mut self, intake: Sender<Reading>, running: Arc<AtomicBool>) {
            let mut i = 0.0;
            while running.load(Ordering::Relaxed) {
                if self.reset.swap(false, Ordering::Relaxed) {
                    i = 0.0;
                }
                if intake.send(Reading::now(0, i)).is_err() {
                    break;
                }
                i += 1.0;
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        fn reset_flag(&self) -> Option<Arc<AtomicBool>> {
            Some(Arc::clone(&self.reset))
        }
    }

    fn tick_source() -> TickSource {
        TickSource {
            reset: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn produces_into_the_intake() {
        let (tx, rx) = bounded(1024);
        let handle = spawn_source(tick_source(), tx);
        assert_eq!(handle.name(), "tick");

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first.channel, 0);
        assert_eq!(first.value, 0.0);

        handle.stop();
    }

    #[test]
    fn stop_joins_and_releases_the_channel() {
        let (tx, rx) = bounded(1024);
        let handle = spawn_source(tick_source(), tx);

        let _ = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        handle.stop();

        // Depois do join nenhum produtor segura o canal
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn reset_restarts_the_count() {
        let (tx, rx) = bounded(1024);
        let handle = spawn_source(tick_source(), tx);

        // Espera a contagem avançar
        loop {
            let r = rx.recv_timeout(Duration::from_secs(1)).unwrap();
            if r.value >= 1.0 {
                break;
            }
        }

        handle.request_reset();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut saw_restart = false;
        while std::time::Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(r) if r.value == 0.0 => {
                    saw_restart = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }

        handle.stop();
        assert!(saw_restart, "esperava a contagem voltar ao zero");
    }
}

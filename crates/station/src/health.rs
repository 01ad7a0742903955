//! Sonda de saúde do host – CPU, RAM e temperatura de drive.
//!
//! Independente do pipeline de sensores: roda em thread própria com
//! cadência fixa e só emite log. Sem sensor de temperatura legível, o
//! valor é sorteado em 30–45 °C e marcado explicitamente como
//! sintético.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sysinfo::{Components, CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, info};

/// Origem de uma temperatura reportada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempOrigin {
    /// Lida de um sensor real
    Measured,
    /// Sorteada por falta de sensor legível
    Synthetic,
}

/// Temperatura de drive com origem explícita.
///
/// Valor sintético nunca se apresenta como medido.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTemp {
    pub celsius: f32,
    pub origin: TempOrigin,
}

impl DriveTemp {
    /// Sufixo de exibição da temperatura.
    pub fn suffix(&self) -> &'static str {
        match self.origin {
            TempOrigin::Measured => "°C",
            TempOrigin::Synthetic => "°C (sim)",
        }
    }
}

/// Amostra de saúde do host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostHealth {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub drive_temp: DriveTemp,
}

/// Sonda de saúde com o estado do sysinfo.
pub struct HealthProbe {
    sys: System,
    components: Components,
    rng: SmallRng,
}

impl HealthProbe {
    pub fn new() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        // Primeira leitura para inicializar os contadores de CPU
        sys.refresh_cpu_all();

        Self {
            sys,
            components: Components::new_with_refreshed_list(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Colhe uma amostra de CPU, RAM e temperatura de drive.
    pub fn sample(&mut self) -> HostHealth {
        self.sys.refresh_cpu_all();
        self.sys.refresh_memory();
        self.components.refresh(true);

        let total = self.sys.total_memory() as f64;
        let used = self.sys.used_memory() as f64;
        let ram_percent = if total > 0.0 {
            (used / total * 100.0) as f32
        } else {
            0.0
        };

        let drive_temp = match self.drive_temp_from_components() {
            Some(celsius) => DriveTemp {
                celsius,
                origin: TempOrigin::Measured,
            },
            None => DriveTemp {
                celsius: self.rng.gen_range(30.0..=45.0),
                origin: TempOrigin::Synthetic,
            },
        };

        HostHealth {
            cpu_percent: self.sys.global_cpu_usage(),
            ram_percent,
            drive_temp,
        }
    }

    /// Busca a temperatura de um drive nos components do sysinfo.
    fn drive_temp_from_components(&self) -> Option<f32> {
        for comp in self.components.iter() {
            let label = comp.label().to_lowercase();
            if label.contains("nvme")
                || label.contains("drive")
                || label.contains("disk")
                || label.contains("ssd")
            {
                if let Some(t) = comp.temperature() {
                    if t > 0.0 && t < 120.0 {
                        return Some(t);
                    }
                }
            }
        }
        None
    }
}

/// Sobe a sonda em thread própria, com a cadência dada.
///
/// A thread não é aguardada no desligamento: dorme em passos longos e
/// não segura recurso que exija liberação ordenada.
pub fn spawn_probe(interval: Duration, running: Arc<AtomicBool>) {
    std::thread::Builder::new()
        .name("health".into())
        .spawn(move || {
            let mut probe = HealthProbe::new();
            info!(
                "Sonda de saúde ativa (a cada {:.0}s)",
                interval.as_secs_f64()
            );

            while running.load(Ordering::Relaxed) {
                let health = probe.sample();
                info!(
                    "Host: CPU {:.1}% | RAM {:.1}% | Drive {:.1}{}",
                    health.cpu_percent,
                    health.ram_percent,
                    health.drive_temp.celsius,
                    health.drive_temp.suffix()
                );
                std::thread::sleep(interval);
            }
            debug!("Sonda de saúde encerrada");
        })
        .expect("Falha ao criar thread da sonda");
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_reports_plausible_percentages() {
        let mut probe = HealthProbe::new();
        let health = probe.sample();

        assert!((0.0..=100.0).contains(&health.cpu_percent));
        assert!((0.0..=100.0).contains(&health.ram_percent));
    }

    #[test]
    fn drive_temp_is_always_present_and_tagged() {
        let mut probe = HealthProbe::new();
        for _ in 0..5 {
            let t = probe.sample().drive_temp;
            match t.origin {
                TempOrigin::Measured => {
                    assert!(t.celsius > 0.0 && t.celsius < 120.0);
                    assert_eq!(t.suffix(), "°C");
                }
                TempOrigin::Synthetic => {
                    assert!((30.0..=45.0).contains(&t.celsius));
                    assert_eq!(t.suffix(), "°C (sim)");
                }
            }
        }
    }
}

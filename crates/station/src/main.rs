//! # Sensoria Station
//!
//! Estação de monitoramento de sensores: fontes simuladas ou uma porta
//! serial alimentam um funil de ingestão com estado compartilhado,
//! histórico limitado por canal e alarmes por faixa segura.
//!
//! ## Uso
//! ```bash
//! sensoria_station                      # modo do config.toml
//! sensoria_station --serial             # força a fonte serial
//! sensoria_station --simulated          # força as fontes simuladas
//! sensoria_station --config outro.toml  # config alternativo
//! ```
//!
//! ## Sinais
//! - `SIGINT` / `SIGTERM`: desligamento ordenado
//! - `SIGHUP`: limpa os históricos e reinicia a simulação

mod dispatcher;
mod health;
mod serial;
mod simulated;
mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sensoria_core::config::AppConfig;
use sensoria_core::store::{MonitorEvent, StateStore};
use tracing::{debug, error, info, warn};

use dispatcher::Dispatcher;
use serial::SerialLink;
use simulated::SimulatedChannel;
use source::{SourceHandle, spawn_source};

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config_path = config_path_from_args();
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    // Flags de modo sobrepõem o arquivo
    if std::env::args().any(|a| a == "--serial") {
        config.station.mode = "serial".into();
    } else if std::env::args().any(|a| a == "--simulated") {
        config.station.mode = "simulated".into();
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        std::process::exit(1);
    }

    run(config);
}

/// Caminho do config: `--config <arquivo>` ou o padrão ao lado do exe.
fn config_path_from_args() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path)
}

fn run(config: AppConfig) {
    let store = Arc::new(StateStore::new(&config.channels));
    let dispatcher = Dispatcher::start(Arc::clone(&store));
    let events = dispatcher.subscribe();

    // ── Fontes ──
    let sources = start_sources(&config, &dispatcher);

    // ── Sonda de saúde ──
    let health_running = Arc::new(AtomicBool::new(true));
    if config.health.enabled {
        health::spawn_probe(
            Duration::from_secs_f64(config.health.interval_secs),
            Arc::clone(&health_running),
        );
    }

    // ── Sinais ──
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .expect("Falha ao registrar handler de sinal");
    }
    let refresh = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&refresh))
        .expect("Falha ao registrar handler de sinal");

    banner(&config, sources.len());

    // ── Loop de eventos ──
    let names = store.channel_names();
    let status_interval = Duration::from_secs_f64(config.station.status_interval_secs);
    let mut last_status = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        match events.recv_timeout(Duration::from_millis(250)) {
            Ok(event) => handle_event(&names, event),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if refresh.swap(false, Ordering::Relaxed) {
            info!("Reinício solicitado: histórico limpo, simulação do início");
            store.reset_histories();
            for source in &sources {
                source.request_reset();
            }
        }

        if last_status.elapsed() >= status_interval {
            log_status(&store);
            last_status = Instant::now();
        }
    }

    // ── Desligamento ordenado: fontes primeiro, depois o funil ──
    info!("Encerrando...");
    health_running.store(false, Ordering::Relaxed);
    for source in sources {
        debug!("Parando fonte {}", source.name());
        source.stop();
    }
    dispatcher.shutdown();

    log_status(&store);
    info!("Estação parada");
}

/// Sobe as fontes do modo configurado.
fn start_sources(config: &AppConfig, dispatcher: &Dispatcher) -> Vec<SourceHandle> {
    match config.station.mode.as_str() {
        "serial" => {
            let link = SerialLink::new(
                config.serial.port.clone(),
                config.serial.baud,
                config.channels.len(),
            );
            vec![spawn_source(link, dispatcher.intake())]
        }
        _ => config
            .channels
            .iter()
            .enumerate()
            .map(|(channel, cfg)| {
                spawn_source(SimulatedChannel::new(channel, cfg), dispatcher.intake())
            })
            .collect(),
    }
}

/// Reporta um evento do pipeline no log da estação.
fn handle_event(names: &[String], event: MonitorEvent) {
    match event {
        MonitorEvent::Reading {
            channel,
            value,
            stamp,
        } => {
            debug!("{} = {value:.2} [{stamp}]", channel_name(names, channel));
        }
        MonitorEvent::AlarmRaised {
            channel,
            value,
            breach,
        } => {
            warn!(
                "⚠ ALARME {}: {value:.2} (limite {})",
                channel_name(names, channel),
                breach.label()
            );
        }
        MonitorEvent::AlarmCleared { channel, value } => {
            info!("✓ Normalizado {}: {value:.2}", channel_name(names, channel));
        }
    }
}

fn channel_name(names: &[String], channel: usize) -> &str {
    names.get(channel).map(String::as_str).unwrap_or("?")
}

/// Linha periódica de status com o retrato corrente dos canais.
fn log_status(store: &StateStore) {
    let snap = store.snapshot();
    let mut parts = Vec::with_capacity(snap.channels.len());
    for ch in &snap.channels {
        if ch.samples_seen == 0 {
            parts.push(format!("{}: --", ch.name));
        } else if ch.alarm_active {
            parts.push(format!("{}: {:.2}!", ch.name, ch.latest_value));
        } else {
            parts.push(format!("{}: {:.2}", ch.name, ch.latest_value));
        }
    }

    let flag = if snap.global_alarm {
        format!("ALARME x{}", snap.alarmed_count())
    } else {
        "ok".into()
    };
    info!("[{flag}] {}", parts.join(" | "));
}

/// Banner de inicialização.
fn banner(config: &AppConfig, source_count: usize) {
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ SENSORIA STATION – ATIVA");
    println!("══════════════════════════════════════════════");
    println!("  Modo:      {}", config.station.mode);
    if config.station.mode == "serial" {
        println!(
            "  Porta:     {} @ {} baud",
            config.serial.port, config.serial.baud
        );
    }
    println!("  Canais:    {}", config.channels.len());
    println!("  Fontes:    {source_count}");
    println!(
        "  Histórico: {} pontos por canal",
        sensoria_core::HISTORY_CAPACITY
    );
    println!("══════════════════════════════════════════════");
    println!();
}

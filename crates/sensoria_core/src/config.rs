//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável define o modo de
//! aquisição, a porta serial, a sonda de saúde do host e a tabela de
//! canais com faixas seguras.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::alarm::SafeRange;

/// Configuração geral da estação.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Modo de aquisição: "simulated" ou "serial"
    pub mode: String,
    /// Intervalo da linha de status no log (segundos)
    pub status_interval_secs: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            mode: "simulated".into(),
            status_interval_secs: 5.0,
        }
    }
}

/// Configuração da porta serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Caminho da porta (ex: "/dev/ttyUSB0", "COM8")
    pub port: String,
    /// Baud rate
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud: 115_200,
        }
    }
}

/// Configuração da sonda de saúde do host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    /// Intervalo entre amostras (segundos)
    pub interval_secs: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10.0,
        }
    }
}

/// Configuração de um canal de sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Nome de exibição
    pub name: String,
    /// Valor inicial da caminhada simulada
    pub initial_value: f64,
    /// Período de amostragem da fonte simulada (segundos)
    pub interval_secs: f64,
    /// Limite inferior da faixa segura
    pub low: Option<f64>,
    /// Limite superior da faixa segura
    pub high: Option<f64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "Sensor".into(),
            initial_value: 0.0,
            interval_secs: 1.0,
            low: None,
            high: None,
        }
    }
}

impl ChannelConfig {
    fn new(name: &str, initial_value: f64, interval_secs: f64, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            initial_value,
            interval_secs,
            low: Some(low),
            high: Some(high),
        }
    }

    /// Faixa segura do canal, quando os dois limites estão presentes.
    ///
    /// Canal sem faixa nunca alarma.
    pub fn range(&self) -> Option<SafeRange> {
        match (self.low, self.high) {
            (Some(low), Some(high)) => Some(SafeRange::new(low, high)),
            _ => None,
        }
    }
}

/// Configuração raiz da estação.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub station: StationConfig,
    pub serial: SerialConfig,
    pub health: HealthConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            serial: SerialConfig::default(),
            health: HealthConfig::default(),
            channels: vec![
                ChannelConfig::new("Temperature", 37.5, 1.0, 20.0, 45.0),
                ChannelConfig::new("Vibration", 33.0, 0.5, 0.0, 50.0),
                ChannelConfig::new("Speed", 78.99, 0.8, 0.0, 150.0),
                ChannelConfig::new("Pressure", 10.89, 1.2, 5.0, 15.0),
                ChannelConfig::new("Optical Counter", 19.0, 2.0, 0.0, 1000.0),
            ],
        }
    }
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.station.mode.as_str() {
            "simulated" | "serial" => {}
            other => errors.push(format!("Modo desconhecido: {other:?} (simulated|serial)")),
        }
        // Intervalos alimentam Duration::from_secs_f64: NaN precisa cair aqui
        if !(1.0..=600.0).contains(&self.station.status_interval_secs) {
            errors.push(format!(
                "Intervalo de status inválido: {} (1–600 s)",
                self.station.status_interval_secs
            ));
        }

        if self.channels.is_empty() {
            errors.push("Nenhum canal configurado".into());
        }
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.name.trim().is_empty() {
                errors.push(format!("Canal {i} sem nome"));
            }
            if !(0.1..=60.0).contains(&ch.interval_secs) {
                errors.push(format!(
                    "Intervalo do canal {i} inválido: {} (0.1–60.0 s)",
                    ch.interval_secs
                ));
            }
            match (ch.low, ch.high) {
                (Some(low), Some(high)) if low > high => {
                    errors.push(format!("Faixa do canal {i} invertida: {low} > {high}"));
                }
                (Some(_), None) | (None, Some(_)) => {
                    errors.push(format!("Canal {i} com limite solto (defina low e high)"));
                }
                _ => {}
            }
        }

        if self.station.mode == "serial" {
            if self.serial.port.trim().is_empty() {
                errors.push("Porta serial vazia no modo serial".into());
            }
            if self.serial.baud == 0 {
                errors.push("Baud rate não pode ser 0".into());
            }
        }

        if self.health.enabled && !(1.0..=3600.0).contains(&self.health.interval_secs) {
            errors.push(format!(
                "Intervalo da sonda de saúde inválido: {} (1–3600 s)",
                self.health.interval_secs
            ));
        }

        errors
    }
}

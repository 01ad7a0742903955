//! Tipos básicos de leitura de sensores.
//!
//! Uma leitura é o par (canal, valor) carimbado com a hora de produção.
//! O carimbo é texto livre de exibição: fontes locais geram `HH:MM:SS`,
//! fontes seriais repassam o campo de hora do pacote sem interpretá-lo.

use serde::{Deserialize, Serialize};

/// Índice de canal dentro da estação (posição na configuração).
pub type ChannelId = usize;

// ──────────────────────────────────────────────
// Leitura
// ──────────────────────────────────────────────

/// Uma amostra produzida por uma fonte de telemetria.
///
/// Imutável depois de produzida; quem consome clona o que precisar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Canal de origem
    pub channel: ChannelId,
    /// Valor medido
    pub value: f64,
    /// Hora de produção (texto de exibição)
    pub stamp: String,
}

impl Reading {
    /// Cria uma leitura carimbada com a hora local atual.
    pub fn now(channel: ChannelId, value: f64) -> Self {
        Self {
            channel,
            value,
            stamp: now_stamp(),
        }
    }
}

/// Hora local corrente no formato de exibição (`HH:MM:SS`).
pub fn now_stamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_now_carries_wall_clock() {
        let r = Reading::now(2, 78.99);
        assert_eq!(r.channel, 2);
        assert_eq!(r.value, 78.99);
        assert_eq!(r.stamp.len(), 8, "esperado HH:MM:SS");
        assert_eq!(r.stamp.matches(':').count(), 2);
    }

    #[test]
    fn stamp_is_opaque_text() {
        let r = Reading {
            channel: 0,
            value: 1.0,
            stamp: "qualquer coisa".into(),
        };
        assert_eq!(r.stamp, "qualquer coisa");
    }
}

//! Faixas seguras e transições de alarme.
//!
//! Cada canal pode ter uma faixa `[low, high]` fixada na configuração.
//! Um valor fora da faixa liga o flag de alarme do canal; a avaliação
//! roda a cada leitura, mas só as bordas (entrada e saída do estado de
//! alarme) devem virar notificação.

use serde::{Deserialize, Serialize};

/// Faixa segura de um canal, inclusiva nos dois extremos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeRange {
    pub low: f64,
    pub high: f64,
}

impl SafeRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Qual limite o valor viola, se algum.
    ///
    /// NaN não compara menor nem maior que limite algum: nunca viola
    /// a faixa.
    pub fn breach(&self, value: f64) -> Option<LimitBreach> {
        if value < self.low {
            Some(LimitBreach::Low)
        } else if value > self.high {
            Some(LimitBreach::High)
        } else {
            None
        }
    }

    /// Verifica se o valor está dentro da faixa.
    pub fn contains(&self, value: f64) -> bool {
        self.breach(value).is_none()
    }
}

/// Limite violado por um valor fora da faixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitBreach {
    Low,
    High,
}

impl LimitBreach {
    /// Rótulo curto para logs ("LOW"/"HIGH").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

/// Transição de estado de alarme produzida por uma avaliação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTransition {
    /// Estava normal e saiu da faixa
    EnteredAlarm,
    /// Continua fora da faixa
    StillAlarm,
    /// Estava em alarme e voltou para a faixa
    Recovered,
    /// Continua dentro da faixa
    StillNormal,
}

impl AlarmTransition {
    /// Bordas são as únicas transições que geram notificação.
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::EnteredAlarm | Self::Recovered)
    }
}

/// Resultado de uma avaliação de alarme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmDecision {
    /// Novo estado do flag do canal
    pub active: bool,
    /// Transição em relação ao estado anterior
    pub transition: AlarmTransition,
    /// Limite violado, quando ativo
    pub breach: Option<LimitBreach>,
}

/// Avalia uma leitura contra a faixa do canal.
///
/// Canais sem faixa configurada nunca alarmam. Função pura: o chamador
/// guarda o flag resultante e decide o que fazer com a transição.
pub fn evaluate(range: Option<&SafeRange>, value: f64, was_active: bool) -> AlarmDecision {
    let breach = range.and_then(|r| r.breach(value));
    let active = breach.is_some();

    let transition = match (was_active, active) {
        (false, true) => AlarmTransition::EnteredAlarm,
        (true, true) => AlarmTransition::StillAlarm,
        (true, false) => AlarmTransition::Recovered,
        (false, false) => AlarmTransition::StillNormal,
    };

    AlarmDecision {
        active,
        transition,
        breach,
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: SafeRange = SafeRange {
        low: 20.0,
        high: 45.0,
    };

    #[test]
    fn boundary_values_are_safe() {
        assert!(RANGE.contains(20.0));
        assert!(RANGE.contains(45.0));
        assert!(RANGE.contains(30.0));
        assert!(!RANGE.contains(19.999));
        assert!(!RANGE.contains(45.001));
    }

    #[test]
    fn breach_reports_direction() {
        assert_eq!(RANGE.breach(10.0), Some(LimitBreach::Low));
        assert_eq!(RANGE.breach(50.0), Some(LimitBreach::High));
        assert_eq!(RANGE.breach(30.0), None);
        assert_eq!(LimitBreach::Low.label(), "LOW");
        assert_eq!(LimitBreach::High.label(), "HIGH");
    }

    #[test]
    fn edge_sequence_fires_once_per_episode() {
        let mut active = false;
        let mut transitions = Vec::new();
        for value in [30.0, 50.0, 52.0, 40.0] {
            let decision = evaluate(Some(&RANGE), value, active);
            active = decision.active;
            transitions.push(decision.transition);
        }

        assert_eq!(
            transitions,
            vec![
                AlarmTransition::StillNormal,
                AlarmTransition::EnteredAlarm,
                AlarmTransition::StillAlarm,
                AlarmTransition::Recovered,
            ]
        );
        assert_eq!(transitions.iter().filter(|t| t.is_edge()).count(), 2);
    }

    #[test]
    fn channel_without_range_never_alarms() {
        let decision = evaluate(None, 1e12, false);
        assert!(!decision.active);
        assert_eq!(decision.transition, AlarmTransition::StillNormal);
        assert_eq!(decision.breach, None);
    }

    #[test]
    fn nan_counts_as_inside() {
        let decision = evaluate(Some(&RANGE), f64::NAN, false);
        assert!(!decision.active);
        // Se o canal estava em alarme, NaN o recupera
        let decision = evaluate(Some(&RANGE), f64::NAN, true);
        assert_eq!(decision.transition, AlarmTransition::Recovered);
    }
}

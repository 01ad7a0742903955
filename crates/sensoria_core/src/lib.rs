//! # Sensoria Core
//!
//! Crate compartilhada que define os tipos de leitura, o protocolo de
//! linha das fontes seriais, a avaliação de alarmes, a configuração TOML
//! e o estado concorrente da estação de monitoramento Sensoria.
//!
//! ## Módulos
//! - [`types`] – Leituras (canal, valor, hora)
//! - [`protocol`] – Decode/encode das linhas `v0,...,vN,hora`
//! - [`alarm`] – Faixas seguras e transições de alarme
//! - [`config`] – Configuração unificada via TOML
//! - [`store`] – Estado compartilhado, snapshots e eventos

pub mod types;
pub mod protocol;
pub mod alarm;
pub mod config;
pub mod store;

// Re-exports convenientes
pub use alarm::{AlarmTransition, LimitBreach, SafeRange};
pub use config::AppConfig;
pub use protocol::{DecodeError, decode_line, encode_line};
pub use store::{HISTORY_CAPACITY, MonitorEvent, StateStore, StoreSnapshot};
pub use types::{ChannelId, Reading};

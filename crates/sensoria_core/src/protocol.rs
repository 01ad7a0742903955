//! Protocolo de linha das fontes seriais.
//!
//! Cada conjunto de amostras chega como uma linha de texto terminada em
//! `\n`, com os valores dos N canais em ordem e a hora no campo final:
//!
//! ```text
//! ┌──────┬──────┬─────┬────────┬──────────┐
//! │ v0   │ v1   │ ... │ v[N-1] │ HH:MM:SS │
//! └──────┴──────┴─────┴────────┴──────────┘
//! ```
//!
//! - Campos separados por vírgula, sem escape nem checksum
//! - Os N primeiros campos são decimais com ponto
//! - O campo final é a hora do pacote, repassada sem interpretação
//! - Linha vazia (ou só espaços) não carrega pacote

use crate::types::Reading;

/// Erros de decodificação de uma linha.
///
/// Sempre locais à linha: quem lê descarta a linha e segue para a
/// próxima.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Linha com {found} campos (esperados {expected}): {line:?}")]
    Arity {
        found: usize,
        expected: usize,
        line: String,
    },

    #[error("Campo {field_index} não é numérico: {line:?}")]
    Numeric { field_index: usize, line: String },
}

/// Decodifica uma linha do protocolo em uma leitura por canal.
///
/// Retorna `Ok(None)` para linhas sem pacote. Os ids de canal seguem a
/// posição do campo; todas as leituras compartilham a hora do campo
/// final.
pub fn decode_line(
    raw: &str,
    channel_count: usize,
) -> Result<Option<Vec<Reading>>, DecodeError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').collect();
    let expected = channel_count + 1;
    if fields.len() != expected {
        return Err(DecodeError::Arity {
            found: fields.len(),
            expected,
            line: line.to_string(),
        });
    }

    let stamp = fields[channel_count].trim();
    let mut readings = Vec::with_capacity(channel_count);
    for (i, field) in fields[..channel_count].iter().enumerate() {
        let value: f64 = field.trim().parse().map_err(|_| DecodeError::Numeric {
            field_index: i,
            line: line.to_string(),
        })?;
        readings.push(Reading {
            channel: i,
            value,
            stamp: stamp.to_string(),
        });
    }

    Ok(Some(readings))
}

/// Codifica valores e hora no formato de linha, com terminador.
///
/// Inverso de [`decode_line`]; usado por fontes de loopback e testes.
pub fn encode_line(values: &[f64], stamp: &str) -> String {
    let mut fields: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    fields.push(stamp.to_string());
    let mut line = fields.join(",");
    line.push('\n');
    line
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

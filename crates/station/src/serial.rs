//! Fonte serial – pacotes de linha lidos da porta configurada.
//!
//! Abre a porta em 8N1 sem flow control e alimenta o decodificador de
//! linhas. Linha malformada é descartada com aviso e o loop segue; erro
//! da porta encerra apenas esta fonte, com o restante da estação viva.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use sensoria_core::protocol::decode_line;
use sensoria_core::types::Reading;
use tracing::{error, info, warn};

use crate::source::TelemetrySource;

/// Pausa quando não há bytes pendentes.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Timeout de leitura da porta.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Limite de bytes acumulados de uma linha sem terminador.
const MAX_LINE_BYTES: usize = 1024;

/// Erros fatais de uma fonte serial.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Falha ao abrir {port}: {source}")]
    ConnectionFailed {
        port: String,
        source: serialport::Error,
    },

    #[error("Conexão serial perdida: {0}")]
    ConnectionLost(std::io::Error),
}

// ──────────────────────────────────────────────
// Fluxo de bytes
// ──────────────────────────────────────────────

/// Fluxo de bytes da porta – costura que permite exercitar o loop de
/// leitura sem hardware.
pub trait ByteStream: Send {
    /// Quantos bytes estão pendentes de leitura.
    fn available(&mut self) -> std::io::Result<usize>;

    /// Lê até `buf.len()` bytes; 0 significa nada novo neste instante.
    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl ByteStream for Box<dyn serialport::SerialPort> {
    fn available(&mut self) -> std::io::Result<usize> {
        self.bytes_to_read()
            .map(|n| n as usize)
            .map_err(std::io::Error::other)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            // Timeout não é erro: só não chegou nada dentro da janela
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

// ──────────────────────────────────────────────
// Remontagem de linhas
// ──────────────────────────────────────────────

/// Acumula bytes e devolve linhas completas, com decode UTF-8 tolerante.
pub struct LineAccumulator {
    buf: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl LineAccumulator {
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Anexa um pedaço e devolve as linhas terminadas até aqui.
    ///
    /// Bytes inválidos viram U+FFFD; uma linha que estoura o limite sem
    /// terminador é descartada inteira, até o próximo `\n`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    lines.push(String::from_utf8_lossy(&self.buf).into_owned());
                }
                self.buf.clear();
                continue;
            }
            if self.discarding {
                continue;
            }
            if self.buf.len() >= self.max_line {
                warn!("Linha acima de {} bytes descartada", self.max_line);
                self.buf.clear();
                self.discarding = true;
                continue;
            }
            self.buf.push(byte);
        }

        lines
    }
}

// ──────────────────────────────────────────────
// Fonte serial
// ──────────────────────────────────────────────

/// Fonte de leituras vinda de uma porta serial.
pub struct SerialLink {
    port_path: String,
    baud: u32,
    channel_count: usize,
}

impl SerialLink {
    pub fn new(port_path: impl Into<String>, baud: u32, channel_count: usize) -> Self {
        Self {
            port_path: port_path.into(),
            baud,
            channel_count,
        }
    }

    fn open(&self) -> Result<Box<dyn serialport::SerialPort>, SourceError> {
        serialport::new(self.port_path.as_str(), self.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| SourceError::ConnectionFailed {
                port: self.port_path.clone(),
                source: e,
            })
    }

    /// Loop de leitura sobre um fluxo já aberto.
    ///
    /// `Ok(())` na parada cooperativa ou quando o consumidor desliga;
    /// `Err` quando a porta falha no meio.
    fn run_stream(
        &self,
        stream: &mut dyn ByteStream,
        intake: &Sender<Reading>,
        running: &AtomicBool,
    ) -> Result<(), SourceError> {
        let mut lines = LineAccumulator::new(MAX_LINE_BYTES);
        let mut buf = [0u8; 256];

        while running.load(Ordering::Relaxed) {
            let pending = stream.available().map_err(SourceError::ConnectionLost)?;
            if pending == 0 {
                std::thread::sleep(IDLE_SLEEP);
                continue;
            }

            let n = stream
                .read_chunk(&mut buf)
                .map_err(SourceError::ConnectionLost)?;
            for line in lines.feed(&buf[..n]) {
                match decode_line(&line, self.channel_count) {
                    Ok(Some(batch)) => {
                        for reading in batch {
                            if intake.send(reading).is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Linha descartada: {e}"),
                }
            }
        }

        Ok(())
    }
}

impl TelemetrySource for SerialLink {
    fn name(&self) -> String {
        format!(
            "serial-{}",
            self.port_path.trim_start_matches('/').replace('/', "-")
        )
    }

    fn run(&mut self, intake: Sender<Reading>, running: Arc<AtomicBool>) {
        let mut port = match self.open() {
            Ok(port) => port,
            Err(e) => {
                error!("{e}");
                return;
            }
        };
        info!("Porta {} aberta a {} baud", self.port_path, self.baud);

        if let Err(e) = self.run_stream(&mut port, &intake, &running) {
            error!("Fonte serial encerrada: {e}");
        }
        // A porta é devolvida ao sistema junto com o handle
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{TryRecvError, bounded};
    use std::collections::VecDeque;

    #[test]
    fn reassembles_lines_across_chunks() {
        let mut acc = LineAccumulator::new(64);
        assert!(acc.feed(b"37.5,33.0,").is_empty());

        let lines = acc.feed(b"78.99,10.89,19.0,12:00:00\n1.0,");
        assert_eq!(lines, vec!["37.5,33.0,78.99,10.89,19.0,12:00:00".to_string()]);

        let lines = acc.feed(b"2.0,3.0,4.0,5.0,12:00:01\n");
        assert_eq!(lines, vec!["1.0,2.0,3.0,4.0,5.0,12:00:01".to_string()]);
    }

    #[test]
    fn lossy_decode_replaces_invalid_bytes() {
        let mut acc = LineAccumulator::new(64);
        let lines = acc.feed(b"4\xFF2\n");
        assert_eq!(lines, vec!["4\u{FFFD}2".to_string()]);
    }

    #[test]
    fn overlong_line_is_discarded_whole() {
        let mut acc = LineAccumulator::new(8);
        assert!(acc.feed(b"0123456789ABCDEF").is_empty());

        // O terminador fecha o descarte; a linha seguinte volta ao normal
        let lines = acc.feed(b"XYZ\nok\n");
        assert_eq!(lines, vec!["ok".to_string()]);
    }

    /// Fluxo roteirizado em memória no lugar da porta.
    struct ScriptedStream {
        chunks: VecDeque<std::io::Result<Vec<u8>>>,
    }

    impl ScriptedStream {
        fn new(chunks: Vec<std::io::Result<Vec<u8>>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl ByteStream for ScriptedStream {
        fn available(&mut self) -> std::io::Result<usize> {
            Ok(match self.chunks.front() {
                Some(Ok(chunk)) => chunk.len(),
                Some(Err(_)) => 1,
                None => 0,
            })
        }

        fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn forwards_good_lines_and_skips_bad_ones() {
        let link = SerialLink::new("test", 115_200, 5);
        let mut stream = ScriptedStream::new(vec![
            Ok(b"37.5,33.0,78.99,10.89,19.0,12:00:00\n".to_vec()),
            Ok(b"not,a,packet\n".to_vec()),
            Ok(b"38.0,33.5,79.0,10.9,19.5,12:00:01\n".to_vec()),
            Err(std::io::Error::other("porta removida")),
        ]);
        let (tx, rx) = bounded(64);
        let running = AtomicBool::new(true);

        let result = link.run_stream(&mut stream, &tx, &running);
        assert!(matches!(result, Err(SourceError::ConnectionLost(_))));

        let readings: Vec<Reading> = rx.try_iter().collect();
        assert_eq!(readings.len(), 10, "duas linhas boas, cinco canais cada");
        assert_eq!(readings[0].value, 37.5);
        assert_eq!(readings[0].stamp, "12:00:00");
        assert_eq!(readings[5].value, 38.0);
        assert_eq!(readings[9].stamp, "12:00:01");
    }

    #[test]
    fn cooperative_stop_ends_the_loop() {
        let link = SerialLink::new("test", 115_200, 5);
        let mut stream = ScriptedStream::new(vec![]);
        let (tx, _rx) = bounded(64);
        let running = AtomicBool::new(false);

        assert!(link.run_stream(&mut stream, &tx, &running).is_ok());
    }

    #[test]
    fn closed_intake_ends_the_loop_cleanly() {
        let link = SerialLink::new("test", 115_200, 5);
        let mut stream = ScriptedStream::new(vec![Ok(
            b"37.5,33.0,78.99,10.89,19.0,12:00:00\n".to_vec()
        )]);
        let (tx, rx) = bounded(64);
        drop(rx);
        let running = AtomicBool::new(true);

        assert!(link.run_stream(&mut stream, &tx, &running).is_ok());
    }

    #[test]
    fn missing_port_is_fatal_and_emits_nothing() {
        let mut link = SerialLink::new("/dev/porta-inexistente", 115_200, 5);

        let err = link.open().unwrap_err();
        assert!(matches!(
            err,
            SourceError::ConnectionFailed { ref port, .. } if port == "/dev/porta-inexistente"
        ));

        // Falha de abertura encerra a fonte antes do loop começar
        let (tx, rx) = bounded::<Reading>(8);
        link.run(tx, Arc::new(AtomicBool::new(true)));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }
}

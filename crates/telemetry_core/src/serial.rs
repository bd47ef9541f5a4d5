//! Fonte de linhas sobre um fluxo de bytes serial.
//!
//! [`LineReader`] transforma qualquer [`Read`] (a porta serial na prática,
//! um `Cursor` nos testes) em uma sequência preguiçosa de linhas ASCII.
//! Cada linha é entregue com o terminador original, porque o checksum do
//! VE.Direct soma exatamente os bytes enviados pelo dispositivo.

use std::io::{self, ErrorKind, Read};
use tracing::{debug, trace, warn};

/// Tamanho do bloco lido por chamada a `read`.
const CHUNK_SIZE: usize = 128;

/// Erros da fonte de linhas.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// Nenhuma linha completa dentro do timeout de leitura.
    #[error("Timeout de leitura sem linha completa")]
    TimedOut,

    #[error("Linha com byte não-ASCII 0x{byte:02X} na posição {position}")]
    Decode { byte: u8, position: usize },

    #[error("Linha excedeu {max} bytes sem terminador, descartada")]
    Overlong { max: usize },

    #[error("Erro de E/S na leitura serial: {0}")]
    Io(#[from] io::Error),
}

/// Leitor incremental de linhas terminadas em `\n`.
///
/// Bytes de uma linha incompleta ficam pendentes entre timeouts. Depois de
/// um erro de E/S ou de fim de fluxo o iterador fica encerrado.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    max_line: usize,
    finished: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R, max_line: usize) -> Self {
        let max_line = max_line.max(1);
        debug!(max_line, "LineReader inicializado");
        Self {
            inner,
            pending: Vec::with_capacity(max_line.min(256)),
            max_line,
            finished: false,
        }
    }

    /// Bytes pendentes de uma linha ainda incompleta.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self) -> Option<Result<String, LineError>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();

        if line.len() > self.max_line {
            warn!(len = line.len(), max_line = self.max_line, "Descartando linha longa demais");
            return Some(Err(LineError::Overlong { max: self.max_line }));
        }
        if let Some(position) = line.iter().position(|b| !b.is_ascii()) {
            return Some(Err(LineError::Decode {
                byte: line[position],
                position,
            }));
        }

        // ASCII é UTF-8 válido
        let text = String::from_utf8_lossy(&line).into_owned();
        trace!(line = ?text, "Linha recebida");
        Some(Ok(text))
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = Result<String, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.take_line() {
            return Some(line);
        }
        if self.finished {
            return None;
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    debug!(pending = self.pending.len(), "Fim do fluxo serial");
                    self.finished = true;
                    self.pending.clear();
                    return None;
                }
                Ok(n) => {
                    trace!(bytes_read = n, "Bloco lido da porta");
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(line) = self.take_line() {
                        return Some(line);
                    }
                    if self.pending.len() > self.max_line {
                        warn!(
                            pending_len = self.pending.len(),
                            max_line = self.max_line,
                            "Descartando buffer sem terminador"
                        );
                        self.pending.clear();
                        return Some(Err(LineError::Overlong { max: self.max_line }));
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Some(Err(LineError::TimedOut));
                }
                Err(e) => {
                    self.finished = true;
                    self.pending.clear();
                    return Some(Err(LineError::Io(e)));
                }
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

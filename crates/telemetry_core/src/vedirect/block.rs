//! Acumulador de bloco e máquina de estados do decodificador.
//!
//! Estado único `ACCUMULATING`; cada linha aceita pelo parser é anexada ao
//! bloco bruto antes de qualquer interpretação. Três transições terminais
//! devolvem o acumulador ao estado vazio:
//!
//! - `Checksum` com soma zero → [`BlockEvent::Complete`]
//! - `Checksum` com soma diferente de zero → [`BlockEvent::ChecksumMismatch`]
//! - mais de [`MAX_FIELDS`] campos (ou bloco acima de [`MAX_BLOCK_BYTES`])
//!   sem `Checksum` → [`BlockEvent::Overflow`]

use super::checksum::RunningChecksum;
use super::fields::{FieldError, map_field};
use super::parser::split_line;
use crate::types::FieldTable;
use tracing::{debug, trace, warn};

/// Máximo de campos de um registro.
pub const MAX_FIELDS: usize = 50;

/// Teto do bloco bruto. Um bloco MPPT real tem menos de 400 bytes.
pub const MAX_BLOCK_BYTES: usize = 8 * 1024;

/// Resultado de alimentar uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEvent {
    /// Linha sem exatamente dois tokens; bloco intocado.
    Ignored,
    /// Campo definido ou sobrescrito.
    Accumulated,
    /// Bloco íntegro; campos prontos para virar registro.
    Complete(FieldTable),
    /// Soma do bloco diferente de zero; bloco descartado.
    ChecksumMismatch { sum: u8 },
    /// Bloco sem `Checksum` cresceu demais; descartado.
    Overflow { fields: usize, bytes: usize },
}

/// Bloco em andamento: bytes brutos, soma acumulada e campos mapeados.
#[derive(Debug, Default)]
pub struct BlockDecoder {
    raw: String,
    checksum: RunningChecksum,
    fields: FieldTable,
}

impl BlockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Campos já mapeados do bloco em andamento.
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Bytes brutos acumulados desde o último evento terminal.
    pub fn raw_block(&self) -> &str {
        &self.raw
    }

    /// Alimenta uma linha, como recebida (com terminador).
    ///
    /// Em `Err` a linha já foi anexada ao bloco (o checksum precisa dela)
    /// mas o campo não foi definido; o acumulador continua consistente.
    pub fn feed(&mut self, line: &str) -> Result<BlockEvent, FieldError> {
        let Some(kv) = split_line(line) else {
            debug!(line = ?line, "Linha sem par chave/valor ignorada");
            return Ok(BlockEvent::Ignored);
        };

        self.raw.push_str(line);
        self.checksum.update(line.as_bytes());

        if kv.is_checksum() {
            debug!(block = ?self.raw, "Bloco completo");
            let event = if self.checksum.is_valid() {
                BlockEvent::Complete(std::mem::take(&mut self.fields))
            } else {
                debug!(sum = self.checksum.value(), "Erro de checksum, registro ignorado");
                BlockEvent::ChecksumMismatch {
                    sum: self.checksum.value(),
                }
            };
            self.reset();
            return Ok(event);
        }

        // Antes do mapeamento: linhas que falham no map também ocupam o bloco.
        if self.raw.len() > MAX_BLOCK_BYTES {
            return Ok(self.overflow(self.fields.len()));
        }

        let (name, value) = map_field(kv.key, kv.value)?;

        let grows = !self.fields.contains(name);
        if grows && self.fields.len() >= MAX_FIELDS {
            return Ok(self.overflow(self.fields.len() + 1));
        }

        trace!(field = name, %value, "Campo definido");
        self.fields.set(name, value);
        Ok(BlockEvent::Accumulated)
    }

    fn overflow(&mut self, fields: usize) -> BlockEvent {
        let event = BlockEvent::Overflow {
            fields,
            bytes: self.raw.len(),
        };
        warn!(?event, "Linha de checksum esperada não chegou, reiniciando bloco");
        self.reset();
        event
    }

    /// Descarta o bloco em andamento.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.checksum.reset();
        self.fields.clear();
    }
}

//! Validação de integridade de um bloco VE.Direct.
//!
//! O byte enviado na linha `Checksum` é escolhido pelo dispositivo para que
//! a soma de todos os bytes do bloco, módulo 256, dê zero. Por isso o valor
//! do checksum nunca é decodificado: basta somar o bloco inteiro.

/// Soma módulo 256 de todos os bytes.
pub fn block_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Byte que, somado a `bytes`, leva a soma a zero.
pub fn checksum_byte_for(bytes: &[u8]) -> u8 {
    block_sum(bytes).wrapping_neg()
}

/// Soma acumulada, atualizada linha a linha.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningChecksum {
    sum: u8,
}

impl RunningChecksum {
    pub fn update(&mut self, bytes: &[u8]) {
        self.sum = self.sum.wrapping_add(block_sum(bytes));
    }

    pub fn value(&self) -> u8 {
        self.sum
    }

    pub fn is_valid(&self) -> bool {
        self.sum == 0
    }

    pub fn reset(&mut self) {
        self.sum = 0;
    }
}

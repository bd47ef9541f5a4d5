//! Decodificador do protocolo texto VE.Direct (carregadores MPPT Victron).
//!
//! O dispositivo envia linhas `CHAVE<TAB>VALOR` agrupadas em blocos; a
//! última linha de cada bloco é `Checksum`. Não há outro enquadramento, então
//! o decodificador reconstrói os blocos linha a linha e só confia neles
//! quando a soma módulo 256 fecha em zero.
//!
//! ```text
//! LineReader → split_line → map_field → BlockDecoder → checksum → Record → RecordSink
//!                                                    ↘ Stats
//! ```

pub mod block;
pub mod checksum;
pub mod fields;
pub mod parser;
pub mod session;
pub mod stats;

pub use block::{BlockDecoder, BlockEvent, MAX_FIELDS};
pub use session::{DecoderSession, Pauses, StageError, Step};
pub use stats::{Counters, Stats};

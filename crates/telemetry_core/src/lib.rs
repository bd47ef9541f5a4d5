//! # Telemetry Core
//!
//! Crate compartilhada pelos produtores de telemetria: modelo de registro,
//! line protocol do InfluxDB, sink HTTP, configuração TOML, fonte de linhas
//! serial e o decodificador VE.Direct.
//!
//! ## Módulos
//! - [`types`] – Registro, tabela ordenada de campos e valores
//! - [`protocol`] – Codificação em InfluxDB line protocol
//! - [`sink`] – Trait de sink e escrita HTTP no InfluxDB
//! - [`config`] – Configuração unificada via TOML
//! - [`serial`] – Leitor incremental de linhas ASCII
//! - [`vedirect`] – Parser, mapeador, checksum e sessão do VE.Direct

pub mod types;
pub mod protocol;
pub mod sink;
pub mod config;
pub mod serial;
pub mod vedirect;

// Re-exports convenientes
pub use types::{FieldTable, FieldValue, Record};
pub use protocol::encode_record;
pub use sink::{InfluxSink, RecordSink, SinkError};
pub use config::{AppConfig, InfluxConfig, PerfConfig, VeDirectConfig};
pub use serial::{LineError, LineReader};

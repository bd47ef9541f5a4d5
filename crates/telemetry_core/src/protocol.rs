//! Codificação de registros em InfluxDB line protocol.
//!
//! Formato de uma linha:
//!
//! ```text
//! <measurement>[,<tag>=<valor>...] <campo>=<valor>[,<campo>=<valor>...] <timestamp_ns>
//! ```
//!
//! - Measurement, chaves de tag e chaves de campo escapam vírgula, espaço e `=`
//! - Inteiros levam o sufixo `i`; floats saem na forma mais curta que volta ao mesmo valor
//! - Strings vão entre aspas duplas, com `"` e `\` escapados
//! - Timestamp em nanossegundos desde a época Unix (`precision=ns`)

use crate::types::{FieldValue, Record};
use std::fmt::Write;

/// Precisão declarada na URL de escrita.
pub const PRECISION: &str = "ns";

/// Erros de codificação.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Registro sem campos codificáveis (measurement {0:?})")]
    NoFields(String),

    #[error("Measurement vazia")]
    EmptyMeasurement,

    #[error("Timestamp fora do intervalo representável em nanossegundos")]
    TimestampOutOfRange,
}

/// Codifica um [`Record`] em uma linha de line protocol (sem `\n` final).
///
/// Floats não finitos (NaN, ±inf) não são aceitos pelo InfluxDB e são
/// omitidos. Se nenhum campo sobrar, retorna [`ProtocolError::NoFields`].
pub fn encode_record(record: &Record) -> Result<String, ProtocolError> {
    if record.measurement.is_empty() {
        return Err(ProtocolError::EmptyMeasurement);
    }
    let timestamp = record
        .time
        .timestamp_nanos_opt()
        .ok_or(ProtocolError::TimestampOutOfRange)?;

    let mut line = String::with_capacity(64 + record.fields.len() * 24);
    escape_into(&mut line, &record.measurement, &[',', ' ']);

    let mut tags: Vec<&(String, String)> = record.tags.iter().collect();
    tags.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in tags {
        line.push(',');
        escape_into(&mut line, key, &[',', ' ', '=']);
        line.push('=');
        escape_into(&mut line, value, &[',', ' ', '=']);
    }

    let mut written = 0usize;
    for (name, value) in record.fields.iter() {
        if let FieldValue::Float(v) = value {
            if !v.is_finite() {
                continue;
            }
        }
        line.push(if written == 0 { ' ' } else { ',' });
        escape_into(&mut line, name, &[',', ' ', '=']);
        line.push('=');
        push_value(&mut line, value);
        written += 1;
    }

    if written == 0 {
        return Err(ProtocolError::NoFields(record.measurement.clone()));
    }

    // write! em String não falha
    let _ = write!(line, " {timestamp}");
    Ok(line)
}

fn push_value(line: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Float(v) => {
            let _ = write!(line, "{v}");
        }
        FieldValue::Integer(v) => {
            let _ = write!(line, "{v}i");
        }
        FieldValue::Text(s) => {
            line.push('"');
            escape_into(line, s, &['"', '\\']);
            line.push('"');
        }
    }
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

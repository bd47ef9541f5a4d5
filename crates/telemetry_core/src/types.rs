//! Definição de tipos para registros de telemetria.
//!
//! Um [`Record`] é o que chega ao sink: nome da measurement, tags (sempre
//! vazias nos produtores atuais), timestamp de captura e a tabela ordenada
//! de campos.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

// ──────────────────────────────────────────────
// Valores de campo
// ──────────────────────────────────────────────

/// Valor de um campo já convertido para unidades naturais.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

// ──────────────────────────────────────────────
// Tabela de campos
// ──────────────────────────────────────────────

/// Mapeamento nome → valor que preserva a ordem de inserção.
///
/// Regravar um nome existente troca o valor no lugar, sem mudar a posição.
/// A ordem é a de chegada das linhas, o que deixa a saída determinística.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable {
    entries: Vec<(String, FieldValue)>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define ou sobrescreve um campo.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

// ──────────────────────────────────────────────
// Registro
// ──────────────────────────────────────────────

/// Registro completo entregue ao sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub time: DateTime<Utc>,
    pub fields: FieldTable,
}

impl Record {
    /// Carimba a tabela de campos com o relógio UTC atual.
    pub fn capture(measurement: impl Into<String>, fields: FieldTable) -> Self {
        Self::at(measurement, fields, Utc::now())
    }

    pub fn at(measurement: impl Into<String>, fields: FieldTable, time: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            time,
            fields,
        }
    }

    /// Timestamp em texto (RFC 3339, microssegundos), usado nos logs.
    pub fn time_string(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

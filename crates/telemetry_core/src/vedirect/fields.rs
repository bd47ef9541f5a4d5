//! Tabela de campos VE.Direct (carregadores MPPT).
//!
//! O dispositivo manda milivolts, miliamperes e centésimos de kWh para não
//! usar ponto flutuante no fio. A divisão é feita aqui, uma única vez, para
//! que o banco receba unidades naturais.

use crate::types::FieldValue;

/// Conversão aplicada ao valor bruto (já aparado).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// `float(x) / 1000` (mV → V, mA → A)
    Milli,
    /// `float(x) / 100` (0.01 kWh → kWh)
    Centi,
    /// `int(x)`
    Integer,
    /// `1` se `x == "ON"`, senão `0`
    OnOff,
    /// Texto sem conversão
    Text,
}

/// Entrada da tabela: chave do protocolo → nome canônico + conversão.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub transform: Transform,
}

const fn spec(key: &'static str, name: &'static str, transform: Transform) -> FieldSpec {
    FieldSpec {
        key,
        name,
        transform,
    }
}

pub const FIELD_TABLE: &[FieldSpec] = &[
    spec("V", "Battery Voltage", Transform::Milli),
    spec("VPV", "Panel Voltage", Transform::Milli),
    spec("PPV", "Panel Power", Transform::Integer),
    spec("I", "Battery Current", Transform::Milli),
    spec("IL", "Load Current", Transform::Milli),
    spec("LOAD", "Load State Code", Transform::OnOff),
    spec("H19", "Yield Total", Transform::Centi),
    spec("H20", "Yield Today", Transform::Centi),
    spec("H21", "Maximum Power Today", Transform::Integer),
    spec("H22", "Yield Yesterday", Transform::Centi),
    spec("H23", "Maximum Power Yesterday", Transform::Integer),
    spec("CS", "Operation State Int", Transform::Integer),
    spec("ERR", "Error Int", Transform::Integer),
    spec("FW", "Firmware Version", Transform::Text),
    spec("PID", "Product ID", Transform::Text),
    spec("SER#", "Serial Number", Transform::Text),
    spec("HSDS", "Day Sequence Number Int", Transform::Integer),
    spec("MPPT", "MPPT Int", Transform::Integer),
];

/// Erros de conversão de valor.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Valor {value:?} de {key} não é um número: {source}")]
    InvalidFloat {
        key: String,
        value: String,
        source: std::num::ParseFloatError,
    },

    #[error("Valor {value:?} de {key} não é um inteiro: {source}")]
    InvalidInteger {
        key: String,
        value: String,
        source: std::num::ParseIntError,
    },
}

pub fn lookup(key: &str) -> Option<&'static FieldSpec> {
    FIELD_TABLE.iter().find(|spec| spec.key == key)
}

/// Mapeia chave e valor brutos para (nome canônico, valor convertido).
///
/// Chaves fora da tabela passam adiante com o próprio nome e o valor
/// aparado como texto.
pub fn map_field<'k>(key: &'k str, raw_value: &str) -> Result<(&'k str, FieldValue), FieldError> {
    let value = raw_value.trim();
    let Some(spec) = lookup(key) else {
        return Ok((key, FieldValue::Text(value.to_string())));
    };

    let converted = match spec.transform {
        Transform::Milli => FieldValue::Float(parse_float(key, value)? / 1000.0),
        Transform::Centi => FieldValue::Float(parse_float(key, value)? / 100.0),
        Transform::Integer => FieldValue::Integer(value.parse().map_err(|source| {
            FieldError::InvalidInteger {
                key: key.to_string(),
                value: value.to_string(),
                source,
            }
        })?),
        Transform::OnOff => FieldValue::Integer(i64::from(value == "ON")),
        Transform::Text => FieldValue::Text(value.to_string()),
    };
    Ok((spec.name, converted))
}

fn parse_float(key: &str, value: &str) -> Result<f64, FieldError> {
    value.parse().map_err(|source| FieldError::InvalidFloat {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(key: &str, raw: &str) -> (String, FieldValue) {
        let (name, value) = map_field(key, raw).unwrap();
        (name.to_string(), value)
    }

    #[test]
    fn scales_millivolts_and_milliamps() {
        assert_eq!(
            mapped("V", "12800\r\n"),
            ("Battery Voltage".into(), FieldValue::Float(12.8))
        );
        assert_eq!(
            mapped("I", "-500"),
            ("Battery Current".into(), FieldValue::Float(-0.5))
        );
        assert_eq!(
            mapped("VPV", "36000"),
            ("Panel Voltage".into(), FieldValue::Float(36.0))
        );
        assert_eq!(
            mapped("IL", "300"),
            ("Load Current".into(), FieldValue::Float(0.3))
        );
    }

    #[test]
    fn scales_yields_by_hundred() {
        assert_eq!(
            mapped("H19", "1234"),
            ("Yield Total".into(), FieldValue::Float(12.34))
        );
        assert_eq!(mapped("H20", "5").1, FieldValue::Float(0.05));
        assert_eq!(mapped("H22", "0").1, FieldValue::Float(0.0));
    }

    #[test]
    fn integer_fields() {
        assert_eq!(
            mapped("PPV", "25"),
            ("Panel Power".into(), FieldValue::Integer(25))
        );
        assert_eq!(mapped("CS", "3").1, FieldValue::Integer(3));
        assert_eq!(mapped("ERR", "0").1, FieldValue::Integer(0));
        assert_eq!(mapped("HSDS", "+12").1, FieldValue::Integer(12));
        assert_eq!(mapped("MPPT", "2").0, "MPPT Int");
    }

    #[test]
    fn load_state_is_one_only_for_on() {
        assert_eq!(
            mapped("LOAD", "ON\r\n"),
            ("Load State Code".into(), FieldValue::Integer(1))
        );
        assert_eq!(mapped("LOAD", "OFF").1, FieldValue::Integer(0));
        assert_eq!(mapped("LOAD", "on").1, FieldValue::Integer(0));
    }

    #[test]
    fn text_fields_are_trimmed() {
        assert_eq!(
            mapped("PID", "0xA053\r\n"),
            ("Product ID".into(), FieldValue::Text("0xA053".into()))
        );
        assert_eq!(mapped("SER#", " HQ1828ABCDE ").0, "Serial Number");
        assert_eq!(mapped("FW", "150").1, FieldValue::Text("150".into()));
    }

    #[test]
    fn unknown_key_passes_through_as_text() {
        assert_eq!(
            mapped("XYZ", "42\r\n"),
            ("XYZ".into(), FieldValue::Text("42".into()))
        );
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(matches!(
            map_field("V", "12,8"),
            Err(FieldError::InvalidFloat { ref key, .. }) if key == "V"
        ));
        assert!(matches!(
            map_field("PPV", "2.5"),
            Err(FieldError::InvalidInteger { ref value, .. }) if value == "2.5"
        ));
    }

    #[test]
    fn table_keys_are_unique() {
        for (i, a) in FIELD_TABLE.iter().enumerate() {
            for b in &FIELD_TABLE[i + 1..] {
                assert_ne!(a.key, b.key);
                assert_ne!(a.name, b.name);
            }
        }
    }
}

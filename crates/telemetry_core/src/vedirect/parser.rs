use tracing::trace;

/// Chave da última linha de um bloco.
pub const CHECKSUM_KEY: &str = "Checksum";

/// Uma linha VE.Direct separada em chave e valor brutos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl KeyValue<'_> {
    pub fn is_checksum(&self) -> bool {
        self.key == CHECKSUM_KEY
    }
}

/// Separa uma linha em chave e valor pelo TAB.
///
/// Retorna `None` quando a linha não tem exatamente dois tokens (nenhum TAB
/// ou mais de um). Na linha `Checksum` o valor é cortado no primeiro `:`,
/// pois o dispositivo às vezes emenda lixo depois do byte de checksum.
/// O valor não é aparado aqui; isso fica com o mapeador de campos.
pub fn split_line(line: &str) -> Option<KeyValue<'_>> {
    let mut parts = line.split('\t');
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        trace!(line = ?line, "Linha com mais de um TAB");
        return None;
    }

    let value = if key == CHECKSUM_KEY {
        value.split(':').next().unwrap_or(value)
    } else {
        value
    };
    Some(KeyValue { key, value })
}

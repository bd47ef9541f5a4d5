//! Abertura da porta serial com o enquadramento fixo do VE.Direct.

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;
use tracing::{info, warn};

/// O VE.Direct é sempre 19200 8N1, sem controle de fluxo.
pub const BAUD_RATE: u32 = 19_200;

/// Timeout de cada `read`; a fonte de linhas trata como ocioso.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

pub fn open_port(device: &str) -> Result<Box<dyn SerialPort>, serialport::Error> {
    let port = serialport::new(device, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()?;

    // Bytes antigos no buffer quase sempre são meio bloco
    if let Err(e) = port.clear(ClearBuffer::Input) {
        warn!("Falha ao limpar buffer de entrada de {device}: {e}");
    }

    info!(device, baud = BAUD_RATE, "Porta serial aberta");
    Ok(port)
}

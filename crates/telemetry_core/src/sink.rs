//! Destino dos registros.
//!
//! [`RecordSink`] é a fronteira com o banco de séries temporais: uma chamada
//! por registro, síncrona. [`InfluxSink`] grava via HTTP na API `/write` do
//! InfluxDB 1.x, uma linha de line protocol por requisição.

use crate::config::InfluxConfig;
use crate::protocol::{PRECISION, ProtocolError, encode_record};
use crate::types::Record;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Erros de escrita.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Erro de codificação: {0}")]
    Encode(#[from] ProtocolError),

    #[error("Erro HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("InfluxDB respondeu {status}: {body}")]
    Status { status: u16, body: String },
}

/// Recebe registros prontos.
pub trait RecordSink {
    fn write(&mut self, record: &Record) -> Result<(), SinkError>;
}

/// Sink HTTP para o InfluxDB.
pub struct InfluxSink {
    client: Client,
    write_url: String,
    database: String,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig, database: &str) -> Self {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs)
            .unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(timeout)
            .timeout(timeout)
            .no_proxy()
            .build()
            .unwrap_or_else(|err| {
                warn!("Usando cliente HTTP padrão (erro no builder: {err})");
                Client::new()
            });

        let write_url = format!("{}/write", config.url.trim_end_matches('/'));
        debug!(url = %write_url, database, "InfluxSink inicializado");
        Self {
            client,
            write_url,
            database: database.to_string(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl RecordSink for InfluxSink {
    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        let line = encode_record(record)?;
        trace!(line = %line, "Enviando linha");

        let response = self
            .client
            .post(&self.write_url)
            .query(&[("db", self.database.as_str()), ("precision", PRECISION)])
            .body(line)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(SinkError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldTable;
    use chrono::{TimeZone, Utc};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Servidor HTTP de uma requisição: devolve a requisição recebida.
    fn one_shot_server(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            let header_end = loop {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "conexão fechada antes do fim dos headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "conexão fechada antes do fim do corpo");
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(request).unwrap()
        });
        (url, handle)
    }

    fn sample_record() -> Record {
        let mut fields = FieldTable::new();
        fields.set("Battery Voltage", 12.8_f64);
        fields.set("Panel Power", 25_i64);
        Record::at("vedirect", fields, Utc.timestamp_opt(1_560_000_000, 0).unwrap())
    }

    fn config(url: String) -> InfluxConfig {
        InfluxConfig {
            url,
            timeout_secs: 5.0,
        }
    }

    #[test]
    fn posts_line_protocol_to_write_endpoint() {
        let (url, server) =
            one_shot_server("HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let mut sink = InfluxSink::new(&config(format!("{url}/")), "victronlog");
        sink.write(&sample_record()).unwrap();

        let request = server.join().unwrap();
        assert!(
            request.starts_with("POST /write?db=victronlog&precision=ns HTTP/1.1\r\n"),
            "got {request}"
        );
        assert!(request.ends_with(
            "\r\n\r\nvedirect Battery\\ Voltage=12.8,Panel\\ Power=25i 1560000000000000000"
        ));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\noops\n",
        );
        let mut sink = InfluxSink::new(&config(url), "victronlog");
        let err = sink.write(&sample_record()).unwrap_err();
        server.join().unwrap();
        assert!(
            matches!(err, SinkError::Status { status: 500, ref body } if body == "oops"),
            "got {err:?}"
        );
    }

    #[test]
    fn empty_record_never_reaches_the_network() {
        let mut sink = InfluxSink::new(&config("http://127.0.0.1:9".into()), "victronlog");
        let record = Record::at("vedirect", FieldTable::new(), Utc::now());
        assert!(matches!(
            sink.write(&record),
            Err(SinkError::Encode(ProtocolError::NoFields(_)))
        ));
    }

    #[test]
    fn unreachable_server_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let mut sink = InfluxSink::new(&config(url), "victronlog");
        assert!(matches!(
            sink.write(&sample_record()),
            Err(SinkError::Http(_))
        ));
        assert_eq!(sink.database(), "victronlog");
    }
}

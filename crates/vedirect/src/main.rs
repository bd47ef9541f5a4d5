//! # Telemetria VE.Direct
//!
//! Lê o protocolo de texto VE.Direct de um controlador de carga Victron
//! pela porta serial e grava cada bloco íntegro no InfluxDB.
//!
//! ## Uso
//! ```bash
//! telemetry_vedirect        # Normal: relatório de estatísticas a cada 10 s
//! telemetry_vedirect -d     # Debug: blocos brutos e confirmações de escrita
//! ```

mod port;

use clap::{ArgAction, Parser};
use std::time::Duration;
use telemetry_core::config::AppConfig;
use telemetry_core::vedirect::{DecoderSession, Stats};
use telemetry_core::{InfluxSink, LineReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Decodificador VE.Direct para InfluxDB")]
struct Opts {
    /// Log detalhado: blocos brutos, checksums rejeitados e cada escrita
    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue)]
    debug: bool,
}

impl Opts {
    fn default_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

fn main() {
    let opts = Opts::parse();

    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| opts.default_filter().into()),
        )
        .init();

    // ── Carregar config ──
    let config = AppConfig::load_validated(&AppConfig::default_path());
    let cfg = &config.vedirect;
    let pauses = cfg.pauses();

    // ── Sink ──
    let mut sink = InfluxSink::new(&cfg.influx, &cfg.database);

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ☀ TELEMETRIA VE.DIRECT – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Porta:     {} @ {} 8N1", cfg.device, port::BAUD_RATE);
    println!("  InfluxDB:  {} / {}", cfg.influx.url, sink.database());
    println!("  Medição:   {}", cfg.measurement);
    println!("  Modo:      {}", if opts.debug { "debug" } else { "normal" });
    println!("══════════════════════════════════════════════");
    println!();

    let mut session = DecoderSession::new(
        cfg.measurement.as_str(),
        pauses,
        Stats::new(cfg.stats_interval()),
    );

    // ── Loop principal ──
    // A sessão (contadores, uptime) sobrevive a cada reabertura da porta.
    loop {
        match port::open_port(&cfg.device) {
            Ok(port) => {
                session.run(LineReader::new(port, cfg.max_line_bytes), &mut sink);
                warn!(device = %cfg.device, "Fluxo serial encerrado, reabrindo porta");
                session.discard_block();
            }
            Err(e) => {
                error!(
                    device = %cfg.device,
                    error = %e,
                    debug_error = ?e,
                    "Falha ao abrir porta serial"
                );
            }
        }
        backoff(pauses.error_backoff);
    }
}

fn backoff(duration: Duration) {
    info!("Nova tentativa em {:.1}s", duration.as_secs_f64());
    std::thread::sleep(duration);
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

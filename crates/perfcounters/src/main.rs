//! # Telemetria Perfcounters
//!
//! Amostra contadores do sistema operacional e grava um registro por
//! intervalo no InfluxDB.
//!
//! ## Uso
//! ```bash
//! telemetry_perfcounters        # Normal
//! telemetry_perfcounters -d     # Debug: mostra cada registro antes de gravar
//! ```

mod monitor;

use clap::{ArgAction, Parser};
use monitor::SystemMonitor;
use telemetry_core::config::AppConfig;
use telemetry_core::{InfluxSink, Record, RecordSink};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(version, about = "Contadores do sistema para InfluxDB")]
struct Opts {
    /// Log detalhado: cada registro antes da escrita
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
    let cfg = &config.perfcounters;
    let interval = cfg.interval();

    let mut sink = InfluxSink::new(&cfg.influx, &cfg.database);
    let mut monitor = SystemMonitor::new(cfg);
    info!("Monitor do sistema inicializado");

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ TELEMETRIA PERFCOUNTERS – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  InfluxDB:  {} / {}", cfg.influx.url, sink.database());
    println!("  Medição:   {}", cfg.measurement);
    println!("  Intervalo: {:.1}s", interval.as_secs_f64());
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    // Sucesso ou falha, a mesma pausa fixa; o processo nunca termina.
    loop {
        let record = Record::capture(cfg.measurement.as_str(), monitor.sample().fields());
        debug!(?record, "Registro a gravar");

        match sink.write(&record) {
            Ok(()) => info!("Registro inserido em {}", record.time_string()),
            Err(e) => error!(
                error = %e,
                debug_error = ?e,
                "Falha ao gravar contadores"
            ),
        }

        std::thread::sleep(interval);
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        let opts = Opts::parse_from(["telemetry_perfcounters"]);
        assert_eq!(opts.default_filter(), "info");
    }

    #[test]
    fn debug_flag_raises_filter() {
        let opts = Opts::parse_from(["telemetry_perfcounters", "-d"]);
        assert!(opts.debug);
        assert_eq!(opts.default_filter(), "debug");
    }
}

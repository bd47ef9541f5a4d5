//! Configuração unificada via TOML.
//!
//! Sem arquivo, todos os valores padrão reproduzem as constantes históricas
//! dos coletores (porta `/dev/ttyUSB0`, bancos `victronlog` e `perfcounters`,
//! intervalos de 5 s). O arquivo `config.toml` ao lado do executável é
//! opcional e nunca é criado automaticamente.

use crate::vedirect::Pauses;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Conexão com o InfluxDB (compartilhada pelos dois coletores).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// URL base, ex: `http://localhost:8086`
    pub url: String,
    /// Timeout de cada requisição (segundos)
    pub timeout_secs: f64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".into(),
            timeout_secs: 10.0,
        }
    }
}

/// Configuração do coletor VE.Direct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VeDirectConfig {
    /// Caminho do dispositivo serial
    pub device: String,
    /// Tamanho máximo de uma linha (bytes, com terminador)
    pub max_line_bytes: usize,
    pub database: String,
    pub measurement: String,
    /// Pausa após cada registro gravado (segundos)
    pub insert_interval_secs: f64,
    /// Pausa após uma linha sem par chave/valor (segundos)
    pub malformed_line_pause_secs: f64,
    /// Pausa após qualquer erro (segundos)
    pub error_backoff_secs: f64,
    /// Intervalo entre relatórios de estatísticas (segundos)
    pub stats_interval_secs: f64,
    pub influx: InfluxConfig,
}

impl Default for VeDirectConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            max_line_bytes: 256,
            database: "victronlog".into(),
            measurement: "vedirect".into(),
            insert_interval_secs: 5.0,
            malformed_line_pause_secs: 3.0,
            error_backoff_secs: 5.0,
            stats_interval_secs: 10.0,
            influx: InfluxConfig::default(),
        }
    }
}

impl VeDirectConfig {
    pub fn pauses(&self) -> Pauses {
        Pauses {
            after_insert: secs(self.insert_interval_secs),
            malformed_line: secs(self.malformed_line_pause_secs),
            error_backoff: secs(self.error_backoff_secs),
        }
    }

    pub fn stats_interval(&self) -> Duration {
        secs(self.stats_interval_secs)
    }
}

/// Configuração do coletor de contadores do sistema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    pub database: String,
    pub measurement: String,
    /// Intervalo entre amostras (segundos)
    pub interval_secs: f64,
    /// Janela de medição do uso de CPU (milissegundos)
    pub cpu_sample_ms: u64,
    /// Trecho do rótulo do sensor de temperatura preferido
    pub temperature_sensor: String,
    /// Ponto de montagem usado para o uso de disco
    pub disk_mount: String,
    pub influx: InfluxConfig,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            database: "perfcounters".into(),
            measurement: "piperf".into(),
            interval_secs: 5.0,
            cpu_sample_ms: 300,
            temperature_sensor: "cpu-thermal".into(),
            disk_mount: "/".into(),
            influx: InfluxConfig::default(),
        }
    }
}

impl PerfConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn cpu_sample(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_ms)
    }
}

/// Configuração raiz (unifica os dois coletores).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vedirect: VeDirectConfig,
    pub perfcounters: PerfConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML; ausente ou inválido → padrão.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Carrega e valida; qualquer problema é logado e vale o padrão inteiro.
    pub fn load_validated(path: &Path) -> Self {
        let config = Self::load(path);
        let errors = config.validate();
        if errors.is_empty() {
            return config;
        }
        for e in &errors {
            warn!("Configuração inválida: {e}");
        }
        warn!("Descartando {} e usando configuração padrão", path.display());
        AppConfig::default()
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let ve = &self.vedirect;
        let perf = &self.perfcounters;

        if ve.device.trim().is_empty() {
            errors.push("Dispositivo serial vazio".into());
        }
        if ve.max_line_bytes < 32 {
            errors.push(format!(
                "max_line_bytes muito pequeno: {} (mínimo 32)",
                ve.max_line_bytes
            ));
        }
        for (name, value) in [
            ("vedirect.database", &ve.database),
            ("vedirect.measurement", &ve.measurement),
            ("perfcounters.database", &perf.database),
            ("perfcounters.measurement", &perf.measurement),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{name} não pode ser vazio"));
            }
        }
        for (name, value) in [
            ("vedirect.insert_interval_secs", ve.insert_interval_secs),
            ("vedirect.malformed_line_pause_secs", ve.malformed_line_pause_secs),
            ("vedirect.error_backoff_secs", ve.error_backoff_secs),
        ] {
            if !(0.0..=3600.0).contains(&value) {
                errors.push(format!("{name} inválido: {value} (0–3600)"));
            }
        }
        for (name, value) in [
            ("vedirect.stats_interval_secs", ve.stats_interval_secs),
            ("perfcounters.interval_secs", perf.interval_secs),
            ("vedirect.influx.timeout_secs", ve.influx.timeout_secs),
            ("perfcounters.influx.timeout_secs", perf.influx.timeout_secs),
        ] {
            if !(value > 0.0 && value <= 3600.0) {
                errors.push(format!("{name} inválido: {value} (>0–3600)"));
            }
        }

        errors
    }
}

/// Segundos em ponto flutuante → `Duration`; valores inválidos viram zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_historic_constants() {
        let config = AppConfig::default();
        assert_eq!(config.vedirect.device, "/dev/ttyUSB0");
        assert_eq!(config.vedirect.database, "victronlog");
        assert_eq!(config.vedirect.measurement, "vedirect");
        assert_eq!(config.perfcounters.database, "perfcounters");
        assert_eq!(config.perfcounters.measurement, "piperf");
        assert_eq!(config.vedirect.influx.url, "http://localhost:8086");

        let pauses = config.vedirect.pauses();
        assert_eq!(pauses.after_insert, Duration::from_secs(5));
        assert_eq!(pauses.malformed_line, Duration::from_secs(3));
        assert_eq!(pauses.error_backoff, Duration::from_secs(5));
        assert_eq!(pauses, Pauses::default());
        assert_eq!(config.vedirect.stats_interval(), Duration::from_secs(10));
        assert_eq!(config.perfcounters.cpu_sample(), Duration::from_millis(300));
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.vedirect.device, parsed.vedirect.device);
        assert_eq!(config.perfcounters.interval_secs, parsed.perfcounters.interval_secs);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[vedirect]
device = "/dev/ttyAMA0"

[perfcounters.influx]
url = "http://influx:8086"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.vedirect.device, "/dev/ttyAMA0");
        // Outros campos devem ter valor padrão
        assert_eq!(config.vedirect.database, "victronlog");
        assert_eq!(config.perfcounters.influx.url, "http://influx:8086");
        assert_eq!(config.perfcounters.influx.timeout_secs, 10.0);
        assert_eq!(config.perfcounters.database, "perfcounters");
    }

    #[test]
    fn validate_reports_bad_values() {
        let mut config = AppConfig::default();
        config.vedirect.device = " ".into();
        config.vedirect.error_backoff_secs = -1.0;
        config.perfcounters.interval_secs = 0.0;
        config.vedirect.measurement.clear();

        let errors = config.validate();
        assert_eq!(errors.len(), 4, "Erros: {:?}", errors);
    }

    #[test]
    fn invalid_seconds_become_zero() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(0.5), Duration::from_millis(500));
    }

    #[test]
    fn invalid_file_is_replaced_by_defaults() {
        let path = std::env::temp_dir().join(format!(
            "telemetria-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[vedirect]\ndevice = \"/dev/ttyS9\"\nmax_line_bytes = 4\n").unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.vedirect.device, "/dev/ttyS9");
        let validated = AppConfig::load_validated(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(validated.vedirect.device, "/dev/ttyUSB0");
        assert_eq!(validated.vedirect.max_line_bytes, 256);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/telemetria/config.toml"));
        assert_eq!(config.vedirect.device, "/dev/ttyUSB0");
    }
}

//! Monitor do sistema – contadores do SO via `sysinfo`.
//!
//! Uma amostra por ciclo: uso de CPU numa janela curta, bytes de rede
//! acumulados desde o boot, uso de RAM, temperatura da CPU e uso do disco
//! do ponto de montagem configurado. Nada é guardado entre amostras.

use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{
    Components, CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, MemoryRefreshKind, Networks,
    RefreshKind, System,
};
use telemetry_core::config::PerfConfig;
use telemetry_core::types::FieldTable;
use tracing::{debug, info, warn};

/// Acima disso a leitura é lixo do driver, não temperatura.
const MAX_PLAUSIBLE_TEMP: f32 = 150.0;

/// Uma amostra dos contadores.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Uso de CPU (%)
    pub cpu_load: f64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Uso de RAM (%)
    pub ram_usage: f64,
    /// °C; `None` sem sensor
    pub cpu_temp: Option<f64>,
    /// Uso do disco (%); `None` se o ponto de montagem não existe
    pub disk_usage: Option<f64>,
}

impl Sample {
    /// Campos do registro, com os nomes gravados no banco.
    pub fn fields(&self) -> FieldTable {
        let mut fields = FieldTable::new();
        fields.set("CPU Load", self.cpu_load);
        fields.set("Bytes Sent", self.bytes_sent);
        fields.set("Bytes Received", self.bytes_received);
        fields.set("RAM Usage", self.ram_usage);
        if let Some(temp) = self.cpu_temp {
            fields.set("CPU Temp", temp);
        }
        if let Some(usage) = self.disk_usage {
            fields.set("Disk Usage", usage);
        }
        fields
    }
}

/// Monitor principal.
pub struct SystemMonitor {
    sys: System,
    networks: Networks,
    components: Components,
    disks: Disks,
    cpu_sample: Duration,
    temperature_sensor: String,
    disk_mount: PathBuf,
}

impl SystemMonitor {
    pub fn new(config: &PerfConfig) -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let components = Components::new_with_refreshed_list();
        if components.iter().next().is_none() {
            warn!("✗ Nenhum sensor de temperatura encontrado, CPU Temp será omitido");
        } else {
            info!("✓ {} sensores de temperatura", components.iter().count());
        }

        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            components,
            disks: Disks::new_with_refreshed_list(),
            cpu_sample: config.cpu_sample().max(MINIMUM_CPU_UPDATE_INTERVAL),
            temperature_sensor: config.temperature_sensor.clone(),
            disk_mount: PathBuf::from(&config.disk_mount),
        }
    }

    /// Atualiza os subsistemas e devolve a amostra. Bloqueia pela janela de CPU.
    pub fn sample(&mut self) -> Sample {
        self.sys.refresh_cpu_usage();
        std::thread::sleep(self.cpu_sample);
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.networks.refresh(true);
        self.components.refresh(true);
        self.disks.refresh(true);

        let (bytes_sent, bytes_received) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(sent, recv), (_name, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    recv.saturating_add(data.total_received()),
                )
            });

        let cpu_temp = pick_cpu_temperature(
            self.components.iter().map(|c| (c.label(), c.temperature())),
            &self.temperature_sensor,
        );

        let disk_usage = disk_usage(
            self.disks
                .iter()
                .map(|d| (d.mount_point(), d.total_space(), d.available_space())),
            &self.disk_mount,
        );
        if disk_usage.is_none() {
            debug!(mount = %self.disk_mount.display(), "Ponto de montagem não encontrado");
        }

        Sample {
            cpu_load: round1(f64::from(self.sys.global_cpu_usage())),
            bytes_sent,
            bytes_received,
            ram_usage: round1(percent(self.sys.used_memory(), self.sys.total_memory())),
            cpu_temp: cpu_temp.map(|t| round1(f64::from(t))),
            disk_usage: disk_usage.map(round1),
        }
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Temperatura da CPU entre os sensores disponíveis.
///
/// Um rótulo que contém `hint` (ex: `cpu-thermal` no Raspberry Pi) vence;
/// sem ele, vale a maior leitura entre rótulos com cara de CPU.
fn pick_cpu_temperature<'a>(
    readings: impl IntoIterator<Item = (&'a str, Option<f32>)>,
    hint: &str,
) -> Option<f32> {
    let hint = hint.to_lowercase();
    let mut best: Option<f32> = None;

    for (label, temp) in readings {
        let Some(t) = temp.filter(|t| t.is_finite() && *t < MAX_PLAUSIBLE_TEMP) else {
            continue;
        };
        let label = label.to_lowercase();
        if !hint.is_empty() && label.contains(&hint) {
            return Some(t);
        }
        if label.contains("cpu")
            || label.contains("tctl")
            || label.contains("tdie")
            || label.contains("package")
            || label.contains("core")
        {
            best = Some(best.map_or(t, |b| b.max(t)));
        }
    }
    best
}

/// Uso (%) do disco montado exatamente em `mount`.
fn disk_usage<'a>(
    disks: impl IntoIterator<Item = (&'a Path, u64, u64)>,
    mount: &Path,
) -> Option<f64> {
    disks
        .into_iter()
        .find(|(mount_point, _, _)| *mount_point == mount)
        .map(|(_, total, available)| percent(total.saturating_sub(available), total))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

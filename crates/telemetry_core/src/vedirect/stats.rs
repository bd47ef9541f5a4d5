//! Contadores do decodificador e relatório periódico.

use std::time::{Duration, Instant};
use tracing::info;

/// Acima deste valor, em qualquer contador, os três voltam a zero.
pub const COUNTER_RESET_THRESHOLD: u32 = 2_000_000_000;

/// Intervalo padrão entre relatórios.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Evento que o tracker observa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    Inserted,
    ChecksumError,
    Exception,
    Overflow,
}

/// Fotografia dos contadores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub checksum_errors: u32,
    pub exception_errors: u32,
    pub records_inserted: u32,
}

impl Counters {
    fn max(&self) -> u32 {
        self.checksum_errors
            .max(self.exception_errors)
            .max(self.records_inserted)
    }
}

#[derive(Debug)]
pub struct Stats {
    counters: Counters,
    started: Instant,
    last_report: Instant,
    report_interval: Duration,
}

impl Stats {
    pub fn new(report_interval: Duration) -> Self {
        Self::starting_at(Instant::now(), report_interval)
    }

    pub fn starting_at(now: Instant, report_interval: Duration) -> Self {
        Self {
            counters: Counters::default(),
            started: now,
            last_report: now,
            report_interval,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    #[cfg(test)]
    pub(crate) fn set_counters(&mut self, counters: Counters) {
        self.counters = counters;
    }

    pub fn uptime_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Conta um evento terminal e aplica o reset anti-overflow.
    pub fn record(&mut self, event: StatEvent) {
        let c = &mut self.counters;
        match event {
            StatEvent::Inserted => c.records_inserted = c.records_inserted.saturating_add(1),
            StatEvent::ChecksumError => c.checksum_errors = c.checksum_errors.saturating_add(1),
            StatEvent::Exception => c.exception_errors = c.exception_errors.saturating_add(1),
            StatEvent::Overflow => {}
        }
        self.reset_if_needed();
    }

    fn reset_if_needed(&mut self) {
        if self.counters.max() > COUNTER_RESET_THRESHOLD {
            self.counters = Counters::default();
            info!("Contadores reiniciados");
        }
    }

    /// Loga contadores e uptime se o intervalo já passou desde o último relatório.
    pub fn maybe_report(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_report) < self.report_interval {
            return false;
        }
        self.last_report = now;
        let c = self.counters;
        info!(
            checksum_errors = c.checksum_errors,
            exception_errors = c.exception_errors,
            records_inserted = c.records_inserted,
            uptime = %format_uptime(self.uptime_at(now)),
            "Estatísticas do decodificador"
        );
        true
    }
}

/// Formata uma duração como `Nd HH:MM:SS`.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn counts_each_event_kind() {
        let mut stats = Stats::new(DEFAULT_REPORT_INTERVAL);
        stats.record(StatEvent::Inserted);
        stats.record(StatEvent::Inserted);
        stats.record(StatEvent::ChecksumError);
        stats.record(StatEvent::Exception);
        stats.record(StatEvent::Overflow);
        assert_eq!(
            stats.counters(),
            Counters {
                checksum_errors: 1,
                exception_errors: 1,
                records_inserted: 2,
            }
        );
    }

    #[traced_test]
    #[test]
    fn any_counter_over_threshold_resets_all_three() {
        let t0 = Instant::now();
        let mut stats = Stats::starting_at(t0, DEFAULT_REPORT_INTERVAL);
        stats.counters = Counters {
            checksum_errors: 7,
            exception_errors: COUNTER_RESET_THRESHOLD + 1,
            records_inserted: 12,
        };

        stats.record(StatEvent::Inserted);
        assert_eq!(stats.counters(), Counters::default());
        assert!(logs_contain("Contadores reiniciados"));

        let later = t0 + Duration::from_secs(42);
        assert_eq!(stats.uptime_at(later), Duration::from_secs(42));
    }

    #[test]
    fn overflow_event_also_triggers_the_reset_check() {
        let mut stats = Stats::new(DEFAULT_REPORT_INTERVAL);
        stats.counters.checksum_errors = COUNTER_RESET_THRESHOLD + 1;
        stats.record(StatEvent::Overflow);
        assert_eq!(stats.counters(), Counters::default());
    }

    #[test]
    fn threshold_itself_does_not_reset() {
        let mut stats = Stats::new(DEFAULT_REPORT_INTERVAL);
        stats.counters.records_inserted = COUNTER_RESET_THRESHOLD - 1;
        stats.record(StatEvent::Inserted);
        assert_eq!(stats.counters().records_inserted, COUNTER_RESET_THRESHOLD);
    }

    #[traced_test]
    #[test]
    fn reports_once_per_interval() {
        let t0 = Instant::now();
        let mut stats = Stats::starting_at(t0, Duration::from_secs(10));
        stats.record(StatEvent::ChecksumError);

        assert!(!stats.maybe_report(t0 + Duration::from_secs(9)));
        assert!(stats.maybe_report(t0 + Duration::from_secs(10)));
        assert!(logs_contain("Estatísticas do decodificador"));
        assert!(logs_contain("checksum_errors=1"));
        assert!(logs_contain("0d 00:00:10"));

        assert!(!stats.maybe_report(t0 + Duration::from_secs(15)));
        assert!(stats.maybe_report(t0 + Duration::from_secs(21)));
    }

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(Duration::ZERO), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(3_661)), "0d 01:01:01");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 23 * 3_600 + 59 * 60 + 5)),
            "2d 23:59:05"
        );
    }
}

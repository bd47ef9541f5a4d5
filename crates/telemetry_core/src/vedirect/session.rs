//! Sessão do decodificador: um laço sequencial, sem threads.
//!
//! Cada passo lê uma linha, alimenta o acumulador e, em um bloco completo,
//! carimba e grava o registro. Todo erro de estágio (leitura, mapeamento,
//! sink) volta como [`StageError`] e é tratado em um único ponto: log,
//! contagem como `exception_errors` e pausa de backoff. Nada encerra o laço.

use super::block::{BlockDecoder, BlockEvent};
use super::fields::FieldError;
use super::stats::{StatEvent, Stats};
use crate::serial::LineError;
use crate::sink::{RecordSink, SinkError};
use crate::types::Record;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Pausas fixas do laço.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pauses {
    /// Depois de cada registro gravado (limita a taxa de escrita no banco).
    pub after_insert: Duration,
    /// Depois de uma linha sem par chave/valor.
    pub malformed_line: Duration,
    /// Depois de qualquer erro absorvido pelo laço.
    pub error_backoff: Duration,
}

impl Pauses {
    /// Sem pausas (testes, replays de arquivo).
    pub const NONE: Pauses = Pauses {
        after_insert: Duration::ZERO,
        malformed_line: Duration::ZERO,
        error_backoff: Duration::ZERO,
    };
}

impl Default for Pauses {
    fn default() -> Self {
        Self {
            after_insert: Duration::from_secs(5),
            malformed_line: Duration::from_secs(3),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Falha de um estágio do ciclo.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{0}")]
    Read(#[from] LineError),

    #[error("{0}")]
    Map(#[from] FieldError),

    #[error("{0}")]
    Sink(#[from] SinkError),
}

impl StageError {
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Read(_) => "read",
            StageError::Map(_) => "map",
            StageError::Sink(_) => "sink",
        }
    }
}

/// O que aconteceu em um passo.
#[derive(Debug)]
pub enum Step {
    /// Timeout de leitura sem linha completa.
    Idle,
    /// Linha descartada pelo parser.
    Skipped,
    Accumulated,
    Inserted(Record),
    ChecksumError,
    Overflow,
    Failed(StageError),
}

/// Estado completo do decodificador, dono do bloco e dos contadores.
#[derive(Debug)]
pub struct DecoderSession {
    decoder: BlockDecoder,
    stats: Stats,
    measurement: String,
    pauses: Pauses,
}

impl DecoderSession {
    pub fn new(measurement: impl Into<String>, pauses: Pauses, stats: Stats) -> Self {
        Self {
            decoder: BlockDecoder::new(),
            stats,
            measurement: measurement.into(),
            pauses,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn decoder(&self) -> &BlockDecoder {
        &self.decoder
    }

    /// Consome a sequência de linhas até ela terminar.
    ///
    /// A porta serial nunca termina sozinha; o fim só vem de EOF ou de erro
    /// de E/S, e quem chama decide reabrir.
    pub fn run<I, S>(&mut self, lines: I, sink: &mut S)
    where
        I: IntoIterator<Item = Result<String, LineError>>,
        S: RecordSink + ?Sized,
    {
        for line in lines {
            self.step(line, sink);
        }
    }

    /// Descarta o bloco em andamento (ex.: ao reabrir a porta).
    pub fn discard_block(&mut self) {
        self.decoder.reset();
    }

    /// Processa uma leitura da fonte de linhas.
    pub fn step<S>(&mut self, line: Result<String, LineError>, sink: &mut S) -> Step
    where
        S: RecordSink + ?Sized,
    {
        self.stats.maybe_report(Instant::now());
        match self.advance(line, sink) {
            Ok(step) => step,
            Err(err) => self.absorb(err),
        }
    }

    fn advance<S>(&mut self, line: Result<String, LineError>, sink: &mut S) -> Result<Step, StageError>
    where
        S: RecordSink + ?Sized,
    {
        let line = match line {
            Err(LineError::TimedOut) => return Ok(Step::Idle),
            other => other?,
        };

        match self.decoder.feed(&line)? {
            BlockEvent::Ignored => {
                pause(self.pauses.malformed_line);
                Ok(Step::Skipped)
            }
            BlockEvent::Accumulated => Ok(Step::Accumulated),
            BlockEvent::Complete(fields) => {
                let record = Record::capture(self.measurement.as_str(), fields);
                sink.write(&record)?;
                self.stats.record(StatEvent::Inserted);
                debug!(time = %record.time_string(), fields = record.fields.len(), "Registro inserido");
                pause(self.pauses.after_insert);
                Ok(Step::Inserted(record))
            }
            BlockEvent::ChecksumMismatch { .. } => {
                self.stats.record(StatEvent::ChecksumError);
                Ok(Step::ChecksumError)
            }
            BlockEvent::Overflow { .. } => {
                self.stats.record(StatEvent::Overflow);
                Ok(Step::Overflow)
            }
        }
    }

    fn absorb(&mut self, err: StageError) -> Step {
        error!(
            stage = err.stage(),
            error = %err,
            debug_error = ?err,
            "Falha no ciclo do decodificador"
        );
        self.stats.record(StatEvent::Exception);
        pause(self.pauses.error_backoff);
        Step::Failed(err)
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

//! The operation facade consumed by the project-management layer.
//!
//! Every mutation is load → pure state transition → revision-checked save
//! → audit append → event publication. The revision a caller passes is
//! the one it last read; a mismatch fails with `StaleProcessState` before
//! anything is written, and retrying is the caller's decision.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use seiatrack_core::{
    AdmissibilityResult, AuditEntry, Clock, ConfigRegistry, DomainEvent, Instrument,
    ObservationDraft, Process, ProcessSummary, ResponseDraft, ReviewResult, RulingCondition,
    RulingResult, SystemClock, TrackerError, TransitionRecord,
};
use seiatrack_store::{AuditLog, FileStore, StoredProcess};

use crate::error::ServiceError;
use crate::sink::{EventSink, LogSink};

pub struct Tracker<C: Clock = SystemClock> {
    store: FileStore,
    audit: AuditLog,
    config: ConfigRegistry,
    clock: C,
    sink: Box<dyn EventSink>,
}

impl Tracker<SystemClock> {
    /// Open a tracker over `data_dir` with statutory defaults and the
    /// system clock.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        Self::with_parts(data_dir, ConfigRegistry::default(), SystemClock)
    }
}

impl<C: Clock> Tracker<C> {
    pub fn with_parts(
        data_dir: impl Into<PathBuf>,
        config: ConfigRegistry,
        clock: C,
    ) -> Result<Self, ServiceError> {
        let data_dir = data_dir.into();
        let store = FileStore::open(data_dir.join("processes"))?;
        let audit = AuditLog::open(data_dir.join("audit.jsonl"))?;
        Ok(Self {
            store,
            audit,
            config,
            clock,
            sink: Box::new(LogSink),
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    // ── Lifecycle operations ──

    pub fn start_process(
        &self,
        project_id: &str,
        instrument: Instrument,
        submitted_on: NaiveDate,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let config = self.config.get(instrument)?;
        let (process, events) = Process::start(
            project_id,
            instrument,
            submitted_on,
            config,
            self.clock.now(),
            actor,
        )?;
        let stored = self.store.create(&process)?;
        self.record(&stored.process, 0, &events)?;
        info!(project = project_id, %instrument, "process started");
        Ok(stored)
    }

    pub fn begin_admissibility(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.begin_admissibility(date, now, actor)
        })
    }

    pub fn register_admissibility(
        &self,
        project_id: &str,
        expected_revision: u64,
        result: AdmissibilityResult,
        date: NaiveDate,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.register_admissibility(result, date, now, actor)
        })
    }

    pub fn begin_evaluation(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.begin_evaluation(date, now, actor)
        })
    }

    pub fn issue_round(
        &self,
        project_id: &str,
        expected_revision: u64,
        emitted_on: NaiveDate,
        due_on: NaiveDate,
        observations: Vec<ObservationDraft>,
        actor: &str,
    ) -> Result<(StoredProcess, u32), ServiceError> {
        let now = self.clock.now();
        let mut number = 0;
        let stored = self.mutate(project_id, expected_revision, |p| {
            let (n, events) = p.issue_round(emitted_on, due_on, observations, now, actor)?;
            number = n;
            Ok(events)
        })?;
        Ok((stored, number))
    }

    pub fn add_observation(
        &self,
        project_id: &str,
        expected_revision: u64,
        round_number: u32,
        draft: ObservationDraft,
    ) -> Result<(StoredProcess, u64), ServiceError> {
        let mut id = 0;
        let stored = self.mutate(project_id, expected_revision, |p| {
            id = p.add_observation(round_number, draft)?;
            Ok(Vec::new())
        })?;
        Ok((stored, id))
    }

    pub fn file_adenda(
        &self,
        project_id: &str,
        expected_revision: u64,
        round_number: u32,
        submitted_on: NaiveDate,
        responses: Vec<ResponseDraft>,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.file_adenda(round_number, submitted_on, responses, now, actor)
        })
    }

    pub fn record_response(
        &self,
        project_id: &str,
        expected_revision: u64,
        round_number: u32,
        draft: ResponseDraft,
    ) -> Result<StoredProcess, ServiceError> {
        self.mutate(project_id, expected_revision, |p| {
            p.record_response(round_number, draft)?;
            Ok(Vec::new())
        })
    }

    pub fn qualify_adenda(
        &self,
        project_id: &str,
        expected_revision: u64,
        round_number: u32,
        review_date: NaiveDate,
        result: ReviewResult,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.qualify_adenda(round_number, review_date, result, now, actor)
        })
    }

    pub fn issue_ice(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        override_critical: bool,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.issue_ice(date, override_critical, now, actor)
        })
    }

    pub fn enter_commission(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.enter_commission(date, now, actor)
        })
    }

    pub fn register_ruling(
        &self,
        project_id: &str,
        expected_revision: u64,
        result: RulingResult,
        document_ref: &str,
        date: NaiveDate,
        conditions: Vec<RulingCondition>,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.register_ruling(result, document_ref, date, conditions, now, actor)
        })
    }

    pub fn withdraw(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        reason: &str,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.withdraw(date, reason, now, actor)
        })
    }

    pub fn lapse(
        &self,
        project_id: &str,
        expected_revision: u64,
        date: NaiveDate,
        reason: &str,
        actor: &str,
    ) -> Result<StoredProcess, ServiceError> {
        let now = self.clock.now();
        self.mutate(project_id, expected_revision, |p| {
            p.lapse(date, reason, now, actor)
        })
    }

    pub fn register_suspension(
        &self,
        project_id: &str,
        expected_revision: u64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        reason: &str,
    ) -> Result<StoredProcess, ServiceError> {
        self.mutate(project_id, expected_revision, |p| {
            p.register_suspension(from, to, reason)
        })
    }

    pub fn lift_suspension(
        &self,
        project_id: &str,
        expected_revision: u64,
        to: NaiveDate,
    ) -> Result<StoredProcess, ServiceError> {
        self.mutate(project_id, expected_revision, |p| p.lift_suspension(to))
    }

    // ── Reads ──

    /// The stored aggregate, revision included; callers keep the
    /// revision for their next mutation.
    pub fn load(&self, project_id: &str) -> Result<StoredProcess, ServiceError> {
        Ok(self.store.load(project_id)?)
    }

    /// Read-only projection; `as_of` defaults to the injected clock.
    pub fn get_summary(
        &self,
        project_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<(u64, ProcessSummary), ServiceError> {
        let stored = self.store.load(project_id)?;
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        Ok((stored.revision, ProcessSummary::project(&stored.process, as_of)))
    }

    /// The process's own append-only transition history.
    pub fn history(&self, project_id: &str) -> Result<Vec<TransitionRecord>, ServiceError> {
        Ok(self.store.load(project_id)?.process.transitions)
    }

    /// The shared audit log, filtered to one process.
    pub fn audit_trail(&self, project_id: &str) -> Result<Vec<AuditEntry>, ServiceError> {
        Ok(self.audit.read_for(project_id)?)
    }

    pub fn list(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.list()?)
    }

    // ── Scheduled scan ──

    /// Mark overdue unanswered rounds expired across every stored
    /// process. Idempotent; returns the affected project ids.
    pub fn expire_unanswered_rounds(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<String>, ServiceError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let mut affected = Vec::new();
        for project_id in self.store.list()? {
            let mut stored = self.store.load(&project_id)?;
            let events = stored.process.expire_rounds(as_of);
            if events.is_empty() {
                continue;
            }
            self.store.save(stored.revision, &stored.process)?;
            for event in &events {
                self.sink.publish(event);
            }
            affected.push(project_id);
        }
        info!(count = affected.len(), %as_of, "expiry scan complete");
        Ok(affected)
    }

    // ── Internals ──

    fn mutate(
        &self,
        project_id: &str,
        expected_revision: u64,
        op: impl FnOnce(&mut Process) -> Result<Vec<DomainEvent>, TrackerError>,
    ) -> Result<StoredProcess, ServiceError> {
        let mut stored = self.store.load(project_id)?;
        if stored.revision != expected_revision {
            return Err(TrackerError::StaleProcessState {
                expected: expected_revision,
                found: stored.revision,
            }
            .into());
        }
        let transitions_before = stored.process.transitions.len();
        let events = op(&mut stored.process)?;
        let saved = self.store.save(expected_revision, &stored.process)?;
        self.record(&saved.process, transitions_before, &events)?;
        Ok(saved)
    }

    fn record(
        &self,
        process: &Process,
        transitions_before: usize,
        events: &[DomainEvent],
    ) -> Result<(), ServiceError> {
        for record in &process.transitions[transitions_before..] {
            self.audit
                .append(&AuditEntry::from_transition(&process.project_id, record))?;
        }
        for event in events {
            self.sink.publish(event);
        }
        Ok(())
    }
}

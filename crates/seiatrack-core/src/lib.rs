pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod event;
pub mod observation;
pub mod process;
pub mod round;
pub mod summary;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigRegistry, DayCount, Instrument, InstrumentConfig};
pub use deadline::{DeadlineReport, RiskStatus};
pub use error::TrackerError;
pub use event::{AuditEntry, DomainEvent, TransitionRecord};
pub use observation::{
    Observation, ObservationDraft, ObservationKind, ObservationSummary, Priority, ResolutionState,
    Response, ResponseDraft, ResponseResolution, Sufficiency,
};
pub use process::{
    AdmissibilityResult, Process, ProcessStatus, Ruling, RulingCondition, RulingResult, Suspension,
};
pub use round::{Adenda, AdendaStatus, ReviewResult, Round, RoundStatus};
pub use summary::{NextAction, ProcessSummary};

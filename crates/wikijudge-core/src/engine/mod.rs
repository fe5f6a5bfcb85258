pub mod batch;
pub mod cancel;
pub mod case;
pub mod layout;
pub mod stages;
pub mod status;

pub use batch::{collect_results, BatchOrchestrator, BatchOutcome, CaseResult, RunMode};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use case::{CaseRunner, CaseSettings};
pub use layout::CaseLayout;
pub use stages::{StageController, StageInputs, StageOutputs};
pub use status::ExecutionStatus;

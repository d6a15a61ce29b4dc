//! Service modules for the upload/analysis workflow

pub mod contract_client;
pub mod elapsed_clock;
pub mod progress_mapper;
pub mod upload_orchestrator;

pub use contract_client::{BackendError, ContractBackend, HttpContractBackend};
pub use elapsed_clock::ElapsedClock;
pub use progress_mapper::{
    map_stage_progress, AnalyzeStageStrategy, SimulatedStage, ThresholdSchedule,
};
pub use upload_orchestrator::{
    CompletionCallback, OrchestratorSettings, UploadOrchestrator, UploadOrchestratorBuilder,
};

//! Data models for cle-upload
//!
//! - Processing stages and the stage table
//! - Upload inputs and analysis results
//! - Upload session state machine

pub mod contract;
pub mod session;
pub mod stage;

pub use contract::{AnalysisSummary, IngestReceipt, SeverityCounts, UploadFile, UploadRequest};
pub use session::{Session, SessionSnapshot, StateTransition};
pub use stage::{stage_info, ProcessingStage, StageInfo};

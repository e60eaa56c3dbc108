//! Agent calls against a text generator and the multi-stage component pipeline.
//!
//! Every call goes through [`AgentCall`], which turns free-form model output
//! into structured data with `extract` and reports failures as data.

pub mod call;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod prompt;
pub mod retry;

pub use call::{AgentCall, AgentResponse, CallMetadata, FailureKind, ResponseFormat};
pub use config::{GeneratorConfig, OperationMode, PipelineConfig, RetryConfig, ValidationConfig};
pub use llm::{GenerateOptions, Generator, LlmClient};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::{Pipeline, PipelineOutput, Stage, StageReport};
pub use retry::RetryPolicy;

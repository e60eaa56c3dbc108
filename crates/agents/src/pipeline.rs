use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use extract::{ExpectedShape, ParseStrategy};
use validate::{ContentValidator, MatchOptions, UtilizationReport};

use crate::call::{AgentCall, AgentResponse, ResponseFormat};
use crate::config::{PipelineConfig, ValidationConfig};
use crate::llm::{GenerateOptions, Generator};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::prompt;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Spec,
    Design,
    Content,
    Layout,
    Code,
    Style,
    Validate,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Spec,
        Stage::Design,
        Stage::Content,
        Stage::Layout,
        Stage::Code,
        Stage::Style,
        Stage::Validate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Spec => "spec",
            Stage::Design => "design",
            Stage::Content => "content",
            Stage::Layout => "layout",
            Stage::Code => "code",
            Stage::Style => "style",
            Stage::Validate => "validate",
        }
    }

    pub fn format(&self) -> ResponseFormat {
        match self {
            Stage::Code | Stage::Style => ResponseFormat::Text,
            _ => ResponseFormat::Json(ExpectedShape::Object),
        }
    }

    /// Structure substituted when a JSON stage fails.
    fn fallback(&self, user_prompt: &str) -> Value {
        match self {
            Stage::Spec => json!({
                "componentType": "landing-page",
                "purpose": user_prompt,
                "audience": "general",
                "sections": ["hero", "features", "testimonials", "cta"],
            }),
            Stage::Design => json!({
                "colorScheme": {"primary": "#2563eb", "background": "#ffffff", "text": "#111827"},
                "typography": {"fontFamily": "Inter, sans-serif"},
                "spacing": "comfortable",
                "style": "modern",
            }),
            Stage::Layout => json!({
                "structure": "single-column",
                "sections": [],
            }),
            Stage::Validate => json!({
                "valid": null,
                "issues": [],
                "suggestions": [],
            }),
            // No content means nothing to check, which validates as a pass.
            Stage::Content | Stage::Code | Stage::Style => json!({}),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub success: bool,
    pub used_fallback: bool,
    pub duration_ms: u64,
    pub strategy: Option<ParseStrategy>,
    pub error: Option<String>,
}

impl StageReport {
    fn from_response(stage: Stage, response: &AgentResponse, used_fallback: bool) -> Self {
        Self {
            stage,
            success: response.success,
            used_fallback,
            duration_ms: response.metadata.duration_ms,
            strategy: response.metadata.strategy,
            error: response.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub request_id: Uuid,
    pub component_code: String,
    pub utilization: UtilizationReport,
    pub review: Value,
    pub stages: Vec<StageReport>,
    pub metrics: MetricsSnapshot,
}

/// Runs the agents one after another: spec, design, content, layout, code,
/// style, validate.
pub struct Pipeline<G: Generator> {
    generator: G,
    call: AgentCall,
    retry: RetryPolicy,
    validator: ContentValidator,
    validation: ValidationConfig,
    metrics: Arc<Metrics>,
}

impl<G: Generator> Pipeline<G> {
    pub fn new(generator: G, config: &PipelineConfig) -> Self {
        Self {
            generator,
            call: AgentCall::new(GenerateOptions::from_config(&config.generator)),
            retry: RetryPolicy::from_config(&config.retry),
            validator: ContentValidator::new(MatchOptions {
                long_string_threshold: config.validation.long_string_threshold,
                prefix_len: config.validation.prefix_len,
            }),
            validation: config.validation.clone(),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Generate a component for `user_prompt`. Only a failed code stage is an error.
    pub async fn run(&self, user_prompt: &str) -> Result<PipelineOutput> {
        let request_id = Uuid::new_v4();
        let span = info_span!("generation", request_id = %request_id);
        self.run_stages(request_id, user_prompt).instrument(span).await
    }

    async fn run_stages(&self, request_id: Uuid, user_prompt: &str) -> Result<PipelineOutput> {
        info!(prompt_chars = user_prompt.len(), "Starting generation");
        let mut stages = Vec::with_capacity(Stage::ALL.len());

        let spec_prompt = prompt::build_spec_prompt(user_prompt);
        let spec = self
            .json_stage(Stage::Spec, &spec_prompt, user_prompt, &mut stages)
            .await;

        let design_prompt = prompt::build_design_prompt(&spec);
        let design = self
            .json_stage(Stage::Design, &design_prompt, user_prompt, &mut stages)
            .await;

        let content_prompt = prompt::build_content_prompt(user_prompt, &spec);
        let content = self
            .json_stage(Stage::Content, &content_prompt, user_prompt, &mut stages)
            .await;

        let layout_prompt = prompt::build_layout_prompt(&spec, &design, &content);
        let layout = self
            .json_stage(Stage::Layout, &layout_prompt, user_prompt, &mut stages)
            .await;

        let code_prompt = prompt::build_code_prompt(&layout, &design, &content, &[]);
        let Some(mut code) = self.text_stage(Stage::Code, &code_prompt, &mut stages).await else {
            anyhow::bail!("Code generation failed");
        };

        let mut utilization = self.validator.validate(&content, &code);
        info!(rate = utilization.utilization_rate, "{}", utilization.summary());

        let mut regenerations = 0;
        while utilization.is_shortfall(self.validation.min_utilization_rate)
            && regenerations < self.validation.max_regenerations
        {
            regenerations += 1;
            self.metrics.record_regeneration();
            warn!(
                rate = utilization.utilization_rate,
                missing = utilization.missing_elements.len(),
                attempt = regenerations,
                "Content utilization below threshold, regenerating code"
            );

            let missing = &utilization.missing_elements;
            let retry_prompt = prompt::build_code_prompt(&layout, &design, &content, missing);
            let regenerated = self
                .text_stage(Stage::Code, &retry_prompt, &mut stages)
                .await;
            if let Some(candidate) = regenerated {
                let report = self.validator.validate(&content, &candidate);
                if report.utilization_rate > utilization.utilization_rate {
                    code = candidate;
                    utilization = report;
                }
            }
        }

        let style_prompt = prompt::build_style_prompt(&code, &design);
        if let Some(styled) = self.text_stage(Stage::Style, &style_prompt, &mut stages).await {
            let report = self.validator.validate(&content, &styled);
            if report.utilization_rate >= utilization.utilization_rate {
                code = styled;
                utilization = report;
            } else {
                warn!(
                    before = utilization.utilization_rate,
                    after = report.utilization_rate,
                    "Styling dropped content, keeping unstyled code"
                );
            }
        }

        let review = self
            .json_stage(
                Stage::Validate,
                &prompt::build_review_prompt(&code, &utilization),
                user_prompt,
                &mut stages,
            )
            .await;

        info!(
            rate = utilization.utilization_rate,
            fallbacks = stages.iter().filter(|s| s.used_fallback).count(),
            "Generation finished"
        );

        Ok(PipelineOutput {
            request_id,
            component_code: code,
            utilization,
            review,
            stages,
            metrics: self.metrics.snapshot(),
        })
    }

    /// Run a JSON stage, substituting the stage fallback on failure.
    async fn json_stage(
        &self,
        stage: Stage,
        prompt: &str,
        user_prompt: &str,
        reports: &mut Vec<StageReport>,
    ) -> Value {
        let response = self.execute(stage, prompt).await;

        let (value, used_fallback) = match response.response.clone() {
            Some(value) if response.success => (value, false),
            _ => {
                self.metrics.record_fallback();
                warn!(stage = stage.name(), "Using fallback structure");
                (stage.fallback(user_prompt), true)
            }
        };

        reports.push(StageReport::from_response(stage, &response, used_fallback));
        value
    }

    async fn text_stage(
        &self,
        stage: Stage,
        prompt: &str,
        reports: &mut Vec<StageReport>,
    ) -> Option<String> {
        let response = self.execute(stage, prompt).await;
        reports.push(StageReport::from_response(stage, &response, false));
        response.text().map(str::to_string).filter(|text| !text.is_empty())
    }

    /// One agent call under the configured retry policy; the last attempt is returned.
    async fn execute(&self, stage: Stage, prompt: &str) -> AgentResponse {
        let this = self;
        let outcome = self
            .retry
            .retry(stage.name(), move || async move {
                let response = this
                    .call
                    .call(stage.name(), prompt, stage.format(), &this.generator)
                    .await;
                this.metrics.record_call(&response);
                if response.success { Ok(response) } else { Err(response) }
            })
            .await;

        match outcome {
            Ok(response) | Err(response) => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::tests::ScriptedGenerator;
    use crate::config::RetryConfig;

    const SPEC: &str = r#"{"componentType": "landing-page", "sections": ["hero", "features"]}"#;
    const DESIGN: &str = "```json\n{colorScheme: {primary: '#000'},}\n```";
    const CONTENT: &str = r#"Here is the content: {
        "hero": {"headline": "Ship faster"},
        "features": [{"title": "Instant previews"}, {"title": "Secure"}]
    }"#;
    const LAYOUT: &str = r#"{"structure": "stack", "sections": []}"#;
    const FULL_CODE: &str = "export default function Page() {
  return <main><h1>Ship faster</h1><p>Instant previews</p><p>Secure</p></main>;
}";
    const PARTIAL_CODE: &str = "export default function Page() {
  return <main><h1>Ship faster</h1></main>;
}";
    const REVIEW: &str = r#"{"valid": true, "issues": [], "suggestions": []}"#;

    fn config() -> PipelineConfig {
        PipelineConfig {
            retry: RetryConfig {
                max_retries: 0,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            },
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_full_run() {
        let generator = ScriptedGenerator::new(vec![
            Ok(SPEC),
            Ok(DESIGN),
            Ok(CONTENT),
            Ok(LAYOUT),
            Ok(FULL_CODE),
            Ok(FULL_CODE),
            Ok(REVIEW),
        ]);
        let pipeline = Pipeline::new(generator, &config());
        let output = pipeline.run("a landing page for a dev tool").await.unwrap();

        assert_eq!(output.component_code, FULL_CODE);
        assert_eq!(output.utilization.utilization_rate, 1.0);
        assert_eq!(output.review["valid"], true);
        let names: Vec<Stage> = output.stages.iter().map(|s| s.stage).collect();
        assert_eq!(names, Stage::ALL.to_vec());
        assert!(output.stages.iter().all(|s| !s.used_fallback));
        assert_eq!(output.metrics.total_calls, 7);
        assert_eq!(output.metrics.repaired_parses, 1);
    }

    #[tokio::test]
    async fn test_fallback_and_regeneration() {
        let generator = ScriptedGenerator::new(vec![
            Ok("I cannot produce JSON today."),
            Err("timeout"),
            Ok(CONTENT),
            Ok(LAYOUT),
            Ok(PARTIAL_CODE),
            Ok(FULL_CODE),
            Ok(FULL_CODE),
            Ok(REVIEW),
        ]);
        let pipeline = Pipeline::new(generator, &config());
        let output = pipeline.run("a landing page").await.unwrap();

        assert!(output.stages[0].used_fallback);
        assert!(output.stages[1].used_fallback);
        assert_eq!(output.stages[1].error.as_deref(), Some("timeout"));
        assert_eq!(output.component_code, FULL_CODE);
        assert_eq!(output.utilization.utilization_rate, 1.0);
        assert_eq!(output.metrics.regenerations, 1);
        assert_eq!(output.metrics.fallbacks_used, 2);
        assert_eq!(output.metrics.upstream_failures, 1);
        assert_eq!(output.metrics.parse_failures, 1);
    }

    #[tokio::test]
    async fn test_style_that_drops_content_is_rejected() {
        let generator = ScriptedGenerator::new(vec![
            Ok(SPEC),
            Ok(DESIGN),
            Ok(CONTENT),
            Ok(LAYOUT),
            Ok(FULL_CODE),
            Ok(PARTIAL_CODE),
            Ok(REVIEW),
        ]);
        let pipeline = Pipeline::new(generator, &config());
        let output = pipeline.run("a landing page").await.unwrap();

        assert_eq!(output.component_code, FULL_CODE);
        assert_eq!(output.utilization.utilization_rate, 1.0);
    }

    #[tokio::test]
    async fn test_code_failure_aborts() {
        let generator = ScriptedGenerator::new(vec![
            Ok(SPEC),
            Ok(DESIGN),
            Ok(CONTENT),
            Ok(LAYOUT),
            Ok("  "),
        ]);
        let pipeline = Pipeline::new(generator, &config());
        let err = pipeline.run("a landing page").await.unwrap_err();
        assert_eq!(err.to_string(), "Code generation failed");
    }

    #[tokio::test]
    async fn test_retry_policy_applies_to_calls() {
        let mut config = config();
        config.retry.max_retries = 1;
        let generator = ScriptedGenerator::new(vec![
            Err("overloaded"),
            Ok(SPEC),
            Ok(DESIGN),
            Ok(CONTENT),
            Ok(LAYOUT),
            Ok(FULL_CODE),
            Ok(FULL_CODE),
            Ok(REVIEW),
        ]);
        let pipeline = Pipeline::new(generator, &config);
        let output = pipeline.run("a landing page").await.unwrap();

        assert!(!output.stages[0].used_fallback);
        assert_eq!(output.metrics.total_calls, 8);
        assert_eq!(output.metrics.upstream_failures, 1);
    }
}

//! Dry-run description of a pipeline run

use crate::config::{RelocationMode, RelocatorBackend, Settings, StepPolicy};
use crate::load::WriteDisposition;
use crate::naming::RunContext;
use crate::schema::SampleBudget;
use crate::warehouse::{create_stage_sql, export_sql};
use serde::Serialize;

/// Everything a run would do, resolved but not executed
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub context: RunContext,
    pub stage: StagePlan,
    pub relocation: RelocationPlan,
    pub sampling: SamplingPlan,
    pub load: LoadPlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagePlan {
    pub name: String,
    pub url: String,
    pub create_sql: String,
    pub export_sql: String,
    pub on_stage_failure: StepPolicy,
    pub on_export_failure: StepPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelocationPlan {
    pub source: String,
    pub destination: String,
    pub mode: RelocationMode,
    pub backend: RelocatorBackend,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingPlan {
    pub bucket: String,
    pub prefix: String,
    pub suffix: String,
    pub budget: SampleBudget,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadPlan {
    pub source_uri: String,
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub write_disposition: WriteDisposition,
}

impl Plan {
    /// Resolve the plan for a run
    pub fn new(ctx: &RunContext, settings: &Settings) -> Self {
        Self {
            context: ctx.clone(),
            stage: StagePlan {
                name: ctx.stage_name(),
                url: ctx.stage_url(),
                create_sql: create_stage_sql(ctx),
                export_sql: export_sql(ctx, settings.snowflake.max_file_size),
                on_stage_failure: settings.policy.stage_creation,
                on_export_failure: settings.policy.export,
            },
            relocation: RelocationPlan {
                source: ctx.relocation_source(),
                destination: ctx.relocation_destination(),
                mode: settings.relocation.mode,
                backend: settings.relocation.backend,
            },
            sampling: SamplingPlan {
                bucket: ctx.target_bucket(),
                prefix: ctx.loadset_prefix(),
                suffix: settings.sampling.suffix.clone(),
                budget: settings.sampling.budget(),
            },
            load: LoadPlan {
                source_uri: ctx.load_uri(),
                project: settings
                    .bigquery
                    .project
                    .clone()
                    .unwrap_or_else(|| ctx.default_project()),
                dataset: settings.bigquery.dataset.clone(),
                table: ctx.destination_table(),
                write_disposition: WriteDisposition::Truncate,
            },
        }
    }

    /// Pretty JSON rendering
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

//! Pipeline driver

use crate::config::{Settings, StepPolicy};
use crate::error::{Error, Result};
use crate::load::{LoadRequest, TableLoader, WriteDisposition};
use crate::naming::RunContext;
use crate::schema::{CompositeSchema, SampleReader, SampleStats};
use crate::storage::Relocator;
use crate::warehouse::{create_stage_sql, export_sql, Warehouse};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CreateStage,
    Export,
    Relocate,
    InferSchema,
    Load,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::CreateStage => "create_stage",
            Step::Export => "export",
            Step::Relocate => "relocate",
            Step::InferSchema => "infer_schema",
            Step::Load => "load",
        };
        f.write_str(name)
    }
}

/// How a step ended in a run that kept going
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum StepOutcome {
    Succeeded,
    /// Failed, tolerated under a `warn` policy
    Failed(String),
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<(Step, StepOutcome)>,
    pub schema: CompositeSchema,
    pub sample: SampleStats,
    /// Objects relocated, when the relocator reports it
    pub relocated: Option<usize>,
    pub job_id: String,
    pub output_rows: u64,
}

impl RunReport {
    /// Outcome recorded for a step
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    /// Whether any step failed and was tolerated
    pub fn has_warnings(&self) -> bool {
        self.steps
            .iter()
            .any(|(_, o)| matches!(o, StepOutcome::Failed(_)))
    }
}

/// One replace-load of a table, wired to its collaborators
pub struct Pipeline {
    ctx: RunContext,
    settings: Settings,
    relocator: Box<dyn Relocator>,
    sampler: SampleReader,
    loader: Box<dyn TableLoader>,
}

impl Pipeline {
    /// Create a pipeline
    ///
    /// `sampler` must read from the destination bucket.
    pub fn new(
        ctx: RunContext,
        settings: Settings,
        relocator: Box<dyn Relocator>,
        sampler: SampleReader,
        loader: Box<dyn TableLoader>,
    ) -> Self {
        Self {
            ctx,
            settings,
            relocator,
            sampler,
            loader,
        }
    }

    /// Run every step against an open warehouse session
    ///
    /// The session is closed before returning, whether the run succeeded
    /// or not.
    pub async fn run(&self, warehouse: &dyn Warehouse) -> Result<RunReport> {
        let result = self.run_steps(warehouse).await;
        if let Err(e) = warehouse.close().await {
            warn!(error = %e, "Failed to close warehouse session");
        }
        if let Err(e) = &result {
            error!(error = %e, table = %self.ctx.source_table(), "Pipeline failed");
        }
        result
    }

    async fn run_steps(&self, warehouse: &dyn Warehouse) -> Result<RunReport> {
        let ctx = &self.ctx;
        let mut report = RunReport::default();

        let stage = warehouse
            .execute(&create_stage_sql(ctx))
            .await
            .map_err(|e| Error::StageCreation {
                stage: ctx.stage_name(),
                message: e.to_string(),
            });
        if stage.is_ok() {
            info!(stage = %ctx.stage_name(), url = %ctx.stage_url(), "Stage created or replaced");
        }
        apply_policy(
            &mut report,
            Step::CreateStage,
            stage.map(|_| ()),
            self.settings.policy.stage_creation,
        )?;

        let export = warehouse
            .execute(&export_sql(ctx, self.settings.snowflake.max_file_size))
            .await
            .map_err(|e| Error::Export {
                table: ctx.source_table(),
                message: e.to_string(),
            });
        if let Ok(result) = &export {
            info!(
                table = %ctx.source_table(),
                url = %ctx.stage_url(),
                rows = ?result.rows,
                "Table exported"
            );
        }
        apply_policy(
            &mut report,
            Step::Export,
            export.map(|_| ()),
            self.settings.policy.export,
        )?;

        let source = ctx.relocation_source();
        let destination = ctx.relocation_destination();
        let relocation = self.relocator.relocate(&source, &destination).await?;
        info!(source = %source, destination = %destination, mode = ?self.relocator.mode(), "Files relocated");
        report.relocated = relocation.objects;
        report.steps.push((Step::Relocate, StepOutcome::Succeeded));

        let (schema, sample) = self.sampler.infer(&ctx.loadset_prefix()).await?;
        report.steps.push((Step::InferSchema, StepOutcome::Succeeded));

        let request = LoadRequest {
            source_uri: ctx.load_uri(),
            project: self
                .settings
                .bigquery
                .project
                .clone()
                .unwrap_or_else(|| ctx.default_project()),
            dataset: self.settings.bigquery.dataset.clone(),
            table: ctx.destination_table(),
            schema: schema.clone(),
            write_disposition: WriteDisposition::Truncate,
        };
        let outcome = self.loader.load(&request).await?;
        info!(
            rows = outcome.output_rows,
            source = %request.source_uri,
            destination = %request.destination(),
            "Loaded rows"
        );
        report.steps.push((Step::Load, StepOutcome::Succeeded));

        report.schema = schema;
        report.sample = sample;
        report.job_id = outcome.job_id;
        report.output_rows = outcome.output_rows;
        Ok(report)
    }
}

fn apply_policy(
    report: &mut RunReport,
    step: Step,
    result: Result<()>,
    policy: StepPolicy,
) -> Result<()> {
    match result {
        Ok(()) => {
            report.steps.push((step, StepOutcome::Succeeded));
            Ok(())
        }
        Err(e) if policy == StepPolicy::Warn && e.is_tolerable() => {
            warn!(step = %step, error = %e, "Step failed, continuing under warn policy");
            report.steps.push((step, StepOutcome::Failed(e.to_string())));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

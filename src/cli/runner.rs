//! CLI runner - wires real collaborators and runs the pipeline

use crate::cli::commands::Cli;
use crate::config::{RelocatorBackend, Settings};
use crate::error::Result;
use crate::load::BigQueryLoader;
use crate::naming::RunContext;
use crate::pipeline::{Pipeline, Plan};
use crate::schema::SampleReader;
use crate::storage::{bucket_opener, GsutilRelocator, ObjectStoreRelocator, Relocator};
use crate::warehouse::SnowflakeWarehouse;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load settings and apply command-line overrides
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.cli.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        if let Some(files) = self.cli.file_limit {
            settings.sampling.max_files = files;
        }
        if let Some(lines) = self.cli.line_limit {
            settings.sampling.max_lines_per_file = lines;
        }
        if let Some(mode) = self.cli.relocation {
            settings.relocation.mode = mode;
        }
        if let Some(backend) = self.cli.relocator {
            settings.relocation.backend = backend;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Build the run context from the positional arguments
    pub fn context(&self) -> Result<RunContext> {
        RunContext::new(
            &self.cli.database,
            &self.cli.schema,
            &self.cli.table,
            &self.cli.env,
        )
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = self.settings()?;
        let ctx = self.context()?;

        if self.cli.plan {
            println!("{}", Plan::new(&ctx, &settings).to_json_pretty());
            return Ok(());
        }

        let opener = bucket_opener(&settings.storage);
        let relocator: Box<dyn Relocator> = match settings.relocation.backend {
            RelocatorBackend::Gsutil => Box::new(GsutilRelocator::new(
                settings.relocation.gsutil_path.clone(),
                settings.relocation.mode,
            )),
            RelocatorBackend::Native => {
                Box::new(ObjectStoreRelocator::new(opener.clone(), settings.relocation.mode))
            }
        };
        let sampler = SampleReader::new(opener(&ctx.target_bucket())?, settings.sampling.budget())
            .with_suffix(settings.sampling.suffix.clone());
        let loader = BigQueryLoader::new(&settings)?;

        let warehouse = SnowflakeWarehouse::connect(&settings, &ctx).await?;
        let pipeline = Pipeline::new(ctx, settings, relocator, sampler, Box::new(loader));
        let report = pipeline.run(&warehouse).await?;

        info!(
            rows = report.output_rows,
            job_id = %report.job_id,
            fields = report.schema.len(),
            warnings = report.has_warnings(),
            "Run complete"
        );
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelocationMode;
    use clap::Parser;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["sf2cdp", "SALES", "Orders", "LINES", "PROD"];
        argv.extend_from_slice(args);
        Runner::new(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_context_lowercased() {
        let ctx = runner(&[]).context().unwrap();
        assert_eq!(ctx.database, "sales");
        assert_eq!(ctx.schema, "orders");
        assert_eq!(ctx.table, "lines");
        assert_eq!(ctx.environment, "prod");
    }

    #[test]
    fn test_cli_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "sampling:\n  max_files: 4\nrelocation:\n  mode: copy\n").unwrap();

        let settings = runner(&["-C", path.to_str().unwrap(), "--line-limit", "25"])
            .settings()
            .unwrap();
        assert_eq!(settings.sampling.max_files, 4);
        assert_eq!(settings.sampling.max_lines_per_file, 25);
        assert_eq!(settings.relocation.mode, RelocationMode::Copy);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(runner(&["--file-limit", "0"]).settings().is_err());
    }

    #[tokio::test]
    async fn test_plan_mode_runs_nothing() {
        // No credentials are configured; plan mode must not need any
        runner(&["--plan"]).run().await.unwrap();
    }
}

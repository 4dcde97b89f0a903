//! SQL statement builders

use crate::naming::RunContext;

/// Create-or-replace the external stage the export writes to
pub fn create_stage_sql(ctx: &RunContext) -> String {
    format!(
        "CREATE OR REPLACE STAGE {stage}\n    URL='{url}'\n    STORAGE_INTEGRATION = {integration};",
        stage = ctx.stage_name(),
        url = ctx.stage_url(),
        integration = ctx.storage_integration(),
    )
}

/// Export the whole table as gzip-compressed JSON lines into the stage
///
/// Each row becomes one JSON object. Files already in the stage location
/// are overwritten.
pub fn export_sql(ctx: &RunContext, max_file_size: u64) -> String {
    format!(
        "COPY INTO @{stage}
FROM (
    SELECT OBJECT_CONSTRUCT(*) AS json_output
    FROM {table}
)
FILE_FORMAT = (TYPE = 'JSON', COMPRESSION = 'AUTO')
OVERWRITE = TRUE
SINGLE = FALSE
MAX_FILE_SIZE = {max_file_size}
HEADER = FALSE",
        stage = ctx.stage_name(),
        table = ctx.source_table(),
    )
}

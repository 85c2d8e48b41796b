//! The schema patches applied by hand to the production ERP database,
//! in the order they were rolled out.

use crate::backfill::BackfillPlan;
use crate::schema_patch::{
    ColumnDef, ColumnPatch, ColumnType, DefaultValue, PatchStep, SchemaPatch, TablePatch,
};
use crate::CoreError;

/// Stage tracking for each filming location attached to a project.
pub const STAGE_TRACKING: &str = "stage_tracking";

/// JSON-array `stages` column that replaces the single `stage` value.
pub const LOCATION_STAGE_LIST: &str = "location_stage_list";

/// Scouting details on the shared `locations` table.
pub const LOCATION_DETAILS: &str = "location_details";

/// Account classification on `users`.
pub const USER_TYPE: &str = "user_type";

/// Every patch in rollout order.
pub fn all() -> Result<Vec<SchemaPatch>, CoreError> {
    Ok(vec![
        stage_tracking()?,
        location_stage_list()?,
        location_details()?,
        user_type()?,
    ])
}

/// Names of every patch in rollout order.
pub fn names() -> [&'static str; 4] {
    [STAGE_TRACKING, LOCATION_STAGE_LIST, LOCATION_DETAILS, USER_TYPE]
}

/// Look up one patch by name.
pub fn find(name: &str) -> Result<SchemaPatch, CoreError> {
    match name {
        STAGE_TRACKING => stage_tracking(),
        LOCATION_STAGE_LIST => location_stage_list(),
        LOCATION_DETAILS => location_details(),
        USER_TYPE => user_type(),
        other => Err(CoreError::UnknownPatch(other.to_string())),
    }
}

/// Resolve a list of names, or the whole catalog when the list is empty.
pub fn select(names: &[String]) -> Result<Vec<SchemaPatch>, CoreError> {
    if names.is_empty() {
        return all();
    }
    names.iter().map(|n| find(n)).collect()
}

/// `project_locations.stage` (one value) -> `project_locations.stages` (JSON array).
pub fn stage_backfill() -> Result<BackfillPlan, CoreError> {
    BackfillPlan::new("project_locations", "id", "stage", "stages")
}

fn add_column(table: &str, column: ColumnDef) -> Result<PatchStep, CoreError> {
    Ok(PatchStep::AddColumn(ColumnPatch::new(table, column)?))
}

fn stage_tracking() -> Result<SchemaPatch, CoreError> {
    let table = "project_location_stages";
    Ok(SchemaPatch {
        name: STAGE_TRACKING,
        description: "Per-stage progress for project locations",
        steps: vec![
            PatchStep::CreateTable(TablePatch::new(
                table,
                vec![
                    ColumnDef::new("id", ColumnType::Id)?,
                    ColumnDef::new("project_location_id", ColumnType::BigInt)?.not_null(),
                    ColumnDef::new("stage", ColumnType::Text)?.not_null(),
                    ColumnDef::new("created_at", ColumnType::Timestamp)?
                        .default(DefaultValue::CurrentTimestamp),
                ],
            )?),
            add_column(
                table,
                ColumnDef::new("status", ColumnType::Text)?
                    .default(DefaultValue::Text("pending".into())),
            )?,
            add_column(table, ColumnDef::new("notes", ColumnType::Text)?)?,
            add_column(table, ColumnDef::new("completed_at", ColumnType::Timestamp)?)?,
        ],
    })
}

fn location_stage_list() -> Result<SchemaPatch, CoreError> {
    Ok(SchemaPatch {
        name: LOCATION_STAGE_LIST,
        description: "Multi-valued stages column on project locations (backfilled from stage)",
        steps: vec![add_column(
            "project_locations",
            ColumnDef::new("stages", ColumnType::Text)?,
        )?],
    })
}

fn location_details() -> Result<SchemaPatch, CoreError> {
    let table = "locations";
    Ok(SchemaPatch {
        name: LOCATION_DETAILS,
        description: "Coordinates, contact and photo list for scouted locations",
        steps: vec![
            add_column(table, ColumnDef::new("latitude", ColumnType::Real)?)?,
            add_column(table, ColumnDef::new("longitude", ColumnType::Real)?)?,
            add_column(table, ColumnDef::new("contact_name", ColumnType::Text)?)?,
            add_column(table, ColumnDef::new("contact_phone", ColumnType::Text)?)?,
            add_column(table, ColumnDef::new("photos", ColumnType::Text)?)?,
        ],
    })
}

fn user_type() -> Result<SchemaPatch, CoreError> {
    Ok(SchemaPatch {
        name: USER_TYPE,
        description: "Account classification (crew, producer, admin)",
        steps: vec![add_column(
            "users",
            ColumnDef::new("user_type", ColumnType::Text)?
                .default(DefaultValue::Text("crew".into())),
        )?],
    })
}

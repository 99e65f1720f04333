//! Program creation and listing.

use chrono::Utc;

use crate::error::TrackerResult;
use crate::models::program::{NewProgram, Program};
use crate::store::{Database, Filter};

pub async fn list_programs(db: &Database, status: Option<&str>) -> TrackerResult<Vec<Program>> {
    db.programs.list(&Filter::new().eq_opt("status", status)).await
}

pub async fn create_program(
    db: &Database,
    request: NewProgram,
    owner_id: &str,
) -> TrackerResult<Program> {
    let program = db
        .programs
        .insert(Program::new(request, owner_id, Utc::now()))
        .await?;
    tracing::info!(program_id = %program.id, code = %program.code, "Program created");
    Ok(program)
}

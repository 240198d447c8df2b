use clap::Args;
use serde::Serialize;

use repoint::project::Project;
use repoint::script::collect_scripts;
use repoint::session::{ScriptRecord, Session};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct CheckArgs {
    /// Project root (default: current directory)
    #[arg(long)]
    project_root: Option<String>,

    /// Asset directory relative to the project root (overrides repoint.json)
    #[arg(long)]
    assets_root: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum CheckOutput {
    #[serde(rename = "check")]
    Check {
        project_root: String,
        missing: Vec<ScriptRecord>,
        clean: bool,
    },
}

/// Read-only variant of scan: reports deleted scripts without touching the
/// session file. Exits 1 when anything is missing, for use in hooks and CI.
pub fn run(args: CheckArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CheckOutput> {
    let root = args.project_root.as_deref().unwrap_or(".");
    let project = Project::open(root, args.assets_root.as_deref())?;
    let session = Session::load_or_default(&project.root)?;

    let (scripts, _) = collect_scripts(&project);
    let missing = session.check(&scripts);

    let exit_code = if missing.is_empty() { 0 } else { 1 };

    Ok((
        CheckOutput::Check {
            project_root: project.root.display().to_string(),
            clean: missing.is_empty(),
            missing,
        },
        exit_code,
    ))
}

use clap::Args;
use serde::Serialize;

use repoint::project::Project;
use repoint::script::collect_scripts;
use repoint::session::{ScriptRecord, Session};
use repoint::resolve::resolve_script;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct DismissArgs {
    /// Missing script to dismiss: GUID, asset path, or type name
    script: String,

    /// Project root (default: current directory)
    #[arg(long)]
    project_root: Option<String>,

    /// Asset directory relative to the project root (overrides repoint.json)
    #[arg(long)]
    assets_root: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum DismissOutput {
    #[serde(rename = "dismiss")]
    Dismiss {
        dismissed: ScriptRecord,
        missing: usize,
        ignored: usize,
    },
}

pub fn run(args: DismissArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DismissOutput> {
    let root = args.project_root.as_deref().unwrap_or(".");
    let project = Project::open(root, args.assets_root.as_deref())?;
    let mut session = Session::load_or_default(&project.root)?;

    // Refresh the classification first so the missing list reflects the
    // project as it is now, not as of the last scan.
    let (scripts, _) = collect_scripts(&project);
    session.update(&scripts);

    let guid = resolve_script(&args.script, &session.data.missing)?;
    let dismissed = session.dismiss(guid)?;
    session.save()?;

    repoint::log_status!("dismiss", "Dismissed {}", dismissed.path);

    Ok((
        DismissOutput::Dismiss {
            dismissed,
            missing: session.data.missing.len(),
            ignored: session.data.ignored.len(),
        },
        0,
    ))
}

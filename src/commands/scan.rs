use clap::Args;
use serde::Serialize;

use repoint::project::Project;
use repoint::script::{collect_scripts, ScanDiagnostics};
use repoint::session::{ScriptRecord, Session};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct ScanArgs {
    /// Project root (default: current directory)
    #[arg(long)]
    project_root: Option<String>,

    /// Asset directory relative to the project root (overrides repoint.json)
    #[arg(long)]
    assets_root: Option<String>,

    /// Re-surface previously dismissed missing scripts
    #[arg(long)]
    show_older: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ScanOutput {
    #[serde(rename = "scan")]
    Scan {
        project_root: String,
        added: Vec<ScriptRecord>,
        deleted: Vec<ScriptRecord>,
        missing: Vec<ScriptRecord>,
        known: usize,
        ignored: usize,
        restored: usize,
        diagnostics: ScanDiagnostics,
    },
}

pub fn run(args: ScanArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ScanOutput> {
    let root = args.project_root.as_deref().unwrap_or(".");
    let project = Project::open(root, args.assets_root.as_deref())?;
    let mut session = Session::load_or_default(&project.root)?;

    let restored = if args.show_older {
        session.show_older()
    } else {
        0
    };

    repoint::log_status!("scan", "Scanning {}", project.root.display());
    let (scripts, diagnostics) = collect_scripts(&project);
    let diff = session.update(&scripts);
    session.save()?;

    repoint::log_status!(
        "scan",
        "{} known, {} missing ({} new this scan)",
        diff.known,
        diff.missing,
        diff.deleted.len()
    );

    Ok((
        ScanOutput::Scan {
            project_root: project.root.display().to_string(),
            added: diff.added,
            deleted: diff.deleted,
            missing: session.data.missing.clone(),
            known: diff.known,
            ignored: diff.ignored,
            restored,
            diagnostics,
        },
        0,
    ))
}

use std::io::Read;
use std::path::Path;

pub type CmdResult<T> = repoint::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

// ============================================================================
// JSON Input Parsing (CLI layer)
// ============================================================================

/// Read JSON spec from string, file (@path), or stdin (-).
pub(crate) fn read_json_spec_to_string(spec: &str) -> repoint::Result<String> {
    use std::io::IsTerminal;

    if spec.trim() == "-" {
        let mut buf = String::new();
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(repoint::Error::validation_invalid_argument(
                "json",
                "Cannot read JSON from stdin when stdin is a TTY",
                None,
                None,
            ));
        }
        stdin.read_to_string(&mut buf).map_err(|e| {
            repoint::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
        })?;
        return Ok(buf);
    }

    if let Some(path) = spec.strip_prefix('@') {
        if path.trim().is_empty() {
            return Err(repoint::Error::validation_invalid_argument(
                "json",
                "Invalid JSON spec '@' (missing file path)",
                None,
                None,
            ));
        }
        return std::fs::read_to_string(Path::new(path)).map_err(|e| {
            repoint::Error::internal_io(e.to_string(), Some(format!("read {}", path)))
        });
    }

    Ok(spec.to_string())
}

pub mod check;
pub mod dismiss;
pub mod rewrite;
pub mod scan;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (repoint::Result<serde_json::Value>, i32) {
    crate::tty::status("repoint is working...");

    match command {
        crate::Commands::Scan(args) => dispatch!(args, global, scan),
        crate::Commands::Check(args) => dispatch!(args, global, check),
        crate::Commands::Dismiss(args) => dispatch!(args, global, dismiss),
        crate::Commands::Rewrite(args) => dispatch!(args, global, rewrite),
    }
}

use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{check, dismiss, rewrite, scan};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "repoint")]
#[command(version = VERSION)]
#[command(about = "Repoint Unity script references after scripts are deleted or replaced")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project and update the tracked script index
    Scan(scan::ScanArgs),
    /// Report deleted scripts without updating the index
    Check(check::CheckArgs),
    /// Dismiss a missing script from future reports
    Dismiss(dismiss::DismissArgs),
    /// Rewrite serialized script references per a replacement map
    Rewrite(rewrite::RewriteArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    output::print_json_result(json_result).ok();

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

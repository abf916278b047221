use std::{env, env::VarError};

/// The server has no real CLI. Any argument prints the help text and the current configuration instead.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "LPS_HOST",
        "LPS_PORT",
        "LPS_DATABASE_URL",
        "LPS_RUN_MIGRATIONS",
        "LPS_ACCRUAL_SYSTEM_ADDRESS",
        "LPS_ACCRUAL_WORKERS",
        "LPS_SCAN_INTERVAL_SECS",
        "LPS_SCAN_BATCH_SIZE",
        "LPS_JOB_QUEUE_SIZE",
        "LPS_DEFAULT_RETRY_AFTER_SECS",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

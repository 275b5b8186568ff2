//! Integration tests for CLI argument handling

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tweetpool"))
        .args(args)
        .output()
        .expect("Failed to execute tweetpool")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tweetpool"), "Help should mention tweetpool");
    assert!(stdout.contains("sessions"), "Help should mention --sessions");
    assert!(stdout.contains("purge-cache"), "Help should list subcommands");
}

#[test]
fn test_invalid_tweet_id_prints_error_and_exits() {
    let output = run_cli(&["tweet", "not-a-number"]);
    assert!(!output.status.success(), "Expected invalid id to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid id") || stderr.contains("invalid"),
        "Should print error message about invalid id: {}",
        stderr
    );
}

#[test]
fn test_missing_session_file_fails() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let missing = dir.path().join("missing.jsonl");
    let output = run_cli(&["sessions", "--sessions", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.jsonl"), "stderr: {}", stderr);
}

#[test]
fn test_sessions_lists_pool_as_json() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("sessions.jsonl");
    std::fs::write(
        &path,
        "{\"oauth_token\": \"111-aaa\"}\nnot json\n{\"oauth_token\": \"x\", \"username\": \"bot\"}\n",
    )
    .unwrap();

    let output = run_cli(&["sessions", "--sessions", path.to_str().unwrap()]);
    assert!(output.status.success());

    let statuses: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let statuses = statuses.as_array().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0]["account_id"], "111");
    assert_eq!(statuses[0]["health"]["state"], "healthy");
    assert_eq!(statuses[1]["account_id"], "bot");
}

#[test]
fn test_purge_cache_on_empty_dir() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let output = run_cli(&["purge-cache", "--cache-dir", dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["purged"], 0);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use tweetpool::cli::{parse_handle_arg, Cli, Command, Query};

    #[test]
    fn test_cli_search_with_cursor() {
        let cli = Cli::parse_from(["tweetpool", "search", "rust lang", "--cursor", "abc"]);
        assert_eq!(
            cli.command,
            Command::Query(Query::Search {
                query: "rust lang".to_string(),
                cursor: Some("abc".to_string()),
            })
        );
    }

    #[test]
    fn test_cli_profile_strips_at_sign() {
        let cli = Cli::parse_from(["tweetpool", "profile", "@jack"]);
        assert_eq!(
            cli.command,
            Command::Query(Query::Profile {
                handle: "jack".to_string(),
                cursor: None,
            })
        );
    }

    #[test]
    fn test_parse_handle_arg_rejects_url() {
        assert!(parse_handle_arg("https://x.com/jack").is_err());
    }
}

//! CLI test runner with fluent assertions.
//!
//! Provides infrastructure for executing the `koboswitch` binary and verifying
//! output, exit codes and JSON responses in robot mode.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Configuration for CLI test runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Environment variables to set for the command.
    pub env_vars: HashMap<String, String>,
    /// Standard input to provide to the command; empty input otherwise.
    pub stdin: Option<String>,
}

/// Main test runner for the `koboswitch` CLI binary.
///
/// # Example
///
/// ```ignore
/// let cli = CliRunner::new().with_stdin("y\n");
/// cli.run(&["truncate", mount])
///    .assert_success()
///    .assert_stdout_contains("Deleted 1 row(s)");
/// ```
pub struct CliRunner {
    binary_path: PathBuf,
    config: CliConfig,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Create a new CLI runner pointing to the compiled `koboswitch` binary.
    #[must_use]
    pub fn new() -> Self {
        let binary = env!("CARGO_BIN_EXE_koboswitch");
        Self {
            binary_path: PathBuf::from(binary),
            config: CliConfig::default(),
        }
        .with_env("RUST_LOG", "off")
        .with_env("NO_COLOR", "1")
        .with_env("XDG_CONFIG_HOME", "/nonexistent/koboswitch-tests")
    }

    /// Add an environment variable for command execution.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.config
            .env_vars
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Set standard input for the command, i.e. the operator's answers.
    #[must_use]
    pub fn with_stdin(mut self, stdin: &str) -> Self {
        self.config.stdin = Some(stdin.to_string());
        self
    }

    /// Execute the command with the given arguments.
    ///
    /// # Panics
    ///
    /// Panics if the command fails to execute.
    #[must_use]
    pub fn run(&self, args: &[&str]) -> CliResult {
        let start = Instant::now();

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &self.config.env_vars {
            cmd.env(key, value);
        }
        // Keep the caller's own settings out of the tests.
        for key in ["KOBOSWITCH_CONFIG", "KOBOSWITCH_FORMAT"] {
            if !self.config.env_vars.contains_key(key) {
                cmd.env_remove(key);
            }
        }

        let mut child = cmd.spawn().expect("Failed to execute command");
        {
            let mut stdin = child.stdin.take().expect("stdin is piped");
            if let Some(ref input) = self.config.stdin {
                // The process may exit before reading everything.
                let _ = stdin.write_all(input.as_bytes());
            }
        }
        let output = child.wait_with_output().expect("Failed to wait for command");
        let duration = start.elapsed();

        CliResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration,
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Execute with `--robot` flag for JSON output.
    #[must_use]
    pub fn run_robot(&self, args: &[&str]) -> CliResult {
        let mut full_args = vec!["--robot"];
        full_args.extend(args);
        self.run(&full_args)
    }
}

/// Captured output from CLI execution with fluent assertions.
#[derive(Debug, Clone)]
pub struct CliResult {
    /// Standard output captured from the command.
    pub stdout: String,
    /// Standard error captured from the command.
    pub stderr: String,
    /// Exit code from the command.
    pub exit_code: i32,
    /// Time taken to execute the command.
    pub duration: Duration,
    /// Arguments passed to the command.
    pub args: Vec<String>,
}

impl CliResult {
    /// Check if the command succeeded (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    // === Fluent Assertions (all return &Self for chaining) ===

    /// Assert the command succeeded.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "Command {:?} failed with exit code {}:\n{}",
            self.args,
            self.exit_code,
            self.stderr
        );
        self
    }

    /// Assert a specific exit code.
    pub fn assert_exit_code(&self, expected: i32) -> &Self {
        assert_eq!(
            self.exit_code, expected,
            "Expected exit code {expected}, got {} for {:?}\nstderr:\n{}",
            self.exit_code, self.args, self.stderr
        );
        self
    }

    // === Stdout Assertions ===

    /// Assert stdout contains the given text.
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain \"{text}\"\nActual stdout:\n{}",
            self.stdout
        );
        self
    }

    /// Assert stdout is empty.
    pub fn assert_stdout_is_empty(&self) -> &Self {
        assert!(
            self.stdout.trim().is_empty(),
            "stdout is not empty:\n{}",
            self.stdout
        );
        self
    }

    // === Stderr Assertions ===

    /// Assert stderr contains the given text.
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain \"{text}\"\nActual stderr:\n{}",
            self.stderr
        );
        self
    }

    // === JSON Assertions ===

    /// Parse stdout as JSON.
    ///
    /// # Panics
    ///
    /// Panics if stdout is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|_| panic!("Failed to parse JSON from stdout:\n{}", self.stdout))
    }

    /// Parse the robot-mode error object from stderr.
    ///
    /// Prompts are also written to stderr, so the JSON object is taken from
    /// the first line that opens one.
    ///
    /// # Panics
    ///
    /// Panics if no JSON object is found.
    #[must_use]
    pub fn stderr_json(&self) -> Value {
        let start = self
            .stderr
            .lines()
            .scan(0, |offset, line| {
                let at = *offset;
                *offset += line.len() + 1;
                Some((at, line))
            })
            .find(|(_, line)| line.starts_with('{'))
            .map(|(at, _)| at)
            .unwrap_or_else(|| panic!("No JSON object in stderr:\n{}", self.stderr));
        serde_json::from_str(&self.stderr[start..])
            .unwrap_or_else(|_| panic!("Failed to parse JSON from stderr:\n{}", self.stderr))
    }

    /// Assert a JSON field matches an expected value using JSON pointer syntax.
    pub fn assert_json_field(&self, json_pointer: &str, expected: &Value) -> &Self {
        let json = self.json();
        let actual = json.pointer(json_pointer).unwrap_or_else(|| {
            panic!(
                "JSON path {json_pointer} not found in:\n{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            )
        });
        assert_eq!(actual, expected, "JSON field {json_pointer} mismatch");
        self
    }

    /// Assert a JSON field exists at the given pointer path.
    pub fn assert_json_field_exists(&self, json_pointer: &str) -> &Self {
        let json = self.json();
        assert!(
            json.pointer(json_pointer).is_some(),
            "JSON path {json_pointer} not found"
        );
        self
    }

    /// Assert a JSON array has the expected length.
    pub fn assert_json_array_len(&self, json_pointer: &str, expected_len: usize) -> &Self {
        let json = self.json();
        let arr = json
            .pointer(json_pointer)
            .and_then(Value::as_array)
            .unwrap_or_else(|| panic!("JSON path {json_pointer} is not an array"));
        assert_eq!(arr.len(), expected_len, "JSON array {json_pointer} length mismatch");
        self
    }
}

//! Scripted runtime used by unit tests.

use super::client::{CommandOutput, RuntimeClient};
use async_trait::async_trait;
use std::io;
use std::sync::Mutex;

#[derive(Clone)]
enum Reply {
    Output { exit_code: i32, stdout: String },
    SpawnError(io::ErrorKind),
    Hang,
}

struct Rule {
    prefix: String,
    once: bool,
    reply: Reply,
}

/// Records every argv and answers according to prefix rules.
///
/// Rules match against the space-joined arguments (program excluded). Unmatched
/// calls succeed with empty output.
pub(crate) struct RecordingRuntime {
    calls: Mutex<Vec<Vec<String>>>,
    rules: Mutex<Vec<Rule>>,
}

impl RecordingRuntime {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rules: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, prefix: &str, once: bool, reply: Reply) {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.to_string(),
            once,
            reply,
        });
    }

    pub(crate) fn respond(self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
        self.push(
            prefix,
            false,
            Reply::Output {
                exit_code,
                stdout: stdout.to_string(),
            },
        );
        self
    }

    pub(crate) fn respond_once(self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
        self.push(
            prefix,
            true,
            Reply::Output {
                exit_code,
                stdout: stdout.to_string(),
            },
        );
        self
    }

    pub(crate) fn fail_spawn(self, prefix: &str, kind: io::ErrorKind) -> Self {
        self.push(prefix, false, Reply::SpawnError(kind));
        self
    }

    /// Matching calls never complete
    pub(crate) fn hang(self, prefix: &str) -> Self {
        self.push(prefix, false, Reply::Hang);
        self
    }

    /// Recorded invocations as `docker <args...>` strings
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|argv| argv.join(" "))
            .collect()
    }

    /// Recorded argv of every detached `run` invocation, `docker run` stripped
    pub(crate) fn run_invocations(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|argv| argv.len() > 2 && argv[1] == "run" && argv[2] == "-d")
            .map(|argv| argv[2..].to_vec())
            .collect()
    }
}

#[async_trait]
impl RuntimeClient for RecordingRuntime {
    fn program(&self) -> &str {
        "docker"
    }

    async fn execute(&self, args: Vec<String>) -> io::Result<CommandOutput> {
        let mut argv = vec!["docker".to_string()];
        argv.extend(args);
        self.calls.lock().unwrap().push(argv.clone());

        let joined = argv[1..].join(" ");
        let reply = {
            let mut rules = self.rules.lock().unwrap();
            let position = rules.iter().position(|rule| joined.starts_with(&rule.prefix));
            match position {
                Some(index) if rules[index].once => Some(rules.remove(index).reply),
                Some(index) => Some(rules[index].reply.clone()),
                None => None,
            }
        };

        let (exit_code, stdout) = match reply {
            Some(Reply::Output { exit_code, stdout }) => (exit_code, stdout),
            Some(Reply::SpawnError(kind)) => {
                return Err(io::Error::new(kind, format!("cannot spawn for {}", joined)));
            }
            Some(Reply::Hang) => std::future::pending().await,
            None => (0, String::new()),
        };

        Ok(CommandOutput {
            command: argv,
            stdout,
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "error response from daemon".to_string()
            },
            exit_code,
        })
    }
}

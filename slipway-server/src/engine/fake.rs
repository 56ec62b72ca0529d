//! Scripted engine for lifecycle tests
//!
//! Records every invocation argv in order and answers from a small script:
//! outputs are keyed by subcommand (`build`, `container ls`, `container
//! stop`, …), anything unscripted succeeds silently, and spawned runs exit
//! with a configurable code after a configurable number of polls.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ContainerEngine, EngineOutput, EngineProcess};

pub struct FakeEngine {
    invocations: Mutex<Vec<Vec<String>>>,
    responses: Mutex<HashMap<String, EngineOutput>>,
    run_script: Mutex<RunScript>,
}

#[derive(Clone, Copy)]
struct RunScript {
    exit_code: i32,
    polls_before_exit: usize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            run_script: Mutex::new(RunScript {
                exit_code: 0,
                polls_before_exit: 0,
            }),
        }
    }

    /// Scripts the output answered for a subcommand key.
    pub fn respond(&self, key: &str, output: EngineOutput) {
        self.responses.lock().unwrap().insert(key.to_string(), output);
    }

    /// Scripts a failing subcommand with captured stderr.
    pub fn fail(&self, key: &str, code: i32, stderr: &str) {
        self.respond(
            key,
            EngineOutput {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Scripts the container ids reported by `container ls -aq`.
    pub fn containers(&self, ids: &[&str]) {
        self.respond(
            "container ls",
            EngineOutput {
                code: 0,
                stdout: ids.join("\n"),
                stderr: String::new(),
            },
        );
    }

    /// Scripts the exit of spawned `run` processes: `polls_before_exit`
    /// status polls answer "still running" before the code is reported.
    pub fn script_run(&self, exit_code: i32, polls_before_exit: usize) {
        *self.run_script.lock().unwrap() = RunScript {
            exit_code,
            polls_before_exit,
        };
    }

    /// Every argv handed to `invoke` or `spawn`, in call order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }

    fn key_for(args: &[String]) -> String {
        match args.first().map(String::as_str) {
            Some("container") => args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
            Some(first) => first.to_string(),
            None => String::new(),
        }
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    fn program(&self) -> &str {
        "docker"
    }

    async fn invoke(&self, args: Vec<String>) -> Result<EngineOutput> {
        let key = Self::key_for(&args);
        self.invocations.lock().unwrap().push(args);

        let scripted = self.responses.lock().unwrap().get(&key).cloned();
        Ok(scripted.unwrap_or(EngineOutput {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }))
    }

    async fn spawn(&self, args: Vec<String>) -> Result<Box<dyn EngineProcess>> {
        self.invocations.lock().unwrap().push(args);

        let script = *self.run_script.lock().unwrap();
        Ok(Box::new(FakeProcess {
            exit_code: script.exit_code,
            polls_remaining: script.polls_before_exit,
        }))
    }
}

struct FakeProcess {
    exit_code: i32,
    polls_remaining: usize,
}

impl EngineProcess for FakeProcess {
    fn try_wait(&mut self) -> Result<Option<i32>> {
        if self.polls_remaining == 0 {
            Ok(Some(self.exit_code))
        } else {
            self.polls_remaining -= 1;
            Ok(None)
        }
    }
}

// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted RemoteRunner fake that records every command.

use async_trait::async_trait;
use slipway::ssh::{CommandOutput, RemoteRunner, Result};
use std::sync::Mutex;

/// One recorded remote invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    /// Stdin payload, for `run_with_input` calls.
    pub input: Option<Vec<u8>>,
}

type Handler = Box<dyn Fn(&str) -> Result<CommandOutput> + Send + Sync>;

/// A fake deployment target: answers each command via the handler closure
/// and records everything it was asked to run, in order.
pub struct ScriptedRunner {
    calls: Mutex<Vec<Call>>,
    handler: Handler,
}

#[allow(dead_code)]
impl ScriptedRunner {
    pub fn new(handler: impl Fn(&str) -> Result<CommandOutput> + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// A host where every command succeeds with empty output.
    pub fn all_ok() -> Self {
        Self::new(|_| Ok(ok_output("")))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    /// Index of the first recorded command containing `needle`.
    pub fn position_of(&self, needle: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.contains(needle))
    }

    pub fn count_of(&self, needle: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(needle)).count()
    }
}

#[async_trait]
impl RemoteRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(Call {
            command: command.to_string(),
            input: None,
        });
        (self.handler)(command)
    }

    async fn run_with_input(&self, command: &str, input: &[u8]) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(Call {
            command: command.to_string(),
            input: Some(input.to_vec()),
        });
        (self.handler)(command)
    }
}

#[allow(dead_code)]
pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

#[allow(dead_code)]
pub fn failed_output(exit_code: u32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

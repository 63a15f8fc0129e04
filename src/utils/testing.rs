//! Test doubles for the process and progress seams.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::utils::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::utils::progress::{ProgressEvent, ProgressSink};

/// Replays canned outputs in order and records every spec it was asked to run.
///
/// Each canned output may carry chunks that are fed to the output callback
/// before the call returns. Once the script runs out, every call succeeds
/// with empty output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    script: Mutex<VecDeque<(Vec<Vec<u8>>, CommandOutput)>>,
    calls: Mutex<Vec<CommandSpec>>,
    stdin_contents: Mutex<Vec<Vec<u8>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: CommandOutput) -> &Self {
        self.push_streaming(Vec::new(), output)
    }

    pub fn push_streaming(&self, chunks: Vec<Vec<u8>>, output: CommandOutput) -> &Self {
        self.script.lock().unwrap().push_back((chunks, output));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    /// Contents of every readable stdin file handed to a command, read at call time.
    pub fn stdin_contents(&self) -> Vec<Vec<u8>> {
        self.stdin_contents.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        on_output: &mut dyn FnMut(&[u8]),
    ) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        if let Some(Ok(contents)) = spec.stdin.as_ref().map(std::fs::read) {
            self.stdin_contents.lock().unwrap().push(contents);
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some((chunks, output)) => {
                for chunk in &chunks {
                    on_output(chunk);
                }
                Ok(output)
            }
            None => Ok(ok_output("")),
        }
    }
}

pub fn ok_output(stdout: impl AsRef<[u8]>) -> CommandOutput {
    CommandOutput {
        status_code: Some(0),
        stdout: stdout.as_ref().to_vec(),
        stderr: Vec::new(),
    }
}

pub fn failed_output(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        status_code: Some(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &ProgressEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

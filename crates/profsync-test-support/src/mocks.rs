//! Scripted stand-ins for process and access collaborators.

use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use profsync_exec::{
    AuthTrigger, ExecError, ExecResult, Invocation, LineSink, ProcessLauncher, ReachabilityProbe,
};

#[derive(Debug, Clone, Copy)]
enum Script {
    Exit(i32),
    LaunchFault,
    Panic,
}

/// Launcher that never starts a process: exits are scripted by matching a
/// substring of the rendered command line.
#[derive(Debug)]
pub struct ScriptedLauncher {
    rules: Vec<(String, Script)>,
    default_exit: i32,
    output: Vec<String>,
    delay: Duration,
    invocations: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for ScriptedLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLauncher {
    /// Launcher answering every invocation with exit code `0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_exit: 0,
            output: Vec::new(),
            delay: Duration::ZERO,
            invocations: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Exit with `code` when the command line contains `pattern`.
    #[must_use]
    pub fn exit_when(mut self, pattern: impl Into<String>, code: i32) -> Self {
        self.rules.push((pattern.into(), Script::Exit(code)));
        self
    }

    /// Fail to launch when the command line contains `pattern`.
    #[must_use]
    pub fn fault_when(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Script::LaunchFault));
        self
    }

    /// Panic inside the launch when the command line contains `pattern`.
    #[must_use]
    pub fn panic_when(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Script::Panic));
        self
    }

    /// Exit code for invocations matching no rule.
    #[must_use]
    pub const fn with_default_exit(mut self, code: i32) -> Self {
        self.default_exit = code;
        self
    }

    /// Lines streamed to the sink by every invocation.
    #[must_use]
    pub fn with_output<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Time each invocation stays "running".
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Rendered command lines, in launch order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of launches attempted.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.invocations().len()
    }

    /// Highest number of launches observed running at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn script_for(&self, command: &str) -> Script {
        self.rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map_or(Script::Exit(self.default_exit), |(_, script)| *script)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(&self, invocation: &Invocation, sink: &mut dyn LineSink) -> ExecResult<i32> {
        let command = invocation.to_string();
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(command.clone());
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.script_for(&command) {
            Script::Exit(code) => {
                for line in &self.output {
                    sink.line(line.clone());
                }
                Ok(code)
            }
            Script::LaunchFault => Err(ExecError::Launch {
                program: invocation.program().to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
            Script::Panic => panic!("scripted panic for {command}"),
        }
    }
}

/// Probe that turns reachable after a fixed number of checks.
#[derive(Debug)]
pub struct SequenceProbe {
    reachable_after: usize,
    calls: AtomicUsize,
}

impl SequenceProbe {
    /// Reachable on the first check.
    #[must_use]
    pub const fn reachable() -> Self {
        Self::after(1)
    }

    /// Never reachable.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self::after(usize::MAX)
    }

    /// Reachable from the `checks`-th check onward.
    #[must_use]
    pub const fn after(checks: usize) -> Self {
        Self {
            reachable_after: checks,
            calls: AtomicUsize::new(0),
        }
    }

    /// Checks performed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for SequenceProbe {
    async fn is_reachable(&self, _path: &Path) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1) >= self.reachable_after
    }
}

/// Authentication trigger recording its calls.
#[derive(Debug)]
pub struct RecordingTrigger {
    launches: bool,
    calls: AtomicUsize,
}

impl RecordingTrigger {
    /// Trigger whose launch succeeds.
    #[must_use]
    pub const fn launching() -> Self {
        Self {
            launches: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Trigger whose launch fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            launches: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Times the trigger ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthTrigger for RecordingTrigger {
    async fn trigger(&self, _root: &Path) -> ExecResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.launches {
            Ok(())
        } else {
            Err(ExecError::Launch {
                program: "explorer".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        }
    }
}

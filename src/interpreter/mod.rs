//! Command Interpreter
//!
//! Drives a [`Queue`] from a line-oriented command script and checks every
//! result against a shadow model of the expected contents. Storage comes from
//! a [`FaultInjector`] so scripts can exercise the allocation failure paths
//! and confirm that destroying a queue returns every block.
//!
//! ```
//! use std::sync::Arc;
//! use textq::interpreter::{Interpreter, Options};
//! use textq::queue::FaultInjector;
//!
//! let script = "new\nit banana\nit apple\nsort\nrh apple\nfree\n";
//! let mut interpreter = Interpreter::new(
//!     Options::default(),
//!     Arc::new(FaultInjector::tracking_only()),
//!     Vec::new(),
//! );
//! let summary = interpreter.run(script.as_bytes()).unwrap();
//!
//! assert_eq!(summary.errors, 0);
//! assert_eq!(summary.leaked_blocks, 0);
//! ```

pub mod command;

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::cli::memory_parser::format_memory_size;
use crate::queue::handle;
use crate::queue::{Allocator, FaultInjector, Queue, QueueError};

pub use command::{Command, CommandError, COMMAND_HELP};

/// Longest queue listing printed in full by `show`
const SHOW_LIMIT: usize = 30;

/// Share of a bounded memory budget above which a warning is printed
const MEMORY_PRESSURE_PERCENT: f64 = 75.0;

/// Tunable interpreter settings, also adjustable from scripts via `option`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Allocation failures tolerated before each further one counts as an error
    pub fail_limit: usize,
    /// Capacity of the buffer removed values are copied into
    pub buffer_length: usize,
    /// Echo each command as `cmd> line`
    pub echo: bool,
    /// Errors after which execution stops
    pub error_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fail_limit: 30,
            buffer_length: 1024,
            echo: false,
            error_limit: 5,
        }
    }
}

/// Outcome of an interpreter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub commands: usize,
    pub errors: usize,
    pub allocation_failures: usize,
    pub leaked_blocks: usize,
}

impl Summary {
    /// True when the run reported no errors
    pub fn succeeded(&self) -> bool {
        self.errors == 0
    }
}

/// Script interpreter writing its report to `W`
pub struct Interpreter<W: Write> {
    options: Options,
    allocator: Arc<FaultInjector>,
    queue: Option<Queue>,
    model: VecDeque<String>,
    output: W,
    summary: Summary,
}

impl<W: Write> Interpreter<W> {
    pub fn new(options: Options, allocator: Arc<FaultInjector>, output: W) -> Self {
        Self {
            options,
            allocator,
            queue: None,
            model: VecDeque::new(),
            output,
            summary: Summary::default(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Consume the interpreter, returning the report sink
    pub fn into_output(self) -> W {
        self.output
    }

    /// Execute every line of `input`, then destroy the queue and check for leaks
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<Summary> {
        for line in input.lines() {
            let line = line.context("Failed to read command input")?;
            if !self.execute_line(&line)? {
                break;
            }
        }

        self.finish()?;
        info!(
            "Interpreter finished: {} commands, {} errors, {} allocation failures",
            self.summary.commands, self.summary.errors, self.summary.allocation_failures
        );
        Ok(self.summary)
    }

    /// Execute a single script line; `false` means execution should stop
    pub fn execute_line(&mut self, line: &str) -> Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(true);
        }
        if self.options.echo {
            writeln!(self.output, "cmd> {}", trimmed)?;
        }

        let command = match Command::parse(trimmed) {
            Ok(None) => return Ok(true),
            Ok(Some(command)) => command,
            Err(e) => {
                self.summary.commands += 1;
                self.report_error(e)?;
                return self.within_error_limit();
            }
        };

        self.summary.commands += 1;
        debug!("Executing {:?}", command);
        let mutating = command.is_mutating();

        match command {
            Command::New => self.new_queue()?,
            Command::Free => self.free_queue()?,
            Command::InsertHead { text, count } => self.insert(&text, count, End::Head)?,
            Command::InsertTail { text, count } => self.insert(&text, count, End::Tail)?,
            Command::RemoveHead { expected } => self.remove_head(expected.as_deref())?,
            Command::RemoveHeadQuiet => self.remove_head_quiet()?,
            Command::Size { count } => self.size(count)?,
            Command::Reverse => self.reorder("reverse")?,
            Command::Sort => self.reorder("sort")?,
            Command::Show => self.show()?,
            Command::Option { setting: None } => self.list_options()?,
            Command::Option { setting: Some((name, value)) } => self.set_option(&name, &value)?,
            Command::Help => self.help()?,
            Command::Quit => return Ok(false),
        }

        if mutating {
            self.check_queue()?;
            self.show()?;
        }

        self.within_error_limit()
    }

    /// Destroy any remaining queue and verify nothing is left allocated
    fn finish(&mut self) -> Result<()> {
        if self.queue.is_some() {
            self.free_queue()?;
        }
        Ok(())
    }

    fn new_queue(&mut self) -> Result<()> {
        handle::destroy(self.queue.take());
        self.model.clear();

        let allocator: Arc<dyn Allocator> = self.allocator.clone();
        match handle::create(allocator) {
            Ok(queue) => self.queue = Some(queue),
            Err(e) => self.queue_failure(e)?,
        }
        Ok(())
    }

    fn free_queue(&mut self) -> Result<()> {
        handle::destroy(self.queue.take());
        self.model.clear();
        writeln!(self.output, "q = NULL")?;

        let tracker = self.allocator.tracker();
        let blocks = tracker.allocated_blocks();
        self.summary.leaked_blocks = blocks;
        if blocks > 0 {
            let mut held = format_memory_size(tracker.allocated_bytes());
            if tracker.is_bounded() {
                held = format!("{}, {:.1}% of budget", held, tracker.usage_percent());
            }
            self.report_error(format!(
                "Freed queue, but {} blocks ({}) are still allocated",
                blocks, held
            ))?;
        }
        Ok(())
    }

    fn insert(&mut self, text: &str, count: usize, end: End) -> Result<()> {
        for _ in 0..count {
            let outcome = match end {
                End::Head => handle::insert_head(self.queue.as_mut(), text),
                End::Tail => handle::insert_tail(self.queue.as_mut(), text),
            };

            match outcome {
                Ok(()) => match end {
                    End::Head => self.model.push_front(text.to_string()),
                    End::Tail => self.model.push_back(text.to_string()),
                },
                Err(QueueError::InvalidHandle) => {
                    return self.warning(format!("Calling insert {} on null queue", end.name()));
                }
                Err(e) => return self.queue_failure(e),
            }
        }
        Ok(())
    }

    fn remove_head(&mut self, expected: Option<&str>) -> Result<()> {
        let capacity = self.options.buffer_length;
        let mut buffer = vec![0x55u8; capacity];

        match handle::remove_head(self.queue.as_mut(), Some(buffer.as_mut_slice())) {
            Err(e) => self.removal_failure(e),
            Ok(()) => {
                let removed = handle::buffer_text(&buffer).into_owned();
                let Some(front) = self.model.pop_front() else {
                    return self.report_error(format!(
                        "Removed '{}' from a queue that should have been empty",
                        removed
                    ));
                };

                if buffer != truncated_copy(&front, capacity) {
                    self.report_error(format!(
                        "Removed value '{}' does not match expected '{}'",
                        removed, front
                    ))?;
                } else if let Some(expected) = expected {
                    if buffer != truncated_copy(expected, capacity) {
                        self.report_error(format!(
                            "Removed value '{}' does not match requested '{}'",
                            removed, expected
                        ))?;
                    }
                }

                writeln!(self.output, "Removed {} from queue", removed)?;
                Ok(())
            }
        }
    }

    fn remove_head_quiet(&mut self) -> Result<()> {
        let outcome = match self.queue.as_mut() {
            Some(queue) => queue.pop_head(),
            None => Err(QueueError::InvalidHandle),
        };

        match outcome {
            Err(e) => self.removal_failure(e),
            Ok(removed) => match self.model.pop_front() {
                Some(front) if front == removed => Ok(()),
                Some(front) => self.report_error(format!(
                    "Removed value '{}' does not match expected '{}'",
                    removed, front
                )),
                None => self.report_error(format!(
                    "Removed '{}' from a queue that should have been empty",
                    removed
                )),
            },
        }
    }

    fn removal_failure(&mut self, error: QueueError) -> Result<()> {
        match error {
            QueueError::InvalidHandle => self.warning("Calling remove head on null queue"),
            QueueError::EmptyQueue => {
                self.warning("Calling remove head on empty queue")?;
                if !self.model.is_empty() {
                    let expected_size = self.model.len();
                    self.report_error(format!(
                        "Queue reported empty, but {} elements were expected",
                        expected_size
                    ))?;
                }
                Ok(())
            }
            other => self.report_error(other),
        }
    }

    fn size(&mut self, count: usize) -> Result<()> {
        if self.queue.is_none() {
            return self.warning("Calling size on null queue");
        }

        let mut computed = handle::size(self.queue.as_ref());
        for _ in 0..count {
            computed = handle::size(self.queue.as_ref());
            if computed != self.model.len() {
                let expected = self.model.len();
                return self.report_error(format!(
                    "Computed queue size as {}, but correct value is {}",
                    computed, expected
                ));
            }
        }

        writeln!(self.output, "Queue size = {}", computed)?;
        Ok(())
    }

    fn reorder(&mut self, operation: &str) -> Result<()> {
        if self.queue.is_none() {
            return self.warning(format!("Calling {} on null queue", operation));
        }

        if operation == "sort" {
            handle::sort(self.queue.as_mut());
            self.model.make_contiguous().sort();
        } else {
            handle::reverse(self.queue.as_mut());
            self.model.make_contiguous().reverse();
        }

        let in_order = self.queue.as_ref().map_or(false, |queue| {
            queue.values().iter().copied().eq(self.model.iter().map(String::as_str))
        });
        if !in_order {
            self.report_error(format!("Queue contents incorrect after {}", operation))?;
        }
        Ok(())
    }

    fn check_queue(&mut self) -> Result<()> {
        let Some(queue) = self.queue.as_ref() else {
            return Ok(());
        };

        let mut problems = Vec::new();
        if let Err(e) = queue.check_invariants() {
            problems.push(e.to_string());
        }
        if queue.size() != self.model.len() {
            problems.push(format!(
                "Queue holds {} elements, but {} were expected",
                queue.size(),
                self.model.len()
            ));
        }

        for problem in problems {
            self.report_error(problem)?;
        }

        let tracker = self.allocator.tracker();
        if tracker.is_bounded() && tracker.exceeds_threshold(MEMORY_PRESSURE_PERCENT) {
            let message = format!(
                "{:.1}% of the {} memory budget in use",
                tracker.usage_percent(),
                format_memory_size(tracker.max_bytes())
            );
            self.warning(message)?;
        }
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let listing = match self.queue.as_ref() {
            None => "q = NULL".to_string(),
            Some(queue) => {
                let values = queue.values();
                let shown: Vec<&str> = values.iter().take(SHOW_LIMIT).copied().collect();
                let mut listing = format!("q = [{}", shown.join(" "));
                if values.len() > SHOW_LIMIT {
                    listing.push_str(" ...");
                }
                listing.push(']');
                listing
            }
        };
        writeln!(self.output, "{}", listing)?;
        Ok(())
    }

    fn option_rows(&self) -> [(&'static str, String, &'static str); 5] {
        [
            ("echo", u8::from(self.options.echo).to_string(), "Echo each command"),
            ("error", self.options.error_limit.to_string(), "Number of errors before stopping"),
            ("fail", self.options.fail_limit.to_string(), "Number of allocation failures tolerated"),
            ("length", self.options.buffer_length.to_string(), "Capacity of the removal buffer"),
            (
                "malloc",
                self.allocator.failure_percent().to_string(),
                "Allocation failure probability (percent)",
            ),
        ]
    }

    fn list_options(&mut self) -> Result<()> {
        writeln!(self.output, "Options:")?;
        for (name, value, description) in self.option_rows() {
            writeln!(self.output, "  {:<8}{:<10}{}", name, value, description)?;
        }
        Ok(())
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let applied = match name {
            "echo" => parse_flag(value).map(|echo| self.options.echo = echo),
            "error" => parse_positive(value).map(|limit| self.options.error_limit = limit),
            "fail" => value.parse::<usize>().ok().map(|limit| self.options.fail_limit = limit),
            "length" => parse_positive(value).map(|length| self.options.buffer_length = length),
            "malloc" => value
                .parse::<u8>()
                .ok()
                .filter(|percent| *percent <= 100)
                .map(|percent| self.allocator.set_failure_percent(percent)),
            _ => return self.report_error(format!("Unknown option '{}'", name)),
        };

        match applied {
            Some(()) => {
                debug!("Option {} set to {}", name, value);
                Ok(())
            }
            None => self.report_error(format!("Invalid value '{}' for option {}", value, name)),
        }
    }

    fn help(&mut self) -> Result<()> {
        writeln!(self.output, "Commands:")?;
        for (usage, description) in COMMAND_HELP {
            writeln!(self.output, "  {:<18}| {}", usage, description)?;
        }
        self.list_options()
    }

    fn queue_failure(&mut self, error: QueueError) -> Result<()> {
        if !error.is_allocation_failure() {
            return self.report_error(error);
        }

        self.summary.allocation_failures += 1;
        debug!(
            "{} (failure {} of {} tolerated)",
            error, self.summary.allocation_failures, self.options.fail_limit
        );
        if self.summary.allocation_failures > self.options.fail_limit {
            self.report_error(format!("Exceeded allocation failure limit: {}", error))
        } else {
            writeln!(self.output, "Allocation failure tolerated: {}", error)?;
            Ok(())
        }
    }

    fn warning(&mut self, message: impl std::fmt::Display) -> Result<()> {
        info!("{}", message);
        writeln!(self.output, "WARNING: {}", message)?;
        Ok(())
    }

    fn report_error(&mut self, message: impl std::fmt::Display) -> Result<()> {
        self.summary.errors += 1;
        warn!("{}", message);
        writeln!(self.output, "ERROR: {}", message)?;
        Ok(())
    }

    fn within_error_limit(&mut self) -> Result<bool> {
        if self.summary.errors >= self.options.error_limit {
            writeln!(self.output, "Error limit exceeded. Stopping command execution")?;
            return Ok(false);
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy)]
enum End {
    Head,
    Tail,
}

impl End {
    fn name(self) -> &'static str {
        match self {
            End::Head => "head",
            End::Tail => "tail",
        }
    }
}

/// The buffer a correct removal of `text` leaves behind
fn truncated_copy(text: &str, capacity: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; capacity];
    let kept = text.len().min(capacity.saturating_sub(1));
    buffer[..kept].copy_from_slice(&text.as_bytes()[..kept]);
    buffer
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(script: &str, options: Options, allocator: FaultInjector) -> (Summary, String) {
        let mut interpreter = Interpreter::new(options, Arc::new(allocator), Vec::new());
        let summary = interpreter.run(script.as_bytes()).unwrap();
        let output = String::from_utf8(interpreter.into_output()).unwrap();
        (summary, output)
    }

    fn run(script: &str) -> (Summary, String) {
        run_with(script, Options::default(), FaultInjector::tracking_only())
    }

    #[test]
    fn test_basic_session() {
        let (summary, output) = run(
            "new\nih dolphin\nih bear\nit gerbil\nreverse\nrh gerbil\nsort\nrh bear\nsize\nquit\n",
        );

        assert_eq!(summary.errors, 0, "{}", output);
        assert_eq!(summary.commands, 10);
        assert_eq!(summary.leaked_blocks, 0);
        assert!(output.contains("q = [bear dolphin gerbil]"));
        assert!(output.contains("q = [gerbil dolphin bear]"));
        assert!(output.contains("Removed gerbil from queue"));
        assert!(output.contains("Queue size = 1"));
        assert!(output.trim_end().ends_with("q = NULL"));
    }

    #[test]
    fn test_repeat_counts() {
        let (summary, output) = run("new\nit x 3\nih y 2\nsize 5\n");

        assert_eq!(summary.errors, 0);
        assert!(output.contains("q = [y y x x x]"));
        assert!(output.contains("Queue size = 5"));
    }

    #[test]
    fn test_remove_mismatch_is_error() {
        let (summary, output) = run("new\nit cat\nrh dog\n");

        assert_eq!(summary.errors, 1);
        assert!(output.contains("does not match requested 'dog'"));
    }

    #[test]
    fn test_null_and_empty_queue_warnings() {
        let (summary, output) = run("ih a\nrh\nsize\nreverse\nsort\nnew\nrh\nrhq\n");

        assert_eq!(summary.errors, 0, "{}", output);
        assert!(output.contains("WARNING: Calling insert head on null queue"));
        assert!(output.contains("WARNING: Calling remove head on null queue"));
        assert!(output.contains("WARNING: Calling sort on null queue"));
        assert!(output.contains("WARNING: Calling remove head on empty queue"));
    }

    #[test]
    fn test_removal_truncates_to_buffer_length() {
        let (summary, output) = run("new\noption length 4\nih abcdef\nrh abcdef\n");

        assert_eq!(summary.errors, 0, "{}", output);
        assert!(output.contains("Removed abc from queue"));
    }

    #[test]
    fn test_allocation_failures_tolerated_then_errors() {
        let options = Options {
            fail_limit: 1,
            ..Options::default()
        };
        let (summary, output) = run_with(
            "new\noption malloc 100\nit a\nit b\noption malloc 0\nit c\nrh c\n",
            options,
            FaultInjector::tracking_only(),
        );

        assert_eq!(summary.allocation_failures, 2);
        assert_eq!(summary.errors, 1, "{}", output);
        assert!(output.contains("Allocation failure tolerated"));
        assert!(output.contains("Exceeded allocation failure limit"));
        assert_eq!(summary.leaked_blocks, 0);
    }

    #[test]
    fn test_failed_new_leaves_no_queue() {
        let (summary, output) = run_with(
            "new\nshow\n",
            Options::default(),
            FaultInjector::new(usize::MAX, 100, 1),
        );

        assert_eq!(summary.errors, 0);
        assert_eq!(summary.allocation_failures, 1);
        assert!(output.contains("q = NULL"));
    }

    #[test]
    fn test_memory_limit_refuses_inserts() {
        let (summary, _) = run_with(
            "new\nit aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n",
            Options::default(),
            FaultInjector::new(128, 0, 1),
        );

        assert_eq!(summary.allocation_failures, 1);
        assert_eq!(summary.leaked_blocks, 0);
    }

    #[test]
    fn test_memory_pressure_warning() {
        let (summary, output) = run_with(
            "new\nit abc\nit abc\n",
            Options::default(),
            FaultInjector::new(128, 0, 1),
        );

        assert_eq!(summary.errors, 0, "{}", output);
        assert_eq!(output.matches("memory budget in use").count(), 1, "{}", output);
        assert_eq!(summary.leaked_blocks, 0);

        let (_, output) = run("new\nit abc\nit abc\n");
        assert!(!output.contains("memory budget in use"));
    }

    #[test]
    fn test_error_limit_stops_execution() {
        let options = Options {
            error_limit: 2,
            ..Options::default()
        };
        let (summary, output) = run_with(
            "bogus\nnonsense\nnew\nit x\n",
            options,
            FaultInjector::tracking_only(),
        );

        assert_eq!(summary.commands, 2);
        assert_eq!(summary.errors, 2);
        assert!(output.contains("Error limit exceeded"));
        assert!(!output.contains("q = [x]"));
    }

    #[test]
    fn test_echo_and_comments() {
        let options = Options {
            echo: true,
            ..Options::default()
        };
        let (summary, output) = run_with(
            "# setup\n\nnew\nshow\n",
            options,
            FaultInjector::tracking_only(),
        );

        assert_eq!(summary.commands, 2);
        assert!(output.contains("cmd> # setup"));
        assert!(output.contains("cmd> new"));
        assert!(output.contains("q = []"));
    }

    #[test]
    fn test_options() {
        let mut interpreter = Interpreter::new(
            Options::default(),
            Arc::new(FaultInjector::tracking_only()),
            Vec::new(),
        );

        assert!(interpreter.execute_line("option error 9").unwrap());
        assert!(interpreter.execute_line("option echo on").unwrap());
        assert!(interpreter.execute_line("option malloc 25").unwrap());
        assert_eq!(interpreter.options().error_limit, 9);
        assert!(interpreter.options().echo);
        assert_eq!(interpreter.allocator.failure_percent(), 25);

        interpreter.execute_line("option malloc 101").unwrap();
        interpreter.execute_line("option length 0").unwrap();
        interpreter.execute_line("option colour red").unwrap();
        assert_eq!(interpreter.summary().errors, 3);

        interpreter.execute_line("option").unwrap();
        let output = String::from_utf8(interpreter.into_output()).unwrap();
        assert!(output.contains("malloc  25"));
    }

    #[test]
    fn test_show_truncates_long_queues() {
        let (_, output) = run("new\nit v 40\nshow\n");

        assert!(output.contains(" ...]"));
    }

    #[test]
    fn test_quit_frees_queue() {
        let (summary, output) = run("new\nit a\nquit\nit never\n");

        assert_eq!(summary.commands, 3);
        assert!(!output.contains("never"));
        assert_eq!(summary.leaked_blocks, 0);
    }
}

//! External command execution for plugins.
//!
//! Commands are always given as argument vectors and spawned directly,
//! never through a shell, so option values cannot be reinterpreted as
//! shell syntax.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::{debug, info, warn};

use super::types::{PhaseContext, PluginError};

/// Run a command in `cwd`, discarding its output on success.
pub fn run<I, S>(ctx: &PhaseContext<'_>, argv: I, cwd: &Path) -> Result<(), PluginError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  spawn(ctx, argv, cwd, None).map(|_| ())
}

/// Run a command in `cwd` and return its trimmed stdout.
pub fn run_output<I, S>(ctx: &PhaseContext<'_>, argv: I, cwd: &Path) -> Result<String, PluginError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let output = spawn(ctx, argv, cwd, None)?;
  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a command in `cwd` feeding `input` on stdin and return raw stdout.
///
/// The command may exit before consuming all of `input`.
pub fn run_with_input<I, S>(ctx: &PhaseContext<'_>, argv: I, cwd: &Path, input: &[u8]) -> Result<Vec<u8>, PluginError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  spawn(ctx, argv, cwd, Some(input)).map(|output| output.stdout)
}

fn spawn<I, S>(ctx: &PhaseContext<'_>, argv: I, cwd: &Path, input: Option<&[u8]>) -> Result<Output, PluginError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let argv: Vec<_> = argv.into_iter().map(|a| a.as_ref().to_os_string()).collect();
  let cmd_display = argv
    .iter()
    .map(|a| a.to_string_lossy())
    .collect::<Vec<_>>()
    .join(" ");

  let Some((program, args)) = argv.split_first() else {
    return Err(PluginError::CmdFailed { cmd: cmd_display, code: None });
  };

  info!(part = %ctx.part, cmd = %cmd_display, "executing command");

  let mut command = Command::new(program);
  command
    .args(args)
    .current_dir(cwd)
    .env("SNAPFORGE_PART_NAME", ctx.part)
    .env("SNAPFORGE_PART_SRC", &ctx.dirs.src)
    .env("SNAPFORGE_PART_BUILD", &ctx.dirs.build)
    .env("SNAPFORGE_PART_INSTALL", &ctx.dirs.install)
    // Set a minimal locale so tool output is parseable
    .env("LANG", "C")
    .env("LC_ALL", "C")
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() });

  debug!(program = %program.to_string_lossy(), working_dir = ?cwd, "spawning process");

  let mut child = command.spawn().map_err(|source| PluginError::Spawn {
    program: program.to_string_lossy().to_string(),
    source,
  })?;

  // Feed stdin from a separate thread so a chatty child cannot deadlock on a full stdout pipe.
  let stdin = child.stdin.take();
  let output = std::thread::scope(|scope| {
    let writer = scope.spawn(|| feed_stdin(stdin, input));
    let output = child.wait_with_output();
    match writer.join() {
      Ok(Ok(())) => output,
      Ok(Err(e)) => Err(e),
      Err(_) => Err(io::Error::other("stdin writer panicked")),
    }
  })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      warn!(part = %ctx.part, stderr = %stderr.trim_end(), "command stderr");
    }

    return Err(PluginError::CmdFailed {
      cmd: cmd_display,
      code: output.status.code(),
    });
  }

  if ctx.config.verbose && !output.stderr.is_empty() {
    debug!(stderr = %String::from_utf8_lossy(&output.stderr).trim_end(), "command stderr");
  }

  Ok(output)
}

fn feed_stdin(stdin: Option<std::process::ChildStdin>, input: Option<&[u8]>) -> io::Result<()> {
  let (Some(mut stdin), Some(data)) = (stdin, input) else {
    return Ok(());
  };

  match stdin.write_all(data) {
    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
      debug!("command closed stdin early");
      Ok(())
    }
    other => other,
  }
}

//! The read/eval loop and the line reader in front of it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use nix::sys::signal::{self, Signal};
use nix::unistd;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::builtins::handle_builtin;
use crate::exec;
use crate::mask;
use crate::parser::{self, Parsed};

/// Global prompt string.
pub static PROMPT: &str = "tsh> ";

enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Line source: a `rustyline` editor with history recall when stdin is a
/// terminal, plain stdin reads otherwise so drivers can pipe commands in.
struct LineReader {
    editor: Option<DefaultEditor>,
    history: Option<PathBuf>,
    emit_prompt: bool,
}

impl LineReader {
    fn new(emit_prompt: bool) -> Self {
        let interactive = emit_prompt && unistd::isatty(0).unwrap_or(false);
        let mut editor = if interactive {
            DefaultEditor::new().ok()
        } else {
            None
        };
        let history = dirs_next::home_dir().map(|home| home.join(".tsh_history"));
        if let (Some(ed), Some(path)) = (editor.as_mut(), history.as_ref()) {
            let _ = ed.load_history(path);
        }
        LineReader {
            editor,
            history,
            emit_prompt,
        }
    }

    fn read(&mut self) -> io::Result<Input> {
        match self.editor.as_mut() {
            Some(ed) => match ed.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = ed.add_history_entry(line.as_str());
                        // The quit path exits through a signal handler, so
                        // persist history as we go rather than on drop.
                        if let Some(path) = self.history.as_ref() {
                            let _ = ed.save_history(path);
                        }
                    }
                    Ok(Input::Line(line))
                }
                Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
                Err(ReadlineError::Eof) => Ok(Input::Eof),
                Err(ReadlineError::Io(e)) => Err(e),
                Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
            },
            None => {
                if self.emit_prompt {
                    print!("{}", PROMPT);
                    io::stdout().flush()?;
                }
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line)? == 0 {
                    Ok(Input::Eof)
                } else {
                    Ok(Input::Line(line))
                }
            }
        }
    }
}

/// Runs the main shell loop: reads a line, parses it, dispatches to the
/// builtins or the launcher. End-of-file raises SIGQUIT, the same uniform
/// exit path as the `quit` builtin.
pub fn run_shell(emit_prompt: bool, verbose: bool) {
    let mut reader = LineReader::new(emit_prompt);
    loop {
        match reader.read() {
            Ok(Input::Line(line)) => {
                let cmdline = line.trim_end_matches('\n');
                if verbose && !cmdline.trim().is_empty() {
                    println!("Received command: {}", cmdline);
                }
                eval(cmdline);
                let _ = io::stdout().flush();
            }
            Ok(Input::Interrupted) => continue,
            Ok(Input::Eof) => {
                let _ = signal::raise(Signal::SIGQUIT);
                // Unreachable unless SIGQUIT is blocked or ignored.
                println!();
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Evaluates one command line.
fn eval(cmdline: &str) {
    // No line starts with the gate closed, whatever the previous one did.
    mask::unblock();
    let cmd = match parser::parse(cmdline) {
        Ok(Parsed::Empty) => return,
        Ok(Parsed::Cmd(cmd)) => cmd,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return;
        }
    };
    if handle_builtin(&cmd) {
        return;
    }
    exec::spawn(&cmd, cmdline);
}

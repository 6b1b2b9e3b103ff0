use std::io;

use crate::builtins::{self, BuiltinAction};
use crate::invoker;
use crate::pipeline;
use crate::status;
use crate::streams::IoStreams;
use crate::tokens::{PIPE, TokenSequence};

/// Run one parsed command line and report what the shell should do next.
///
/// Lines containing a `|` token go to the pipeline engine; anything else is
/// a builtin or exactly one external command.
pub fn execute(tokens: &TokenSequence, last_exit_code: i32) -> BuiltinAction {
    let Some(program) = tokens.first() else {
        return BuiltinAction::Continue(last_exit_code);
    };

    if tokens.count_occurrences(PIPE) > 0 {
        let code = match pipeline::run(tokens) {
            Ok(()) => 0,
            Err(err) => {
                if !err.is_stage_status() {
                    eprintln!("swish: {err}");
                }
                err.exit_code()
            }
        };
        return BuiltinAction::Continue(code);
    }

    if builtins::is_builtin(program) {
        let args = tokens.words();
        let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
        return builtins::execute(program, &args[1..], last_exit_code, &mut stdout, &mut stderr);
    }

    BuiltinAction::Continue(run_external(tokens))
}

/// Spawn a single external command on the shell's own streams and wait for it.
fn run_external(tokens: &TokenSequence) -> i32 {
    let child = invoker::prepare(tokens.as_slice(), IoStreams::inherit())
        .and_then(|invocation| invoker::spawn(invocation, &[]));

    match child {
        Ok(mut child) => match child.wait() {
            Ok(exit) => status::exit_code(exit),
            Err(e) => {
                eprintln!("swish: wait: {e}");
                1
            }
        },
        Err(err) => {
            eprintln!("swish: {err}");
            err.exit_code()
        }
    }
}

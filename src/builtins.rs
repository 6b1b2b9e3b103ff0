use std::io::Write;

/// Commands the shell runs itself instead of spawning.
const BUILTINS: &[&str] = &["cd", "pwd", "exit"];

#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

/// Returns true if the command name is a shell builtin.
///
/// Only consulted for single commands: every pipeline stage is an external
/// program.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Execute a builtin command, writing output to the provided streams.
pub fn execute(
    program: &str,
    args: &[String],
    last_exit_code: i32,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> BuiltinAction {
    match program {
        "cd" => BuiltinAction::Continue(builtin_cd(args, stderr)),
        "pwd" => BuiltinAction::Continue(builtin_pwd(stdout, stderr)),
        "exit" => builtin_exit(args, last_exit_code, stderr),
        _ => {
            let _ = writeln!(stderr, "swish: unknown builtin: {program}");
            BuiltinAction::Continue(1)
        }
    }
}

fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) if dir == "-" => match std::env::var("OLDPWD") {
            Ok(prev) => prev,
            Err(_) => {
                let _ = writeln!(stderr, "cd: OLDPWD not set");
                return 1;
            }
        },
        Some(dir) => dir.clone(),
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                let _ = writeln!(stderr, "cd: HOME not set");
                return 1;
            }
        },
    };

    let previous = std::env::current_dir();
    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "cd: {target}: {e}");
        return 1;
    }

    // SAFETY: the shell mutates its environment only from the main thread;
    // the Ctrl-C handler thread never touches it.
    if let Ok(cwd) = previous {
        unsafe { std::env::set_var("OLDPWD", cwd) };
    }
    0
}

fn builtin_pwd(stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            1
        }
    }
}

fn builtin_exit(args: &[String], last_exit_code: i32, stderr: &mut dyn Write) -> BuiltinAction {
    match args.first() {
        None => BuiltinAction::Exit(last_exit_code),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => BuiltinAction::Exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "exit: {s}: numeric argument required");
                BuiltinAction::Exit(2)
            }
        },
    }
}

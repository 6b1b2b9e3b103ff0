use std::io::{self, IsTerminal, Write};

use swish::builtins::BuiltinAction;
use swish::{executor, parser};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "swish> ";

fn main() {
    // Logs go to stderr so they can never mix with pipeline output.
    let filter = EnvFilter::try_from_env("SWISH_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    ctrlc::set_handler(|| {
        println!();
        let _ = io::stdout().flush();
    })
    .expect("Failed to set Ctrl-C handler");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_exit_code: i32 = 0;

    loop {
        print!("{PROMPT}");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let tokens = parser::tokenize(&input);
                if tokens.is_empty() {
                    continue;
                }

                match executor::execute(&tokens, last_exit_code) {
                    BuiltinAction::Continue(code) => last_exit_code = code,
                    BuiltinAction::Exit(code) => {
                        last_exit_code = code;
                        break;
                    }
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {error}");
                break;
            }
        }
    }

    std::process::exit(last_exit_code);
}

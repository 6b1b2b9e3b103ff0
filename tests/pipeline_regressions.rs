use std::io::Write;
use std::process::{Command, Stdio};

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_swish"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn swish");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("swish_pipeline_{name}_{}", std::process::id()))
}

#[test]
fn three_stage_pipeline_outputs() {
    let output = run_shell(&[r"printf 'pear\napple\n' | sort | tr a-z A-Z"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("APPLE\nPEAR\n"), "stdout was: {stdout}");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn external_stderr_pipes_into_next_command() {
    let output = run_shell(&["sh -c 'echo err 1>&2' 2>&1 | sort"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains("err"), "stdout was: {stdout}");
    assert!(!stderr.contains("err"), "stderr was: {stderr}");
}

#[test]
fn missing_middle_command_fails_pipeline() {
    let output = run_shell(&["printf 'x\\n' | swish-no-such-command-xyz | cat"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        stderr.contains("swish: command not found: swish-no-such-command-xyz"),
        "stderr was: {stderr}"
    );
    // Bare `exit` keeps the pipeline's status.
    assert_eq!(output.status.code(), Some(127));
}

#[test]
fn early_reader_exit_does_not_hang_or_kill_shell() {
    // `yes` never stops writing; it only ends once `head` closes the pipe.
    let output = run_shell(&["yes | head -1", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("y\n"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[test]
fn dangling_pipe_is_syntax_error() {
    let output = run_shell(&["echo never |", "echo AFTER"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("syntax error"), "stderr was: {stderr}");
    assert!(!stdout.contains("never"), "stdout was: {stdout}");
    assert!(stdout.contains("AFTER"), "stdout was: {stdout}");
}

#[test]
fn redirect_inside_pipeline_writes_file() {
    let temp_dir = temp_dir("redirect");
    std::fs::create_dir_all(&temp_dir).unwrap();
    let output_path = temp_dir.join("out.txt");

    let cmd = format!("printf 'one\\ntwo\\n' | grep two > {}", output_path.display());
    let output = run_shell(&[cmd.as_str()]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr was: {stderr}");
    assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "two\n");

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn input_redirect_feeds_first_stage() {
    let temp_dir = temp_dir("input");
    std::fs::create_dir_all(&temp_dir).unwrap();
    let input_path = temp_dir.join("in.txt");
    std::fs::write(&input_path, "c\nb\na\n").unwrap();

    let cmd = format!("sort < {} | head -1", input_path.display());
    let output = run_shell(&[cmd.as_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("a\n"), "stdout was: {stdout}");
    assert!(!stdout.contains("c\n"), "stdout was: {stdout}");

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn quoted_operators_are_plain_arguments() {
    let temp_dir = temp_dir("quoted");
    std::fs::create_dir_all(&temp_dir).unwrap();
    let victim = temp_dir.join("victim");
    std::fs::write(&victim, "precious\n").unwrap();

    let cmd = format!("echo '>{}' \"<b>\" '|' | cat", victim.display());
    let output = run_shell(&[cmd.as_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains(&format!(">{} <b> |\n", victim.display())), "stdout was: {stdout}");
    assert_eq!(std::fs::read_to_string(&victim).unwrap(), "precious\n");
    assert_eq!(output.status.code(), Some(0));

    let _ = std::fs::remove_dir_all(&temp_dir);
}

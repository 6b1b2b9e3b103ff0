use std::process::ExitStatus;

/// Convert an OS process status into shell-style exit code semantics.
///
/// Processes terminated by a signal map to `128 + signal`, so a stage killed
/// by SIGPIPE reports 141.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
        return 128 + signal;
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn normal_exit_keeps_its_code() {
        // Raw wait status: exit code lives in the second byte.
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }

    #[test]
    fn signal_maps_above_128() {
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGPIPE)), 141);
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGKILL)), 137);
    }
}

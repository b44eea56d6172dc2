use thiserror::Error;

/// Failures of the probe lifecycle. Every variant is fatal for the process:
/// they point at the environment (kernel, privileges, config), not at a
/// transient fault.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to resolve event `{event}`: {reason}")]
    Resolution { event: String, reason: String },

    #[error("failed to attach `{program}` to `{target}`: {reason}")]
    Attachment {
        program: String,
        target: String,
        reason: String,
    },

    #[error("failed to read table `{table}`: {reason}")]
    TableRead { table: String, reason: String },

    #[error("failed to detach `{program}`: {reason}")]
    Detachment { program: String, reason: String },
}

impl ProbeError {
    pub fn resolution(event: &str, reason: impl ToString) -> Self {
        ProbeError::Resolution {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn attachment(program: &str, target: &str, reason: impl ToString) -> Self {
        ProbeError::Attachment {
            program: program.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn table_read(table: &str, reason: impl ToString) -> Self {
        ProbeError::TableRead {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn detachment(program: &str, reason: impl ToString) -> Self {
        ProbeError::Detachment {
            program: program.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The lifecycle step that failed, for diagnostics.
    pub fn step(&self) -> &'static str {
        match self {
            ProbeError::Resolution { .. } => "resolve",
            ProbeError::Attachment { .. } => "attach",
            ProbeError::TableRead { .. } => "read table",
            ProbeError::Detachment { .. } => "detach",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeError::Resolution { .. } => 2,
            ProbeError::Attachment { .. } => 3,
            ProbeError::TableRead { .. } => 4,
            ProbeError::Detachment { .. } => 5,
        }
    }
}

/// Exit code for an error bubbling out of the CLI.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ProbeError>()
        .map(ProbeError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_every_probe_error_exits_non_zero() {
        let errors = vec![
            ProbeError::resolution("execve", "no such symbol"),
            ProbeError::attachment("count_execve", "__x64_sys_execve", "EPERM"),
            ProbeError::table_read("COUNTER_TABLE", "probe detached"),
            ProbeError::detachment("count_execve", "unknown link"),
        ];

        let mut codes: Vec<i32> = errors.iter().map(ProbeError::exit_code).collect();
        assert!(codes.iter().all(|code| *code != 0));
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_message_names_failed_step() {
        let error = ProbeError::resolution("not_a_syscall", "symbol not found");
        assert_eq!(error.step(), "resolve");
        assert_eq!(
            error.to_string(),
            "failed to resolve event `not_a_syscall`: symbol not found"
        );
    }

    #[test]
    fn test_exit_code_survives_context() {
        let error = Err::<(), _>(ProbeError::table_read("COUNTER_TABLE", "gone"))
            .context("polling stopped")
            .unwrap_err();
        assert_eq!(exit_code_for(&error), 4);

        let other = anyhow::anyhow!("bad config");
        assert_eq!(exit_code_for(&other), 1);
    }
}

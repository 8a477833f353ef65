// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media engine errors.

use std::path::PathBuf;

/// Failures reported by a [`MediaEngine`](crate::engine::MediaEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The helper program could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// Probing exited with an error
    #[error("Failed to probe {}: {message}", path.display())]
    Probe {
        /// File being probed
        path: PathBuf,
        /// Diagnostic output
        message: String,
    },
    /// Probe output was not valid JSON
    #[error("Probe output could not be parsed: {0}")]
    ProbeParse(#[from] serde_json::Error),
    /// The file has neither a video nor an audio stream
    #[error("{} has no audio or video streams", .0.display())]
    NoStreams(PathBuf),
    /// The requested encoder is missing from the installed ffmpeg build
    #[error(
        "The '{encoder}' encoder is not available in this FFmpeg build. \
         Install a build that includes it or choose another format."
    )]
    EncoderUnavailable {
        /// Encoder name, or `unknown` when ffmpeg did not name it
        encoder: String,
    },
    /// The job exited with an error; the diagnostic text is kept verbatim
    #[error("{0}")]
    JobFailed(String),
    /// The job was terminated on request
    #[error("Job was cancelled")]
    Cancelled,
    /// Waiting on the job failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The job task panicked or was aborted
    #[error("Job task failed: {0}")]
    Task(String),
}

impl EngineError {
    /// Whether the error is a user cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Turn a failed job's diagnostics into an error.
///
/// Missing-encoder messages are rewritten into [`EngineError::EncoderUnavailable`];
/// anything else is passed through as-is.
pub fn classify_failure(stderr: &str, exit_code: Option<i32>) -> EngineError {
    if let Some(encoder) = missing_encoder(stderr) {
        return EngineError::EncoderUnavailable { encoder };
    }
    let text = stderr.trim();
    if text.is_empty() {
        let status =
            exit_code.map_or_else(|| "a signal".to_string(), |code| format!("code {code}"));
        return EngineError::JobFailed(format!("ffmpeg exited with {status}"));
    }
    EngineError::JobFailed(text.to_string())
}

fn missing_encoder(stderr: &str) -> Option<String> {
    for line in stderr.lines() {
        let lower = line.to_ascii_lowercase();
        let mentions = lower.contains("unknown encoder")
            || (lower.contains("encoder") && lower.contains("not found"));
        if !mentions {
            continue;
        }
        let name = line
            .split('\'')
            .nth(1)
            .filter(|name| !name.is_empty())
            .unwrap_or("unknown");
        return Some(name.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_encoder_is_rewritten() {
        let err = classify_failure("[out] Unknown encoder 'libvpx-vp9'\n", Some(1));
        match err {
            EngineError::EncoderUnavailable { encoder } => assert_eq!(encoder, "libvpx-vp9"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unnamed_encoder_not_found() {
        let err = classify_failure("Encoder not found\n", Some(1));
        assert!(matches!(
            err,
            EngineError::EncoderUnavailable { ref encoder } if encoder == "unknown"
        ));
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn test_other_failures_pass_through() {
        let err = classify_failure("in.mp4: No such file or directory\n", Some(1));
        assert_eq!(err.to_string(), "in.mp4: No such file or directory");
        let err = classify_failure("", Some(3));
        assert_eq!(err.to_string(), "ffmpeg exited with code 3");
    }
}

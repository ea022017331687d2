use agent_orchestrator::DisplaySink;
use std::io::Write;

/// Streams visible model output to stderr as it arrives, leaving stdout for
/// the final turn result so output can be piped cleanly.
pub struct StderrSink;

impl DisplaySink for StderrSink {
    fn on_chunk(&mut self, text: &str) {
        eprint!("{text}");
        std::io::stderr().flush().ok();
    }
}

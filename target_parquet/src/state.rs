use std::io::Write;

use serde_json::Value;
use snafu::ResultExt;
use tracing::debug;

use crate::error::{EmitStateSnafu, EncodeStateSnafu, Result};

/// Writes the checkpoint as a single line, then flushes. Nothing is written
/// when no checkpoint is pending.
pub fn emit_state(state: Option<&Value>, mut out: impl Write) -> Result<()> {
    let Some(state) = state else {
        return Ok(());
    };

    let line = serde_json::to_string(state).context(EncodeStateSnafu {})?;
    debug!(state = %line, "emitting state");

    writeln!(out, "{line}").context(EmitStateSnafu {})?;
    out.flush().context(EmitStateSnafu {})
}

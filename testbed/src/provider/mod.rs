/*!

[`Provider`](testbed_hardware::Provider) implementations that do not need a cloud SDK:
[`StaticProvider`] hands out pre-provisioned hosts and [`ExecProvider`] delegates to external
commands.

!*/

mod exec;
mod static_hosts;

pub use exec::{ExecNode, ExecProvider, ExecSession};
pub use static_hosts::{StaticHost, StaticNode, StaticPool, StaticProvider};

use std::process::Output;
use testbed_hardware::{DriverError, DriverResult};

/// Returns the stdout of a finished command, or an error that includes its exit code and both of
/// its output streams.
pub(crate) fn driver_error_for_cmd_output(output: Output, hint: &str) -> DriverResult<String> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        Ok(stdout.to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        Err(DriverError::new_with_context(format!(
            "Error running '{}', exit code {}\nstderr:\n{}\nstdout:\n{}",
            hint, code, stderr, stdout
        )))
    }
}

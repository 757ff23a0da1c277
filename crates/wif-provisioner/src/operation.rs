use std::time::Duration;

use wif_gcp::{GcpClient, Operation};

use crate::error::ProvisionerError;

/// How long-running pool and provider operations are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Poll `operation` until it is done.
///
/// A finished operation carrying an error is `OperationFailed`; one still
/// running after `max_attempts` polls is `OperationTimeout`.
pub async fn wait_for_operation(
    client: &dyn GcpClient,
    mut operation: Operation,
    poll: &PollConfig,
) -> Result<Operation, ProvisionerError> {
    let mut attempts = 0;
    loop {
        if operation.done {
            if let Some(status) = operation.error.take() {
                return Err(ProvisionerError::OperationFailed {
                    name: operation.name,
                    message: status.message,
                });
            }
            return Ok(operation);
        }
        if attempts >= poll.max_attempts {
            return Err(ProvisionerError::OperationTimeout {
                name: operation.name,
                attempts,
            });
        }
        attempts += 1;
        tokio::time::sleep(poll.interval).await;
        tracing::debug!(operation = %operation.name, attempt = attempts, "polling operation");
        operation = client.get_operation(&operation.name).await?;
    }
}

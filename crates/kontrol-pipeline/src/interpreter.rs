//! Sequential step execution with result threading.

use serde_json::Value;
use tracing::debug;

use kontrol_host::HostApi;
use kontrol_state::{ActionStep, HostCommand};

use crate::error::{PipelineError, StepError};
use crate::matcher::Matcher;
use crate::store::ObjectStore;
use crate::template::render_options;

/// Run one ordered list of remediation steps to completion.
///
/// Steps execute strictly in order, each awaited fully before the next.
/// The first failing step aborts the rest of the run.
pub async fn run_steps(
    host: &dyn HostApi,
    steps: &[ActionStep],
    store: &mut ObjectStore,
) -> Result<(), PipelineError> {
    for (index, step) in steps.iter().enumerate() {
        debug!(step = index, command = %step.command, target = ?step.target, "executing step");
        execute_step(host, step, store)
            .await
            .map_err(|source| PipelineError {
                step: index,
                command: step.command,
                source,
            })?;
    }
    Ok(())
}

async fn execute_step(
    host: &dyn HostApi,
    step: &ActionStep,
    store: &mut ObjectStore,
) -> Result<(), StepError> {
    // Resolve the target object. Absent target means the root host
    // handle, which is implicit.
    let target: Option<Value> = match &step.target {
        None => None,
        Some(name) => Some(
            store
                .get(name)
                .cloned()
                .ok_or_else(|| StepError::UnknownTarget(name.clone()))?,
        ),
    };

    let options = step
        .options
        .as_ref()
        .map(|o| render_options(o, store))
        .transpose()?;

    let value = invoke(host, step.command, target.as_ref(), options.as_ref()).await?;

    // Narrow collection results through the filter; a single survivor
    // replaces the list.
    let value = match (&step.filter, value) {
        (Some(filter), Value::Array(items)) => Matcher::compile(filter)?.apply(items),
        (_, value) => value,
    };

    if let Some(name) = &step.result {
        store.insert(name, value);
    }

    // A successful removal evicts the target entry; later references
    // to it fail.
    if step.command.is_removal() {
        if let Some(name) = &step.target {
            store.remove(name);
        }
    }

    Ok(())
}

/// Dispatch one command to the host capability surface.
async fn invoke(
    host: &dyn HostApi,
    command: HostCommand,
    target: Option<&Value>,
    options: Option<&Value>,
) -> Result<Value, StepError> {
    match command {
        HostCommand::ListContainers => Ok(Value::Array(host.list_containers().await?)),
        HostCommand::GetContainer => {
            let id = options
                .and_then(Value::as_str)
                .ok_or(StepError::InvalidOptions(command))?;
            Ok(host.get_container(id).await?)
        }
        HostCommand::Stop => {
            host.stop(container_id(target, options)?).await?;
            Ok(Value::Null)
        }
        HostCommand::Restart => {
            host.restart(container_id(target, options)?).await?;
            Ok(Value::Null)
        }
        HostCommand::Remove => {
            host.remove(container_id(target, options)?).await?;
            Ok(Value::Null)
        }
    }
}

/// Container id for a destructive call: the target object's `Id` field,
/// or the rendered options string when the step addresses the root.
fn container_id<'a>(
    target: Option<&'a Value>,
    options: Option<&'a Value>,
) -> Result<&'a str, StepError> {
    if let Some(object) = target {
        return object
            .get("Id")
            .and_then(Value::as_str)
            .ok_or(StepError::MissingContainerId);
    }
    options
        .and_then(Value::as_str)
        .ok_or(StepError::MissingContainerId)
}

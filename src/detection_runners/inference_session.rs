use std::future::Future;
use crate::common::{ExecutionBackend, LabelSet};
use crate::data::{CancelToken, InputTensor, RawOutput};
use crate::error::DetectError;

/// A loaded detection model bound to one execution backend.
///
/// Sessions are immutable after load and shared read-only by every cycle.
/// Callers never issue overlapping `run` calls on the same session.
pub trait InferenceSession: Send + Sync + 'static {
    /// Declared model input size as `(width, height)`.
    fn input_size(&self) -> (u32, u32);

    /// Backend the session was built on.
    fn backend(&self) -> ExecutionBackend;

    /// Class labels resolved at load time.
    fn labels(&self) -> &LabelSet;

    /// Executes one forward pass.
    ///
    /// `cancel` is checked before work starts; a result that arrives after the
    /// token was cancelled must be discarded by the caller.
    fn run(
        &self,
        x: InputTensor,
        cancel: &CancelToken,
    ) -> impl Future<Output = Result<RawOutput, DetectError>> + Send;
}

/// Tries each backend in order and returns the first one that initializes.
///
/// Fails with [`DetectError::Load`] listing every attempt when none do.
pub fn negotiate<T, F>(
    backends: &[ExecutionBackend],
    mut attempt: F,
) -> Result<(ExecutionBackend, T), DetectError>
where
    F: FnMut(ExecutionBackend) -> Result<T, DetectError>,
{
    let mut failures = Vec::with_capacity(backends.len());
    for &backend in backends {
        match attempt(backend) {
            Ok(x) => {
                log::info!("Execution backend {} initialized", backend);
                if lost_acceleration(backend, &failures) {
                    log::warn!("No accelerated backend available, running on {}", backend);
                }
                return Ok((backend, x));
            }
            Err(err) => {
                log::warn!("Execution backend {} failed to initialize: {}", backend, err);
                failures.push((backend, err.to_string()));
            }
        }
    }
    Err(DetectError::Load { attempts: failures })
}

/// True when an accelerated backend failed and `chosen` is not accelerated.
fn lost_acceleration(chosen: ExecutionBackend, failures: &[(ExecutionBackend, String)]) -> bool {
    !chosen.is_accelerated() && failures.iter().any(|(b, _)| b.is_accelerated())
}

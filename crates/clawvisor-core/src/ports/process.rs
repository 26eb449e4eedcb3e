//! Process launcher port.
//!
//! The supervisor only ever sees these traits. The runtime crate implements
//! them on top of `tokio::process`; tests substitute scripted fakes.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::ProcessError;
use crate::domain::ServiceKind;

/// Lazily produced, trimmed output lines of a process (stdout and stderr merged).
pub type LineStream = BoxStream<'static, String>;

/// One spawned external process.
///
/// Implementations must keep `is_alive` non-blocking and make `terminate`
/// idempotent.
#[async_trait]
pub trait ServiceProcess: Send + Sync {
    /// Service this process was spawned for.
    fn kind(&self) -> ServiceKind;

    /// OS process id, when known.
    fn pid(&self) -> Option<u32>;

    /// Whether the OS process is still running.
    fn is_alive(&self) -> bool;

    /// Take the merged output stream.
    ///
    /// The first call returns the stream; later calls return `None`.
    fn lines(&self) -> Option<LineStream>;

    /// Exit code once the process has been reaped.
    fn exit_code(&self) -> Option<i32>;

    /// Kill the process and all of its descendants.
    ///
    /// Returns `true` if this call issued the kill, `false` if the handle was
    /// already terminated or the process had already exited.
    async fn terminate(&self) -> bool;
}

/// Spawns service processes and sweeps strays.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launch `command` (a full shell command line) for `kind`.
    async fn spawn(
        &self,
        kind: ServiceKind,
        command: &str,
    ) -> Result<Arc<dyn ServiceProcess>, ProcessError>;

    /// Best-effort kill of every process whose image name is in `image_names`.
    ///
    /// Returns how many kill requests were issued.
    async fn sweep(&self, image_names: &[String]) -> usize;
}

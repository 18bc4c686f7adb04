use widthcat::device::{CommandQueue, NdRange};
use widthcat::error::KernelResult;

use crate::device::HostKernel;

/// A submitted launch with the arguments captured at enqueue time.
#[derive(Debug, Clone)]
pub struct Launch {
    pub kernel: HostKernel,
    pub global: NdRange,
    pub local: Option<NdRange>,
}

/// In-order queue. Launches run on [`HostQueue::finish`], in submission order.
#[derive(Debug, Default)]
pub struct HostQueue {
    pending: Vec<Launch>,
    completed: Vec<Launch>,
}

impl HostQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[Launch] {
        &self.pending
    }

    /// Launches executed so far, oldest first.
    pub fn completed(&self) -> &[Launch] {
        &self.completed
    }

    /// Executes every pending launch and returns how many ran.
    ///
    /// Stops at the first failing launch; it and the launches behind it are dropped.
    pub fn finish(&mut self) -> KernelResult<usize> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for launch in pending {
            launch
                .kernel
                .program()
                .execute(launch.kernel.args(), launch.global)?;
            self.completed.push(launch);
        }
        tracing::debug!(launches = count, "host queue drained");
        Ok(count)
    }
}

impl CommandQueue for HostQueue {
    type Kernel = HostKernel;

    fn enqueue(
        &mut self,
        kernel: &HostKernel,
        global: NdRange,
        local: Option<NdRange>,
    ) -> KernelResult<()> {
        tracing::trace!(?global, ?local, pending = self.pending.len(), "host enqueue");
        self.pending.push(Launch {
            kernel: kernel.clone(),
            global,
            local,
        });
        Ok(())
    }
}

use crate::driver::DriverResult;
use crate::error::{self, Result};
use crate::inventory::{ConnectionVars, Inventory};
use crate::play::{Play, PlayResult};
use crate::registry::NodeRegistry;
use log::debug;
use snafu::ResultExt;

/// You implement [`ExecutorBuilder`] to bind a configuration-management tool to an inventory.
/// Building is assumed to be expensive (rendering and writing inventory files, warming caches),
/// which is why [`PlayRunner`] only does it when the inventory has changed.
pub trait ExecutorBuilder {
    type Executor: PlayExecutor;

    fn build(&self, inventory: &Inventory) -> DriverResult<Self::Executor>;
}

/// Runs plays against the inventory it was built for.
pub trait PlayExecutor {
    /// Run `play` and report per-host outcomes. Hosts that fail or cannot be reached are part of
    /// a successful return; `Err` is reserved for the executor itself not being able to run.
    fn run_play(&self, play: &Play) -> DriverResult<PlayResult>;
}

struct CachedExecutor<E> {
    generation: u64,
    executor: E,
}

/// Runs plays through an executor that is rebuilt whenever the node registry has changed since
/// the executor was built.
pub struct PlayRunner<B>
where
    B: ExecutorBuilder,
{
    builder: B,
    cached: Option<CachedExecutor<B::Executor>>,
    builds: usize,
}

impl<B> PlayRunner<B>
where
    B: ExecutorBuilder,
{
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            cached: None,
            builds: 0,
        }
    }

    /// Run `play` against every node of `registry`. The result is returned as-is, including
    /// failed and unreachable hosts.
    pub fn run(
        &mut self,
        registry: &NodeRegistry,
        vars: &ConnectionVars,
        play: &Play,
    ) -> Result<PlayResult> {
        let generation = registry.generation();
        let cached = match self.cached.take() {
            Some(cached) if cached.generation == generation => cached,
            stale => {
                if stale.is_some() {
                    debug!("Node set changed, rebuilding the executor");
                }
                let inventory = Inventory::from_registry(registry, vars.clone());
                let executor = self
                    .builder
                    .build(&inventory)
                    .context(error::BuildExecutorSnafu)?;
                self.builds += 1;
                CachedExecutor {
                    generation,
                    executor,
                }
            }
        };
        let cached = self.cached.insert(cached);

        debug!("Running play '{}'", play.name);
        cached
            .executor
            .run_play(play)
            .context(error::RunPlaySnafu { play: &play.name })
    }

    /// How many executors have been built so far.
    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }
}

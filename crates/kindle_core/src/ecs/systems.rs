// systems.rs - Per-frame callback scheduler
//
// Update systems run once per frame in registration order. Init systems run
// once for each newly created entity that holds all of their component types;
// they are dispatched right after the update (or load step) that created the
// entity.

use crate::ecs::{
    ComponentId, Entity, Registry, RegistryError, SystemHandle, SystemRegistrationError,
};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// What a system callback sees of the world between calls.
pub trait SystemContext {
    /// Entities announced via `Registry::post_create` since the last call.
    fn take_created(&mut self) -> Vec<Entity>;

    fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool;
}

impl SystemContext for Registry {
    fn take_created(&mut self) -> Vec<Entity> {
        Registry::take_created(self)
    }

    fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool {
        Registry::has_components(self, entity, components)
    }
}

/// Error returned by a system callback.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Script(String),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl SystemError {
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SystemError::Other(Box::new(err))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemPhase {
    Update,
    Init,
}

impl fmt::Display for SystemPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemPhase::Update => f.write_str("update"),
            SystemPhase::Init => f.write_str("init"),
        }
    }
}

/// A callback that returned an error.
#[derive(Debug)]
pub struct SystemFailure {
    pub system: String,
    pub phase: SystemPhase,
    pub error: SystemError,
}

impl fmt::Display for SystemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {} in {}: {}", self.phase, self.system, self.error)
    }
}

/// Statistics for a single frame
#[derive(Debug, Default)]
pub struct TickStats {
    pub duration: Duration,
    pub system_times: Vec<(String, Duration)>,
    pub inits_run: usize,
    pub failures: Vec<SystemFailure>,
}

impl TickStats {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&SystemFailure> {
        self.failures.first()
    }
}

pub type UpdateFn<C> = Box<dyn FnMut(&mut C, f32) -> Result<(), SystemError>>;
pub type InitFn<C> = Box<dyn FnMut(&mut C, Entity) -> Result<(), SystemError>>;

struct UpdateSystem<C> {
    handle: SystemHandle,
    name: String,
    run: UpdateFn<C>,
}

struct InitSystem<C> {
    handle: SystemHandle,
    name: String,
    components: Vec<ComponentId>,
    run: InitFn<C>,
}

/// Scheduler for named update and init callbacks over a context `C`.
///
/// Update callbacks are invoked in registration order. Names are labels only;
/// registering the same name twice adds a second system.
pub struct Systems<C> {
    updates: Vec<UpdateSystem<C>>,
    inits: Vec<InitSystem<C>>,
    next_handle: u32,
}

impl<C: SystemContext> Systems<C> {
    pub fn new() -> Self {
        Self {
            updates: Vec::new(),
            inits: Vec::new(),
            next_handle: 0,
        }
    }

    fn allocate_handle(&mut self) -> SystemHandle {
        let handle = SystemHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Register a per-frame callback invoked with the frame's `dt`.
    pub fn add_update<F>(
        &mut self,
        name: impl Into<String>,
        run: F,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        F: FnMut(&mut C, f32) -> Result<(), SystemError> + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(SystemRegistrationError::EmptyName);
        }
        let handle = self.allocate_handle();
        tracing::debug!(system = %name, %handle, "registered update system");
        self.updates.push(UpdateSystem {
            handle,
            name,
            run: Box::new(run),
        });
        Ok(handle)
    }

    /// Register a callback for new entities holding all `components`.
    pub fn on_init<F>(
        &mut self,
        name: impl Into<String>,
        components: &[ComponentId],
        run: F,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        F: FnMut(&mut C, Entity) -> Result<(), SystemError> + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(SystemRegistrationError::EmptyName);
        }
        if components.is_empty() {
            return Err(SystemRegistrationError::EmptyAccess { name });
        }
        let handle = self.allocate_handle();
        tracing::debug!(system = %name, %handle, ?components, "registered init system");
        self.inits.push(InitSystem {
            handle,
            name,
            components: components.to_vec(),
            run: Box::new(run),
        });
        Ok(handle)
    }

    /// Unregister a system. Returns false for unknown handles.
    pub fn remove(&mut self, handle: SystemHandle) -> bool {
        let before = self.updates.len() + self.inits.len();
        self.updates.retain(|s| s.handle != handle);
        self.inits.retain(|s| s.handle != handle);
        before != self.updates.len() + self.inits.len()
    }

    /// Drop every registration, e.g. before reloading a script.
    pub fn clear(&mut self) {
        self.updates.clear();
        self.inits.clear();
    }

    pub fn update_names(&self) -> impl Iterator<Item = &str> {
        self.updates.iter().map(|s| s.name.as_str())
    }

    pub fn init_names(&self) -> impl Iterator<Item = &str> {
        self.inits.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.updates.len() + self.inits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every update system once, dispatching init systems after each one.
    ///
    /// A failing system does not stop the frame; every failure is logged and
    /// reported in the returned stats.
    pub fn update(&mut self, ctx: &mut C, dt: f32) -> TickStats {
        let tick_start = Instant::now();
        let mut stats = TickStats::default();

        // Entities created before the frame (world load, script main) come first.
        stats.inits_run += Self::dispatch_inits(&mut self.inits, ctx, &mut stats.failures);

        for system in &mut self.updates {
            let system_start = Instant::now();
            if let Err(error) = (system.run)(ctx, dt) {
                let failure = SystemFailure {
                    system: system.name.clone(),
                    phase: SystemPhase::Update,
                    error,
                };
                tracing::error!("{failure}");
                stats.failures.push(failure);
            }
            stats
                .system_times
                .push((system.name.clone(), system_start.elapsed()));

            stats.inits_run += Self::dispatch_inits(&mut self.inits, ctx, &mut stats.failures);
        }

        stats.duration = tick_start.elapsed();
        stats
    }

    /// Run init systems for entities created outside of `update`.
    pub fn run_inits(&mut self, ctx: &mut C) -> Vec<SystemFailure> {
        let mut failures = Vec::new();
        Self::dispatch_inits(&mut self.inits, ctx, &mut failures);
        failures
    }

    fn dispatch_inits(
        inits: &mut [InitSystem<C>],
        ctx: &mut C,
        failures: &mut Vec<SystemFailure>,
    ) -> usize {
        let created = ctx.take_created();
        let mut run = 0;
        for entity in created {
            for system in inits.iter_mut() {
                if !ctx.has_components(entity, &system.components) {
                    continue;
                }
                run += 1;
                if let Err(error) = (system.run)(ctx, entity) {
                    let failure = SystemFailure {
                        system: system.name.clone(),
                        phase: SystemPhase::Init,
                        error,
                    };
                    tracing::error!(%entity, "{failure}");
                    failures.push(failure);
                }
            }
        }
        run
    }
}

impl<C: SystemContext> Default for Systems<C> {
    fn default() -> Self {
        Self::new()
    }
}

//! JavaScript scripts on QuickJS
//!
//! The world lives behind `Rc<RefCell<..>>` so host functions installed in
//! the context can reach it. Script callbacks are kept in JS; the scheduler
//! only knows their slot numbers and calls back through `__kindle`.

mod bindings;
mod value;

use crate::ffi::entity_to_number;
use crate::host::{HostError, Simulation, World};
use bindings::{Registration, Registrations};
use kindle_asset::{spawn_world, GameData, WorldData};
use kindle_core::ecs::{
    ComponentId, Entity, SystemContext, SystemError, SystemFailure, Systems, TickStats,
};
use rquickjs::context::EvalOptions;
use rquickjs::function::IntoArgs;
use rquickjs::{Context, Ctx, Function, Object, Runtime};
use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

const PRELUDE: &str = include_str!("prelude.js");

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to {action}: {message}")]
    Js { action: String, message: String },
}

/// Message of the exception behind `err`, or the error itself.
fn exception_message(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if !matches!(err, rquickjs::Error::Exception) {
        return err.to_string();
    }
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        return exception
            .message()
            .unwrap_or_else(|| "unknown exception".to_string());
    }
    if let Some(text) = caught.as_string() {
        if let Ok(text) = text.to_string() {
            return text;
        }
    }
    format!("{caught:?}")
}

fn js_error(ctx: &Ctx<'_>, action: impl Into<String>, err: rquickjs::Error) -> ScriptError {
    ScriptError::Js {
        action: action.into(),
        message: exception_message(ctx, err),
    }
}

/// Evaluate script source as sloppy-mode global code.
///
/// Game scripts create globals by plain assignment (`time = 0`).
fn eval_script(ctx: &Ctx<'_>, source: &str) -> rquickjs::Result<()> {
    let mut options = EvalOptions::default();
    options.strict = false;
    ctx.eval_with_options::<(), _>(source, options)
}

/// Call a function on the prelude's `__kindle` object.
fn call_kindle<'js, A>(ctx: &Ctx<'js>, name: &str, args: A) -> rquickjs::Result<()>
where
    A: IntoArgs<'js>,
{
    let kindle: Object = ctx.globals().get("__kindle")?;
    let function: Function = kindle.get(name)?;
    function.call::<_, ()>(args)
}

/// What JS systems run against: the context and the shared world.
pub struct JsFrame {
    context: Context,
    world: Rc<RefCell<World>>,
}

impl JsFrame {
    fn run_update(&self, slot: u32, dt: f32) -> Result<(), SystemError> {
        self.context.with(|ctx| {
            call_kindle(&ctx, "runUpdate", (slot, dt))
                .map_err(|err| SystemError::Script(exception_message(&ctx, err)))
        })
    }

    fn run_init(&self, slot: u32, entity: Entity) -> Result<(), SystemError> {
        self.context.with(|ctx| {
            call_kindle(&ctx, "runInit", (slot, entity_to_number(entity)))
                .map_err(|err| SystemError::Script(exception_message(&ctx, err)))
        })
    }

    /// Run script initializers for custom components created from Rust.
    fn run_pending_inits(&self) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            call_kindle(&ctx, "runPendingInits", ())
                .map_err(|err| js_error(&ctx, "initialize components", err))
        })
    }

    fn publish_input(&self) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            bindings::publish_input(&ctx, &self.world.borrow().input)
                .map_err(|err| js_error(&ctx, "publish input", err))
        })
    }
}

impl SystemContext for JsFrame {
    fn take_created(&mut self) -> Vec<Entity> {
        self.world.borrow_mut().registry.take_created()
    }

    fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool {
        self.world.borrow().registry.has_components(entity, components)
    }
}

/// Hosts a JavaScript script.
pub struct JsHost {
    systems: Systems<JsFrame>,
    env: JsFrame,
    registrations: Registrations,
    crashed: Option<String>,
    runtime: Runtime,
}

impl JsHost {
    /// Load `source` against the game: bind inputs, declare templates, run
    /// the script, then resolve templates and spawn the world.
    pub fn load(
        game: &GameData,
        world_data: &WorldData,
        source: &str,
        script_name: &str,
    ) -> Result<Self, HostError> {
        let runtime = Runtime::new().map_err(|err| ScriptError::Js {
            action: "start QuickJS".to_string(),
            message: err.to_string(),
        })?;
        let world = Rc::new(RefCell::new(World::from_game(game)));
        let registrations = Registrations::default();
        let context = boot(&runtime, &world, &registrations, source, script_name)?;

        {
            let mut world = world.borrow_mut();
            let world = &mut *world;
            world.templates.resolve(game, &world.registry);
        }

        let mut host = Self {
            systems: Systems::new(),
            env: JsFrame { context, world },
            registrations,
            crashed: None,
            runtime,
        };
        host.register_pending();

        {
            let mut world = host.env.world.borrow_mut();
            let world = &mut *world;
            spawn_world(world_data, &world.templates, &mut world.registry)?;
        }
        host.env.run_pending_inits()?;
        let failures = host.systems.run_inits(&mut host.env);
        host.record_failure(failures.first());

        tracing::info!(
            title = %game.title,
            script = script_name,
            systems = host.systems.len(),
            entities = host.world().registry.entity_count(),
            "loaded script"
        );
        Ok(host)
    }

    pub fn load_file(
        game: &GameData,
        world_data: &WorldData,
        path: &Path,
    ) -> Result<Self, HostError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(game, world_data, &source, &path.display().to_string())
    }

    /// Replace the script, keeping the world.
    ///
    /// All systems are dropped and the script runs in a fresh context.
    /// Component types keep their ids, so existing entities stay valid.
    pub fn reload(&mut self, source: &str, script_name: &str) -> Result<(), HostError> {
        self.systems.clear();
        self.registrations.borrow_mut().clear();
        let context = boot(
            &self.runtime,
            &self.env.world,
            &self.registrations,
            source,
            script_name,
        )?;
        self.env.context = context;
        self.crashed = None;
        self.register_pending();
        tracing::info!(script = script_name, systems = self.systems.len(), "reloaded script");
        Ok(())
    }

    /// Evaluate extra source in the script's context.
    pub fn eval(&mut self, source: &str) -> Result<(), ScriptError> {
        self.env.context.with(|ctx| {
            eval_script(&ctx, source).map_err(|err| js_error(&ctx, "evaluate script", err))
        })?;
        self.register_pending();
        Ok(())
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.env.world.borrow()
    }

    pub fn systems(&self) -> &Systems<JsFrame> {
        &self.systems
    }

    fn register_pending(&mut self) {
        let pending = std::mem::take(&mut *self.registrations.borrow_mut());
        for registration in pending {
            let result = match registration {
                Registration::Update { name, slot } => self
                    .systems
                    .add_update(name, move |frame: &mut JsFrame, dt| frame.run_update(slot, dt)),
                Registration::Init {
                    name,
                    components,
                    slot,
                } => self.systems.on_init(name, &components, move |frame: &mut JsFrame, e| {
                    frame.run_init(slot, e)
                }),
            };
            if let Err(err) = result {
                tracing::error!(target: "script", "{err}");
            }
        }
    }

    fn record_failure(&mut self, failure: Option<&SystemFailure>) {
        if let (None, Some(failure)) = (&self.crashed, failure) {
            tracing::error!("script crashed: {failure}");
            self.crashed = Some(failure.to_string());
        }
    }
}

impl Simulation for JsHost {
    fn frame(&mut self, dt: f32) -> Result<TickStats, HostError> {
        if let Some(failure) = &self.crashed {
            return Err(HostError::Crashed(failure.clone()));
        }
        self.env.publish_input()?;
        self.env.run_pending_inits()?;
        let stats = self.systems.update(&mut self.env, dt);
        self.env.world.borrow_mut().end_frame(dt);
        self.register_pending();
        self.record_failure(stats.first_failure());
        Ok(stats)
    }

    fn with_world<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.env.world.borrow_mut())
    }

    fn crashed(&self) -> Option<&str> {
        self.crashed.as_deref()
    }
}

/// Create a context with the script API installed and run `source` in it.
fn boot(
    runtime: &Runtime,
    world: &Rc<RefCell<World>>,
    registrations: &Registrations,
    source: &str,
    script_name: &str,
) -> Result<Context, ScriptError> {
    let context = Context::full(runtime).map_err(|err| ScriptError::Js {
        action: "create context".to_string(),
        message: err.to_string(),
    })?;
    context.with(|ctx| -> Result<(), ScriptError> {
        bindings::install(&ctx, world, registrations)
            .map_err(|err| js_error(&ctx, "install host functions", err))?;
        ctx.eval::<(), _>(PRELUDE)
            .map_err(|err| js_error(&ctx, "run prelude", err))?;
        bindings::publish_input(&ctx, &world.borrow().input)
            .map_err(|err| js_error(&ctx, "publish input", err))?;
        eval_script(&ctx, source)
            .map_err(|err| js_error(&ctx, format!("load {script_name}"), err))
    })?;
    Ok(context)
}

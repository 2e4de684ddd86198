// bindings.rs - Host primitives behind the script API
//
// Installs a `__host` object whose functions read and write the shared world.
// The prelude builds the script-facing `Registry`, `Systems`, `Templates`
// and `Math.NewRandom` globals on top of it. Entities are passed as numbers
// (see `ffi`).
//
// Every function borrows the world only for its own duration; none of them
// call back into JavaScript.

use crate::ffi::{entity_from_number, entity_to_number};
use crate::host::World;
use crate::js::value::JsField;
use kindle_core::ecs::{ComponentId, ComponentInit, CustomArguments, Entity, Fields};
use kindle_core::glam::Vec2;
use kindle_core::math::Random;
use kindle_services::Input;
use rquickjs::function::IntoJsFunc;
use rquickjs::{Ctx, Function, Object};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A system registered from script, waiting to be added to the scheduler.
///
/// `slot` indexes the prelude's callback table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Registration {
    Update {
        name: String,
        slot: u32,
    },
    Init {
        name: String,
        components: Vec<ComponentId>,
        slot: u32,
    },
}

pub(crate) type Registrations = Rc<RefCell<Vec<Registration>>>;

#[derive(Serialize)]
struct PendingInitJs<'a> {
    entity: f64,
    component: ComponentId,
    arguments: &'a CustomArguments,
}

fn entity_arg(value: f64) -> rquickjs::Result<Entity> {
    entity_from_number(value).ok_or_else(|| {
        rquickjs::Error::new_from_js_message(
            "number",
            "entity",
            format!("{value} is not an entity handle"),
        )
    })
}

fn host_error(err: impl fmt::Display) -> rquickjs::Error {
    rquickjs::Error::new_from_js_message("arguments", "host call", err.to_string())
}

fn with_stream<T>(
    streams: &RefCell<Vec<Random>>,
    id: u32,
    f: impl FnOnce(&mut Random) -> T,
) -> rquickjs::Result<T> {
    let mut streams = streams.borrow_mut();
    let random = streams
        .get_mut(id as usize)
        .ok_or_else(|| host_error(format!("no random stream {id}")))?;
    Ok(f(random))
}

fn define<'js, P, F>(ctx: &Ctx<'js>, host: &Object<'js>, name: &str, f: F) -> rquickjs::Result<()>
where
    F: IntoJsFunc<'js, P> + 'js,
{
    host.set(name, Function::new(ctx.clone(), f)?)
}

pub(crate) fn install<'js>(
    ctx: &Ctx<'js>,
    world: &Rc<RefCell<World>>,
    registrations: &Registrations,
) -> rquickjs::Result<()> {
    let host = Object::new(ctx.clone())?;

    define(ctx, &host, "print", |message: String| {
        tracing::info!(target: "script", "{message}");
    })?;

    // Component types

    let w = world.clone();
    define(ctx, &host, "position2Id", move || -> ComponentId {
        w.borrow().registry.position2_id()
    })?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "newType",
        move |name: String, scripted: bool| -> rquickjs::Result<ComponentId> {
            let init = if scripted {
                ComponentInit::Deferred
            } else {
                ComponentInit::Empty
            };
            w.borrow_mut()
                .registry
                .register(&name, init)
                .map_err(host_error)
        },
    )?;

    // Entities

    let w = world.clone();
    define(ctx, &host, "entities", move |types: Vec<ComponentId>| -> Vec<f64> {
        w.borrow()
            .registry
            .entities(&types)
            .into_iter()
            .map(entity_to_number)
            .collect()
    })?;

    let w = world.clone();
    define(ctx, &host, "isAlive", move |entity: f64| -> bool {
        entity_from_number(entity).is_some_and(|e| w.borrow().registry.is_alive(e))
    })?;

    let w = world.clone();
    define(ctx, &host, "destroy", move |entity: f64| -> rquickjs::Result<bool> {
        let entity = entity_arg(entity)?;
        Ok(w.borrow_mut().registry.destroy(entity))
    })?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "has",
        move |entity: f64, component: ComponentId| -> rquickjs::Result<bool> {
            let entity = entity_arg(entity)?;
            Ok(w.borrow().registry.has(entity, component))
        },
    )?;

    // Position2

    let w = world.clone();
    define(
        ctx,
        &host,
        "getPosition",
        move |entity: f64| -> rquickjs::Result<Option<Vec<f64>>> {
            let entity = entity_arg(entity)?;
            Ok(w.borrow()
                .registry
                .position2(entity)
                .map(|p| vec![p.x as f64, p.y as f64]))
        },
    )?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "setPosition",
        move |entity: f64, x: f64, y: f64| -> rquickjs::Result<()> {
            let entity = entity_arg(entity)?;
            w.borrow_mut()
                .registry
                .set_position2(entity, Vec2::new(x as f32, y as f32))
                .map_err(host_error)
        },
    )?;

    // Custom component fields

    let w = world.clone();
    define(
        ctx,
        &host,
        "fieldNames",
        move |entity: f64, component: ComponentId| -> rquickjs::Result<Option<Vec<String>>> {
            let entity = entity_arg(entity)?;
            Ok(w.borrow()
                .registry
                .fields(entity, component)
                .map(|fields| fields.names().map(str::to_string).collect()))
        },
    )?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "getField",
        move |entity: f64, component: ComponentId, name: String| -> rquickjs::Result<Option<JsField>> {
            let entity = entity_arg(entity)?;
            Ok(w.borrow()
                .registry
                .fields(entity, component)
                .and_then(|fields| fields.get(&name))
                .cloned()
                .map(JsField))
        },
    )?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "setField",
        move |entity: f64, component: ComponentId, name: String, value: JsField| -> rquickjs::Result<()> {
            let entity = entity_arg(entity)?;
            let mut world = w.borrow_mut();
            let fields = world
                .registry
                .fields_or_insert(entity, component)
                .map_err(host_error)?;
            fields.set(name, value.0);
            Ok(())
        },
    )?;

    // Values convert before the closure runs, so a bad value throws with the
    // component untouched.
    let w = world.clone();
    define(
        ctx,
        &host,
        "replaceFields",
        move |entity: f64,
              component: ComponentId,
              names: Vec<String>,
              values: Vec<JsField>|
              -> rquickjs::Result<()> {
            let entity = entity_arg(entity)?;
            if names.len() != values.len() {
                return Err(host_error("field names and values differ in length"));
            }
            let fields = names
                .into_iter()
                .zip(values)
                .fold(Fields::new(), |fields, (name, value)| fields.with(name, value.0));
            w.borrow_mut()
                .registry
                .set_fields(entity, component, fields)
                .map_err(host_error)
        },
    )?;

    // Templates

    let w = world.clone();
    define(ctx, &host, "findTemplate", move |name: String| -> bool {
        w.borrow().templates.find(&name).is_some()
    })?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "createFromTemplate",
        move |name: String| -> rquickjs::Result<f64> {
            w.borrow_mut()
                .create_from_template(&name)
                .map(entity_to_number)
                .map_err(host_error)
        },
    )?;

    let w = world.clone();
    define(
        ctx,
        &host,
        "takePendingInits",
        move || -> rquickjs::Result<String> {
            let pending = w.borrow_mut().registry.take_pending_inits();
            let pending: Vec<PendingInitJs> = pending
                .iter()
                .map(|p| PendingInitJs {
                    entity: entity_to_number(p.entity),
                    component: p.component,
                    arguments: &p.arguments,
                })
                .collect();
            serde_json::to_string(&pending).map_err(host_error)
        },
    )?;

    // Random streams, split off the world's seed in creation order.

    let streams: Rc<RefCell<Vec<Random>>> = Rc::default();

    let (w, r) = (world.clone(), streams.clone());
    define(ctx, &host, "newRandom", move || -> u32 {
        let stream = w.borrow_mut().random.split();
        let mut streams = r.borrow_mut();
        streams.push(stream);
        (streams.len() - 1) as u32
    })?;

    let r = streams.clone();
    define(ctx, &host, "randomFloat01", move |id: u32| -> rquickjs::Result<f32> {
        with_stream(&r, id, Random::next_float01)
    })?;

    let r = streams.clone();
    define(
        ctx,
        &host,
        "randomRange",
        move |id: u32, max: f32| -> rquickjs::Result<f32> {
            with_stream(&r, id, |random| random.next_range(max))
        },
    )?;

    let r = streams.clone();
    define(ctx, &host, "randomBool", move |id: u32| -> rquickjs::Result<bool> {
        with_stream(&r, id, Random::next_bool)
    })?;

    let r = streams;
    define(
        ctx,
        &host,
        "randomPoint2",
        move |id: u32, left: f32, bottom: f32, right: f32, top: f32| -> rquickjs::Result<Vec<f64>> {
            let p = with_stream(&r, id, |random| {
                random.next_point2(Vec2::new(left, bottom), Vec2::new(right, top))
            })?;
            Ok(vec![p.x as f64, p.y as f64])
        },
    )?;

    // Systems

    let r = registrations.clone();
    define(
        ctx,
        &host,
        "addUpdate",
        move |name: String, slot: u32| -> rquickjs::Result<()> {
            if name.is_empty() {
                return Err(host_error("update system needs a name"));
            }
            r.borrow_mut().push(Registration::Update { name, slot });
            Ok(())
        },
    )?;

    let r = registrations.clone();
    define(
        ctx,
        &host,
        "onInit",
        move |name: String, components: Vec<ComponentId>, slot: u32| -> rquickjs::Result<()> {
            if name.is_empty() {
                return Err(host_error("init system needs a name"));
            }
            if components.is_empty() {
                return Err(host_error(format!(
                    "init system '{name}' needs at least one component type"
                )));
            }
            r.borrow_mut().push(Registration::Init {
                name,
                components,
                slot,
            });
            Ok(())
        },
    )?;

    ctx.globals().set("__host", host)
}

/// Write this frame's key states into the `Input` global.
///
/// Key objects are updated in place, so scripts may keep `Input.fire` around.
pub(crate) fn publish_input(ctx: &Ctx<'_>, input: &Input) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    let object = match globals.get::<_, Option<Object>>("Input")? {
        Some(object) => object,
        None => {
            let object = Object::new(ctx.clone())?;
            globals.set("Input", object.clone())?;
            object
        }
    };
    for bind in input.iter() {
        let key = match object.get::<_, Option<Object>>(bind.name.as_str())? {
            Some(key) => key,
            None => {
                let key = Object::new(ctx.clone())?;
                object.set(bind.name.as_str(), key.clone())?;
                key
            }
        };
        key.set("state", bind.state.state)?;
        key.set("last_state", bind.state.last_state)?;
    }
    Ok(())
}

//! Component field values crossing into and out of QuickJS.

use kindle_core::ecs::FieldValue;
use rquickjs::{Ctx, FromJs, IntoJs, Value};

/// A component field as seen by scripts: number, boolean or string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JsField(pub FieldValue);

impl<'js> IntoJs<'js> for JsField {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        match self.0 {
            FieldValue::Number(n) => n.into_js(ctx),
            FieldValue::Flag(b) => b.into_js(ctx),
            FieldValue::Text(s) => s.into_js(ctx),
        }
    }
}

impl<'js> FromJs<'js> for JsField {
    fn from_js(_ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        if let Some(n) = value.as_number() {
            return Ok(JsField(FieldValue::Number(n)));
        }
        if let Some(b) = value.as_bool() {
            return Ok(JsField(FieldValue::Flag(b)));
        }
        if let Some(s) = value.as_string() {
            return Ok(JsField(FieldValue::Text(s.to_string()?)));
        }
        Err(rquickjs::Error::new_from_js(
            value.type_name(),
            "component field",
        ))
    }
}

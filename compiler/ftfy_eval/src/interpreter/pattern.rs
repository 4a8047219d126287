//! Binding values to parameter and declaration patterns.
//!
//! Patterns nest to any depth: array patterns match by position, object
//! patterns by key, and `AssignmentPattern` supplies a default used when the
//! value is missing. Every name bound ends up directly in the target frame.

use ftfy_ir::{Node, NodeKind};

use super::Interpreter;
use crate::environment::Env;
use crate::errors::{cannot_destructure, unhandled_construct, ControlAction};
use crate::stack::GrowStack;
use crate::value::Value;

impl Interpreter {
    /// Bind `value` to `pattern` in `env`'s frame. `None` means missing: the
    /// default applies if there is one, otherwise the name binds null.
    pub(super) fn bind_pattern<'a>(
        &'a self,
        pattern: &'a Node,
        value: Option<Value>,
        env: &'a Env,
    ) -> GrowStack<'a, Result<(), ControlAction>> {
        GrowStack::new(async move {
            match &pattern.strip_observers().kind {
                NodeKind::Identifier { name } => {
                    env.define(name.clone(), value.unwrap_or(Value::Null));
                    Ok(())
                }
                NodeKind::AssignmentPattern { left, right } => {
                    let value = match value {
                        Some(value) => value,
                        None => self.eval(right, env).await?,
                    };
                    self.bind_pattern(left, Some(value), env).await
                }
                NodeKind::ArrayPattern { elements } => {
                    let items = match value {
                        Some(Value::Array(items)) => items.borrow().clone(),
                        other => return Err(destructure_error(other.as_ref())),
                    };
                    for (index, element) in elements.iter().enumerate() {
                        if let Some(element) = element {
                            self.bind_pattern(element, items.get(index).cloned(), env)
                                .await?;
                        }
                    }
                    Ok(())
                }
                NodeKind::ObjectPattern { properties } => {
                    let object = match value {
                        Some(object @ Value::Object(_)) => object,
                        other => return Err(destructure_error(other.as_ref())),
                    };
                    for property in properties {
                        let NodeKind::Property {
                            key,
                            value: target,
                            computed,
                            ..
                        } = &property.kind
                        else {
                            return Err(unhandled_construct(property.kind_name()).into());
                        };
                        let name = self.property_name(key, *computed, env).await?;
                        let found = match &object {
                            Value::Object(props) => props.borrow().get(&name).cloned(),
                            _ => None,
                        };
                        self.bind_pattern(target, found, env).await?;
                    }
                    Ok(())
                }
                _ => Err(unhandled_construct(&format!("{} as a binding target", pattern.kind_name())).into()),
            }
        })
    }
}

#[cold]
fn destructure_error(value: Option<&Value>) -> ControlAction {
    cannot_destructure(value.map_or("null", Value::type_name)).into()
}

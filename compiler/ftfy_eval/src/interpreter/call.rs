//! Calls: argument evaluation, closure invocation and macro call sites.

use std::rc::Rc;

use ftfy_ir::Node;
use tracing::debug;

use super::{natives, Args, EvalFuture, Interpreter};
use crate::environment::Env;
use crate::errors::{finish, not_callable, stack_overflow, ControlAction, EvalResult};
use crate::macros;
use crate::stack::GrowStack;
use crate::value::{Closure, ThisBinding, Value};

impl Interpreter {
    /// `callee(arguments)`. Macro callees receive the argument nodes
    /// instead of their values.
    pub(super) async fn eval_call(
        &self,
        call_site: &Node,
        callee: &Node,
        arguments: &[Node],
        env: &Env,
    ) -> EvalResult {
        let callee = self.eval(callee, env).await?;
        if let Value::Closure(closure) = &callee {
            if closure.function.is_macro() {
                return self.expand_macro(closure, arguments, env).await;
            }
        }
        let mut values = Args::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.eval(argument, env).await?);
        }
        self.invoke(callee, values, Some(call_site), env).await
    }

    /// Call any callable value.
    ///
    /// Natives get the call site for line reporting; quoted code runs in
    /// the caller's environment.
    pub(crate) fn invoke<'a>(
        &'a self,
        callee: Value,
        args: Args,
        call_site: Option<&'a Node>,
        env: &'a Env,
    ) -> EvalFuture<'a> {
        GrowStack::new(async move {
            match &callee {
                Value::Native(native) => natives::call(self, &native.kind, args, call_site, env).await,
                Value::Closure(closure) => self.call_closure(closure, args, env).await,
                Value::Code(code) => self.eval(&code.node, env).await,
                other => Err(not_callable(other.type_name()).into()),
            }
        })
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(name = closure.function.name(), depth = env.depth)
    )]
    async fn call_closure(&self, closure: &Closure, args: Args, env: &Env) -> EvalResult {
        if env.depth >= self.shared.max_call_depth {
            return Err(stack_overflow(self.shared.max_call_depth).into());
        }
        let this = match &closure.this {
            ThisBinding::Lexical(this) | ThisBinding::Bound(this) => this.clone(),
            ThisBinding::Dynamic => env.this.clone(),
        };
        let frame = env.call_frame(&closure.scope, this);
        let function = Rc::clone(&closure.function);

        let mut args = args.into_iter();
        for param in &function.params {
            self.bind_pattern(param, args.next(), &frame).await?;
        }

        // `return` ends the call; a stray `break` or `continue` must not
        // reach a loop in the caller.
        finish(self.eval(&function.body, &frame).await).map_err(ControlAction::from)
    }

    /// Expand a macro at its call site and evaluate the result in the
    /// caller's environment.
    async fn expand_macro(&self, closure: &Closure, arguments: &[Node], env: &Env) -> EvalResult {
        debug!(name = closure.function.name(), "expanding macro");
        let expanded = macros::expand(&closure.function, arguments, &self.shared.source);
        finish(self.eval(&expanded, env).await).map_err(ControlAction::from)
    }
}

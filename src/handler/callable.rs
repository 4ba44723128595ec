use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::InvocationError;

/// Identity of one registration, returned by every subscribe call.
///
/// Unsubscribing takes the id rather than the closure: two identical
/// closures registered twice are two distinct registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a handler is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Remove the handler as soon as it is selected for dispatch.
    pub once: bool,
    /// Run the handler on its own worker thread instead of the publisher's.
    pub is_async: bool,
    /// Serialize async invocations for the topic in scheduling order.
    pub transactional: bool,
}

impl SubscribeOptions {
    pub fn persistent() -> Self {
        Self::default()
    }

    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn asynchronous(transactional: bool) -> Self {
        Self {
            is_async: true,
            transactional,
            ..Self::default()
        }
    }

    pub fn once_async() -> Self {
        Self {
            once: true,
            is_async: true,
            transactional: false,
        }
    }
}

/// A function the bus can invoke with a published argument list.
///
/// Implemented for every `Fn(A1, .., An)` (n ≤ 8) with `Send + Sync` closures
/// whose parameters are `DeserializeOwned`. The `Args` type parameter only
/// distinguishes the arities; callers never name it.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Number of positional parameters the handler declares.
    fn arity(&self) -> usize;

    /// Decode `args` into the parameters and run the handler.
    fn call(&self, args: &[Value]) -> Result<(), InvocationError>;
}

macro_rules! count {
    () => (0usize);
    ($head:ident $($tail:ident)*) => (1usize + count!($($tail)*));
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) + Send + Sync + 'static,
            $($ty: DeserializeOwned,)*
        {
            fn arity(&self) -> usize {
                count!($($ty)*)
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: &[Value]) -> Result<(), InvocationError> {
                check_arity(count!($($ty)*), args)?;
                let mut index = 0usize;
                $(
                    let $ty: $ty = decode_arg(args, &mut index)?;
                )*
                (self)($($ty),*);
                Ok(())
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

fn check_arity(expected: usize, args: &[Value]) -> Result<(), InvocationError> {
    if args.len() != expected {
        return Err(InvocationError::Arity {
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn decode_arg<T>(args: &[Value], index: &mut usize) -> Result<T, InvocationError>
where
    T: DeserializeOwned,
{
    let position = *index;
    *index += 1;
    let value = args.get(position).ok_or(InvocationError::Arity {
        expected: position + 1,
        actual: args.len(),
    })?;
    <T as Deserialize>::deserialize(value).map_err(|e| InvocationError::Argument {
        index: position,
        message: e.to_string(),
    })
}

type Invoke = dyn Fn(&[Value]) -> Result<(), InvocationError> + Send + Sync;

/// A type-erased handler stored in the registry.
///
/// Cloning is cheap; all clones share the same underlying function.
#[derive(Clone)]
pub struct Callable {
    arity: Option<usize>,
    invoke: Arc<Invoke>,
}

impl Callable {
    /// Erase a typed handler.
    pub fn new<H, A>(handler: H) -> Self
    where
        H: Handler<A>,
    {
        let arity = handler.arity();
        Self {
            arity: Some(arity),
            invoke: Arc::new(move |args: &[Value]| handler.call(args)),
        }
    }

    /// Wrap a function that receives the raw argument list, whatever its length.
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self {
            arity: None,
            invoke: Arc::new(f),
        }
    }

    /// Declared parameter count, `None` for raw callables.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn invoke(&self, args: &[Value]) -> Result<(), InvocationError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

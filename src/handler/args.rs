use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered list of published arguments.
///
/// This is the same representation that travels over the wire inside a
/// [`ClientArg`](crate::net::ClientArg), so a forwarded event is re-published
/// value-for-value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for Args {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Conversion into an argument list for `publish`.
///
/// Implemented for tuples of serializable values (up to eight), for
/// `Vec<Value>` and for [`Args`] itself. Use `()` to publish with no arguments
/// and a one-element tuple `(x,)` for a single argument.
pub trait IntoArgs {
    fn into_args(self) -> Result<Args, serde_json::Error>;
}

impl IntoArgs for Args {
    fn into_args(self) -> Result<Args, serde_json::Error> {
        Ok(self)
    }
}

impl IntoArgs for Vec<Value> {
    fn into_args(self) -> Result<Args, serde_json::Error> {
        Ok(Args(self))
    }
}

macro_rules! impl_into_args {
    ($($ty:ident),*) => {
        impl<$($ty: Serialize,)*> IntoArgs for ($($ty,)*) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Result<Args, serde_json::Error> {
                let ($($ty,)*) = self;
                Ok(Args(vec![$(serde_json::to_value($ty)?),*]))
            }
        }
    };
}

impl_into_args!();
impl_into_args!(T1);
impl_into_args!(T1, T2);
impl_into_args!(T1, T2, T3);
impl_into_args!(T1, T2, T3, T4);
impl_into_args!(T1, T2, T3, T4, T5);
impl_into_args!(T1, T2, T3, T4, T5, T6);
impl_into_args!(T1, T2, T3, T4, T5, T6, T7);
impl_into_args!(T1, T2, T3, T4, T5, T6, T7, T8);

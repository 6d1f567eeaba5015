//! The API description macro.

/// Describe a request/response API once.
///
/// Every `Name(Args…) => Response` entry becomes a request struct inside
/// the given module, a variant of the request enum (which lives in the same
/// module and is re-exported next to it), and a [`Request`](crate::Request)
/// implementation tying the entry to its response type. The same
/// description drives the typed [`client::Client`](crate::client::Client)
/// and the matching [`server::Handler`](crate::server::Handler).
///
/// # Example
/// ```
/// use telegramm::define_api;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// pub struct Pong;
///
/// define_api! {
///     /// Requests understood by a level crossing.
///     mod crossing;
///     /// One of the crossing requests.
///     pub enum CrossingMessage {
///         /// Lower barrier number `n`; answers whether it moved.
///         Lower(u32) => bool,
///         /// Anyone there?
///         Ping => Pong,
///     }
/// }
///
/// # fn main() {}
/// ```
#[macro_export]
macro_rules! define_api {
    (
        $(#[$modmeta:meta])*
        mod $module:ident;

        $(#[$enummeta:meta])*
        $vis:vis enum $enum_name:ident {
            $($entries:tt)*
        }
    ) => {
        $(#[$modmeta])*
        $vis mod $module {
            use super::*;

            $crate::api_entries! {
                enum ($(#[$enummeta])*) $enum_name;
                variants []
                $($entries)*
            }
        }

        $vis use $module::$enum_name;
    };
}

// One muncher walks the entry list: each step emits the request struct and
// its impls, collecting the variant name; the terminal step emits the enum.
#[doc(hidden)]
#[macro_export]
macro_rules! api_entries {
    // A request with payload.
    (
        enum ($(#[$enummeta:meta])*) $enum_name:ident;
        variants [$($variant:ident)*]
        $(#[$doc:meta])*
        $name:ident($($arg:ty),*) => $response:ty,
        $($rest:tt)*
    ) => {
        $(#[$doc])*
        #[derive(Debug, Serialize, Deserialize)]
        pub struct $name($(pub $arg),*);

        $crate::api_entry_impl!($enum_name, $name, $response);

        $crate::api_entries! {
            enum ($(#[$enummeta])*) $enum_name;
            variants [$($variant)* $name]
            $($rest)*
        }
    };
    // A request without payload.
    (
        enum ($(#[$enummeta:meta])*) $enum_name:ident;
        variants [$($variant:ident)*]
        $(#[$doc:meta])*
        $name:ident => $response:ty,
        $($rest:tt)*
    ) => {
        $(#[$doc])*
        #[derive(Debug, Serialize, Deserialize)]
        pub struct $name;

        $crate::api_entry_impl!($enum_name, $name, $response);

        $crate::api_entries! {
            enum ($(#[$enummeta])*) $enum_name;
            variants [$($variant)* $name]
            $($rest)*
        }
    };
    // Every entry seen: emit the enum over the collected variants.
    (
        enum ($(#[$enummeta:meta])*) $enum_name:ident;
        variants [$($variant:ident)*]
    ) => {
        $(#[$enummeta])*
        #[derive(Debug, Serialize, Deserialize)]
        pub enum $enum_name {
            $(
                #[allow(missing_docs)]
                $variant($variant),
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! api_entry_impl {
    ($enum_name:ident, $name:ident, $response:ty) => {
        impl $crate::Request<$enum_name> for $name {
            type Response = $response;
        }

        impl From<$name> for $enum_name {
            fn from(request: $name) -> Self {
                Self::$name(request)
            }
        }
    };
}

//! Mimic core: a dynamic mock-object model.
//!
//! A [`Mock`] fabricates child mocks on attribute access, records every call
//! (on itself and, with dotted names, on its ancestors), answers calls from a
//! side effect or return value, and can be restricted by a [`Spec`]. The
//! [`patch`](patch()) family swaps attributes of registered modules or mocks
//! for the duration of a scope.
//!
//! ```
//! use mimic_core::{call, Mock};
//!
//! let json = Mock::new();
//! let loads = json.attr("loads").unwrap();
//! loads.call(call!("{}")).unwrap();
//!
//! loads.assert_called_once_with(&call!("{}")).unwrap();
//! assert_eq!(json.method_calls(), vec![call!("{}").on("loads")]);
//! ```

mod assertions;
pub mod call;
pub mod config;
pub mod error;
pub mod magic;
pub mod node;
pub mod patch;
pub mod record;
pub mod resolve;
pub mod spec;
pub mod value;

pub use call::Call;
pub use config::MockConfig;
pub use error::{Error, Exception, Result};
pub use magic::Flavor;
pub use node::{Mock, MockBuilder, WeakMock};
pub use patch::{patch, patch_object, Module, PatchGuard, Patchable, Patcher, SavedSlot};
pub use record::ResetOptions;
pub use resolve::{Effect, SideEffect};
pub use spec::{ClassSpec, Member, Param, ParamKind, Signature, Spec, SpecMode};
pub use value::{Function, Object, Value};

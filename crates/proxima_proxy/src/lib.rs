pub mod dispatch;
pub mod error;
pub mod forward;
pub mod locks;
pub mod sanitize;
pub mod target;
pub mod validation;

#[cfg(test)]
mod testing;

pub use dispatch::Dispatcher;
pub use error::ForwardError;
pub use forward::{ForwardSettings, Origin, TcpOrigin};
pub use locks::{KeyGuard, KeyLocks};
pub use sanitize::{HOP_BY_HOP, sanitize_request, sanitize_response, strip_hop_by_hop};
pub use target::{Target, origin_form, resolve_target};
pub use validation::{CacheValidator, Outcome, Validated};

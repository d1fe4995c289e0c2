//! Request admission and forwarding (§4.7, §4.8): the Gateway decides
//! whether a request stays local or goes to the cluster; the Dispatcher
//! picks a node, forwards the request, and retries on peer failure.

mod body;
mod candidate;
mod cursor;
mod dispatcher;
mod gateway;
mod headers;

pub use body::RequestBody;
pub use dispatcher::{Dispatcher, DispatcherConfig, ForwardedResponse, OutboundRequest};
pub use gateway::{Admission, Gateway, GatewayConfig, LocalBypassPaths};

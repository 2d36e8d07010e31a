mod dispatcher;
mod routes;

pub use dispatcher::{Completion, DispatchError, Dispatcher, ModeResult, RequestTicket};
pub use routes::{route, routes, AdapterCall, InputSurface, ModeRoute, OutputSurface};

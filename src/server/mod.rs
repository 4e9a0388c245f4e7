//! HTTP API and the monitoring socket.

mod extract;
pub mod guards;
pub mod router;
mod routes;
mod ws;

pub use extract::{ApiJson, ClientMeta};
pub use router::{PanelState, panel_router};

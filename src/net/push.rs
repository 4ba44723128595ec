//! Push endpoint: the subscriber side of the relay.

use std::sync::Arc;

use tracing::{debug, warn};

use super::wire::ClientArg;
use crate::bus::Bus;
use crate::handler::Args;

/// Receives forwarded events and re-publishes them on the local bus, so
/// ordinary handlers fire exactly as for a local publish.
pub struct PushEndpoint {
    bus: Arc<Bus>,
}

impl PushEndpoint {
    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    /// Re-publish a forwarded event.
    ///
    /// Always acknowledges: a local handler rejecting the arguments is logged
    /// but the event still counts as delivered. Takes no lock beyond the ones
    /// `publish` takes, so concurrent pushes are fine.
    pub fn push_event(&self, arg: ClientArg) -> bool {
        debug!(topic = %arg.topic, args = arg.args.len(), "event pushed");
        if let Err(e) = self.bus.publish(&arg.topic, Args::new(arg.args)) {
            warn!(topic = %arg.topic, error = %e, "local handler failed on pushed event");
        }
        true
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }
}

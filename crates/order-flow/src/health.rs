//! Liveness and readiness probes.

use event_bus::EventBus;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Ok,
    Unavailable,
}

impl ProbeStatus {
    pub fn http_code(&self) -> u16 {
        match *self {
            ProbeStatus::Ok => 200,
            ProbeStatus::Unavailable => 503,
        }
    }
}

#[derive(Clone)]
pub struct Health {
    bus: Arc<dyn EventBus>,
}

impl Health {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// The process is up; always OK.
    pub fn liveness(&self) -> ProbeStatus {
        ProbeStatus::Ok
    }

    /// OK once the bus finished initializing.
    pub fn readiness(&self) -> ProbeStatus {
        if self.bus.is_ready() {
            ProbeStatus::Ok
        } else {
            ProbeStatus::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::InMemoryBus;

    #[test]
    fn test_readiness_follows_bus() {
        let bus = InMemoryBus::new(1);
        let health = Health::new(Arc::new(bus.clone()));
        assert_eq!(health.readiness().http_code(), 200);

        bus.set_ready(false);
        assert_eq!(health.readiness(), ProbeStatus::Unavailable);
        assert_eq!(health.readiness().http_code(), 503);
        assert_eq!(health.liveness(), ProbeStatus::Ok);
    }
}

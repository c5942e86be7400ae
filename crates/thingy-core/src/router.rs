//! Routes raw notifications to the endpoint they belong to.

use std::collections::HashMap;

use uuid::Uuid;

use thingy_types::{Endpoint, ParseResult, Reading, codec};

use crate::transport::CharacteristicHandle;

/// Maps subscribed characteristics back to their endpoint and decodes
/// incoming values.
///
/// Routes live exactly as long as the handles they were attached for; the
/// session clears them on teardown.
#[derive(Debug, Default)]
pub struct NotificationRouter {
    routes: HashMap<Uuid, Endpoint>,
}

impl NotificationRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route notifications from `handle` to `endpoint`.
    ///
    /// Returns `false` if the endpoint is write-only and cannot notify.
    pub fn attach(&mut self, endpoint: Endpoint, handle: &CharacteristicHandle) -> bool {
        if !endpoint.direction().is_notify() {
            return false;
        }
        self.routes.insert(handle.uuid, endpoint);
        true
    }

    /// Endpoint routed for `characteristic`, if any.
    pub fn endpoint(&self, characteristic: &Uuid) -> Option<Endpoint> {
        self.routes.get(characteristic).copied()
    }

    /// Decode a notification. Returns `None` for characteristics with no
    /// route.
    pub fn route(&self, characteristic: &Uuid, value: &[u8]) -> Option<ParseResult<Reading>> {
        self.endpoint(characteristic)
            .map(|endpoint| codec::decode(endpoint, value))
    }

    /// Drop every route.
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Number of attached routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are attached.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use thingy_types::ParseError;

    use super::*;

    fn handle(endpoint: Endpoint) -> CharacteristicHandle {
        let address = endpoint.address();
        CharacteristicHandle {
            service: address.service,
            uuid: address.characteristic,
        }
    }

    #[test]
    fn test_route_decodes_attached_endpoint() {
        let mut router = NotificationRouter::new();
        let button = handle(Endpoint::Button);
        assert!(router.attach(Endpoint::Button, &button));

        let reading = router.route(&button.uuid, &[1]).unwrap().unwrap();
        assert_eq!(reading, Reading::Button(true));
    }

    #[test]
    fn test_route_unknown_characteristic() {
        let router = NotificationRouter::new();
        let temperature = handle(Endpoint::Temperature);
        assert!(router.route(&temperature.uuid, &[20, 5]).is_none());
    }

    #[test]
    fn test_route_reports_malformed_payload() {
        let mut router = NotificationRouter::new();
        let temperature = handle(Endpoint::Temperature);
        router.attach(Endpoint::Temperature, &temperature);

        let err = router.route(&temperature.uuid, &[20]).unwrap().unwrap_err();
        assert_eq!(err, ParseError::decode(Endpoint::Temperature, 2, 1));
    }

    #[test]
    fn test_write_only_endpoints_are_not_routed() {
        let mut router = NotificationRouter::new();
        assert!(!router.attach(Endpoint::Led, &handle(Endpoint::Led)));
        assert!(router.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut router = NotificationRouter::new();
        router.attach(Endpoint::Battery, &handle(Endpoint::Battery));
        router.attach(Endpoint::Accelerometer, &handle(Endpoint::Accelerometer));
        assert_eq!(router.len(), 2);

        router.clear();
        assert!(router.is_empty());
    }
}

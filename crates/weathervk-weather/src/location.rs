//! Device position source.
//!
//! A terminal has no platform location service, so the position comes from
//! configuration. A disabled source behaves like a denied permission.

use crate::types::{Coordinate, Location, LocationError};

/// Authorization state reported alongside a location update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// One location update as delivered to the controller
#[derive(Debug, Clone)]
pub struct LocationUpdate {
    pub permission: PermissionStatus,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationSource {
    enabled: bool,
    coordinate: Option<Coordinate>,
}

impl LocationSource {
    pub fn new(enabled: bool, coordinate: Option<Coordinate>) -> Self {
        Self {
            enabled,
            coordinate,
        }
    }

    pub fn fixed(coordinate: Coordinate) -> Self {
        Self::new(true, Some(coordinate))
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.enabled && self.coordinate.is_some()
    }

    pub fn get_current_location(&self) -> Result<Location, LocationError> {
        if !self.enabled {
            return Err(LocationError::PermissionDenied);
        }
        self.coordinate
            .map(Location::from)
            .ok_or(LocationError::ServiceUnavailable)
    }

    /// The single update the controller listens for
    pub fn current_update(&self) -> LocationUpdate {
        match self.get_current_location() {
            Ok(location) => LocationUpdate {
                permission: PermissionStatus::Authorized,
                location: Some(location),
            },
            Err(LocationError::PermissionDenied) => LocationUpdate {
                permission: PermissionStatus::Denied,
                location: None,
            },
            Err(e) => {
                tracing::warn!("Location unavailable: {}", e);
                LocationUpdate {
                    permission: PermissionStatus::Authorized,
                    location: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_disabled_source_is_denied() {
        let source = LocationSource::disabled();
        assert!(!source.is_available());
        assert!(matches!(
            source.get_current_location(),
            Err(LocationError::PermissionDenied)
        ));
        assert_eq!(source.current_update().permission, PermissionStatus::Denied);
    }

    #[test]
    fn test_enabled_without_coordinate_is_unavailable() {
        let source = LocationSource::new(true, None);
        assert!(matches!(
            source.get_current_location(),
            Err(LocationError::ServiceUnavailable)
        ));
        let update = source.current_update();
        assert!(update.permission.is_granted());
        assert!(update.location.is_none());
    }

    #[test]
    fn test_fixed_source() {
        let source = LocationSource::fixed(Coordinate::new(59.94, 30.31));
        let update = source.current_update();
        assert!(update.permission.is_granted());
        let loc = update.location.unwrap();
        assert_eq!(loc.coordinate(), Coordinate::new(59.94, 30.31));
        assert!(loc.city_name.is_none());
    }

    #[test]
    fn test_permission_states() {
        assert!(!PermissionStatus::NotDetermined.is_granted());
        assert!(!PermissionStatus::Restricted.is_granted());
        assert!(!PermissionStatus::Denied.is_granted());
        assert!(PermissionStatus::Authorized.is_granted());
    }
}

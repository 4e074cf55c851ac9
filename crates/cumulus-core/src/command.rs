//! Injection request and receipt types.

use crate::error::IngressError;

/// A position in the normalized unit cube `[0,1]³`.
///
/// `z` is altitude: `0.0` is the ground, `1.0` the top of the domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    /// East-west coordinate.
    pub x: f32,
    /// North-south coordinate.
    pub y: f32,
    /// Normalized altitude.
    pub z: f32,
}

impl Position {
    /// Create a position from raw coordinates. No clamping is applied.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Centre of the domain.
    pub const CENTER: Self = Self::new(0.5, 0.5, 0.5);

    /// Clamp every axis into `[0,1]`; a non-finite axis becomes `0.5`.
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_axis(self.x),
            y: clamp_axis(self.y),
            z: clamp_axis(self.z),
        }
    }
}

fn clamp_axis(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// A request to release seeding agent into the atmosphere.
///
/// Values are taken as given by the host and sanitized by the injection
/// manager; out-of-range input is clamped, never rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InjectionRequest {
    /// Release position.
    pub position: Position,
    /// Injection intensity, nominally in `[0,1]`.
    pub intensity: f32,
    /// Additional lift above the release altitude, in kilometres.
    pub lift_km: f32,
}

impl InjectionRequest {
    /// Build a request.
    pub const fn new(position: Position, intensity: f32, lift_km: f32) -> Self {
        Self {
            position,
            intensity,
            lift_km,
        }
    }
}

/// Outcome of an injection request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectionReceipt {
    /// Whether the injection was applied.
    pub accepted: bool,
    /// Resource cost of the request. Charged only when accepted.
    pub cost: u32,
    /// Resources remaining after the request was processed.
    pub resources_remaining: u32,
    /// Why the request was not applied, if it was not.
    pub reason: Option<IngressError>,
}

impl InjectionReceipt {
    /// A receipt for an accepted injection.
    pub fn accepted(cost: u32, resources_remaining: u32) -> Self {
        Self {
            accepted: true,
            cost,
            resources_remaining,
            reason: None,
        }
    }

    /// A receipt for a request that was not applied.
    ///
    /// `cost` is what the request would have been charged.
    pub fn rejected(reason: IngressError, cost: u32, resources_remaining: u32) -> Self {
        Self {
            accepted: false,
            cost,
            resources_remaining,
            reason: Some(reason),
        }
    }
}

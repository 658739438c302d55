/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// Earth gravitational constant (m^3 s-2), as broadcast in GPS ephemerides
pub const EARTH_GRAVITATION_MU_M3_S2: f64 = 3.986005E14;

/// Multipath residual (meters) above which a cycle slip is declared
pub const MULTIPATH_SLIP_THRESHOLD_M: f64 = 10.0;

/// Gap declared when a channel is silent for longer than this many
/// nominal sampling intervals.
pub const GAP_INTERVAL_FACTOR: f64 = 1.5;

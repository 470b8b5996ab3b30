/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Default initial variance of the position states (m²)
pub const VAR_POS_M2: f64 = 60.0 * 60.0;

/// Default initial variance of the receiver clock states (m²)
pub const VAR_CLK_M2: f64 = 60.0 * 60.0;

/// Default initial variance of the inter frequency biases (m²)
pub const VAR_IFB_M2: f64 = 30.0 * 30.0;

/// Default initial variance of the phase ambiguities (m²)
pub const VAR_BIAS_M2: f64 = 60.0 * 60.0;

/// Default initial variance of the inter system biases (m²)
pub const VAR_ISB_M2: f64 = 60.0 * 60.0;

/// Default initial variance of the slant ionosphere delays (m²)
pub const VAR_IONO_M2: f64 = 60.0 * 60.0;

/// Default initial variance of the zenith wet delay (m²)
pub const VAR_TROPO_M2: f64 = 0.5 * 0.5;

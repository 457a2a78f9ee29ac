//! Color math: temperature/tint conversions, chromatic adaptation, color
//! model conversions and slider mappings.

pub mod sliders;
pub mod space;
pub mod temperature;
pub mod white_balance;

pub use temperature::{
    Matrix3, invert_matrix, planckian_xy, rgb_multipliers_to_temperature_and_tint,
    temperature_and_tint_to_rgb_multipliers,
};

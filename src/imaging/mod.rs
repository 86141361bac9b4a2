//! Image enhancement operators, in pure Rust.
//!
//! | Operator | Primitive |
//! |---|---|
//! | **denoise_light** | bilateral filter (`imageproc`) |
//! | **denoise_strong** | non-local means (in-crate, rayon) |
//! | **sharpen_light / sharpen_medium** | unsharp mask over `gaussian_blur_f32` |
//! | **deblur / deblur_aggressive** | 3×3 cross kernel via `filter3x3`, mirrored borders |
//! | **gamma_increase / gamma_decrease** | 256-entry lookup table |
//! | **clahe** | tile CLAHE on L* of CIE Lab |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for parameter math (unit testable)
//! - **Parameters**: Strength ranges and derived filter settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The operator catalog, mapping operator types onto the backend

pub mod backend;
mod calculations;
mod clahe;
mod lab;
mod nlm;
pub mod operations;
pub mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{gamma_from_strength, gamma_lut};
pub(crate) use calculations::reflect_101;
pub use operations::apply_operation;
pub use rust_backend::RustBackend;

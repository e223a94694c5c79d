mod base;
mod wavelet;
mod denoising;

pub use base::*;
pub use wavelet::*;
pub use denoising::*;

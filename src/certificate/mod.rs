//! Certificate generation: template compositing, text layout, rendering and
//! the preview/delivery pipelines built on top of them.

pub mod compositor;
pub mod font;
pub mod layout;
pub mod pipeline;
pub mod renderer;

pub use compositor::composite;
pub use font::TrueTypeFace;
pub use pipeline::{deliver, preview, CertificateContext, DeliveryReport};

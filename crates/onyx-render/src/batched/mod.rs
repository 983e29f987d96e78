//! Instanced renderers, one per geometry family and stencil pass.
//!
//! | Family | Host storage | Draws |
//! |--------|--------------|-------|
//! | [`MeshRenderer`] | instances bucketed by batch index | one indexed draw per non-empty bucket |
//! | [`CircleRenderer`] | flat instance list | one 6-vertex quad draw for all instances |
//! | [`PolygonRenderer`] | instances plus fan-triangulated geometry | one indexed draw per polygon |

mod circle;
mod mesh;
mod polygon;
mod traits;

pub use circle::CircleRenderer;
pub use mesh::MeshRenderer;
pub use polygon::{PolygonRenderer, fan_indices};
pub use traits::GeometryRenderer;

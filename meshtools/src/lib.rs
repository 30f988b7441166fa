//! **MeshTools** is a library for processing indexed mesh data.
//!
//! Meshes are described by [`MeshData`]: a primitive, optional indices of a
//! runtime index type, and attributes laid out over a byte buffer as strided
//! views. Operations are provided as free functions over typed slices, over
//! type-erased [`StridedView`]s, and over whole meshes.
//!
//! - [`duplicate`] expands indexed data into non-indexed data.
//! - [`normal`] generates flat and smooth normals for triangle meshes.
//! - [`dedup`] removes exact and fuzzy duplicate vertices.
//! - [`interleave`] packs attributes into a single interleaved buffer.
//! - [`combine`] merges separately indexed and per-face attributes into a
//!   single indexed mesh.
//! - [`generate`] turns strips, loops, fans, and quads into plain indices.
//! - [`filter`] selects attributes of a mesh without copying its data.
//! - [`concatenate`] appends meshes into one.
//! - [`transform`] applies affine transformations to positions, directions,
//!   and texture coordinates.
//!
//! Please note that versions in the `0.0.*` series are experimental and
//! unstable! Use exact version constraints when specifying a dependency to
//! avoid spurious breakage.
//!
//! [`MeshData`]: crate::mesh::MeshData
//! [`StridedView`]: crate::view::StridedView

pub mod combine;
pub mod concatenate;
pub mod dedup;
pub mod duplicate;
pub mod filter;
pub mod generate;
pub mod index;
pub mod interleave;
pub mod mesh;
pub mod normal;
pub mod transform;
pub mod view;

pub mod prelude {
    //! Re-exports commonly used types and traits.
    //!
    //! The mesh types and their attribute descriptions are re-exported along
    //! with the `Index` trait, which is required to name typed index slices.

    pub use crate::index::{Index, IndexType, IndexView};
    pub use crate::mesh::attribute::{
        AttributeData, ComponentFormat, Extra, MeshAttribute, MeshAttributeData, VertexFormat,
    };
    pub use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive, MeshRole};
    pub use crate::view::{StridedView, StridedViewMut};
}

pub use crate::mesh::MeshError;

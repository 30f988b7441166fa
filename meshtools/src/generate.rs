//! Index generation.
//!
//! Strips, loops, and fans describe primitives implicitly through the order of
//! their vertices. The functions in this module produce equivalent index
//! buffers for plain lines and triangles, so that such meshes can be processed
//! like any other indexed mesh. Quads are split into pairs of triangles.
//!
//! Generated indices always have the type `u32`.
//!
//! # Examples
//!
//! ```rust
//! use meshtools::generate;
//!
//! assert_eq!(
//!     vec![0, 1, 2, 2, 1, 3, 2, 3, 4],
//!     generate::generate_triangle_strip_indices(5).unwrap()
//! );
//! ```

use nalgebra::Vector3;

use crate::index::Index;
use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive};

const SPLIT_ABC_ACD: [usize; 6] = [0, 1, 2, 0, 2, 3];
const SPLIT_DAB_DBC: [usize; 6] = [3, 0, 1, 3, 1, 2];

/// Gets the number of primitives formed by `count` elements.
///
/// # Errors
///
/// Returns an error if the primitive is implementation-specific.
pub fn primitive_count(primitive: MeshPrimitive, count: usize) -> Result<usize, MeshError> {
    match primitive {
        MeshPrimitive::Points
        | MeshPrimitive::Edges
        | MeshPrimitive::Faces
        | MeshPrimitive::Instances => Ok(count),
        MeshPrimitive::Lines => Ok(count / 2),
        MeshPrimitive::LineStrip => Ok(count.saturating_sub(1)),
        // A single element is a degenerate line, but it is still a line.
        MeshPrimitive::LineLoop => Ok(count),
        MeshPrimitive::Triangles => Ok(count / 3),
        MeshPrimitive::TriangleStrip | MeshPrimitive::TriangleFan => Ok(count.saturating_sub(2)),
        MeshPrimitive::ImplementationSpecific(_) => Err(MeshError::InvalidPrimitive { primitive }),
    }
}

pub fn generate_line_strip_indices(vertex_count: usize) -> Result<Vec<u32>, MeshError> {
    check_vertex_count(vertex_count, 2)?;
    let mut indices = vec![0; 2 * (vertex_count - 1)];
    generate_line_strip_indices_into(vertex_count, &mut indices)?;
    Ok(indices)
}

/// Generates the indices of the lines of a line strip into `indices`.
///
/// Each pair of consecutive vertices forms a line.
///
/// # Errors
///
/// Returns an error if there are fewer than two vertices or if `indices` does
/// not have exactly two indices per line.
pub fn generate_line_strip_indices_into(
    vertex_count: usize,
    indices: &mut [u32],
) -> Result<(), MeshError> {
    check_vertex_count(vertex_count, 2)?;
    check_output(2 * (vertex_count - 1), indices.len())?;
    for (line, indices) in indices.chunks_exact_mut(2).enumerate() {
        let line = line as u32;
        indices.copy_from_slice(&[line, line + 1]);
    }
    Ok(())
}

pub fn generate_line_loop_indices(vertex_count: usize) -> Result<Vec<u32>, MeshError> {
    check_vertex_count(vertex_count, 2)?;
    let mut indices = vec![0; 2 * vertex_count];
    generate_line_loop_indices_into(vertex_count, &mut indices)?;
    Ok(indices)
}

/// Generates the indices of the lines of a line loop into `indices`.
///
/// This is a line strip with an additional line from the last vertex back to
/// the first.
///
/// # Errors
///
/// Returns an error if there are fewer than two vertices or if `indices` does
/// not have exactly two indices per line.
pub fn generate_line_loop_indices_into(
    vertex_count: usize,
    indices: &mut [u32],
) -> Result<(), MeshError> {
    check_vertex_count(vertex_count, 2)?;
    check_output(2 * vertex_count, indices.len())?;
    let (strip, last) = indices.split_at_mut(2 * (vertex_count - 1));
    generate_line_strip_indices_into(vertex_count, strip)?;
    last.copy_from_slice(&[vertex_count as u32 - 1, 0]);
    Ok(())
}

pub fn generate_triangle_strip_indices(vertex_count: usize) -> Result<Vec<u32>, MeshError> {
    check_vertex_count(vertex_count, 3)?;
    let mut indices = vec![0; 3 * (vertex_count - 2)];
    generate_triangle_strip_indices_into(vertex_count, &mut indices)?;
    Ok(indices)
}

/// Generates the indices of the triangles of a triangle strip into `indices`.
///
/// Every odd triangle has its first two indices swapped, so that all triangles
/// share the winding of the first.
///
/// # Errors
///
/// Returns an error if there are fewer than three vertices or if `indices`
/// does not have exactly three indices per triangle.
pub fn generate_triangle_strip_indices_into(
    vertex_count: usize,
    indices: &mut [u32],
) -> Result<(), MeshError> {
    check_vertex_count(vertex_count, 3)?;
    check_output(3 * (vertex_count - 2), indices.len())?;
    for (triangle, indices) in indices.chunks_exact_mut(3).enumerate() {
        let i = triangle as u32;
        if triangle % 2 == 0 {
            indices.copy_from_slice(&[i, i + 1, i + 2]);
        }
        else {
            indices.copy_from_slice(&[i + 1, i, i + 2]);
        }
    }
    Ok(())
}

pub fn generate_triangle_fan_indices(vertex_count: usize) -> Result<Vec<u32>, MeshError> {
    check_vertex_count(vertex_count, 3)?;
    let mut indices = vec![0; 3 * (vertex_count - 2)];
    generate_triangle_fan_indices_into(vertex_count, &mut indices)?;
    Ok(indices)
}

/// Generates the indices of the triangles of a triangle fan into `indices`.
///
/// Every triangle shares the first vertex.
///
/// # Errors
///
/// Returns an error if there are fewer than three vertices or if `indices`
/// does not have exactly three indices per triangle.
pub fn generate_triangle_fan_indices_into(
    vertex_count: usize,
    indices: &mut [u32],
) -> Result<(), MeshError> {
    check_vertex_count(vertex_count, 3)?;
    check_output(3 * (vertex_count - 2), indices.len())?;
    for (triangle, indices) in indices.chunks_exact_mut(3).enumerate() {
        let i = triangle as u32;
        indices.copy_from_slice(&[0, i + 1, i + 2]);
    }
    Ok(())
}

/// Splits quads into triangles.
///
/// See [`generate_quad_indices_into`].
pub fn generate_quad_indices<I>(
    positions: &[Vector3<f32>],
    quads: &[I],
) -> Result<Vec<u32>, MeshError>
where
    I: Index,
{
    let quads = quads.iter().map(|index| index.into_u32()).collect::<Vec<_>>();
    let mut indices = vec![0u32; quads.len() / 4 * 6];
    generate_quad_indices_into(positions, &quads, &mut indices)?;
    Ok(indices)
}

/// Splits quads into triangles and writes their indices into `indices`.
///
/// Each quad `abcd` is split along one of its diagonals into either `abc acd`
/// or `dab dbc`. A split whose triangles face in opposite directions is
/// avoided. Otherwise the shorter diagonal is used, preferring `abc acd` when
/// both have the same length. This keeps convex quads convex and splits
/// concave and non-planar quads sensibly.
///
/// # Errors
///
/// Returns an error if the number of quad indices is not divisible by four, if
/// `indices` does not have six indices per quad, or if an index is out of
/// bounds for `positions`.
pub fn generate_quad_indices_into<I>(
    positions: &[Vector3<f32>],
    quads: &[I],
    indices: &mut [I],
) -> Result<(), MeshError>
where
    I: Index,
{
    if quads.len() % 4 != 0 {
        return Err(MeshError::QuadCountUnaligned { count: quads.len() });
    }
    check_output(quads.len() / 4 * 6, indices.len())?;
    for (quad, indices) in quads.chunks_exact(4).zip(indices.chunks_exact_mut(6)) {
        let mut corners = [Vector3::zeros(); 4];
        for (corner, index) in corners.iter_mut().zip(quad.iter()) {
            *corner = *positions
                .get(index.into_usize())
                .ok_or(MeshError::IndexOutOfBounds {
                    index: index.into_usize(),
                    len: positions.len(),
                })?;
        }
        for (index, corner) in indices.iter_mut().zip(split(&corners).iter()) {
            *index = quad[*corner];
        }
    }
    Ok(())
}

/// Generates indices for a strip, loop, or fan.
///
/// Line strips and loops become `Lines` and triangle strips and fans become
/// `Triangles`. Vertex data and attributes are copied as is.
///
/// # Errors
///
/// Returns an error if the mesh is already indexed, if its primitive is not a
/// strip, loop, or fan, or if it has too few vertices for its primitive.
pub fn generate_indices(mesh: &MeshData<'_>) -> Result<MeshData<'static>, MeshError> {
    if mesh.is_indexed() {
        return Err(MeshError::AlreadyIndexed);
    }
    let vertex_count = mesh.vertex_count();
    let (primitive, indices) = match mesh.primitive() {
        MeshPrimitive::LineStrip => (
            MeshPrimitive::Lines,
            generate_line_strip_indices(vertex_count)?,
        ),
        MeshPrimitive::LineLoop => (
            MeshPrimitive::Lines,
            generate_line_loop_indices(vertex_count)?,
        ),
        MeshPrimitive::TriangleStrip => (
            MeshPrimitive::Triangles,
            generate_triangle_strip_indices(vertex_count)?,
        ),
        MeshPrimitive::TriangleFan => (
            MeshPrimitive::Triangles,
            generate_triangle_fan_indices(vertex_count)?,
        ),
        primitive => return Err(MeshError::InvalidPrimitive { primitive }),
    };
    log::trace!(
        "generated {} indices for {:?} of {} vertices",
        indices.len(),
        mesh.primitive(),
        vertex_count
    );
    MeshData::new(
        primitive,
        Some(MeshIndexData::owned(indices)),
        mesh.vertex_data().to_vec(),
        mesh.attributes().to_vec(),
        vertex_count,
    )
}

fn split(corners: &[Vector3<f32>; 4]) -> &'static [usize; 6] {
    let [a, b, c, d] = *corners;
    let abc_acd_opposite = (c - b).cross(&(a - b)).dot(&(d - c).cross(&(a - c))) < 0.0;
    let dab_dbc_opposite = (d - b).cross(&(a - b)).dot(&(c - b).cross(&(d - b))) < 0.0;
    if abc_acd_opposite != dab_dbc_opposite {
        if abc_acd_opposite {
            &SPLIT_DAB_DBC
        }
        else {
            &SPLIT_ABC_ACD
        }
    }
    // Both splits face the same way, or both are folded.
    else if (b - d).norm_squared() < (c - a).norm_squared() {
        &SPLIT_DAB_DBC
    }
    else {
        &SPLIT_ABC_ACD
    }
}

fn check_vertex_count(count: usize, min: usize) -> Result<(), MeshError> {
    if count < min {
        Err(MeshError::TooFewVertices { min, count })
    }
    else if count > u32::MAX as usize {
        Err(MeshError::IndexTypeTooSmall { size: 4, count })
    }
    else {
        Ok(())
    }
}

fn check_output(expected: usize, actual: usize) -> Result<(), MeshError> {
    if expected != actual {
        Err(MeshError::SizeMismatch { expected, actual })
    }
    else {
        Ok(())
    }
}

//! Normal generation.
//!
//! Normals are generated from triangles with counter-clockwise winding.
//!
//! _Flat_ normals are constant across each triangle and are computed from
//! non-indexed positions. _Smooth_ normals are computed per vertex of an
//! indexed mesh by averaging the normals of all triangles that share the
//! vertex. Each triangle's contribution is weighted by its area and by its
//! interior angle at the vertex, so that the result does not depend on how a
//! surface is triangulated.
//!
//! Degenerate triangles do not cause errors. A triangle with an edge that
//! cannot be normalized (zero length or NaN) contributes no weight, but a NaN
//! position still propagates into the normals of the vertices of its own
//! triangles.
//!
//! # Examples
//!
//! ```rust
//! use meshtools::normal;
//! use nalgebra::Vector3;
//!
//! let positions = [
//!     Vector3::new(-1.0f32, 0.0, 0.0),
//!     Vector3::new(1.0, 0.0, 0.0),
//!     Vector3::new(0.0, 1.0, 0.0),
//! ];
//! let normals = normal::generate_smooth_normals(&[0u8, 1, 2][..], &positions).unwrap();
//!
//! assert_eq!(vec![Vector3::z(); 3], normals);
//! ```

use nalgebra::Vector3;
use std::f32::consts::PI;

use crate::index::IndexView;
use crate::mesh::MeshError;

/// Generates flat normals for non-indexed triangles.
///
/// # Errors
///
/// Returns an error if the number of positions is not divisible by three.
pub fn generate_flat_normals(positions: &[Vector3<f32>]) -> Result<Vec<Vector3<f32>>, MeshError> {
    let mut normals = vec![Vector3::zeros(); positions.len()];
    generate_flat_normals_into(positions, &mut normals)?;
    Ok(normals)
}

/// Generates flat normals into `normals`.
///
/// # Errors
///
/// Returns an error if the number of positions is not divisible by three or
/// if `normals` and `positions` differ in length.
pub fn generate_flat_normals_into(
    positions: &[Vector3<f32>],
    normals: &mut [Vector3<f32>],
) -> Result<(), MeshError> {
    if positions.len() % 3 != 0 {
        return Err(MeshError::PositionCountUnaligned {
            count: positions.len(),
        });
    }
    if normals.len() != positions.len() {
        return Err(MeshError::SizeMismatch {
            expected: positions.len(),
            actual: normals.len(),
        });
    }
    for (triangle, normals) in positions.chunks_exact(3).zip(normals.chunks_exact_mut(3)) {
        let normal = (triangle[2] - triangle[1])
            .cross(&(triangle[0] - triangle[1]))
            .normalize();
        normals.fill(normal);
    }
    Ok(())
}

/// Generates smooth normals for indexed triangles.
///
/// The output has one normal per position. A position that is only referenced
/// by degenerate triangles, or that is not referenced by any triangle while
/// others are, gets a NaN normal. Without indices all normals are zero.
///
/// # Errors
///
/// Returns an error if the number of indices is not divisible by three or if
/// an index is out of bounds for `positions`.
pub fn generate_smooth_normals<'i, I>(
    indices: I,
    positions: &[Vector3<f32>],
) -> Result<Vec<Vector3<f32>>, MeshError>
where
    I: Into<IndexView<'i>>,
{
    let mut normals = vec![Vector3::zeros(); positions.len()];
    generate_smooth_normals_into(indices, positions, &mut normals)?;
    Ok(normals)
}

/// Generates smooth normals into `normals`.
///
/// Adjacency and per-triangle data are kept in scratch buffers, so `normals` is
/// only written once the inputs have been validated. Without indices `normals`
/// is left untouched.
///
/// # Errors
///
/// Returns an error if the number of indices is not divisible by three, if
/// `normals` and `positions` differ in length, or if an index is out of bounds
/// for `positions`.
pub fn generate_smooth_normals_into<'i, I>(
    indices: I,
    positions: &[Vector3<f32>],
    normals: &mut [Vector3<f32>],
) -> Result<(), MeshError>
where
    I: Into<IndexView<'i>>,
{
    let indices = indices.into();
    if indices.len() % 3 != 0 {
        return Err(MeshError::IndexCountUnaligned {
            count: indices.len(),
        });
    }
    if normals.len() != positions.len() {
        return Err(MeshError::SizeMismatch {
            expected: positions.len(),
            actual: normals.len(),
        });
    }
    indices.check_bounds(positions.len())?;
    if indices.is_empty() {
        return Ok(());
    }
    log::trace!(
        "generating smooth normals for {} triangles with {:?} indices",
        indices.len() / 3,
        indices.index_type()
    );

    let indices = indices.to_vec();
    let adjacency = Adjacency::from_indices(&indices, positions.len());
    let triangles = indices
        .chunks_exact(3)
        .map(|triangle| {
            Triangle::new(
                positions[triangle[0] as usize],
                positions[triangle[1] as usize],
                positions[triangle[2] as usize],
            )
        })
        .collect::<Vec<_>>();

    for (vertex, normal) in normals.iter_mut().enumerate() {
        let mut sum = Vector3::zeros();
        for &triangle in adjacency.triangles(vertex) {
            let triangle = triangle as usize;
            let corners = &indices[triangle * 3..triangle * 3 + 3];
            let corner = corners
                .iter()
                .position(|index| *index as usize == vertex)
                .unwrap_or(2);
            let Triangle { cross, angles } = triangles[triangle];
            sum += cross * angles[corner];
        }
        *normal = sum.normalize();
    }
    Ok(())
}

/// Triangles adjacent to each vertex.
///
/// The triangles of all vertices are stored in one buffer. The triangles of
/// vertex `v` occupy `offsets[v]..offsets[v + 1]`, in ascending order. A
/// triangle that refers to a vertex more than once appears that many times.
struct Adjacency {
    offsets: Vec<u32>,
    triangles: Vec<u32>,
}

impl Adjacency {
    fn from_indices(indices: &[u32], vertex_count: usize) -> Self {
        let mut counts = vec![0u32; vertex_count];
        for index in indices.iter() {
            counts[*index as usize] += 1;
        }
        let mut offsets = Vec::with_capacity(vertex_count + 1);
        offsets.push(0u32);
        for count in counts.iter() {
            let last = offsets.last().copied().unwrap_or(0);
            offsets.push(last + count);
        }
        // Fill each bucket from its front by counting down the triangles that
        // remain to be placed.
        let mut triangles = vec![0u32; indices.len()];
        for (position, index) in indices.iter().enumerate() {
            let vertex = *index as usize;
            let remaining = counts[vertex];
            triangles[(offsets[vertex + 1] - remaining) as usize] = (position / 3) as u32;
            counts[vertex] -= 1;
        }
        Adjacency { offsets, triangles }
    }

    fn triangles(&self, vertex: usize) -> &[u32] {
        let start = self.offsets[vertex] as usize;
        let end = self.offsets[vertex + 1] as usize;
        &self.triangles[start..end]
    }
}

#[derive(Clone, Copy)]
struct Triangle {
    /// Unnormalized normal. Its length is twice the area of the triangle.
    cross: Vector3<f32>,
    /// Interior angles at each corner.
    angles: [f32; 3],
}

impl Triangle {
    fn new(v0: Vector3<f32>, v1: Vector3<f32>, v2: Vector3<f32>) -> Self {
        let cross = (v2 - v1).cross(&(v0 - v1));
        let v10 = (v1 - v0).normalize();
        let v20 = (v2 - v0).normalize();
        let v21 = (v2 - v1).normalize();
        let angles = if v10.iter().chain(v20.iter()).chain(v21.iter()).any(|x| x.is_nan()) {
            [0.0; 3]
        }
        else {
            let a0 = angle(&v10, &v20);
            let a1 = angle(&-v10, &v21);
            [a0, a1, PI - a0 - a1]
        };
        Triangle { cross, angles }
    }
}

// Angle between normalized vectors.
fn angle(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

//! Expansion of indexed data into non-indexed data.
//!
//! Duplication copies `data[indices[i]]` into the `i`th output element, so that
//! the output can be drawn without an index buffer. Elements are copied as
//! bytes and are never interpreted.
//!
//! # Examples
//!
//! ```rust
//! use meshtools::duplicate;
//!
//! let indices = [1u8, 1, 0, 3, 2, 2];
//! let data = [-7i32, 35, 12, -18];
//!
//! assert_eq!(
//!     vec![35, 35, -7, -18, 12, 12],
//!     duplicate::duplicate(&indices[..], &data).unwrap()
//! );
//! ```

use crate::index::IndexView;
use crate::interleave;
use crate::mesh::attribute::Extra;
use crate::mesh::{MeshData, MeshError};
use crate::view::{StridedView, StridedViewMut};
use bytemuck::Pod;

/// Duplicates typed data.
///
/// # Errors
///
/// Returns an error if an index is out of bounds for `data`.
pub fn duplicate<'i, I, T>(indices: I, data: &[T]) -> Result<Vec<T>, MeshError>
where
    I: Into<IndexView<'i>>,
    T: Pod,
{
    let indices = indices.into();
    indices.check_bounds(data.len())?;
    Ok(indices.iter().map(|index| data[index as usize]).collect())
}

/// Duplicates type-erased data, returning the bytes of the output elements.
///
/// # Errors
///
/// Returns an error if an index is out of bounds for `data`.
pub fn duplicate_erased<'i, I>(indices: I, data: StridedView<'_>) -> Result<Vec<u8>, MeshError>
where
    I: Into<IndexView<'i>>,
{
    let indices = indices.into();
    let size = data.element_size();
    let mut output = vec![0u8; indices.len() * size];
    let target = StridedViewMut::new(&mut output, 0, indices.len(), size, size)?;
    duplicate_into(indices, data, target)?;
    Ok(output)
}

/// Duplicates type-erased data into `output`.
///
/// Nothing is written if an error is returned.
///
/// # Errors
///
/// Returns an error if `output` does not have one element per index, if its
/// element size differs from `data`, or if an index is out of bounds for
/// `data`.
pub fn duplicate_into<'i, I>(
    indices: I,
    data: StridedView<'_>,
    mut output: StridedViewMut<'_>,
) -> Result<(), MeshError>
where
    I: Into<IndexView<'i>>,
{
    let indices = indices.into();
    if output.len() != indices.len() {
        return Err(MeshError::SizeMismatch {
            expected: indices.len(),
            actual: output.len(),
        });
    }
    if output.element_size() != data.element_size() {
        return Err(MeshError::SizeMismatch {
            expected: data.element_size(),
            actual: output.element_size(),
        });
    }
    indices.check_bounds(data.len())?;
    for (position, index) in indices.iter().enumerate() {
        output
            .get_mut(position)
            .copy_from_slice(data.get(index as usize));
    }
    Ok(())
}

/// Duplicates every attribute of an indexed mesh and appends `extra`.
///
/// The output is interleaved, not indexed, and has one vertex per index of
/// `mesh`. Extras are indexed like the attributes of `mesh`, so extras with
/// data must have one element per vertex of `mesh`. Empty extras are left
/// zeroed.
///
/// # Errors
///
/// Returns an error if `mesh` is not indexed, if an extra is offset-only, or if
/// an extra has a different number of elements than `mesh` has vertices.
pub fn duplicate_mesh(
    mesh: &MeshData<'_>,
    extra: &[Extra<'_>],
) -> Result<MeshData<'static>, MeshError> {
    let indices = mesh.indices()?;
    interleave::check_extra(mesh.vertex_count(), extra)?;
    let mut output = interleave::interleaved_layout(mesh, indices.len(), extra)?;
    match interleave::interleaved_data(mesh) {
        Ok(source) => {
            let stride = output
                .attributes()
                .first()
                .map_or(0, |attribute| attribute.stride);
            let target = StridedViewMut::new(
                output.vertex_data_mut(),
                0,
                indices.len(),
                stride,
                source.element_size(),
            )?;
            duplicate_into(indices, source, target)?;
        }
        Err(MeshError::NotInterleaved) => {
            for id in 0..mesh.attribute_count() {
                duplicate_into(indices, mesh.attribute_view(id)?, output.attribute_view_mut(id)?)?;
            }
        }
        Err(error) => return Err(error),
    }
    let attributes = extra.iter().filter_map(|extra| match *extra {
        Extra::Attribute(ref attribute) => Some(attribute),
        Extra::Padding(_) => None,
    });
    for (id, attribute) in attributes.enumerate() {
        if let Some(view) = attribute.view() {
            duplicate_into(
                indices,
                view,
                output.attribute_view_mut(mesh.attribute_count() + id)?,
            )?;
        }
    }
    Ok(output)
}

//! Attribute filtering.
//!
//! Filtering selects a subset of the attributes of a mesh without copying any
//! data: the filtered mesh borrows the index and vertex buffers of the
//! original, including indices of an implementation-specific type.
//! Attributes keep their order, offsets, and strides.

use crate::mesh::attribute::{MeshAttribute, MeshAttributeData};
use crate::mesh::{MeshData, MeshError};

/// Keeps only the attributes named in `names`.
///
/// Every attribute with a matching name is kept. Names that no attribute has
/// are ignored.
///
/// # Examples
///
/// ```rust
/// use meshtools::filter;
/// use meshtools::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
/// use meshtools::mesh::{MeshData, MeshPrimitive};
///
/// let format = VertexFormat::Vector2(ComponentFormat::F32);
/// let mesh = MeshData::new(
///     MeshPrimitive::Points,
///     None,
///     vec![0u8; 32],
///     vec![
///         MeshAttributeData::new(MeshAttribute::Position, format, 0, 16),
///         MeshAttributeData::new(MeshAttribute::TextureCoordinates, format, 8, 16),
///     ],
///     2,
/// )
/// .unwrap();
/// let filtered = filter::filter_only_attributes(&mesh, &[MeshAttribute::TextureCoordinates]);
///
/// assert_eq!(1, filtered.attribute_count());
/// assert_eq!(8, filtered.attribute(0).offset);
/// ```
pub fn filter_only_attributes<'m>(
    mesh: &'m MeshData<'_>,
    names: &[MeshAttribute],
) -> MeshData<'m> {
    filter(mesh, |_, attribute| names.contains(&attribute.name))
}

/// Keeps only the attributes at the positions in `ids`.
///
/// Positions may repeat, but each attribute is kept at most once.
///
/// # Errors
///
/// Returns an error if a position is out of range.
pub fn filter_only_attribute_ids<'m>(
    mesh: &'m MeshData<'_>,
    ids: &[usize],
) -> Result<MeshData<'m>, MeshError> {
    let mask = mask(mesh, ids)?;
    Ok(filter(mesh, |id, _| mask[id]))
}

/// Removes the attributes named in `names`.
///
/// Names that no attribute has are ignored.
pub fn filter_except_attributes<'m>(
    mesh: &'m MeshData<'_>,
    names: &[MeshAttribute],
) -> MeshData<'m> {
    filter(mesh, |_, attribute| !names.contains(&attribute.name))
}

/// Removes the attributes at the positions in `ids`.
///
/// # Errors
///
/// Returns an error if a position is out of range.
pub fn filter_except_attribute_ids<'m>(
    mesh: &'m MeshData<'_>,
    ids: &[usize],
) -> Result<MeshData<'m>, MeshError> {
    let mask = mask(mesh, ids)?;
    Ok(filter(mesh, |id, _| !mask[id]))
}

fn filter<'m, F>(mesh: &'m MeshData<'_>, mut f: F) -> MeshData<'m>
where
    F: FnMut(usize, &MeshAttributeData) -> bool,
{
    let attributes = mesh
        .attributes()
        .iter()
        .enumerate()
        .filter(|(id, attribute)| f(*id, *attribute))
        .map(|(_, attribute)| *attribute)
        .collect();
    mesh.with_attributes(attributes)
}

fn mask(mesh: &MeshData<'_>, ids: &[usize]) -> Result<Vec<bool>, MeshError> {
    let count = mesh.attribute_count();
    let mut mask = vec![false; count];
    for &index in ids {
        *mask
            .get_mut(index)
            .ok_or(MeshError::AttributeIdOutOfRange { index, count })? = true;
    }
    Ok(mask)
}

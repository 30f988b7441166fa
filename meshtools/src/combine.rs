//! Combination of separately indexed attributes.
//!
//! Some sources index each attribute separately, for example a position index
//! and a normal index per corner. Combining such meshes produces one mesh with
//! a single index buffer: two corners share an output vertex exactly when all
//! of their per-mesh indices are equal.
//!
//! Per-face attributes are combined the same way by first expanding them into
//! one index per corner of each triangle.

use itertools::izip;
use smallvec::SmallVec;

use crate::dedup;
use crate::duplicate;
use crate::index::IndexView;
use crate::interleave;
use crate::mesh::attribute::{AttributeData, AttributeSource, Extra};
use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive, MeshRole};
use crate::view::{StridedView, StridedViewMut};

/// Offset and size of each mesh's index within a combined index row.
type Fields = SmallVec<[(usize, usize); 4]>;

/// Combines meshes with separate index buffers into one indexed mesh.
///
/// All meshes must be indexed with the same primitive and index count. The
/// output contains the attributes of all meshes in order, is interleaved, and
/// has `u32` indices.
///
/// # Errors
///
/// Returns an error if no meshes are given, if a mesh is not indexed or has an
/// implementation-specific index type, if primitives or index counts differ,
/// or if an attribute has an implementation-specific format.
///
/// # Examples
///
/// Combining positions and normals with separate indices:
///
/// ```rust
/// use meshtools::combine;
/// use meshtools::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
/// use meshtools::mesh::{MeshData, MeshIndexData, MeshPrimitive};
///
/// let positions = [0.0f32, 1.0, 2.0];
/// let normals = [-1.0f32, 1.0];
/// let position_indices = [0u8, 1, 2, 0, 2, 1];
/// let normal_indices = [0u8, 0, 0, 0, 0, 1];
/// let attribute = |name| {
///     vec![MeshAttributeData::new(name, VertexFormat::Scalar(ComponentFormat::F32), 0, 4)]
/// };
/// let positions = MeshData::new(
///     MeshPrimitive::Triangles,
///     Some(MeshIndexData::borrowed(&position_indices)),
///     bytemuck::cast_slice::<_, u8>(&positions),
///     attribute(MeshAttribute::Position),
///     3,
/// )
/// .unwrap();
/// let normals = MeshData::new(
///     MeshPrimitive::Triangles,
///     Some(MeshIndexData::borrowed(&normal_indices)),
///     bytemuck::cast_slice::<_, u8>(&normals),
///     attribute(MeshAttribute::Normal),
///     2,
/// )
/// .unwrap();
/// let mesh = combine::combine_indexed_attributes(&[&positions, &normals]).unwrap();
///
/// assert_eq!(vec![0, 1, 2, 0, 2, 3], mesh.indices().unwrap().to_vec());
/// assert_eq!(4, mesh.vertex_count());
/// ```
pub fn combine_indexed_attributes(
    meshes: &[&MeshData<'_>],
) -> Result<MeshData<'static>, MeshError> {
    let first = meshes.first().ok_or(MeshError::NoMeshes)?;
    let mut views = SmallVec::<[IndexView<'_>; 4]>::with_capacity(meshes.len());
    for (id, mesh) in meshes.iter().enumerate() {
        let indices = mesh
            .index_data()
            .ok_or(MeshError::NotIndexed {
                mesh: MeshRole::Data(id),
            })?
            .view()
            .map_err(|error| error.for_mesh(MeshRole::Data(id)))?;
        if mesh.primitive() != first.primitive() {
            return Err(MeshError::PrimitiveMismatch {
                mesh: id,
                expected: first.primitive(),
                actual: mesh.primitive(),
            });
        }
        if indices.len() != first.index_count() {
            return Err(MeshError::IndexCountMismatch {
                mesh: id,
                expected: first.index_count(),
                actual: indices.len(),
            });
        }
        views.push(indices);
    }
    check_formats(meshes)?;

    let count = first.index_count();
    let mut fields = Fields::with_capacity(views.len());
    let mut width = 0;
    for indices in views.iter() {
        let size = indices.as_bytes().element_size();
        fields.push((width, size));
        width += size;
    }
    let mut rows = vec![0u8; count * width];
    for (indices, &(offset, size)) in izip!(views.iter(), fields.iter()) {
        let indices = indices.as_bytes();
        for (position, row) in rows.chunks_exact_mut(width).enumerate() {
            row[offset..offset + size].copy_from_slice(indices.get(position));
        }
    }
    combine(first.primitive(), meshes, rows, &fields, width, count)
}

/// Combines per-face attributes into an indexed triangle mesh.
///
/// `faces` has the `Faces` primitive and one entry per triangle of `mesh`,
/// either as vertices or as indices. Non-indexed faces must be interleaved and
/// are deduplicated exactly before they are combined. Indexed faces are used as
/// is and their indices are expected to refer to unique entries; duplicate
/// entries are not merged.
///
/// The output has the index count of `mesh` and one vertex for each unique
/// pairing of a vertex and a face entry.
///
/// # Errors
///
/// Returns an error if `mesh` is not indexed, if the primitives are not
/// `Triangles` and `Faces`, if an index type or attribute format is
/// implementation-specific, if the face count does not match the triangle
/// count, or if non-indexed faces are not interleaved.
pub fn combine_face_attributes(
    mesh: &MeshData<'_>,
    faces: &MeshData<'_>,
) -> Result<MeshData<'static>, MeshError> {
    let indices = mesh.index_data().ok_or(MeshError::NotIndexed {
        mesh: MeshRole::Vertex,
    })?;
    if mesh.primitive() != MeshPrimitive::Triangles || faces.primitive() != MeshPrimitive::Faces {
        return Err(MeshError::UnexpectedPrimitives {
            mesh: mesh.primitive(),
            faces: faces.primitive(),
        });
    }
    let face_indices = match faces.index_data() {
        Some(face_indices) => Some(
            face_indices
                .view()
                .map_err(|error| error.for_mesh(MeshRole::Face))?,
        ),
        _ => None,
    };
    let indices = indices
        .view()
        .map_err(|error| error.for_mesh(MeshRole::Vertex))?;
    if faces.element_count() * 3 != indices.len() {
        return Err(MeshError::FaceCountMismatch {
            expected: indices.len() / 3,
            actual: faces.element_count(),
            indices: indices.len(),
        });
    }
    check_formats(&[mesh, faces])?;

    // Faces are deduplicated into `u32` indices unless they are already
    // indexed.
    let unique = match face_indices {
        Some(_) => Vec::new(),
        _ => {
            let data = interleave::interleaved_data(faces).map_err(|error| match error {
                MeshError::NotInterleaved => MeshError::FaceAttributesNotInterleaved,
                error => error,
            })?;
            dedup::remove_duplicates(data).0
        }
    };
    let face_size = face_indices.map_or(4, |face_indices| face_indices.as_bytes().element_size());
    let size = indices.as_bytes().element_size();
    let width = size + face_size;
    let count = indices.len();
    let mut rows = vec![0u8; count * width];
    for (position, row) in rows.chunks_exact_mut(width).enumerate() {
        row[..size].copy_from_slice(indices.as_bytes().get(position));
        let face = position / 3;
        match face_indices {
            Some(face_indices) => {
                row[size..].copy_from_slice(face_indices.as_bytes().get(face));
            }
            _ => {
                row[size..].copy_from_slice(bytemuck::bytes_of(&unique[face]));
            }
        }
    }
    let fields: Fields = [(0, size), (size, face_size)].into_iter().collect();
    combine(mesh.primitive(), &[mesh, faces], rows, &fields, width, count)
}

/// Combines per-face attributes given as attribute data into an indexed
/// triangle mesh.
///
/// The attributes are interleaved into a `Faces` mesh. See
/// [`combine_face_attributes`].
///
/// # Errors
///
/// Returns an error if an attribute is offset-only or the attributes have
/// differing lengths. See also [`combine_face_attributes`].
pub fn combine_face_attributes_with(
    mesh: &MeshData<'_>,
    attributes: &[AttributeData<'_>],
) -> Result<MeshData<'static>, MeshError> {
    if let Some(attribute) = attributes.iter().position(AttributeData::is_offset_only) {
        return Err(MeshError::FaceOffsetOnly { attribute });
    }
    let extra = attributes
        .iter()
        .copied()
        .map(Extra::Attribute)
        .collect::<Vec<_>>();
    let count = attributes
        .iter()
        .find_map(AttributeData::view)
        .map_or(0, |view| view.len());
    interleave::check_extra(count, &extra)?;
    let empty = MeshData::new(MeshPrimitive::Faces, None, Vec::<u8>::new(), vec![], 0)?;
    let mut faces = interleave::interleaved_layout(&empty, count, &extra)?;
    interleave::copy_extra(&mut faces, 0, &extra)?;
    combine_face_attributes(mesh, &faces)
}

fn check_formats(meshes: &[&MeshData<'_>]) -> Result<(), MeshError> {
    for (id, mesh) in meshes.iter().enumerate() {
        for (attribute, data) in mesh.attributes().iter().enumerate() {
            if let Some(format) = data.format.implementation_specific_code() {
                return Err(MeshError::ImplementationSpecificFormat {
                    attribute,
                    mesh: id,
                    format,
                });
            }
        }
    }
    Ok(())
}

/// Deduplicates combined index rows and duplicates the attributes of each mesh
/// through its field of the unique rows.
fn combine(
    primitive: MeshPrimitive,
    meshes: &[&MeshData<'_>],
    mut rows: Vec<u8>,
    fields: &[(usize, usize)],
    width: usize,
    count: usize,
) -> Result<MeshData<'static>, MeshError> {
    let (remapping, len) =
        dedup::remove_duplicates_in_place(StridedViewMut::new(&mut rows, 0, count, width, width)?);
    log::debug!(
        "combined {} index rows of {} meshes into {} vertices",
        count,
        meshes.len(),
        len
    );

    let extra = meshes
        .iter()
        .flat_map(|mesh| mesh.attributes().iter())
        .map(|attribute| {
            Extra::Attribute(AttributeData {
                name: attribute.name,
                format: attribute.format,
                array_size: attribute.array_size,
                source: AttributeSource::Empty,
            })
        })
        .collect::<Vec<_>>();
    let empty = MeshData::new(primitive, None, Vec::<u8>::new(), vec![], 0)?;
    let mut output = interleave::interleaved_layout(&empty, len, &extra)?;

    let unique = StridedView::new(&rows, 0, len, width, width)?;
    let mut id = 0;
    for (mesh, &(offset, size)) in izip!(meshes, fields) {
        let indices = IndexView::erased(unique.field(offset, size)?)?;
        for attribute in 0..mesh.attribute_count() {
            duplicate::duplicate_into(
                indices,
                mesh.attribute_view(attribute)?,
                output.attribute_view_mut(id)?,
            )?;
            id += 1;
        }
    }
    let (primitive, _, vertex_data, attributes, _) = output.into_parts();
    MeshData::new(
        primitive,
        Some(MeshIndexData::owned(remapping)),
        vertex_data,
        attributes,
        len,
    )
}

//! Mesh concatenation.
//!
//! Concatenation appends the vertices and indices of several meshes into one
//! mesh with the attribute layout of the first. The attributes of the other
//! meshes are matched to the layout by name and by their order among
//! attributes of the same name, so the second set of texture coordinates of a
//! mesh is copied into the second set of texture coordinates of the output.
//! Attributes that are missing from the layout are ignored and attributes
//! that a mesh lacks are left zeroed.

use crate::interleave;
use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive, MeshRole};

/// Concatenates meshes into one mesh.
///
/// All meshes must have the same primitive, which may not be a strip, loop, or
/// fan. The output is interleaved: if the first mesh is interleaved its layout
/// is kept, and otherwise its attributes are packed. If any mesh is indexed,
/// the output has `u32` indices and the vertices of non-indexed meshes are
/// indexed in order.
///
/// # Errors
///
/// Returns an error if no meshes are given, if a primitive is unsupported or
/// differs from the first, if an index type or an attribute format of the
/// first mesh is implementation-specific, or if a matched attribute has a
/// different format or array size than in the first mesh.
///
/// # Examples
///
/// ```rust
/// use meshtools::concatenate;
/// use meshtools::mesh::{MeshData, MeshIndexData, MeshPrimitive};
///
/// let indices = [1u8, 0];
/// let a = MeshData::new(
///     MeshPrimitive::Points,
///     Some(MeshIndexData::borrowed(&indices)),
///     Vec::<u8>::new(),
///     vec![],
///     2,
/// )
/// .unwrap();
/// let b = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 3).unwrap();
/// let mesh = concatenate::concatenate(&[&a, &b]).unwrap();
///
/// assert_eq!(5, mesh.vertex_count());
/// assert_eq!(vec![1, 0, 2, 3, 4], mesh.indices().unwrap().to_vec());
/// ```
pub fn concatenate(meshes: &[&MeshData<'_>]) -> Result<MeshData<'static>, MeshError> {
    let first = meshes.first().ok_or(MeshError::NoMeshes)?;
    let mut targets = Vec::with_capacity(meshes.len());
    for (id, mesh) in meshes.iter().enumerate() {
        check_primitive(id, first.primitive(), mesh.primitive())?;
        if let Some(indices) = mesh.index_data() {
            indices
                .view()
                .map_err(|error| error.for_mesh(MeshRole::Data(id)))?;
        }
        targets.push(match_attributes(first, id, mesh)?);
    }

    let vertex_count = meshes.iter().map(|mesh| mesh.vertex_count()).sum::<usize>();
    if meshes.iter().any(|mesh| mesh.is_indexed()) && vertex_count > u32::MAX as usize {
        return Err(MeshError::IndexTypeTooSmall {
            size: 4,
            count: vertex_count,
        });
    }
    let mut output = interleave::interleaved_layout(first, vertex_count, &[])?;
    let mut indices = meshes
        .iter()
        .any(|mesh| mesh.is_indexed())
        .then(|| Vec::with_capacity(meshes.iter().map(|mesh| mesh.element_count()).sum()));
    let mut offset = 0;
    for (mesh, targets) in meshes.iter().zip(targets.iter()) {
        let count = mesh.vertex_count();
        for (id, target) in targets.iter().enumerate() {
            if let Some(target) = *target {
                output
                    .attribute_view_mut(target)?
                    .slice(offset..offset + count)
                    .copy_from(&mesh.attribute_view(id)?)?;
            }
        }
        if let Some(indices) = indices.as_mut() {
            let base = offset as u32;
            match mesh.index_data() {
                Some(data) => indices.extend(data.view()?.iter().map(|index| base + index)),
                _ => indices.extend(base..base + count as u32),
            }
        }
        offset += count;
    }
    log::debug!(
        "concatenated {} meshes into {} vertices",
        meshes.len(),
        vertex_count
    );

    let (primitive, _, vertex_data, attributes, vertex_count) = output.into_parts();
    MeshData::new(
        primitive,
        indices.map(MeshIndexData::owned),
        vertex_data,
        attributes,
        vertex_count,
    )
}

fn check_primitive(
    mesh: usize,
    expected: MeshPrimitive,
    actual: MeshPrimitive,
) -> Result<(), MeshError> {
    match actual {
        MeshPrimitive::LineStrip
        | MeshPrimitive::LineLoop
        | MeshPrimitive::TriangleStrip
        | MeshPrimitive::TriangleFan => Err(MeshError::UnsupportedPrimitive { primitive: actual }),
        _ if actual != expected => Err(MeshError::InconsistentPrimitive {
            mesh,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Gets the attribute of `first` that each attribute of `mesh` is copied into.
fn match_attributes(
    first: &MeshData<'_>,
    id: usize,
    mesh: &MeshData<'_>,
) -> Result<Vec<Option<usize>>, MeshError> {
    let mut targets = Vec::with_capacity(mesh.attribute_count());
    for (position, attribute) in mesh.attributes().iter().enumerate() {
        let occurrence = mesh.attributes()[..position]
            .iter()
            .filter(|other| other.name == attribute.name)
            .count();
        let target = first.find_attribute_id(attribute.name, occurrence);
        if let Some(target) = target {
            let expected = first.attribute(target);
            if expected.format != attribute.format {
                return Err(MeshError::InconsistentFormat {
                    attribute: target,
                    name: attribute.name,
                    expected: expected.format,
                    actual: attribute.format,
                    mesh: id,
                    mesh_attribute: position,
                });
            }
            if expected.array_size != attribute.array_size {
                return Err(MeshError::InconsistentArraySize {
                    attribute: target,
                    name: attribute.name,
                    expected: expected.array_size,
                    actual: attribute.array_size,
                    mesh: id,
                    mesh_attribute: position,
                });
            }
        }
        targets.push(target);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use nalgebra::{Vector2, Vector3};

    use crate::concatenate;
    use crate::index::IndexType;
    use crate::interleave;
    use crate::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
    use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive};

    fn vector2() -> VertexFormat {
        VertexFormat::Vector2(ComponentFormat::F32)
    }

    fn vector3() -> VertexFormat {
        VertexFormat::Vector3(ComponentFormat::F32)
    }

    fn bytes<T>(items: &[T]) -> Vec<u8>
    where
        T: bytemuck::Pod,
    {
        bytemuck::cast_slice(items).to_vec()
    }

    #[test]
    fn concatenate_matching_attributes() {
        // Interleaved coordinates, a four-byte gap, and positions. The layout
        // and the gap are kept.
        let mut a_data = Vec::new();
        for (uv, position) in [
            (Vector2::new(0.1f32, 0.2), Vector3::new(1.0f32, 2.0, 3.0)),
            (Vector2::new(0.3, 0.4), Vector3::new(4.0, 5.0, 6.0)),
        ] {
            a_data.extend(bytes(&[uv]));
            a_data.extend([0u8; 4]);
            a_data.extend(bytes(&[position]));
        }
        let a = MeshData::new(
            MeshPrimitive::Points,
            None,
            a_data,
            vec![
                MeshAttributeData::new(MeshAttribute::TextureCoordinates, vector2(), 0, 24),
                MeshAttributeData::new(MeshAttribute::Position, vector3(), 12, 24),
            ],
            2,
        )
        .unwrap();
        // Indexed, with coordinates after an ignored color and no positions.
        let b_indices = [0u16, 2, 1, 0, 2, 2];
        let mut b_data = vec![0xffu8; 3 * 4];
        b_data.extend(bytes(&[
            Vector2::new(0.15f32, 0.25),
            Vector2::new(0.35, 0.45),
            Vector2::new(0.55, 0.65),
        ]));
        let b = MeshData::new(
            MeshPrimitive::Points,
            Some(MeshIndexData::borrowed(&b_indices)),
            b_data,
            vec![
                MeshAttributeData::new(
                    MeshAttribute::Color,
                    VertexFormat::Vector4(ComponentFormat::U8),
                    0,
                    4,
                ),
                MeshAttributeData::new(MeshAttribute::TextureCoordinates, vector2(), 12, 8),
            ],
            3,
        )
        .unwrap();
        // A second set of coordinates, which the layout does not have.
        let mut c_data = bytes(&[Vector3::new(1.5f32, 2.5, 3.5)]);
        c_data.extend(bytes(&[Vector2::new(0.9f32, 0.9), Vector2::new(0.125, 0.175)]));
        let c = MeshData::new(
            MeshPrimitive::Points,
            None,
            c_data,
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector3(), 0, 28),
                MeshAttributeData::new(MeshAttribute::TextureCoordinates, vector2(), 20, 28),
                MeshAttributeData::new(MeshAttribute::TextureCoordinates, vector2(), 12, 28),
            ],
            1,
        )
        .unwrap();
        let mesh = concatenate::concatenate(&[&a, &b, &c]).unwrap();

        assert_eq!(MeshPrimitive::Points, mesh.primitive());
        assert_eq!(2, mesh.attribute_count());
        assert!(interleave::is_interleaved(&mesh));
        assert_eq!(24, mesh.attribute(0).stride);
        assert_eq!(12, mesh.attribute(1).offset);
        assert_eq!(
            vec![
                Vector3::new(1.0f32, 2.0, 3.0),
                Vector3::new(4.0, 5.0, 6.0),
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::new(1.5, 2.5, 3.5),
            ],
            mesh.attribute_values::<Vector3<f32>>(MeshAttribute::Position)
                .unwrap()
        );
        assert_eq!(
            vec![
                Vector2::new(0.1f32, 0.2),
                Vector2::new(0.3, 0.4),
                Vector2::new(0.15, 0.25),
                Vector2::new(0.35, 0.45),
                Vector2::new(0.55, 0.65),
                Vector2::new(0.125, 0.175),
            ],
            mesh.attribute_values::<Vector2<f32>>(MeshAttribute::TextureCoordinates)
                .unwrap()
        );
        assert_eq!(Some(IndexType::U32), mesh.index_type());
        assert_eq!(
            vec![0, 1, 2, 4, 3, 2, 4, 4, 5],
            mesh.indices().unwrap().to_vec()
        );
    }

    #[test]
    fn concatenate_without_indices() {
        let a_positions = [Vector3::new(1.0f32, 2.0, 3.0)];
        let b_positions = [Vector3::new(4.0f32, 5.0, 6.0), Vector3::new(7.0, 8.0, 9.0)];
        let attributes = vec![MeshAttributeData::new(MeshAttribute::Position, vector3(), 0, 12)];
        let a = MeshData::new(
            MeshPrimitive::Triangles,
            None,
            bytes(&a_positions),
            attributes.clone(),
            1,
        )
        .unwrap();
        let b = MeshData::new(
            MeshPrimitive::Triangles,
            None,
            bytes(&b_positions),
            attributes,
            2,
        )
        .unwrap();
        let mesh = concatenate::concatenate(&[&a, &b, &b]).unwrap();

        assert!(!mesh.is_indexed());
        assert_eq!(5, mesh.vertex_count());
        assert_eq!(
            vec![
                a_positions[0],
                b_positions[0],
                b_positions[1],
                b_positions[0],
                b_positions[1],
            ],
            mesh.attribute_values::<Vector3<f32>>(MeshAttribute::Position)
                .unwrap()
        );
    }

    #[test]
    fn concatenate_without_attributes() {
        let a_indices = [1u16, 0];
        let c_indices = [1u8, 0, 1, 0];
        let a = MeshData::new(
            MeshPrimitive::Points,
            Some(MeshIndexData::borrowed(&a_indices)),
            Vec::<u8>::new(),
            vec![],
            2,
        )
        .unwrap();
        let b = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 6).unwrap();
        let c = MeshData::new(
            MeshPrimitive::Points,
            Some(MeshIndexData::borrowed(&c_indices)),
            Vec::<u8>::new(),
            vec![],
            2,
        )
        .unwrap();
        let mesh = concatenate::concatenate(&[&a, &b, &c]).unwrap();

        assert_eq!(10, mesh.vertex_count());
        assert!(mesh.vertex_data().is_empty());
        assert_eq!(
            vec![1, 0, 2, 3, 4, 5, 6, 7, 9, 8, 9, 8],
            mesh.indices().unwrap().to_vec()
        );

        let mesh = concatenate::concatenate(&[&b, &b]).unwrap();

        assert!(!mesh.is_indexed());
        assert_eq!(12, mesh.vertex_count());
    }

    #[test]
    fn concatenate_one_packs_attributes() {
        let mut data = bytes(&[Vector2::new(0.1f32, 0.2), Vector2::new(0.3, 0.4)]);
        data.extend(bytes(&[
            Vector3::new(1.0f32, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
        ]));
        let indices = [1u8, 0, 1];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            Some(MeshIndexData::borrowed(&indices)),
            data,
            vec![
                MeshAttributeData::new(MeshAttribute::TextureCoordinates, vector2(), 0, 8),
                MeshAttributeData::new(MeshAttribute::Position, vector3(), 16, 12),
            ],
            2,
        )
        .unwrap();
        let concatenated = concatenate::concatenate(&[&mesh]).unwrap();

        assert!(interleave::is_interleaved(&concatenated));
        assert_eq!(20, concatenated.attribute(0).stride);
        assert_eq!(vec![1, 0, 1], concatenated.indices().unwrap().to_vec());
        assert_eq!(
            vec![Vector3::new(1.0f32, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)],
            concatenated
                .attribute_values::<Vector3<f32>>(MeshAttribute::Position)
                .unwrap()
        );
    }

    #[test]
    fn reject_invalid_meshes() {
        let triangles =
            MeshData::new(MeshPrimitive::Triangles, None, Vec::<u8>::new(), vec![], 3).unwrap();
        let lines = MeshData::new(MeshPrimitive::Lines, None, Vec::<u8>::new(), vec![], 2).unwrap();
        let strip =
            MeshData::new(MeshPrimitive::TriangleStrip, None, Vec::<u8>::new(), vec![], 3).unwrap();

        assert_eq!(
            MeshError::NoMeshes,
            concatenate::concatenate(&[]).unwrap_err()
        );
        assert_eq!(
            "MeshPrimitive::TriangleStrip is not supported, turn it into a plain indexed mesh first",
            concatenate::concatenate(&[&strip, &strip])
                .unwrap_err()
                .to_string()
        );
        assert_eq!(
            "expected MeshPrimitive::Triangles but got MeshPrimitive::Lines in mesh 2",
            concatenate::concatenate(&[&triangles, &triangles, &lines])
                .unwrap_err()
                .to_string()
        );
    }

    #[test]
    fn reject_inconsistent_attributes() {
        let attribute = |name, format| MeshAttributeData::new(name, format, 0, 8);
        let colors = |format| {
            MeshData::new(
                MeshPrimitive::Points,
                None,
                vec![0u8; 8],
                vec![
                    attribute(MeshAttribute::Position, vector2()),
                    attribute(MeshAttribute::Color, format),
                ],
                1,
            )
            .unwrap()
        };
        let ubytes = colors(VertexFormat::Vector3(ComponentFormat::U8));
        let ushorts = colors(VertexFormat::Vector3(ComponentFormat::U16));
        let custom = |array_size| {
            MeshData::new(
                MeshPrimitive::Points,
                None,
                vec![0u8; 8],
                vec![attribute(
                    MeshAttribute::Custom(42),
                    VertexFormat::Scalar(ComponentFormat::I8),
                )
                .with_array_size(array_size)],
                1,
            )
            .unwrap()
        };

        assert_eq!(
            "expected Vector3(U8) for attribute 1 (Color) but got Vector3(U16) in mesh 2 \
             attribute 1",
            concatenate::concatenate(&[&ubytes, &ubytes, &ushorts])
                .unwrap_err()
                .to_string()
        );
        assert_eq!(
            MeshError::InconsistentArraySize {
                attribute: 0,
                name: MeshAttribute::Custom(42),
                expected: 5,
                actual: 4,
                mesh: 1,
                mesh_attribute: 0,
            },
            concatenate::concatenate(&[&custom(5), &custom(4)]).unwrap_err()
        );
    }

    #[test]
    fn reject_implementation_specific_index_type() {
        let points = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 1).unwrap();
        let opaque = MeshData::new(
            MeshPrimitive::Points,
            Some(MeshIndexData::implementation_specific(0xcaca, 1, vec![0u8; 1])),
            Vec::<u8>::new(),
            vec![],
            1,
        )
        .unwrap();

        assert_eq!(
            "data 1 has an implementation-specific index type 0xcaca",
            concatenate::concatenate(&[&points, &opaque])
                .unwrap_err()
                .to_string()
        );
    }
}

//! Interleaving of vertex attributes.
//!
//! A mesh is _interleaved_ when all of its attributes share a stride and fit
//! within it, so that the values for each vertex are stored together. This
//! module tests for that layout, computes interleaved layouts, and copies
//! attributes into them.

use crate::mesh::attribute::{AttributeSource, Extra, MeshAttributeData};
use crate::mesh::{MeshData, MeshError};
use crate::view::{StridedView, StridedViewMut};

/// Byte range spanned by the attributes of an interleaved mesh, relative to
/// the start of the vertex buffer.
fn interleaved_span(mesh: &MeshData<'_>) -> Option<(usize, usize)> {
    let attributes = mesh.attributes();
    let stride = attributes.first().map_or(0, |attribute| attribute.stride);
    let mut min = usize::MAX;
    let mut max = 0;
    let mut opaque = false;
    for attribute in attributes {
        if attribute.stride != stride {
            return None;
        }
        // Implementation-specific formats have an unknown size. Count them as
        // a single byte and assume they use the rest of the stride.
        let size = attribute.element_size().unwrap_or_else(|| {
            opaque = true;
            1
        });
        min = min.min(attribute.offset);
        max = max.max(attribute.offset + size);
    }
    if attributes.is_empty() {
        return Some((0, 0));
    }
    if opaque {
        max = max.max(min + stride);
    }
    if max - min <= stride {
        Some((min, max))
    }
    else {
        None
    }
}

/// Returns `true` if the attributes of `mesh` are interleaved.
///
/// A mesh without attributes is considered interleaved.
pub fn is_interleaved(mesh: &MeshData<'_>) -> bool {
    interleaved_span(mesh).is_some()
}

/// Gets a view with one element per vertex that spans all attributes of an
/// interleaved mesh.
///
/// # Errors
///
/// Returns an error if the mesh is not interleaved.
pub fn interleaved_data<'m>(mesh: &'m MeshData<'_>) -> Result<StridedView<'m>, MeshError> {
    let (min, max) = interleaved_span(mesh).ok_or(MeshError::NotInterleaved)?;
    let stride = mesh
        .attributes()
        .first()
        .map_or(0, |attribute| attribute.stride);
    StridedView::new(mesh.vertex_data(), min, mesh.vertex_count(), stride, max - min)
}

/// Computes an interleaved layout for the attributes of `mesh` followed by
/// `extra`.
///
/// If `mesh` is already interleaved, its stride and the relative offsets of its
/// attributes are kept and extras are placed after the stride. Otherwise
/// attributes are packed without gaps. Padding adjusts the stride.
///
/// The returned mesh is not indexed, has `vertex_count` vertices, and its
/// vertex data is zeroed.
///
/// # Errors
///
/// Returns an error if negative padding exceeds the stride or if an attribute
/// that must be repacked has an implementation-specific format.
pub fn interleaved_layout(
    mesh: &MeshData<'_>,
    vertex_count: usize,
    extra: &[Extra<'_>],
) -> Result<MeshData<'static>, MeshError> {
    let mut attributes = Vec::with_capacity(mesh.attribute_count() + extra.len());
    let mut stride = 0usize;
    if let Some((min, _)) = interleaved_span(mesh) {
        stride = mesh
            .attributes()
            .first()
            .map_or(0, |attribute| attribute.stride);
        attributes.extend(mesh.attributes().iter().map(|attribute| MeshAttributeData {
            offset: attribute.offset - min,
            ..*attribute
        }));
    }
    else {
        for (id, attribute) in mesh.attributes().iter().enumerate() {
            let size = attribute
                .element_size()
                .ok_or_else(|| implementation_specific(id, attribute))?;
            attributes.push(MeshAttributeData {
                offset: stride,
                ..*attribute
            });
            stride += size;
        }
    }
    for (id, extra) in extra.iter().enumerate() {
        match *extra {
            Extra::Padding(padding) => {
                if padding < 0 && padding.unsigned_abs() > stride {
                    return Err(MeshError::NegativePadding {
                        padding,
                        attribute: id,
                        stride,
                    });
                }
                stride = (stride as isize + padding) as usize;
            }
            Extra::Attribute(ref attribute) => {
                let size = attribute.element_size().ok_or_else(|| {
                    MeshError::ImplementationSpecificFormat {
                        attribute: mesh.attribute_count() + id,
                        mesh: 0,
                        format: attribute.format.implementation_specific_code().unwrap_or(0),
                    }
                })?;
                attributes.push(MeshAttributeData {
                    name: attribute.name,
                    format: attribute.format,
                    array_size: attribute.array_size,
                    offset: stride,
                    stride: 0,
                });
                stride += size;
            }
        }
    }
    for attribute in attributes.iter_mut() {
        attribute.stride = stride;
    }
    log::trace!(
        "interleaved layout of {} attributes with stride {}",
        attributes.len(),
        stride
    );
    MeshData::new(
        mesh.primitive(),
        None,
        vec![0u8; stride * vertex_count],
        attributes,
        vertex_count,
    )
}

/// Interleaves the attributes of `mesh` followed by `extra`.
///
/// Indices are copied. Extras with data are copied into the new layout and
/// empty extras are left zeroed.
///
/// # Errors
///
/// Returns an error if an extra is offset-only or has a different number of
/// elements than `mesh` has vertices. See also [`interleaved_layout`].
///
/// # Examples
///
/// ```rust
/// use meshtools::interleave;
/// use meshtools::mesh::attribute::{AttributeData, ComponentFormat, MeshAttribute, VertexFormat};
/// use meshtools::mesh::{MeshData, MeshPrimitive};
/// use meshtools::view::StridedView;
///
/// let mesh = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 2).unwrap();
/// let ids = [3u16, 4];
/// let interleaved = interleave::interleave(
///     &mesh,
///     &[AttributeData::new(
///         MeshAttribute::ObjectId,
///         VertexFormat::Scalar(ComponentFormat::U16),
///         StridedView::from_slice(&ids),
///     )
///     .unwrap()
///     .into()],
/// )
/// .unwrap();
///
/// assert_eq!(vec![3u16, 4], interleaved.attribute_values::<u16>(MeshAttribute::ObjectId).unwrap());
/// ```
pub fn interleave(
    mesh: &MeshData<'_>,
    extra: &[Extra<'_>],
) -> Result<MeshData<'static>, MeshError> {
    check_extra(mesh.vertex_count(), extra)?;
    let mut output = interleaved_layout(mesh, mesh.vertex_count(), extra)?;
    match interleaved_data(mesh) {
        Ok(source) => {
            let stride = output
                .attributes()
                .first()
                .map_or(0, |attribute| attribute.stride);
            let vertex_count = output.vertex_count();
            let mut target = StridedViewMut::new(
                output.vertex_data_mut(),
                0,
                vertex_count,
                stride,
                source.element_size(),
            )?;
            target.copy_from(&source)?;
        }
        Err(MeshError::NotInterleaved) => {
            for id in 0..mesh.attribute_count() {
                output.attribute_view_mut(id)?.copy_from(&mesh.attribute_view(id)?)?;
            }
        }
        Err(error) => return Err(error),
    }
    copy_extra(&mut output, mesh.attribute_count(), extra)?;
    let (primitive, _, vertex_data, attributes, vertex_count) = output.into_parts();
    MeshData::new(
        primitive,
        mesh.index_data().cloned().map(|indices| indices.into_owned()),
        vertex_data,
        attributes,
        vertex_count,
    )
}

/// Verifies that extras can be copied into a layout of `vertex_count`
/// vertices.
pub(crate) fn check_extra(vertex_count: usize, extra: &[Extra<'_>]) -> Result<(), MeshError> {
    for (id, extra) in extra.iter().enumerate() {
        if let Extra::Attribute(ref attribute) = *extra {
            match attribute.source {
                AttributeSource::OffsetOnly { .. } => {
                    return Err(MeshError::OffsetOnly { attribute: id });
                }
                AttributeSource::View(view) if view.len() != vertex_count => {
                    return Err(MeshError::AttributeSizeMismatch {
                        attribute: id,
                        expected: vertex_count,
                        actual: view.len(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Copies the data of extras into the attributes of `output` that follow the
/// first `offset` attributes.
pub(crate) fn copy_extra(
    output: &mut MeshData<'static>,
    offset: usize,
    extra: &[Extra<'_>],
) -> Result<(), MeshError> {
    let attributes = extra.iter().filter_map(|extra| match *extra {
        Extra::Attribute(ref attribute) => Some(attribute),
        Extra::Padding(_) => None,
    });
    for (id, attribute) in attributes.enumerate() {
        if let Some(view) = attribute.view() {
            output.attribute_view_mut(offset + id)?.copy_from(&view)?;
        }
    }
    Ok(())
}

fn implementation_specific(id: usize, attribute: &MeshAttributeData) -> MeshError {
    MeshError::ImplementationSpecificFormat {
        attribute: id,
        mesh: 0,
        format: attribute.format.implementation_specific_code().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use crate::interleave;
    use crate::mesh::attribute::{
        AttributeData, ComponentFormat, Extra, MeshAttribute, MeshAttributeData, VertexFormat,
    };
    use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive};
    use crate::view::StridedView;

    fn vector2() -> VertexFormat {
        VertexFormat::Vector2(ComponentFormat::F32)
    }

    fn color() -> VertexFormat {
        VertexFormat::Vector4(ComponentFormat::U8)
    }

    // Three positions followed by three colors.
    fn separate_mesh() -> MeshData<'static> {
        let positions = [
            Vector2::new(1.0f32, 2.0),
            Vector2::new(3.0, 4.0),
            Vector2::new(5.0, 6.0),
        ];
        let mut vertex_data = bytemuck::cast_slice::<_, u8>(&positions).to_vec();
        vertex_data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        MeshData::new(
            MeshPrimitive::Triangles,
            None,
            vertex_data,
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 0, 8),
                MeshAttributeData::new(MeshAttribute::Color, color(), 24, 4),
            ],
            3,
        )
        .unwrap()
    }

    #[test]
    fn detect_interleaved_attributes() {
        let vertex_data = vec![0u8; 64];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 4, 16),
                MeshAttributeData::new(MeshAttribute::Color, color(), 12, 16),
            ],
            3,
        )
        .unwrap();

        assert!(interleave::is_interleaved(&mesh));
        assert!(!interleave::is_interleaved(&separate_mesh()));

        let data = interleave::interleaved_data(&mesh).unwrap();
        assert_eq!(4, data.offset());
        assert_eq!(12, data.element_size());
        assert_eq!(16, data.stride());
    }

    #[test]
    fn attributes_exceeding_stride_are_not_interleaved() {
        let vertex_data = vec![0u8; 64];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 0, 10),
                MeshAttributeData::new(MeshAttribute::Color, color(), 8, 10),
            ],
            3,
        )
        .unwrap();

        assert!(!interleave::is_interleaved(&mesh));
        assert_eq!(
            MeshError::NotInterleaved,
            interleave::interleaved_data(&mesh).unwrap_err()
        );
        assert_eq!(
            "the mesh is not interleaved",
            interleave::interleaved_data(&mesh).unwrap_err().to_string()
        );
    }

    #[test]
    fn implementation_specific_format_assumes_whole_stride() {
        let vertex_data = vec![0u8; 64];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 4, 20),
                MeshAttributeData::new(
                    MeshAttribute::Custom(0),
                    VertexFormat::ImplementationSpecific(0xcaca),
                    12,
                    20,
                ),
            ],
            3,
        )
        .unwrap();
        let data = interleave::interleaved_data(&mesh).unwrap();

        assert_eq!(4, data.offset());
        assert_eq!(20, data.element_size());
    }

    #[test]
    fn propagate_errors_of_interleaved_data() {
        // The opaque attribute is assumed to fill the stride, which runs past
        // the end of the buffer for the last vertex.
        let vertex_data = vec![0u8; 9];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![MeshAttributeData::new(
                MeshAttribute::Custom(0),
                VertexFormat::ImplementationSpecific(0xcaca),
                0,
                8,
            )],
            2,
        )
        .unwrap();

        assert!(interleave::is_interleaved(&mesh));
        assert_eq!(
            MeshError::ViewOutOfBounds { end: 16, len: 9 },
            interleave::interleave(&mesh, &[]).unwrap_err()
        );
    }

    #[test]
    fn interleave_separate_attributes() {
        let mesh = interleave::interleave(&separate_mesh(), &[]).unwrap();

        assert!(interleave::is_interleaved(&mesh));
        assert_eq!(12, mesh.attribute(0).stride);
        assert_eq!(0, mesh.attribute(0).offset);
        assert_eq!(8, mesh.attribute(1).offset);
        assert_eq!(
            vec![
                Vector2::new(1.0f32, 2.0),
                Vector2::new(3.0, 4.0),
                Vector2::new(5.0, 6.0),
            ],
            mesh.attribute_values::<Vector2<f32>>(MeshAttribute::Position)
                .unwrap()
        );
        assert_eq!(
            vec![[1u8, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]],
            mesh.attribute_values::<[u8; 4]>(MeshAttribute::Color)
                .unwrap()
        );
    }

    #[test]
    fn layout_keeps_interleaved_stride() {
        let vertex_data = vec![0u8; 64];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 4, 20),
                MeshAttributeData::new(MeshAttribute::Color, color(), 16, 20),
            ],
            3,
        )
        .unwrap();
        let layout = interleave::interleaved_layout(
            &mesh,
            5,
            &[AttributeData::empty(
                MeshAttribute::ObjectId,
                VertexFormat::Scalar(ComponentFormat::U32),
            )
            .into()],
        )
        .unwrap();

        assert_eq!(5, layout.vertex_count());
        assert_eq!(24, layout.attribute(0).stride);
        assert_eq!(0, layout.attribute(0).offset);
        assert_eq!(12, layout.attribute(1).offset);
        assert_eq!(20, layout.attribute(2).offset);
        assert_eq!(24 * 5, layout.vertex_data().len());
        assert!(!layout.is_indexed());
    }

    #[test]
    fn layout_with_padding() {
        let layout = interleave::interleaved_layout(
            &separate_mesh(),
            3,
            &[
                Extra::Padding(4),
                AttributeData::empty(MeshAttribute::Normal, vector2()).into(),
                Extra::Padding(-4),
                AttributeData::empty(
                    MeshAttribute::ObjectId,
                    VertexFormat::Scalar(ComponentFormat::U32),
                )
                .into(),
            ],
        )
        .unwrap();

        assert_eq!(16, layout.attribute(2).offset);
        assert_eq!(20, layout.attribute(3).offset);
        assert_eq!(24, layout.attribute(3).stride);
    }

    #[test]
    fn reject_negative_padding_beyond_stride() {
        assert_eq!(
            MeshError::NegativePadding {
                padding: -13,
                attribute: 0,
                stride: 12,
            },
            interleave::interleaved_layout(&separate_mesh(), 3, &[Extra::Padding(-13)])
                .unwrap_err()
        );
        assert_eq!(
            "negative padding -17 in extra attribute 1 too large for stride 16",
            interleave::interleaved_layout(&separate_mesh(), 3, &[Extra::Padding(4), Extra::Padding(-17)])
            .unwrap_err()
            .to_string()
        );
    }

    #[test]
    fn reject_repacking_implementation_specific_format() {
        let vertex_data = vec![0u8; 64];
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data.as_slice(),
            vec![
                MeshAttributeData::new(MeshAttribute::Position, vector2(), 0, 8),
                MeshAttributeData::new(
                    MeshAttribute::Custom(0),
                    VertexFormat::ImplementationSpecific(0xcaca),
                    24,
                    4,
                ),
            ],
            3,
        )
        .unwrap();

        assert_eq!(
            MeshError::ImplementationSpecificFormat {
                attribute: 1,
                mesh: 0,
                format: 0xcaca,
            },
            interleave::interleaved_layout(&mesh, 3, &[]).unwrap_err()
        );
    }

    #[test]
    fn interleave_copies_indices_and_extras() {
        let indices = [2u8, 1, 0];
        let positions = [Vector2::new(0.0f32, 1.0); 3];
        let mesh = MeshData::new(
            MeshPrimitive::Triangles,
            Some(MeshIndexData::borrowed(&indices)),
            bytemuck::cast_slice::<_, u8>(&positions),
            vec![MeshAttributeData::new(
                MeshAttribute::Position,
                vector2(),
                0,
                8,
            )],
            3,
        )
        .unwrap();
        let ids = [7u32, 8, 9];
        let interleaved = interleave::interleave(
            &mesh,
            &[
                AttributeData::new(
                    MeshAttribute::ObjectId,
                    VertexFormat::Scalar(ComponentFormat::U32),
                    StridedView::from_slice(&ids),
                )
                .unwrap()
                .into(),
                AttributeData::empty(MeshAttribute::Normal, vector2()).into(),
            ],
        )
        .unwrap();

        assert_eq!(vec![2, 1, 0], interleaved.indices().unwrap().to_vec());
        assert_eq!(20, interleaved.attribute(0).stride);
        assert_eq!(
            vec![7u32, 8, 9],
            interleaved
                .attribute_values::<u32>(MeshAttribute::ObjectId)
                .unwrap()
        );
        assert_eq!(
            vec![Vector2::new(0.0f32, 0.0); 3],
            interleaved
                .attribute_values::<Vector2<f32>>(MeshAttribute::Normal)
                .unwrap()
        );
    }

    #[test]
    fn reject_invalid_extras() {
        let ids = [7u32, 8];

        assert_eq!(
            MeshError::AttributeSizeMismatch {
                attribute: 1,
                expected: 3,
                actual: 2,
            },
            interleave::interleave(
                &separate_mesh(),
                &[
                    Extra::Padding(2),
                    AttributeData::new(
                        MeshAttribute::ObjectId,
                        VertexFormat::Scalar(ComponentFormat::U32),
                        StridedView::from_slice(&ids),
                    )
                    .unwrap()
                    .into(),
                ],
            )
            .unwrap_err()
        );
        assert_eq!(
            MeshError::OffsetOnly { attribute: 0 },
            interleave::interleave(
                &separate_mesh(),
                &[AttributeData::offset_only(MeshAttribute::ObjectId, vector2(), 0, 8).into()],
            )
            .unwrap_err()
        );
        assert_eq!(
            "extra attribute 1 is offset-only, which is not supported",
            interleave::interleave(
                &separate_mesh(),
                &[
                    Extra::Padding(4),
                    AttributeData::offset_only(MeshAttribute::ObjectId, vector2(), 0, 8).into(),
                ],
            )
            .unwrap_err()
            .to_string()
        );
    }
}

//! Affine transformation of mesh attributes.
//!
//! Positions and texture coordinates are transformed as points. Tangents,
//! bitangents, and normals are transformed by the normal matrix of the
//! transformation, which is the cofactor of its upper-left 3x3 part. The
//! normal matrix keeps directions perpendicular to surfaces under
//! non-uniform scaling, but it also scales them, so transformed directions
//! are not normalized. The fourth component of a tangent is left as is.
//!
//! Attributes are selected by their order among attributes of the same name,
//! so the directions transformed along with positions `id` are tangents,
//! bitangents, and normals `id`. Only `f32` formats are transformed.
//!
//! # Examples
//!
//! ```rust
//! use meshtools::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
//! use meshtools::mesh::{MeshData, MeshPrimitive};
//! use meshtools::transform;
//! use nalgebra::{Matrix4, Vector3};
//!
//! let positions = [Vector3::new(1.0f32, 0.0, 0.0)];
//! let mesh = MeshData::new(
//!     MeshPrimitive::Points,
//!     None,
//!     bytemuck::cast_slice::<_, u8>(&positions),
//!     vec![MeshAttributeData::new(
//!         MeshAttribute::Position,
//!         VertexFormat::Vector3(ComponentFormat::F32),
//!         0,
//!         12,
//!     )],
//!     1,
//! )
//! .unwrap();
//! let translation = Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0));
//! let mesh = transform::transform_3d(&mesh, &translation, 0).unwrap();
//!
//! assert_eq!(
//!     vec![Vector3::new(1.0f32, 2.0, 0.0)],
//!     mesh.attribute_values::<Vector3<f32>>(MeshAttribute::Position).unwrap()
//! );
//! ```

use bytemuck::Pod;
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3, Vector4};

use crate::mesh::attribute::{ComponentFormat, MeshAttribute, VertexFormat};
use crate::mesh::{MeshData, MeshError};
use crate::view::StridedViewMut;

const VECTOR2: VertexFormat = VertexFormat::Vector2(ComponentFormat::F32);
const VECTOR3: VertexFormat = VertexFormat::Vector3(ComponentFormat::F32);
const VECTOR4: VertexFormat = VertexFormat::Vector4(ComponentFormat::F32);

/// Transforms the 2D positions `id` of a copy of a mesh.
///
/// # Errors
///
/// Returns an error if the mesh has no positions `id` or if they are not
/// two-component `f32` vectors.
pub fn transform_2d(
    mesh: &MeshData<'_>,
    transformation: &Matrix3<f32>,
    id: usize,
) -> Result<MeshData<'static>, MeshError> {
    let mut output = copy(mesh);
    transform_2d_in_place(&mut output, transformation, id)?;
    Ok(output)
}

/// Transforms the 2D positions `id` of a mesh.
///
/// Borrowed vertex data is copied first.
///
/// # Errors
///
/// Returns an error if the mesh has no positions `id` or if they are not
/// two-component `f32` vectors. The mesh is not modified on error.
pub fn transform_2d_in_place(
    mesh: &mut MeshData<'_>,
    transformation: &Matrix3<f32>,
    id: usize,
) -> Result<(), MeshError> {
    let position = find_attribute(mesh, MeshAttribute::Position, id)?;
    check_format(mesh, position, VECTOR2, None)?;
    map(mesh.attribute_view_mut(position)?, |position: Vector2<f32>| {
        transformation.transform_point(&Point2::from(position)).coords
    });
    Ok(())
}

/// Transforms the 3D positions `id` and the matching directions of a copy of
/// a mesh.
///
/// # Errors
///
/// Returns an error if the mesh has no positions `id` or if an attribute has
/// a format other than three-component `f32` vectors. Tangents may also be
/// four-component vectors.
pub fn transform_3d(
    mesh: &MeshData<'_>,
    transformation: &Matrix4<f32>,
    id: usize,
) -> Result<MeshData<'static>, MeshError> {
    let mut output = copy(mesh);
    transform_3d_in_place(&mut output, transformation, id)?;
    Ok(output)
}

/// Transforms the 3D positions `id` and the matching directions of a mesh.
///
/// Borrowed vertex data is copied first.
///
/// # Errors
///
/// Returns an error if the mesh has no positions `id` or if an attribute has
/// a format other than three-component `f32` vectors. Tangents may also be
/// four-component vectors. The mesh is not modified on error.
pub fn transform_3d_in_place(
    mesh: &mut MeshData<'_>,
    transformation: &Matrix4<f32>,
    id: usize,
) -> Result<(), MeshError> {
    let position = find_attribute(mesh, MeshAttribute::Position, id)?;
    check_format(mesh, position, VECTOR3, None)?;
    let tangent = mesh.find_attribute_id(MeshAttribute::Tangent, id);
    if let Some(tangent) = tangent {
        check_format(mesh, tangent, VECTOR3, Some(VECTOR4))?;
    }
    let bitangent = mesh.find_attribute_id(MeshAttribute::Bitangent, id);
    let normal = mesh.find_attribute_id(MeshAttribute::Normal, id);
    for direction in bitangent.iter().chain(normal.iter()) {
        check_format(mesh, *direction, VECTOR3, None)?;
    }

    map(mesh.attribute_view_mut(position)?, |position: Vector3<f32>| {
        transformation.transform_point(&Point3::from(position)).coords
    });
    let normal_matrix = normal_matrix(transformation);
    if let Some(tangent) = tangent {
        if mesh.attribute(tangent).format == VECTOR4 {
            map(mesh.attribute_view_mut(tangent)?, |tangent: Vector4<f32>| {
                (normal_matrix * tangent.xyz()).push(tangent.w)
            });
        }
        else {
            map(mesh.attribute_view_mut(tangent)?, |tangent: Vector3<f32>| {
                normal_matrix * tangent
            });
        }
    }
    for direction in bitangent.into_iter().chain(normal) {
        map(mesh.attribute_view_mut(direction)?, |direction: Vector3<f32>| {
            normal_matrix * direction
        });
    }
    log::trace!("transformed positions {} and their directions", id);
    Ok(())
}

/// Transforms the texture coordinates `id` of a copy of a mesh.
///
/// # Errors
///
/// Returns an error if the mesh has no texture coordinates `id` or if they
/// are not two-component `f32` vectors.
pub fn transform_texture_coordinates_2d(
    mesh: &MeshData<'_>,
    transformation: &Matrix3<f32>,
    id: usize,
) -> Result<MeshData<'static>, MeshError> {
    let mut output = copy(mesh);
    transform_texture_coordinates_2d_in_place(&mut output, transformation, id)?;
    Ok(output)
}

/// Transforms the texture coordinates `id` of a mesh.
///
/// # Errors
///
/// Returns an error if the mesh has no texture coordinates `id` or if they
/// are not two-component `f32` vectors.
pub fn transform_texture_coordinates_2d_in_place(
    mesh: &mut MeshData<'_>,
    transformation: &Matrix3<f32>,
    id: usize,
) -> Result<(), MeshError> {
    let coordinates = find_attribute(mesh, MeshAttribute::TextureCoordinates, id)?;
    check_format(mesh, coordinates, VECTOR2, None)?;
    map(mesh.attribute_view_mut(coordinates)?, |coordinates: Vector2<f32>| {
        transformation.transform_point(&Point2::from(coordinates)).coords
    });
    Ok(())
}

/// Gets the cofactor matrix of the upper-left 3x3 part of `transformation`.
///
/// This is the inverse transpose scaled by the determinant, so it is defined
/// for singular matrices too.
fn normal_matrix(transformation: &Matrix4<f32>) -> Matrix3<f32> {
    let a = transformation.column(0).xyz();
    let b = transformation.column(1).xyz();
    let c = transformation.column(2).xyz();
    Matrix3::from_columns(&[b.cross(&c), c.cross(&a), a.cross(&b)])
}

fn copy(mesh: &MeshData<'_>) -> MeshData<'static> {
    mesh.with_attributes(mesh.attributes().to_vec()).into_owned()
}

fn find_attribute(mesh: &MeshData<'_>, name: MeshAttribute, id: usize) -> Result<usize, MeshError> {
    mesh.find_attribute_id(name, id)
        .ok_or(MeshError::MissingAttribute { name, id })
}

fn check_format(
    mesh: &MeshData<'_>,
    attribute: usize,
    expected: VertexFormat,
    alternative: Option<VertexFormat>,
) -> Result<(), MeshError> {
    let actual = mesh.attribute(attribute).format;
    if actual == expected || Some(actual) == alternative {
        Ok(())
    }
    else {
        Err(MeshError::FormatMismatch { expected, actual })
    }
}

fn map<T, F>(mut view: StridedViewMut<'_>, f: F)
where
    T: Pod,
    F: Fn(T) -> T,
{
    for index in 0..view.len() {
        let value = view.as_view().read::<T>(index);
        view.write(index, f(value));
    }
}

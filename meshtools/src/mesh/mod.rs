//! Mesh data.
//!
//! [`MeshData`] is the representation of a mesh that all operations in this
//! crate consume and produce: a primitive, an optional index buffer, and a
//! vertex buffer of raw bytes described by a list of attributes. Attributes may
//! be interleaved (stored per vertex) or stored separately in the same buffer.
//!
//! Meshes either borrow their buffers from the caller or own them. Operations
//! that produce a new mesh always return an owned `MeshData<'static>`.
//!
//! # Examples
//!
//! Describing a triangle with interleaved positions and colors:
//!
//! ```rust
//! use meshtools::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
//! use meshtools::mesh::{MeshData, MeshIndexData, MeshPrimitive};
//!
//! // Position (two `f32`s) followed by a color (four `u8`s).
//! let mut vertices = Vec::new();
//! for (x, y) in [(0.0f32, 0.0f32), (1.0, 0.0), (0.0, 1.0)] {
//!     vertices.extend_from_slice(&x.to_le_bytes());
//!     vertices.extend_from_slice(&y.to_le_bytes());
//!     vertices.extend_from_slice(&[255, 0, 0, 255]);
//! }
//! let indices = [0u16, 1, 2];
//! let mesh = MeshData::new(
//!     MeshPrimitive::Triangles,
//!     Some(MeshIndexData::borrowed(&indices)),
//!     vertices,
//!     vec![
//!         MeshAttributeData::new(
//!             MeshAttribute::Position,
//!             VertexFormat::Vector2(ComponentFormat::F32),
//!             0,
//!             12,
//!         ),
//!         MeshAttributeData::new(
//!             MeshAttribute::Color,
//!             VertexFormat::Vector4(ComponentFormat::U8),
//!             8,
//!             12,
//!         ),
//!     ],
//!     3,
//! )
//! .unwrap();
//!
//! assert!(mesh.is_indexed());
//! assert_eq!(Some(1), mesh.attribute_id(meshtools::mesh::attribute::MeshAttribute::Color));
//! ```

pub mod attribute;

use bytemuck::Pod;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use crate::index::{self, Index, IndexType, IndexView};
use crate::mesh::attribute::{MeshAttribute, MeshAttributeData, VertexFormat};
use crate::view::{StridedView, StridedViewMut};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("index count not divisible by 3")]
    IndexCountUnaligned { count: usize },
    #[error("position count not divisible by 3")]
    PositionCountUnaligned { count: usize },
    #[error("expected index type size 1, 2 or 4 but got {size}")]
    IndexTypeSize { size: usize },
    #[error("data of {len} elements not divisible into rows of {width}")]
    RowUnaligned { len: usize, width: usize },
    #[error("no meshes passed")]
    NoMeshes,
    #[error("data {mesh} is MeshPrimitive::{actual:?} but expected MeshPrimitive::{expected:?}")]
    PrimitiveMismatch {
        mesh: usize,
        expected: MeshPrimitive,
        actual: MeshPrimitive,
    },
    #[error("data {mesh} has {actual} indices but expected {expected}")]
    IndexCountMismatch {
        mesh: usize,
        expected: usize,
        actual: usize,
    },
    #[error(
        "expected a MeshPrimitive::Triangles mesh and a MeshPrimitive::Faces mesh but got \
         MeshPrimitive::{mesh:?} and MeshPrimitive::{faces:?}"
    )]
    UnexpectedPrimitives {
        mesh: MeshPrimitive,
        faces: MeshPrimitive,
    },
    #[error("expected {expected} face entries for {indices} indices but got {actual}")]
    FaceCountMismatch {
        expected: usize,
        actual: usize,
        indices: usize,
    },
    #[error("a {size}-byte index type is too small for {count} vertices")]
    IndexTypeTooSmall { size: usize, count: usize },
    #[error("type too small to represent value {value}")]
    IndexOverflow { value: u64 },
    #[error("offset {offset} is larger than index {index}")]
    OffsetExceedsIndex { offset: i64, index: u32 },
    #[error("negative padding {padding} in extra attribute {attribute} too large for stride {stride}")]
    NegativePadding {
        padding: isize,
        attribute: usize,
        stride: usize,
    },
    #[error("mesh has no attributes")]
    AttributelessMesh,
    #[error("attribute {name:?} not found")]
    AttributeNotFound { name: MeshAttribute },
    #[error("expected format {expected:?} but got {actual:?}")]
    FormatMismatch {
        expected: VertexFormat,
        actual: VertexFormat,
    },
    #[error("index {index} out of bounds for {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("view ending at byte {end} out of bounds for {len} bytes")]
    ViewOutOfBounds { end: usize, len: usize },
    #[error("bad output size, expected {expected} but got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("extra attribute {attribute} expected to have {expected} items but got {actual}")]
    AttributeSizeMismatch {
        attribute: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{mesh} is not indexed")]
    NotIndexed { mesh: MeshRole },
    #[error("the mesh is not interleaved")]
    NotInterleaved,
    #[error("face attributes are not interleaved")]
    FaceAttributesNotInterleaved,
    #[error("extra attribute {attribute} is offset-only, which is not supported")]
    OffsetOnly { attribute: usize },
    #[error("face attribute {attribute} is offset-only")]
    FaceOffsetOnly { attribute: usize },
    #[error("attribute {attribute} of mesh {mesh} has an implementation-specific format {format:#x}")]
    ImplementationSpecificFormat {
        attribute: usize,
        mesh: usize,
        format: u32,
    },
    #[error("{mesh} has an implementation-specific index type {ty:#x}")]
    ImplementationSpecificIndexType { mesh: MeshRole, ty: u32 },
    #[error("expected at least {min} vertices, got {count}")]
    TooFewVertices { min: usize, count: usize },
    #[error("quad index count {count} not divisible by 4")]
    QuadCountUnaligned { count: usize },
    #[error("mesh data already indexed")]
    AlreadyIndexed,
    #[error("invalid primitive MeshPrimitive::{primitive:?}")]
    InvalidPrimitive { primitive: MeshPrimitive },
    #[error(
        "MeshPrimitive::{primitive:?} is not supported, turn it into a plain indexed mesh first"
    )]
    UnsupportedPrimitive { primitive: MeshPrimitive },
    #[error("expected MeshPrimitive::{expected:?} but got MeshPrimitive::{actual:?} in mesh {mesh}")]
    InconsistentPrimitive {
        mesh: usize,
        expected: MeshPrimitive,
        actual: MeshPrimitive,
    },
    #[error(
        "expected {expected:?} for attribute {attribute} ({name:?}) but got {actual:?} in mesh \
         {mesh} attribute {mesh_attribute}"
    )]
    InconsistentFormat {
        attribute: usize,
        name: MeshAttribute,
        expected: VertexFormat,
        actual: VertexFormat,
        mesh: usize,
        mesh_attribute: usize,
    },
    #[error(
        "expected array size {expected} for attribute {attribute} ({name:?}) but got {actual} in \
         mesh {mesh} attribute {mesh_attribute}"
    )]
    InconsistentArraySize {
        attribute: usize,
        name: MeshAttribute,
        expected: u16,
        actual: u16,
        mesh: usize,
        mesh_attribute: usize,
    },
    #[error("index {index} out of range for {count} attributes")]
    AttributeIdOutOfRange { index: usize, count: usize },
    #[error("the mesh has no {name:?} attribute with index {id}")]
    MissingAttribute { name: MeshAttribute, id: usize },
}

impl MeshError {
    /// Attributes the error to the mesh with the given role.
    ///
    /// Operations on a single mesh report errors for `MeshRole::Mesh`.
    pub fn for_mesh(self, role: MeshRole) -> Self {
        match self {
            MeshError::NotIndexed { .. } => MeshError::NotIndexed { mesh: role },
            MeshError::ImplementationSpecificIndexType { ty, .. } => {
                MeshError::ImplementationSpecificIndexType { mesh: role, ty }
            }
            MeshError::ImplementationSpecificFormat {
                attribute, format, ..
            } => MeshError::ImplementationSpecificFormat {
                attribute,
                mesh: role.position(),
                format,
            },
            error => error,
        }
    }
}

/// Role of a mesh within an operation, as reported by errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MeshRole {
    /// The only mesh of an operation.
    Mesh,
    /// The mesh at a position in a list of meshes.
    Data(usize),
    /// The indexed triangle mesh that face attributes are combined into.
    Vertex,
    /// The mesh of per-face attributes.
    Face,
}

impl MeshRole {
    /// Gets the position of the mesh among the inputs of its operation.
    pub fn position(&self) -> usize {
        match *self {
            MeshRole::Mesh | MeshRole::Vertex => 0,
            MeshRole::Face => 1,
            MeshRole::Data(position) => position,
        }
    }
}

impl Display for MeshRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MeshRole::Mesh => write!(formatter, "mesh data"),
            MeshRole::Data(position) => write!(formatter, "data {}", position),
            MeshRole::Vertex => write!(formatter, "vertex mesh"),
            MeshRole::Face => write!(formatter, "face mesh"),
        }
    }
}

/// Primitive that a mesh is drawn with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MeshPrimitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    /// Per-instance data.
    Instances,
    /// Per-face data, one entry per triangle of another mesh.
    Faces,
    /// Per-edge data.
    Edges,
    ImplementationSpecific(u32),
}

/// Index buffer of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshIndexData<'a> {
    ty: IndexType,
    len: usize,
    data: Cow<'a, [u8]>,
}

impl<'a> MeshIndexData<'a> {
    pub fn borrowed<T>(indices: &'a [T]) -> Self
    where
        T: Index,
    {
        MeshIndexData {
            ty: T::TYPE,
            len: indices.len(),
            data: Cow::Borrowed(bytemuck::cast_slice(indices)),
        }
    }

    pub fn owned<T>(indices: Vec<T>) -> MeshIndexData<'static>
    where
        T: Index,
    {
        MeshIndexData {
            ty: T::TYPE,
            len: indices.len(),
            data: Cow::Owned(bytemuck::cast_slice(&indices).to_vec()),
        }
    }

    /// Creates index data from raw bytes of a concrete index type.
    ///
    /// # Errors
    ///
    /// Returns an error if `ty` is implementation-specific or the length of
    /// `data` is not a multiple of the index size.
    pub fn erased<D>(ty: IndexType, data: D) -> Result<Self, MeshError>
    where
        D: Into<Cow<'a, [u8]>>,
    {
        let data = data.into();
        let size = ty.size().ok_or(MeshError::ImplementationSpecificIndexType {
            mesh: MeshRole::Mesh,
            ty: implementation_specific_code(ty),
        })?;
        if data.len() % size != 0 {
            return Err(MeshError::RowUnaligned {
                len: data.len(),
                width: size,
            });
        }
        Ok(MeshIndexData {
            ty,
            len: data.len() / size,
            data,
        })
    }

    /// Creates index data of an implementation-specific type.
    ///
    /// The layout of `data` is opaque, so `len` gives the number of indices.
    pub fn implementation_specific<D>(ty: u32, len: usize, data: D) -> Self
    where
        D: Into<Cow<'a, [u8]>>,
    {
        MeshIndexData {
            ty: IndexType::ImplementationSpecific(ty),
            len,
            data: data.into(),
        }
    }

    /// Narrows index values to the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit `ty` or `ty` is
    /// implementation-specific.
    pub fn from_values(ty: IndexType, values: &[u32]) -> Result<MeshIndexData<'static>, MeshError> {
        let values = IndexView::from(values);
        match ty {
            IndexType::U8 => Ok(MeshIndexData::owned(index::compress_indices_as::<u8>(values)?)),
            IndexType::U16 => Ok(MeshIndexData::owned(index::compress_indices_as::<u16>(values)?)),
            IndexType::U32 => Ok(MeshIndexData::owned(values.to_vec())),
            IndexType::ImplementationSpecific(ty) => {
                Err(MeshError::ImplementationSpecificIndexType {
                mesh: MeshRole::Mesh,
                ty,
            })
            }
        }
    }

    pub fn index_type(&self) -> IndexType {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Gets a view of the indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the index type is implementation-specific.
    pub fn view(&self) -> Result<IndexView<'_>, MeshError> {
        let size = self.ty.size().ok_or(MeshError::ImplementationSpecificIndexType {
            mesh: MeshRole::Mesh,
            ty: implementation_specific_code(self.ty),
        })?;
        IndexView::erased(StridedView::new(&self.data, 0, self.len, size, size)?)
    }

    pub fn to_values(&self) -> Result<Vec<u32>, MeshError> {
        self.view().map(|indices| indices.to_vec())
    }

    pub fn into_owned(self) -> MeshIndexData<'static> {
        MeshIndexData {
            ty: self.ty,
            len: self.len,
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    pub(crate) fn reborrow(&self) -> MeshIndexData<'_> {
        MeshIndexData {
            ty: self.ty,
            len: self.len,
            data: Cow::Borrowed(&self.data[..]),
        }
    }
}

/// Mesh: primitive, optional indices, and vertex attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData<'a> {
    primitive: MeshPrimitive,
    indices: Option<MeshIndexData<'a>>,
    vertex_data: Cow<'a, [u8]>,
    attributes: Vec<MeshAttributeData>,
    vertex_count: usize,
}

impl<'a> MeshData<'a> {
    /// Creates a mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if an attribute does not fit in `vertex_data` for
    /// `vertex_count` vertices or if an index refers to a vertex beyond
    /// `vertex_count`.
    pub fn new<D>(
        primitive: MeshPrimitive,
        indices: Option<MeshIndexData<'a>>,
        vertex_data: D,
        attributes: Vec<MeshAttributeData>,
        vertex_count: usize,
    ) -> Result<Self, MeshError>
    where
        D: Into<Cow<'a, [u8]>>,
    {
        let vertex_data = vertex_data.into();
        for attribute in attributes.iter() {
            // The size of an implementation-specific format is unknown, so
            // only its offset and stride are checked.
            StridedView::new(
                &vertex_data,
                attribute.offset,
                vertex_count,
                attribute.stride,
                attribute.element_size().unwrap_or(0),
            )?;
        }
        if let Some(indices) = indices.as_ref() {
            if !indices.index_type().is_implementation_specific() {
                indices.view()?.check_bounds(vertex_count)?;
            }
        }
        Ok(MeshData {
            primitive,
            indices,
            vertex_data,
            attributes,
            vertex_count,
        })
    }

    pub fn primitive(&self) -> MeshPrimitive {
        self.primitive
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Gets the number of indices, or zero if the mesh is not indexed.
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, MeshIndexData::len)
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.indices.as_ref().map(MeshIndexData::index_type)
    }

    pub fn index_data(&self) -> Option<&MeshIndexData<'a>> {
        self.indices.as_ref()
    }

    /// Gets a view of the indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is not indexed or its index type is
    /// implementation-specific.
    pub fn indices(&self) -> Result<IndexView<'_>, MeshError> {
        self.indices
            .as_ref()
            .ok_or(MeshError::NotIndexed {
                mesh: MeshRole::Mesh,
            })?
            .view()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Gets the number of elements drawn: the index count of an indexed mesh
    /// and the vertex count otherwise.
    pub fn element_count(&self) -> usize {
        match self.indices.as_ref() {
            Some(indices) => indices.len(),
            _ => self.vertex_count,
        }
    }

    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// Gets the vertex buffer for writing.
    ///
    /// Borrowed vertex data is copied first.
    pub fn vertex_data_mut(&mut self) -> &mut [u8] {
        self.vertex_data.to_mut()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// # Panics
    ///
    /// Panics if `id` is out of bounds.
    pub fn attribute(&self, id: usize) -> &MeshAttributeData {
        &self.attributes[id]
    }

    pub fn attributes(&self) -> &[MeshAttributeData] {
        &self.attributes
    }

    /// Gets the position of the first attribute named `name`.
    pub fn attribute_id(&self, name: MeshAttribute) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.name == name)
    }

    /// Gets the position of the `id`-th attribute named `name`.
    ///
    /// Meshes may have more than one attribute with the same name, such as
    /// several sets of texture coordinates.
    pub fn find_attribute_id(&self, name: MeshAttribute, id: usize) -> Option<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, attribute)| attribute.name == name)
            .nth(id)
            .map(|(position, _)| position)
    }

    /// Gets a view of an attribute with one element per vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute has an implementation-specific
    /// format.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of bounds.
    pub fn attribute_view(&self, id: usize) -> Result<StridedView<'_>, MeshError> {
        let attribute = &self.attributes[id];
        let size = attribute_size(id, attribute)?;
        StridedView::new(
            &self.vertex_data,
            attribute.offset,
            self.vertex_count,
            attribute.stride,
            size,
        )
    }

    /// Gets a mutable view of an attribute.
    ///
    /// Borrowed vertex data is copied first.
    pub fn attribute_view_mut(&mut self, id: usize) -> Result<StridedViewMut<'_>, MeshError> {
        let attribute = self.attributes[id];
        let size = attribute_size(id, &attribute)?;
        StridedViewMut::new(
            self.vertex_data.to_mut(),
            attribute.offset,
            self.vertex_count,
            attribute.stride,
            size,
        )
    }

    /// Copies the values of the first attribute named `name`.
    ///
    /// Each element is split into as many `T`s as fit in it.
    pub fn attribute_values<T>(&self, name: MeshAttribute) -> Result<Vec<T>, MeshError>
    where
        T: Pod,
    {
        let id = self
            .attribute_id(name)
            .ok_or(MeshError::AttributeNotFound { name })?;
        self.attribute_view(id)?.to_vec()
    }

    pub fn into_owned(self) -> MeshData<'static> {
        MeshData {
            primitive: self.primitive,
            indices: self.indices.map(MeshIndexData::into_owned),
            vertex_data: Cow::Owned(self.vertex_data.into_owned()),
            attributes: self.attributes,
            vertex_count: self.vertex_count,
        }
    }

    /// Gets a mesh with the given attributes that borrows the buffers of this
    /// mesh.
    ///
    /// The attributes must already have been validated against this mesh.
    pub(crate) fn with_attributes(&self, attributes: Vec<MeshAttributeData>) -> MeshData<'_> {
        MeshData {
            primitive: self.primitive,
            indices: self.indices.as_ref().map(MeshIndexData::reborrow),
            vertex_data: Cow::Borrowed(&self.vertex_data[..]),
            attributes,
            vertex_count: self.vertex_count,
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        MeshPrimitive,
        Option<MeshIndexData<'a>>,
        Cow<'a, [u8]>,
        Vec<MeshAttributeData>,
        usize,
    ) {
        (
            self.primitive,
            self.indices,
            self.vertex_data,
            self.attributes,
            self.vertex_count,
        )
    }
}

fn attribute_size(id: usize, attribute: &MeshAttributeData) -> Result<usize, MeshError> {
    attribute
        .element_size()
        .ok_or(MeshError::ImplementationSpecificFormat {
            attribute: id,
            mesh: 0,
            format: attribute
                .format
                .implementation_specific_code()
                .unwrap_or(0),
        })
}

fn implementation_specific_code(ty: IndexType) -> u32 {
    match ty {
        IndexType::ImplementationSpecific(ty) => ty,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use std::borrow::Cow;

    use crate::index::IndexType;
    use crate::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
    use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive, MeshRole};

    fn position() -> VertexFormat {
        VertexFormat::Vector3(ComponentFormat::F32)
    }

    #[test]
    fn reject_attribute_beyond_vertex_data() {
        let positions = [Vector3::new(0.0f32, 0.0, 0.0); 2];
        let vertex_data: &[u8] = bytemuck::cast_slice(&positions);

        assert_eq!(
            MeshError::ViewOutOfBounds { end: 36, len: 24 },
            MeshData::new(
                MeshPrimitive::Points,
                None,
                vertex_data,
                vec![MeshAttributeData::new(
                    MeshAttribute::Position,
                    position(),
                    0,
                    12
                )],
                3,
            )
            .unwrap_err()
        );
    }

    #[test]
    fn reject_index_beyond_vertex_count() {
        let indices = [0u8, 3, 1];

        assert_eq!(
            MeshError::IndexOutOfBounds { index: 3, len: 3 },
            MeshData::new(
                MeshPrimitive::Triangles,
                Some(MeshIndexData::borrowed(&indices)),
                Vec::<u8>::new(),
                vec![],
                3,
            )
            .unwrap_err()
        );
    }

    #[test]
    fn read_attribute_values() {
        let positions = [Vector3::new(1.0f32, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let vertex_data: &[u8] = bytemuck::cast_slice(&positions);
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data,
            vec![MeshAttributeData::new(
                MeshAttribute::Position,
                position(),
                0,
                12,
            )],
            2,
        )
        .unwrap();

        assert_eq!(
            positions.to_vec(),
            mesh.attribute_values::<Vector3<f32>>(MeshAttribute::Position)
                .unwrap()
        );
        assert_eq!(
            MeshError::AttributeNotFound {
                name: MeshAttribute::Normal,
            },
            mesh.attribute_values::<Vector3<f32>>(MeshAttribute::Normal)
                .unwrap_err()
        );
    }

    #[test]
    fn write_borrowed_attribute_copies_data() {
        let values = [1u16, 2];
        let vertex_data: &[u8] = bytemuck::cast_slice(&values);
        let mut mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vertex_data,
            vec![MeshAttributeData::new(
                MeshAttribute::ObjectId,
                VertexFormat::Scalar(ComponentFormat::U16),
                0,
                2,
            )],
            2,
        )
        .unwrap();
        mesh.attribute_view_mut(0).unwrap().write(1, 7u16);

        assert_eq!([1, 2], values);
        assert_eq!(
            vec![1u16, 7],
            mesh.attribute_values::<u16>(MeshAttribute::ObjectId).unwrap()
        );
    }

    #[test]
    fn reject_view_of_implementation_specific_attribute() {
        let mesh = MeshData::new(
            MeshPrimitive::Points,
            None,
            vec![0u8; 8],
            vec![MeshAttributeData::new(
                MeshAttribute::Custom(1),
                VertexFormat::ImplementationSpecific(0xcaca),
                0,
                4,
            )],
            2,
        )
        .unwrap();

        assert_eq!(
            "attribute 0 of mesh 0 has an implementation-specific format 0xcaca",
            mesh.attribute_view(0).unwrap_err().to_string()
        );
    }

    #[test]
    fn implementation_specific_indices() {
        let indices = MeshIndexData::implementation_specific(0xcaca, 3, vec![0u8; 3]);

        assert_eq!(IndexType::ImplementationSpecific(0xcaca), indices.index_type());
        assert_eq!(3, indices.len());
        assert_eq!(
            "mesh data has an implementation-specific index type 0xcaca",
            indices.view().unwrap_err().to_string()
        );
        assert_eq!(
            "data 2 has an implementation-specific index type 0xcaca",
            indices
                .view()
                .unwrap_err()
                .for_mesh(MeshRole::Data(2))
                .to_string()
        );
        assert_eq!(
            "face mesh has an implementation-specific index type 0xcaca",
            indices
                .view()
                .unwrap_err()
                .for_mesh(MeshRole::Face)
                .to_string()
        );
    }

    #[test]
    fn report_errors_by_mesh_role() {
        let mesh = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 3).unwrap();

        assert_eq!(
            MeshError::NotIndexed {
                mesh: MeshRole::Mesh
            },
            mesh.indices().unwrap_err()
        );
        assert_eq!("mesh data is not indexed", mesh.indices().unwrap_err().to_string());
        assert_eq!(
            "vertex mesh is not indexed",
            mesh.indices()
                .unwrap_err()
                .for_mesh(MeshRole::Vertex)
                .to_string()
        );
        assert_eq!(
            MeshError::ImplementationSpecificFormat {
                attribute: 2,
                mesh: 1,
                format: 0xcaca,
            },
            MeshError::ImplementationSpecificFormat {
                attribute: 2,
                mesh: 0,
                format: 0xcaca,
            }
            .for_mesh(MeshRole::Face)
        );
    }

    #[test]
    fn narrow_index_values() {
        let indices = MeshIndexData::from_values(IndexType::U8, &[3, 255, 0]).unwrap();

        assert_eq!(IndexType::U8, indices.index_type());
        assert_eq!(&[3, 255, 0][..], indices.bytes());
        assert_eq!(
            MeshError::IndexOverflow { value: 256 },
            MeshIndexData::from_values(IndexType::U8, &[256]).unwrap_err()
        );
    }

    #[test]
    fn owned_mesh_outlives_borrowed_data() {
        let mesh = {
            let indices = vec![0u32, 1, 0];
            let mesh = MeshData::new(
                MeshPrimitive::Lines,
                Some(MeshIndexData::borrowed(&indices)),
                Cow::Borrowed(&[0u8; 0][..]),
                vec![],
                2,
            )
            .unwrap();
            mesh.into_owned()
        };

        assert_eq!(vec![0, 1, 0], mesh.indices().unwrap().to_vec());
    }
}

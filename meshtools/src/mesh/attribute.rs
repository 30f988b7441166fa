//! Vertex attributes.

use crate::mesh::MeshError;
use crate::view::StridedView;

/// Semantic of a vertex attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MeshAttribute {
    Position,
    Normal,
    Tangent,
    Bitangent,
    TextureCoordinates,
    Color,
    ObjectId,
    /// User-defined attribute, identified by an arbitrary number.
    Custom(u16),
}

impl MeshAttribute {
    pub fn is_custom(&self) -> bool {
        matches!(self, MeshAttribute::Custom(_))
    }
}

/// Format of a single vector component.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ComponentFormat {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ComponentFormat {
    pub fn size(&self) -> usize {
        match *self {
            ComponentFormat::U8 | ComponentFormat::I8 => 1,
            ComponentFormat::U16 | ComponentFormat::I16 => 2,
            ComponentFormat::U32 | ComponentFormat::I32 | ComponentFormat::F32 => 4,
            ComponentFormat::F64 => 8,
        }
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, ComponentFormat::F32 | ComponentFormat::F64)
    }
}

/// Format of a vertex attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VertexFormat {
    Scalar(ComponentFormat),
    Vector2(ComponentFormat),
    Vector3(ComponentFormat),
    Vector4(ComponentFormat),
    /// Format that is opaque to generic processing, such as a packed format
    /// specific to a graphics API.
    ImplementationSpecific(u32),
}

impl VertexFormat {
    /// Gets the size of the format in bytes.
    ///
    /// Returns `None` for implementation-specific formats.
    pub fn size(&self) -> Option<usize> {
        let component = self.component_format()?;
        Some(component.size() * self.component_count())
    }

    pub fn component_format(&self) -> Option<ComponentFormat> {
        match *self {
            VertexFormat::Scalar(component)
            | VertexFormat::Vector2(component)
            | VertexFormat::Vector3(component)
            | VertexFormat::Vector4(component) => Some(component),
            VertexFormat::ImplementationSpecific(_) => None,
        }
    }

    /// Gets the number of components in the format.
    ///
    /// Implementation-specific formats are treated as a single component.
    pub fn component_count(&self) -> usize {
        match *self {
            VertexFormat::Scalar(_) | VertexFormat::ImplementationSpecific(_) => 1,
            VertexFormat::Vector2(_) => 2,
            VertexFormat::Vector3(_) => 3,
            VertexFormat::Vector4(_) => 4,
        }
    }

    pub fn is_implementation_specific(&self) -> bool {
        matches!(self, VertexFormat::ImplementationSpecific(_))
    }

    /// Gets the code of an implementation-specific format.
    pub fn implementation_specific_code(&self) -> Option<u32> {
        match *self {
            VertexFormat::ImplementationSpecific(code) => Some(code),
            _ => None,
        }
    }
}

/// Attribute of a mesh: where its values live in the vertex buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MeshAttributeData {
    pub name: MeshAttribute,
    pub format: VertexFormat,
    /// Number of values per vertex. Zero describes a single value that is not
    /// an array.
    pub array_size: u16,
    pub offset: usize,
    pub stride: usize,
}

impl MeshAttributeData {
    pub fn new(name: MeshAttribute, format: VertexFormat, offset: usize, stride: usize) -> Self {
        MeshAttributeData {
            name,
            format,
            array_size: 0,
            offset,
            stride,
        }
    }

    pub fn with_array_size(self, array_size: u16) -> Self {
        MeshAttributeData { array_size, ..self }
    }

    /// Gets the size of the attribute's value for a single vertex.
    pub fn element_size(&self) -> Option<usize> {
        self.format
            .size()
            .map(|size| size * usize::from(self.array_size.max(1)))
    }
}

/// Where the values of an [`AttributeData`] come from.
#[derive(Clone, Copy, Debug)]
pub enum AttributeSource<'a> {
    /// Values are read from a view.
    View(StridedView<'a>),
    /// Storage is reserved but no values are provided. Reserved storage is
    /// zeroed.
    Empty,
    /// Values live at an offset into data that is not yet known. Operations
    /// that copy attributes reject this source.
    OffsetOnly { offset: usize, stride: usize },
}

/// Free-standing vertex attribute with its data.
///
/// Unlike [`MeshAttributeData`], this type does not refer into the vertex
/// buffer of a mesh. It describes extra attributes added by interleaving and
/// duplication as well as face attributes.
#[derive(Clone, Copy, Debug)]
pub struct AttributeData<'a> {
    pub name: MeshAttribute,
    pub format: VertexFormat,
    pub array_size: u16,
    pub source: AttributeSource<'a>,
}

impl<'a> AttributeData<'a> {
    /// Creates an attribute from a view.
    ///
    /// # Errors
    ///
    /// Returns an error if the element size of `view` does not match
    /// `format`.
    pub fn new(
        name: MeshAttribute,
        format: VertexFormat,
        view: StridedView<'a>,
    ) -> Result<Self, MeshError> {
        AttributeData::with_array_size(name, format, 0, view)
    }

    pub fn with_array_size(
        name: MeshAttribute,
        format: VertexFormat,
        array_size: u16,
        view: StridedView<'a>,
    ) -> Result<Self, MeshError> {
        if let Some(size) = format.size() {
            let expected = size * usize::from(array_size.max(1));
            if view.element_size() != expected {
                return Err(MeshError::SizeMismatch {
                    expected,
                    actual: view.element_size(),
                });
            }
        }
        Ok(AttributeData {
            name,
            format,
            array_size,
            source: AttributeSource::View(view),
        })
    }

    pub fn empty(name: MeshAttribute, format: VertexFormat) -> Self {
        AttributeData {
            name,
            format,
            array_size: 0,
            source: AttributeSource::Empty,
        }
    }

    pub fn offset_only(
        name: MeshAttribute,
        format: VertexFormat,
        offset: usize,
        stride: usize,
    ) -> Self {
        AttributeData {
            name,
            format,
            array_size: 0,
            source: AttributeSource::OffsetOnly { offset, stride },
        }
    }

    pub fn element_size(&self) -> Option<usize> {
        self.format
            .size()
            .map(|size| size * usize::from(self.array_size.max(1)))
    }

    pub fn is_offset_only(&self) -> bool {
        matches!(self.source, AttributeSource::OffsetOnly { .. })
    }

    pub fn view(&self) -> Option<StridedView<'a>> {
        match self.source {
            AttributeSource::View(view) => Some(view),
            _ => None,
        }
    }
}

/// Extra entry appended to an interleaved layout.
#[derive(Clone, Copy, Debug)]
pub enum Extra<'a> {
    Attribute(AttributeData<'a>),
    /// Bytes of padding. Negative padding moves the next attribute back into
    /// space already occupied.
    Padding(isize),
}

impl<'a> From<AttributeData<'a>> for Extra<'a> {
    fn from(attribute: AttributeData<'a>) -> Self {
        Extra::Attribute(attribute)
    }
}

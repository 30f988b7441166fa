//! Index buffers and index types.
//!
//! Index buffers describe the draw order of a mesh as integers that refer to
//! vertices. Indices are stored as unsigned integers of one, two, or four bytes
//! and are described at runtime by an [`IndexType`]. The [`Index`] trait is
//! implemented for the corresponding Rust types and [`IndexView`] erases the
//! width so that operations can accept any of them.
//!
//! This module also provides _index compression_, which stores an index buffer
//! in the smallest type that can represent its values.
//!
//! # Examples
//!
//! Compressing an index buffer:
//!
//! ```rust
//! use meshtools::index::{self, IndexType, IndexView};
//!
//! let indices = [1u32, 2, 3, 0, 4];
//! let compressed =
//!     index::compress_indices(IndexView::from(&indices[..]), IndexType::U8, 0).unwrap();
//!
//! assert_eq!(IndexType::U8, compressed.index_type());
//! assert_eq!(vec![1, 2, 3, 0, 4], compressed.to_values().unwrap());
//! ```

use bytemuck::Pod;
use num::Unsigned;
use std::fmt::Debug;
use std::hash::Hash;

use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshRole};
use crate::view::StridedView;

/// Type of the indices in an index buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IndexType {
    U8,
    U16,
    U32,
    /// Index type that is opaque to generic processing, such as a type that is
    /// specific to a graphics API.
    ImplementationSpecific(u32),
}

impl IndexType {
    /// Gets the index type with the given size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is not one, two, or four.
    pub fn for_size(size: usize) -> Result<Self, MeshError> {
        match size {
            1 => Ok(IndexType::U8),
            2 => Ok(IndexType::U16),
            4 => Ok(IndexType::U32),
            _ => Err(MeshError::IndexTypeSize { size }),
        }
    }

    /// Gets the smallest index type that can represent `max`.
    pub fn for_max(max: u32) -> Self {
        if max > u32::from(u16::MAX) {
            IndexType::U32
        }
        else if max > u32::from(u8::MAX) {
            IndexType::U16
        }
        else {
            IndexType::U8
        }
    }

    /// Gets the size of an index in bytes.
    ///
    /// Returns `None` for implementation-specific types.
    pub fn size(&self) -> Option<usize> {
        match *self {
            IndexType::U8 => Some(1),
            IndexType::U16 => Some(2),
            IndexType::U32 => Some(4),
            IndexType::ImplementationSpecific(_) => None,
        }
    }

    /// Gets the largest index value that this type can represent.
    pub fn max_value(&self) -> Option<u32> {
        match *self {
            IndexType::U8 => Some(u32::from(u8::MAX)),
            IndexType::U16 => Some(u32::from(u16::MAX)),
            IndexType::U32 => Some(u32::MAX),
            IndexType::ImplementationSpecific(_) => None,
        }
    }

    pub fn is_implementation_specific(&self) -> bool {
        matches!(self, IndexType::ImplementationSpecific(_))
    }
}

/// The default index type is the lower bound used when compressing indices.
impl Default for IndexType {
    fn default() -> Self {
        IndexType::U16
    }
}

/// Unsigned integer that can be stored in an index buffer.
pub trait Index: Copy + Debug + Eq + Hash + num::NumCast + Ord + Pod + Unsigned {
    const TYPE: IndexType;
    const MAX: u32;

    fn into_u32(self) -> u32;

    fn into_usize(self) -> usize {
        self.into_u32() as usize
    }

    /// Converts a `u32` into an index, returning `None` if it does not fit.
    fn try_from_u32(value: u32) -> Option<Self>;
}

macro_rules! impl_index {
    (types => $($t:ident => $ty:ident),*$(,)?) => (
        $(
            impl Index for $t {
                const TYPE: IndexType = IndexType::$ty;
                const MAX: u32 = $t::MAX as u32;

                fn into_u32(self) -> u32 {
                    u32::from(self)
                }

                fn try_from_u32(value: u32) -> Option<Self> {
                    $t::try_from(value).ok()
                }
            }
        )*
    );
}
impl_index!(types => u8 => U8, u16 => U16, u32 => U32);

/// Type-erased view of indices.
///
/// An `IndexView` always refers to indices of a concrete type: one, two, or
/// four bytes wide. Reads dispatch on that width.
#[derive(Clone, Copy, Debug)]
pub struct IndexView<'a> {
    ty: IndexType,
    view: StridedView<'a>,
}

impl<'a> IndexView<'a> {
    /// Interprets a byte view as indices, using its element size as the index
    /// width.
    ///
    /// # Errors
    ///
    /// Returns an error if the element size is not one, two, or four bytes.
    pub fn erased(view: StridedView<'a>) -> Result<Self, MeshError> {
        let ty = IndexType::for_size(view.element_size())?;
        log::trace!("viewing {} indices of type {:?}", view.len(), ty);
        Ok(IndexView { ty, view })
    }

    pub fn index_type(&self) -> IndexType {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Gets the underlying byte view.
    pub fn as_bytes(&self) -> StridedView<'a> {
        self.view
    }

    /// Reads the index at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of bounds.
    pub fn get(&self, position: usize) -> u32 {
        match self.ty {
            IndexType::U8 => u32::from(self.view.read::<u8>(position)),
            IndexType::U16 => u32::from(self.view.read::<u16>(position)),
            _ => self.view.read::<u32>(position),
        }
    }

    pub fn iter(&self) -> impl 'a + ExactSizeIterator<Item = u32> + Clone {
        let indices = *self;
        (0..self.len()).map(move |position| indices.get(position))
    }

    pub fn max(&self) -> Option<u32> {
        self.iter().max()
    }

    pub fn min(&self) -> Option<u32> {
        self.iter().min()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Verifies that every index refers to one of `len` elements.
    ///
    /// # Errors
    ///
    /// Returns an error for the first index that is not less than `len`.
    pub fn check_bounds(&self, len: usize) -> Result<(), MeshError> {
        match self.iter().find(|index| *index as usize >= len) {
            Some(index) => Err(MeshError::IndexOutOfBounds {
                index: index as usize,
                len,
            }),
            _ => Ok(()),
        }
    }
}

impl<'a, T> From<&'a [T]> for IndexView<'a>
where
    T: Index,
{
    fn from(indices: &'a [T]) -> Self {
        IndexView {
            ty: T::TYPE,
            view: StridedView::from_slice(indices),
        }
    }
}

impl<'a, T> From<&'a Vec<T>> for IndexView<'a>
where
    T: Index,
{
    fn from(indices: &'a Vec<T>) -> Self {
        IndexView::from(indices.as_slice())
    }
}

/// Compresses indices into the smallest type that can represent them.
///
/// `offset` is subtracted from every index before choosing a type, and the
/// chosen type is never smaller than `at_least`. A negative `offset` adds to
/// the indices.
///
/// # Errors
///
/// Returns an error if `at_least` is implementation-specific or if an index
/// cannot be represented by a `u32` after applying `offset`.
///
/// # Examples
///
/// ```rust
/// use meshtools::index::{self, IndexType, IndexView};
///
/// let indices = [75001u32, 75256, 75000, 75005];
/// let compressed = index::compress_indices(
///     IndexView::from(&indices[..]),
///     IndexType::default(),
///     75000,
/// )
/// .unwrap();
///
/// assert_eq!(IndexType::U16, compressed.index_type());
/// assert_eq!(vec![1, 256, 0, 5], compressed.to_values().unwrap());
/// ```
pub fn compress_indices(
    indices: IndexView<'_>,
    at_least: IndexType,
    offset: i64,
) -> Result<MeshIndexData<'static>, MeshError> {
    let lower = at_least
        .max_value()
        .ok_or_else(|| implementation_specific(at_least))?;
    let values = indices
        .iter()
        .map(|index| {
            let value = i64::from(index) - offset;
            if value < 0 {
                Err(MeshError::OffsetExceedsIndex { offset, index })
            }
            else {
                u32::try_from(value).map_err(|_| MeshError::IndexOverflow {
                    value: value as u64,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    let max = values.iter().copied().max().unwrap_or(0);
    let ty = if max > lower {
        IndexType::for_max(max)
    }
    else {
        at_least
    };
    log::trace!("compressing {} indices to {:?}", values.len(), ty);
    MeshIndexData::from_values(ty, &values)
}

/// Converts indices to a specific index type.
///
/// # Errors
///
/// Returns an error naming the first index that `T` cannot represent.
pub fn compress_indices_as<T>(indices: IndexView<'_>) -> Result<Vec<T>, MeshError>
where
    T: Index,
{
    indices
        .iter()
        .map(|index| {
            T::try_from_u32(index).ok_or(MeshError::IndexOverflow {
                value: u64::from(index),
            })
        })
        .collect()
}

/// Compresses the index buffer of a mesh.
///
/// Vertices below the minimum index are trimmed by moving every attribute
/// offset forward, so the vertex data itself is not copied element by
/// element. The resulting vertex count is `max - min + 1`.
///
/// # Errors
///
/// Returns an error if the mesh is not indexed or its index type is
/// implementation-specific.
pub fn compress_mesh_indices(
    mesh: &MeshData<'_>,
    at_least: IndexType,
) -> Result<MeshData<'static>, MeshError> {
    let indices = mesh.indices()?;
    let (min, max) = match (indices.min(), indices.max()) {
        (Some(min), Some(max)) => (min, max),
        _ => (0, 0),
    };
    let compressed = compress_indices(indices, at_least, i64::from(min))?;
    let vertex_count = if indices.is_empty() {
        0
    }
    else {
        (max - min) as usize + 1
    };
    let attributes = mesh
        .attributes()
        .iter()
        .map(|attribute| {
            let mut attribute = *attribute;
            attribute.offset += min as usize * attribute.stride;
            attribute
        })
        .collect();
    MeshData::new(
        mesh.primitive(),
        Some(compressed),
        mesh.vertex_data().to_vec(),
        attributes,
        vertex_count,
    )
}

fn implementation_specific(ty: IndexType) -> MeshError {
    match ty {
        IndexType::ImplementationSpecific(ty) => {
            MeshError::ImplementationSpecificIndexType {
                mesh: MeshRole::Mesh,
                ty,
            }
        }
        _ => MeshError::IndexTypeSize {
            size: ty.size().unwrap_or(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use crate::index::{self, Index, IndexType, IndexView};
    use crate::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData, VertexFormat};
    use crate::mesh::{MeshData, MeshError, MeshIndexData, MeshPrimitive, MeshRole};
    use crate::view::StridedView;

    #[test]
    fn index_type_for_size() {
        assert_eq!(IndexType::U8, IndexType::for_size(1).unwrap());
        assert_eq!(IndexType::U16, IndexType::for_size(2).unwrap());
        assert_eq!(IndexType::U32, IndexType::for_size(4).unwrap());
        assert_eq!(
            MeshError::IndexTypeSize { size: 3 },
            IndexType::for_size(3).unwrap_err()
        );
        assert_eq!(
            "expected index type size 1, 2 or 4 but got 3",
            IndexType::for_size(3).unwrap_err().to_string()
        );
    }

    #[test]
    fn index_trait_constants() {
        assert_eq!(IndexType::U16, <u16 as Index>::TYPE);
        assert_eq!(255, <u8 as Index>::MAX);
        assert_eq!(None, <u8 as Index>::try_from_u32(256));
        assert_eq!(Some(7u16), <u16 as Index>::try_from_u32(7));
    }

    #[test]
    fn read_erased_indices() {
        let indices = [3u16, 0, 65535];
        let bytes: &[u8] = bytemuck::cast_slice(&indices);
        let view = IndexView::erased(StridedView::rows(bytes, 2).unwrap()).unwrap();

        assert_eq!(IndexType::U16, view.index_type());
        assert_eq!(vec![3, 0, 65535], view.to_vec());
        assert_eq!(Some(65535), view.max());
    }

    #[test]
    fn reject_erased_indices_of_unsupported_width() {
        let bytes = [0u8; 9];

        assert_eq!(
            MeshError::IndexTypeSize { size: 3 },
            IndexView::erased(StridedView::rows(&bytes, 3).unwrap()).unwrap_err()
        );
    }

    #[test]
    fn check_index_bounds() {
        let indices = [1u8, 1, 0, 4, 2, 2];
        let view = IndexView::from(&indices[..]);

        assert_eq!(Ok(()), view.check_bounds(5));
        assert_eq!(
            MeshError::IndexOutOfBounds { index: 4, len: 4 },
            view.check_bounds(4).unwrap_err()
        );
    }

    #[test]
    fn compress_to_lower_bound() {
        let indices = [1u8, 2, 3, 0, 4];
        let compressed =
            index::compress_indices(IndexView::from(&indices[..]), IndexType::default(), 0)
                .unwrap();

        assert_eq!(IndexType::U16, compressed.index_type());
        assert_eq!(vec![1, 2, 3, 0, 4], compressed.to_values().unwrap());
    }

    #[test]
    fn compress_to_smallest_type() {
        let indices = [1u32, 256, 0, 5];
        let compressed =
            index::compress_indices(IndexView::from(&indices[..]), IndexType::U8, 0).unwrap();

        assert_eq!(IndexType::U16, compressed.index_type());
        assert_eq!(
            &[1, 0, 0, 1, 0, 0, 5, 0][..],
            compressed.bytes(),
        );

        let indices = [65536u32, 3];
        let compressed =
            index::compress_indices(IndexView::from(&indices[..]), IndexType::U8, 0).unwrap();

        assert_eq!(IndexType::U32, compressed.index_type());
    }

    #[test]
    fn compress_with_offset() {
        let indices = [75001u32, 75256, 75000, 75005];
        let compressed =
            index::compress_indices(IndexView::from(&indices[..]), IndexType::default(), 75000)
                .unwrap();

        assert_eq!(IndexType::U16, compressed.index_type());
        assert_eq!(vec![1, 256, 0, 5], compressed.to_values().unwrap());
    }

    #[test]
    fn compress_with_negative_offset() {
        let indices = [1u32, 256, 0, 5];
        let compressed =
            index::compress_indices(IndexView::from(&indices[..]), IndexType::default(), -75000)
                .unwrap();

        assert_eq!(IndexType::U32, compressed.index_type());
        assert_eq!(
            vec![75001, 75256, 75000, 75005],
            compressed.to_values().unwrap()
        );
    }

    #[test]
    fn reject_offset_beyond_index() {
        let indices = [3u32, 1];

        assert_eq!(
            MeshError::OffsetExceedsIndex {
                offset: 2,
                index: 1,
            },
            index::compress_indices(IndexView::from(&indices[..]), IndexType::U8, 2).unwrap_err()
        );
    }

    #[test]
    fn compress_as_type() {
        let indices = [1u32, 256, 0, 5];

        assert_eq!(
            vec![1u16, 256, 0, 5],
            index::compress_indices_as::<u16>(IndexView::from(&indices[..])).unwrap()
        );
    }

    #[test]
    fn reject_compress_as_too_small_type() {
        let indices = [1u32, 65536, 0, 5];
        let error =
            index::compress_indices_as::<u16>(IndexView::from(&indices[..])).unwrap_err();

        assert_eq!(MeshError::IndexOverflow { value: 65536 }, error);
        assert_eq!(
            "type too small to represent value 65536",
            error.to_string()
        );
    }

    #[test]
    fn compress_mesh_trims_leading_vertices() {
        let positions = (0..103)
            .map(|n| Vector2::new(n as f32, -(n as f32)))
            .collect::<Vec<_>>();
        let vertex_data: &[u8] = bytemuck::cast_slice(&positions);
        let indices = [102u32, 101, 100, 101, 102];
        let mesh = MeshData::new(
            MeshPrimitive::Triangles,
            Some(MeshIndexData::borrowed(&indices)),
            vertex_data,
            vec![MeshAttributeData::new(
                MeshAttribute::Position,
                VertexFormat::Vector2(ComponentFormat::F32),
                0,
                8,
            )],
            103,
        )
        .unwrap();
        let compressed = index::compress_mesh_indices(&mesh, IndexType::default()).unwrap();

        assert_eq!(Some(IndexType::U16), compressed.index_type());
        assert_eq!(
            vec![2, 1, 0, 1, 2],
            compressed.indices().unwrap().to_vec()
        );
        assert_eq!(3, compressed.vertex_count());
        assert_eq!(100 * 8, compressed.attribute(0).offset);
        assert_eq!(
            vec![
                Vector2::new(100.0f32, -100.0),
                Vector2::new(101.0, -101.0),
                Vector2::new(102.0, -102.0),
            ],
            compressed
                .attribute_values::<Vector2<f32>>(MeshAttribute::Position)
                .unwrap()
        );
    }

    #[test]
    fn reject_compress_mesh_without_indices() {
        let mesh = MeshData::new(MeshPrimitive::Points, None, Vec::<u8>::new(), vec![], 3).unwrap();

        assert_eq!(
            MeshError::NotIndexed {
                mesh: MeshRole::Mesh
            },
            index::compress_mesh_indices(&mesh, IndexType::default()).unwrap_err()
        );
    }
}

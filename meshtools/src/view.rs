//! Strided views over raw bytes.
//!
//! Mesh data is stored as untyped bytes: a vertex buffer holds one or more
//! attributes at fixed offsets and strides and an index buffer holds integers
//! of one of several widths. This module provides [`StridedView`] and
//! [`StridedViewMut`], which expose such data as a sequence of equally sized
//! _elements_ without copying it.
//!
//! An element `i` of a view occupies the bytes `offset + i * stride` through
//! `offset + i * stride + size`. Elements may overlap (a zero stride repeats
//! one element) or be separated by unrelated data (an interleaved vertex
//! buffer). The bytes of a single element are always contiguous.
//!
//! Views are bounds checked when they are constructed, so reading an element
//! of a view never reads beyond the underlying slice.
//!
//! # Examples
//!
//! Viewing the second field of an interleaved buffer:
//!
//! ```rust
//! use meshtools::view::StridedView;
//!
//! // Two vertices, each with a `u16` followed by a `u8`.
//! let bytes = [1u8, 0, 7, 2, 0, 9];
//! let view = StridedView::new(&bytes, 2, 2, 3, 1).unwrap();
//!
//! assert_eq!(&[7], view.get(0));
//! assert_eq!(&[9], view.get(1));
//! ```

use bytemuck::Pod;
use std::mem;
use std::ops::Range;

use crate::mesh::MeshError;

fn validate(len: usize, offset: usize, count: usize, stride: usize, size: usize) -> Result<(), MeshError> {
    if count == 0 {
        return if offset <= len {
            Ok(())
        }
        else {
            Err(MeshError::ViewOutOfBounds {
                end: offset,
                len,
            })
        };
    }
    let end = (count - 1)
        .checked_mul(stride)
        .and_then(|last| last.checked_add(offset))
        .and_then(|last| last.checked_add(size))
        .ok_or(MeshError::ViewOutOfBounds {
            end: usize::MAX,
            len,
        })?;
    if end > len {
        Err(MeshError::ViewOutOfBounds { end, len })
    }
    else {
        Ok(())
    }
}

fn validate_field(offset: usize, size: usize, len: usize) -> Result<(), MeshError> {
    let end = offset
        .checked_add(size)
        .ok_or(MeshError::ViewOutOfBounds {
            end: usize::MAX,
            len,
        })?;
    if end > len {
        Err(MeshError::ViewOutOfBounds { end, len })
    }
    else {
        Ok(())
    }
}

/// Immutable, type-erased, strided view over bytes.
#[derive(Clone, Copy, Debug)]
pub struct StridedView<'a> {
    data: &'a [u8],
    offset: usize,
    len: usize,
    stride: usize,
    size: usize,
}

impl<'a> StridedView<'a> {
    /// Creates a view of `len` elements of `size` bytes each.
    ///
    /// # Errors
    ///
    /// Returns an error if the last element would end beyond `data`.
    pub fn new(
        data: &'a [u8],
        offset: usize,
        len: usize,
        stride: usize,
        size: usize,
    ) -> Result<Self, MeshError> {
        validate(data.len(), offset, len, stride, size)?;
        Ok(StridedView {
            data,
            offset,
            len,
            stride,
            size,
        })
    }

    /// Creates a contiguous view with one element per item of `items`.
    pub fn from_slice<T>(items: &'a [T]) -> Self
    where
        T: Pod,
    {
        StridedView {
            data: bytemuck::cast_slice(items),
            offset: 0,
            len: items.len(),
            stride: mem::size_of::<T>(),
            size: mem::size_of::<T>(),
        }
    }

    /// Creates a contiguous view of `len` rows of `size` bytes each.
    pub fn rows(data: &'a [u8], size: usize) -> Result<Self, MeshError> {
        let len = if size == 0 { 0 } else { data.len() / size };
        StridedView::new(data, 0, len, size, size)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the size of a single element in bytes.
    pub fn element_size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Gets the byte offset of the first element in the underlying data.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` if elements directly follow each other.
    pub fn is_contiguous(&self) -> bool {
        self.stride == self.size || self.len <= 1
    }

    /// Gets the bytes of the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> &'a [u8] {
        assert!(index < self.len, "element {} out of bounds for {}", index, self.len);
        let start = self.offset + index * self.stride;
        &self.data[start..start + self.size]
    }

    /// Reads the element at `index` as a `T`.
    ///
    /// The element is copied, so the underlying bytes need not be aligned.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or the element size differs from the
    /// size of `T`.
    pub fn read<T>(&self, index: usize) -> T
    where
        T: Pod,
    {
        bytemuck::pod_read_unaligned(self.get(index))
    }

    pub fn iter(&self) -> impl 'a + ExactSizeIterator<Item = &'a [u8]> + Clone {
        let view = *self;
        (0..self.len).map(move |index| view.get(index))
    }

    /// Copies all elements into a vector of `T`.
    ///
    /// Each element is split into as many `T`s as fit in it, so an element of
    /// three `f32`s yields three items.
    ///
    /// # Errors
    ///
    /// Returns an error if the element size is not a multiple of the size of
    /// `T`.
    pub fn to_vec<T>(&self) -> Result<Vec<T>, MeshError>
    where
        T: Pod,
    {
        let width = mem::size_of::<T>();
        if width == 0 || self.size % width != 0 {
            return Err(MeshError::SizeMismatch {
                expected: width,
                actual: self.size,
            });
        }
        let mut items = Vec::with_capacity(self.len * (self.size / width));
        for element in self.iter() {
            items.extend(
                element
                    .chunks_exact(width)
                    .map(bytemuck::pod_read_unaligned::<T>),
            );
        }
        Ok(items)
    }

    /// Gets a view of the first `len` elements.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the length of the view.
    pub fn prefix(&self, len: usize) -> Self {
        self.slice(0..len)
    }

    /// Gets a view of the elements in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the length of the view.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "range {:?} out of bounds for {}",
            range,
            self.len
        );
        StridedView {
            data: self.data,
            offset: self.offset + range.start * self.stride,
            len: range.end - range.start,
            stride: self.stride,
            size: self.size,
        }
    }

    /// Gets a view of `size` bytes at `offset` within every element.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not fit in an element.
    pub fn field(&self, offset: usize, size: usize) -> Result<Self, MeshError> {
        validate_field(offset, size, self.size)?;
        Ok(StridedView {
            data: self.data,
            offset: self.offset + offset,
            len: self.len,
            stride: self.stride,
            size,
        })
    }

    /// Reinterprets the view with a different element size.
    ///
    /// This is used to view interleaved vertex data for which an element size
    /// is only known at a higher level.
    pub fn with_element_size(&self, size: usize) -> Result<Self, MeshError> {
        StridedView::new(self.data, self.offset, self.len, self.stride, size)
    }
}

/// Mutable, type-erased, strided view over bytes.
///
/// See [`StridedView`].
#[derive(Debug)]
pub struct StridedViewMut<'a> {
    data: &'a mut [u8],
    offset: usize,
    len: usize,
    stride: usize,
    size: usize,
}

impl<'a> StridedViewMut<'a> {
    pub fn new(
        data: &'a mut [u8],
        offset: usize,
        len: usize,
        stride: usize,
        size: usize,
    ) -> Result<Self, MeshError> {
        validate(data.len(), offset, len, stride, size)?;
        Ok(StridedViewMut {
            data,
            offset,
            len,
            stride,
            size,
        })
    }

    pub fn from_slice<T>(items: &'a mut [T]) -> Self
    where
        T: Pod,
    {
        let len = items.len();
        StridedViewMut {
            data: bytemuck::cast_slice_mut(items),
            offset: 0,
            len,
            stride: mem::size_of::<T>(),
            size: mem::size_of::<T>(),
        }
    }

    pub fn rows(data: &'a mut [u8], size: usize) -> Result<Self, MeshError> {
        let len = if size == 0 { 0 } else { data.len() / size };
        StridedViewMut::new(data, 0, len, size, size)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_view(&self) -> StridedView<'_> {
        StridedView {
            data: self.data,
            offset: self.offset,
            len: self.len,
            stride: self.stride,
            size: self.size,
        }
    }

    /// Reborrows the view, allowing it to be passed by value to functions
    /// that consume a `StridedViewMut`.
    pub fn reborrow(&mut self) -> StridedViewMut<'_> {
        StridedViewMut {
            data: self.data,
            offset: self.offset,
            len: self.len,
            stride: self.stride,
            size: self.size,
        }
    }

    pub fn get(&self, index: usize) -> &[u8] {
        assert!(index < self.len, "element {} out of bounds for {}", index, self.len);
        let start = self.offset + index * self.stride;
        &self.data[start..start + self.size]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut [u8] {
        assert!(index < self.len, "element {} out of bounds for {}", index, self.len);
        let start = self.offset + index * self.stride;
        &mut self.data[start..start + self.size]
    }

    /// Writes `value` into the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or the element size differs from the
    /// size of `T`.
    pub fn write<T>(&mut self, index: usize, value: T)
    where
        T: Pod,
    {
        self.get_mut(index).copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Copies the element at `from` over the element at `to`.
    pub fn copy_within(&mut self, from: usize, to: usize) {
        assert!(from < self.len && to < self.len);
        if from != to {
            let source = self.offset + from * self.stride;
            let destination = self.offset + to * self.stride;
            self.data
                .copy_within(source..source + self.size, destination);
        }
    }

    /// Copies all elements from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the length or element size of `source` differ from
    /// this view.
    pub fn copy_from(&mut self, source: &StridedView<'_>) -> Result<(), MeshError> {
        if source.len() != self.len {
            return Err(MeshError::SizeMismatch {
                expected: self.len,
                actual: source.len(),
            });
        }
        if source.element_size() != self.size {
            return Err(MeshError::SizeMismatch {
                expected: self.size,
                actual: source.element_size(),
            });
        }
        for (index, element) in source.iter().enumerate() {
            self.get_mut(index).copy_from_slice(element);
        }
        Ok(())
    }

    /// Writes `items` into the elements of the view, splitting them into
    /// elements in order.
    ///
    /// This is the inverse of [`StridedView::to_vec`].
    pub fn write_slice<T>(&mut self, items: &[T]) -> Result<(), MeshError>
    where
        T: Pod,
    {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        if bytes.len() != self.len * self.size {
            return Err(MeshError::SizeMismatch {
                expected: self.len * self.size,
                actual: bytes.len(),
            });
        }
        if self.size == 0 {
            return Ok(());
        }
        for (index, element) in bytes.chunks_exact(self.size).enumerate() {
            self.get_mut(index).copy_from_slice(element);
        }
        Ok(())
    }

    pub fn prefix(self, len: usize) -> Self {
        assert!(len <= self.len, "prefix {} out of bounds for {}", len, self.len);
        StridedViewMut { len, ..self }
    }

    /// Gets a view of the elements in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the length of the view.
    pub fn slice(self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "range {:?} out of bounds for {}",
            range,
            self.len
        );
        StridedViewMut {
            offset: self.offset + range.start * self.stride,
            len: range.end - range.start,
            ..self
        }
    }

    pub fn field(self, offset: usize, size: usize) -> Result<Self, MeshError> {
        validate_field(offset, size, self.size)?;
        Ok(StridedViewMut {
            offset: self.offset + offset,
            size,
            ..self
        })
    }
}

//! Duplicate removal.
//!
//! Deduplication treats data as a sequence of rows and produces an index for
//! each row that maps it to a unique row. Exact deduplication compares rows
//! byte for byte. Fuzzy deduplication compares floating-point rows within a
//! tolerance.
//!
//! _In-place_ variants compact the unique rows to the front of the data in
//! order of first occurrence and return indices into that prefix. Other
//! variants leave data untouched and return indices of the first occurrence of
//! each row.
//!
//! # Examples
//!
//! ```rust
//! use meshtools::dedup;
//! use meshtools::view::StridedViewMut;
//!
//! let mut data = [1u32, 2, 1, 4];
//! let (indices, len) = dedup::remove_duplicates_in_place(StridedViewMut::from_slice(&mut data));
//!
//! assert_eq!(vec![0, 1, 0, 2], indices);
//! assert_eq!(&[1, 2, 4], &data[..len]);
//! ```

use ahash::{AHashMap, RandomState};
use num::Float;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::mem;

use crate::duplicate;
use crate::index::{Index, IndexView};
use crate::interleave;
use crate::mesh::attribute::{ComponentFormat, MeshAttribute, MeshAttributeData};
use crate::mesh::{MeshData, MeshError, MeshIndexData};
use crate::view::{StridedView, StridedViewMut};

/// Tolerances for fuzzy deduplication of floating-point attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    /// Tolerance for attributes with `f32` components.
    pub float: f32,
    /// Tolerance for attributes with `f64` components.
    pub double: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            float: 1.0e-5,
            double: 1.0e-14,
        }
    }
}

/// Unique rows of data that is compacted while it is being indexed.
///
/// Rows cannot be borrowed as keys while the data is written, so rows are
/// bucketed by hash and compared against the compacted prefix instead.
struct RowTable {
    state: RandomState,
    buckets: AHashMap<u64, SmallVec<[u32; 1]>>,
    len: usize,
}

impl RowTable {
    fn with_capacity(capacity: usize) -> Self {
        RowTable {
            state: RandomState::new(),
            buckets: AHashMap::with_capacity(capacity),
            len: 0,
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    /// Gets the position of the unique row equal to the row at `position`,
    /// registering it as unique if there is none.
    fn insert(&mut self, data: &StridedViewMut<'_>, position: usize) -> u32 {
        let row = data.get(position);
        let mut hasher = self.state.build_hasher();
        row.hash(&mut hasher);
        let bucket = self.buckets.entry(hasher.finish()).or_default();
        if let Some(unique) = bucket
            .iter()
            .find(|unique| data.get(**unique as usize) == row)
        {
            return *unique;
        }
        bucket.push(position as u32);
        self.len += 1;
        position as u32
    }
}

/// Removes exact duplicates, returning the index of the first occurrence of
/// each row and the number of unique rows.
pub fn remove_duplicates(data: StridedView<'_>) -> (Vec<u32>, usize) {
    let mut indices = vec![0; data.len()];
    let len = index_first_occurrences(data, &mut indices);
    (indices, len)
}

/// Removes exact duplicates into `indices`.
///
/// # Errors
///
/// Returns an error if `indices` does not have one element per row.
pub fn remove_duplicates_into(data: StridedView<'_>, indices: &mut [u32]) -> Result<usize, MeshError> {
    if indices.len() != data.len() {
        return Err(MeshError::SizeMismatch {
            expected: data.len(),
            actual: indices.len(),
        });
    }
    Ok(index_first_occurrences(data, indices))
}

fn index_first_occurrences(data: StridedView<'_>, indices: &mut [u32]) -> usize {
    let mut rows = HashMap::with_capacity_and_hasher(data.len(), RandomState::new());
    for (position, (row, index)) in data.iter().zip(indices.iter_mut()).enumerate() {
        *index = *rows.entry(row).or_insert(position as u32);
    }
    log::debug!("found {} unique of {} rows", rows.len(), data.len());
    rows.len()
}

/// Removes exact duplicates by compacting unique rows to the front of `data`.
///
/// Returns an index into the unique rows for each row and the number of unique
/// rows.
pub fn remove_duplicates_in_place(data: StridedViewMut<'_>) -> (Vec<u32>, usize) {
    let mut indices = vec![0; data.len()];
    let len = compact(data, &mut indices);
    (indices, len)
}

/// Removes exact duplicates in place, writing indices into `indices`.
///
/// # Errors
///
/// Returns an error if `indices` does not have one element per row.
pub fn remove_duplicates_in_place_into(
    data: StridedViewMut<'_>,
    indices: &mut [u32],
) -> Result<usize, MeshError> {
    if indices.len() != data.len() {
        return Err(MeshError::SizeMismatch {
            expected: data.len(),
            actual: indices.len(),
        });
    }
    Ok(compact(data, indices))
}

fn compact(mut data: StridedViewMut<'_>, indices: &mut [u32]) -> usize {
    let mut table = RowTable::with_capacity(data.len());
    for (position, index) in indices.iter_mut().enumerate() {
        // The row is copied into the next free slot before it is known to be
        // unique. A duplicate leaves the slot free for the next row.
        let free = table.len();
        data.copy_within(position, free);
        *index = table.insert(&data, free);
    }
    log::debug!("compacted {} unique of {} rows", table.len(), data.len());
    table.len()
}

/// Removes exact duplicates in place and remaps an index buffer that refers to
/// `data`.
///
/// Returns the number of unique rows.
///
/// # Errors
///
/// Returns an error if `I` cannot index every row of `data` or if an index is
/// out of bounds.
pub fn remove_duplicates_indexed_in_place<I>(
    indices: &mut [I],
    data: StridedViewMut<'_>,
) -> Result<usize, MeshError>
where
    I: Index,
{
    check_index_capacity::<I>(data.len())?;
    IndexView::from(&*indices).check_bounds(data.len())?;
    let (remapping, len) = remove_duplicates_in_place(data);
    remap(indices, &remapping)?;
    Ok(len)
}

/// Removes duplicates of floating-point rows of `width` values that are
/// within `epsilon` of each other.
///
/// Unique rows are compacted to the front of `data`. Returns an index into the
/// unique rows for each row and the number of unique rows.
///
/// Values are discretized into cells of `epsilon` relative to the minimum of
/// each column. Discretization is repeated with each column shifted by half a
/// cell so that values on either side of a cell boundary are merged.
///
/// # Errors
///
/// Returns an error if `width` is zero or does not divide the length of
/// `data`.
pub fn remove_duplicates_fuzzy_in_place<T>(
    data: &mut [T],
    width: usize,
    epsilon: T,
) -> Result<(Vec<u32>, usize), MeshError>
where
    T: Float,
{
    check_width(data.len(), width)?;
    let mut indices = (0..(data.len() / width) as u32).collect::<Vec<_>>();
    let len = compact_fuzzy(data, width, epsilon, &mut indices);
    Ok((indices, len))
}

/// Removes fuzzy duplicates in place and remaps an index buffer that refers to
/// rows of `data`.
///
/// Returns the number of unique rows.
///
/// # Errors
///
/// Returns an error if `width` does not divide the length of `data`, if `I`
/// cannot index every row, or if an index is out of bounds.
pub fn remove_duplicates_fuzzy_indexed_in_place<I, T>(
    indices: &mut [I],
    data: &mut [T],
    width: usize,
    epsilon: T,
) -> Result<usize, MeshError>
where
    I: Index,
    T: Float,
{
    check_width(data.len(), width)?;
    let rows = data.len() / width;
    check_index_capacity::<I>(rows)?;
    let view = IndexView::from(&*indices);
    view.check_bounds(rows)?;
    let mut values = view.to_vec();
    let len = compact_fuzzy(data, width, epsilon, &mut values);
    for (index, value) in indices.iter_mut().zip(values) {
        *index = I::try_from_u32(value).ok_or(MeshError::IndexOverflow {
            value: u64::from(value),
        })?;
    }
    Ok(len)
}

fn check_width(len: usize, width: usize) -> Result<(), MeshError> {
    if width == 0 || len % width != 0 {
        Err(MeshError::RowUnaligned { len, width })
    }
    else {
        Ok(())
    }
}

fn check_index_capacity<I>(count: usize) -> Result<(), MeshError>
where
    I: Index,
{
    if count > I::MAX as usize {
        Err(MeshError::IndexTypeTooSmall {
            size: mem::size_of::<I>(),
            count,
        })
    }
    else {
        Ok(())
    }
}

fn remap<I>(indices: &mut [I], remapping: &[u32]) -> Result<(), MeshError>
where
    I: Index,
{
    for index in indices.iter_mut() {
        let value = remapping[index.into_usize()];
        *index = I::try_from_u32(value).ok_or(MeshError::IndexOverflow {
            value: u64::from(value),
        })?;
    }
    Ok(())
}

/// Compacts fuzzy duplicates and remaps `indices`, which refer to rows of
/// `data`. Returns the number of unique rows.
fn compact_fuzzy<T>(data: &mut [T], width: usize, epsilon: T, indices: &mut [u32]) -> usize
where
    T: Float,
{
    let mut len = data.len() / width;
    if len == 0 {
        return 0;
    }
    let (min, range) = column_bounds(&data[..len * width], width);
    // Keep discretized values representable.
    let epsilon = epsilon.max(range / T::from(u64::MAX).unwrap_or_else(T::max_value));
    let half = epsilon / (T::one() + T::one());

    let mut keys = vec![0u64; len * width];
    let mut remapping = vec![0u32; len];
    for pass in 0..=width {
        let shifted = pass.checked_sub(1);
        for (row, keys) in data[..len * width]
            .chunks_exact(width)
            .zip(keys.chunks_exact_mut(width))
        {
            for (column, (value, key)) in row.iter().zip(keys.iter_mut()).enumerate() {
                let mut value = *value - min[column];
                if shifted == Some(column) {
                    value = value + half;
                }
                *key = (value / epsilon).to_u64().unwrap_or(0);
            }
        }

        let mut rows = HashMap::with_capacity_and_hasher(len, RandomState::new());
        for (keys, index) in keys[..len * width]
            .chunks_exact(width)
            .zip(remapping.iter_mut())
        {
            let unique = rows.len() as u32;
            *index = *rows.entry(keys).or_insert(unique);
        }
        let unique = rows.len();

        // Unique rows are numbered in order of first occurrence, so a row is
        // the first of its kind exactly when its index is the next free slot.
        let mut free = 0;
        for (row, index) in remapping[..len].iter().enumerate() {
            if *index as usize == free {
                data.copy_within(row * width..(row + 1) * width, free * width);
                free += 1;
            }
        }
        for index in indices.iter_mut() {
            *index = remapping[*index as usize];
        }
        len = unique;
    }
    log::debug!(
        "compacted {} fuzzy unique of {} rows",
        len,
        data.len() / width
    );
    len
}

/// Gets the minimum of each column and the largest range among columns.
fn column_bounds<T>(data: &[T], width: usize) -> (SmallVec<[T; 4]>, T)
where
    T: Float,
{
    let mut min = SmallVec::<[T; 4]>::from_elem(T::infinity(), width);
    let mut max = SmallVec::<[T; 4]>::from_elem(T::neg_infinity(), width);
    for row in data.chunks_exact(width) {
        for (column, value) in row.iter().enumerate() {
            min[column] = min[column].min(*value);
            max[column] = max[column].max(*value);
        }
    }
    let range = min
        .iter()
        .zip(max.iter())
        .fold(T::zero(), |range, (min, max)| range.max(*max - *min));
    (min, range)
}

/// Removes exact duplicate vertices from a mesh.
///
/// The mesh is interleaved and vertices are compared byte for byte. The index
/// type of an indexed mesh is kept. A non-indexed mesh gets `u32` indices.
///
/// # Errors
///
/// Returns an error if the mesh has no attributes or cannot be interleaved.
pub fn remove_duplicates_mesh(mesh: &MeshData<'_>) -> Result<MeshData<'static>, MeshError> {
    if mesh.attribute_count() == 0 {
        return Err(MeshError::AttributelessMesh);
    }
    let interleaved = interleave::interleave(mesh, &[])?;
    let (offset, stride, size) = {
        let data = interleave::interleaved_data(&interleaved)?;
        (data.offset(), data.stride(), data.element_size())
    };
    let (primitive, indices, mut vertex_data, attributes, vertex_count) = interleaved.into_parts();
    let (remapping, len) = remove_duplicates_in_place(StridedViewMut::new(
        vertex_data.to_mut(),
        offset,
        vertex_count,
        stride,
        size,
    )?);
    vertex_data.to_mut().truncate(len * stride);
    MeshData::new(
        primitive,
        Some(remap_mesh_indices(indices, remapping)?),
        vertex_data,
        attributes,
        len,
    )
}

/// Removes duplicate vertices from a mesh, merging floating-point attributes
/// that are within a tolerance.
///
/// Each attribute is deduplicated on its own. Attributes with `f32` or `f64`
/// components are compared fuzzily and other attributes exactly. The
/// tolerance depends on the attribute:
///
/// - Texture coordinates and colors use the tolerance as is.
/// - Normals, tangents, and bitangents use twice the tolerance.
/// - Other attributes, and every attribute with `f64` components, use the
///   tolerance scaled by the range of their values.
///
/// Vertices are merged when all of their attributes are merged. The output is
/// interleaved. The index type of an indexed mesh is kept. A non-indexed mesh
/// gets `u32` indices.
///
/// # Errors
///
/// Returns an error if the mesh has no attributes or an attribute has an
/// implementation-specific format.
pub fn remove_duplicates_fuzzy_mesh(
    mesh: &MeshData<'_>,
    tolerance: Tolerance,
) -> Result<MeshData<'static>, MeshError> {
    if mesh.attribute_count() == 0 {
        return Err(MeshError::AttributelessMesh);
    }
    let vertex_count = mesh.vertex_count();
    let attribute_count = mesh.attribute_count();
    let mut combined = vec![0u32; vertex_count * attribute_count];
    let mut uniques = Vec::with_capacity(attribute_count);
    for (id, attribute) in mesh.attributes().iter().enumerate() {
        let view = mesh.attribute_view(id)?;
        let width = attribute.format.component_count() * usize::from(attribute.array_size.max(1));
        let (indices, unique) = match attribute.format.component_format() {
            Some(ComponentFormat::F32) => {
                let mut values = view.to_vec::<f32>()?;
                let epsilon = scale_epsilon(attribute, tolerance.float, &values, width);
                let (indices, len) = remove_duplicates_fuzzy_in_place(&mut values, width, epsilon)?;
                values.truncate(len * width);
                (indices, bytemuck::cast_slice::<_, u8>(&values).to_vec())
            }
            Some(ComponentFormat::F64) => {
                let mut values = view.to_vec::<f64>()?;
                let (_, range) = column_bounds(&values, width);
                let (indices, len) =
                    remove_duplicates_fuzzy_in_place(&mut values, width, tolerance.double * range)?;
                values.truncate(len * width);
                (indices, bytemuck::cast_slice::<_, u8>(&values).to_vec())
            }
            _ => {
                let mut values = view.iter().flatten().copied().collect::<Vec<_>>();
                let size = view.element_size();
                let (indices, len) = remove_duplicates_in_place(StridedViewMut::new(
                    &mut values,
                    0,
                    vertex_count,
                    size,
                    size,
                )?);
                values.truncate(len * size);
                (indices, values)
            }
        };
        for (vertex, index) in indices.into_iter().enumerate() {
            combined[vertex * attribute_count + id] = index;
        }
        uniques.push(unique);
    }

    let row = attribute_count * mem::size_of::<u32>();
    let (remapping, len) = remove_duplicates_in_place(StridedViewMut::new(
        bytemuck::cast_slice_mut(combined.as_mut_slice()),
        0,
        vertex_count,
        row,
        row,
    )?);
    log::debug!("merged {} vertices into {}", vertex_count, len);

    let mut output = interleave::interleaved_layout(mesh, len, &[])?;
    let rows = StridedView::new(bytemuck::cast_slice(combined.as_slice()), 0, len, row, row)?;
    for (id, unique) in uniques.iter().enumerate() {
        let size = output.attribute(id).element_size().unwrap_or(0);
        let indices = IndexView::erased(rows.field(id * mem::size_of::<u32>(), mem::size_of::<u32>())?)?;
        duplicate::duplicate_into(
            indices,
            StridedView::new(unique, 0, unique.len() / size.max(1), size, size)?,
            output.attribute_view_mut(id)?,
        )?;
    }
    let (primitive, _, vertex_data, attributes, _) = output.into_parts();
    let indices = mesh.index_data().cloned();
    MeshData::new(
        primitive,
        Some(remap_mesh_indices(indices, remapping)?),
        vertex_data,
        attributes,
        len,
    )
}

fn scale_epsilon(attribute: &MeshAttributeData, epsilon: f32, values: &[f32], width: usize) -> f32 {
    match attribute.name {
        MeshAttribute::TextureCoordinates | MeshAttribute::Color => epsilon,
        MeshAttribute::Normal | MeshAttribute::Tangent | MeshAttribute::Bitangent => epsilon * 2.0,
        _ => {
            let (_, range) = column_bounds(values, width);
            epsilon * range
        }
    }
}

/// Maps existing indices through `remapping`, keeping their type, or uses
/// `remapping` itself as `u32` indices if there are none.
fn remap_mesh_indices(
    indices: Option<MeshIndexData<'_>>,
    remapping: Vec<u32>,
) -> Result<MeshIndexData<'static>, MeshError> {
    match indices {
        Some(indices) => {
            let values = indices
                .to_values()?
                .into_iter()
                .map(|index| remapping[index as usize])
                .collect::<Vec<_>>();
            MeshIndexData::from_values(indices.index_type(), &values)
        }
        _ => Ok(MeshIndexData::owned(remapping)),
    }
}

//! Per-element attribute arrays.
//!
//! Attributes live outside the [`Topology`] in plain arrays sized to the
//! element count. The wrappers here only add indexing by typed id, so a face
//! attribute cannot be read with a vertex id by accident.

use std::ops::{Index, IndexMut};

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::topology::Topology;
use crate::error::{MeshError, Result};

macro_rules! impl_attribute {
    ($name:ident, $id:ident, $count:ident, $what:literal) => {
        #[doc = concat!("An array holding one value per ", $what, ".")]
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name<T>(Vec<T>);

        impl<T> $name<T> {
            /// Wrap an existing array.
            pub fn new(values: Vec<T>) -> Self {
                Self(values)
            }

            #[doc = concat!("Wrap an existing array, checking it has one value per ", $what, ".")]
            pub fn for_topology<I: MeshIndex>(
                topology: &Topology<I>,
                values: Vec<T>,
            ) -> Result<Self> {
                MeshError::check_len($what, topology.$count(), values.len())?;
                Ok(Self(values))
            }

            /// Number of values.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Whether the array is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Iterate over the values in id order.
            pub fn iter(&self) -> std::slice::Iter<'_, T> {
                self.0.iter()
            }

            /// Iterate mutably over the values in id order.
            pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
                self.0.iter_mut()
            }

            /// Borrow the underlying slice.
            pub fn as_slice(&self) -> &[T] {
                &self.0
            }

            /// Borrow the underlying slice mutably.
            pub fn as_mut_slice(&mut self) -> &mut [T] {
                &mut self.0
            }

            /// Unwrap into the underlying array.
            pub fn into_vec(self) -> Vec<T> {
                self.0
            }
        }

        impl<T: Clone> $name<T> {
            #[doc = concat!("An array with `value` for every ", $what, " of `topology`.")]
            pub fn filled<I: MeshIndex>(topology: &Topology<I>, value: T) -> Self {
                Self(vec![value; topology.$count()])
            }
        }

        impl<T> From<Vec<T>> for $name<T> {
            fn from(values: Vec<T>) -> Self {
                Self(values)
            }
        }

        impl<T, I: MeshIndex> Index<$id<I>> for $name<T> {
            type Output = T;

            #[inline]
            fn index(&self, id: $id<I>) -> &T {
                &self.0[id.index()]
            }
        }

        impl<T, I: MeshIndex> IndexMut<$id<I>> for $name<T> {
            #[inline]
            fn index_mut(&mut self, id: $id<I>) -> &mut T {
                &mut self.0[id.index()]
            }
        }

        impl<T> Index<usize> for $name<T> {
            type Output = T;

            #[inline]
            fn index(&self, index: usize) -> &T {
                &self.0[index]
            }
        }

        impl<T> IndexMut<usize> for $name<T> {
            #[inline]
            fn index_mut(&mut self, index: usize) -> &mut T {
                &mut self.0[index]
            }
        }

        impl<'a, T> IntoIterator for &'a $name<T> {
            type Item = &'a T;
            type IntoIter = std::slice::Iter<'a, T>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

impl_attribute!(VertexAttribute, VertexId, num_vertices, "vertex");
impl_attribute!(FaceAttribute, FaceId, num_faces, "face");
impl_attribute!(EdgeAttribute, HalfEdgeId, num_halfedges, "half-edge");

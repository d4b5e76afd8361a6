//! Buffer capability consumed by ndarray descriptors.
//!
//! A buffer is anything with indexed element reads (and, when mutable,
//! indexed writes). Buffers that are plain slices expose them through
//! [`Buffer::as_slice`] so the traversal kernels can use slice iteration on
//! unit-stride runs; all other buffers go through `get`/`set` (the accessor
//! path).

use std::marker::PhantomData;

use num_complex::Complex;

/// Read access to a flat element buffer.
pub trait Buffer {
    type Elem: Clone;

    /// Number of addressable elements.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at `index`.
    ///
    /// Panics if `index >= self.len()`.
    fn get(&self, index: usize) -> Self::Elem;

    /// Direct slice view, when the buffer is stored as one.
    #[inline]
    fn as_slice(&self) -> Option<&[Self::Elem]> {
        None
    }
}

/// Write access to a flat element buffer.
pub trait BufferMut: Buffer {
    /// Write `value` at `index`.
    ///
    /// Panics if `index >= self.len()`.
    fn set(&mut self, index: usize, value: Self::Elem);

    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [Self::Elem]> {
        None
    }
}

impl<T: Clone> Buffer for [T] {
    type Elem = T;

    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self[index].clone()
    }

    #[inline]
    fn as_slice(&self) -> Option<&[T]> {
        Some(self)
    }
}

impl<T: Clone> BufferMut for [T] {
    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        Some(self)
    }
}

impl<T: Clone> Buffer for Vec<T> {
    type Elem = T;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self[index].clone()
    }

    #[inline]
    fn as_slice(&self) -> Option<&[T]> {
        Some(self)
    }
}

impl<T: Clone> BufferMut for Vec<T> {
    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        Some(self)
    }
}

impl<B: Buffer + ?Sized> Buffer for &B {
    type Elem = B::Elem;

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Elem {
        (**self).get(index)
    }

    #[inline]
    fn as_slice(&self) -> Option<&[Self::Elem]> {
        (**self).as_slice()
    }
}

impl<B: Buffer + ?Sized> Buffer for &mut B {
    type Elem = B::Elem;

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Elem {
        (**self).get(index)
    }

    #[inline]
    fn as_slice(&self) -> Option<&[Self::Elem]> {
        (**self).as_slice()
    }
}

impl<B: BufferMut + ?Sized> BufferMut for &mut B {
    #[inline]
    fn set(&mut self, index: usize, value: Self::Elem) {
        (**self).set(index, value)
    }

    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [Self::Elem]> {
        (**self).as_mut_slice()
    }
}

/// Complex numbers stored as interleaved `[re0, im0, re1, im1, ...]` parts.
///
/// Element `i` occupies parts `2i` and `2i + 1`; a trailing odd part is not
/// addressable.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexBuffer<T, S = Vec<T>> {
    parts: S,
    _elem: PhantomData<T>,
}

impl<T, S: AsRef<[T]>> ComplexBuffer<T, S> {
    pub fn new(parts: S) -> Self {
        Self {
            parts,
            _elem: PhantomData,
        }
    }

    /// Interleaved real/imaginary storage.
    #[inline]
    pub fn parts(&self) -> &[T] {
        self.parts.as_ref()
    }

    pub fn into_parts(self) -> S {
        self.parts
    }
}

impl<T: Copy + num_traits::Zero> ComplexBuffer<T> {
    /// Zero-initialized buffer of `len` complex elements.
    pub fn zeros(len: usize) -> Self {
        Self::new(vec![T::zero(); 2 * len])
    }

    pub fn from_complex(values: &[Complex<T>]) -> Self {
        let parts = values.iter().flat_map(|c| [c.re, c.im]).collect();
        Self::new(parts)
    }
}

impl<T: Copy, S: AsRef<[T]>> Buffer for ComplexBuffer<T, S> {
    type Elem = Complex<T>;

    #[inline]
    fn len(&self) -> usize {
        self.parts.as_ref().len() / 2
    }

    #[inline]
    fn get(&self, index: usize) -> Complex<T> {
        let parts = self.parts.as_ref();
        Complex::new(parts[2 * index], parts[2 * index + 1])
    }
}

impl<T: Copy, S: AsRef<[T]> + AsMut<[T]>> BufferMut for ComplexBuffer<T, S> {
    #[inline]
    fn set(&mut self, index: usize, value: Complex<T>) {
        let parts = self.parts.as_mut();
        parts[2 * index] = value.re;
        parts[2 * index + 1] = value.im;
    }
}

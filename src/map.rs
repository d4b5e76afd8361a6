//! N-ary traversal entry points.
//!
//! Every function checks that the participating arrays share one shape,
//! returns immediately for zero-element shapes, plans the traversal once,
//! and then picks one access mechanism for the whole call: direct slice
//! indexing when every buffer exposes a slice, `get`/`set` otherwise. Both
//! mechanisms visit the same positions in the same order.
//!
//! Broadcasting is a separate, prior step; see [`crate::broadcast`].

use log::trace;

use crate::array::NdArray;
use crate::buffer::{Buffer, BufferMut};
use crate::kernel::{build_plan, ensure_same_shape, for_each_run, Access, KernelPlan};
use crate::{Result, TraversalOptions};

// ============================================================================
// Element access
// ============================================================================

trait Source {
    type Elem;
    fn read(&self, pos: isize) -> Self::Elem;
}

trait Sink: Source {
    fn write(&mut self, pos: isize, value: Self::Elem);
}

/// Slice-backed access.
struct Direct<'a, T>(&'a [T]);

impl<T: Clone> Source for Direct<'_, T> {
    type Elem = T;

    #[inline(always)]
    fn read(&self, pos: isize) -> T {
        self.0[pos as usize].clone()
    }
}

struct DirectMut<'a, T>(&'a mut [T]);

impl<T: Clone> Source for DirectMut<'_, T> {
    type Elem = T;

    #[inline(always)]
    fn read(&self, pos: isize) -> T {
        self.0[pos as usize].clone()
    }
}

impl<T: Clone> Sink for DirectMut<'_, T> {
    #[inline(always)]
    fn write(&mut self, pos: isize, value: T) {
        self.0[pos as usize] = value;
    }
}

/// Accessor-backed access through [`Buffer::get`] / [`BufferMut::set`].
struct Via<'a, B: ?Sized>(&'a B);

impl<B: Buffer + ?Sized> Source for Via<'_, B> {
    type Elem = B::Elem;

    #[inline(always)]
    fn read(&self, pos: isize) -> B::Elem {
        self.0.get(pos as usize)
    }
}

struct ViaMut<'a, B: ?Sized>(&'a mut B);

impl<B: BufferMut + ?Sized> Source for ViaMut<'_, B> {
    type Elem = B::Elem;

    #[inline(always)]
    fn read(&self, pos: isize) -> B::Elem {
        self.0.get(pos as usize)
    }
}

impl<B: BufferMut + ?Sized> Sink for ViaMut<'_, B> {
    #[inline(always)]
    fn write(&mut self, pos: isize, value: B::Elem) {
        self.0.set(pos as usize, value)
    }
}

#[inline]
fn base<B>(a: &NdArray<B>) -> isize {
    a.offset() as isize
}

fn announce(op: &str, access: Access, plan: &KernelPlan) {
    trace!(
        "{}: {:?} access, {:?} kernel over {:?}",
        op,
        access,
        plan.rank,
        plan.dims
    );
}

// ============================================================================
// Nullary
// ============================================================================

/// Fill `out` with successive results of `f`.
pub fn nullary_into<BO, F>(out: &mut NdArray<BO>, f: F) -> Result<()>
where
    BO: BufferMut,
    F: FnMut() -> BO::Elem,
{
    nullary_into_with_options(out, f, &TraversalOptions::default())
}

pub fn nullary_into_with_options<BO, F>(out: &mut NdArray<BO>, f: F, options: &TraversalOptions) -> Result<()>
where
    BO: BufferMut,
    F: FnMut() -> BO::Elem,
{
    if out.is_empty() {
        return Ok(());
    }
    let plan = build_plan(out.shape(), &[out.strides()], &[out.dtype()], options);
    let bases = [base(out)];
    match out.buffer_mut().as_mut_slice() {
        Some(o) => {
            announce("nullary", Access::Slice, &plan);
            nullary_runs(&plan, &bases, DirectMut(o), f)
        }
        None => {
            announce("nullary", Access::Accessor, &plan);
            nullary_runs(&plan, &bases, ViaMut(out.buffer_mut()), f)
        }
    }
    Ok(())
}

fn nullary_runs<O, F>(plan: &KernelPlan, bases: &[isize], mut out: O, mut f: F)
where
    O: Sink,
    F: FnMut() -> O::Elem,
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let mut po = offsets[0];
        for _ in 0..len {
            out.write(po, f());
            po += strides[0];
        }
    });
}

// ============================================================================
// Unary
// ============================================================================

/// `out[i] = f(x[i])` for every index `i`.
pub fn unary_into<BO, BX, F>(out: &mut NdArray<BO>, x: &NdArray<BX>, f: F) -> Result<()>
where
    BO: BufferMut,
    BX: Buffer,
    F: FnMut(BX::Elem) -> BO::Elem,
{
    unary_into_with_options(out, x, f, &TraversalOptions::default())
}

pub fn unary_into_with_options<BO, BX, F>(
    out: &mut NdArray<BO>,
    x: &NdArray<BX>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BO: BufferMut,
    BX: Buffer,
    F: FnMut(BX::Elem) -> BO::Elem,
{
    ensure_same_shape(out.shape(), x.shape())?;
    if out.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        out.shape(),
        &[out.strides(), x.strides()],
        &[out.dtype(), x.dtype()],
        options,
    );
    let bases = [base(out), base(x)];
    match (out.buffer_mut().as_mut_slice(), x.buffer().as_slice()) {
        (Some(o), Some(xs)) => {
            announce("unary", Access::Slice, &plan);
            unary_runs(&plan, &bases, DirectMut(o), Direct(xs), f)
        }
        _ => {
            announce("unary", Access::Accessor, &plan);
            unary_runs(&plan, &bases, ViaMut(out.buffer_mut()), Via(x.buffer()), f)
        }
    }
    Ok(())
}

fn unary_runs<O, X, F>(plan: &KernelPlan, bases: &[isize], mut out: O, x: X, mut f: F)
where
    O: Sink,
    X: Source,
    F: FnMut(X::Elem) -> O::Elem,
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let (mut po, mut px) = (offsets[0], offsets[1]);
        for _ in 0..len {
            out.write(po, f(x.read(px)));
            po += strides[0];
            px += strides[1];
        }
    });
}

// ============================================================================
// Binary
// ============================================================================

/// `out[i] = f(a[i], b[i])` for every index `i`.
pub fn binary_into<BO, BA, BB, F>(out: &mut NdArray<BO>, a: &NdArray<BA>, b: &NdArray<BB>, f: F) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    F: FnMut(BA::Elem, BB::Elem) -> BO::Elem,
{
    binary_into_with_options(out, a, b, f, &TraversalOptions::default())
}

pub fn binary_into_with_options<BO, BA, BB, F>(
    out: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    F: FnMut(BA::Elem, BB::Elem) -> BO::Elem,
{
    ensure_same_shape(out.shape(), a.shape())?;
    ensure_same_shape(out.shape(), b.shape())?;
    if out.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        out.shape(),
        &[out.strides(), a.strides(), b.strides()],
        &[out.dtype(), a.dtype(), b.dtype()],
        options,
    );
    let bases = [base(out), base(a), base(b)];
    match (
        out.buffer_mut().as_mut_slice(),
        a.buffer().as_slice(),
        b.buffer().as_slice(),
    ) {
        (Some(o), Some(xa), Some(xb)) => {
            announce("binary", Access::Slice, &plan);
            binary_runs(&plan, &bases, DirectMut(o), Direct(xa), Direct(xb), f)
        }
        _ => {
            announce("binary", Access::Accessor, &plan);
            binary_runs(
                &plan,
                &bases,
                ViaMut(out.buffer_mut()),
                Via(a.buffer()),
                Via(b.buffer()),
                f,
            )
        }
    }
    Ok(())
}

fn binary_runs<O, A, B, F>(plan: &KernelPlan, bases: &[isize], mut out: O, a: A, b: B, mut f: F)
where
    O: Sink,
    A: Source,
    B: Source,
    F: FnMut(A::Elem, B::Elem) -> O::Elem,
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let (mut po, mut pa, mut pb) = (offsets[0], offsets[1], offsets[2]);
        for _ in 0..len {
            out.write(po, f(a.read(pa), b.read(pb)));
            po += strides[0];
            pa += strides[1];
            pb += strides[2];
        }
    });
}

// ============================================================================
// Ternary
// ============================================================================

/// `out[i] = f(a[i], b[i], c[i])` for every index `i`.
pub fn ternary_into<BO, BA, BB, BC, F>(
    out: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    c: &NdArray<BC>,
    f: F,
) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    BC: Buffer,
    F: FnMut(BA::Elem, BB::Elem, BC::Elem) -> BO::Elem,
{
    ternary_into_with_options(out, a, b, c, f, &TraversalOptions::default())
}

pub fn ternary_into_with_options<BO, BA, BB, BC, F>(
    out: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    c: &NdArray<BC>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    BC: Buffer,
    F: FnMut(BA::Elem, BB::Elem, BC::Elem) -> BO::Elem,
{
    ensure_same_shape(out.shape(), a.shape())?;
    ensure_same_shape(out.shape(), b.shape())?;
    ensure_same_shape(out.shape(), c.shape())?;
    if out.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        out.shape(),
        &[out.strides(), a.strides(), b.strides(), c.strides()],
        &[out.dtype(), a.dtype(), b.dtype(), c.dtype()],
        options,
    );
    let bases = [base(out), base(a), base(b), base(c)];
    match (
        out.buffer_mut().as_mut_slice(),
        a.buffer().as_slice(),
        b.buffer().as_slice(),
        c.buffer().as_slice(),
    ) {
        (Some(o), Some(xa), Some(xb), Some(xc)) => {
            announce("ternary", Access::Slice, &plan);
            ternary_runs(&plan, &bases, DirectMut(o), (Direct(xa), Direct(xb), Direct(xc)), f)
        }
        _ => {
            announce("ternary", Access::Accessor, &plan);
            ternary_runs(
                &plan,
                &bases,
                ViaMut(out.buffer_mut()),
                (Via(a.buffer()), Via(b.buffer()), Via(c.buffer())),
                f,
            )
        }
    }
    Ok(())
}

fn ternary_runs<O, A, B, C, F>(plan: &KernelPlan, bases: &[isize], mut out: O, inputs: (A, B, C), mut f: F)
where
    O: Sink,
    A: Source,
    B: Source,
    C: Source,
    F: FnMut(A::Elem, B::Elem, C::Elem) -> O::Elem,
{
    let (a, b, c) = inputs;
    for_each_run(plan, bases, |offsets, len, strides| {
        let mut p = [offsets[0], offsets[1], offsets[2], offsets[3]];
        for _ in 0..len {
            out.write(p[0], f(a.read(p[1]), b.read(p[2]), c.read(p[3])));
            for (pos, s) in p.iter_mut().zip(strides) {
                *pos += s;
            }
        }
    });
}

// ============================================================================
// Quaternary
// ============================================================================

/// `out[i] = f(a[i], b[i], c[i], d[i])` for every index `i`.
pub fn quaternary_into<BO, BA, BB, BC, BD, F>(
    out: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    c: &NdArray<BC>,
    d: &NdArray<BD>,
    f: F,
) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    BC: Buffer,
    BD: Buffer,
    F: FnMut(BA::Elem, BB::Elem, BC::Elem, BD::Elem) -> BO::Elem,
{
    quaternary_into_with_options(out, a, b, c, d, f, &TraversalOptions::default())
}

pub fn quaternary_into_with_options<BO, BA, BB, BC, BD, F>(
    out: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    c: &NdArray<BC>,
    d: &NdArray<BD>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BO: BufferMut,
    BA: Buffer,
    BB: Buffer,
    BC: Buffer,
    BD: Buffer,
    F: FnMut(BA::Elem, BB::Elem, BC::Elem, BD::Elem) -> BO::Elem,
{
    ensure_same_shape(out.shape(), a.shape())?;
    ensure_same_shape(out.shape(), b.shape())?;
    ensure_same_shape(out.shape(), c.shape())?;
    ensure_same_shape(out.shape(), d.shape())?;
    if out.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        out.shape(),
        &[out.strides(), a.strides(), b.strides(), c.strides(), d.strides()],
        &[out.dtype(), a.dtype(), b.dtype(), c.dtype(), d.dtype()],
        options,
    );
    let bases = [base(out), base(a), base(b), base(c), base(d)];
    match (
        out.buffer_mut().as_mut_slice(),
        a.buffer().as_slice(),
        b.buffer().as_slice(),
        c.buffer().as_slice(),
        d.buffer().as_slice(),
    ) {
        (Some(o), Some(xa), Some(xb), Some(xc), Some(xd)) => {
            announce("quaternary", Access::Slice, &plan);
            quaternary_runs(
                &plan,
                &bases,
                DirectMut(o),
                (Direct(xa), Direct(xb), Direct(xc), Direct(xd)),
                f,
            )
        }
        _ => {
            announce("quaternary", Access::Accessor, &plan);
            quaternary_runs(
                &plan,
                &bases,
                ViaMut(out.buffer_mut()),
                (Via(a.buffer()), Via(b.buffer()), Via(c.buffer()), Via(d.buffer())),
                f,
            )
        }
    }
    Ok(())
}

fn quaternary_runs<O, A, B, C, D, F>(
    plan: &KernelPlan,
    bases: &[isize],
    mut out: O,
    inputs: (A, B, C, D),
    mut f: F,
) where
    O: Sink,
    A: Source,
    B: Source,
    C: Source,
    D: Source,
    F: FnMut(A::Elem, B::Elem, C::Elem, D::Elem) -> O::Elem,
{
    let (a, b, c, d) = inputs;
    for_each_run(plan, bases, |offsets, len, strides| {
        let mut p = [offsets[0], offsets[1], offsets[2], offsets[3], offsets[4]];
        for _ in 0..len {
            out.write(p[0], f(a.read(p[1]), b.read(p[2]), c.read(p[3]), d.read(p[4])));
            for (pos, s) in p.iter_mut().zip(strides) {
                *pos += s;
            }
        }
    });
}

// ============================================================================
// Side-effecting visits
// ============================================================================

/// Call `f` with every element of `x`.
pub fn for_each<BX, F>(x: &NdArray<BX>, f: F) -> Result<()>
where
    BX: Buffer,
    F: FnMut(BX::Elem),
{
    for_each_with_options(x, f, &TraversalOptions::default())
}

pub fn for_each_with_options<BX, F>(x: &NdArray<BX>, f: F, options: &TraversalOptions) -> Result<()>
where
    BX: Buffer,
    F: FnMut(BX::Elem),
{
    if x.is_empty() {
        return Ok(());
    }
    let plan = build_plan(x.shape(), &[x.strides()], &[x.dtype()], options);
    let bases = [base(x)];
    match x.buffer().as_slice() {
        Some(xs) => {
            announce("for_each", Access::Slice, &plan);
            visit_runs(&plan, &bases, Direct(xs), f)
        }
        None => {
            announce("for_each", Access::Accessor, &plan);
            visit_runs(&plan, &bases, Via(x.buffer()), f)
        }
    }
    Ok(())
}

fn visit_runs<X, F>(plan: &KernelPlan, bases: &[isize], x: X, mut f: F)
where
    X: Source,
    F: FnMut(X::Elem),
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let mut px = offsets[0];
        for _ in 0..len {
            f(x.read(px));
            px += strides[0];
        }
    });
}

/// Call `f` with corresponding elements of `a` and `b`.
pub fn for_each2<BA, BB, F>(a: &NdArray<BA>, b: &NdArray<BB>, f: F) -> Result<()>
where
    BA: Buffer,
    BB: Buffer,
    F: FnMut(BA::Elem, BB::Elem),
{
    for_each2_with_options(a, b, f, &TraversalOptions::default())
}

pub fn for_each2_with_options<BA, BB, F>(
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BA: Buffer,
    BB: Buffer,
    F: FnMut(BA::Elem, BB::Elem),
{
    ensure_same_shape(a.shape(), b.shape())?;
    if a.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        a.shape(),
        &[a.strides(), b.strides()],
        &[a.dtype(), b.dtype()],
        options,
    );
    let bases = [base(a), base(b)];
    match (a.buffer().as_slice(), b.buffer().as_slice()) {
        (Some(xa), Some(xb)) => {
            announce("for_each2", Access::Slice, &plan);
            visit2_runs(&plan, &bases, Direct(xa), Direct(xb), f)
        }
        _ => {
            announce("for_each2", Access::Accessor, &plan);
            visit2_runs(&plan, &bases, Via(a.buffer()), Via(b.buffer()), f)
        }
    }
    Ok(())
}

fn visit2_runs<A, B, F>(plan: &KernelPlan, bases: &[isize], a: A, b: B, mut f: F)
where
    A: Source,
    B: Source,
    F: FnMut(A::Elem, B::Elem),
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let (mut pa, mut pb) = (offsets[0], offsets[1]);
        for _ in 0..len {
            f(a.read(pa), b.read(pb));
            pa += strides[0];
            pb += strides[1];
        }
    });
}

// ============================================================================
// In-place
// ============================================================================

/// Replace every element `v` of `x` with `f(v)`.
///
/// Each position is read before it is written. On a view with zero strides
/// an aliased position is transformed once per logical index.
pub fn map_in_place<BX, F>(x: &mut NdArray<BX>, f: F) -> Result<()>
where
    BX: BufferMut,
    F: FnMut(BX::Elem) -> BX::Elem,
{
    map_in_place_with_options(x, f, &TraversalOptions::default())
}

pub fn map_in_place_with_options<BX, F>(x: &mut NdArray<BX>, f: F, options: &TraversalOptions) -> Result<()>
where
    BX: BufferMut,
    F: FnMut(BX::Elem) -> BX::Elem,
{
    if x.is_empty() {
        return Ok(());
    }
    let plan = build_plan(x.shape(), &[x.strides()], &[x.dtype()], options);
    let bases = [base(x)];
    match x.buffer_mut().as_mut_slice() {
        Some(xs) => {
            announce("map_in_place", Access::Slice, &plan);
            in_place_runs(&plan, &bases, DirectMut(xs), f)
        }
        None => {
            announce("map_in_place", Access::Accessor, &plan);
            in_place_runs(&plan, &bases, ViaMut(x.buffer_mut()), f)
        }
    }
    Ok(())
}

fn in_place_runs<X, F>(plan: &KernelPlan, bases: &[isize], mut x: X, mut f: F)
where
    X: Sink,
    F: FnMut(X::Elem) -> X::Elem,
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let mut px = offsets[0];
        for _ in 0..len {
            let v = x.read(px);
            x.write(px, f(v));
            px += strides[0];
        }
    });
}

/// `acc[i] = f(acc[i], x[i])` for every index `i`.
///
/// `acc` may be a view with zero strides; aliased positions then receive
/// one update per logical index, in traversal order.
pub fn zip_in_place<BA, BX, F>(acc: &mut NdArray<BA>, x: &NdArray<BX>, f: F) -> Result<()>
where
    BA: BufferMut,
    BX: Buffer,
    F: FnMut(BA::Elem, BX::Elem) -> BA::Elem,
{
    zip_in_place_with_options(acc, x, f, &TraversalOptions::default())
}

pub fn zip_in_place_with_options<BA, BX, F>(
    acc: &mut NdArray<BA>,
    x: &NdArray<BX>,
    f: F,
    options: &TraversalOptions,
) -> Result<()>
where
    BA: BufferMut,
    BX: Buffer,
    F: FnMut(BA::Elem, BX::Elem) -> BA::Elem,
{
    ensure_same_shape(acc.shape(), x.shape())?;
    if acc.is_empty() {
        return Ok(());
    }
    let plan = build_plan(
        acc.shape(),
        &[acc.strides(), x.strides()],
        &[acc.dtype(), x.dtype()],
        options,
    );
    let bases = [base(acc), base(x)];
    match (acc.buffer_mut().as_mut_slice(), x.buffer().as_slice()) {
        (Some(a), Some(xs)) => {
            announce("zip_in_place", Access::Slice, &plan);
            zip_in_place_runs(&plan, &bases, DirectMut(a), Direct(xs), f)
        }
        _ => {
            announce("zip_in_place", Access::Accessor, &plan);
            zip_in_place_runs(&plan, &bases, ViaMut(acc.buffer_mut()), Via(x.buffer()), f)
        }
    }
    Ok(())
}

fn zip_in_place_runs<A, X, F>(plan: &KernelPlan, bases: &[isize], mut acc: A, x: X, mut f: F)
where
    A: Sink,
    X: Source,
    F: FnMut(A::Elem, X::Elem) -> A::Elem,
{
    for_each_run(plan, bases, |offsets, len, strides| {
        let (mut pa, mut px) = (offsets[0], offsets[1]);
        for _ in 0..len {
            let v = acc.read(pa);
            acc.write(pa, f(v, x.read(px)));
            pa += strides[0];
            px += strides[1];
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ComplexBuffer;
    use crate::dtype::DType;
    use crate::shape::Order;
    use crate::Blocking;
    use num_complex::Complex64;

    #[test]
    fn test_binary_add_1d() {
        let x = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4], Order::RowMajor).unwrap();
        let mut y = NdArray::from_vec(vec![0.0; 4], &[4], Order::RowMajor).unwrap();
        binary_into(&mut y, &x, &x, |a: f64, b: f64| a + b).unwrap();
        assert_eq!(y.to_vec(), vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_unary_transposed_input() {
        let x = NdArray::from_vec((0..6).collect::<Vec<i32>>(), &[2, 3], Order::RowMajor).unwrap();
        let mut out = NdArray::filled(0i32, &[3, 2], Order::RowMajor);
        unary_into(&mut out, &x.view().transpose(), |v| v * 10).unwrap();
        assert_eq!(out.to_vec(), vec![0, 30, 10, 40, 20, 50]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let x = NdArray::filled(1u8, &[2, 3], Order::RowMajor);
        let mut out = NdArray::filled(0u8, &[3, 2], Order::RowMajor);
        assert!(unary_into(&mut out, &x, |v| v).is_err());
    }

    #[test]
    fn test_zero_elements_never_call_back() {
        let x = NdArray::filled(1.0f32, &[3, 0, 2], Order::RowMajor);
        let mut calls = 0;
        for_each(&x, |_| calls += 1).unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_nullary_counts() {
        let mut out = NdArray::filled(0u64, &[2, 3, 4], Order::ColumnMajor);
        let mut next = 0u64;
        nullary_into(&mut out, || {
            next += 1;
            next
        })
        .unwrap();
        let mut seen = out.to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (1..=24).collect::<Vec<u64>>());
    }

    #[test]
    fn test_ternary_and_quaternary() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4], &[2, 2], Order::RowMajor).unwrap();
        let b = NdArray::from_vec(vec![10, 20, 30, 40], &[2, 2], Order::ColumnMajor).unwrap();
        let mut out = NdArray::filled(0, &[2, 2], Order::RowMajor);
        ternary_into(&mut out, &a, &b, &a, |x, y, z| x + y + z).unwrap();
        assert_eq!(out.to_vec(), vec![12, 34, 26, 48]);

        quaternary_into(&mut out, &a, &a, &a, &b, |w, x, y, z| w * x * y + z).unwrap();
        assert_eq!(out.to_vec(), vec![11, 38, 47, 104]);
    }

    #[test]
    fn test_accessor_path_matches_slice_path() {
        let values: Vec<Complex64> = (0..12).map(|k| Complex64::new(k as f64, -(k as f64))).collect();
        let direct = NdArray::from_vec(values.clone(), &[3, 4], Order::RowMajor).unwrap();
        let accessor = NdArray::new(
            DType::Complex128,
            ComplexBuffer::from_complex(&values),
            &[3, 4],
            &[4, 1],
            0,
            Order::RowMajor,
        )
        .unwrap();

        let mut out_direct = NdArray::filled(Complex64::new(0.0, 0.0), &[4, 3], Order::RowMajor);
        let mut out_accessor = NdArray::new(
            DType::Complex128,
            ComplexBuffer::<f64>::zeros(12),
            &[4, 3],
            &[3, 1],
            0,
            Order::RowMajor,
        )
        .unwrap();

        let conj = |c: Complex64| c.conj();
        unary_into(&mut out_direct, &direct.view().transpose(), conj).unwrap();
        unary_into(&mut out_accessor, &accessor.view().transpose(), conj).unwrap();
        assert_eq!(out_direct.to_vec(), out_accessor.to_vec());
    }

    #[test]
    fn test_for_each2_pairs() {
        let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3], Order::RowMajor).unwrap();
        let b = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3], Order::ColumnMajor).unwrap();
        let mut dot = 0;
        for_each2(&a, &b, |x, y| dot += x * y).unwrap();
        // b in row-major logical order is [1, 3, 5, 2, 4, 6].
        assert_eq!(dot, 1 + 2 * 3 + 3 * 5 + 4 * 2 + 5 * 4 + 6 * 6);
    }

    #[test]
    fn test_map_in_place_reversed_view() {
        let mut a = NdArray::from_vec(vec![1, 2, 3, 4], &[2, 2], Order::RowMajor).unwrap();
        {
            let mut v = a.view_mut().reverse().unwrap();
            map_in_place(&mut v, |x| x * x).unwrap();
        }
        assert_eq!(a.to_vec(), vec![1, 4, 9, 16]);
    }

    #[test]
    fn test_zip_in_place_accumulates() {
        let mut acc = NdArray::from_vec(vec![1, 1, 1], &[3], Order::RowMajor).unwrap();
        let x = NdArray::from_vec(vec![1, 2, 3], &[3], Order::RowMajor).unwrap();
        zip_in_place(&mut acc, &x, |a, v| a + v).unwrap();
        assert_eq!(acc.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn test_sequential_options_visit_in_row_major_order() {
        let x = NdArray::from_vec((0..6).collect::<Vec<i32>>(), &[2, 3], Order::ColumnMajor).unwrap();
        let mut seen = Vec::new();
        for_each_with_options(&x, |v| seen.push(v), &TraversalOptions::sequential()).unwrap();
        assert_eq!(seen, x.to_vec());
    }

    #[test]
    fn test_forced_blocking_same_result() {
        let n = 100;
        let x = NdArray::from_vec((0..n * n).map(|k| k as f64).collect(), &[n, n], Order::RowMajor).unwrap();
        let mut plain = NdArray::filled(0.0, &[n, n], Order::RowMajor);
        let mut blocked = NdArray::filled(0.0, &[n, n], Order::RowMajor);
        let t = x.view().transpose();
        unary_into_with_options(
            &mut plain,
            &t,
            |v| v + 1.0,
            &TraversalOptions {
                blocking: Blocking::Never,
                ..TraversalOptions::default()
            },
        )
        .unwrap();
        unary_into_with_options(
            &mut blocked,
            &t,
            |v| v + 1.0,
            &TraversalOptions {
                blocking: Blocking::Always,
                ..TraversalOptions::default()
            },
        )
        .unwrap();
        assert_eq!(plain.to_vec(), blocked.to_vec());
    }
}

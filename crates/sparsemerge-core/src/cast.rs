//! Cast functions between element types
//!
//! A cast reads one element from the front of `x` and writes one element
//! into the front of `z`. Slices are sized by the caller from the type
//! catalog; neither side needs to be aligned.

use crate::dispatch_type;
use crate::error::{Error, Result};
use crate::types::{Element, Type, TypeCode};

/// Convert one element from `x` into `z`
pub type CastFn = fn(z: &mut [u8], x: &[u8]);

/// Read one element from the front of an unaligned byte slice.
#[inline]
#[must_use]
pub fn read_element<T: Element>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<T>()])
}

/// Write one element to the front of an unaligned byte slice.
#[inline]
pub fn write_element<T: Element>(bytes: &mut [u8], value: T) {
    bytes[..std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
}

#[inline]
fn cast_via<Z: Element, X: Element>(z: &mut [u8], x: &[u8]) {
    let v: X = read_element(x);
    write_element(z, Z::from_scalar(v.to_scalar()));
}

/// Byte copy for identical types (user types and the no-operator merge).
#[inline]
pub fn copy_user_user(z: &mut [u8], x: &[u8]) {
    let n = z.len().min(x.len());
    z[..n].copy_from_slice(&x[..n]);
}

/// Cast function from built-in `xcode` to built-in `zcode`
#[must_use]
pub fn cast_factory(zcode: TypeCode, xcode: TypeCode) -> CastFn {
    if zcode == xcode {
        return copy_user_user;
    }
    dispatch_type!(zcode, Z => {
        dispatch_type!(xcode, X => {
            cast_via::<Z, X> as CastFn
        })
    })
}

/// Cast function from `xtype` to `ztype`, or a type mismatch error
pub fn cast_fn(ztype: &Type, xtype: &Type, context: &'static str) -> Result<CastFn> {
    if !ztype.is_compatible(xtype) {
        return Err(Error::type_mismatch(context, ztype.name(), xtype.name()));
    }
    match (ztype.code(), xtype.code()) {
        (Some(z), Some(x)) => Ok(cast_factory(z, x)),
        // compatible user types are the same type
        _ => Ok(copy_user_user),
    }
}

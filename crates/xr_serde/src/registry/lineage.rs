use alloc::boxed::Box;
use core::fmt;

use crate::{HandledType, Object};

/// Declares `Self` a subtype of `Base`.
///
/// A subtype without its own plugin is encoded through the inheritable plugin
/// of its base: the value is converted with [`to_base`](Self::to_base) before
/// encoding and rebuilt with [`from_base`](Self::from_base) after decoding. The
/// written signature is the subtype's own type name, so the exact type comes
/// back.
pub trait Inherits<Base: Object>: Object + Sized {
    fn to_base(&self) -> Base;

    fn from_base(base: Base) -> Self;
}

/// A type-erased [`Inherits`] declaration.
#[derive(Clone, Copy)]
pub struct Subtype {
    pub(crate) derived: HandledType,
    pub(crate) base: HandledType,
    pub(crate) upcast: fn(&dyn Object) -> Option<Box<dyn Object>>,
    pub(crate) downcast: fn(Box<dyn Object>) -> Option<Box<dyn Object>>,
}

impl Subtype {
    pub fn of<D: Inherits<B>, B: Object>() -> Self {
        Self {
            derived: HandledType::of::<D>(),
            base: HandledType::of::<B>(),
            upcast: upcast::<D, B>,
            downcast: downcast::<D, B>,
        }
    }

    #[inline]
    pub fn derived(&self) -> HandledType {
        self.derived
    }

    #[inline]
    pub fn base(&self) -> HandledType {
        self.base
    }
}

impl fmt::Debug for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtype")
            .field("derived", &self.derived.path())
            .field("base", &self.base.path())
            .finish()
    }
}

fn upcast<D: Inherits<B>, B: Object>(obj: &dyn Object) -> Option<Box<dyn Object>> {
    let derived = obj.downcast_ref::<D>()?;
    Some(Box::new(derived.to_base()))
}

fn downcast<D: Inherits<B>, B: Object>(obj: Box<dyn Object>) -> Option<Box<dyn Object>> {
    let base = obj.downcast::<B>().ok()?;
    Some(Box::new(D::from_base(*base)))
}

use crate::TypeSerializer;

/// A plugin constructor collected at link time.
///
/// Submitted by `#[xr(auto_register)]` and `#[callable(auto_register)]`.
pub struct AutoRegisterPlugin(pub fn() -> TypeSerializer);

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegisterPlugin);

/// Every collected plugin, in link order.
#[cfg(feature = "auto_register")]
pub(crate) fn collected() -> impl Iterator<Item = TypeSerializer> {
    inventory::iter::<AutoRegisterPlugin>
        .into_iter()
        .map(|plugin| (plugin.0)())
}

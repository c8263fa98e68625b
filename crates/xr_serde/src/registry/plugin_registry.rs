use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bitflags::bitflags;

use super::Subtype;
use crate::{Inherits, Object, Serializable, TypeSerializer};

// -----------------------------------------------------------------------------
// Roles & groups

bitflags! {
    /// Directions a registered plugin takes part in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Roles: u8 {
        const ENCODE = 1 << 0;
        const DECODE = 1 << 1;
    }
}

/// A group of plugins with a common origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginGroup {
    /// Plugins shipped with this crate.
    Builtin,
    /// The [numeric](crate::numeric) plugins: arrays and time values.
    Numeric,
    /// Plugins added through [`Registry::add`] and friends.
    Plugins,
    /// Plugins collected by [`Registry::auto_register`].
    ThirdParty,
}

impl PluginGroup {
    /// Highest precedence first.
    pub const DEFAULT_PRECEDENCE: [PluginGroup; 4] = [
        PluginGroup::Builtin,
        PluginGroup::Numeric,
        PluginGroup::Plugins,
        PluginGroup::ThirdParty,
    ];
}

#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub plugin: Arc<TypeSerializer>,
    pub roles: Roles,
}

// -----------------------------------------------------------------------------
// Registry

/// Ordered plugin groups and declared subtypes.
///
/// A registry is a plain value: build one, then snapshot it into a
/// [`Serializer`](crate::Serializer). Later changes do not affect serializers
/// built earlier.
///
/// # Example
///
/// ```
/// use xr_serde::{PluginGroup, Registry, Roles, TypeSerializer};
///
/// let mut registry = Registry::new();
/// registry.add_with_roles(
///     TypeSerializer::decode_only("old.Meters").with_decoder(|_| Ok(0.0_f64.into())),
///     Roles::DECODE,
/// );
/// registry.set_precedence([PluginGroup::Plugins, PluginGroup::Builtin]);
///
/// assert_eq!(registry.group(PluginGroup::Plugins).count(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Registry {
    builtin: Vec<Entry>,
    numeric: Vec<Entry>,
    plugins: Vec<Entry>,
    third_party: Vec<Entry>,
    subtypes: Vec<Subtype>,
    precedence: Vec<PluginGroup>,
    #[cfg_attr(not(feature = "auto_register"), allow(dead_code))]
    auto_registered: bool,
}

impl Default for Registry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry with no plugins at all, not even the builtin ones.
    pub fn empty() -> Self {
        Self {
            builtin: Vec::new(),
            numeric: Vec::new(),
            plugins: Vec::new(),
            third_party: Vec::new(),
            subtypes: Vec::new(),
            precedence: PluginGroup::DEFAULT_PRECEDENCE.to_vec(),
            auto_registered: false,
        }
    }

    /// A registry holding the [builtin](crate::builtin) and
    /// [numeric](crate::numeric) plugins.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for plugin in crate::builtin::plugins() {
            registry.add_to_group(PluginGroup::Builtin, plugin, Roles::all());
        }
        for plugin in crate::numeric::plugins() {
            registry.add_to_group(PluginGroup::Numeric, plugin, Roles::all());
        }
        registry
    }

    fn entries_mut(&mut self, group: PluginGroup) -> &mut Vec<Entry> {
        match group {
            PluginGroup::Builtin => &mut self.builtin,
            PluginGroup::Numeric => &mut self.numeric,
            PluginGroup::Plugins => &mut self.plugins,
            PluginGroup::ThirdParty => &mut self.third_party,
        }
    }

    pub(crate) fn entries(&self, group: PluginGroup) -> &[Entry] {
        match group {
            PluginGroup::Builtin => &self.builtin,
            PluginGroup::Numeric => &self.numeric,
            PluginGroup::Plugins => &self.plugins,
            PluginGroup::ThirdParty => &self.third_party,
        }
    }

    /// Adds a user plugin for both directions.
    #[inline]
    pub fn add(&mut self, plugin: TypeSerializer) -> &mut Self {
        self.add_with_roles(plugin, Roles::all())
    }

    /// Adds a user plugin restricted to `roles`.
    #[inline]
    pub fn add_with_roles(&mut self, plugin: TypeSerializer, roles: Roles) -> &mut Self {
        self.add_to_group(PluginGroup::Plugins, plugin, roles)
    }

    /// Adds a plugin to any group.
    ///
    /// Within a group, a plugin added later replaces an earlier one claiming
    /// the same type or signature.
    pub fn add_to_group(
        &mut self,
        group: PluginGroup,
        plugin: TypeSerializer,
        roles: Roles,
    ) -> &mut Self {
        self.entries_mut(group).push(Entry {
            plugin: Arc::new(plugin),
            roles,
        });
        self
    }

    /// Adds the plugin of a [`Serializable`] type.
    #[inline]
    pub fn register<T: Serializable>(&mut self) -> &mut Self {
        self.add(TypeSerializer::of::<T>())
    }

    /// Declares `D` a subtype of `B`.
    ///
    /// Declarations are searched in order, so an earlier declaration for the
    /// same subtype takes priority.
    pub fn declare_subtype<D: Inherits<B>, B: Object>(&mut self) -> &mut Self {
        self.subtypes.push(Subtype::of::<D, B>());
        self
    }

    #[inline]
    pub fn subtypes(&self) -> &[Subtype] {
        &self.subtypes
    }

    /// Sets the group precedence, highest first. Missing groups are excluded.
    pub fn set_precedence(&mut self, groups: impl IntoIterator<Item = PluginGroup>) -> &mut Self {
        self.precedence.clear();
        for group in groups {
            if !self.precedence.contains(&group) {
                self.precedence.push(group);
            }
        }
        self
    }

    #[inline]
    pub fn precedence(&self) -> &[PluginGroup] {
        &self.precedence
    }

    /// The plugins of a group with their roles, in registration order.
    pub fn group(&self, group: PluginGroup) -> impl Iterator<Item = (&TypeSerializer, Roles)> {
        self.entries(group).iter().map(|e| (&*e.plugin, e.roles))
    }

    /// Total number of plugins in all groups.
    pub fn len(&self) -> usize {
        self.builtin.len() + self.numeric.len() + self.plugins.len() + self.third_party.len()
    }

    /// Pulls every plugin submitted with `auto_register` into
    /// [`PluginGroup::ThirdParty`].
    ///
    /// Repeated calls are cheap and will not insert duplicates.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if automatic registration is available on the current
    /// platform and feature set; otherwise, `false`.
    ///
    /// ## Feature Dependency
    ///
    /// This method requires the `auto_register` feature. When disabled, it
    /// does nothing and returns `false`.
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            if !self.auto_registered {
                for plugin in super::auto_register::collected() {
                    self.add_to_group(PluginGroup::ThirdParty, plugin, Roles::all());
                }
                self.auto_registered = true;
            }
            true
        }

        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }
}

// -----------------------------------------------------------------------------
// RegistryArc

/// A [`Registry`] behind a shared lock.
#[derive(Clone, Default)]
pub struct RegistryArc {
    /// The wrapped [`Registry`].
    pub internal: Arc<RwLock<Registry>>,
}

impl RegistryArc {
    #[inline]
    pub fn new(registry: Registry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// Takes a read lock on the underlying [`Registry`].
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`Registry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshots the current registry into a serializer.
    pub fn serializer(&self) -> crate::Serializer {
        crate::Serializer::from_registry(&self.read())
    }
}

impl fmt::Debug for RegistryArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.read(), f)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_group_is_filled() {
        let registry = Registry::new();
        let signatures: Vec<_> = registry
            .group(PluginGroup::Builtin)
            .map(|(p, _)| p.signature())
            .collect();
        for expected in [
            "tuple",
            "set",
            "list",
            "slice",
            "bytes",
            "Literal",
            "timezone",
            "datetime",
            "date",
            "time",
            "generic",
            "builtins.tuple",
        ] {
            assert!(signatures.contains(&expected), "missing {expected}");
        }
        let numeric: Vec<_> = registry
            .group(PluginGroup::Numeric)
            .map(|(p, _)| p.signature())
            .collect();
        assert_eq!(numeric, ["numpy.dtype", "np.array", "np.datetime64", "np.timedelta64"]);
        assert_eq!(registry.precedence(), PluginGroup::DEFAULT_PRECEDENCE);
        assert_eq!(Registry::empty().len(), 0);
    }

    #[test]
    fn precedence_drops_duplicates() {
        let mut registry = Registry::empty();
        registry.set_precedence([
            PluginGroup::ThirdParty,
            PluginGroup::Builtin,
            PluginGroup::ThirdParty,
        ]);
        assert_eq!(
            registry.precedence(),
            [PluginGroup::ThirdParty, PluginGroup::Builtin]
        );
    }

    #[test]
    fn shared_registry() {
        let shared = RegistryArc::new(Registry::empty());
        shared
            .write()
            .add_with_roles(TypeSerializer::decode_only("x"), Roles::DECODE);
        assert_eq!(shared.read().len(), 1);
        assert_eq!(shared.read().group(PluginGroup::Plugins).next().unwrap().1, Roles::DECODE);
    }
}

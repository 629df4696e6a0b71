//! Candidate types and their declarative metadata.
//!
//! A [`CandidateType`] is the flat, origin-independent description of one
//! type that may take part in a registration plan. Front ends build these
//! from whatever markers their source language uses; the planner never sees
//! how a marker was spelled.
//!
//! ```rust,ignore
//! use trellis_core::prelude::*;
//!
//! let order_service = CandidateType::new(TypeRef::new("Shop.OrderService", "Shop"))
//!     .implements(TypeRef::new("Shop.IOrderService", "Shop"))
//!     .constructor(Constructor::new().param(Parameter::service(
//!         TypeRef::new("Shop.IInventoryService", "Shop"),
//!     )));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::lifetime::{Lifetime, ResolutionKind};
use super::type_ref::TypeRef;

// ─── Parameters & constructors ────────────────────────────────────────────────

/// Structural category of a constructor parameter's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterCategory {
    /// A class, interface or other reference-like type.
    #[default]
    Reference,
    /// A primitive or value type (numbers, strings, booleans, ...).
    Primitive,
    /// A delegate / function type.
    Delegate,
}

/// A single constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// The parameter's declared type.
    pub ty: TypeRef,
    /// Structural category of `ty`.
    #[serde(default)]
    pub category: ParameterCategory,
    /// How the dependency is requested.
    #[serde(default)]
    pub resolution: ResolutionKind,
}

impl Parameter {
    /// A reference-typed dependency resolved directly.
    pub fn service(ty: TypeRef) -> Self {
        Self {
            ty,
            category: ParameterCategory::Reference,
            resolution: ResolutionKind::Direct,
        }
    }

    /// A primitive parameter. Constructors taking one are never injectable.
    pub fn primitive(ty: TypeRef) -> Self {
        Self {
            ty,
            category: ParameterCategory::Primitive,
            resolution: ResolutionKind::Direct,
        }
    }

    /// A delegate parameter. Constructors taking one are never injectable.
    pub fn delegate(ty: TypeRef) -> Self {
        Self {
            ty,
            category: ParameterCategory::Delegate,
            resolution: ResolutionKind::Direct,
        }
    }

    /// Requests the implementation registered under `key`.
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.resolution = ResolutionKind::Keyed(key.into());
        self
    }

    /// Requests every registered implementation.
    pub fn collection(mut self) -> Self {
        self.resolution = ResolutionKind::Collection;
        self
    }

    /// Requests lazy resolution.
    pub fn lazy(mut self) -> Self {
        self.resolution = ResolutionKind::Lazy;
        self
    }

    /// Requests a factory.
    pub fn factory(mut self) -> Self {
        self.resolution = ResolutionKind::Factory;
        self
    }

    /// Returns `true` for reference-like parameters.
    pub fn is_reference(&self) -> bool {
        self.category == ParameterCategory::Reference
    }
}

/// One constructor: an ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Constructor {
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Constructor {
    /// Creates a parameterless constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Returns `true` when the constructor takes no parameters.
    pub fn is_parameterless(&self) -> bool {
        self.parameters.is_empty()
    }
}

// ─── Declarations ─────────────────────────────────────────────────────────────

/// "This type wraps another implementation of `target`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecoratorDeclaration {
    /// The abstraction being decorated.
    pub target: TypeRef,
    /// Chain position; lower is closer to the wrapped implementation.
    #[serde(default)]
    pub order: i32,
}

/// An interceptor applied to a whole type or to one of its methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterceptorDeclaration {
    /// The interceptor type.
    pub interceptor: TypeRef,
    /// Ordering key; lower runs further out.
    #[serde(default)]
    pub order: i32,
    /// Target method, or `None` for a class-level declaration.
    #[serde(default)]
    pub method: Option<String>,
}

/// Named capability tags.
///
/// These replace base-class hierarchies that only exist to mark a family of
/// types; the planner only ever asks whether a tag is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tag", content = "name")]
pub enum Capability {
    /// The type releases held or unmanaged resources when disposed.
    Disposable,
    /// A long-running background unit.
    BackgroundService,
    /// A plugin-like startup unit, ordered with the default order.
    Plugin,
    /// Any other named marker.
    Custom(String),
}

/// Visibility of a candidate relative to its own assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Reachable from any assembly.
    #[default]
    Public,
    /// Reachable only from its own assembly.
    Internal,
    /// Not reachable from outside its declaring type.
    Private,
}

impl Accessibility {
    /// Whether a type declared in `owner` can be reached from `consumer`.
    pub fn reachable_from(self, owner: &str, consumer: &str) -> bool {
        match self {
            Self::Public => true,
            Self::Internal => owner == consumer,
            Self::Private => false,
        }
    }
}

/// Where a candidate was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

/// Flags that remove a candidate from the plan entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ExclusionFlags {
    /// Opted out of automatic registration.
    #[serde(default)]
    pub excluded_from_auto_registration: bool,
    /// Opted out of injection.
    #[serde(default)]
    pub excluded_from_injection: bool,
}

impl ExclusionFlags {
    /// Returns `true` if either flag is set.
    pub fn any(&self) -> bool {
        self.excluded_from_auto_registration || self.excluded_from_injection
    }
}

// ─── CandidateType ────────────────────────────────────────────────────────────

/// One type eligible for registration, with all of its declarative metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateType {
    pub identity: TypeRef,
    #[serde(default)]
    pub abstractions: BTreeSet<TypeRef>,
    /// Declared constructors in declaration order. Empty means an implicit
    /// parameterless constructor.
    #[serde(default)]
    pub constructors: Vec<Constructor>,
    #[serde(default)]
    pub declared_lifetime: Option<Lifetime>,
    #[serde(default)]
    pub exclusion: ExclusionFlags,
    #[serde(default)]
    pub decorators: Vec<DecoratorDeclaration>,
    #[serde(default)]
    pub interceptors: Vec<InterceptorDeclaration>,
    #[serde(default)]
    pub plugin_order: Option<i32>,
    #[serde(default)]
    pub service_keys: BTreeSet<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Methods exposed through the candidate's abstractions.
    #[serde(default)]
    pub methods: BTreeSet<String>,
    #[serde(default)]
    pub accessibility: Accessibility,
    #[serde(default)]
    pub source_location: Option<SourceLocation>,
}

impl CandidateType {
    /// Creates a public candidate with no metadata beyond its identity.
    pub fn new(identity: TypeRef) -> Self {
        Self {
            identity,
            abstractions: BTreeSet::new(),
            constructors: Vec::new(),
            declared_lifetime: None,
            exclusion: ExclusionFlags::default(),
            decorators: Vec::new(),
            interceptors: Vec::new(),
            plugin_order: None,
            service_keys: BTreeSet::new(),
            capabilities: BTreeSet::new(),
            methods: BTreeSet::new(),
            accessibility: Accessibility::Public,
            source_location: None,
        }
    }

    /// Adds an implemented abstraction.
    pub fn implements(mut self, abstraction: TypeRef) -> Self {
        self.abstractions.insert(abstraction);
        self
    }

    /// Appends a constructor.
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Declares an explicit lifetime.
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.declared_lifetime = Some(lifetime);
        self
    }

    /// Declares this type a decorator of `target` at `order`.
    pub fn decorates(mut self, target: TypeRef, order: i32) -> Self {
        self.decorators.push(DecoratorDeclaration { target, order });
        self
    }

    /// Adds a class-level interceptor.
    pub fn intercepted_by(mut self, interceptor: TypeRef, order: i32) -> Self {
        self.interceptors.push(InterceptorDeclaration {
            interceptor,
            order,
            method: None,
        });
        self
    }

    /// Adds a method-level interceptor.
    pub fn method_intercepted_by(
        mut self,
        method: impl Into<String>,
        interceptor: TypeRef,
        order: i32,
    ) -> Self {
        self.interceptors.push(InterceptorDeclaration {
            interceptor,
            order,
            method: Some(method.into()),
        });
        self
    }

    /// Declares an exposed method.
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    /// Gives the candidate the plugin role at `order`.
    pub fn plugin_order(mut self, order: i32) -> Self {
        self.plugin_order = Some(order);
        self
    }

    /// Adds a service key.
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.service_keys.insert(key.into());
        self
    }

    /// Adds a capability tag.
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Shorthand for [`Capability::Disposable`].
    pub fn disposable(self) -> Self {
        self.capability(Capability::Disposable)
    }

    /// Shorthand for [`Capability::BackgroundService`].
    pub fn background_service(self) -> Self {
        self.capability(Capability::BackgroundService)
    }

    /// Sets the accessibility.
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Records the declaring source location.
    pub fn located_at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.source_location = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    /// Opts the candidate out of automatic registration.
    pub fn excluded_from_auto_registration(mut self) -> Self {
        self.exclusion.excluded_from_auto_registration = true;
        self
    }

    /// Opts the candidate out of injection.
    pub fn excluded_from_injection(mut self) -> Self {
        self.exclusion.excluded_from_injection = true;
        self
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether disposing this type releases resources.
    pub fn is_disposable(&self) -> bool {
        self.has_capability(&Capability::Disposable)
    }

    /// Whether this type is a long-running background unit.
    pub fn is_background_service(&self) -> bool {
        self.has_capability(&Capability::BackgroundService)
    }

    /// Whether this type plays the plugin role.
    pub fn is_plugin(&self) -> bool {
        self.plugin_order.is_some() || self.has_capability(&Capability::Plugin)
    }

    /// Whether this type decorates `abstraction`.
    pub fn decorates_target(&self, abstraction: &TypeRef) -> bool {
        self.decorators.iter().any(|d| &d.target == abstraction)
    }

    /// Abstractions this candidate is registered under: every implemented
    /// abstraction except the ones it decorates.
    pub fn service_abstractions(&self) -> impl Iterator<Item = &TypeRef> {
        self.abstractions
            .iter()
            .filter(|abstraction| !self.decorates_target(abstraction))
    }

    /// Returns `true` for a candidate registrable only under its own identity.
    pub fn is_self_registered(&self) -> bool {
        self.abstractions.is_empty() && !self.is_plugin()
    }
}

//! Pre-flight registry validation
//!
//! Proves, without building anything, that every registered implementation has
//! at least one constructor whose abstract or registered parameters can be
//! satisfied by the registry without running into a construction cycle.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::catalog::{Constructor, Parameter, ParameterType};
use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};
use crate::registry::Registry;

/// Whether every registration in `registry` can be constructed
pub fn validate(registry: &Registry) -> bool {
    ensure_valid(registry).is_ok()
}

/// Like [`validate`], reporting the first failure as `InvalidConfiguration`
pub fn ensure_valid(registry: &Registry) -> DIResult<()> {
    let mut validator = Validator::new(registry);
    for (dependency, descriptor) in registry.iter() {
        if let Err(reason) = validator.can_construct(dependency, descriptor.implementation()) {
            warn!(
                "Registration {} -> {} cannot be constructed: {}",
                dependency,
                descriptor.implementation(),
                reason
            );
            return Err(DIError::invalid_configuration(format!(
                "{} registered for {} cannot be constructed: {}",
                descriptor.implementation(),
                dependency,
                reason
            )));
        }
    }
    debug!("Validated {} registrations", registry.len());
    Ok(())
}

struct Validator<'a> {
    registry: &'a Registry,
    /// Types currently under construction
    stack: Vec<TypeDescriptor>,
    /// Implementations already proven constructible
    proven: HashSet<TypeDescriptor>,
}

impl<'a> Validator<'a> {
    fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            stack: Vec::new(),
            proven: HashSet::new(),
        }
    }

    fn can_construct(
        &mut self,
        dependency: &TypeDescriptor,
        implementation: &TypeDescriptor,
    ) -> Result<(), String> {
        if self.proven.contains(implementation) {
            return Ok(());
        }

        self.stack.push(dependency.clone());
        self.stack.push(implementation.clone());
        let result = self.any_constructor_usable(implementation);
        self.stack.truncate(self.stack.len() - 2);

        if result.is_ok() {
            self.proven.insert(implementation.clone());
        }
        result
    }

    fn any_constructor_usable(&mut self, implementation: &TypeDescriptor) -> Result<(), String> {
        let constructors = self.registry.inspector().constructors(implementation);
        if constructors.is_empty() {
            return Err(format!("{} declares no constructors", implementation));
        }

        let mut first_failure = None;
        for constructor in &constructors {
            match self.constructor_usable(constructor) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    first_failure.get_or_insert(reason);
                }
            }
        }
        Err(first_failure.unwrap_or_default())
    }

    fn constructor_usable(&mut self, constructor: &Constructor) -> Result<(), String> {
        constructor
            .parameters()
            .iter()
            .try_for_each(|parameter| self.parameter_usable(parameter))
    }

    fn parameter_usable(&mut self, parameter: &Parameter) -> Result<(), String> {
        let required = match parameter.ty() {
            ParameterType::Dependency(ty) => ty,
            ParameterType::GenericArgument {
                constraint: Some(constraint),
                ..
            } => constraint,
            ParameterType::GenericArgument {
                position,
                constraint: None,
            } => return Err(format!("generic argument {} is unbound", position)),
        };

        if let Some(element) = required.element() {
            return self.sequence_usable(element, parameter);
        }
        // Unregistered concrete types are built in place and not proven here
        if !self.registry.inspector().is_abstraction(required)
            && self.registry.candidates(required).is_empty()
        {
            return Ok(());
        }
        if self.stack.contains(required) {
            return Err(format!("{} depends on itself", required));
        }

        let registry = self.registry;
        let key = parameter.selector();
        let descriptor = registry
            .select(required, key)
            .ok_or_else(|| format!("{} is not registered (key {})", required, key))?;
        let implementation = registry
            .materialize(required, descriptor)
            .map_err(|e| e.to_string())?;
        self.can_construct(required, &implementation)
    }

    fn sequence_usable(
        &mut self,
        element: &TypeDescriptor,
        parameter: &Parameter,
    ) -> Result<(), String> {
        if self.stack.contains(element) {
            return Err(format!("{} depends on itself", element));
        }
        let registry = self.registry;
        let candidates = registry.candidates(element);
        if candidates.is_empty() {
            return Err(format!("{} is not registered", element));
        }

        let key = parameter.selector();
        for descriptor in candidates.iter().filter(|d| d.key().intersects(key)) {
            let implementation = registry
                .materialize(element, descriptor)
                .map_err(|e| e.to_string())?;
            self.can_construct(element, &implementation)?;
        }
        Ok(())
    }
}
